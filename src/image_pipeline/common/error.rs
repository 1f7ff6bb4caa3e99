use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Input directory not found: {0}")]
    NotFound(String),

    #[error("Failed to decode image: {0}")]
    DecodeError(String),

    #[error("Failed to write output file: {0}")]
    WriteError(String),

    #[error("Invalid image dimensions: width={0}, height={1}")]
    InvalidDimensions(usize, usize),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ConversionError {
    /// Whether this error means the file could not be read into a volume.
    pub fn is_decode_failure(&self) -> bool {
        matches!(
            self,
            ConversionError::DecodeError(_)
                | ConversionError::InvalidDimensions(..)
                | ConversionError::UnsupportedFormat(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ConversionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = ConversionError::NotFound("/missing".to_string());
        assert_eq!(err.to_string(), "Input directory not found: /missing");
    }

    #[test]
    fn test_decode_failure_classification() {
        assert!(ConversionError::DecodeError("x".into()).is_decode_failure());
        assert!(ConversionError::InvalidDimensions(0, 0).is_decode_failure());
        assert!(!ConversionError::WriteError("x".into()).is_decode_failure());
        assert!(!ConversionError::NotFound("x".into()).is_decode_failure());
    }
}
