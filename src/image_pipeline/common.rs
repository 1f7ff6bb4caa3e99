//! Common utilities module
//!
//! This module contains shared utilities used across the image pipeline.

pub mod bytes;
pub mod error;

pub use bytes::LeBytes;
pub use error::{ConversionError, Result};
