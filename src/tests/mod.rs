pub mod common;
pub mod envelope_normalization;
