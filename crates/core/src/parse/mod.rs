//! Pure parsers for HTTP headers and CLI-facing size literals.
//!
//! None of these perform I/O; they operate on already-read strings so they
//! can be unit-tested directly against literal header values.

mod content_range;
mod http_date;
mod size;

pub use content_range::{parse_content_length, parse_content_range};
pub use http_date::parse_http_date;
pub use size::parse_size;
