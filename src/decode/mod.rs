//! Response decoder module
//!
//! Data endpoints answer with JSON in one of two shapes: a bare array of
//! records, or an object carrying the array under a named field.

mod decoders;
mod types;

pub use decoders::JsonDecoder;
pub use types::{RecordDecoder, RecordShape};
