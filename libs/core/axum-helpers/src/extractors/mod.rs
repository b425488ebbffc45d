//! Request extractors that reject with the error envelope.

pub mod validated_json;

pub use validated_json::ValidatedJson;
