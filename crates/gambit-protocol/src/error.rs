//! Error types for the protocol layer.

/// Errors that can occur in the protocol layer.
///
/// A `ProtocolError` always means the bytes or their shape were wrong,
/// never that a room or session rule was broken.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing fields, or an
    /// unknown `type` tag.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The text is not a room code: wrong length or non-alphabetic.
    #[error("invalid room code: {0:?}")]
    InvalidRoomCode(String),
}
