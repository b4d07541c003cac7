//! Error types for the security handler.
//!
//! Structural faults (unknown filters, unsupported revisions, malformed
//! ciphertext) are surfaced as errors. A password mismatch is not an error:
//! it is reported as [`PasswordOutcome::Invalid`](crate::PasswordOutcome).

/// Result type alias for security-handler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during encryption or decryption.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The document uses a security handler this crate does not implement
    /// (`/Filter` is not `/Standard`, or `/V` is outside 1..=4).
    #[error("Unknown encryption: {0}")]
    UnknownEncryption(String),

    /// Revision outside the supported set {2, 3, 4}.
    #[error("Unsupported encryption revision: R={0}")]
    UnsupportedRevision(u32),

    /// An R=4 crypt filter other than /StdCF with CFM V2/AESV2 and
    /// AuthEvent /DocOpen.
    #[error("Unsupported crypt filter: {0}")]
    UnsupportedCryptFilter(String),

    /// AES input too short, not a block multiple, or PKCS#7 padding invalid.
    #[error("Malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    /// A crypt operation was requested before a password validated
    /// successfully, so no file key exists.
    #[error("Not authenticated: no encryption key established")]
    NotAuthenticated,

    /// The encryption dictionary is structurally invalid (missing or
    /// mistyped required entries, wrong O/U length).
    #[error("Invalid encryption dictionary: {0}")]
    InvalidEncryptDict(String),

    /// An object had the wrong type for the requested operation.
    #[error("Invalid object type: expected {expected}, found {found}")]
    InvalidObjectType {
        /// Expected object type
        expected: String,
        /// Actual object type found
        found: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_encryption_message() {
        let err = Error::UnknownEncryption("filter /PubSec".to_string());
        let msg = format!("{}", err);
        assert!(msg.contains("Unknown encryption"));
        assert!(msg.contains("PubSec"));
    }

    #[test]
    fn test_unsupported_revision_message() {
        let err = Error::UnsupportedRevision(6);
        assert!(format!("{}", err).contains("R=6"));
    }

    #[test]
    fn test_invalid_object_type_message() {
        let err = Error::InvalidObjectType {
            expected: "Dictionary".to_string(),
            found: "Array".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Dictionary"));
        assert!(msg.contains("Array"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
