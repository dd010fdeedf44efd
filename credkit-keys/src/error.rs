use thiserror::Error;

/// Error types for the credkit-keys crate
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unsupported store target: {0}")]
    UnsupportedStoreTarget(String),

    #[error("Key generation failed: {0}")]
    GenerationFailed(String),

    #[error("Save failed: {0}")]
    SaveFailed(String),

    #[error("Load failed: {0}")]
    LoadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Malformed encoding: {0}")]
    MalformedEncoding(String),

    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Plaintext too large: {len} bytes exceeds maximum of {max}")]
    PlaintextTooLarge { len: usize, max: usize },

    // Deliberately carries no detail.
    #[error("Decryption failed")]
    DecryptionFailed,

    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Key is not extractable")]
    NotExtractable,

    #[error("Failed to copy private key from identity")]
    CopyPrivateKeyFailed,

    #[error("Failed to copy certificate from identity")]
    CopyCertificateFailed,

    #[error("Certificate error: {0}")]
    Certificate(String),
}

/// Result type for credkit-keys operations
pub type Result<T> = std::result::Result<T, KeyError>;
