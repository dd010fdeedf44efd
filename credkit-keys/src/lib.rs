//! Credkit Keys – public API facade
//!
//! RSA and NIST elliptic-curve key pairs, their standard encodings, the
//! primitive operations on them, and certificate-backed identities. All
//! persistence goes through an injected [`CredentialStore`].

mod macros;

pub mod certificate;
pub mod codec;
pub mod error;
pub mod generator;
pub mod identity;
pub mod key;
pub mod keypair;
pub mod ops;
mod rollback;
pub mod store;
pub mod types;

pub use certificate::Certificate;
pub use error::{KeyError, Result};
pub use generator::{GeneratorConfig, KeyPairGenerator};
pub use identity::Identity;
pub use key::Key;
pub use keypair::KeyPair;
pub use store::{
    CredentialStore, FileCredentialStore, FileStoreConfig, MemoryCredentialStore, Payload, Record,
    RecordClass, SecureElement, SoftSecureElement, StoreCapabilities, StoreError,
};
pub use types::{
    Accessibility, Curve, DigestAlgorithm, KeyClass, KeySpec, KeyType, Padding, RSA_MAX_BITS,
    RSA_MIN_BITS,
};
