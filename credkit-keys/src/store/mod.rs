//! Credential store abstraction.
//!
//! The core never talks to a platform keychain directly. Everything it
//! persists goes through [`CredentialStore`], a label-indexed record store
//! with duplicate detection. Backends:
//! - [`MemoryCredentialStore`], an in-process map, optionally with a
//!   simulated secure element.
//! - [`FileCredentialStore`], a software store persisted under a directory.

use std::fmt;

use thiserror::Error;
use zeroize::Zeroizing;

use crate::types::{Accessibility, KeySpec};

pub mod file;
pub mod memory;
pub mod secure_element;

pub use file::{FileCredentialStore, FileStoreConfig};
pub use memory::MemoryCredentialStore;
pub use secure_element::SoftSecureElement;

/// Errors reported by a credential store backend
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Duplicate entry")]
    DuplicateEntry,

    #[error("Entry not found")]
    NotFound,

    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store serialization error: {0}")]
    Serialization(String),
}

/// Class of a stored record. Label + class is unique within a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordClass {
    PublicKey,
    PrivateKey,
    Certificate,
}

impl RecordClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordClass::PublicKey => "public-key",
            RecordClass::PrivateKey => "private-key",
            RecordClass::Certificate => "certificate",
        }
    }
}

/// Record contents
#[derive(Clone)]
pub enum Payload {
    /// Standard encoding of a key, or certificate DER
    Data(Zeroizing<Vec<u8>>),
    /// Reference to a key that lives inside the store's secure element
    SecureElement { handle: String },
}

/// One entry in a credential store
#[derive(Clone)]
pub struct Record {
    pub label: String,
    pub class: RecordClass,
    /// Algorithm of a key record; `None` for certificates
    pub key_spec: Option<KeySpec>,
    /// Policy the record was stored with. Filled in by `load`; `save` takes
    /// the policy as a separate argument.
    pub accessibility: Accessibility,
    pub payload: Payload,
}

impl Record {
    pub fn data(label: &str, class: RecordClass, key_spec: Option<KeySpec>, bytes: Vec<u8>) -> Self {
        Self {
            label: label.to_string(),
            class,
            key_spec,
            accessibility: Accessibility::default(),
            payload: Payload::Data(Zeroizing::new(bytes)),
        }
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let payload = match &self.payload {
            Payload::Data(bytes) => format!("Data({} bytes)", bytes.len()),
            Payload::SecureElement { handle } => format!("SecureElement({handle})"),
        };
        f.debug_struct("Record")
            .field("label", &self.label)
            .field("class", &self.class)
            .field("key_spec", &self.key_spec)
            .field("accessibility", &self.accessibility)
            .field("payload", &payload)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StoreCapabilities {
    /// Keys can be generated inside a secure element
    pub hardware_backed: bool,
    /// Records survive process exit
    pub persistent: bool,
}

/// Label-indexed persistence for keys and certificates.
///
/// Each call must be atomic on its own; there are no cross-call
/// transactions.
pub trait CredentialStore: Send + Sync {
    /// Fails with [`StoreError::DuplicateEntry`] when label + class exists.
    fn save(&self, record: &Record, accessibility: Accessibility) -> Result<(), StoreError>;

    /// Fails with [`StoreError::NotFound`] when nothing matches.
    fn load(&self, label: &str, class: RecordClass) -> Result<Record, StoreError>;

    /// Deleting an absent record succeeds.
    fn delete(&self, label: &str, class: RecordClass) -> Result<(), StoreError>;

    fn capabilities(&self) -> StoreCapabilities;

    fn secure_element(&self) -> Option<&dyn SecureElement> {
        None
    }
}

/// Non-extractable key storage attached to a credential store.
///
/// Private keys generated here never leave the element; the caller only
/// ever sees the public point and signatures.
pub trait SecureElement: Send + Sync {
    fn supports(&self, spec: KeySpec) -> bool;

    /// Generate a key under `handle` and return its uncompressed SEC1 point.
    fn generate(
        &self,
        handle: &str,
        spec: KeySpec,
        accessibility: Accessibility,
    ) -> Result<Vec<u8>, StoreError>;

    fn public_key(&self, handle: &str) -> Result<Vec<u8>, StoreError>;

    /// ECDSA over an already hashed message, DER encoded.
    fn sign_prehash(&self, handle: &str, prehash: &[u8]) -> Result<Vec<u8>, StoreError>;

    /// Deleting an absent key succeeds.
    fn delete(&self, handle: &str) -> Result<(), StoreError>;
}
