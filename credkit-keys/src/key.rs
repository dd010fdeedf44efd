//! One half of a key pair.
//!
//! A [`Key`] is either *resident* (its standard encoding is held here in a
//! zeroizing buffer) or *store-backed* (a handle into the credential store's
//! secure element). Both are used through the same API.

use std::fmt;
use std::sync::Arc;

use zeroize::Zeroizing;

use crate::codec;
use crate::error::{KeyError, Result};
use crate::ops;
use crate::store::{CredentialStore, Payload, Record, RecordClass, StoreError};
use crate::types::{Accessibility, DigestAlgorithm, KeyClass, KeySpec, KeyType, Padding};

#[derive(Clone)]
pub(crate) enum KeyMaterial {
    /// PKCS#1 / SEC1 encoding of the key
    Resident(Zeroizing<Vec<u8>>),
    /// Private key held by the store's secure element
    SecureElement {
        handle: String,
        store: Arc<dyn CredentialStore>,
    },
}

#[derive(Clone)]
pub struct Key {
    spec: KeySpec,
    class: KeyClass,
    material: KeyMaterial,
}

impl Key {
    /// `bytes` must already be the canonical encoding for `spec` and `class`.
    pub(crate) fn resident(spec: KeySpec, class: KeyClass, bytes: Zeroizing<Vec<u8>>) -> Self {
        Self {
            spec,
            class,
            material: KeyMaterial::Resident(bytes),
        }
    }

    pub(crate) fn secure_element(
        spec: KeySpec,
        handle: &str,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            spec,
            class: KeyClass::Private,
            material: KeyMaterial::SecureElement {
                handle: handle.to_string(),
                store,
            },
        }
    }

    pub(crate) fn material(&self) -> &KeyMaterial {
        &self.material
    }

    /// Decode a key from its standard encoding. See [`codec::decode`].
    pub fn decode(bytes: &[u8], key_type: KeyType, class: KeyClass) -> Result<Self> {
        codec::decode(bytes, key_type, class)
    }

    pub fn spec(&self) -> KeySpec {
        self.spec
    }

    pub fn key_type(&self) -> KeyType {
        self.spec.key_type()
    }

    pub fn bits(&self) -> usize {
        self.spec.bits()
    }

    pub fn class(&self) -> KeyClass {
        self.class
    }

    pub fn is_private(&self) -> bool {
        self.class == KeyClass::Private
    }

    /// Whether the key lives in a secure element rather than in memory
    pub fn is_store_backed(&self) -> bool {
        matches!(self.material, KeyMaterial::SecureElement { .. })
    }

    pub fn is_extractable(&self) -> bool {
        !self.is_store_backed()
    }

    /// Standard binary encoding of this key. See [`codec::encode`].
    pub fn encode(&self) -> Result<Zeroizing<Vec<u8>>> {
        codec::encode(self)
    }

    /// The public half. A public key returns a copy of itself.
    pub fn public_key(&self) -> Result<Key> {
        match (&self.material, self.class) {
            (_, KeyClass::Public) => Ok(self.clone()),
            (KeyMaterial::Resident(bytes), KeyClass::Private) => {
                codec::public_from_private(self.spec, bytes)
            }
            (KeyMaterial::SecureElement { handle, store }, KeyClass::Private) => {
                let se = store.secure_element().ok_or_else(|| {
                    KeyError::UnsupportedStoreTarget("store has no secure element".to_string())
                })?;
                let point = se
                    .public_key(handle)
                    .map_err(|e| KeyError::LoadFailed(format!("secure element key {handle}: {e}")))?;
                codec::decode(&point, self.key_type(), KeyClass::Public)
            }
        }
    }

    /// Compact, DNS-safe fingerprint of the public half
    pub fn compact_id(&self) -> Result<String> {
        let public = self.public_key()?;
        let encoded = public.encode()?;
        Ok(credkit_common::compact_ids::compact_id(&encoded))
    }

    pub fn encrypt(&self, plaintext: &[u8], padding: Padding) -> Result<Vec<u8>> {
        ops::encrypt(self, plaintext, padding)
    }

    pub fn decrypt(&self, ciphertext: &[u8], padding: Padding) -> Result<Zeroizing<Vec<u8>>> {
        ops::decrypt(self, ciphertext, padding)
    }

    pub fn sign(&self, message: &[u8], digest: DigestAlgorithm) -> Result<Vec<u8>> {
        ops::sign(self, message, digest)
    }

    pub fn verify(&self, message: &[u8], signature: &[u8], digest: DigestAlgorithm) -> Result<bool> {
        ops::verify(self, message, signature, digest)
    }

    pub(crate) fn record_class(&self) -> RecordClass {
        match self.class {
            KeyClass::Public => RecordClass::PublicKey,
            KeyClass::Private => RecordClass::PrivateKey,
        }
    }

    pub(crate) fn to_record(&self, label: &str) -> Record {
        let payload = match &self.material {
            KeyMaterial::Resident(bytes) => Payload::Data(bytes.clone()),
            KeyMaterial::SecureElement { handle, .. } => Payload::SecureElement {
                handle: handle.clone(),
            },
        };
        Record {
            label: label.to_string(),
            class: self.record_class(),
            key_spec: Some(self.spec),
            accessibility: Accessibility::default(),
            payload,
        }
    }

    /// Rebuild a key from a store record of class `class`.
    pub(crate) fn from_record(
        record: &Record,
        class: KeyClass,
        store: &Arc<dyn CredentialStore>,
    ) -> Result<Self> {
        let spec = record.key_spec.ok_or_else(|| {
            KeyError::MalformedEncoding(format!("record {:?} carries no key algorithm", record.label))
        })?;
        match &record.payload {
            Payload::Data(bytes) => {
                let key = codec::decode(bytes, spec.key_type(), class)?;
                if key.spec != spec {
                    return Err(KeyError::MalformedEncoding(format!(
                        "record {:?} is tagged {spec} but holds a {} key",
                        record.label, key.spec
                    )));
                }
                Ok(key)
            }
            Payload::SecureElement { handle } => match class {
                KeyClass::Private => Ok(Key::secure_element(spec, handle, Arc::clone(store))),
                KeyClass::Public => Err(KeyError::MalformedEncoding(format!(
                    "public key record {:?} points into the secure element",
                    record.label
                ))),
            },
        }
    }

    /// Remove the store record for this key under `label`.
    pub fn delete(&self, store: &dyn CredentialStore, label: &str) -> std::result::Result<(), StoreError> {
        store.delete(label, self.record_class())
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        if self.spec != other.spec || self.class != other.class {
            return false;
        }
        match (&self.material, &other.material) {
            (KeyMaterial::Resident(a), KeyMaterial::Resident(b)) => a.as_slice() == b.as_slice(),
            (
                KeyMaterial::SecureElement { handle: a, .. },
                KeyMaterial::SecureElement { handle: b, .. },
            ) => a == b,
            _ => false,
        }
    }
}

impl Eq for Key {}

// Never prints key material.
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let storage = match &self.material {
            KeyMaterial::Resident(_) => "resident".to_string(),
            KeyMaterial::SecureElement { handle, .. } => format!("secure-element({handle})"),
        };
        f.debug_struct("Key")
            .field("spec", &self.spec)
            .field("class", &self.class)
            .field("storage", &storage)
            .finish()
    }
}
