//! Key pair lifecycle: persist, load, export, delete.

use std::fmt;
use std::sync::Arc;

use credkit_common::logging::{Component, Logger};
use zeroize::Zeroizing;

use crate::error::{KeyError, Result};
use crate::key::{Key, KeyMaterial};
use crate::rollback::Rollback;
use crate::store::{CredentialStore, RecordClass, StoreError};
use crate::types::{Accessibility, DigestAlgorithm, KeyClass, KeySpec, Padding};
use crate::{log_debug, log_info};

/// A public key and the private key it belongs to, sharing one store label.
pub struct KeyPair {
    public: Key,
    private: Key,
    label: String,
    store: Arc<dyn CredentialStore>,
    logger: Arc<Logger>,
}

impl KeyPair {
    pub(crate) fn new(
        public: Key,
        private: Key,
        label: &str,
        store: Arc<dyn CredentialStore>,
        logger: Arc<Logger>,
    ) -> Self {
        Self {
            public,
            private,
            label: label.to_string(),
            store,
            logger: Arc::new(logger.with_component(Component::Keys).with_label(label)),
        }
    }

    /// Open a pair previously persisted under `label`.
    pub fn load(store: Arc<dyn CredentialStore>, label: &str, logger: Arc<Logger>) -> Result<Self> {
        let load = |class: RecordClass| {
            store.load(label, class).map_err(|e| match e {
                StoreError::NotFound => {
                    KeyError::LoadFailed(format!("no {} stored under {label:?}", class.as_str()))
                }
                other => KeyError::LoadFailed(format!(
                    "loading {} {label:?}: {other}",
                    class.as_str()
                )),
            })
        };
        let private_record = load(RecordClass::PrivateKey)?;
        let public_record = load(RecordClass::PublicKey)?;
        let private = Key::from_record(&private_record, KeyClass::Private, &store)?;
        let public = Key::from_record(&public_record, KeyClass::Public, &store)?;
        if private.spec() != public.spec() {
            return Err(KeyError::LoadFailed(format!(
                "{label:?} pairs a {} private key with a {} public key",
                private.spec(),
                public.spec()
            )));
        }
        Ok(Self::new(public, private, label, store, logger))
    }

    /// Rebuild a pair around an existing private key, deriving its public half.
    pub fn from_private_key(
        private: Key,
        label: &str,
        store: Arc<dyn CredentialStore>,
        logger: Arc<Logger>,
    ) -> Result<Self> {
        if !private.is_private() {
            return Err(KeyError::InvalidConfiguration(
                "a key pair needs a private key".to_string(),
            ));
        }
        let public = private.public_key()?;
        Ok(Self::new(public, private, label, store, logger))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn spec(&self) -> KeySpec {
        self.private.spec()
    }

    pub fn public_key(&self) -> &Key {
        &self.public
    }

    pub fn private_key(&self) -> &Key {
        &self.private
    }

    /// Save both halves under the pair's label.
    ///
    /// Halves that are already stored count as saved. If a save fails, the
    /// halves written by this call are removed again.
    pub fn persist(&self, accessibility: Accessibility) -> Result<()> {
        if self.label.is_empty() {
            return Err(KeyError::InvalidConfiguration(
                "cannot persist a key pair without a label".to_string(),
            ));
        }
        let mut rollback = Rollback::new(self.store.as_ref(), &self.logger);
        for key in [&self.private, &self.public] {
            let saved = rollback
                .save(&key.to_record(&self.label), accessibility)
                .map_err(|e| {
                    KeyError::SaveFailed(format!(
                        "{} {:?}: {e}",
                        key.record_class().as_str(),
                        self.label
                    ))
                })?;
            log_debug!(self.logger, "{} {:?}", key.record_class().as_str(), saved);
        }
        rollback.commit();
        Ok(())
    }

    /// Remove both halves from the store. Missing records are not an error.
    pub fn delete(&self) -> Result<()> {
        let mut failures = Vec::new();
        for key in [&self.private, &self.public] {
            if let Err(e) = key.delete(self.store.as_ref(), &self.label) {
                failures.push(format!("{}: {e}", key.record_class().as_str()));
            }
        }
        if let KeyMaterial::SecureElement { handle, store } = self.private.material() {
            if let Some(se) = store.secure_element() {
                if let Err(e) = se.delete(handle) {
                    failures.push(format!("secure element key {handle}: {e}"));
                }
            }
        }
        if !failures.is_empty() {
            return Err(KeyError::DeleteFailed(format!(
                "{:?}: {}",
                self.label,
                failures.join("; ")
            )));
        }
        log_info!(self.logger, "deleted key pair");
        Ok(())
    }

    pub fn export_public_key(&self) -> Result<Zeroizing<Vec<u8>>> {
        self.public.encode()
    }

    /// Fails with [`KeyError::NotExtractable`] for secure element keys.
    pub fn export_private_key(&self) -> Result<Zeroizing<Vec<u8>>> {
        self.private.encode()
    }

    pub fn encrypt(&self, plaintext: &[u8], padding: Padding) -> Result<Vec<u8>> {
        self.public.encrypt(plaintext, padding)
    }

    pub fn decrypt(&self, ciphertext: &[u8], padding: Padding) -> Result<Zeroizing<Vec<u8>>> {
        self.private.decrypt(ciphertext, padding)
    }

    pub fn sign(&self, message: &[u8], digest: DigestAlgorithm) -> Result<Vec<u8>> {
        self.private.sign(message, digest)
    }

    pub fn verify(&self, message: &[u8], signature: &[u8], digest: DigestAlgorithm) -> Result<bool> {
        self.public.verify(message, signature, digest)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("label", &self.label)
            .field("public", &self.public)
            .field("private", &self.private)
            .finish()
    }
}
