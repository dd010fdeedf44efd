//! A certificate bound to its private key through a shared store label.
//!
//! An [`Identity`] is a handle on two store records: a certificate and a
//! private key, both filed under the certificate's label. Nothing checks
//! that the certificate actually certifies that key; callers are expected to
//! pair them correctly.

use std::fmt;
use std::sync::Arc;

use credkit_common::logging::{Component, Logger};

use crate::certificate::Certificate;
use crate::error::{KeyError, Result};
use crate::key::Key;
use crate::keypair::KeyPair;
use crate::rollback::Rollback;
use crate::store::{CredentialStore, RecordClass, StoreError};
use crate::types::{Accessibility, KeyClass};
use crate::{log_debug, log_info};

pub struct Identity {
    label: String,
    store: Arc<dyn CredentialStore>,
    logger: Arc<Logger>,
}

impl Identity {
    /// Store `private_key` and then `certificate` under the certificate's
    /// label and return the resulting identity.
    ///
    /// Records that already exist are accepted as they are. If a save fails,
    /// anything this call stored is removed and [`KeyError::SaveFailed`] is
    /// returned.
    pub fn create(
        certificate: &Certificate,
        private_key: &Key,
        accessibility: Accessibility,
        store: Arc<dyn CredentialStore>,
        logger: Arc<Logger>,
    ) -> Result<Self> {
        if !private_key.is_private() {
            return Err(KeyError::InvalidConfiguration(
                "an identity needs a private key".to_string(),
            ));
        }
        let label = certificate.label();
        let scoped = logger.with_component(Component::Identity).with_label(label);

        let mut rollback = Rollback::new(store.as_ref(), &scoped);
        rollback
            .save(&private_key.to_record(label), accessibility)
            .map_err(|e| KeyError::SaveFailed(format!("private key {label:?}: {e}")))?;
        rollback
            .save(&certificate.to_record(), accessibility)
            .map_err(|e| KeyError::SaveFailed(format!("certificate {label:?}: {e}")))?;
        rollback.commit();

        log_info!(scoped, "identity stored");
        Self::load(certificate, store, logger)
    }

    /// [`Identity::create`] with the private half of `key_pair`.
    pub fn create_with_key_pair(
        certificate: &Certificate,
        key_pair: &KeyPair,
        accessibility: Accessibility,
        store: Arc<dyn CredentialStore>,
        logger: Arc<Logger>,
    ) -> Result<Self> {
        Self::create(
            certificate,
            key_pair.private_key(),
            accessibility,
            store,
            logger,
        )
    }

    /// Look up the identity filed under the certificate's label.
    pub fn load(
        certificate: &Certificate,
        store: Arc<dyn CredentialStore>,
        logger: Arc<Logger>,
    ) -> Result<Self> {
        let label = certificate.label();
        for class in [RecordClass::Certificate, RecordClass::PrivateKey] {
            match store.load(label, class) {
                Ok(_) => {}
                Err(StoreError::NotFound) => {
                    return Err(KeyError::LoadFailed(format!(
                        "no {} stored for identity {label:?}",
                        class.as_str()
                    )));
                }
                Err(e) => {
                    return Err(KeyError::LoadFailed(format!(
                        "identity {label:?} {}: {e}",
                        class.as_str()
                    )));
                }
            }
        }
        Ok(Self {
            label: label.to_string(),
            store,
            logger: Arc::new(logger.with_component(Component::Identity).with_label(label)),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Read the private key back from the store.
    pub fn private_key(&self) -> Result<Key> {
        let record = self
            .store
            .load(&self.label, RecordClass::PrivateKey)
            .map_err(|e| {
                log_debug!(self.logger, "private key unavailable: {e}");
                KeyError::CopyPrivateKeyFailed
            })?;
        Key::from_record(&record, KeyClass::Private, &self.store).map_err(|e| {
            log_debug!(self.logger, "private key unreadable: {e}");
            KeyError::CopyPrivateKeyFailed
        })
    }

    /// Read the certificate back from the store.
    pub fn certificate(&self) -> Result<Certificate> {
        let record = self
            .store
            .load(&self.label, RecordClass::Certificate)
            .map_err(|e| {
                log_debug!(self.logger, "certificate unavailable: {e}");
                KeyError::CopyCertificateFailed
            })?;
        Certificate::from_record(&record).map_err(|e| {
            log_debug!(self.logger, "certificate unreadable: {e}");
            KeyError::CopyCertificateFailed
        })
    }

    /// Remove the certificate and private key records. Missing records are
    /// not an error. A key held in a secure element stays there.
    pub fn delete(&self) -> Result<()> {
        let mut failures = Vec::new();
        for class in [RecordClass::Certificate, RecordClass::PrivateKey] {
            if let Err(e) = self.store.delete(&self.label, class) {
                failures.push(format!("{}: {e}", class.as_str()));
            }
        }
        if !failures.is_empty() {
            return Err(KeyError::DeleteFailed(format!(
                "identity {:?}: {}",
                self.label,
                failures.join("; ")
            )));
        }
        log_info!(self.logger, "identity deleted");
        Ok(())
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("label", &self.label)
            .finish()
    }
}
