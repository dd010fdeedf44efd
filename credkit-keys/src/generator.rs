//! Key pair generation.
//!
//! [`KeyPairGenerator`] validates a [`GeneratorConfig`], produces a fresh pair
//! (in memory or inside the store's secure element) and, when asked to,
//! persists both halves under the configured label. A failed write removes
//! whatever the call already stored.

use std::sync::Arc;

use credkit_common::logging::{Component, Logger};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use rsa::pkcs1::{EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{KeyError, Result};
use crate::key::Key;
use crate::keypair::KeyPair;
use crate::log_debug;
use crate::macros::with_curve;
use crate::rollback::{Rollback, Saved};
use crate::store::CredentialStore;
use crate::types::{Accessibility, KeyClass, KeySpec, KeyType};

/// What to generate and where to keep it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub key_type: KeyType,
    /// Modulus size for RSA, curve size for EC
    pub key_size: usize,
    pub label: String,
    #[serde(default)]
    pub accessibility: Accessibility,
    /// Write both halves to the store as part of generation
    #[serde(default)]
    pub persistent: bool,
    /// Generate the private key inside the store's secure element
    #[serde(default)]
    pub secure_element: bool,
}

impl GeneratorConfig {
    pub fn new(key_type: KeyType, key_size: usize, label: impl Into<String>) -> Self {
        Self {
            key_type,
            key_size,
            label: label.into(),
            accessibility: Accessibility::default(),
            persistent: false,
            secure_element: false,
        }
    }

    pub fn with_accessibility(mut self, accessibility: Accessibility) -> Self {
        self.accessibility = accessibility;
        self
    }

    pub fn with_persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    pub fn with_secure_element(mut self, secure_element: bool) -> Self {
        self.secure_element = secure_element;
        self
    }

    /// Validate the configuration and return the requested key spec.
    pub fn key_spec(&self) -> Result<KeySpec> {
        if self.label.is_empty() {
            return Err(KeyError::InvalidConfiguration(
                "key pair label must not be empty".to_string(),
            ));
        }
        KeySpec::new(self.key_type, self.key_size)
    }
}

pub struct KeyPairGenerator {
    store: Arc<dyn CredentialStore>,
    logger: Arc<Logger>,
}

impl KeyPairGenerator {
    pub fn new(store: Arc<dyn CredentialStore>, logger: Arc<Logger>) -> Self {
        Self {
            store,
            logger: Arc::new(logger.with_component(Component::Generator)),
        }
    }

    pub fn generate(&self, config: &GeneratorConfig) -> Result<KeyPair> {
        let spec = config.key_spec()?;
        let label = config.label.as_str();

        let element = if config.secure_element {
            let se = self.store.secure_element().ok_or_else(|| {
                KeyError::UnsupportedStoreTarget("store has no secure element".to_string())
            })?;
            if !se.supports(spec) {
                return Err(KeyError::UnsupportedStoreTarget(format!(
                    "secure element cannot generate {spec} keys"
                )));
            }
            Some(se)
        } else {
            None
        };

        let mut rollback = Rollback::new(self.store.as_ref(), &self.logger);

        let (public, private) = match element {
            Some(se) => {
                let point = se
                    .generate(label, spec, config.accessibility)
                    .map_err(|e| KeyError::GenerationFailed(format!("secure element: {e}")))?;
                rollback.track_element_key(label);
                let public = Key::decode(&point, KeyType::EllipticCurve, KeyClass::Public)
                    .map_err(|e| KeyError::GenerationFailed(format!("secure element point: {e}")))?;
                let private = Key::secure_element(spec, label, Arc::clone(&self.store));
                (public, private)
            }
            None => {
                let (public, private) = generate_material(spec)?;
                (
                    Key::resident(spec, KeyClass::Public, public),
                    Key::resident(spec, KeyClass::Private, private),
                )
            }
        };

        let id = public.compact_id()?;
        if config.persistent {
            for key in [&private, &public] {
                match rollback.save(&key.to_record(label), config.accessibility) {
                    Ok(Saved::Written) => {}
                    Ok(Saved::AlreadyPresent) => {
                        return Err(KeyError::GenerationFailed(format!(
                            "label {label:?} already holds a {}",
                            key.record_class().as_str()
                        )));
                    }
                    Err(e) => {
                        return Err(KeyError::GenerationFailed(format!(
                            "saving {} for {label:?}: {e}",
                            key.record_class().as_str()
                        )));
                    }
                }
            }
        }
        rollback.commit();

        log_debug!(
            self.logger,
            "generated {spec} key pair {label:?} id={id} secure_element={} persistent={}",
            config.secure_element,
            config.persistent
        );
        Ok(KeyPair::new(
            public,
            private,
            label,
            Arc::clone(&self.store),
            Arc::clone(&self.logger),
        ))
    }
}

/// Fresh key material for `spec`, returned as (public, private) standard
/// encodings.
pub(crate) fn generate_material(spec: KeySpec) -> Result<(Zeroizing<Vec<u8>>, Zeroizing<Vec<u8>>)> {
    match spec {
        KeySpec::Rsa { bits } => {
            let private = RsaPrivateKey::new(&mut OsRng, bits)
                .map_err(|e| KeyError::GenerationFailed(format!("RSA-{bits}: {e}")))?;
            let private_der = private
                .to_pkcs1_der()
                .map_err(|e| KeyError::GenerationFailed(format!("RSA private key: {e}")))?;
            let public_der = private
                .to_public_key()
                .to_pkcs1_der()
                .map_err(|e| KeyError::GenerationFailed(format!("RSA public key: {e}")))?;
            Ok((
                Zeroizing::new(public_der.as_bytes().to_vec()),
                Zeroizing::new(private_der.as_bytes().to_vec()),
            ))
        }
        KeySpec::EllipticCurve(curve) => {
            let pair = with_curve!(curve, c => {
                let secret = c::SecretKey::random(&mut OsRng);
                let point = secret.public_key().to_encoded_point(false).as_bytes().to_vec();
                let der = secret
                    .to_sec1_der()
                    .map_err(|e| KeyError::GenerationFailed(format!("{spec} private key: {e}")))?;
                (Zeroizing::new(point), der)
            });
            Ok(pair)
        }
    }
}
