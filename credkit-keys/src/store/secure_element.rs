//! Software simulation of a hardware secure element.
//!
//! Mirrors what enclave hardware offers: P-256 only, keys generated in place,
//! no export path for the private scalar.

use std::collections::HashMap;
use std::sync::RwLock;

use p256::ecdsa::signature::hazmat::PrehashSigner;
use p256::ecdsa::{Signature, SigningKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::SecretKey;
use rand::rngs::OsRng;

use super::{SecureElement, StoreError};
use crate::types::{Accessibility, Curve, KeySpec};

struct ElementKey {
    secret: SecretKey,
    accessibility: Accessibility,
}

#[derive(Default)]
pub struct SoftSecureElement {
    keys: RwLock<HashMap<String, ElementKey>>,
}

impl SoftSecureElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, handle: &str) -> bool {
        self.keys
            .read()
            .map(|keys| keys.contains_key(handle))
            .unwrap_or(false)
    }

    /// Policy the key under `handle` was generated with
    pub fn accessibility(&self, handle: &str) -> Option<Accessibility> {
        self.keys
            .read()
            .ok()
            .and_then(|keys| keys.get(handle).map(|key| key.accessibility))
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Backend(format!("secure element lock poisoned: {e}"))
}

impl SecureElement for SoftSecureElement {
    fn supports(&self, spec: KeySpec) -> bool {
        matches!(spec, KeySpec::EllipticCurve(Curve::P256))
    }

    fn generate(
        &self,
        handle: &str,
        spec: KeySpec,
        accessibility: Accessibility,
    ) -> Result<Vec<u8>, StoreError> {
        if !self.supports(spec) {
            return Err(StoreError::Backend(format!(
                "secure element cannot hold {spec} keys"
            )));
        }
        let mut keys = self.keys.write().map_err(poisoned)?;
        if keys.contains_key(handle) {
            return Err(StoreError::DuplicateEntry);
        }
        let secret = SecretKey::random(&mut OsRng);
        let point = secret.public_key().to_encoded_point(false).as_bytes().to_vec();
        keys.insert(
            handle.to_string(),
            ElementKey {
                secret,
                accessibility,
            },
        );
        Ok(point)
    }

    fn public_key(&self, handle: &str) -> Result<Vec<u8>, StoreError> {
        let keys = self.keys.read().map_err(poisoned)?;
        let key = keys.get(handle).ok_or(StoreError::NotFound)?;
        Ok(key
            .secret
            .public_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec())
    }

    fn sign_prehash(&self, handle: &str, prehash: &[u8]) -> Result<Vec<u8>, StoreError> {
        let keys = self.keys.read().map_err(poisoned)?;
        let key = keys.get(handle).ok_or(StoreError::NotFound)?;
        let signing_key = SigningKey::from(key.secret.clone());
        let signature: Signature = signing_key
            .sign_prehash(prehash)
            .map_err(|e| StoreError::Backend(format!("secure element signing failed: {e}")))?;
        Ok(signature.to_der().as_bytes().to_vec())
    }

    fn delete(&self, handle: &str) -> Result<(), StoreError> {
        let mut keys = self.keys.write().map_err(poisoned)?;
        keys.remove(handle);
        Ok(())
    }
}
