//! Shared fixtures for the credkit-keys integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use credkit_common::logging::{Component, Logger};
use credkit_keys::{
    Accessibility, CredentialStore, GeneratorConfig, KeyPair, KeyPairGenerator, KeyType,
    MemoryCredentialStore, Record, RecordClass, SecureElement, StoreCapabilities, StoreError,
};
use once_cell::sync::Lazy;
use rand::RngCore;

// Each test binary uses a different subset of these helpers.

#[allow(dead_code)]
pub fn logger() -> Arc<Logger> {
    Arc::new(Logger::new_root(Component::Keys, "credkit-test"))
}

#[allow(dead_code)]
pub fn generate(store: Arc<dyn CredentialStore>, config: &GeneratorConfig) -> KeyPair {
    KeyPairGenerator::new(store, logger())
        .generate(config)
        .expect("key pair generation")
}

/// RSA-2048 generation is slow, so one pair is shared by every test in a binary
#[allow(dead_code)]
pub static RSA_2048: Lazy<KeyPair> = Lazy::new(|| {
    generate(
        Arc::new(MemoryCredentialStore::new()),
        &GeneratorConfig::new(KeyType::Rsa, 2048, "shared-rsa-2048"),
    )
});

#[allow(dead_code)]
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// Self-signed certificate with `cn` as common name, issued for the given
/// SEC1 EC P-256 private key.
#[allow(dead_code)]
pub fn p256_certificate(cn: &str, sec1_private_key: &[u8]) -> Vec<u8> {
    use p256::pkcs8::EncodePrivateKey;

    let secret = p256::SecretKey::from_sec1_der(sec1_private_key).expect("sec1 key");
    let pkcs8 = secret.to_pkcs8_der().expect("pkcs8 encoding");
    let key_pair = rcgen::KeyPair::from_der(pkcs8.as_bytes()).expect("rcgen key pair");

    let mut params = rcgen::CertificateParams::new(vec![format!("{cn}.local")]);
    params.alg = &rcgen::PKCS_ECDSA_P256_SHA256;
    params.key_pair = Some(key_pair);
    params.distinguished_name = rcgen::DistinguishedName::new();
    params
        .distinguished_name
        .push(rcgen::DnType::CommonName, cn);
    rcgen::Certificate::from_params(params)
        .expect("certificate params")
        .serialize_der()
        .expect("certificate DER")
}

/// Store double that fails chosen calls and forwards the rest.
#[allow(dead_code)]
pub struct FlakyStore {
    pub inner: MemoryCredentialStore,
    /// 1-based index of the save call that fails, 0 for never
    fail_save_at: usize,
    fail_deletes: bool,
    saves: AtomicUsize,
}

#[allow(dead_code)]
impl FlakyStore {
    pub fn failing_save(n: usize) -> Self {
        Self {
            inner: MemoryCredentialStore::new(),
            fail_save_at: n,
            fail_deletes: false,
            saves: AtomicUsize::new(0),
        }
    }

    pub fn failing_deletes() -> Self {
        Self {
            inner: MemoryCredentialStore::new(),
            fail_save_at: 0,
            fail_deletes: true,
            saves: AtomicUsize::new(0),
        }
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl CredentialStore for FlakyStore {
    fn save(&self, record: &Record, accessibility: Accessibility) -> Result<(), StoreError> {
        let n = self.saves.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.fail_save_at {
            return Err(StoreError::Backend(format!("injected failure on save {n}")));
        }
        self.inner.save(record, accessibility)
    }

    fn load(&self, label: &str, class: RecordClass) -> Result<Record, StoreError> {
        self.inner.load(label, class)
    }

    fn delete(&self, label: &str, class: RecordClass) -> Result<(), StoreError> {
        if self.fail_deletes {
            return Err(StoreError::Backend("injected delete failure".to_string()));
        }
        self.inner.delete(label, class)
    }

    fn capabilities(&self) -> StoreCapabilities {
        self.inner.capabilities()
    }

    fn secure_element(&self) -> Option<&dyn SecureElement> {
        self.inner.secure_element()
    }
}
