//! X.509 certificates as opaque, labelled blobs.
//!
//! The crate never validates certificates. It only needs a label to file the
//! certificate under and a way to pull out the subject public key.

use std::fmt;

use x509_parser::oid_registry::{OID_KEY_TYPE_EC_PUBLIC_KEY, OID_PKCS1_RSAENCRYPTION};
use x509_parser::prelude::*;

use crate::error::{KeyError, Result};
use crate::key::Key;
use crate::store::{CredentialStore, Payload, Record, RecordClass, StoreError};
use crate::types::{Accessibility, KeyClass, KeyType};

#[derive(Clone)]
pub struct Certificate {
    der_bytes: Vec<u8>,
    label: String,
    subject: String,
}

fn parse(der_bytes: &[u8]) -> Result<X509Certificate<'_>> {
    let (_, parsed) = X509Certificate::from_der(der_bytes)
        .map_err(|e| KeyError::Certificate(format!("Failed to parse certificate: {e}")))?;
    Ok(parsed)
}

impl Certificate {
    /// Parse a DER certificate. The label is the subject common name, or the
    /// whole subject when it has none.
    pub fn from_der(der_bytes: Vec<u8>) -> Result<Self> {
        let parsed = parse(&der_bytes)?;
        let subject = parsed.subject().to_string();
        let label = parsed
            .subject()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| subject.clone());
        Ok(Self {
            der_bytes,
            label,
            subject,
        })
    }

    /// File the certificate under `label` instead of its subject name.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn der_bytes(&self) -> &[u8] {
        &self.der_bytes
    }

    /// DER `SubjectPublicKeyInfo` of the certified key
    pub fn public_key_info(&self) -> Result<Vec<u8>> {
        let parsed = parse(&self.der_bytes)?;
        Ok(parsed.public_key().raw.to_vec())
    }

    /// The certified public key, for RSA and EC certificates.
    pub fn public_key(&self) -> Result<Key> {
        let parsed = parse(&self.der_bytes)?;
        let spki = parsed.public_key();
        let key_type = if spki.algorithm.algorithm == OID_PKCS1_RSAENCRYPTION {
            KeyType::Rsa
        } else if spki.algorithm.algorithm == OID_KEY_TYPE_EC_PUBLIC_KEY {
            KeyType::EllipticCurve
        } else {
            return Err(KeyError::UnsupportedAlgorithm(format!(
                "certificate key algorithm {}",
                spki.algorithm.algorithm
            )));
        };
        Key::decode(&spki.subject_public_key.data, key_type, KeyClass::Public)
    }

    pub(crate) fn to_record(&self) -> Record {
        Record::data(
            &self.label,
            RecordClass::Certificate,
            None,
            self.der_bytes.clone(),
        )
    }

    pub(crate) fn from_record(record: &Record) -> Result<Self> {
        match &record.payload {
            Payload::Data(bytes) => Ok(Self::from_der(bytes.to_vec())?.with_label(&record.label)),
            Payload::SecureElement { .. } => Err(KeyError::Certificate(format!(
                "certificate record {:?} holds no certificate data",
                record.label
            ))),
        }
    }

    /// Save the certificate under its label.
    pub fn save(
        &self,
        store: &dyn CredentialStore,
        accessibility: Accessibility,
    ) -> std::result::Result<(), StoreError> {
        store.save(&self.to_record(), accessibility)
    }

    pub fn delete(&self, store: &dyn CredentialStore) -> std::result::Result<(), StoreError> {
        store.delete(&self.label, RecordClass::Certificate)
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der_bytes == other.der_bytes
    }
}

impl Eq for Certificate {}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("label", &self.label)
            .field("subject", &self.subject)
            .field("der_len", &self.der_bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCredentialStore;

    fn self_signed(cn: Option<&str>) -> Vec<u8> {
        let mut params = rcgen::CertificateParams::new(vec!["device.local".to_string()]);
        params.distinguished_name = rcgen::DistinguishedName::new();
        match cn {
            Some(cn) => params
                .distinguished_name
                .push(rcgen::DnType::CommonName, cn),
            None => params
                .distinguished_name
                .push(rcgen::DnType::OrganizationName, "Credkit"),
        }
        rcgen::Certificate::from_params(params)
            .unwrap()
            .serialize_der()
            .unwrap()
    }

    #[test]
    fn label_comes_from_common_name() {
        let cert = Certificate::from_der(self_signed(Some("device-7"))).unwrap();
        assert_eq!(cert.label(), "device-7");
        assert_eq!(cert.clone().with_label("other").label(), "other");
    }

    #[test]
    fn label_falls_back_to_subject() {
        let cert = Certificate::from_der(self_signed(None)).unwrap();
        assert_eq!(cert.label(), cert.subject());
        assert!(cert.label().contains("Credkit"));
    }

    #[test]
    fn public_key_is_extracted() {
        let cert = Certificate::from_der(self_signed(Some("k"))).unwrap();
        let key = cert.public_key().unwrap();
        assert_eq!(key.key_type(), KeyType::EllipticCurve);
        assert_eq!(key.bits(), 256);
        assert!(!cert.public_key_info().unwrap().is_empty());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            Certificate::from_der(vec![0x30, 0x03, 0x01, 0x01, 0x00]),
            Err(KeyError::Certificate(_))
        ));
    }

    #[test]
    fn record_roundtrip_keeps_label() {
        let store = MemoryCredentialStore::new();
        let cert = Certificate::from_der(self_signed(Some("cn"))).unwrap().with_label("custom");
        cert.save(&store, Accessibility::default()).unwrap();
        let record = store.load("custom", RecordClass::Certificate).unwrap();
        let loaded = Certificate::from_record(&record).unwrap();
        assert_eq!(loaded, cert);
        assert_eq!(loaded.label(), "custom");
    }
}
