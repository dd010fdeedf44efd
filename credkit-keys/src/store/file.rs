//! Software credential store persisted under a base directory.
//!
//! Layout: `<base_dir>/<class>/<hex(sha256(label))>.rec`, one bincode-encoded
//! record per file. The label itself lives inside the record. New records are
//! written to a temp file and moved into place without clobbering, so a
//! concurrent writer of the same label sees `AlreadyExists` instead of
//! overwriting.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::sync::Arc;

use credkit_common::logging::{Component, Logger};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use zeroize::Zeroizing;

use super::{CredentialStore, Payload, Record, RecordClass, StoreCapabilities, StoreError};
use crate::types::{Accessibility, KeySpec};
use crate::log_debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStoreConfig {
    pub base_dir: PathBuf,
}

impl FileStoreConfig {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }
}

#[derive(Serialize, Deserialize)]
enum FilePayload {
    Data(Vec<u8>),
    SecureElement { handle: String },
}

#[derive(Serialize, Deserialize)]
struct FileRecord {
    label: String,
    key_spec: Option<KeySpec>,
    accessibility: Accessibility,
    payload: FilePayload,
}

impl Drop for FileRecord {
    fn drop(&mut self) {
        if let FilePayload::Data(bytes) = &mut self.payload {
            zeroize::Zeroize::zeroize(bytes);
        }
    }
}

pub struct FileCredentialStore {
    config: FileStoreConfig,
    logger: Arc<Logger>,
}

impl FileCredentialStore {
    pub fn new(config: FileStoreConfig, logger: Arc<Logger>) -> Result<Self, StoreError> {
        for class in [
            RecordClass::PublicKey,
            RecordClass::PrivateKey,
            RecordClass::Certificate,
        ] {
            fs::create_dir_all(config.base_dir.join(class.as_str()))?;
        }
        Ok(Self {
            config,
            logger: Arc::new(logger.with_component(Component::Store)),
        })
    }

    pub fn config(&self) -> &FileStoreConfig {
        &self.config
    }

    fn path_for(&self, label: &str, class: RecordClass) -> PathBuf {
        self.config
            .base_dir
            .join(class.as_str())
            .join(format!("{}.rec", hex::encode(Sha256::digest(label.as_bytes()))))
    }
}

impl CredentialStore for FileCredentialStore {
    fn save(&self, record: &Record, accessibility: Accessibility) -> Result<(), StoreError> {
        let path = self.path_for(&record.label, record.class);

        let payload = match &record.payload {
            Payload::Data(bytes) => FilePayload::Data(bytes.to_vec()),
            Payload::SecureElement { handle } => FilePayload::SecureElement {
                handle: handle.clone(),
            },
        };
        let file_record = FileRecord {
            label: record.label.clone(),
            key_spec: record.key_spec,
            accessibility,
            payload,
        };
        let encoded = Zeroizing::new(
            bincode::serialize(&file_record)
                .map_err(|e| StoreError::Serialization(e.to_string()))?,
        );

        // The temp file is removed on drop, so a failed write leaves nothing behind.
        let dir = path
            .parent()
            .ok_or_else(|| StoreError::Backend(format!("no parent for {}", path.display())))?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&encoded)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        match tmp.persist_noclobber(&path).map_err(|e| e.error) {
            Ok(_) => {
                log_debug!(
                    self.logger,
                    "saved {} record {:?}",
                    record.class.as_str(),
                    record.label
                );
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(StoreError::DuplicateEntry),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn load(&self, label: &str, class: RecordClass) -> Result<Record, StoreError> {
        let path = self.path_for(label, class);
        let bytes = match fs::read(&path) {
            Ok(bytes) => Zeroizing::new(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(StoreError::NotFound),
            Err(e) => return Err(StoreError::Io(e)),
        };
        let mut file_record: FileRecord = bincode::deserialize(&bytes)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        if file_record.label != label {
            return Err(StoreError::Backend(format!(
                "record at {} is labelled {:?}",
                path.display(),
                file_record.label
            )));
        }

        let payload = match &mut file_record.payload {
            FilePayload::Data(data) => Payload::Data(Zeroizing::new(std::mem::take(data))),
            FilePayload::SecureElement { handle } => Payload::SecureElement {
                handle: handle.clone(),
            },
        };
        Ok(Record {
            label: label.to_string(),
            class,
            key_spec: file_record.key_spec,
            accessibility: file_record.accessibility,
            payload,
        })
    }

    fn delete(&self, label: &str, class: RecordClass) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(label, class)) {
            Ok(()) => {
                log_debug!(self.logger, "deleted {} record {:?}", class.as_str(), label);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities {
            hardware_backed: false,
            persistent: true,
        }
    }
}
