use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::secure_element::SoftSecureElement;
use super::{
    CredentialStore, Record, RecordClass, SecureElement, StoreCapabilities, StoreError,
};
use crate::types::Accessibility;

/// In-memory credential store keyed by (class, label)
#[derive(Clone, Default)]
pub struct MemoryCredentialStore {
    records: Arc<RwLock<HashMap<(RecordClass, String), Record>>>,
    secure_element: Option<Arc<SoftSecureElement>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose secure element is simulated in software
    pub fn with_secure_element() -> Self {
        Self {
            records: Arc::default(),
            secure_element: Some(Arc::new(SoftSecureElement::new())),
        }
    }

    pub fn contains(&self, label: &str, class: RecordClass) -> bool {
        self.records
            .read()
            .map(|records| records.contains_key(&(class, label.to_string())))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Backend(format!("memory store lock poisoned: {e}"))
}

impl CredentialStore for MemoryCredentialStore {
    fn save(&self, record: &Record, accessibility: Accessibility) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(poisoned)?;
        let key = (record.class, record.label.clone());
        if records.contains_key(&key) {
            return Err(StoreError::DuplicateEntry);
        }
        let mut stored = record.clone();
        stored.accessibility = accessibility;
        records.insert(key, stored);
        Ok(())
    }

    fn load(&self, label: &str, class: RecordClass) -> Result<Record, StoreError> {
        let records = self.records.read().map_err(poisoned)?;
        records
            .get(&(class, label.to_string()))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn delete(&self, label: &str, class: RecordClass) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(poisoned)?;
        records.remove(&(class, label.to_string()));
        Ok(())
    }

    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities {
            hardware_backed: self.secure_element.is_some(),
            persistent: false,
        }
    }

    fn secure_element(&self) -> Option<&dyn SecureElement> {
        self.secure_element
            .as_deref()
            .map(|se| se as &dyn SecureElement)
    }
}
