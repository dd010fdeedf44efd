//! Scoped cleanup for multi-record writes.
//!
//! The credential store has no transactions, so operations that write more
//! than one record go through a [`Rollback`] guard. Records saved through the
//! guard are deleted again, newest first, unless [`Rollback::commit`] is
//! called. Records that already existed are never touched.

use credkit_common::logging::Logger;

use crate::log_warn;
use crate::store::{CredentialStore, Record, RecordClass, StoreError};
use crate::types::Accessibility;

/// Outcome of a save made through the guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Saved {
    Written,
    /// The store already held a record with this label and class
    AlreadyPresent,
}

pub(crate) struct Rollback<'a> {
    store: &'a dyn CredentialStore,
    logger: &'a Logger,
    written: Vec<(String, RecordClass)>,
    element_keys: Vec<String>,
    committed: bool,
}

impl<'a> Rollback<'a> {
    pub(crate) fn new(store: &'a dyn CredentialStore, logger: &'a Logger) -> Self {
        Self {
            store,
            logger,
            written: Vec::new(),
            element_keys: Vec::new(),
            committed: false,
        }
    }

    /// Save `record`, remembering it for cleanup if this call created it.
    pub(crate) fn save(
        &mut self,
        record: &Record,
        accessibility: Accessibility,
    ) -> Result<Saved, StoreError> {
        match self.store.save(record, accessibility) {
            Ok(()) => {
                self.written.push((record.label.clone(), record.class));
                Ok(Saved::Written)
            }
            Err(StoreError::DuplicateEntry) => Ok(Saved::AlreadyPresent),
            Err(e) => Err(e),
        }
    }

    /// Remember a key generated inside the store's secure element.
    pub(crate) fn track_element_key(&mut self, handle: &str) {
        self.element_keys.push(handle.to_string());
    }

    pub(crate) fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for Rollback<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        for (label, class) in self.written.drain(..).rev() {
            if let Err(e) = self.store.delete(&label, class) {
                log_warn!(
                    self.logger,
                    "rollback could not delete {} record {label:?}: {e}",
                    class.as_str()
                );
            }
        }
        if self.element_keys.is_empty() {
            return;
        }
        let Some(se) = self.store.secure_element() else {
            return;
        };
        for handle in self.element_keys.drain(..).rev() {
            if let Err(e) = se.delete(&handle) {
                log_warn!(
                    self.logger,
                    "rollback could not delete secure element key {handle:?}: {e}"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCredentialStore;
    use credkit_common::logging::Component;

    fn logger() -> Logger {
        Logger::new_root(Component::Store, "rollback-test")
    }

    #[test]
    fn uncommitted_writes_are_removed() {
        let store = MemoryCredentialStore::new();
        let logger = logger();
        let existing = Record::data("pre", RecordClass::Certificate, None, vec![1]);
        store.save(&existing, Accessibility::default()).unwrap();
        {
            let mut guard = Rollback::new(&store, &logger);
            assert_eq!(
                guard.save(&existing, Accessibility::default()).unwrap(),
                Saved::AlreadyPresent
            );
            let fresh = Record::data("new", RecordClass::Certificate, None, vec![2]);
            assert_eq!(
                guard.save(&fresh, Accessibility::default()).unwrap(),
                Saved::Written
            );
        }
        assert!(store.contains("pre", RecordClass::Certificate));
        assert!(!store.contains("new", RecordClass::Certificate));
    }

    #[test]
    fn committed_writes_stay() {
        let store = MemoryCredentialStore::new();
        let logger = logger();
        let mut guard = Rollback::new(&store, &logger);
        let record = Record::data("kept", RecordClass::Certificate, None, vec![3]);
        guard.save(&record, Accessibility::default()).unwrap();
        guard.commit();
        assert!(store.contains("kept", RecordClass::Certificate));
    }
}
