use workbench_core::sync::PreferencePatch;
use workbench_core::sync::PreferenceRecord;

use crate::contracts::StoreError;

/// Server-side preference document. `merge_patch` folds a partial patch into
/// the stored record and returns the merged result; retrying an identical
/// patch is idempotent.
pub trait PreferenceStore {
    fn fetch(&mut self) -> Result<PreferenceRecord, StoreError>;
    fn merge_patch(&mut self, patch: &PreferencePatch) -> Result<PreferenceRecord, StoreError>;
}

/// Shared-handle adapter: lets an embedder keep a handle on the store it
/// hands to the driver.
impl<S: PreferenceStore> PreferenceStore for std::rc::Rc<std::cell::RefCell<S>> {
    fn fetch(&mut self) -> Result<PreferenceRecord, StoreError> {
        self.borrow_mut().fetch()
    }

    fn merge_patch(&mut self, patch: &PreferencePatch) -> Result<PreferenceRecord, StoreError> {
        self.borrow_mut().merge_patch(patch)
    }
}

/// Backend stand-in holding the record in memory, with injectable failures
/// for exercising the fetch/flush failure paths.
#[derive(Debug, Default)]
pub struct InMemoryPreferenceStore {
    record: PreferenceRecord,
    fail_fetches: usize,
    fail_merges: usize,
    fetch_count: usize,
    merge_count: usize,
}

impl InMemoryPreferenceStore {
    pub fn new(record: PreferenceRecord) -> Self {
        Self {
            record,
            ..Self::default()
        }
    }

    /// Makes the next `n` fetches fail.
    pub fn fail_next_fetches(&mut self, n: usize) {
        self.fail_fetches = n;
    }

    /// Makes the next `n` merges fail.
    pub fn fail_next_merges(&mut self, n: usize) {
        self.fail_merges = n;
    }

    pub fn record(&self) -> &PreferenceRecord {
        &self.record
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count
    }

    pub fn merge_count(&self) -> usize {
        self.merge_count
    }
}

impl PreferenceStore for InMemoryPreferenceStore {
    fn fetch(&mut self) -> Result<PreferenceRecord, StoreError> {
        self.fetch_count += 1;
        if self.fail_fetches > 0 {
            self.fail_fetches -= 1;
            return Err(StoreError::Unavailable("injected fetch failure".into()));
        }
        Ok(self.record.clone())
    }

    fn merge_patch(&mut self, patch: &PreferencePatch) -> Result<PreferenceRecord, StoreError> {
        self.merge_count += 1;
        if self.fail_merges > 0 {
            self.fail_merges -= 1;
            return Err(StoreError::Rejected("injected merge failure".into()));
        }
        self.record.apply(patch);
        Ok(self.record.clone())
    }
}
