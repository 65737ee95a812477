//! In-memory numbering sequence store with one mutex per sequence row.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard};

use tallyforge_numbering::{
    NumberingError, NumberingSequence, SequenceKey, SequenceMutation, SequenceStore,
};

type Row = Arc<Mutex<NumberingSequence>>;

fn table_poisoned() -> NumberingError {
    NumberingError::Storage("sequence table lock poisoned".to_string())
}

/// The outer map lock is held only to find a row; the read-modify-write runs
/// under the row's own mutex, so different keys never wait on each other.
#[derive(Debug, Default)]
pub struct InMemorySequenceStore {
    rows: RwLock<HashMap<SequenceKey, Row>>,
}

impl InMemorySequenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn rows(&self) -> Result<RwLockReadGuard<'_, HashMap<SequenceKey, Row>>, NumberingError> {
        self.rows.read().map_err(|_| table_poisoned())
    }

    fn row(&self, key: &SequenceKey) -> Result<Row, NumberingError> {
        self.rows()?
            .get(key)
            .cloned()
            .ok_or_else(|| NumberingError::NotFound(key.clone()))
    }

    pub fn len(&self) -> Result<usize, NumberingError> {
        Ok(self.rows()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, NumberingError> {
        Ok(self.len()? == 0)
    }
}

impl SequenceStore for InMemorySequenceStore {
    fn create(&self, sequence: NumberingSequence) -> Result<(), NumberingError> {
        let mut rows = self.rows.write().map_err(|_| table_poisoned())?;
        let key = sequence.key().clone();
        if rows.contains_key(&key) {
            return Err(NumberingError::AlreadyExists(key));
        }
        rows.insert(key, Arc::new(Mutex::new(sequence)));
        Ok(())
    }

    fn load(&self, key: &SequenceKey) -> Result<Option<NumberingSequence>, NumberingError> {
        let row = match self.row(key) {
            Ok(row) => row,
            Err(NumberingError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        let guard = row
            .lock()
            .map_err(|_| NumberingError::LockPoisoned(key.clone()))?;
        Ok(Some(guard.clone()))
    }

    fn with_exclusive(
        &self,
        key: &SequenceKey,
        mutate: &mut SequenceMutation<'_>,
    ) -> Result<NumberingSequence, NumberingError> {
        let row = self.row(key)?;
        let mut guard = row
            .lock()
            .map_err(|_| NumberingError::LockPoisoned(key.clone()))?;

        // Mutate a draft so a failed mutation commits nothing.
        let mut draft = guard.clone();
        mutate(&mut draft)?;
        *guard = draft.clone();
        Ok(draft)
    }
}
