//! `NumberingGenerator`: document-number entry points over a [`SequenceStore`].

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use tallyforge_core::{AggregateRoot, ExpectedVersion};

use crate::error::{NumberingError, NumberingResult};
use crate::sequence::{NumberingSequence, SequenceFormat, SequenceKey};
use crate::store::SequenceStore;

#[derive(Debug)]
pub struct NumberingGenerator<S> {
    store: S,
}

impl<S> NumberingGenerator<S>
where
    S: SequenceStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Register a new sequence row.
    #[instrument(level = "debug", skip(self, sequence), fields(sequence = %sequence.key()), err)]
    pub fn create(&self, sequence: NumberingSequence) -> NumberingResult<()> {
        self.store.create(sequence)
    }

    pub fn sequence(&self, key: &SequenceKey) -> NumberingResult<NumberingSequence> {
        self.store
            .load(key)?
            .ok_or_else(|| NumberingError::NotFound(key.clone()))
    }

    /// Issue the next document number for `key`.
    pub fn advance(&self, key: &SequenceKey) -> NumberingResult<String> {
        self.advance_at(key, Utc::now())
    }

    /// Issue the next number as of `at` (which decides the year and month parts).
    #[instrument(level = "debug", skip(self, key), fields(sequence = %key), err)]
    pub fn advance_at(&self, key: &SequenceKey, at: DateTime<Utc>) -> NumberingResult<String> {
        let mut issued = None;
        let committed = self.store.with_exclusive(key, &mut |sequence| {
            issued = Some(sequence.advance(at)?);
            Ok(())
        })?;

        let number = issued.ok_or_else(|| {
            NumberingError::Storage(format!("store committed {key} without running the mutation"))
        })?;

        debug!(
            sequence = %key,
            number = %number,
            next = committed.next_number(),
            "document number issued"
        );
        Ok(number)
    }

    /// The number `advance` would issue now, without issuing it.
    pub fn preview(&self, key: &SequenceKey) -> NumberingResult<String> {
        self.preview_at(key, Utc::now())
    }

    pub fn preview_at(&self, key: &SequenceKey, at: DateTime<Utc>) -> NumberingResult<String> {
        Ok(self.sequence(key)?.preview(at))
    }

    /// Replace the format of a sequence if it is still at `expected` version.
    #[instrument(level = "debug", skip(self, key, format), fields(sequence = %key), err)]
    pub fn reconfigure(
        &self,
        key: &SequenceKey,
        format: SequenceFormat,
        expected: ExpectedVersion,
    ) -> NumberingResult<NumberingSequence> {
        let mut format = Some(format);
        let updated = self.store.with_exclusive(key, &mut |sequence| {
            expected.check(sequence.version())?;
            if let Some(format) = format.take() {
                sequence.reconfigure(format)?;
            }
            Ok(())
        })?;

        info!(sequence = %key, version = updated.version(), "numbering sequence reconfigured");
        Ok(updated)
    }
}
