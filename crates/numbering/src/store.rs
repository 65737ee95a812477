//! Storage seam for numbering sequences.

use std::sync::Arc;

use crate::error::NumberingError;
use crate::sequence::{NumberingSequence, SequenceKey};

/// Mutation applied to a sequence inside its exclusive section.
pub type SequenceMutation<'a> =
    dyn FnMut(&mut NumberingSequence) -> Result<(), NumberingError> + 'a;

/// Sequence persistence with a row-scoped exclusive lock.
///
/// `with_exclusive` is the only way to change a stored sequence. Implementations
/// must make the read, the mutation and the write one atomic unit against every
/// other caller for the same key, commit only when the mutation returns `Ok`, and
/// return the committed state. Callers for the same key block until the holder
/// finishes. Keys never contend with each other.
pub trait SequenceStore: Send + Sync {
    fn create(&self, sequence: NumberingSequence) -> Result<(), NumberingError>;

    /// Consistent snapshot; never observes a half-applied mutation.
    fn load(&self, key: &SequenceKey) -> Result<Option<NumberingSequence>, NumberingError>;

    fn with_exclusive(
        &self,
        key: &SequenceKey,
        mutate: &mut SequenceMutation<'_>,
    ) -> Result<NumberingSequence, NumberingError>;
}

impl<S> SequenceStore for Arc<S>
where
    S: SequenceStore + ?Sized,
{
    fn create(&self, sequence: NumberingSequence) -> Result<(), NumberingError> {
        (**self).create(sequence)
    }

    fn load(&self, key: &SequenceKey) -> Result<Option<NumberingSequence>, NumberingError> {
        (**self).load(key)
    }

    fn with_exclusive(
        &self,
        key: &SequenceKey,
        mutate: &mut SequenceMutation<'_>,
    ) -> Result<NumberingSequence, NumberingError> {
        (**self).with_exclusive(key, mutate)
    }
}
