//! `tallyforge-numbering` — per-tenant document number sequences.
//!
//! Each (tenant, document type) owns one [`NumberingSequence`]. Issuing a number
//! is a read-modify-write under that sequence's exclusive lock, so concurrent
//! document creation never receives duplicate numbers.

pub mod error;
pub mod generator;
pub mod sequence;
pub mod store;

pub use error::{NumberingError, NumberingResult};
pub use generator::NumberingGenerator;
pub use sequence::{DocumentType, MAX_PADDING, NumberingSequence, SequenceFormat, SequenceKey};
pub use store::{SequenceMutation, SequenceStore};
