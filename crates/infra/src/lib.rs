//! Infrastructure layer: in-memory adapters, configuration and wiring.

pub mod config;
pub mod engine;
pub mod fixtures;
pub mod sequence_store;
pub mod uom_store;


pub use config::{EngineConfig, LogFormat};
pub use engine::{Engine, init_observability};
pub use fixtures::UomSnapshot;
pub use sequence_store::InMemorySequenceStore;
pub use uom_store::InMemoryUomStore;
