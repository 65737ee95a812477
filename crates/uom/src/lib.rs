//! `tallyforge-uom` — unit-of-measure conversion engine.
//!
//! Quantities move between units of the same group through a bidirectional,
//! decimal-weighted graph anchored on the group's base unit:
//!
//! - [`graph`]: builds the graph of one (tenant, group) from stored edges.
//! - [`path`]: breadth-first shortest path with per-hop factors.
//! - [`convert`]: applies a path to a quantity or unit price and rounds.
//! - [`cycle`]: depth-first cycle detection.
//! - [`validate`]: group-membership and path-existence pre-flight check.
//! - [`service`]: registry-backed entry points with an optional graph cache.
//!
//! All arithmetic is `rust_decimal::Decimal`; nothing here touches binary floats.

pub mod cache;
pub mod convert;
pub mod cycle;
pub mod error;
pub mod graph;
pub mod model;
pub mod path;
pub mod registry;
pub mod service;
pub mod validate;

pub use cache::{CacheGeneration, GraphCache};
pub use convert::QuantityConverter;
pub use cycle::CycleDetector;
pub use error::{RegistryError, UomError, UomResult};
pub use graph::{ConversionArc, ConversionGraph, NodeIx};
pub use model::{ConversionEdge, Factor, Precision, Unit, UnitGroup, normalize_code};
pub use path::{ConversionPath, PathFinder, PathStep};
pub use registry::{EdgeStore, UomRegistry};
pub use service::UomService;
pub use validate::{ChainCheck, ChainValidator};
