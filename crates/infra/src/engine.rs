//! Wiring of the conversion and numbering services over in-memory adapters.

use std::sync::Arc;

use tallyforge_numbering::NumberingGenerator;
use tallyforge_uom::UomService;

use crate::config::{EngineConfig, LogFormat};
use crate::sequence_store::InMemorySequenceStore;
use crate::uom_store::InMemoryUomStore;

#[derive(Debug)]
pub struct Engine {
    pub uom: UomService<Arc<InMemoryUomStore>>,
    pub numbering: NumberingGenerator<Arc<InMemorySequenceStore>>,
}

impl Engine {
    pub fn in_memory(config: &EngineConfig) -> Self {
        let registry = InMemoryUomStore::arc();
        let uom = if config.graph_cache {
            UomService::new(registry)
        } else {
            UomService::uncached(registry)
        };

        tracing::debug!(
            graph_cache = config.graph_cache,
            "engine initialised with in-memory stores"
        );

        Self {
            uom,
            numbering: NumberingGenerator::new(InMemorySequenceStore::arc()),
        }
    }

    pub fn uom_store(&self) -> &Arc<InMemoryUomStore> {
        self.uom.registry()
    }

    pub fn sequence_store(&self) -> &Arc<InMemorySequenceStore> {
        self.numbering.store()
    }
}

/// Install the process-wide subscriber described by `config`.
pub fn init_observability(config: &EngineConfig) {
    tallyforge_observability::init_with(&config.log_filter, config.log_format == LogFormat::Json);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_follows_configuration() {
        let cached = Engine::in_memory(&EngineConfig::default());
        assert!(cached.uom.cache().is_some());

        let uncached = Engine::in_memory(&EngineConfig {
            graph_cache: false,
            ..EngineConfig::default()
        });
        assert!(uncached.uom.cache().is_none());
        assert!(uncached.sequence_store().is_empty().unwrap());
    }

    #[test]
    fn observability_init_is_repeatable() {
        let config = EngineConfig {
            log_format: LogFormat::Plain,
            log_filter: "tallyforge_uom=debug".to_string(),
            ..EngineConfig::default()
        };
        init_observability(&config);
        init_observability(&config);
    }
}
