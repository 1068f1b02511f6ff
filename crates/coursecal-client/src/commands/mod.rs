//! Command implementations.

pub mod config;
pub mod events;

use std::path::PathBuf;

use coursecal_core::{Catalog, Locale, Validator};

use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::render::Renderer;
use crate::store::{EventStore, load_catalog};

/// Everything an event command needs: loaded data plus the rules to apply.
#[derive(Debug)]
pub struct Context {
    pub store: EventStore,
    pub catalog: Catalog,
    pub validator: Validator,
    pub renderer: Renderer,
}

/// Per-invocation overrides of the configuration.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub events_path: Option<PathBuf>,
    pub catalog_path: Option<PathBuf>,
    pub locale: Option<Locale>,
    pub json: bool,
}

impl Context {
    /// Loads the event store and catalog named by `config`, with `overrides`
    /// taking precedence.
    pub fn load(config: &ClientConfig, overrides: Overrides) -> ClientResult<Self> {
        let events_path = overrides
            .events_path
            .unwrap_or_else(|| config.storage.events_path());
        let catalog_path = overrides
            .catalog_path
            .unwrap_or_else(|| config.storage.catalog_path());

        Ok(Self {
            store: EventStore::load(events_path)?,
            catalog: load_catalog(&catalog_path)?,
            validator: Validator::new(config.rules.clone()),
            renderer: Renderer::new(
                overrides.locale.unwrap_or(config.display.locale),
                overrides.json || config.display.json,
            ),
        })
    }

    /// Returns the cap on generated occurrences per series.
    pub fn max_occurrences(&self) -> usize {
        self.validator.rules().max_occurrences
    }
}
