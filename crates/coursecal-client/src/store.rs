//! JSON-backed event storage.
//!
//! Events are kept in a single JSON array exactly as the engine serializes
//! them. The store never rewrites an event on its own: callers hand it the
//! records the engine returned and it persists them verbatim.

use std::path::{Path, PathBuf};

use coursecal_core::{Catalog, Event};
use tracing::debug;

use crate::error::{ClientError, ClientResult};

/// A file of persisted events.
#[derive(Debug, Clone)]
pub struct EventStore {
    path: PathBuf,
    events: Vec<Event>,
}

impl EventStore {
    /// Loads the store at `path`. A missing file is an empty store.
    pub fn load(path: impl Into<PathBuf>) -> ClientResult<Self> {
        let path = path.into();
        if !path.exists() {
            debug!(path = %path.display(), "No event file yet, starting empty");
            return Ok(Self {
                path,
                events: Vec::new(),
            });
        }

        let content = std::fs::read_to_string(&path)?;
        let events: Vec<Event> = if content.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&content).map_err(|e| ClientError::json(&path, e))?
        };
        debug!(path = %path.display(), count = events.len(), "Loaded events");
        Ok(Self { path, events })
    }

    /// Writes all events back to disk as pretty-printed JSON.
    pub fn save(&self) -> ClientResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json =
            serde_json::to_string_pretty(&self.events).map_err(|e| ClientError::json(&self.path, e))?;
        std::fs::write(&self.path, json)?;
        debug!(path = %self.path.display(), count = self.events.len(), "Saved events");
        Ok(())
    }

    /// Returns every stored event.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Looks up an event by id.
    pub fn find(&self, id: &str) -> Option<&Event> {
        self.events.iter().find(|e| e.id == id)
    }

    /// Looks up an event by id, failing if it is missing.
    pub fn get(&self, id: &str) -> ClientResult<&Event> {
        self.find(id)
            .ok_or_else(|| ClientError::EventNotFound(id.to_string()))
    }

    /// Inserts `event`, replacing any stored event with the same id.
    ///
    /// Returns true if an existing event was replaced.
    pub fn upsert(&mut self, event: Event) -> bool {
        match self.events.iter_mut().find(|e| e.id == event.id) {
            Some(slot) => {
                *slot = event;
                true
            }
            None => {
                self.events.push(event);
                false
            }
        }
    }
}

/// Loads the trainer/course catalog. A missing file is an empty catalog.
pub fn load_catalog(path: &Path) -> ClientResult<Catalog> {
    if !path.exists() {
        return Ok(Catalog::default());
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| ClientError::json(path, e))
}

/// Reads a single event from a JSON file.
pub fn read_event(path: &Path) -> ClientResult<Event> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| ClientError::json(path, e))
}
