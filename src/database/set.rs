//! Per-domain database registry

use super::engine::DatabaseEngine;
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Marker for a store that never touches disk
pub const IN_MEMORY: &str = ":memory:";

/// Lazily opened set of domain databases
pub struct DatabaseSet {
    /// Directory holding the database files, `None` for in-memory
    data_dir: Option<PathBuf>,
    /// Domain name to database file stem
    names: BTreeMap<String, String>,
    engines: Mutex<HashMap<String, Arc<DatabaseEngine>>>,
}

impl DatabaseSet {
    /// Build from store configuration
    pub fn from_config(config: &StoreConfig) -> Self {
        let data_dir = if config.data_dir == IN_MEMORY {
            None
        } else {
            Some(PathBuf::from(&config.data_dir))
        };

        Self {
            data_dir,
            names: config.databases.clone(),
            engines: Mutex::new(HashMap::new()),
        }
    }

    /// In-memory databases for the given domains
    pub fn in_memory<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            data_dir: None,
            names: domains
                .into_iter()
                .map(|d| {
                    let d = d.into();
                    (d.clone(), d)
                })
                .collect(),
            engines: Mutex::new(HashMap::new()),
        }
    }

    /// Known domain names
    pub fn domains(&self) -> Vec<String> {
        self.names.keys().cloned().collect()
    }

    /// Get (opening on first use) the engine for a domain
    pub fn get(&self, domain: &str) -> Result<Arc<DatabaseEngine>> {
        let file_stem = self.names.get(domain).ok_or_else(|| Error::UnknownDatabase {
            name: domain.to_string(),
        })?;

        let mut engines = self
            .engines
            .lock()
            .map_err(|_| Error::Other("Database set lock poisoned".to_string()))?;

        if let Some(engine) = engines.get(domain) {
            return Ok(Arc::clone(engine));
        }

        let engine = match &self.data_dir {
            Some(dir) => {
                let path = dir.join(format!("{file_stem}.duckdb"));
                DatabaseEngine::open(domain, &path)?
            }
            None => DatabaseEngine::in_memory(domain)?,
        };

        tracing::info!("Opened '{}' database at {}", domain, engine.location());

        let engine = Arc::new(engine);
        engines.insert(domain.to_string(), Arc::clone(&engine));
        Ok(engine)
    }
}

impl std::fmt::Debug for DatabaseSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseSet")
            .field("data_dir", &self.data_dir)
            .field("names", &self.names)
            .finish_non_exhaustive()
    }
}
