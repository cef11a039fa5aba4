//! Capability catalog - the registry of worker profiles.
//!
//! Populated once at startup (or rebuilt on refresh) and then shared
//! read-only behind an `Arc`, so lookups take no lock.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;

use duorun_core::{CoreError, WorkerId, WorkerProfile};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// On-disk catalog format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    pub workers: Vec<WorkerProfile>,
}

/// Worker profiles in registration order.
#[derive(Debug, Clone, Default)]
pub struct CapabilityCatalog {
    profiles: Vec<Arc<WorkerProfile>>,
    index: HashMap<WorkerId, usize>,
}

impl CapabilityCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from profiles, validating each one.
    pub fn from_profiles(
        profiles: impl IntoIterator<Item = WorkerProfile>,
    ) -> Result<Self, CoreError> {
        let mut catalog = Self::new();
        for profile in profiles {
            catalog.register(profile)?;
        }
        Ok(catalog)
    }

    /// Parse and validate a JSON catalog document.
    pub fn from_json_str(json: &str) -> Result<Self, CoreError> {
        let file: CatalogFile =
            serde_json::from_str(json).map_err(|e| CoreError::Serialization(e.to_string()))?;
        Self::from_profiles(file.workers)
    }

    /// Load and validate a JSON catalog file.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            CoreError::InvalidInput(format!(
                "failed to read catalog '{}': {}",
                path.display(),
                e
            ))
        })?;
        let catalog = Self::from_json_str(&json)?;
        info!(path = %path.display(), workers = catalog.len(), "Loaded capability catalog");
        Ok(catalog)
    }

    /// Register a profile. Re-registering an id overwrites the profile but
    /// keeps its original registration position.
    pub fn register(&mut self, profile: WorkerProfile) -> Result<(), CoreError> {
        profile.validate()?;

        let id = profile.id.clone();
        match self.index.get(&id) {
            Some(&position) => {
                debug!(worker_id = %id, "Overwriting worker profile");
                self.profiles[position] = Arc::new(profile);
            }
            None => {
                debug!(worker_id = %id, position = self.profiles.len(), "Registering worker profile");
                self.index.insert(id, self.profiles.len());
                self.profiles.push(Arc::new(profile));
            }
        }
        Ok(())
    }

    /// Get a profile by id.
    pub fn get(&self, id: &WorkerId) -> Result<Arc<WorkerProfile>, CoreError> {
        self.index
            .get(id)
            .map(|&position| self.profiles[position].clone())
            .ok_or_else(|| CoreError::WorkerNotFound(id.to_string()))
    }

    /// Registration position of a worker (0 = first registered).
    pub fn position(&self, id: &WorkerId) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Profiles for the given ids that exist in the catalog, in
    /// registration order. Unknown ids are dropped silently.
    pub fn list_available(&self, ids: &BTreeSet<WorkerId>) -> Vec<Arc<WorkerProfile>> {
        self.profiles
            .iter()
            .filter(|profile| ids.contains(&profile.id))
            .cloned()
            .collect()
    }

    /// Every profile, in registration order.
    pub fn profiles(&self) -> impl Iterator<Item = &Arc<WorkerProfile>> {
        self.profiles.iter()
    }

    pub fn contains(&self, id: &WorkerId) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
