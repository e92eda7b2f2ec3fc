//! Species and disease label lists, indexed by classifier output position.
//!
//! Each list lives in its own JSON file (a flat array of strings) and is
//! loaded once at startup. A missing or malformed file degrades to an empty
//! list so the service can still start and report its state.

use std::path::Path;

use anyhow::Context;
use tracing::{info, warn};

/// Which label list a classifier output is interpreted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Species,
    Disease,
}

impl Axis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Species => "species",
            Self::Disease => "disease",
        }
    }

    /// Synthetic label for an output index with no entry in the list.
    pub fn unknown_label(&self, index: usize) -> String {
        match self {
            Self::Species => format!("Unknown_Species_{index}"),
            Self::Disease => format!("Unknown_Disease_{index}"),
        }
    }
}

/// The two ordered label lists. Read-only after construction.
#[derive(Debug, Clone, Default)]
pub struct LabelSet {
    pub species: Vec<String>,
    pub diseases: Vec<String>,
}

impl LabelSet {
    pub fn new(species: Vec<String>, diseases: Vec<String>) -> Self {
        Self { species, diseases }
    }

    /// Load both lists, logging and substituting an empty list on failure.
    pub fn load(species_path: &Path, disease_path: &Path) -> Self {
        Self {
            species: load_or_empty(species_path, Axis::Species),
            diseases: load_or_empty(disease_path, Axis::Disease),
        }
    }

    pub fn list(&self, axis: Axis) -> &[String] {
        match axis {
            Axis::Species => &self.species,
            Axis::Disease => &self.diseases,
        }
    }

    /// Label at `index`, or the axis's `Unknown_*` placeholder when out of range.
    pub fn label(&self, axis: Axis, index: usize) -> String {
        self.list(axis)
            .get(index)
            .cloned()
            .unwrap_or_else(|| axis.unknown_label(index))
    }

    pub fn species_count(&self) -> usize {
        self.species.len()
    }

    pub fn disease_count(&self) -> usize {
        self.diseases.len()
    }
}

/// Read a JSON array of label strings.
pub fn load_labels(path: &Path) -> anyhow::Result<Vec<String>> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {path:?}"))?;
    let labels: Vec<String> =
        serde_json::from_str(&raw).with_context(|| format!("parsing {path:?}"))?;
    Ok(labels)
}

fn load_or_empty(path: &Path, axis: Axis) -> Vec<String> {
    if !path.exists() {
        warn!(axis = axis.as_str(), path = %path.display(), "label file not found");
        return Vec::new();
    }
    match load_labels(path) {
        Ok(labels) => {
            info!(axis = axis.as_str(), count = labels.len(), "loaded labels");
            labels
        }
        Err(e) => {
            warn!(axis = axis.as_str(), error = %format!("{e:#}"), "failed to load labels");
            Vec::new()
        }
    }
}
