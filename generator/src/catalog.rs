// catalog.rs — Dropdown option catalog
//
// Option sets map the labels a user picks in a dropdown to the code literal
// that ends up in the sketch. The editor resolves labels before handing a
// block over; this module provides that resolution plus a check that every
// code literal still maps onto the generator's internal bus and budget
// values.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::blocks::{BUDGET_OPTION_SET, BUS_OPTION_SET};
use crate::diag::{codes, Diagnostic};
use crate::tof400c::{BusType, TimingBudget};

// ── Data types ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionEntry {
    pub label: String,
    pub code: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("{}: {}", path.display(), source)]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("option set '{set}' is empty")]
    EmptySet { set: String },

    #[error("option set '{set}' has duplicate label '{label}'")]
    DuplicateLabel { set: String, label: String },

    #[error("unknown option set '{0}'")]
    UnknownSet(String),

    #[error("option set '{set}' has no label '{label}'")]
    UnknownLabel { set: String, label: String },
}

// ── Catalog ─────────────────────────────────────────────────────────────────

/// Named option sets. `BTreeMap` keeps the serialized form canonical.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    sets: BTreeMap<String, Vec<OptionEntry>>,
}

fn entry(label: &str, code: &str) -> OptionEntry {
    OptionEntry {
        label: label.to_string(),
        code: code.to_string(),
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The option sets shipped with the sensor blocks.
    pub fn builtin() -> Self {
        let mut sets = BTreeMap::new();
        sets.insert(
            BUS_OPTION_SET.to_string(),
            vec![entry("Hardware I2C", "0"), entry("Software I2C", "1")],
        );
        sets.insert(
            BUDGET_OPTION_SET.to_string(),
            TimingBudget::ALL
                .iter()
                .map(|b| entry(&format!("{} ms", b.millis()), &b.to_string()))
                .collect(),
        );
        Catalog { sets }
    }

    /// Load a catalog from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self, CatalogError> {
        let source = std::fs::read_to_string(path).map_err(|e| CatalogError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json_str(&source)
    }

    pub fn from_json_str(source: &str) -> Result<Self, CatalogError> {
        let catalog: Catalog = serde_json::from_str(source)?;
        catalog.check_structure()?;
        Ok(catalog)
    }

    fn check_structure(&self) -> Result<(), CatalogError> {
        for (set, entries) in &self.sets {
            if entries.is_empty() {
                return Err(CatalogError::EmptySet { set: set.clone() });
            }
            for (i, e) in entries.iter().enumerate() {
                if entries[..i].iter().any(|prev| prev.label == e.label) {
                    return Err(CatalogError::DuplicateLabel {
                        set: set.clone(),
                        label: e.label.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn set(&self, name: &str) -> Option<&[OptionEntry]> {
        self.sets.get(name).map(|v| v.as_slice())
    }

    /// Resolve a user-facing label to its code literal.
    pub fn resolve(&self, set: &str, label: &str) -> Result<&str, CatalogError> {
        let entries = self
            .set(set)
            .ok_or_else(|| CatalogError::UnknownSet(set.to_string()))?;
        entries
            .iter()
            .find(|e| e.label == label)
            .map(|e| e.code.as_str())
            .ok_or_else(|| CatalogError::UnknownLabel {
                set: set.to_string(),
                label: label.to_string(),
            })
    }

    /// Check that the sensor's option sets only offer codes the generator
    /// understands. Unmapped codes still generate (bus falls back to
    /// hardware; budgets pass through), so these are warnings.
    pub fn validate(&self) -> Vec<Diagnostic> {
        let mut diags = Vec::new();
        for e in self.set(BUS_OPTION_SET).unwrap_or_default() {
            if BusType::from_selector_exact(&e.code).is_none() {
                diags.push(
                    Diagnostic::warning(format!(
                        "bus option '{}' has code '{}', which selects no bus type",
                        e.label, e.code
                    ))
                    .with_code(codes::UNMAPPED_BUS_OPTION)
                    .with_key(BUS_OPTION_SET)
                    .with_hint("it will behave as hardware I2C; use 0 or 1"),
                );
            }
        }
        for e in self.set(BUDGET_OPTION_SET).unwrap_or_default() {
            if TimingBudget::from_code(&e.code).is_none() {
                diags.push(
                    Diagnostic::warning(format!(
                        "timing budget option '{}' has unsupported code '{}'",
                        e.label, e.code
                    ))
                    .with_code(codes::UNMAPPED_BUDGET_OPTION)
                    .with_key(BUDGET_OPTION_SET)
                    .with_hint("the driver accepts 20, 33, 50, 100, 200 or 500"),
                );
            }
        }
        diags
    }

    /// Canonical compact JSON, used for fingerprinting.
    pub fn canonical_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}
