//! The plan catalog: a static mapping from plan id to price, included hours,
//! and display label.
//!
//! Loaded once at process start -- either the built-in catalog embedded at
//! compile time or a TOML file named in the configuration -- and immutable
//! afterwards, so it is safe to share across request handlers without
//! synchronization.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// The catalog embedded at compile time, used when no file is configured.
const DEFAULT_PLANS: &str = include_str!("default_plans.toml");

/// Price, included hours, and display label for one plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanInfo {
    pub price: f64,
    pub hours: i32,
    pub label: String,
}

/// Immutable plan-id -> [`PlanInfo`] mapping.
///
/// A `BTreeMap` keeps iteration (and therefore the `/plans` response and the
/// `padron plans` table) in a stable key order.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct PlanCatalog {
    plans: BTreeMap<String, PlanInfo>,
}

impl PlanCatalog {
    /// The catalog compiled into the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_toml(DEFAULT_PLANS).context("built-in plan catalog is invalid")
    }

    /// Load a catalog from a TOML file of the same shape as the built-in one.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read plan catalog at {}", path.display()))?;
        Self::from_toml(&contents)
            .with_context(|| format!("invalid plan catalog at {}", path.display()))
    }

    /// Parse and validate catalog TOML.
    ///
    /// An empty catalog is a configuration error: every client row references
    /// a plan id, and an instance with no plans cannot accept writes.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let plans: BTreeMap<String, PlanInfo> =
            toml::from_str(contents).context("failed to parse plan catalog TOML")?;

        if plans.is_empty() {
            bail!("plan catalog is empty");
        }
        for (id, info) in &plans {
            if !info.price.is_finite() || info.price < 0.0 {
                bail!("plan {id:?} has invalid price {}", info.price);
            }
            if info.hours < 0 {
                bail!("plan {id:?} has negative hours {}", info.hours);
            }
        }

        Ok(Self { plans })
    }

    /// Look up a plan by id.
    pub fn get(&self, plan: &str) -> Option<&PlanInfo> {
        self.plans.get(plan)
    }

    /// Whether `plan` is a known plan id.
    pub fn contains(&self, plan: &str) -> bool {
        self.plans.contains_key(plan)
    }

    /// Iterate plans in stable key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PlanInfo)> {
        self.plans.iter().map(|(id, info)| (id.as_str(), info))
    }

    /// Number of plans in the catalog. Never zero.
    pub fn len(&self) -> usize {
        self.plans.len()
    }
}
