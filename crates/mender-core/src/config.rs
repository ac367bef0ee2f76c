//! Repair configuration.

use std::path::Path;

use anyhow::Context;
use mender_sandbox::ResourceLimits;
use serde::{Deserialize, Serialize};

use crate::domain::{MenderError, Result};
use crate::generate::RuleFilter;

/// Knobs of one repair run. Every field has a default, so a TOML file only
/// needs the values it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    /// Iteration budget. 0 ends the repair before anything runs.
    pub max_iterations: u32,

    /// Ask generators for efficiency variants as well as correctness fixes.
    pub allow_efficiency_variants: bool,

    /// Candidates evaluated per iteration, after filtering.
    pub max_candidates: usize,

    /// Concurrent candidate runs.
    pub max_parallel_evaluations: usize,

    /// Run the static analyzer on sources that exit 0.
    pub enable_static_analysis: bool,

    /// Run annotated `TEST`/`INPUT`/`EXPECTED` cases on sources that exit 0.
    pub enable_test_cases: bool,

    pub rules: RuleFilter,

    pub limits: ResourceLimits,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            allow_efficiency_variants: false,
            max_candidates: 5,
            max_parallel_evaluations: 4,
            enable_static_analysis: true,
            enable_test_cases: true,
            rules: RuleFilter::default(),
            limits: ResourceLimits::default(),
        }
    }
}

impl RepairConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content).context("parsing repair config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading repair config {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("loading repair config {}", path.display()))
    }

    /// Set the iteration budget (builder pattern).
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the rule filter (builder pattern).
    pub fn with_rules(mut self, rules: RuleFilter) -> Self {
        self.rules = rules;
        self
    }

    /// Set the resource limits (builder pattern).
    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        if self.max_candidates == 0 {
            errors.push("max_candidates must be greater than 0".to_string());
        }
        if self.max_parallel_evaluations == 0 {
            errors.push("max_parallel_evaluations must be greater than 0".to_string());
        }
        if let Err(e) = self.limits.validate() {
            errors.push(e.to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(MenderError::Config(errors.join("; ")))
        }
    }
}
