//! CLI functionality for the ACMG tool
//!
//! This module contains all CLI-related functionality including:
//! - Record evaluation
//! - Rule-set validation
//! - Criteria listing
//! - Output formatting

pub mod criteria;
pub mod evaluate;
pub mod output;
pub mod validate;

use crate::{EngineConfig, RuleSet, standard_rules};
use anyhow::{Context, Result};
use std::path::Path;

/// Load a rule-set file, or the bundled standard rules when none is given
pub fn load_rules(path: Option<&Path>) -> Result<RuleSet> {
    match path {
        Some(path) => RuleSet::from_path(path)
            .with_context(|| format!("Failed to load rule set: {}", path.display())),
        None => standard_rules().context("Failed to load the bundled rule set"),
    }
}

pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_path(path)
            .with_context(|| format!("Failed to load configuration: {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}
