//! Toolkit configuration, loaded from JSON.
//!
//! Every section has defaults, so an empty object `{}` is a valid file.

use crate::{
    error::{ToolkitError, ToolkitResult},
    surface::{SurfaceLayout, VALID_ROWS},
    types::Tick,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolkitConfig {
    /// Name listeners and tasks are attributed to.
    pub owner:    String,
    pub executor: ExecutorConfig,
    pub router:   RouterConfig,
    pub server:   ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Worker threads for the background lane.
    pub background_threads:        usize,
    /// Stop a repeating series after its action fails once.
    pub cancel_repeating_on_error: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Ticks between a menu click and its handlers running.
    pub click_delay_ticks: Tick,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Rows in every viewer's personal inventory.
    pub personal_rows: usize,
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            owner:    "menukit".to_string(),
            executor: ExecutorConfig::default(),
            router:   RouterConfig::default(),
            server:   ServerConfig::default(),
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self { background_threads: 2, cancel_repeating_on_error: true }
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self { click_delay_ticks: 1 }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { personal_rows: 4 }
    }
}

impl ToolkitConfig {
    pub fn load(path: impl AsRef<Path>) -> ToolkitResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&content)?;
        log::info!("Loaded toolkit config from {}", path.display());
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> ToolkitResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ToolkitResult<()> {
        if self.owner.trim().is_empty() {
            return Err(invalid("owner must not be empty"));
        }
        if self.executor.background_threads == 0 {
            return Err(invalid("executor.background_threads must be at least 1"));
        }
        // Click handlers must run after the host has finished the click.
        if self.router.click_delay_ticks == 0 {
            return Err(invalid("router.click_delay_ticks must be at least 1"));
        }
        if !VALID_ROWS.contains(&self.server.personal_rows) {
            return Err(invalid(format!(
                "server.personal_rows must be in {}..{}, got {}",
                VALID_ROWS.start, VALID_ROWS.end, self.server.personal_rows
            )));
        }
        Ok(())
    }

    pub fn personal_layout(&self) -> SurfaceLayout {
        SurfaceLayout::Rows(self.server.personal_rows)
    }
}

fn invalid(reason: impl Into<String>) -> ToolkitError {
    ToolkitError::InvalidConfig { reason: reason.into() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        let config = ToolkitConfig::from_json_str("{}").unwrap();
        assert_eq!(config.owner, "menukit");
        assert_eq!(config.router.click_delay_ticks, 1);
        assert_eq!(config.executor.background_threads, 2);
        assert!(config.executor.cancel_repeating_on_error);
        assert_eq!(config.personal_layout(), SurfaceLayout::Rows(4));
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let config =
            ToolkitConfig::from_json_str(r#"{"executor": {"background_threads": 8}}"#).unwrap();
        assert_eq!(config.executor.background_threads, 8);
        assert!(config.executor.cancel_repeating_on_error);
    }

    #[test]
    fn zero_click_delay_is_rejected() {
        let err = ToolkitConfig::from_json_str(r#"{"router": {"click_delay_ticks": 0}}"#)
            .unwrap_err();
        assert!(matches!(err, ToolkitError::InvalidConfig { .. }));
    }

    #[test]
    fn malformed_json_is_a_serialization_error() {
        assert!(matches!(
            ToolkitConfig::from_json_str("{"),
            Err(ToolkitError::Serialization(_))
        ));
    }
}
