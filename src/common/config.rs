//! Planner configuration

use crate::common::constants::{DEFAULT_DATABASE_NAME, DEFAULT_NAMESPACE_NAME};
use crate::common::error::{BindError, BindResult};
use serde::{Deserialize, Serialize};

/// Settings consumed by [`crate::planner::QueryPlanner`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Session database every statement binds against
    pub database: String,
    /// Namespace used for unqualified table names
    pub default_namespace: String,
    /// Log the rendered logical plan at debug level
    pub log_plans: bool,
    /// Downgrade `DROP ... IF EXISTS` on a missing object to a notice
    pub drop_if_exists_notice: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            database: DEFAULT_DATABASE_NAME.to_string(),
            default_namespace: DEFAULT_NAMESPACE_NAME.to_string(),
            log_plans: false,
            drop_if_exists_notice: true,
        }
    }
}

impl PlannerConfig {
    /// Parse a configuration from JSON; absent fields keep their defaults
    pub fn from_json(json: &str) -> BindResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| BindError::SyntaxError(format!("invalid planner configuration: {}", e)))
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }
}
