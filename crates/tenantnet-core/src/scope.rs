//! Project + region scope keys

use crate::error::{NetError, Result};
use serde::{Deserialize, Serialize};

/// Partition key for every network resource.
///
/// Resource identifiers are only unique within a scope, so every store and
/// provider call takes one explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Scope {
    pub project_id: String,
    pub region: String,
}

impl Scope {
    pub fn new(project_id: impl Into<String>, region: impl Into<String>) -> Result<Self> {
        let project_id = project_id.into();
        let region = region.into();

        if project_id.trim().is_empty() {
            return Err(NetError::Validation("project_id must not be empty".to_string()));
        }
        if region.trim().is_empty() {
            return Err(NetError::Validation("region must not be empty".to_string()));
        }

        Ok(Self { project_id, region })
    }

    /// Composite key `project/region`, also used as the EdgeConfig id
    pub fn key(&self) -> String {
        format!("{}/{}", self.project_id, self.region)
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.project_id, self.region)
    }
}

/// Project-level context used by checklist aggregation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectContext {
    pub project_id: String,
    pub default_region: String,
}

impl ProjectContext {
    pub fn new(project_id: impl Into<String>, default_region: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            default_region: default_region.into(),
        }
    }

    pub fn default_scope(&self) -> Result<Scope> {
        Scope::new(self.project_id.clone(), self.default_region.clone())
    }
}
