//! Deployment descriptors attached to start events.

use super::DeploymentType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Observability metadata for a deployment stage.
///
/// Tags map an indicator (e.g. `region`) to its value (e.g. `eu-west-1`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    /// Free-text deployment target, e.g. `staging`.
    pub target: String,
    /// Indicator tags identifying this deployment.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    /// The deployment type.
    #[serde(rename = "type")]
    pub deployment_type: DeploymentType,
}

impl Deployment {
    /// Creates an untagged deployment.
    #[must_use]
    pub fn new(target: impl Into<String>, deployment_type: DeploymentType) -> Self {
        Self {
            target: target.into(),
            tags: BTreeMap::new(),
            deployment_type,
        }
    }

    /// Creates a deployment tagged with a single indicator.
    #[must_use]
    pub fn tagged(
        target: impl Into<String>,
        indicator: impl Into<String>,
        value: impl Into<String>,
        deployment_type: DeploymentType,
    ) -> Self {
        Self::new(target, deployment_type).with_tag(indicator, value)
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, indicator: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(indicator.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_deployment_json() {
        let deployment = Deployment::new("staging", DeploymentType::Load);
        let json = serde_json::to_value(&deployment).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"target": "staging", "tags": {}, "type": "Load"})
        );
    }

    #[test]
    fn test_tagged_deployment() {
        let deployment =
            Deployment::tagged("staging", "region", "eu-west-1", DeploymentType::Rollback);
        assert_eq!(deployment.tags.get("region").map(String::as_str), Some("eu-west-1"));
        assert_eq!(deployment.deployment_type, DeploymentType::Rollback);
    }
}
