//! Project configuration: registry endpoint and per-environment image naming
//!
//! The push workflow itself never inspects project files; it receives a
//! [`ProjectConfig`] resolved here from a small JSON file next to the project.

use crate::error::{PushError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "registry-push.json";

fn default_version() -> String {
    "latest".to_string()
}

fn default_endpoint() -> String {
    // Docker Engine API over local TCP; override per project for remote daemons
    "http://localhost:2375/".to_string()
}

/// Project-level push configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// Registry host prepended to every image reference
    pub registry: String,
    /// Image repository per target environment, e.g. "dev" -> "user/project"
    pub images: HashMap<String, String>,
    /// Tag used when --version is not given
    #[serde(default = "default_version")]
    pub default_version: String,
    /// Engine API endpoint the client talks to
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Command run by the pre-push test step, with environment and version appended
    #[serde(default)]
    pub test_command: Option<String>,
}

impl ProjectConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            PushError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: ProjectConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.registry.is_empty() {
            return Err(PushError::Config("registry cannot be empty".to_string()));
        }
        if self.images.is_empty() {
            return Err(PushError::Config(
                "no images configured for any environment".to_string(),
            ));
        }
        Ok(())
    }

    /// Full image reference for a target environment
    pub fn image_ref(&self, target: &str, version: &str) -> Result<ImageRef> {
        let repo = self.images.get(target).ok_or_else(|| {
            PushError::Config(format!("no image configured for environment '{}'", target))
        })?;
        Ok(ImageRef {
            repository: format!("{}/{}", self.registry, repo),
            tag: version.to_string(),
        })
    }
}

/// Repository plus tag, rendered as `repository:tag`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub repository: String,
    pub tag: String,
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}
