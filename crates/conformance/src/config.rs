// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Harness configuration: the roots to exercise and what each declares.
//!
//! ```yaml
//! roots:
//!   - root: file:///srv/mount
//!   - root: sim://alice@drive
//!     capabilities: [GetRoot, GetChildItem, NewDirectoryItem, RemoveItem]
//!     parameters:
//!       fault_rate: "0.1"
//!       seed: "7"
//! ```

use std::path::{Path, PathBuf};

use gateway::{GatewayError, RootConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse harness configuration: {0}")]
    Parse(#[from] serde_yaml_ng::Error),

    #[error("{root}: {source}")]
    Root {
        root: String,
        #[source]
        source: GatewayError,
    },
}

pub type Result<T> = std::result::Result<T, HarnessError>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    #[serde(default)]
    pub roots: Vec<RootConfig>,
}

impl HarnessConfig {
    pub fn new(roots: Vec<RootConfig>) -> Self {
        Self { roots }
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(text)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| HarnessError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway::Capability;

    #[test]
    fn test_parse_roots() {
        let config = HarnessConfig::from_yaml(
            r#"
roots:
  - root: file:///srv/mount
  - root: sim://alice@drive
    capabilities: [GetRoot, RemoveItem]
    parameters:
      seed: "7"
"#,
        )
        .unwrap();
        assert_eq!(config.roots.len(), 2);
        assert_eq!(config.roots[0].root.scheme(), "file");
        assert!(config.roots[0].capabilities.is_none());
        let declared = config.roots[1].capabilities.as_ref().unwrap();
        assert!(declared.contains(Capability::RemoveItem));
        assert_eq!(config.roots[1].parameters["seed"], "7");
    }

    #[test]
    fn test_bad_yaml() {
        assert!(matches!(
            HarnessConfig::from_yaml("roots: [ { root: nowhere } ]"),
            Err(HarnessError::Parse(_))
        ));
        assert!(matches!(
            HarnessConfig::load("/nonexistent/harness.yaml"),
            Err(HarnessError::Read { .. })
        ));
    }
}
