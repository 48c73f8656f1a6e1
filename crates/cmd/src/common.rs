// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, anyhow};
use conformance::HarnessConfig;
use gateway::{
    DirectoryId, FileSystemInfoContract, GatewayRegistry, OpenedGateway, RootConfig, RootName,
};
use serde::Serialize;

/// Mount table read when `--config` is not given
pub const DEFAULT_CONFIG: &str = "drivegate.yaml";

/// Everything a command needs: the registry and the mount table
pub struct GateContext {
    registry: GatewayRegistry,
    config: HarnessConfig,
}

impl GateContext {
    pub fn new(registry: GatewayRegistry, config: HarnessConfig) -> Self {
        Self { registry, config }
    }

    /// Loads the mount table.
    ///
    /// A missing default file means an empty table; a missing file named on
    /// the command line is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => HarnessConfig::load(path)
                .with_context(|| format!("loading mount table {}", path.display()))?,
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG);
                if default.exists() {
                    HarnessConfig::load(&default)?
                } else {
                    diagnostics::debug!(
                        "No {file}, starting with an empty mount table",
                        file: DEFAULT_CONFIG
                    );
                    HarnessConfig::default()
                }
            }
        };
        Ok(Self::new(GatewayRegistry::with_defaults(), config))
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn registry(&self) -> &GatewayRegistry {
        &self.registry
    }

    /// The mount table entry for `root`, or a bare entry when it is not listed
    pub fn root_config(&self, root: &str) -> Result<RootConfig> {
        let name: RootName = root.parse()?;
        Ok(self
            .config
            .roots
            .iter()
            .find(|entry| entry.root == name)
            .cloned()
            .unwrap_or_else(|| RootConfig::new(name)))
    }

    pub fn open(&self, root: &str) -> Result<OpenedGateway> {
        let config = self.root_config(root)?;
        Ok(self.registry.open(&config)?)
    }
}

/// `dir` when given, otherwise the id of the root directory
pub async fn directory_or_root(
    opened: &OpenedGateway,
    dir: Option<&str>,
) -> Result<DirectoryId> {
    match dir {
        Some(id) => Ok(DirectoryId::new(id)),
        None => Ok(opened.gateway.get_root(&opened.root, None).await?.id.clone()),
    }
}

/// Finds the child of `parent` called `name`
pub async fn lookup(
    opened: &OpenedGateway,
    parent: &DirectoryId,
    name: &str,
) -> Result<FileSystemInfoContract> {
    opened
        .gateway
        .get_child_item(&opened.root, parent)
        .await?
        .into_iter()
        .find(|item| item.name() == name)
        .ok_or_else(|| anyhow!("no item named '{}' in {}", name, parent))
}

/// Writes `value` as one pretty-printed JSON document
pub fn write_json<T: Serialize + ?Sized>(output: &mut dyn Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *output, value)?;
    writeln!(output)?;
    Ok(())
}
