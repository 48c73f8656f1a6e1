// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Scenario plumbing: what a scenario needs and what it reports.

use std::sync::Arc;

use futures::future::BoxFuture;
use gateway::{
    bytes_stream, AsyncGateway, Capabilities, Capability, DirectoryId, DirectoryInfoContract,
    FileId, FileInfoContract, FileSystemInfoContract, GatewayError, NoProgress, RootName,
};
use serde::Serialize;
use tokio::io::AsyncReadExt;

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("{0}")]
    Assertion(String),
}

/// Fails the enclosing scenario unless `cond` holds
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::ScenarioError::Assertion(format!($($arg)+)));
        }
    };
}

/// What a scenario body gets to work with
#[derive(Clone)]
pub struct Context {
    pub gateway: Arc<dyn AsyncGateway>,
    pub root: RootName,
    /// Scratch directory, for scenarios that create items
    pub scratch: Option<DirectoryId>,
}

impl Context {
    pub fn scratch(&self) -> Result<&DirectoryId, ScenarioError> {
        self.scratch
            .as_ref()
            .ok_or_else(|| {
                ScenarioError::Assertion("scenario ran without a scratch directory".into())
            })
    }

    pub async fn new_directory(
        &self,
        parent: &DirectoryId,
        name: &str,
    ) -> Result<DirectoryInfoContract, ScenarioError> {
        Ok(self
            .gateway
            .new_directory_item(&self.root, parent, name)
            .await?)
    }

    pub async fn new_file(
        &self,
        parent: &DirectoryId,
        name: &str,
        content: &[u8],
    ) -> Result<FileInfoContract, ScenarioError> {
        Ok(self
            .gateway
            .new_file_item(&self.root, parent, name, bytes_stream(content), &NoProgress)
            .await?)
    }

    pub async fn list(
        &self,
        parent: &DirectoryId,
    ) -> Result<Vec<FileSystemInfoContract>, ScenarioError> {
        Ok(self.gateway.get_child_item(&self.root, parent).await?)
    }

    /// The child of `parent` called `name`, failing when it is not listed
    pub async fn find(
        &self,
        parent: &DirectoryId,
        name: &str,
    ) -> Result<FileSystemInfoContract, ScenarioError> {
        self.list(parent)
            .await?
            .into_iter()
            .find(|item| item.name() == name)
            .ok_or_else(|| {
                ScenarioError::Assertion(format!("'{}' is not listed in {}", name, parent))
            })
    }

    /// Names listed below `parent`, in listing order
    pub async fn names(&self, parent: &DirectoryId) -> Result<Vec<String>, ScenarioError> {
        Ok(self
            .list(parent)
            .await?
            .iter()
            .map(|item| item.name().to_string())
            .collect())
    }

    pub async fn read(&self, id: &FileId) -> Result<Vec<u8>, ScenarioError> {
        let mut stream = self.gateway.get_content(&self.root, id).await?;
        let mut bytes = Vec::new();
        let _ = stream.read_to_end(&mut bytes).await.map_err(|e| {
            ScenarioError::Assertion(format!("reading {} failed: {}", id, e))
        })?;
        Ok(bytes)
    }
}

pub type ScenarioFn = fn(Context) -> BoxFuture<'static, Result<(), ScenarioError>>;

/// A check for one capability
#[derive(Clone)]
pub struct Scenario {
    pub name: &'static str,
    pub capability: Capability,
    /// Everything the body calls, the tested capability included
    pub requires: Capabilities,
    pub uses_scratch: bool,
    pub run: ScenarioFn,
}

impl Scenario {
    /// Scratch creation and cleanup need these on top of `requires`
    pub fn scratch_capabilities() -> Capabilities {
        Capabilities::from([
            Capability::GetRoot,
            Capability::NewDirectoryItem,
            Capability::RemoveItem,
        ])
    }

    /// Every capability a run of this scenario touches
    pub fn needs(&self) -> Capabilities {
        let mut needs = self.requires.clone().with(self.capability);
        if self.uses_scratch {
            for capability in Self::scratch_capabilities().iter() {
                let _ = needs.insert(capability);
            }
        }
        needs
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ScenarioResult {
    Passed,
    Failed { message: String },
    Skipped { missing: Capabilities },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioOutcome {
    pub root: RootName,
    pub scenario: String,
    pub capability: Capability,
    #[serde(flatten)]
    pub result: ScenarioResult,
}

impl ScenarioOutcome {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.result == ScenarioResult::Passed
    }

    #[must_use]
    pub fn failed(&self) -> bool {
        matches!(self.result, ScenarioResult::Failed { .. })
    }

    #[must_use]
    pub fn skipped(&self) -> bool {
        matches!(self.result, ScenarioResult::Skipped { .. })
    }
}

/// All outcomes of one harness run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    pub outcomes: Vec<ScenarioOutcome>,
}

impl Report {
    pub fn failures(&self) -> impl Iterator<Item = &ScenarioOutcome> + '_ {
        self.outcomes.iter().filter(|o| o.failed())
    }

    pub fn skipped(&self) -> impl Iterator<Item = &ScenarioOutcome> + '_ {
        self.outcomes.iter().filter(|o| o.skipped())
    }

    pub fn passed(&self) -> impl Iterator<Item = &ScenarioOutcome> + '_ {
        self.outcomes.iter().filter(|o| o.passed())
    }

    /// Outcomes for one root
    pub fn for_root<'a>(
        &'a self,
        root: &'a RootName,
    ) -> impl Iterator<Item = &'a ScenarioOutcome> + 'a {
        self.outcomes.iter().filter(move |o| &o.root == root)
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}
