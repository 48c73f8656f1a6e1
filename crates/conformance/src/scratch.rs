// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Scoped scratch directories.
//!
//! Each scenario works inside a fresh directory created under the root and
//! removed afterwards, whether the scenario passed, failed or panicked.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use gateway::{AsyncGateway, DirectoryId, FileSystemId, RootName};

use crate::scenario::ScenarioError;

/// Name prefix of scratch directories, so stray ones are easy to spot
pub const SCRATCH_PREFIX: &str = "scratch-";

/// Runs `body` inside a new scratch directory below the root of `root`
pub async fn with_scratch<T, F, Fut>(
    gateway: &Arc<dyn AsyncGateway>,
    root: &RootName,
    body: F,
) -> Result<T, ScenarioError>
where
    F: FnOnce(DirectoryId) -> Fut,
    Fut: Future<Output = Result<T, ScenarioError>>,
{
    let top = gateway.get_root(root, None).await?;
    let name = format!("{}{}", SCRATCH_PREFIX, uuid7::uuid7());
    let scratch = gateway.new_directory_item(root, &top.id, &name).await?;
    diagnostics::debug!("Created scratch {name}", name: name.as_str());

    let outcome = AssertUnwindSafe(body(scratch.id.clone()))
        .catch_unwind()
        .await;

    let target = FileSystemId::from(&scratch.id);
    if let Err(e) = gateway.remove_item(root, &target, true).await {
        let message = e.to_string();
        diagnostics::warn!(
            "Failed to remove scratch {name}: {message}",
            name: name.as_str(),
            message: message.as_str()
        );
    }

    match outcome {
        Ok(result) => result,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}
