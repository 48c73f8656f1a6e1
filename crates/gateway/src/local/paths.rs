// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Translation between item ids and host paths

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};

use crate::error::{GatewayError, Operation, Result};

/// Id of the root directory
pub const ROOT_ID: &str = "/";

/// Resolves `id` under `base`, refusing anything that could leave it
pub fn host_path(base: &Path, id: &str, operation: Operation) -> Result<PathBuf> {
    if id == ROOT_ID {
        return Ok(base.to_path_buf());
    }
    let relative = id
        .strip_prefix('/')
        .ok_or_else(|| GatewayError::not_found(operation, id))?;
    let mut path = base.to_path_buf();
    for segment in relative.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
            return Err(GatewayError::not_found(operation, id));
        }
        path.push(segment);
    }
    Ok(path)
}

/// Id of the entry `name` inside the directory `parent`
pub fn child_id(parent: &str, name: &str) -> String {
    if parent == ROOT_ID {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Id of the directory containing `id`; `None` for the root
pub fn parent_id(id: &str) -> Option<&str> {
    if id == ROOT_ID {
        return None;
    }
    match id.rfind('/') {
        Some(0) => Some(ROOT_ID),
        Some(at) => Some(&id[..at]),
        None => None,
    }
}

/// Leaf name of `id`
pub fn leaf_name(id: &str) -> &str {
    id.rsplit('/').next().unwrap_or(id)
}

/// True when `id` is `ancestor` or lies below it
pub fn is_within(id: &str, ancestor: &str) -> bool {
    ancestor == ROOT_ID
        || id == ancestor
        || id
            .strip_prefix(ancestor)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Created and modified times of a host entry.
///
/// Filesystems without birth times report the modification time for both.
pub fn timestamps(metadata: &std::fs::Metadata) -> (DateTime<Utc>, DateTime<Utc>) {
    let updated = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    let created = metadata.created().unwrap_or(updated);
    (DateTime::<Utc>::from(created), DateTime::<Utc>::from(updated))
}
