// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Client boundary of a flat-id drive service.
//!
//! Items are addressed by opaque resource keys. Hierarchy is metadata: every
//! item except the drive root carries the key of its parent folder.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Transient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Folder,
    File,
}

/// Item metadata as the service reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveItem {
    pub id: String,
    pub name: String,
    /// `None` only for the drive root
    pub parent: Option<String>,
    pub kind: ItemKind,
    /// Content length; the service leaves it null for folders
    pub size: Option<u64>,
    /// Hex SHA-256 of the content; null for folders
    pub hash: Option<String>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl DriveItem {
    #[must_use]
    pub fn is_folder(&self) -> bool {
        self.kind == ItemKind::Folder
    }
}

/// Account quota; every figure is optional on the wire
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quota {
    pub drive_id: String,
    pub total: Option<u64>,
    pub used: Option<u64>,
    pub remaining: Option<u64>,
}

/// Metadata update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub parent: Option<String>,
}

impl ItemPatch {
    pub fn rename<N: Into<String>>(name: N) -> Self {
        Self {
            name: Some(name.into()),
            parent: None,
        }
    }

    pub fn relocate<P: Into<String>, N: Into<String>>(parent: P, name: N) -> Self {
        Self {
            name: Some(name.into()),
            parent: Some(parent.into()),
        }
    }
}

/// Transfer event raised by the service client while content moves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    pub bytes_sent: u64,
    /// Declared length of the transfer, when the client knows it
    pub total_bytes: Option<u64>,
}

/// Callback the client invokes on each transfer event
pub type TransferListener<'a> = &'a (dyn Fn(TransferProgress) + Send + Sync);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriveApiError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("name already in use: {0}")]
    Conflict(String),

    #[error("folder is not empty: {0}")]
    NotEmpty(String),

    #[error("request rejected: {0}")]
    Unauthorized(String),

    #[error("service fault: {0}")]
    Fault(String),

    #[error("invalid request: {0}")]
    BadRequest(String),
}

impl Transient for DriveApiError {
    fn is_transient(&self) -> bool {
        matches!(self, DriveApiError::Fault(_))
    }
}

pub type ApiResult<T> = std::result::Result<T, DriveApiError>;

/// Calls a drive service exposes to an authenticated client
#[async_trait]
pub trait DriveApi: Send + Sync {
    async fn about(&self) -> ApiResult<Quota>;

    async fn root_item(&self) -> ApiResult<DriveItem>;

    async fn get_item(&self, id: &str) -> ApiResult<DriveItem>;

    async fn list_children(&self, id: &str) -> ApiResult<Vec<DriveItem>>;

    async fn create_folder(&self, parent: &str, name: &str) -> ApiResult<DriveItem>;

    /// Creates a new file under `parent`
    async fn upload(
        &self,
        parent: &str,
        name: &str,
        content: &[u8],
        listener: TransferListener<'_>,
    ) -> ApiResult<DriveItem>;

    /// Replaces the content of an existing file
    async fn update_content(
        &self,
        id: &str,
        content: &[u8],
        listener: TransferListener<'_>,
    ) -> ApiResult<DriveItem>;

    async fn download(&self, id: &str) -> ApiResult<Vec<u8>>;

    async fn patch(&self, id: &str, patch: ItemPatch) -> ApiResult<DriveItem>;

    /// Server-side copy; folders are copied with their whole subtree
    async fn copy(&self, id: &str, parent: &str, name: &str) -> ApiResult<DriveItem>;

    /// Deletes an item; a folder with children needs `recursive`
    async fn delete(&self, id: &str, recursive: bool) -> ApiResult<()>;
}
