// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Contract objects: immutable snapshots of drives, directories and files.
//!
//! A gateway builds these fresh on every call and keeps no reference to them
//! afterwards. The only links between snapshots are parent back-references,
//! attached at construction, which exist so `full_name` can walk to the root.

use std::ops::Deref;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::id::{DirectoryId, FileId, FileSystemId};

/// Name of the mount point and separator between path segments in full names
pub const SEPARATOR: &str = "/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriveInfoContract {
    pub id: String,
    pub name: String,
    /// Bytes still available, when the backend reports quota
    pub free_space: Option<u64>,
    /// Bytes in use, when the backend reports quota
    pub used_space: Option<u64>,
}

impl DriveInfoContract {
    pub fn new<I: Into<String>, N: Into<String>>(
        id: I,
        name: N,
        free_space: Option<u64>,
        used_space: Option<u64>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            free_space,
            used_space,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectoryInfoContract {
    pub id: DirectoryId,
    pub name: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    #[serde(skip)]
    parent: Option<Arc<DirectoryInfoContract>>,
}

impl DirectoryInfoContract {
    pub fn new<N: Into<String>>(
        id: DirectoryId,
        name: N,
        created: DateTime<Utc>,
        updated: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            created,
            updated,
            parent: None,
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent: Arc<DirectoryInfoContract>) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn parent(&self) -> Option<&Arc<DirectoryInfoContract>> {
        self.parent.as_ref()
    }

    /// Mount-relative path of this directory, always ending in `/`
    pub fn full_name(&self) -> String {
        match &self.parent {
            Some(parent) => format!("{}{}{}", parent.full_name(), self.name, SEPARATOR),
            None if self.name == SEPARATOR => SEPARATOR.to_string(),
            None => format!("{}{}", self.name, SEPARATOR),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileInfoContract {
    pub id: FileId,
    pub name: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub size: u64,
    /// Content hash, for backends that supply one
    pub hash: Option<String>,
    #[serde(skip)]
    directory: Option<Arc<DirectoryInfoContract>>,
}

impl FileInfoContract {
    pub fn new<N: Into<String>>(
        id: FileId,
        name: N,
        created: DateTime<Utc>,
        updated: DateTime<Utc>,
        size: u64,
        hash: Option<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            created,
            updated,
            size,
            hash,
            directory: None,
        }
    }

    #[must_use]
    pub fn with_directory(mut self, directory: Arc<DirectoryInfoContract>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn directory(&self) -> Option<&Arc<DirectoryInfoContract>> {
        self.directory.as_ref()
    }

    pub fn full_name(&self) -> String {
        match &self.directory {
            Some(directory) => format!("{}{}", directory.full_name(), self.name),
            None => self.name.clone(),
        }
    }
}

/// The mount point of a root
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RootDirectoryInfoContract {
    #[serde(flatten)]
    directory: DirectoryInfoContract,
    #[serde(skip)]
    drive: Arc<DriveInfoContract>,
}

impl RootDirectoryInfoContract {
    pub fn new(
        id: DirectoryId,
        created: DateTime<Utc>,
        updated: DateTime<Utc>,
        drive: DriveInfoContract,
    ) -> Self {
        Self {
            directory: DirectoryInfoContract::new(id, SEPARATOR, created, updated),
            drive: Arc::new(drive),
        }
    }

    pub fn drive(&self) -> &DriveInfoContract {
        &self.drive
    }

    pub fn full_name(&self) -> String {
        self.drive.name.clone()
    }

    /// The root as a plain directory, for use as a parent back-reference
    pub fn as_directory(&self) -> Arc<DirectoryInfoContract> {
        Arc::new(self.directory.clone())
    }
}

impl Deref for RootDirectoryInfoContract {
    type Target = DirectoryInfoContract;

    fn deref(&self) -> &Self::Target {
        &self.directory
    }
}

/// A directory or file snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FileSystemInfoContract {
    Directory(DirectoryInfoContract),
    File(FileInfoContract),
}

impl FileSystemInfoContract {
    pub fn id(&self) -> FileSystemId {
        match self {
            FileSystemInfoContract::Directory(d) => FileSystemId::Directory(d.id.clone()),
            FileSystemInfoContract::File(f) => FileSystemId::File(f.id.clone()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            FileSystemInfoContract::Directory(d) => &d.name,
            FileSystemInfoContract::File(f) => &f.name,
        }
    }

    pub fn created(&self) -> DateTime<Utc> {
        match self {
            FileSystemInfoContract::Directory(d) => d.created,
            FileSystemInfoContract::File(f) => f.created,
        }
    }

    pub fn updated(&self) -> DateTime<Utc> {
        match self {
            FileSystemInfoContract::Directory(d) => d.updated,
            FileSystemInfoContract::File(f) => f.updated,
        }
    }

    pub fn full_name(&self) -> String {
        match self {
            FileSystemInfoContract::Directory(d) => d.full_name(),
            FileSystemInfoContract::File(f) => f.full_name(),
        }
    }

    /// Size in bytes; `None` for directories
    pub fn size(&self) -> Option<u64> {
        match self {
            FileSystemInfoContract::Directory(_) => None,
            FileSystemInfoContract::File(f) => Some(f.size),
        }
    }

    pub fn as_file(&self) -> Option<&FileInfoContract> {
        match self {
            FileSystemInfoContract::File(f) => Some(f),
            FileSystemInfoContract::Directory(_) => None,
        }
    }

    pub fn as_directory(&self) -> Option<&DirectoryInfoContract> {
        match self {
            FileSystemInfoContract::Directory(d) => Some(d),
            FileSystemInfoContract::File(_) => None,
        }
    }

    #[must_use]
    pub fn is_directory(&self) -> bool {
        matches!(self, FileSystemInfoContract::Directory(_))
    }
}

impl From<DirectoryInfoContract> for FileSystemInfoContract {
    fn from(value: DirectoryInfoContract) -> Self {
        FileSystemInfoContract::Directory(value)
    }
}

impl From<FileInfoContract> for FileSystemInfoContract {
    fn from(value: FileInfoContract) -> Self {
        FileSystemInfoContract::File(value)
    }
}
