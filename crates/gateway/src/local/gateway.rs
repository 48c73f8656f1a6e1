// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sysinfo::Disks;

use super::paths::{self, ROOT_ID};
use super::SCHEME;
use crate::contract::{
    DirectoryInfoContract, DriveInfoContract, FileInfoContract, FileSystemInfoContract,
    RootDirectoryInfoContract,
};
use crate::error::{GatewayError, Operation, Result};
use crate::gateway::{Gateway, ReadStream};
use crate::id::{DirectoryId, FileId, FileSystemId, RootName};
use crate::retry::RetryPolicy;

/// Blocking gateway over a host directory tree
#[derive(Debug, Clone, Default)]
pub struct LocalGateway {
    retry: RetryPolicy,
}

/// Maps a host I/O failure onto the gateway error vocabulary
pub(super) fn io_error(operation: Operation, target: &str, error: io::Error) -> GatewayError {
    match error.kind() {
        io::ErrorKind::NotFound => GatewayError::not_found(operation, target),
        io::ErrorKind::AlreadyExists => {
            GatewayError::conflict(operation, paths::leaf_name(target))
        }
        io::ErrorKind::DirectoryNotEmpty => GatewayError::directory_not_empty(operation, target),
        _ => GatewayError::io(operation, target, error),
    }
}

impl LocalGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Runs a host call under the retry policy
    fn host<T, F>(&self, operation: Operation, target: &str, call: F) -> Result<T>
    where
        F: FnMut() -> io::Result<T>,
    {
        self.retry
            .retry_blocking(operation.as_str(), call)
            .map_err(|e| io_error(operation, target, e))
    }

    /// Host directory backing `root`
    fn base(&self, root: &RootName, operation: Operation) -> Result<PathBuf> {
        if root.scheme() != SCHEME {
            return Err(GatewayError::root_unresolved(
                operation,
                root,
                format!("scheme '{}' is not '{}'", root.scheme(), SCHEME),
            ));
        }
        let base = PathBuf::from(root.root());
        match fs::metadata(&base) {
            Ok(meta) if meta.is_dir() => Ok(base),
            Ok(_) => Err(GatewayError::root_unresolved(
                operation,
                root,
                "not a directory",
            )),
            Err(e) => Err(GatewayError::root_unresolved(operation, root, e.to_string())),
        }
    }

    /// Stats `id`, returning `None` when nothing is there
    fn stat(
        &self,
        base: &Path,
        id: &str,
        operation: Operation,
    ) -> Result<Option<(PathBuf, fs::Metadata)>> {
        let path = match paths::host_path(base, id, operation) {
            Ok(path) => path,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };
        match self.host(operation, id, || fs::symlink_metadata(&path)) {
            Ok(meta) => Ok(Some((path, meta))),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn require_directory(
        &self,
        base: &Path,
        id: &str,
        operation: Operation,
    ) -> Result<(PathBuf, fs::Metadata)> {
        match self.stat(base, id, operation)? {
            Some((path, meta)) if meta.is_dir() => Ok((path, meta)),
            _ => Err(GatewayError::not_found(operation, id)),
        }
    }

    fn require_file(
        &self,
        base: &Path,
        id: &str,
        operation: Operation,
    ) -> Result<(PathBuf, fs::Metadata)> {
        match self.stat(base, id, operation)? {
            Some((path, meta)) if meta.is_file() => Ok((path, meta)),
            _ => Err(GatewayError::not_found(operation, id)),
        }
    }

    /// Resolves an id of either kind, insisting the host entry has that kind
    fn require_item(
        &self,
        base: &Path,
        id: &FileSystemId,
        operation: Operation,
    ) -> Result<(PathBuf, fs::Metadata)> {
        match id {
            FileSystemId::Directory(d) => self.require_directory(base, d.as_str(), operation),
            FileSystemId::File(f) => self.require_file(base, f.as_str(), operation),
        }
    }

    /// Fails with a conflict when `id` is taken
    fn require_vacant(&self, base: &Path, id: &str, operation: Operation) -> Result<PathBuf> {
        match self.stat(base, id, operation)? {
            Some(_) => Err(GatewayError::conflict(operation, paths::leaf_name(id))),
            None => paths::host_path(base, id, operation),
        }
    }

    /// Directory snapshot for `id`, with the ancestor chain up to the root
    fn directory_contract(
        &self,
        base: &Path,
        id: &str,
        operation: Operation,
    ) -> Result<DirectoryInfoContract> {
        let (_, meta) = self.require_directory(base, id, operation)?;
        let (created, updated) = paths::timestamps(&meta);
        let Some(parent) = paths::parent_id(id) else {
            return Ok(DirectoryInfoContract::new(
                DirectoryId::new(ROOT_ID),
                ROOT_ID,
                created,
                updated,
            ));
        };
        let parent = Arc::new(self.directory_contract(base, parent, operation)?);
        Ok(
            DirectoryInfoContract::new(DirectoryId::new(id), paths::leaf_name(id), created, updated)
                .with_parent(parent),
        )
    }

    fn child_contract(
        id: String,
        meta: &fs::Metadata,
        parent: &Arc<DirectoryInfoContract>,
    ) -> FileSystemInfoContract {
        let (created, updated) = paths::timestamps(meta);
        let name = paths::leaf_name(&id).to_string();
        if meta.is_dir() {
            DirectoryInfoContract::new(DirectoryId::new(id), name, created, updated)
                .with_parent(parent.clone())
                .into()
        } else {
            FileInfoContract::new(FileId::new(id), name, created, updated, meta.len(), None)
                .with_directory(parent.clone())
                .into()
        }
    }

    /// Snapshot of whatever now lives at `id`
    fn item_contract(
        &self,
        base: &Path,
        id: &str,
        operation: Operation,
    ) -> Result<FileSystemInfoContract> {
        let Some((_, meta)) = self.stat(base, id, operation)? else {
            return Err(GatewayError::not_found(operation, id));
        };
        if meta.is_dir() {
            return self.directory_contract(base, id, operation).map(Into::into);
        }
        let parent = paths::parent_id(id).unwrap_or(ROOT_ID);
        let parent = Arc::new(self.directory_contract(base, parent, operation)?);
        Ok(Self::child_contract(id.to_string(), &meta, &parent))
    }

    fn file_contract(
        &self,
        base: &Path,
        id: &str,
        operation: Operation,
    ) -> Result<FileInfoContract> {
        match self.item_contract(base, id, operation)? {
            FileSystemInfoContract::File(file) => Ok(file),
            FileSystemInfoContract::Directory(_) => Err(GatewayError::not_found(operation, id)),
        }
    }

    fn copy_tree(&self, source: &Path, target: &Path, id: &str, recurse: bool) -> Result<()> {
        self.host(Operation::CopyItem, id, || fs::create_dir(target))?;
        if !recurse {
            return Ok(());
        }
        let entries = self.host(Operation::CopyItem, id, || {
            fs::read_dir(source)?.collect::<io::Result<Vec<_>>>()
        })?;
        for entry in entries {
            let name = entry.file_name();
            let child_id = paths::child_id(id, &name.to_string_lossy());
            let (from, to) = (entry.path(), target.join(&name));
            let kind = self.host(Operation::CopyItem, &child_id, || entry.file_type())?;
            if kind.is_dir() {
                self.copy_tree(&from, &to, &child_id, true)?;
            } else {
                let _ = self.host(Operation::CopyItem, &child_id, || fs::copy(&from, &to))?;
            }
        }
        Ok(())
    }

    /// Drive quota for the disk holding `base`, when one can be matched
    fn disk_usage(base: &Path) -> (Option<String>, Option<u64>, Option<u64>) {
        let Ok(canonical) = base.canonicalize() else {
            return (None, None, None);
        };
        let disks = Disks::new_with_refreshed_list();
        disks
            .list()
            .iter()
            .filter(|disk| canonical.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().as_os_str().len())
            .map(|disk| {
                let free = disk.available_space();
                (
                    Some(disk.mount_point().display().to_string()),
                    Some(free),
                    Some(disk.total_space().saturating_sub(free)),
                )
            })
            .unwrap_or((None, None, None))
    }

    fn drive(&self, root: &RootName, base: &Path) -> DriveInfoContract {
        let (mount, free, used) = Self::disk_usage(base);
        let id = mount.unwrap_or_else(|| base.display().to_string());
        DriveInfoContract::new(id, root.to_string(), free, used)
    }
}

impl Gateway for LocalGateway {
    fn get_drive(&self, root: &RootName, _credential: Option<&str>) -> Result<DriveInfoContract> {
        let base = self.base(root, Operation::GetDrive)?;
        Ok(self.drive(root, &base))
    }

    fn get_root(
        &self,
        root: &RootName,
        _credential: Option<&str>,
    ) -> Result<RootDirectoryInfoContract> {
        let base = self.base(root, Operation::GetRoot)?;
        let meta = self.host(Operation::GetRoot, ROOT_ID, || fs::metadata(&base))?;
        let (created, updated) = paths::timestamps(&meta);
        diagnostics::debug!("Resolved local root {root}", root: base.display().to_string());
        Ok(RootDirectoryInfoContract::new(
            DirectoryId::new(ROOT_ID),
            created,
            updated,
            self.drive(root, &base),
        ))
    }

    fn get_child_item(
        &self,
        root: &RootName,
        parent: &DirectoryId,
    ) -> Result<Vec<FileSystemInfoContract>> {
        let operation = Operation::GetChildItem;
        let base = self.base(root, operation)?;
        let path = match self.stat(&base, parent.as_str(), operation)? {
            Some((path, meta)) if meta.is_dir() => path,
            _ => return Ok(Vec::new()),
        };
        let parent_contract = Arc::new(self.directory_contract(&base, parent.as_str(), operation)?);

        let entries = self.host(operation, parent.as_str(), || {
            fs::read_dir(&path)?.collect::<io::Result<Vec<_>>>()
        })?;
        let mut children = Vec::with_capacity(entries.len());
        for entry in entries {
            let name = entry.file_name().to_string_lossy().to_string();
            let id = paths::child_id(parent.as_str(), &name);
            let meta = self.host(operation, &id, || entry.metadata())?;
            if !meta.is_dir() && !meta.is_file() {
                diagnostics::debug!("Skipping special entry {id}", id: id.as_str());
                continue;
            }
            children.push(Self::child_contract(id, &meta, &parent_contract));
        }
        children.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(children)
    }

    fn clear_content(&self, root: &RootName, target: &FileId) -> Result<()> {
        let operation = Operation::ClearContent;
        let base = self.base(root, operation)?;
        let (path, _) = self.require_file(&base, target.as_str(), operation)?;
        self.host(operation, target.as_str(), || {
            fs::OpenOptions::new().write(true).truncate(true).open(&path)
        })?;
        Ok(())
    }

    fn get_content(&self, root: &RootName, source: &FileId) -> Result<ReadStream> {
        let operation = Operation::GetContent;
        let base = self.base(root, operation)?;
        let (path, _) = self.require_file(&base, source.as_str(), operation)?;
        let file = self.host(operation, source.as_str(), || fs::File::open(&path))?;
        Ok(Box::new(io::BufReader::new(file)))
    }

    fn set_content(&self, root: &RootName, target: &FileId, content: &mut dyn Read) -> Result<()> {
        let operation = Operation::SetContent;
        let base = self.base(root, operation)?;
        let (path, meta) = self.require_file(&base, target.as_str(), operation)?;
        let dir = path.parent().unwrap_or(base.as_path());
        // Content is staged in a sibling and renamed over the target, so a
        // failed copy leaves the old bytes in place.
        let mut staged = self.host(operation, target.as_str(), || {
            tempfile::Builder::new().prefix(".drivegate-").tempfile_in(dir)
        })?;
        // The stream is consumed as it is copied, so the copy itself is not retried.
        let written = io::copy(content, staged.as_file_mut())
            .map_err(|e| GatewayError::io(operation, target, e))?;
        self.host(operation, target.as_str(), || {
            fs::set_permissions(staged.path(), meta.permissions())
        })?;
        let _ = staged
            .persist(&path)
            .map_err(|e| GatewayError::io(operation, target, e.error))?;
        diagnostics::debug!(
            "Wrote {written} bytes to {target}",
            written: written,
            target: target.as_str()
        );
        Ok(())
    }

    fn copy_item(
        &self,
        root: &RootName,
        source: &FileSystemId,
        copy_name: &str,
        destination: &DirectoryId,
        recurse: bool,
    ) -> Result<FileSystemInfoContract> {
        let operation = Operation::CopyItem;
        let base = self.base(root, operation)?;
        let (from, _) = self.require_item(&base, source, operation)?;
        let _ = self.require_directory(&base, destination.as_str(), operation)?;
        let target_id = paths::child_id(destination.as_str(), copy_name);
        let into_itself = paths::is_within(destination.as_str(), source.as_str());
        if source.is_directory() && recurse && into_itself {
            return Err(GatewayError::invalid_argument(operation, "destination"));
        }
        let to = self.require_vacant(&base, &target_id, operation)?;

        if source.is_directory() {
            self.copy_tree(&from, &to, &target_id, recurse)?;
        } else {
            let _ = self.host(operation, &target_id, || fs::copy(&from, &to))?;
        }
        diagnostics::info!(
            "Copied {source} to {target}",
            source: source.as_str(),
            target: target_id.as_str()
        );
        self.item_contract(&base, &target_id, operation)
    }

    fn move_item(
        &self,
        root: &RootName,
        source: &FileSystemId,
        move_name: &str,
        destination: &DirectoryId,
    ) -> Result<FileSystemInfoContract> {
        let operation = Operation::MoveItem;
        let base = self.base(root, operation)?;
        if source.as_str() == ROOT_ID {
            return Err(GatewayError::invalid_argument(operation, "source"));
        }
        let (from, _) = self.require_item(&base, source, operation)?;
        let _ = self.require_directory(&base, destination.as_str(), operation)?;
        if source.is_directory() && paths::is_within(destination.as_str(), source.as_str()) {
            return Err(GatewayError::invalid_argument(operation, "destination"));
        }
        let target_id = paths::child_id(destination.as_str(), move_name);
        let to = self.require_vacant(&base, &target_id, operation)?;
        self.host(operation, source.as_str(), || fs::rename(&from, &to))?;
        diagnostics::info!(
            "Moved {source} to {target}",
            source: source.as_str(),
            target: target_id.as_str()
        );
        self.item_contract(&base, &target_id, operation)
    }

    fn new_directory_item(
        &self,
        root: &RootName,
        parent: &DirectoryId,
        name: &str,
    ) -> Result<DirectoryInfoContract> {
        let operation = Operation::NewDirectoryItem;
        let base = self.base(root, operation)?;
        let _ = self.require_directory(&base, parent.as_str(), operation)?;
        let id = paths::child_id(parent.as_str(), name);
        let path = self.require_vacant(&base, &id, operation)?;
        self.host(operation, &id, || fs::create_dir(&path))?;
        self.directory_contract(&base, &id, operation)
    }

    fn new_file_item(
        &self,
        root: &RootName,
        parent: &DirectoryId,
        name: &str,
        content: &mut dyn Read,
    ) -> Result<FileInfoContract> {
        let operation = Operation::NewFileItem;
        let base = self.base(root, operation)?;
        let _ = self.require_directory(&base, parent.as_str(), operation)?;
        let id = paths::child_id(parent.as_str(), name);
        let path = self.require_vacant(&base, &id, operation)?;
        let mut file = self.host(operation, &id, || {
            fs::OpenOptions::new().write(true).create_new(true).open(&path)
        })?;
        if let Err(e) = io::copy(content, &mut file) {
            drop(file);
            // Leave no half-written item behind.
            let _ = fs::remove_file(&path);
            return Err(GatewayError::io(operation, &id, e));
        }
        drop(file);
        self.file_contract(&base, &id, operation)
    }

    fn remove_item(&self, root: &RootName, target: &FileSystemId, recurse: bool) -> Result<()> {
        let operation = Operation::RemoveItem;
        let base = self.base(root, operation)?;
        if target.as_str() == ROOT_ID {
            return Err(GatewayError::invalid_argument(operation, "target"));
        }
        let (path, _) = self.require_item(&base, target, operation)?;
        match target {
            FileSystemId::File(_) => {
                self.host(operation, target.as_str(), || fs::remove_file(&path))?
            }
            FileSystemId::Directory(_) if recurse => {
                self.host(operation, target.as_str(), || fs::remove_dir_all(&path))?
            }
            FileSystemId::Directory(_) => {
                let occupied = self.host(operation, target.as_str(), || {
                    Ok(fs::read_dir(&path)?.next().is_some())
                })?;
                if occupied {
                    return Err(GatewayError::directory_not_empty(operation, target));
                }
                self.host(operation, target.as_str(), || fs::remove_dir(&path))?
            }
        }
        diagnostics::info!("Removed {target}", target: target.as_str());
        Ok(())
    }

    fn rename_item(
        &self,
        root: &RootName,
        target: &FileSystemId,
        new_name: &str,
    ) -> Result<FileSystemInfoContract> {
        let operation = Operation::RenameItem;
        let base = self.base(root, operation)?;
        let Some(parent) = paths::parent_id(target.as_str()) else {
            return Err(GatewayError::invalid_argument(operation, "target"));
        };
        let (from, _) = self.require_item(&base, target, operation)?;
        let renamed = paths::child_id(parent, new_name);
        if renamed == target.as_str() {
            return self.item_contract(&base, &renamed, operation);
        }
        let to = self.require_vacant(&base, &renamed, operation)?;
        self.host(operation, target.as_str(), || fs::rename(&from, &to))?;
        self.item_contract(&base, &renamed, operation)
    }
}
