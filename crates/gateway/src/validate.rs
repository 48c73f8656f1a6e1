// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Argument validation shared by every backend.
//!
//! [`Validated`] checks ids and names before delegating, so an empty id or a
//! malformed name fails the same way everywhere and never reaches a backend.

use async_trait::async_trait;

use crate::contract::{
    DirectoryInfoContract, DriveInfoContract, FileInfoContract, FileSystemInfoContract,
    RootDirectoryInfoContract,
};
use crate::error::{GatewayError, Operation, Result};
use crate::gateway::{AsyncGateway, AsyncReadStream, ProgressSink};
use crate::id::{DirectoryId, FileId, FileSystemId, RootName};

/// Checks that `name` can be a leaf display name.
///
/// Blank names, `.`/`..`, and names containing a path separator are
/// rejected: names never carry hierarchy.
pub fn require_name(name: &str, operation: Operation, argument: &'static str) -> Result<()> {
    let invalid = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\');
    if invalid {
        Err(GatewayError::invalid_argument(operation, argument))
    } else {
        Ok(())
    }
}

/// Checks the root locator carried by every call
pub fn require_root(root: &RootName, operation: Operation) -> Result<()> {
    if root.root().is_empty() || root.scheme().is_empty() {
        Err(GatewayError::invalid_argument(operation, "root"))
    } else {
        Ok(())
    }
}

/// Decorator that validates arguments before delegating to `G`
pub struct Validated<G> {
    inner: G,
}

impl<G> Validated<G> {
    pub fn new(inner: G) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }

    pub fn into_inner(self) -> G {
        self.inner
    }
}

#[async_trait]
impl<G: AsyncGateway> AsyncGateway for Validated<G> {
    async fn get_drive(
        &self,
        root: &RootName,
        credential: Option<&str>,
    ) -> Result<DriveInfoContract> {
        require_root(root, Operation::GetDrive)?;
        self.inner.get_drive(root, credential).await
    }

    async fn get_root(
        &self,
        root: &RootName,
        credential: Option<&str>,
    ) -> Result<RootDirectoryInfoContract> {
        require_root(root, Operation::GetRoot)?;
        self.inner.get_root(root, credential).await
    }

    async fn get_child_item(
        &self,
        root: &RootName,
        parent: &DirectoryId,
    ) -> Result<Vec<FileSystemInfoContract>> {
        require_root(root, Operation::GetChildItem)?;
        let _ = parent.require(Operation::GetChildItem, "parent")?;
        self.inner.get_child_item(root, parent).await
    }

    async fn clear_content(&self, root: &RootName, target: &FileId) -> Result<()> {
        require_root(root, Operation::ClearContent)?;
        let _ = target.require(Operation::ClearContent, "target")?;
        self.inner.clear_content(root, target).await
    }

    async fn get_content(&self, root: &RootName, source: &FileId) -> Result<AsyncReadStream> {
        require_root(root, Operation::GetContent)?;
        let _ = source.require(Operation::GetContent, "source")?;
        self.inner.get_content(root, source).await
    }

    async fn set_content(
        &self,
        root: &RootName,
        target: &FileId,
        content: AsyncReadStream,
        progress: &dyn ProgressSink,
    ) -> Result<()> {
        require_root(root, Operation::SetContent)?;
        let _ = target.require(Operation::SetContent, "target")?;
        self.inner.set_content(root, target, content, progress).await
    }

    async fn copy_item(
        &self,
        root: &RootName,
        source: &FileSystemId,
        copy_name: &str,
        destination: &DirectoryId,
        recurse: bool,
    ) -> Result<FileSystemInfoContract> {
        require_root(root, Operation::CopyItem)?;
        let _ = source.require(Operation::CopyItem, "source")?;
        require_name(copy_name, Operation::CopyItem, "copy_name")?;
        let _ = destination.require(Operation::CopyItem, "destination")?;
        self.inner
            .copy_item(root, source, copy_name, destination, recurse)
            .await
    }

    async fn move_item(
        &self,
        root: &RootName,
        source: &FileSystemId,
        move_name: &str,
        destination: &DirectoryId,
    ) -> Result<FileSystemInfoContract> {
        require_root(root, Operation::MoveItem)?;
        let _ = source.require(Operation::MoveItem, "source")?;
        require_name(move_name, Operation::MoveItem, "move_name")?;
        let _ = destination.require(Operation::MoveItem, "destination")?;
        self.inner
            .move_item(root, source, move_name, destination)
            .await
    }

    async fn new_directory_item(
        &self,
        root: &RootName,
        parent: &DirectoryId,
        name: &str,
    ) -> Result<DirectoryInfoContract> {
        require_root(root, Operation::NewDirectoryItem)?;
        let _ = parent.require(Operation::NewDirectoryItem, "parent")?;
        require_name(name, Operation::NewDirectoryItem, "name")?;
        self.inner.new_directory_item(root, parent, name).await
    }

    async fn new_file_item(
        &self,
        root: &RootName,
        parent: &DirectoryId,
        name: &str,
        content: AsyncReadStream,
        progress: &dyn ProgressSink,
    ) -> Result<FileInfoContract> {
        require_root(root, Operation::NewFileItem)?;
        let _ = parent.require(Operation::NewFileItem, "parent")?;
        require_name(name, Operation::NewFileItem, "name")?;
        self.inner
            .new_file_item(root, parent, name, content, progress)
            .await
    }

    async fn remove_item(
        &self,
        root: &RootName,
        target: &FileSystemId,
        recurse: bool,
    ) -> Result<()> {
        require_root(root, Operation::RemoveItem)?;
        let _ = target.require(Operation::RemoveItem, "target")?;
        self.inner.remove_item(root, target, recurse).await
    }

    async fn rename_item(
        &self,
        root: &RootName,
        target: &FileSystemId,
        new_name: &str,
    ) -> Result<FileSystemInfoContract> {
        require_root(root, Operation::RenameItem)?;
        let _ = target.require(Operation::RenameItem, "target")?;
        require_name(new_name, Operation::RenameItem, "new_name")?;
        self.inner.rename_item(root, target, new_name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{bytes_stream, NoProgress};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls that made it past validation; every call reports not-found.
    #[derive(Default)]
    struct Probe {
        calls: AtomicUsize,
    }

    impl Probe {
        fn hit<T>(&self, operation: Operation) -> Result<T> {
            let _ = self.calls.fetch_add(1, Ordering::SeqCst);
            Err(GatewayError::not_found(operation, "probe"))
        }
    }

    #[async_trait]
    impl AsyncGateway for Probe {
        async fn get_drive(&self, _: &RootName, _: Option<&str>) -> Result<DriveInfoContract> {
            self.hit(Operation::GetDrive)
        }
        async fn get_root(
            &self,
            _: &RootName,
            _: Option<&str>,
        ) -> Result<RootDirectoryInfoContract> {
            self.hit(Operation::GetRoot)
        }
        async fn get_child_item(
            &self,
            _: &RootName,
            _: &DirectoryId,
        ) -> Result<Vec<FileSystemInfoContract>> {
            self.hit(Operation::GetChildItem)
        }
        async fn clear_content(&self, _: &RootName, _: &FileId) -> Result<()> {
            self.hit(Operation::ClearContent)
        }
        async fn get_content(&self, _: &RootName, _: &FileId) -> Result<AsyncReadStream> {
            self.hit(Operation::GetContent)
        }
        async fn set_content(
            &self,
            _: &RootName,
            _: &FileId,
            _: AsyncReadStream,
            _: &dyn ProgressSink,
        ) -> Result<()> {
            self.hit(Operation::SetContent)
        }
        async fn copy_item(
            &self,
            _: &RootName,
            _: &FileSystemId,
            _: &str,
            _: &DirectoryId,
            _: bool,
        ) -> Result<FileSystemInfoContract> {
            self.hit(Operation::CopyItem)
        }
        async fn move_item(
            &self,
            _: &RootName,
            _: &FileSystemId,
            _: &str,
            _: &DirectoryId,
        ) -> Result<FileSystemInfoContract> {
            self.hit(Operation::MoveItem)
        }
        async fn new_directory_item(
            &self,
            _: &RootName,
            _: &DirectoryId,
            _: &str,
        ) -> Result<DirectoryInfoContract> {
            self.hit(Operation::NewDirectoryItem)
        }
        async fn new_file_item(
            &self,
            _: &RootName,
            _: &DirectoryId,
            _: &str,
            _: AsyncReadStream,
            _: &dyn ProgressSink,
        ) -> Result<FileInfoContract> {
            self.hit(Operation::NewFileItem)
        }
        async fn remove_item(&self, _: &RootName, _: &FileSystemId, _: bool) -> Result<()> {
            self.hit(Operation::RemoveItem)
        }
        async fn rename_item(
            &self,
            _: &RootName,
            _: &FileSystemId,
            _: &str,
        ) -> Result<FileSystemInfoContract> {
            self.hit(Operation::RenameItem)
        }
    }

    fn root() -> RootName {
        RootName::new("probe", "r")
    }

    #[tokio::test]
    async fn test_empty_ids_fail_before_backend() {
        let gw = Validated::new(Probe::default());
        let err = gw
            .get_content(&root(), &FileId::new(""))
            .await
            .err()
            .unwrap();
        assert!(err.is_invalid_argument());

        let err = gw
            .remove_item(&root(), &FileSystemId::from(DirectoryId::new("")), true)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::InvalidArgument {
                operation: Operation::RemoveItem,
                argument: "target"
            }
        ));
        assert_eq!(gw.inner().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_bad_names_fail_before_backend() {
        let gw = Validated::new(Probe::default());
        let parent = DirectoryId::new("p");
        for name in ["", "  ", ".", "..", "a/b", "a\\b"] {
            let err = gw
                .new_file_item(&root(), &parent, name, bytes_stream(Vec::new()), &NoProgress)
                .await
                .unwrap_err();
            assert!(err.is_invalid_argument(), "name {:?} accepted", name);
        }
        assert_eq!(gw.inner().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_valid_arguments_reach_backend() {
        let gw = Validated::new(Probe::default());
        let err = gw
            .rename_item(&root(), &FileId::new("f").into(), "new.txt")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(gw.inner().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_local_backend_never_sees_bad_names() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = RootName::new("file", dir.path().to_string_lossy());
        let gw = Validated::new(crate::gateway::Blocking::new(crate::local::LocalGateway::new()));
        let top = DirectoryId::new("/");

        let err = gw.new_directory_item(&root, &top, "..").await.unwrap_err();
        assert!(err.is_invalid_argument());
        let err = gw
            .copy_item(&root, &FileId::new("").into(), "copy", &top, false)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::InvalidArgument {
                operation: Operation::CopyItem,
                argument: "source"
            }
        ));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
