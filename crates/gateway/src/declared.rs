// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Capability guard.
//!
//! [`Declared`] refuses any operation outside the capability set a root was
//! configured with, so callers driving a gateway generically cannot reach an
//! operation the root never declared.

use async_trait::async_trait;

use crate::capability::{Capabilities, Capability};
use crate::contract::{
    DirectoryInfoContract, DriveInfoContract, FileInfoContract, FileSystemInfoContract,
    RootDirectoryInfoContract,
};
use crate::error::{GatewayError, Result};
use crate::gateway::{AsyncGateway, AsyncReadStream, ProgressSink};
use crate::id::{DirectoryId, FileId, FileSystemId, RootName};

pub struct Declared<G> {
    inner: G,
    scheme: String,
    capabilities: Capabilities,
}

impl<G> Declared<G> {
    pub fn new<S: Into<String>>(inner: G, scheme: S, capabilities: Capabilities) -> Self {
        Self {
            inner,
            scheme: scheme.into(),
            capabilities,
        }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    fn require(&self, capability: Capability) -> Result<()> {
        if self.capabilities.contains(capability) {
            Ok(())
        } else {
            diagnostics::warn!(
                "Refusing undeclared {capability} on scheme {scheme}",
                capability: capability.as_str(),
                scheme: self.scheme.as_str()
            );
            Err(GatewayError::Unsupported {
                scheme: self.scheme.clone(),
                capability,
            })
        }
    }
}

/// Picks the file or directory flavour of a kind-split capability
fn by_kind(id: &FileSystemId, file: Capability, directory: Capability) -> Capability {
    if id.is_directory() { directory } else { file }
}

#[async_trait]
impl<G: AsyncGateway> AsyncGateway for Declared<G> {
    async fn get_drive(
        &self,
        root: &RootName,
        credential: Option<&str>,
    ) -> Result<DriveInfoContract> {
        self.require(Capability::GetDrive)?;
        self.inner.get_drive(root, credential).await
    }

    async fn get_root(
        &self,
        root: &RootName,
        credential: Option<&str>,
    ) -> Result<RootDirectoryInfoContract> {
        self.require(Capability::GetRoot)?;
        self.inner.get_root(root, credential).await
    }

    async fn get_child_item(
        &self,
        root: &RootName,
        parent: &DirectoryId,
    ) -> Result<Vec<FileSystemInfoContract>> {
        self.require(Capability::GetChildItem)?;
        self.inner.get_child_item(root, parent).await
    }

    async fn clear_content(&self, root: &RootName, target: &FileId) -> Result<()> {
        self.require(Capability::ClearContent)?;
        self.inner.clear_content(root, target).await
    }

    async fn get_content(&self, root: &RootName, source: &FileId) -> Result<AsyncReadStream> {
        self.require(Capability::GetContent)?;
        self.inner.get_content(root, source).await
    }

    async fn set_content(
        &self,
        root: &RootName,
        target: &FileId,
        content: AsyncReadStream,
        progress: &dyn ProgressSink,
    ) -> Result<()> {
        self.require(Capability::SetContent)?;
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
        self.require(by_kind(
            source,
            Capability::CopyFileItem,
            Capability::CopyDirectoryItem,
        ))?;
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
        self.require(by_kind(
            source,
            Capability::MoveFileItem,
            Capability::MoveDirectoryItem,
        ))?;
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
        self.require(Capability::NewDirectoryItem)?;
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
        self.require(Capability::NewFileItem)?;
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
        self.require(Capability::RemoveItem)?;
        self.inner.remove_item(root, target, recurse).await
    }

    async fn rename_item(
        &self,
        root: &RootName,
        target: &FileSystemId,
        new_name: &str,
    ) -> Result<FileSystemInfoContract> {
        self.require(by_kind(
            target,
            Capability::RenameFileItem,
            Capability::RenameDirectoryItem,
        ))?;
        self.inner.rename_item(root, target, new_name).await
    }
}
