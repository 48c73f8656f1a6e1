// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! The gateway contract, in a blocking and a suspending form.
//!
//! Both traits carry the same operations with the same argument and result
//! types. [`Blocking`] lifts any [`Gateway`] into an [`AsyncGateway`] so
//! callers can hold every backend as `Arc<dyn AsyncGateway>`.

use std::io::Read;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncRead;
use tokio_util::io::SyncIoBridge;

use crate::contract::{
    DirectoryInfoContract, DriveInfoContract, FileInfoContract, FileSystemInfoContract,
    RootDirectoryInfoContract,
};
use crate::error::{GatewayError, Operation, Result};
use crate::id::{DirectoryId, FileId, FileSystemId, RootName};

/// Content returned by the blocking form
pub type ReadStream = Box<dyn Read + Send>;

/// Content accepted and returned by the suspending form
pub type AsyncReadStream = Pin<Box<dyn AsyncRead + Send>>;

/// Receives (bytes transferred, total bytes) during uploads
pub trait ProgressSink: Send + Sync {
    fn report(&self, transferred: u64, total: u64);
}

impl<F> ProgressSink for F
where
    F: Fn(u64, u64) + Send + Sync,
{
    fn report(&self, transferred: u64, total: u64) {
        self(transferred, total)
    }
}

/// A sink that drops every report
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _transferred: u64, _total: u64) {}
}

/// Wraps an in-memory buffer as an async content stream
pub fn bytes_stream<B: Into<Vec<u8>>>(bytes: B) -> AsyncReadStream {
    Box::pin(std::io::Cursor::new(bytes.into()))
}

/// Blocking gateway: every call runs to completion on the caller's thread.
pub trait Gateway: Send + Sync {
    fn get_drive(&self, root: &RootName, credential: Option<&str>) -> Result<DriveInfoContract>;

    fn get_root(
        &self,
        root: &RootName,
        credential: Option<&str>,
    ) -> Result<RootDirectoryInfoContract>;

    /// Children of `parent`; empty when `parent` does not exist
    fn get_child_item(
        &self,
        root: &RootName,
        parent: &DirectoryId,
    ) -> Result<Vec<FileSystemInfoContract>>;

    fn clear_content(&self, root: &RootName, target: &FileId) -> Result<()>;

    fn get_content(&self, root: &RootName, source: &FileId) -> Result<ReadStream>;

    fn set_content(&self, root: &RootName, target: &FileId, content: &mut dyn Read) -> Result<()>;

    fn copy_item(
        &self,
        root: &RootName,
        source: &FileSystemId,
        copy_name: &str,
        destination: &DirectoryId,
        recurse: bool,
    ) -> Result<FileSystemInfoContract>;

    fn move_item(
        &self,
        root: &RootName,
        source: &FileSystemId,
        move_name: &str,
        destination: &DirectoryId,
    ) -> Result<FileSystemInfoContract>;

    fn new_directory_item(
        &self,
        root: &RootName,
        parent: &DirectoryId,
        name: &str,
    ) -> Result<DirectoryInfoContract>;

    fn new_file_item(
        &self,
        root: &RootName,
        parent: &DirectoryId,
        name: &str,
        content: &mut dyn Read,
    ) -> Result<FileInfoContract>;

    fn remove_item(&self, root: &RootName, target: &FileSystemId, recurse: bool) -> Result<()>;

    fn rename_item(
        &self,
        root: &RootName,
        target: &FileSystemId,
        new_name: &str,
    ) -> Result<FileSystemInfoContract>;
}

/// Suspending gateway: every call yields while the backend works.
#[async_trait]
pub trait AsyncGateway: Send + Sync {
    async fn get_drive(
        &self,
        root: &RootName,
        credential: Option<&str>,
    ) -> Result<DriveInfoContract>;

    async fn get_root(
        &self,
        root: &RootName,
        credential: Option<&str>,
    ) -> Result<RootDirectoryInfoContract>;

    /// Children of `parent`; empty when `parent` does not exist
    async fn get_child_item(
        &self,
        root: &RootName,
        parent: &DirectoryId,
    ) -> Result<Vec<FileSystemInfoContract>>;

    async fn clear_content(&self, root: &RootName, target: &FileId) -> Result<()>;

    async fn get_content(&self, root: &RootName, source: &FileId) -> Result<AsyncReadStream>;

    async fn set_content(
        &self,
        root: &RootName,
        target: &FileId,
        content: AsyncReadStream,
        progress: &dyn ProgressSink,
    ) -> Result<()>;

    async fn copy_item(
        &self,
        root: &RootName,
        source: &FileSystemId,
        copy_name: &str,
        destination: &DirectoryId,
        recurse: bool,
    ) -> Result<FileSystemInfoContract>;

    async fn move_item(
        &self,
        root: &RootName,
        source: &FileSystemId,
        move_name: &str,
        destination: &DirectoryId,
    ) -> Result<FileSystemInfoContract>;

    async fn new_directory_item(
        &self,
        root: &RootName,
        parent: &DirectoryId,
        name: &str,
    ) -> Result<DirectoryInfoContract>;

    async fn new_file_item(
        &self,
        root: &RootName,
        parent: &DirectoryId,
        name: &str,
        content: AsyncReadStream,
        progress: &dyn ProgressSink,
    ) -> Result<FileInfoContract>;

    async fn remove_item(
        &self,
        root: &RootName,
        target: &FileSystemId,
        recurse: bool,
    ) -> Result<()>;

    async fn rename_item(
        &self,
        root: &RootName,
        target: &FileSystemId,
        new_name: &str,
    ) -> Result<FileSystemInfoContract>;
}

#[async_trait]
impl<T: AsyncGateway + ?Sized> AsyncGateway for Arc<T> {
    async fn get_drive(
        &self,
        root: &RootName,
        credential: Option<&str>,
    ) -> Result<DriveInfoContract> {
        (**self).get_drive(root, credential).await
    }

    async fn get_root(
        &self,
        root: &RootName,
        credential: Option<&str>,
    ) -> Result<RootDirectoryInfoContract> {
        (**self).get_root(root, credential).await
    }

    async fn get_child_item(
        &self,
        root: &RootName,
        parent: &DirectoryId,
    ) -> Result<Vec<FileSystemInfoContract>> {
        (**self).get_child_item(root, parent).await
    }

    async fn clear_content(&self, root: &RootName, target: &FileId) -> Result<()> {
        (**self).clear_content(root, target).await
    }

    async fn get_content(&self, root: &RootName, source: &FileId) -> Result<AsyncReadStream> {
        (**self).get_content(root, source).await
    }

    async fn set_content(
        &self,
        root: &RootName,
        target: &FileId,
        content: AsyncReadStream,
        progress: &dyn ProgressSink,
    ) -> Result<()> {
        (**self).set_content(root, target, content, progress).await
    }

    async fn copy_item(
        &self,
        root: &RootName,
        source: &FileSystemId,
        copy_name: &str,
        destination: &DirectoryId,
        recurse: bool,
    ) -> Result<FileSystemInfoContract> {
        (**self)
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
        (**self).move_item(root, source, move_name, destination).await
    }

    async fn new_directory_item(
        &self,
        root: &RootName,
        parent: &DirectoryId,
        name: &str,
    ) -> Result<DirectoryInfoContract> {
        (**self).new_directory_item(root, parent, name).await
    }

    async fn new_file_item(
        &self,
        root: &RootName,
        parent: &DirectoryId,
        name: &str,
        content: AsyncReadStream,
        progress: &dyn ProgressSink,
    ) -> Result<FileInfoContract> {
        (**self)
            .new_file_item(root, parent, name, content, progress)
            .await
    }

    async fn remove_item(
        &self,
        root: &RootName,
        target: &FileSystemId,
        recurse: bool,
    ) -> Result<()> {
        (**self).remove_item(root, target, recurse).await
    }

    async fn rename_item(
        &self,
        root: &RootName,
        target: &FileSystemId,
        new_name: &str,
    ) -> Result<FileSystemInfoContract> {
        (**self).rename_item(root, target, new_name).await
    }
}

/// Runs a blocking [`Gateway`] on tokio's blocking pool.
///
/// Uploads stream through [`SyncIoBridge`]; downloads are drained into memory
/// on the blocking thread and handed back as a cursor. Progress is reported
/// once, after a write completes.
pub struct Blocking<G> {
    inner: Arc<G>,
}

impl<G> Blocking<G> {
    pub fn new(inner: G) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }
}

impl<G: Gateway + 'static> Blocking<G> {
    async fn run<T, F>(&self, operation: Operation, call: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&G) -> Result<T> + Send + 'static,
    {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || call(&*inner))
            .await
            .map_err(|e| GatewayError::Backend {
                operation,
                target: "blocking task".to_string(),
                message: e.to_string(),
            })?
    }
}

/// Counts bytes as they are pulled through a blocking reader
struct CountingReader<R> {
    inner: R,
    count: u64,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}

#[async_trait]
impl<G: Gateway + 'static> AsyncGateway for Blocking<G> {
    async fn get_drive(
        &self,
        root: &RootName,
        credential: Option<&str>,
    ) -> Result<DriveInfoContract> {
        let root = root.clone();
        let credential = credential.map(str::to_owned);
        self.run(Operation::GetDrive, move |g| {
            g.get_drive(&root, credential.as_deref())
        })
        .await
    }

    async fn get_root(
        &self,
        root: &RootName,
        credential: Option<&str>,
    ) -> Result<RootDirectoryInfoContract> {
        let root = root.clone();
        let credential = credential.map(str::to_owned);
        self.run(Operation::GetRoot, move |g| {
            g.get_root(&root, credential.as_deref())
        })
        .await
    }

    async fn get_child_item(
        &self,
        root: &RootName,
        parent: &DirectoryId,
    ) -> Result<Vec<FileSystemInfoContract>> {
        let (root, parent) = (root.clone(), parent.clone());
        self.run(Operation::GetChildItem, move |g| {
            g.get_child_item(&root, &parent)
        })
        .await
    }

    async fn clear_content(&self, root: &RootName, target: &FileId) -> Result<()> {
        let (root, target) = (root.clone(), target.clone());
        self.run(Operation::ClearContent, move |g| {
            g.clear_content(&root, &target)
        })
        .await
    }

    async fn get_content(&self, root: &RootName, source: &FileId) -> Result<AsyncReadStream> {
        let (root, source) = (root.clone(), source.clone());
        let bytes = self
            .run(Operation::GetContent, move |g| {
                let mut reader = g.get_content(&root, &source)?;
                let mut buf = Vec::new();
                let _ = reader
                    .read_to_end(&mut buf)
                    .map_err(|e| GatewayError::io(Operation::GetContent, &source, e))?;
                Ok(buf)
            })
            .await?;
        Ok(bytes_stream(bytes))
    }

    async fn set_content(
        &self,
        root: &RootName,
        target: &FileId,
        content: AsyncReadStream,
        progress: &dyn ProgressSink,
    ) -> Result<()> {
        let (root, target) = (root.clone(), target.clone());
        let bridge = SyncIoBridge::new(content);
        let written = self
            .run(Operation::SetContent, move |g| {
                let mut reader = CountingReader {
                    inner: bridge,
                    count: 0,
                };
                g.set_content(&root, &target, &mut reader)?;
                Ok(reader.count)
            })
            .await?;
        progress.report(written, written);
        Ok(())
    }

    async fn copy_item(
        &self,
        root: &RootName,
        source: &FileSystemId,
        copy_name: &str,
        destination: &DirectoryId,
        recurse: bool,
    ) -> Result<FileSystemInfoContract> {
        let (root, source, destination) = (root.clone(), source.clone(), destination.clone());
        let copy_name = copy_name.to_owned();
        self.run(Operation::CopyItem, move |g| {
            g.copy_item(&root, &source, &copy_name, &destination, recurse)
        })
        .await
    }

    async fn move_item(
        &self,
        root: &RootName,
        source: &FileSystemId,
        move_name: &str,
        destination: &DirectoryId,
    ) -> Result<FileSystemInfoContract> {
        let (root, source, destination) = (root.clone(), source.clone(), destination.clone());
        let move_name = move_name.to_owned();
        self.run(Operation::MoveItem, move |g| {
            g.move_item(&root, &source, &move_name, &destination)
        })
        .await
    }

    async fn new_directory_item(
        &self,
        root: &RootName,
        parent: &DirectoryId,
        name: &str,
    ) -> Result<DirectoryInfoContract> {
        let (root, parent) = (root.clone(), parent.clone());
        let name = name.to_owned();
        self.run(Operation::NewDirectoryItem, move |g| {
            g.new_directory_item(&root, &parent, &name)
        })
        .await
    }

    async fn new_file_item(
        &self,
        root: &RootName,
        parent: &DirectoryId,
        name: &str,
        content: AsyncReadStream,
        progress: &dyn ProgressSink,
    ) -> Result<FileInfoContract> {
        let (root, parent) = (root.clone(), parent.clone());
        let name = name.to_owned();
        let mut bridge = SyncIoBridge::new(content);
        let file = self
            .run(Operation::NewFileItem, move |g| {
                g.new_file_item(&root, &parent, &name, &mut bridge)
            })
            .await?;
        progress.report(file.size, file.size);
        Ok(file)
    }

    async fn remove_item(
        &self,
        root: &RootName,
        target: &FileSystemId,
        recurse: bool,
    ) -> Result<()> {
        let (root, target) = (root.clone(), target.clone());
        self.run(Operation::RemoveItem, move |g| {
            g.remove_item(&root, &target, recurse)
        })
        .await
    }

    async fn rename_item(
        &self,
        root: &RootName,
        target: &FileSystemId,
        new_name: &str,
    ) -> Result<FileSystemInfoContract> {
        let (root, target) = (root.clone(), target.clone());
        let new_name = new_name.to_owned();
        self.run(Operation::RenameItem, move |g| {
            g.rename_item(&root, &target, &new_name)
        })
        .await
    }
}
