// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;

use super::api::{ApiResult, DriveApi, DriveApiError, DriveItem, ItemPatch, TransferProgress};
use crate::contract::{
    DirectoryInfoContract, DriveInfoContract, FileInfoContract, FileSystemInfoContract,
    RootDirectoryInfoContract, SEPARATOR,
};
use crate::error::{GatewayError, Operation, Result};
use crate::gateway::{bytes_stream, AsyncGateway, AsyncReadStream, ProgressSink};
use crate::id::{DirectoryId, FileId, FileSystemId, RootName};
use crate::retry::RetryPolicy;
use crate::session::{Authorizer, SessionCache};

/// An authenticated client of one drive
pub struct DriveSession {
    api: Arc<dyn DriveApi>,
    account: Option<String>,
}

impl DriveSession {
    pub fn new(api: Arc<dyn DriveApi>, account: Option<&str>) -> Self {
        Self {
            api,
            account: account.map(str::to_owned),
        }
    }

    pub fn api(&self) -> &Arc<dyn DriveApi> {
        &self.api
    }

    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }
}

/// Suspending gateway over a flat-id drive service.
///
/// Each service request is retried on its own, so a multi-step operation
/// only repeats the step that failed. Sessions are established once per
/// root and reused for the gateway's lifetime.
pub struct RemoteGateway {
    scheme: String,
    authorizer: Arc<dyn Authorizer<DriveSession>>,
    sessions: SessionCache<DriveSession>,
    credential: Option<String>,
    retry: RetryPolicy,
}

/// Maps a service failure onto the gateway error vocabulary
fn api_error(
    root: &RootName,
    operation: Operation,
    target: &str,
    error: DriveApiError,
) -> GatewayError {
    match error {
        DriveApiError::NotFound(_) => GatewayError::not_found(operation, target),
        DriveApiError::Conflict(name) => GatewayError::conflict(operation, name),
        DriveApiError::NotEmpty(_) => GatewayError::directory_not_empty(operation, target),
        DriveApiError::Unauthorized(reason) => {
            GatewayError::root_unresolved(operation, root, reason)
        }
        DriveApiError::Fault(message) => GatewayError::Transient {
            operation,
            target: target.to_string(),
            message,
        },
        DriveApiError::BadRequest(message) => GatewayError::Backend {
            operation,
            target: target.to_string(),
            message,
        },
    }
}

/// Contract for a service item hanging below `parent`
fn item_contract(
    item: DriveItem,
    parent: Option<Arc<DirectoryInfoContract>>,
) -> FileSystemInfoContract {
    if item.is_folder() {
        folder_contract(item, parent).into()
    } else {
        let file = FileInfoContract::new(
            FileId::new(item.id),
            item.name,
            item.created,
            item.modified,
            item.size.unwrap_or(0),
            item.hash,
        );
        match parent {
            Some(parent) => file.with_directory(parent).into(),
            None => file.into(),
        }
    }
}

fn folder_contract(
    item: DriveItem,
    parent: Option<Arc<DirectoryInfoContract>>,
) -> DirectoryInfoContract {
    let name = if item.parent.is_none() {
        SEPARATOR.to_string()
    } else {
        item.name
    };
    let folder =
        DirectoryInfoContract::new(DirectoryId::new(item.id), name, item.created, item.modified);
    match parent {
        Some(parent) => folder.with_parent(parent),
        None => folder,
    }
}

/// Reads a whole upload into memory so a failed request can be resent
async fn buffer(
    mut content: AsyncReadStream,
    operation: Operation,
    target: &str,
) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let _ = content
        .read_to_end(&mut bytes)
        .await
        .map_err(|e| GatewayError::io(operation, target, e))?;
    Ok(bytes)
}

impl RemoteGateway {
    pub fn new<S: Into<String>>(scheme: S, authorizer: Arc<dyn Authorizer<DriveSession>>) -> Self {
        Self {
            scheme: scheme.into(),
            authorizer,
            sessions: SessionCache::new(),
            credential: None,
            retry: RetryPolicy::default(),
        }
    }

    /// Credential used when an operation does not carry one
    #[must_use]
    pub fn with_credential<C: Into<String>>(mut self, credential: C) -> Self {
        self.credential = Some(credential.into());
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn sessions(&self) -> &SessionCache<DriveSession> {
        &self.sessions
    }

    async fn session(
        &self,
        root: &RootName,
        credential: Option<&str>,
        operation: Operation,
    ) -> Result<Arc<DriveSession>> {
        if root.scheme() != self.scheme {
            return Err(GatewayError::root_unresolved(
                operation,
                root,
                format!("scheme '{}' is not '{}'", root.scheme(), self.scheme),
            ));
        }
        let credential = credential.or(self.credential.as_deref());
        self.sessions
            .get_or_authorize(root, credential, self.authorizer.as_ref())
            .await
            .map_err(|e| match e {
                GatewayError::RootUnresolved { root, reason, .. } => GatewayError::RootUnresolved {
                    operation,
                    root,
                    reason,
                },
                other => other,
            })
    }

    /// Issues one service request under the retry policy
    async fn call<T, F, Fut>(
        &self,
        root: &RootName,
        operation: Operation,
        target: &str,
        request: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        self.retry
            .retry(operation.as_str(), request)
            .await
            .map_err(|e| api_error(root, operation, target, e))
    }

    async fn lookup(
        &self,
        session: &DriveSession,
        root: &RootName,
        operation: Operation,
        id: &str,
    ) -> Result<DriveItem> {
        self.call(root, operation, id, || session.api().get_item(id)).await
    }

    /// Fetches `id`, insisting the service item has the kind the id claims
    async fn require_item(
        &self,
        session: &DriveSession,
        root: &RootName,
        operation: Operation,
        id: &FileSystemId,
    ) -> Result<DriveItem> {
        let item = self.lookup(session, root, operation, id.as_str()).await?;
        if item.is_folder() == id.is_directory() {
            Ok(item)
        } else {
            Err(GatewayError::not_found(operation, id))
        }
    }

    async fn require_folder(
        &self,
        session: &DriveSession,
        root: &RootName,
        operation: Operation,
        id: &DirectoryId,
    ) -> Result<DriveItem> {
        self.require_item(session, root, operation, &FileSystemId::from(id))
            .await
    }

    /// Directory contract for folder `id` with its ancestors up to the root
    async fn directory_chain(
        &self,
        session: &DriveSession,
        root: &RootName,
        operation: Operation,
        id: &str,
    ) -> Result<Arc<DirectoryInfoContract>> {
        let mut lineage = vec![self.lookup(session, root, operation, id).await?];
        while let Some(parent) = lineage.last().and_then(|item| item.parent.clone()) {
            lineage.push(self.lookup(session, root, operation, &parent).await?);
        }
        let mut chain: Option<Arc<DirectoryInfoContract>> = None;
        for item in lineage.into_iter().rev() {
            chain = Some(Arc::new(folder_contract(item, chain)));
        }
        chain.ok_or_else(|| GatewayError::not_found(operation, id))
    }

    /// Contract for `item` with its full ancestry attached
    async fn attach(
        &self,
        session: &DriveSession,
        root: &RootName,
        operation: Operation,
        item: DriveItem,
    ) -> Result<FileSystemInfoContract> {
        let parent = match &item.parent {
            Some(parent) => Some(self.directory_chain(session, root, operation, parent).await?),
            None => None,
        };
        Ok(item_contract(item, parent))
    }

    /// Fails with a conflict when `name` is taken below `parent` by anything but `except`
    async fn ensure_vacant(
        &self,
        session: &DriveSession,
        root: &RootName,
        operation: Operation,
        parent: &str,
        name: &str,
        except: Option<&str>,
    ) -> Result<()> {
        let siblings = self
            .call(root, operation, parent, || session.api().list_children(parent))
            .await?;
        if siblings
            .iter()
            .any(|s| s.name == name && Some(s.id.as_str()) != except)
        {
            Err(GatewayError::conflict(operation, name))
        } else {
            Ok(())
        }
    }

    /// Fails when `destination` is `source` itself or lies below it
    async fn ensure_outside(
        &self,
        session: &DriveSession,
        root: &RootName,
        operation: Operation,
        source: &str,
        destination: &str,
    ) -> Result<()> {
        let mut current = Some(destination.to_string());
        while let Some(id) = current {
            if id == source {
                return Err(GatewayError::invalid_argument(operation, "destination"));
            }
            current = self.lookup(session, root, operation, &id).await?.parent;
        }
        Ok(())
    }
}

/// Adapts a service transfer event to the generic progress shape
fn relay(progress: &dyn ProgressSink) -> impl Fn(TransferProgress) + Send + Sync + '_ {
    move |event| {
        let total = event.total_bytes.unwrap_or(event.bytes_sent);
        progress.report(event.bytes_sent, total);
    }
}

#[async_trait]
impl AsyncGateway for RemoteGateway {
    async fn get_drive(
        &self,
        root: &RootName,
        credential: Option<&str>,
    ) -> Result<DriveInfoContract> {
        let operation = Operation::GetDrive;
        let session = self.session(root, credential, operation).await?;
        let quota = self
            .call(root, operation, root.root(), || session.api().about())
            .await?;
        Ok(DriveInfoContract::new(
            quota.drive_id,
            root.to_string(),
            quota.remaining,
            quota.used,
        ))
    }

    async fn get_root(
        &self,
        root: &RootName,
        credential: Option<&str>,
    ) -> Result<RootDirectoryInfoContract> {
        let operation = Operation::GetRoot;
        let session = self.session(root, credential, operation).await?;
        let top = self
            .call(root, operation, root.root(), || session.api().root_item())
            .await?;
        let quota = self
            .call(root, operation, root.root(), || session.api().about())
            .await?;
        let drive =
            DriveInfoContract::new(quota.drive_id, root.to_string(), quota.remaining, quota.used);
        diagnostics::debug!(
            "Resolved remote root {root} as {id}",
            root: root.to_string(),
            id: top.id.as_str()
        );
        Ok(RootDirectoryInfoContract::new(
            DirectoryId::new(top.id),
            top.created,
            top.modified,
            drive,
        ))
    }

    async fn get_child_item(
        &self,
        root: &RootName,
        parent: &DirectoryId,
    ) -> Result<Vec<FileSystemInfoContract>> {
        let operation = Operation::GetChildItem;
        let session = self.session(root, None, operation).await?;
        let parent_id = parent.as_str();
        let children = match self
            .call(root, operation, parent_id, || session.api().list_children(parent_id))
            .await
        {
            Ok(children) => children,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let parent_contract = self
            .directory_chain(&session, root, operation, parent_id)
            .await?;
        Ok(children
            .into_iter()
            .map(|item| item_contract(item, Some(parent_contract.clone())))
            .collect())
    }

    async fn clear_content(&self, root: &RootName, target: &FileId) -> Result<()> {
        let operation = Operation::ClearContent;
        let session = self.session(root, None, operation).await?;
        let _ = self
            .require_item(&session, root, operation, &FileSystemId::from(target))
            .await?;
        let silent = |_: TransferProgress| {};
        let _ = self
            .call(root, operation, target.as_str(), || {
                session.api().update_content(target.as_str(), &[], &silent)
            })
            .await?;
        Ok(())
    }

    async fn get_content(&self, root: &RootName, source: &FileId) -> Result<AsyncReadStream> {
        let operation = Operation::GetContent;
        let session = self.session(root, None, operation).await?;
        let _ = self
            .require_item(&session, root, operation, &FileSystemId::from(source))
            .await?;
        let bytes = self
            .call(root, operation, source.as_str(), || {
                session.api().download(source.as_str())
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
        let operation = Operation::SetContent;
        let session = self.session(root, None, operation).await?;
        let _ = self
            .require_item(&session, root, operation, &FileSystemId::from(target))
            .await?;
        let bytes = buffer(content, operation, target.as_str()).await?;
        let listener = relay(progress);
        let updated = self
            .call(root, operation, target.as_str(), || {
                session.api().update_content(target.as_str(), &bytes, &listener)
            })
            .await?;
        diagnostics::debug!("Replaced content of {target}", target: updated.id.as_str());
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
        let operation = Operation::CopyItem;
        let session = self.session(root, None, operation).await?;
        let item = self.require_item(&session, root, operation, source).await?;
        if item.parent.is_none() {
            return Err(GatewayError::invalid_argument(operation, "source"));
        }
        let _ = self
            .require_folder(&session, root, operation, destination)
            .await?;
        let dest = destination.as_str();
        if item.is_folder() && recurse {
            self.ensure_outside(&session, root, operation, source.as_str(), dest)
                .await?;
        }
        self.ensure_vacant(&session, root, operation, dest, copy_name, None)
            .await?;

        let copy = if item.is_folder() && !recurse {
            self.call(root, operation, dest, || {
                session.api().create_folder(dest, copy_name)
            })
            .await?
        } else {
            self.call(root, operation, source.as_str(), || {
                session.api().copy(source.as_str(), dest, copy_name)
            })
            .await?
        };
        diagnostics::info!(
            "Copied {source} to {copy}",
            source: source.as_str(),
            copy: copy.id.as_str()
        );
        self.attach(&session, root, operation, copy).await
    }

    async fn move_item(
        &self,
        root: &RootName,
        source: &FileSystemId,
        move_name: &str,
        destination: &DirectoryId,
    ) -> Result<FileSystemInfoContract> {
        let operation = Operation::MoveItem;
        let session = self.session(root, None, operation).await?;
        let item = self.require_item(&session, root, operation, source).await?;
        if item.parent.is_none() {
            return Err(GatewayError::invalid_argument(operation, "source"));
        }
        let _ = self
            .require_folder(&session, root, operation, destination)
            .await?;
        let dest = destination.as_str();
        if item.is_folder() {
            self.ensure_outside(&session, root, operation, source.as_str(), dest)
                .await?;
        }
        self.ensure_vacant(&session, root, operation, dest, move_name, Some(source.as_str()))
            .await?;
        let moved = self
            .call(root, operation, source.as_str(), || {
                session
                    .api()
                    .patch(source.as_str(), ItemPatch::relocate(dest, move_name))
            })
            .await?;
        diagnostics::info!("Moved {source} below {dest}", source: source.as_str(), dest: dest);
        self.attach(&session, root, operation, moved).await
    }

    async fn new_directory_item(
        &self,
        root: &RootName,
        parent: &DirectoryId,
        name: &str,
    ) -> Result<DirectoryInfoContract> {
        let operation = Operation::NewDirectoryItem;
        let session = self.session(root, None, operation).await?;
        let _ = self.require_folder(&session, root, operation, parent).await?;
        let parent_id = parent.as_str();
        self.ensure_vacant(&session, root, operation, parent_id, name, None)
            .await?;
        let folder = self
            .call(root, operation, parent_id, || {
                session.api().create_folder(parent_id, name)
            })
            .await?;
        let chain = self
            .directory_chain(&session, root, operation, parent_id)
            .await?;
        Ok(folder_contract(folder, Some(chain)))
    }

    async fn new_file_item(
        &self,
        root: &RootName,
        parent: &DirectoryId,
        name: &str,
        content: AsyncReadStream,
        progress: &dyn ProgressSink,
    ) -> Result<FileInfoContract> {
        let operation = Operation::NewFileItem;
        let session = self.session(root, None, operation).await?;
        let _ = self.require_folder(&session, root, operation, parent).await?;
        let parent_id = parent.as_str();
        self.ensure_vacant(&session, root, operation, parent_id, name, None)
            .await?;
        let bytes = buffer(content, operation, name).await?;
        let listener = relay(progress);
        let uploaded = self
            .call(root, operation, parent_id, || {
                session.api().upload(parent_id, name, &bytes, &listener)
            })
            .await?;
        diagnostics::info!("Uploaded {name} ({size} bytes)", name: name, size: bytes.len());
        let chain = self
            .directory_chain(&session, root, operation, parent_id)
            .await?;
        match item_contract(uploaded, Some(chain)) {
            FileSystemInfoContract::File(file) => Ok(file),
            FileSystemInfoContract::Directory(_) => Err(GatewayError::Backend {
                operation,
                target: name.to_string(),
                message: "service created a folder for an upload".to_string(),
            }),
        }
    }

    async fn remove_item(
        &self,
        root: &RootName,
        target: &FileSystemId,
        recurse: bool,
    ) -> Result<()> {
        let operation = Operation::RemoveItem;
        let session = self.session(root, None, operation).await?;
        let item = self.require_item(&session, root, operation, target).await?;
        if item.parent.is_none() {
            return Err(GatewayError::invalid_argument(operation, "target"));
        }
        self.call(root, operation, target.as_str(), || {
            session.api().delete(target.as_str(), recurse)
        })
        .await?;
        diagnostics::info!("Removed {target}", target: target.as_str());
        Ok(())
    }

    async fn rename_item(
        &self,
        root: &RootName,
        target: &FileSystemId,
        new_name: &str,
    ) -> Result<FileSystemInfoContract> {
        let operation = Operation::RenameItem;
        let session = self.session(root, None, operation).await?;
        let item = self.require_item(&session, root, operation, target).await?;
        let Some(parent) = item.parent.clone() else {
            return Err(GatewayError::invalid_argument(operation, "target"));
        };
        if item.name == new_name {
            return self.attach(&session, root, operation, item).await;
        }
        self.ensure_vacant(&session, root, operation, &parent, new_name, Some(target.as_str()))
            .await?;
        let renamed = self
            .call(root, operation, target.as_str(), || {
                session
                    .api()
                    .patch(target.as_str(), ItemPatch::rename(new_name))
            })
            .await?;
        self.attach(&session, root, operation, renamed).await
    }
}
