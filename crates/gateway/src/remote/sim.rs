// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! In-process drive service.
//!
//! `SimDrive` keeps its items in memory behind an async mutex and behaves
//! like a remote drive: uuid7 resource keys, server-side hashes, a quota,
//! and faults. Faults come from two sources, a scripted count of upcoming
//! failures and a seeded failure probability, so runs are reproducible.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

use super::api::{
    ApiResult, DriveApi, DriveApiError, DriveItem, ItemKind, ItemPatch, Quota, TransferListener,
    TransferProgress,
};
use super::gateway::DriveSession;
use super::SCHEME;
use crate::error::{GatewayError, Operation, Result};
use crate::id::RootName;
use crate::session::Authorizer;

/// Upload chunk size used when raising transfer events
const CHUNK: usize = 64 * 1024;

/// Construction parameters for a simulated drive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimOptions {
    /// Quota in bytes
    pub capacity: u64,
    /// Probability in [0, 1] that any request fails with a fault
    pub fault_rate: f64,
    pub seed: u64,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            capacity: 1 << 30,
            fault_rate: 0.0,
            seed: 0,
        }
    }
}

struct SimNode {
    item: DriveItem,
    content: Vec<u8>,
}

struct SimState {
    nodes: HashMap<String, SimNode>,
    rng: StdRng,
}

pub struct SimDrive {
    name: String,
    root_id: String,
    options: SimOptions,
    state: tokio::sync::Mutex<SimState>,
    fail_next: AtomicUsize,
    requests: AtomicU64,
    faults: AtomicU64,
}

fn new_key() -> String {
    uuid7::uuid7().to_string()
}

fn content_hash(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

fn raise_progress(listener: TransferListener<'_>, total: usize) {
    let declared = Some(total as u64);
    if total == 0 {
        listener(TransferProgress {
            bytes_sent: 0,
            total_bytes: declared,
        });
        return;
    }
    let mut sent = 0;
    while sent < total {
        sent = (sent + CHUNK).min(total);
        listener(TransferProgress {
            bytes_sent: sent as u64,
            total_bytes: declared,
        });
    }
}

impl SimState {
    fn node(&self, id: &str) -> ApiResult<&SimNode> {
        self.nodes
            .get(id)
            .ok_or_else(|| DriveApiError::NotFound(id.to_string()))
    }

    fn folder(&self, id: &str) -> ApiResult<&SimNode> {
        match self.node(id)? {
            node if node.item.is_folder() => Ok(node),
            _ => Err(DriveApiError::NotFound(id.to_string())),
        }
    }

    fn file_mut(&mut self, id: &str) -> ApiResult<&mut SimNode> {
        match self.nodes.get_mut(id) {
            Some(node) if !node.item.is_folder() => Ok(node),
            _ => Err(DriveApiError::NotFound(id.to_string())),
        }
    }

    fn children(&self, id: &str) -> impl Iterator<Item = &SimNode> + '_ {
        let id = id.to_string();
        self.nodes
            .values()
            .filter(move |n| n.item.parent.as_deref() == Some(id.as_str()))
    }

    fn ensure_vacant(&self, parent: &str, name: &str, except: Option<&str>) -> ApiResult<()> {
        let taken = self
            .children(parent)
            .any(|n| n.item.name == name && Some(n.item.id.as_str()) != except);
        if taken {
            Err(DriveApiError::Conflict(name.to_string()))
        } else {
            Ok(())
        }
    }

    /// `id` and everything below it
    fn subtree(&self, id: &str) -> Vec<String> {
        let mut found = vec![id.to_string()];
        let mut at = 0;
        while at < found.len() {
            let next: Vec<String> = self
                .children(&found[at])
                .map(|n| n.item.id.clone())
                .collect();
            found.extend(next);
            at += 1;
        }
        found
    }

    fn used(&self) -> u64 {
        self.nodes.values().map(|n| n.content.len() as u64).sum()
    }

    fn ensure_capacity(&self, capacity: u64, adding: u64, replacing: u64) -> ApiResult<()> {
        let after = self.used().saturating_sub(replacing) + adding;
        if after > capacity {
            Err(DriveApiError::BadRequest(format!(
                "quota exceeded: {} of {} bytes",
                after, capacity
            )))
        } else {
            Ok(())
        }
    }

    fn insert(&mut self, item: DriveItem, content: Vec<u8>) -> DriveItem {
        let _ = self.nodes.insert(
            item.id.clone(),
            SimNode {
                item: item.clone(),
                content,
            },
        );
        item
    }

    fn copy_subtree(&mut self, source: &str, parent: &str, name: &str) -> ApiResult<DriveItem> {
        let node = self.node(source)?;
        let now = Utc::now();
        let item = DriveItem {
            id: new_key(),
            name: name.to_string(),
            parent: Some(parent.to_string()),
            created: now,
            modified: now,
            ..node.item.clone()
        };
        let content = node.content.clone();
        let children: Vec<(String, String)> = self
            .children(source)
            .map(|n| (n.item.id.clone(), n.item.name.clone()))
            .collect();
        let copy = self.insert(item, content);
        for (child, child_name) in children {
            let _ = self.copy_subtree(&child, &copy.id, &child_name)?;
        }
        Ok(copy)
    }
}

impl SimDrive {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self::with_options(name, SimOptions::default())
    }

    pub fn with_options<N: Into<String>>(name: N, options: SimOptions) -> Self {
        let now = Utc::now();
        let root_id = new_key();
        let root = DriveItem {
            id: root_id.clone(),
            name: String::new(),
            parent: None,
            kind: ItemKind::Folder,
            size: None,
            hash: None,
            created: now,
            modified: now,
        };
        let mut nodes = HashMap::new();
        let _ = nodes.insert(
            root_id.clone(),
            SimNode {
                item: root,
                content: Vec::new(),
            },
        );
        Self {
            name: name.into(),
            root_id,
            options,
            state: tokio::sync::Mutex::new(SimState {
                nodes,
                rng: StdRng::seed_from_u64(options.seed),
            }),
            fail_next: AtomicUsize::new(0),
            requests: AtomicU64::new(0),
            faults: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Makes the next `count` requests fail with a fault
    pub fn fail_next(&self, count: usize) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Requests received so far, faulted ones included
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn faults_injected(&self) -> u64 {
        self.faults.load(Ordering::SeqCst)
    }

    fn fault(&self, call: &str) -> DriveApiError {
        let _ = self.faults.fetch_add(1, Ordering::SeqCst);
        diagnostics::debug!("Injecting fault into {call}", call: call);
        DriveApiError::Fault(format!("{} unavailable", call))
    }

    /// Admits one request, or fails it with an injected fault
    async fn enter(&self, call: &str) -> ApiResult<tokio::sync::MutexGuard<'_, SimState>> {
        let _ = self.requests.fetch_add(1, Ordering::SeqCst);
        let scripted = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if scripted {
            return Err(self.fault(call));
        }
        let mut state = self.state.lock().await;
        if self.options.fault_rate > 0.0 {
            let rate = self.options.fault_rate.min(1.0);
            if state.rng.gen_bool(rate) {
                return Err(self.fault(call));
            }
        }
        Ok(state)
    }
}

#[async_trait]
impl DriveApi for SimDrive {
    async fn about(&self) -> ApiResult<Quota> {
        let state = self.enter("about").await?;
        let used = state.used();
        Ok(Quota {
            drive_id: self.root_id.clone(),
            total: Some(self.options.capacity),
            used: Some(used),
            remaining: Some(self.options.capacity.saturating_sub(used)),
        })
    }

    async fn root_item(&self) -> ApiResult<DriveItem> {
        let state = self.enter("root_item").await?;
        Ok(state.node(&self.root_id)?.item.clone())
    }

    async fn get_item(&self, id: &str) -> ApiResult<DriveItem> {
        let state = self.enter("get_item").await?;
        Ok(state.node(id)?.item.clone())
    }

    async fn list_children(&self, id: &str) -> ApiResult<Vec<DriveItem>> {
        let state = self.enter("list_children").await?;
        let _ = state.folder(id)?;
        let mut items: Vec<DriveItem> = state.children(id).map(|n| n.item.clone()).collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn create_folder(&self, parent: &str, name: &str) -> ApiResult<DriveItem> {
        let mut state = self.enter("create_folder").await?;
        let _ = state.folder(parent)?;
        state.ensure_vacant(parent, name, None)?;
        let now = Utc::now();
        let item = DriveItem {
            id: new_key(),
            name: name.to_string(),
            parent: Some(parent.to_string()),
            kind: ItemKind::Folder,
            size: None,
            hash: None,
            created: now,
            modified: now,
        };
        Ok(state.insert(item, Vec::new()))
    }

    async fn upload(
        &self,
        parent: &str,
        name: &str,
        content: &[u8],
        listener: TransferListener<'_>,
    ) -> ApiResult<DriveItem> {
        let mut state = self.enter("upload").await?;
        let _ = state.folder(parent)?;
        state.ensure_vacant(parent, name, None)?;
        state.ensure_capacity(self.options.capacity, content.len() as u64, 0)?;
        raise_progress(listener, content.len());
        let now = Utc::now();
        let item = DriveItem {
            id: new_key(),
            name: name.to_string(),
            parent: Some(parent.to_string()),
            kind: ItemKind::File,
            size: Some(content.len() as u64),
            hash: Some(content_hash(content)),
            created: now,
            modified: now,
        };
        Ok(state.insert(item, content.to_vec()))
    }

    async fn update_content(
        &self,
        id: &str,
        content: &[u8],
        listener: TransferListener<'_>,
    ) -> ApiResult<DriveItem> {
        let mut state = self.enter("update_content").await?;
        let replacing = state.file_mut(id)?.content.len() as u64;
        state.ensure_capacity(self.options.capacity, content.len() as u64, replacing)?;
        raise_progress(listener, content.len());
        let node = state.file_mut(id)?;
        node.content = content.to_vec();
        node.item.size = Some(content.len() as u64);
        node.item.hash = Some(content_hash(content));
        node.item.modified = Utc::now();
        Ok(node.item.clone())
    }

    async fn download(&self, id: &str) -> ApiResult<Vec<u8>> {
        let mut state = self.enter("download").await?;
        Ok(state.file_mut(id)?.content.clone())
    }

    async fn patch(&self, id: &str, patch: ItemPatch) -> ApiResult<DriveItem> {
        let mut state = self.enter("patch").await?;
        let current = state.node(id)?.item.clone();
        let Some(current_parent) = current.parent.clone() else {
            return Err(DriveApiError::BadRequest("the drive root cannot be changed".into()));
        };
        let parent = patch.parent.unwrap_or(current_parent);
        let name = patch.name.unwrap_or_else(|| current.name.clone());
        let _ = state.folder(&parent)?;
        if state.subtree(id).contains(&parent) {
            return Err(DriveApiError::BadRequest(format!(
                "{} cannot be moved below itself",
                id
            )));
        }
        state.ensure_vacant(&parent, &name, Some(id))?;

        let node = state
            .nodes
            .get_mut(id)
            .ok_or_else(|| DriveApiError::NotFound(id.to_string()))?;
        node.item.parent = Some(parent);
        node.item.name = name;
        node.item.modified = Utc::now();
        Ok(node.item.clone())
    }

    async fn copy(&self, id: &str, parent: &str, name: &str) -> ApiResult<DriveItem> {
        let mut state = self.enter("copy").await?;
        let source = state.node(id)?;
        if source.item.parent.is_none() {
            return Err(DriveApiError::BadRequest("the drive root cannot be copied".into()));
        }
        let _ = state.folder(parent)?;
        if state.subtree(id).iter().any(|n| n == parent) {
            return Err(DriveApiError::BadRequest(format!(
                "{} cannot be copied below itself",
                id
            )));
        }
        state.ensure_vacant(parent, name, None)?;
        let size: u64 = state
            .subtree(id)
            .iter()
            .filter_map(|n| state.nodes.get(n))
            .map(|n| n.content.len() as u64)
            .sum();
        state.ensure_capacity(self.options.capacity, size, 0)?;
        state.copy_subtree(id, parent, name)
    }

    async fn delete(&self, id: &str, recursive: bool) -> ApiResult<()> {
        let mut state = self.enter("delete").await?;
        let node = state.node(id)?;
        if node.item.parent.is_none() {
            return Err(DriveApiError::BadRequest("the drive root cannot be deleted".into()));
        }
        let doomed = state.subtree(id);
        if doomed.len() > 1 && !recursive {
            return Err(DriveApiError::NotEmpty(id.to_string()));
        }
        for key in doomed {
            let _ = state.nodes.remove(&key);
        }
        Ok(())
    }
}

/// Hands out sessions on one simulated drive per root locator.
///
/// Every root naming the same locator shares one drive, the way two clients
/// of one account see the same service.
#[derive(Default)]
pub struct SimAuthorizer {
    options: SimOptions,
    drives: Mutex<HashMap<String, Arc<SimDrive>>>,
    revoked: Mutex<HashSet<String>>,
    handshakes: AtomicUsize,
}

impl SimAuthorizer {
    pub fn new(options: SimOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// The drive behind `locator`, created on first use
    pub fn drive(&self, locator: &str) -> Arc<SimDrive> {
        let mut drives = self
            .drives
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        drives
            .entry(locator.to_string())
            .or_insert_with(|| Arc::new(SimDrive::with_options(locator, self.options)))
            .clone()
    }

    /// Rejects any later handshake presenting `credential`
    pub fn revoke<C: Into<String>>(&self, credential: C) {
        let _ = self
            .revoked
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(credential.into());
    }

    /// Completed or attempted handshakes
    pub fn handshakes(&self) -> usize {
        self.handshakes.load(Ordering::SeqCst)
    }

    fn is_revoked(&self, credential: Option<&str>) -> bool {
        credential.is_some_and(|c| {
            self.revoked
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .contains(c)
        })
    }
}

#[async_trait]
impl Authorizer<DriveSession> for SimAuthorizer {
    async fn authorize(&self, root: &RootName, credential: Option<&str>) -> Result<DriveSession> {
        let _ = self.handshakes.fetch_add(1, Ordering::SeqCst);
        if root.scheme() != SCHEME {
            return Err(GatewayError::root_unresolved(
                Operation::GetRoot,
                root,
                format!("scheme '{}' is not '{}'", root.scheme(), SCHEME),
            ));
        }
        if self.is_revoked(credential) {
            return Err(GatewayError::root_unresolved(
                Operation::GetRoot,
                root,
                "credential has been revoked",
            ));
        }
        let drive: Arc<dyn DriveApi> = self.drive(root.root());
        Ok(DriveSession::new(drive, root.user_name()))
    }
}
