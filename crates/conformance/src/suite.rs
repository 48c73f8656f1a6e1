// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! The scenario for each capability.
//!
//! Every scenario that creates items works below its own scratch directory,
//! so scenarios never see each other's items and may assume an empty parent.

use std::sync::{Arc, Mutex, PoisonError};

use futures::future::BoxFuture;
use futures::FutureExt;
use gateway::{
    bytes_stream, Capabilities, Capability, DirectoryId, FileId, FileSystemId,
    FileSystemInfoContract, GatewayError,
};

use crate::ensure;
use crate::scenario::{Context, Scenario, ScenarioError};

const GREETING: &[u8] = b"hello, gateway";

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn directory_id(item: &FileSystemInfoContract) -> Result<DirectoryId, ScenarioError> {
    item.as_directory()
        .map(|d| d.id.clone())
        .ok_or_else(|| ScenarioError::Assertion(format!("'{}' is not a directory", item.name())))
}

fn file_id(item: &FileSystemInfoContract) -> Result<FileId, ScenarioError> {
    item.as_file()
        .map(|f| f.id.clone())
        .ok_or_else(|| ScenarioError::Assertion(format!("'{}' is not a file", item.name())))
}

fn expect_error<T>(
    result: Result<T, GatewayError>,
    what: &str,
    matches: fn(&GatewayError) -> bool,
) -> Result<(), ScenarioError> {
    match result {
        Ok(_) => Err(ScenarioError::Assertion(format!("{} unexpectedly succeeded", what))),
        Err(e) if matches(&e) => Ok(()),
        Err(e) => Err(ScenarioError::Assertion(format!(
            "{} failed with the wrong error: {}",
            what, e
        ))),
    }
}

fn get_root(cx: Context) -> BoxFuture<'static, Result<(), ScenarioError>> {
    async move {
        let root = cx.gateway.get_root(&cx.root, None).await?;
        ensure!(!root.id.is_empty(), "root id is empty");
        ensure!(
            root.full_name() == root.drive().name,
            "root full name '{}' differs from drive name '{}'",
            root.full_name(),
            root.drive().name
        );
        ensure!(root.parent().is_none(), "root has a parent");
        Ok(())
    }
    .boxed()
}

fn get_drive(cx: Context) -> BoxFuture<'static, Result<(), ScenarioError>> {
    async move {
        let drive = cx.gateway.get_drive(&cx.root, None).await?;
        ensure!(!drive.id.is_empty(), "drive id is empty");
        ensure!(!drive.name.is_empty(), "drive name is empty");
        Ok(())
    }
    .boxed()
}

fn get_child_item(cx: Context) -> BoxFuture<'static, Result<(), ScenarioError>> {
    async move {
        let scratch = cx.scratch()?;
        let _ = cx.new_directory(scratch, "D").await?;
        let _ = cx.new_file(scratch, "F.ext", &payload(100)).await?;

        let items = cx.list(scratch).await?;
        ensure!(items.len() == 2, "expected 2 children, listed {}", items.len());

        let d = cx.find(scratch, "D").await?;
        ensure!(d.is_directory(), "'D' is not listed as a directory");
        let f = cx.find(scratch, "F.ext").await?;
        ensure!(!f.is_directory(), "'F.ext' is not listed as a file");
        ensure!(f.size() == Some(100), "'F.ext' has size {:?}", f.size());

        let missing = DirectoryId::new(format!("{}/absent", scratch));
        let absent = cx.gateway.get_child_item(&cx.root, &missing).await;
        ensure!(
            matches!(&absent, Ok(items) if items.is_empty()),
            "listing a missing directory did not yield an empty list"
        );
        Ok(())
    }
    .boxed()
}

fn clear_content(cx: Context) -> BoxFuture<'static, Result<(), ScenarioError>> {
    async move {
        let scratch = cx.scratch()?;
        let file = cx.new_file(scratch, "full.txt", GREETING).await?;
        cx.gateway.clear_content(&cx.root, &file.id).await?;

        let listed = cx.find(scratch, "full.txt").await?;
        ensure!(listed.size() == Some(0), "cleared file has size {:?}", listed.size());
        ensure!(listed.id() == FileSystemId::from(&file.id), "clearing changed the id");

        // Clearing an empty file is a no-op
        cx.gateway.clear_content(&cx.root, &file.id).await?;
        ensure!(cx.read(&file.id).await?.is_empty(), "cleared file still has content");
        Ok(())
    }
    .boxed()
}

fn get_content(cx: Context) -> BoxFuture<'static, Result<(), ScenarioError>> {
    async move {
        let scratch = cx.scratch()?;
        let bytes = payload(70_000);
        let file = cx.new_file(scratch, "data.bin", &bytes).await?;
        ensure!(cx.read(&file.id).await? == bytes, "content did not round-trip");

        let empty = cx.new_file(scratch, "empty.bin", b"").await?;
        ensure!(cx.read(&empty.id).await?.is_empty(), "empty file has content");
        Ok(())
    }
    .boxed()
}

fn set_content(cx: Context) -> BoxFuture<'static, Result<(), ScenarioError>> {
    async move {
        let scratch = cx.scratch()?;
        let file = cx.new_file(scratch, "note.txt", GREETING).await?;

        let replacement = payload(200_000);
        let reports: Arc<Mutex<Vec<(u64, u64)>>> = Arc::default();
        let sink = {
            let reports = reports.clone();
            move |sent: u64, total: u64| {
                reports
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push((sent, total));
            }
        };
        cx.gateway
            .set_content(&cx.root, &file.id, bytes_stream(replacement.clone()), &sink)
            .await?;

        ensure!(cx.read(&file.id).await? == replacement, "content was not replaced");
        let reports = reports.lock().unwrap_or_else(PoisonError::into_inner).clone();
        let total = replacement.len() as u64;
        ensure!(
            reports.iter().all(|&(sent, reported)| sent <= reported && reported == total),
            "progress reports disagree with the content length: {:?}",
            reports
        );
        Ok(())
    }
    .boxed()
}

fn copy_file_item(cx: Context) -> BoxFuture<'static, Result<(), ScenarioError>> {
    async move {
        let scratch = cx.scratch()?;
        let original = cx.new_file(scratch, "origin.txt", GREETING).await?;
        let target = cx.new_directory(scratch, "target").await?;

        let copy = cx
            .gateway
            .copy_item(&cx.root, &FileSystemId::from(&original.id), "copy.txt", &target.id, false)
            .await?;
        let copy_id = file_id(&copy)?;
        ensure!(copy_id != original.id, "copy shares the original's id");
        ensure!(copy.name() == "copy.txt", "copy is named '{}'", copy.name());

        let _ = cx.find(scratch, "origin.txt").await?;
        let listed = cx.find(&target.id, "copy.txt").await?;
        ensure!(listed.id() == copy.id(), "listed copy has a different id");
        ensure!(cx.read(&copy_id).await? == GREETING, "copy content differs");
        ensure!(cx.read(&original.id).await? == GREETING, "original content changed");
        Ok(())
    }
    .boxed()
}

fn copy_directory_item(cx: Context) -> BoxFuture<'static, Result<(), ScenarioError>> {
    async move {
        let scratch = cx.scratch()?;
        let source = cx.new_directory(scratch, "tree").await?;
        let _ = cx.new_file(&source.id, "leaf.txt", GREETING).await?;

        let copy = cx
            .gateway
            .copy_item(&cx.root, &FileSystemId::from(&source.id), "tree-copy", scratch, true)
            .await?;
        let copy_id = directory_id(&copy)?;
        ensure!(copy_id != source.id, "copy shares the original's id");

        let leaf = cx.find(&copy_id, "leaf.txt").await?;
        ensure!(cx.read(&file_id(&leaf)?).await? == GREETING, "copied leaf differs");
        let original_leaf = cx.find(&source.id, "leaf.txt").await?;
        ensure!(original_leaf.id() != leaf.id(), "copied leaf shares the original's id");
        Ok(())
    }
    .boxed()
}

fn move_file_item(cx: Context) -> BoxFuture<'static, Result<(), ScenarioError>> {
    async move {
        let scratch = cx.scratch()?;
        let file = cx.new_file(scratch, "wander.txt", GREETING).await?;
        let target = cx.new_directory(scratch, "target").await?;

        let moved = cx
            .gateway
            .move_item(&cx.root, &FileSystemId::from(&file.id), "arrived.txt", &target.id)
            .await?;
        ensure!(moved.name() == "arrived.txt", "moved item is named '{}'", moved.name());

        let names = cx.names(scratch).await?;
        ensure!(names == ["target"], "source still lists {:?}", names);
        let listed = cx.find(&target.id, "arrived.txt").await?;
        ensure!(cx.read(&file_id(&listed)?).await? == GREETING, "moved content differs");
        Ok(())
    }
    .boxed()
}

fn move_directory_item(cx: Context) -> BoxFuture<'static, Result<(), ScenarioError>> {
    async move {
        let scratch = cx.scratch()?;
        let source = cx.new_directory(scratch, "box").await?;
        let _ = cx.new_file(&source.id, "inside.txt", GREETING).await?;
        let target = cx.new_directory(scratch, "shelf").await?;

        let moved = cx
            .gateway
            .move_item(&cx.root, &FileSystemId::from(&source.id), "box", &target.id)
            .await?;
        let moved_id = directory_id(&moved)?;

        let names = cx.names(scratch).await?;
        ensure!(names == ["shelf"], "source still lists {:?}", names);
        let inside = cx.find(&moved_id, "inside.txt").await?;
        ensure!(
            cx.read(&file_id(&inside)?).await? == GREETING,
            "contained file differs after move"
        );
        Ok(())
    }
    .boxed()
}

fn new_directory_item(cx: Context) -> BoxFuture<'static, Result<(), ScenarioError>> {
    async move {
        let scratch = cx.scratch()?;
        let created = cx.new_directory(scratch, "D").await?;
        ensure!(created.name == "D", "created directory is named '{}'", created.name);
        ensure!(
            created.full_name().ends_with("/D/"),
            "unexpected full name '{}'",
            created.full_name()
        );
        let before = cx.list(scratch).await?.len();

        expect_error(
            cx.gateway.new_directory_item(&cx.root, scratch, "D").await,
            "creating a duplicate directory",
            GatewayError::is_conflict,
        )?;
        let after = cx.list(scratch).await?.len();
        ensure!(before == after, "listing went from {} to {} entries", before, after);
        Ok(())
    }
    .boxed()
}

fn new_file_item(cx: Context) -> BoxFuture<'static, Result<(), ScenarioError>> {
    async move {
        let scratch = cx.scratch()?;
        let file = cx.new_file(scratch, "fresh.txt", GREETING).await?;
        ensure!(file.name == "fresh.txt", "created file is named '{}'", file.name);
        ensure!(file.size == GREETING.len() as u64, "created file has size {}", file.size);

        expect_error(
            cx.gateway
                .new_file_item(
                    &cx.root,
                    scratch,
                    "fresh.txt",
                    bytes_stream(b"other".to_vec()),
                    &gateway::NoProgress,
                )
                .await,
            "creating a duplicate file",
            GatewayError::is_conflict,
        )?;
        ensure!(cx.read(&file.id).await? == GREETING, "duplicate creation changed the file");
        Ok(())
    }
    .boxed()
}

fn remove_item(cx: Context) -> BoxFuture<'static, Result<(), ScenarioError>> {
    async move {
        let scratch = cx.scratch()?;
        let full = cx.new_directory(scratch, "full").await?;
        let _ = cx.new_file(&full.id, "keep.txt", GREETING).await?;
        let target = FileSystemId::from(&full.id);

        expect_error(
            cx.gateway.remove_item(&cx.root, &target, false).await,
            "removing a non-empty directory without recurse",
            |e| matches!(e, GatewayError::DirectoryNotEmpty { .. }),
        )?;
        let _ = cx.find(&full.id, "keep.txt").await?;

        cx.gateway.remove_item(&cx.root, &target, true).await?;
        ensure!(cx.list(scratch).await?.is_empty(), "directory survived a recursive remove");

        let lone = cx.new_file(scratch, "lone.txt", b"").await?;
        cx.gateway
            .remove_item(&cx.root, &FileSystemId::from(&lone.id), false)
            .await?;
        ensure!(cx.list(scratch).await?.is_empty(), "file survived removal");
        Ok(())
    }
    .boxed()
}

fn rename_file_item(cx: Context) -> BoxFuture<'static, Result<(), ScenarioError>> {
    async move {
        let scratch = cx.scratch()?;
        let file = cx.new_file(scratch, "before.txt", GREETING).await?;
        let renamed = cx
            .gateway
            .rename_item(&cx.root, &FileSystemId::from(&file.id), "after.txt")
            .await?;
        ensure!(renamed.name() == "after.txt", "renamed item is named '{}'", renamed.name());

        let names = cx.names(scratch).await?;
        ensure!(names == ["after.txt"], "listing shows {:?}", names);
        ensure!(cx.read(&file_id(&renamed)?).await? == GREETING, "rename changed the content");
        Ok(())
    }
    .boxed()
}

fn rename_directory_item(cx: Context) -> BoxFuture<'static, Result<(), ScenarioError>> {
    async move {
        let scratch = cx.scratch()?;
        let dir = cx.new_directory(scratch, "old").await?;
        let _ = cx.new_file(&dir.id, "child.txt", GREETING).await?;

        let renamed = cx
            .gateway
            .rename_item(&cx.root, &FileSystemId::from(&dir.id), "new")
            .await?;
        ensure!(renamed.name() == "new", "renamed item is named '{}'", renamed.name());

        let names = cx.names(scratch).await?;
        ensure!(names == ["new"], "listing shows {:?}", names);
        let _ = cx.find(&directory_id(&renamed)?, "child.txt").await?;
        Ok(())
    }
    .boxed()
}

fn scenario(
    capability: Capability,
    name: &'static str,
    requires: &[Capability],
    uses_scratch: bool,
    run: crate::scenario::ScenarioFn,
) -> Scenario {
    Scenario {
        name,
        capability,
        requires: requires.iter().copied().collect::<Capabilities>().with(capability),
        uses_scratch,
        run,
    }
}

/// One scenario per capability, in capability order
pub fn standard_suite() -> Vec<Scenario> {
    use Capability::*;
    vec![
        scenario(GetRoot, "root resolves to the drive's mount point", &[], false, get_root),
        scenario(GetDrive, "drive reports identity", &[], false, get_drive),
        scenario(
            GetChildItem,
            "listing shows exactly the created items",
            &[NewFileItem],
            true,
            get_child_item,
        ),
        scenario(
            ClearContent,
            "clearing empties a file and keeps its name",
            &[NewFileItem, GetChildItem, GetContent],
            true,
            clear_content,
        ),
        scenario(GetContent, "content round-trips", &[NewFileItem], true, get_content),
        scenario(
            SetContent,
            "setting content replaces it and reports progress",
            &[NewFileItem, GetContent],
            true,
            set_content,
        ),
        scenario(
            CopyFileItem,
            "file copy isolates identity",
            &[NewFileItem, GetChildItem, GetContent],
            true,
            copy_file_item,
        ),
        scenario(
            CopyDirectoryItem,
            "directory copy recurses",
            &[NewFileItem, GetChildItem, GetContent],
            true,
            copy_directory_item,
        ),
        scenario(
            MoveFileItem,
            "file move preserves content",
            &[NewFileItem, GetChildItem, GetContent],
            true,
            move_file_item,
        ),
        scenario(
            MoveDirectoryItem,
            "directory move carries its contents",
            &[NewFileItem, GetChildItem, GetContent],
            true,
            move_directory_item,
        ),
        scenario(
            NewDirectoryItem,
            "duplicate directory names are rejected",
            &[GetChildItem],
            true,
            new_directory_item,
        ),
        scenario(
            NewFileItem,
            "duplicate file names are rejected",
            &[GetContent],
            true,
            new_file_item,
        ),
        scenario(
            RemoveItem,
            "non-empty directories need recurse",
            &[NewFileItem, GetChildItem],
            true,
            remove_item,
        ),
        scenario(
            RenameFileItem,
            "file rename keeps content",
            &[NewFileItem, GetChildItem, GetContent],
            true,
            rename_file_item,
        ),
        scenario(
            RenameDirectoryItem,
            "directory rename keeps children",
            &[NewFileItem, GetChildItem],
            true,
            rename_directory_item,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_scenario_per_capability() {
        let suite = standard_suite();
        let covered: Vec<Capability> = suite.iter().map(|s| s.capability).collect();
        assert_eq!(covered, Capability::ALL.to_vec());
    }

    #[test]
    fn test_scratch_needs_are_counted() {
        let suite = standard_suite();
        let listing = suite
            .iter()
            .find(|s| s.capability == Capability::GetChildItem)
            .unwrap();
        let needs = listing.needs();
        assert!(needs.contains(Capability::NewDirectoryItem));
        assert!(needs.contains(Capability::RemoveItem));
        assert!(needs.contains(Capability::GetRoot));

        let root = suite.iter().find(|s| s.capability == Capability::GetRoot).unwrap();
        assert_eq!(root.needs(), Capabilities::from([Capability::GetRoot]));
    }
}
