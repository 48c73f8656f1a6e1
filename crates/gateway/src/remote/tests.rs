// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Tests for the remote gateway against the simulated drive.

use std::sync::{Arc, Mutex};

use tokio::io::AsyncReadExt;

use super::{RemoteGateway, SimAuthorizer, SimOptions, SCHEME};
use crate::contract::FileSystemInfoContract;
use crate::error::GatewayError;
use crate::gateway::{bytes_stream, AsyncGateway, NoProgress};
use crate::id::{DirectoryId, FileId, FileSystemId, RootName};
use crate::retry::RetryPolicy;

struct Fixture {
    auth: Arc<SimAuthorizer>,
    gw: RemoteGateway,
    root: RootName,
    top: DirectoryId,
}

async fn fixture() -> Fixture {
    let auth = Arc::new(SimAuthorizer::new(SimOptions::default()));
    let gw = RemoteGateway::new(SCHEME, auth.clone());
    let root = RootName::new(SCHEME, "drive-a");
    let top = gw.get_root(&root, None).await.unwrap().id.clone();
    Fixture { auth, gw, root, top }
}

async fn read_all(gw: &RemoteGateway, root: &RootName, id: &FileId) -> Vec<u8> {
    let mut stream = gw.get_content(root, id).await.ok().unwrap();
    let mut buf = Vec::new();
    let _ = stream.read_to_end(&mut buf).await.unwrap();
    buf
}

#[tokio::test]
async fn test_root_and_drive() {
    let f = fixture().await;
    let top = f.gw.get_root(&f.root, None).await.unwrap();
    assert_eq!(top.name, "/");
    assert_eq!(top.full_name(), "sim://drive-a");
    assert!(top.parent().is_none());

    let drive = f.gw.get_drive(&f.root, None).await.unwrap();
    assert_eq!(drive.name, "sim://drive-a");
    assert_eq!(drive.used_space, Some(0));
    assert_eq!(drive.free_space, Some(1 << 30));
}

#[tokio::test]
async fn test_session_is_established_once_per_root() {
    let f = fixture().await;
    let _ = f.gw.get_child_item(&f.root, &f.top).await.unwrap();
    let _ = f.gw.get_drive(&f.root, None).await.unwrap();
    assert_eq!(f.auth.handshakes(), 1);
    assert_eq!(f.gw.sessions().len(), 1);

    let other = RootName::new(SCHEME, "drive-b");
    let _ = f.gw.get_root(&other, None).await.unwrap();
    assert_eq!(f.auth.handshakes(), 2);
}

#[tokio::test]
async fn test_revoked_credential_is_unresolved_and_not_cached() {
    let auth = Arc::new(SimAuthorizer::new(SimOptions::default()));
    auth.revoke("old-key");
    let gw = RemoteGateway::new(SCHEME, auth.clone()).with_credential("old-key");
    let root = RootName::new(SCHEME, "locked");

    let err = gw.get_child_item(&root, &DirectoryId::new("x")).await.unwrap_err();
    assert!(matches!(
        err,
        GatewayError::RootUnresolved {
            operation: crate::Operation::GetChildItem,
            ..
        }
    ));
    assert!(gw.sessions().is_empty());

    let top = gw.get_root(&root, Some("fresh-key")).await.unwrap();
    assert_eq!(top.name, "/");
    assert_eq!(auth.handshakes(), 2);
}

#[tokio::test]
async fn test_full_names_follow_parent_references() {
    let f = fixture().await;
    let docs = f.gw.new_directory_item(&f.root, &f.top, "docs").await.unwrap();
    assert_eq!(docs.full_name(), "/docs/");
    let inner = f.gw.new_directory_item(&f.root, &docs.id, "inner").await.unwrap();
    let file = f
        .gw
        .new_file_item(&f.root, &inner.id, "F.ext", bytes_stream(vec![1_u8; 100]), &NoProgress)
        .await
        .unwrap();
    assert_eq!(file.full_name(), "/docs/inner/F.ext");
    assert_eq!(file.size, 100);
    assert!(file.hash.is_some());

    let listed = f.gw.get_child_item(&f.root, &inner.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].full_name(), "/docs/inner/F.ext");
}

#[tokio::test]
async fn test_content_round_trip_and_clear() {
    let f = fixture().await;
    let file = f
        .gw
        .new_file_item(&f.root, &f.top, "a.txt", bytes_stream(&b"first"[..]), &NoProgress)
        .await
        .unwrap();
    assert_eq!(read_all(&f.gw, &f.root, &file.id).await, b"first");

    f.gw
        .set_content(&f.root, &file.id, bytes_stream(&b"second, longer"[..]), &NoProgress)
        .await
        .unwrap();
    assert_eq!(read_all(&f.gw, &f.root, &file.id).await, b"second, longer");

    f.gw.clear_content(&f.root, &file.id).await.unwrap();
    let listed = f.gw.get_child_item(&f.root, &f.top).await.unwrap();
    assert_eq!(listed[0].name(), "a.txt");
    assert_eq!(listed[0].size(), Some(0));
}

#[tokio::test]
async fn test_progress_is_translated() {
    let f = fixture().await;
    let reports = Mutex::new(Vec::new());
    let sink = |sent: u64, total: u64| reports.lock().unwrap().push((sent, total));
    let content = vec![0_u8; 200 * 1024];
    let _ = f
        .gw
        .new_file_item(&f.root, &f.top, "big.bin", bytes_stream(content.clone()), &sink)
        .await
        .unwrap();
    let reports = reports.into_inner().unwrap();
    assert!(!reports.is_empty());
    assert!(reports.iter().all(|(_, total)| *total == content.len() as u64));
    assert_eq!(reports.last(), Some(&(content.len() as u64, content.len() as u64)));
}

#[tokio::test]
async fn test_missing_and_mismatched_ids() {
    let f = fixture().await;
    let err = f.gw.get_content(&f.root, &FileId::new("nope")).await.err().unwrap();
    assert!(err.is_not_found());
    assert!(f
        .gw
        .get_child_item(&f.root, &DirectoryId::new("nope"))
        .await
        .unwrap()
        .is_empty());

    let dir = f.gw.new_directory_item(&f.root, &f.top, "d").await.unwrap();
    let as_file = FileId::new(dir.id.as_str());
    assert!(f.gw.clear_content(&f.root, &as_file).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_duplicate_names_conflict() {
    let f = fixture().await;
    let _ = f.gw.new_directory_item(&f.root, &f.top, "D").await.unwrap();
    let err = f.gw.new_directory_item(&f.root, &f.top, "D").await.unwrap_err();
    assert!(err.is_conflict());
    let err = f
        .gw
        .new_file_item(&f.root, &f.top, "D", bytes_stream(Vec::new()), &NoProgress)
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(f.gw.get_child_item(&f.root, &f.top).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_copy_move_rename() {
    let f = fixture().await;
    let src = f.gw.new_directory_item(&f.root, &f.top, "src").await.unwrap();
    let dst = f.gw.new_directory_item(&f.root, &f.top, "dst").await.unwrap();
    let file = f
        .gw
        .new_file_item(&f.root, &src.id, "f.txt", bytes_stream(&b"payload"[..]), &NoProgress)
        .await
        .unwrap();

    let copy = f
        .gw
        .copy_item(&f.root, &FileSystemId::from(&file.id), "g.txt", &dst.id, false)
        .await
        .unwrap();
    assert_ne!(copy.id(), FileSystemId::from(&file.id));
    assert_eq!(copy.full_name(), "/dst/g.txt");

    let shallow = f
        .gw
        .copy_item(&f.root, &FileSystemId::from(&src.id), "empty", &dst.id, false)
        .await
        .unwrap();
    let FileSystemInfoContract::Directory(shallow) = shallow else {
        panic!("copy of a directory is a directory");
    };
    assert!(f.gw.get_child_item(&f.root, &shallow.id).await.unwrap().is_empty());

    let moved = f
        .gw
        .move_item(&f.root, &FileSystemId::from(&src.id), "src", &dst.id)
        .await
        .unwrap();
    assert_eq!(moved.id(), FileSystemId::from(&src.id));
    assert_eq!(moved.full_name(), "/dst/src/");
    let inside = f.gw.get_child_item(&f.root, &src.id).await.unwrap();
    assert_eq!(inside[0].full_name(), "/dst/src/f.txt");
    assert_eq!(read_all(&f.gw, &f.root, &file.id).await, b"payload");

    let renamed = f
        .gw
        .rename_item(&f.root, &FileSystemId::from(&file.id), "h.txt")
        .await
        .unwrap();
    assert_eq!(renamed.id(), FileSystemId::from(&file.id));
    assert_eq!(renamed.full_name(), "/dst/src/h.txt");

    let err = f
        .gw
        .rename_item(&f.root, &copy.id(), "empty")
        .await
        .unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn test_copy_and_move_onto_taken_names() {
    let f = fixture().await;
    let src = f.gw.new_directory_item(&f.root, &f.top, "src").await.unwrap();
    let dst = f.gw.new_directory_item(&f.root, &f.top, "dst").await.unwrap();
    let file = f
        .gw
        .new_file_item(&f.root, &src.id, "f.txt", bytes_stream(&b"one"[..]), &NoProgress)
        .await
        .unwrap();
    let taken = f
        .gw
        .new_file_item(&f.root, &dst.id, "f.txt", bytes_stream(&b"two"[..]), &NoProgress)
        .await
        .unwrap();
    let source = FileSystemId::from(&file.id);

    let err = f
        .gw
        .copy_item(&f.root, &source, "f.txt", &dst.id, false)
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    let err = f
        .gw
        .move_item(&f.root, &source, "f.txt", &dst.id)
        .await
        .unwrap_err();
    assert!(err.is_conflict());

    // Neither side changed
    assert_eq!(read_all(&f.gw, &f.root, &file.id).await, b"one");
    assert_eq!(read_all(&f.gw, &f.root, &taken.id).await, b"two");
    assert_eq!(f.gw.get_child_item(&f.root, &src.id).await.unwrap().len(), 1);
    assert_eq!(f.gw.get_child_item(&f.root, &dst.id).await.unwrap().len(), 1);

    // Moving onto its own name in place is not a conflict
    let same = f
        .gw
        .move_item(&f.root, &source, "f.txt", &src.id)
        .await
        .unwrap();
    assert_eq!(same.id(), source);
}

#[tokio::test]
async fn test_folder_cannot_land_in_its_own_subtree() {
    let f = fixture().await;
    let outer = f.gw.new_directory_item(&f.root, &f.top, "outer").await.unwrap();
    let inner = f.gw.new_directory_item(&f.root, &outer.id, "inner").await.unwrap();
    let source = FileSystemId::from(&outer.id);

    for destination in [&inner.id, &outer.id] {
        let err = f
            .gw
            .move_item(&f.root, &source, "moved", destination)
            .await
            .unwrap_err();
        assert!(err.is_invalid_argument());
        let err = f
            .gw
            .copy_item(&f.root, &source, "copied", destination, true)
            .await
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    let listed = f.gw.get_child_item(&f.root, &outer.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].full_name(), "/outer/inner/");
}

#[tokio::test]
async fn test_rename_onto_sibling_conflicts() {
    let f = fixture().await;
    let a = f.gw.new_directory_item(&f.root, &f.top, "a").await.unwrap();
    let _ = f
        .gw
        .new_file_item(&f.root, &f.top, "b", bytes_stream(Vec::new()), &NoProgress)
        .await
        .unwrap();

    let err = f
        .gw
        .rename_item(&f.root, &FileSystemId::from(&a.id), "b")
        .await
        .unwrap_err();
    assert!(err.is_conflict());

    let kept = f
        .gw
        .rename_item(&f.root, &FileSystemId::from(&a.id), "a")
        .await
        .unwrap();
    assert_eq!(kept.full_name(), "/a/");
    let names: Vec<String> = f
        .gw
        .get_child_item(&f.root, &f.top)
        .await
        .unwrap()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    assert_eq!(names, ["a", "b"]);
}

#[tokio::test]
async fn test_remove_respects_recurse() {
    let f = fixture().await;
    let d = f.gw.new_directory_item(&f.root, &f.top, "d").await.unwrap();
    let _ = f
        .gw
        .new_file_item(&f.root, &d.id, "x", bytes_stream(&b"1"[..]), &NoProgress)
        .await
        .unwrap();

    let target = FileSystemId::from(&d.id);
    let err = f.gw.remove_item(&f.root, &target, false).await.unwrap_err();
    assert!(matches!(err, GatewayError::DirectoryNotEmpty { .. }));
    assert_eq!(f.gw.get_child_item(&f.root, &d.id).await.unwrap().len(), 1);

    f.gw.remove_item(&f.root, &target, true).await.unwrap();
    assert!(f.gw.get_child_item(&f.root, &f.top).await.unwrap().is_empty());

    let err = f
        .gw
        .remove_item(&f.root, &FileSystemId::from(&f.top), true)
        .await
        .unwrap_err();
    assert!(err.is_invalid_argument());
}

#[tokio::test]
async fn test_transient_faults_are_retried_per_request() {
    let f = fixture().await;
    let drive = f.auth.drive("drive-a");

    drive.fail_next(2);
    let made = f.gw.new_directory_item(&f.root, &f.top, "kept").await.unwrap();
    assert_eq!(made.name, "kept");
    assert_eq!(drive.faults_injected(), 2);

    drive.fail_next(3);
    let err = f.gw.get_child_item(&f.root, &f.top).await.unwrap_err();
    assert!(matches!(err, GatewayError::Transient { .. }));

    let strict = RemoteGateway::new(SCHEME, f.auth.clone()).with_retry(RetryPolicy::once());
    drive.fail_next(1);
    assert!(strict.get_drive(&f.root, None).await.is_err());
    assert!(strict.get_drive(&f.root, None).await.is_ok());
}
