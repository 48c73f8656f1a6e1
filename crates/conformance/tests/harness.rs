use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use conformance::{
    ensure, Harness, HarnessConfig, HarnessError, Report, Scenario, ScenarioError, ScenarioResult,
    SCRATCH_PREFIX,
};
use futures::future::BoxFuture;
use futures::FutureExt;
use gateway::{
    AsyncGateway, AsyncReadStream, Capabilities, Capability, DirectoryId, DirectoryInfoContract,
    DriveInfoContract, FileId, FileInfoContract, FileSystemId, FileSystemInfoContract,
    GatewayError, GatewayRegistration, GatewayRegistry, ProgressSink, RootConfig, RootName,
    RootDirectoryInfoContract,
};
use tempfile::TempDir;

fn local_root(dir: &TempDir) -> RootName {
    RootName::new("file", dir.path().to_string_lossy().to_string())
}

fn assert_clean(report: &Report) {
    let failures: Vec<String> = report
        .failures()
        .map(|o| format!("{} {}: {:?}", o.root, o.capability, o.result))
        .collect();
    assert!(failures.is_empty(), "failures: {:#?}", failures);
}

fn scratch_leftovers(dir: &TempDir) -> Vec<String> {
    std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .filter(|name| name.starts_with(SCRATCH_PREFIX))
        .collect()
}

#[tokio::test]
async fn test_local_root_passes_every_scenario() {
    let dir = TempDir::new().unwrap();
    let config = HarnessConfig::new(vec![RootConfig::new(local_root(&dir))]);

    let report = Harness::new(GatewayRegistry::with_defaults())
        .run(&config)
        .await
        .unwrap();

    assert_clean(&report);
    assert_eq!(report.passed().count(), Capability::ALL.len());
    assert!(scratch_leftovers(&dir).is_empty());
}

#[tokio::test]
async fn test_sim_roots_pass_with_and_without_faults() {
    let config = HarnessConfig::from_yaml(
        r#"
roots:
  - root: sim://alice@steady
  - root: sim://bob@flaky
    parameters:
      fault_rate: "0.25"
      seed: "11"
      attempts: "16"
"#,
    )
    .unwrap();

    let report = Harness::new(GatewayRegistry::with_defaults())
        .run(&config)
        .await
        .unwrap();

    assert_clean(&report);
    for root in &config.roots {
        assert_eq!(report.for_root(&root.root).count(), Capability::ALL.len());
    }
}

#[tokio::test]
async fn test_over_declared_root_stops_the_run() {
    let mut registry = GatewayRegistry::with_defaults();
    registry.register(GatewayRegistration::new(
        "file",
        Capabilities::all().without(Capability::CopyDirectoryItem),
        "local disk without directory copies",
        |config: &RootConfig| GatewayRegistration::local().build(config),
    ));
    let dir = TempDir::new().unwrap();
    let config = HarnessConfig::new(vec![
        RootConfig::new(local_root(&dir)).with_capabilities(Capabilities::all()),
    ]);

    let err = Harness::new(registry).run(&config).await.unwrap_err();
    assert!(matches!(
        err,
        HarnessError::Root {
            source: GatewayError::Unsupported {
                capability: Capability::CopyDirectoryItem,
                ..
            },
            ..
        }
    ));
}

#[tokio::test]
async fn test_missing_setup_capability_skips() {
    let dir = TempDir::new().unwrap();
    let declared = Capabilities::from([
        Capability::GetRoot,
        Capability::NewDirectoryItem,
        Capability::RemoveItem,
        Capability::ClearContent,
        Capability::GetChildItem,
    ]);
    let config = HarnessConfig::new(vec![
        RootConfig::new(local_root(&dir)).with_capabilities(declared.clone()),
    ]);

    let report = Harness::new(GatewayRegistry::with_defaults())
        .run(&config)
        .await
        .unwrap();

    assert_clean(&report);
    assert_eq!(report.outcomes.len(), declared.len());
    let clear = report
        .outcomes
        .iter()
        .find(|o| o.capability == Capability::ClearContent)
        .unwrap();
    assert_eq!(
        clear.result,
        ScenarioResult::Skipped {
            missing: Capabilities::from([Capability::GetContent, Capability::NewFileItem]),
        }
    );
    let listing = report
        .outcomes
        .iter()
        .find(|o| o.capability == Capability::GetChildItem)
        .unwrap();
    assert!(listing.skipped());
    assert!(report
        .outcomes
        .iter()
        .any(|o| o.capability == Capability::GetRoot && o.passed()));
}

/// Passes calls through, remembering which operation each one was
struct Recording {
    inner: Arc<dyn AsyncGateway>,
    calls: Arc<Mutex<Vec<&'static str>>>,
}

impl Recording {
    fn record(&self, operation: &'static str) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(operation);
    }
}

#[async_trait]
impl AsyncGateway for Recording {
    async fn get_drive(
        &self,
        root: &RootName,
        credential: Option<&str>,
    ) -> gateway::Result<DriveInfoContract> {
        self.record("GetDrive");
        self.inner.get_drive(root, credential).await
    }

    async fn get_root(
        &self,
        root: &RootName,
        credential: Option<&str>,
    ) -> gateway::Result<RootDirectoryInfoContract> {
        self.record("GetRoot");
        self.inner.get_root(root, credential).await
    }

    async fn get_child_item(
        &self,
        root: &RootName,
        parent: &DirectoryId,
    ) -> gateway::Result<Vec<FileSystemInfoContract>> {
        self.record("GetChildItem");
        self.inner.get_child_item(root, parent).await
    }

    async fn clear_content(&self, root: &RootName, target: &FileId) -> gateway::Result<()> {
        self.record("ClearContent");
        self.inner.clear_content(root, target).await
    }

    async fn get_content(
        &self,
        root: &RootName,
        source: &FileId,
    ) -> gateway::Result<AsyncReadStream> {
        self.record("GetContent");
        self.inner.get_content(root, source).await
    }

    async fn set_content(
        &self,
        root: &RootName,
        target: &FileId,
        content: AsyncReadStream,
        progress: &dyn ProgressSink,
    ) -> gateway::Result<()> {
        self.record("SetContent");
        self.inner.set_content(root, target, content, progress).await
    }

    async fn copy_item(
        &self,
        root: &RootName,
        source: &FileSystemId,
        copy_name: &str,
        destination: &DirectoryId,
        recurse: bool,
    ) -> gateway::Result<FileSystemInfoContract> {
        self.record(if source.is_directory() { "CopyDirectoryItem" } else { "CopyFileItem" });
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
    ) -> gateway::Result<FileSystemInfoContract> {
        self.record(if source.is_directory() { "MoveDirectoryItem" } else { "MoveFileItem" });
        self.inner.move_item(root, source, move_name, destination).await
    }

    async fn new_directory_item(
        &self,
        root: &RootName,
        parent: &DirectoryId,
        name: &str,
    ) -> gateway::Result<DirectoryInfoContract> {
        self.record("NewDirectoryItem");
        self.inner.new_directory_item(root, parent, name).await
    }

    async fn new_file_item(
        &self,
        root: &RootName,
        parent: &DirectoryId,
        name: &str,
        content: AsyncReadStream,
        progress: &dyn ProgressSink,
    ) -> gateway::Result<FileInfoContract> {
        self.record("NewFileItem");
        self.inner
            .new_file_item(root, parent, name, content, progress)
            .await
    }

    async fn remove_item(
        &self,
        root: &RootName,
        target: &FileSystemId,
        recurse: bool,
    ) -> gateway::Result<()> {
        self.record("RemoveItem");
        self.inner.remove_item(root, target, recurse).await
    }

    async fn rename_item(
        &self,
        root: &RootName,
        target: &FileSystemId,
        new_name: &str,
    ) -> gateway::Result<FileSystemInfoContract> {
        self.record(if target.is_directory() {
            "RenameDirectoryItem"
        } else {
            "RenameFileItem"
        });
        self.inner.rename_item(root, target, new_name).await
    }
}

#[tokio::test]
async fn test_never_calls_undeclared_operations() {
    let calls: Arc<Mutex<Vec<&'static str>>> = Arc::default();
    let mut registry = GatewayRegistry::new();
    {
        let calls = calls.clone();
        registry.register(GatewayRegistration::new(
            "sim",
            Capabilities::all(),
            "recording simulated drive",
            move |config: &RootConfig| {
                let inner = GatewayRegistration::simulated().build(config)?;
                let recording: Arc<dyn AsyncGateway> = Arc::new(Recording {
                    inner,
                    calls: calls.clone(),
                });
                Ok(recording)
            },
        ));
    }

    let declared = Capabilities::all()
        .without(Capability::GetContent)
        .without(Capability::CopyDirectoryItem)
        .without(Capability::RenameFileItem);
    let config = HarnessConfig::new(vec![
        RootConfig::new(RootName::new("sim", "recorded")).with_capabilities(declared.clone()),
    ]);

    let report = Harness::new(registry).run(&config).await.unwrap();
    assert_clean(&report);
    assert!(report.skipped().count() > 0);

    let calls = calls.lock().unwrap_or_else(PoisonError::into_inner).clone();
    assert!(!calls.is_empty());
    for call in calls {
        let capability: Capability = call.parse().unwrap();
        assert!(declared.contains(capability), "{} was not declared", call);
    }
}

fn failing(cx: conformance::Context) -> BoxFuture<'static, Result<(), ScenarioError>> {
    async move {
        let scratch = cx.scratch()?.clone();
        let _ = cx.new_file(&scratch, "left-behind.txt", b"data").await?;
        ensure!(false, "deliberate failure");
        Ok(())
    }
    .boxed()
}

fn panicking(cx: conformance::Context) -> BoxFuture<'static, Result<(), ScenarioError>> {
    async move {
        let scratch = cx.scratch()?.clone();
        let _ = cx.new_directory(&scratch, "nested").await?;
        panic!("deliberate panic");
    }
    .boxed()
}

#[tokio::test]
async fn test_scratch_is_removed_after_failure_and_panic() {
    let dir = TempDir::new().unwrap();
    let config = HarnessConfig::new(vec![RootConfig::new(local_root(&dir))]);
    let scenarios = vec![
        Scenario {
            name: "fails",
            capability: Capability::NewFileItem,
            requires: Capabilities::from([Capability::NewFileItem]),
            uses_scratch: true,
            run: failing,
        },
        Scenario {
            name: "panics",
            capability: Capability::NewDirectoryItem,
            requires: Capabilities::from([Capability::NewDirectoryItem]),
            uses_scratch: true,
            run: panicking,
        },
    ];

    let report = Harness::new(GatewayRegistry::with_defaults())
        .with_scenarios(scenarios)
        .run(&config)
        .await
        .unwrap();

    let messages: Vec<String> = report
        .failures()
        .map(|o| match &o.result {
            ScenarioResult::Failed { message } => message.clone(),
            other => format!("{:?}", other),
        })
        .collect();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0], "deliberate failure");
    assert!(messages[1].contains("deliberate panic"));
    assert!(scratch_leftovers(&dir).is_empty());
}

#[test]
fn test_report_serializes_status() {
    let report = Report {
        outcomes: vec![conformance::ScenarioOutcome {
            root: RootName::new("sim", "d"),
            scenario: "drive reports identity".to_string(),
            capability: Capability::GetDrive,
            result: ScenarioResult::Skipped {
                missing: Capabilities::from([Capability::GetDrive]),
            },
        }],
    };
    let json = serde_json::to_value(&report).unwrap();
    let outcome = &json["outcomes"][0];
    assert_eq!(outcome["root"], "sim://d");
    assert_eq!(outcome["status"], "skipped");
    assert_eq!(outcome["missing"][0], "GetDrive");
    assert!(report.is_success());
}
