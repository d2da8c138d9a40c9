//! Stage ordering, export contract and fail-fast behaviour of a run

mod common;

use common::{
    CallLog, FakeFetcher, RecordingExporter, StubLauncher, binary_path, failing_go, fake_go,
};
use command_executor::Command;
use compilation_cache_step::{
    BuildError, DetachedProcessLauncher, Error, GoBinaryBuilder, LaunchError,
    MapEnvRepository, ProcessLauncher, Stage, Step, compilation_cache_args,
};
use std::path::Path;
use std::sync::Arc;

const CACHE_ARGS: &str = "SWIFT_ENABLE_EXPLICIT_MODULES=YES COMPILATION_CACHE_ENABLE_CACHING=YES SWIFT_ENABLE_COMPILE_CACHE=1 COMPILATION_CACHE_REMOTE_SERVICE_PATH=/tmp/llvmproxy.sock COMPILATION_CACHE_ENABLE_PLUGIN=1";

const EXPORT_ORDER: [&str; 4] = [
    "BITRISE_XCODE_COMPILATION_CACHE_PROXY_PID",
    "BITRISE_XCODE_COMPILATION_CACHE_ENABLED",
    "BITRISE_XCODE_COMPILATION_CACHE_ARGS",
    "BITRISE_XCODE_ADDITIONAL_ARGS",
];

fn base_env() -> MapEnvRepository {
    MapEnvRepository::new().with("PATH", std::env::var("PATH").unwrap_or_default())
}

struct Harness {
    log: CallLog,
    exporter: RecordingExporter,
}

impl Harness {
    fn new() -> Self {
        let log = CallLog::default();
        let exporter = RecordingExporter {
            log: log.clone(),
            ..Default::default()
        };
        Self { log, exporter }
    }

    fn refusing(key: &'static str) -> Self {
        let mut harness = Self::new();
        harness.exporter.refuse = Some(key);
        harness
    }

    fn stub_launcher(&self, fail: bool) -> Box<dyn ProcessLauncher> {
        Box::new(StubLauncher {
            log: self.log.clone(),
            pid: 4242,
            fail,
        })
    }

    fn step(
        &self,
        work_dir: &Path,
        env: MapEnvRepository,
        toolchain: Command,
        launcher: Box<dyn ProcessLauncher>,
    ) -> Step {
        self.step_with_fetcher(work_dir, env, toolchain, launcher, false)
    }

    fn step_with_fetcher(
        &self,
        work_dir: &Path,
        env: MapEnvRepository,
        toolchain: Command,
        launcher: Box<dyn ProcessLauncher>,
        fetch_fails: bool,
    ) -> Step {
        Step::new(
            work_dir,
            Arc::new(env),
            Box::new(FakeFetcher {
                log: self.log.clone(),
                fail: fetch_fails,
            }),
            Box::new(GoBinaryBuilder::new().with_toolchain(toolchain)),
            launcher,
            Box::new(self.exporter.clone()),
        )
    }
}

#[cfg(unix)]
#[smol_potat::test]
async fn test_full_run_detaches_proxy_and_exports_in_order() {
    use nix::unistd::{Pid, getsid};

    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::new();
    let env = base_env().with("REMOTE_CACHE_TOKEN", "token");
    let launcher = DetachedProcessLauncher::new(Arc::new(env.clone()));

    let mut step = harness.step(dir.path(), env, fake_go(), Box::new(launcher));
    let summary = step.run().await.unwrap();

    let pid = summary.pid;
    assert_ne!(pid, std::process::id());
    let session = getsid(Some(Pid::from_raw(pid as i32)));

    assert_eq!(step.stage(), Stage::Done);
    assert_eq!(summary.binary, binary_path(dir.path()));
    assert_eq!(summary.checkout.commit.as_deref(), Some("0123abc"));

    let exported = harness.exporter.exported();
    let names: Vec<&str> = exported.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(names, EXPORT_ORDER);
    assert_eq!(exported[0].1, pid.to_string());
    assert_eq!(exported[1].1, "true");
    assert_eq!(exported[2].1, CACHE_ARGS);
    // No earlier additional args: the cache flags alone
    assert_eq!(exported[3].1, CACHE_ARGS);
    assert_eq!(summary.exports, exported);

    common::stop_process_group(pid);
    assert_eq!(session.unwrap(), Pid::from_raw(pid as i32));
}

#[smol_potat::test]
async fn test_collaborators_called_once_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::new();

    let mut step = harness.step(dir.path(), base_env(), fake_go(), harness.stub_launcher(false));
    step.run().await.unwrap();

    let binary = binary_path(dir.path());
    assert_eq!(
        harness.log.calls(),
        vec![
            "checkout main".to_string(),
            format!("launch {}", binary.display()),
            format!("export {}", EXPORT_ORDER[0]),
            format!("export {}", EXPORT_ORDER[1]),
            format!("export {}", EXPORT_ORDER[2]),
            format!("export {}", EXPORT_ORDER[3]),
        ]
    );
}

#[smol_potat::test]
async fn test_rerun_starts_from_init() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::refusing("BITRISE_XCODE_COMPILATION_CACHE_ARGS");

    let mut step = harness.step(dir.path(), base_env(), fake_go(), harness.stub_launcher(false));
    step.run().await.unwrap_err();
    assert_eq!(step.stage(), Stage::ExportedEnabled);

    // Same order again on the second run
    let err = step.run().await.unwrap_err();
    assert_eq!(err.stage(), Stage::ExportedArgs);
    assert_eq!(step.stage(), Stage::ExportedEnabled);
    let attempts = harness
        .log
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("checkout"))
        .count();
    assert_eq!(attempts, 2);
    assert_eq!(harness.exporter.exported().len(), 4);
}

#[smol_potat::test]
async fn test_prior_additional_args_come_first() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::new();
    let env = base_env().with("BITRISE_XCODE_ADDITIONAL_ARGS", "-foo");

    let mut step = harness.step(dir.path(), env, fake_go(), harness.stub_launcher(false));
    let summary = step.run().await.unwrap();

    assert_eq!(summary.pid, 4242);
    let exported = harness.exporter.exported();
    assert_eq!(exported[0].1, "4242");
    assert_eq!(exported[3].0, "BITRISE_XCODE_ADDITIONAL_ARGS");
    assert_eq!(exported[3].1, format!("-foo {CACHE_ARGS}"));
}

#[smol_potat::test]
async fn test_cache_args_ignore_inputs() {
    let mut seen = Vec::new();
    for env in [
        base_env(),
        base_env()
            .with("BITRISE_XCODE_ADDITIONAL_ARGS", "-quiet")
            .with("APP_ID", "app")
            .with("COMPILATION_CACHE_ENABLE_PLUGIN", "0"),
    ] {
        let dir = tempfile::tempdir().unwrap();
        let harness = Harness::new();
        let mut step = harness.step(dir.path(), env, fake_go(), harness.stub_launcher(false));
        step.run().await.unwrap();
        seen.push(harness.exporter.exported()[2].1.clone());
    }

    assert_eq!(seen[0], seen[1]);
    assert_eq!(seen[0], compilation_cache_args());
}

#[smol_potat::test]
async fn test_fetch_failure_stops_everything() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::new();

    let mut step = harness.step_with_fetcher(
        dir.path(),
        base_env(),
        fake_go(),
        harness.stub_launcher(false),
        true,
    );
    let err = step.run().await.unwrap_err();

    assert!(matches!(err, Error::Fetch(_)), "got {err:?}");
    assert_eq!(err.stage(), Stage::Fetched);
    assert_eq!(step.stage(), Stage::Init);
    assert_eq!(harness.log.calls(), vec!["checkout main".to_string()]);
    assert!(!binary_path(dir.path()).exists());
}

#[smol_potat::test]
async fn test_build_failure_skips_launch_and_exports() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::new();

    let mut step = harness.step(dir.path(), base_env(), failing_go(), harness.stub_launcher(false));
    let err = step.run().await.unwrap_err();

    match &err {
        Error::Build(BuildError::ToolchainFailed { status, diagnostics }) => {
            assert_eq!(status.code, Some(1));
            assert!(diagnostics.contains("syntax error"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.stage(), Stage::Built);
    assert_eq!(step.stage(), Stage::Fetched);
    assert_eq!(harness.log.calls(), vec!["checkout main".to_string()]);
    assert!(harness.exporter.exported().is_empty());
}

#[smol_potat::test]
async fn test_launch_failure_exports_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::new();

    let mut step = harness.step(dir.path(), base_env(), fake_go(), harness.stub_launcher(true));
    let err = step.run().await.unwrap_err();

    assert!(matches!(err, Error::Launch(_)), "got {err:?}");
    assert_eq!(step.stage(), Stage::Built);
    assert!(harness.exporter.exported().is_empty());
    assert!(!harness.log.calls().iter().any(|c| c.starts_with("export")));
    // No rollback: the artifact stays
    assert!(binary_path(dir.path()).exists());
}

#[smol_potat::test]
async fn test_unopenable_null_device_exports_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::new();
    let env = base_env();
    let launcher = DetachedProcessLauncher::new(Arc::new(env.clone()))
        .with_null_device(dir.path().join("no-such-dir/null"));

    let mut step = harness.step(dir.path(), env, fake_go(), Box::new(launcher));
    let err = step.run().await.unwrap_err();

    assert!(
        matches!(err, Error::Launch(LaunchError::NullDevice(_))),
        "got {err:?}"
    );
    assert!(harness.exporter.exported().is_empty());
    assert!(binary_path(dir.path()).exists());
}

#[smol_potat::test]
async fn test_refused_export_stops_later_exports() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::refusing("BITRISE_XCODE_COMPILATION_CACHE_ENABLED");

    let mut step = harness.step(dir.path(), base_env(), fake_go(), harness.stub_launcher(false));
    let err = step.run().await.unwrap_err();

    match &err {
        Error::Export { key, stage, .. } => {
            assert_eq!(*key, "BITRISE_XCODE_COMPILATION_CACHE_ENABLED");
            assert_eq!(*stage, Stage::ExportedEnabled);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(step.stage(), Stage::ExportedPid);

    // The pid export already happened and is not retracted
    let exported = harness.exporter.exported();
    assert_eq!(exported.len(), 1);
    assert_eq!(exported[0].0, EXPORT_ORDER[0]);

    let attempts: Vec<String> = harness
        .log
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("export"))
        .collect();
    assert_eq!(attempts.len(), 2);
}

#[smol_potat::test]
async fn test_error_chain_names_the_stage() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::refusing("BITRISE_XCODE_ADDITIONAL_ARGS");

    let mut step = harness.step(dir.path(), base_env(), fake_go(), harness.stub_launcher(false));
    let err = step.run().await.unwrap_err();

    assert_eq!(err.stage(), Stage::ExportedAdditionalArgs);
    assert_eq!(
        format!("{:#}", anyhow::Error::from(err)),
        "failed to export BITRISE_XCODE_ADDITIONAL_ARGS: output store unavailable: envstore is read-only"
    );
    assert_eq!(harness.exporter.exported().len(), 3);
}
