//! The step: fetch, build, launch, export

use crate::args::{compilation_cache_args, merge_additional_args};
use crate::build::BinaryBuilder;
use crate::config::{ProxySource, keys};
use crate::env::EnvRepository;
use crate::error::{Error, Result};
use crate::export::EnvironmentExporter;
use crate::fetch::{CheckoutState, FetchConfig, RepositoryFetcher};
use crate::launch::{ProcessLauncher, proxy_environment};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Progress of a run
///
/// Stages are reached strictly in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// Nothing done yet
    Init,
    /// Sources checked out
    Fetched,
    /// Proxy compiled
    Built,
    /// Proxy running
    Launched,
    /// Pid exported
    ExportedPid,
    /// Enabled flag exported
    ExportedEnabled,
    /// Cache flags exported
    ExportedArgs,
    /// Merged additional arguments exported
    ExportedAdditionalArgs,
    /// Run complete
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "init",
            Stage::Fetched => "fetch",
            Stage::Built => "build",
            Stage::Launched => "launch",
            Stage::ExportedPid => "export pid",
            Stage::ExportedEnabled => "export enabled flag",
            Stage::ExportedArgs => "export cache args",
            Stage::ExportedAdditionalArgs => "export additional args",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// What a successful run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Checked out proxy sources
    pub checkout: CheckoutState,
    /// Compiled proxy
    pub binary: PathBuf,
    /// Pid of the detached proxy
    pub pid: u32,
    /// Exported variables, in export order
    pub exports: Vec<(String, String)>,
}

/// Fetches, builds and launches the proxy, then exports its settings
pub struct Step {
    work_dir: PathBuf,
    source: ProxySource,
    env: Arc<dyn EnvRepository>,
    fetcher: Box<dyn RepositoryFetcher>,
    builder: Box<dyn BinaryBuilder>,
    launcher: Box<dyn ProcessLauncher>,
    exporter: Box<dyn EnvironmentExporter>,
    stage: Stage,
}

impl Step {
    /// Step working in `work_dir` with the given collaborators
    pub fn new(
        work_dir: impl Into<PathBuf>,
        env: Arc<dyn EnvRepository>,
        fetcher: Box<dyn RepositoryFetcher>,
        builder: Box<dyn BinaryBuilder>,
        launcher: Box<dyn ProcessLauncher>,
        exporter: Box<dyn EnvironmentExporter>,
    ) -> Self {
        Self {
            work_dir: work_dir.into(),
            source: ProxySource::default(),
            env,
            fetcher,
            builder,
            launcher,
            exporter,
            stage: Stage::Init,
        }
    }

    /// Build a different proxy source
    pub fn with_source(mut self, source: ProxySource) -> Self {
        self.source = source;
        self
    }

    /// Last stage reached
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Run every stage in order, stopping at the first failure
    ///
    /// Nothing is undone on failure: a built binary stays on disk and
    /// variables exported before the failing one stay exported. Every call
    /// starts over from [`Stage::Init`].
    pub async fn run(&mut self) -> Result<RunSummary> {
        self.stage = Stage::Init;
        let config = FetchConfig::for_source(&self.source, self.work_dir.join(&self.source.tools_dir));
        let checkout = self.fetcher.checkout(config).await?;
        self.advance(Stage::Fetched);

        let built = self
            .builder
            .build(&checkout.dir, &self.source.module_path, &self.source.binary_name)
            .await?;
        self.advance(Stage::Built);

        let launched = self
            .launcher
            .launch_detached(built.path(), &proxy_environment(self.env.as_ref()))?;
        info!("Started detached process with PID {}", launched.pid);
        self.advance(Stage::Launched);

        let cache_args = compilation_cache_args();
        let mut exports = Vec::with_capacity(4);
        self.export(&mut exports, Stage::ExportedPid, keys::PROXY_PID, launched.pid.to_string())
            .await?;
        self.export(&mut exports, Stage::ExportedEnabled, keys::CACHE_ENABLED, "true".to_string())
            .await?;
        self.export(&mut exports, Stage::ExportedArgs, keys::CACHE_ARGS, cache_args.clone())
            .await?;

        // Earlier steps' arguments are extended, never replaced
        let additional_args = merge_additional_args(&self.env.get(keys::ADDITIONAL_ARGS), &cache_args);
        self.export(
            &mut exports,
            Stage::ExportedAdditionalArgs,
            keys::ADDITIONAL_ARGS,
            additional_args,
        )
        .await?;

        self.advance(Stage::Done);

        Ok(RunSummary {
            checkout,
            binary: built.path().to_path_buf(),
            pid: launched.pid,
            exports,
        })
    }

    async fn export(
        &mut self,
        exports: &mut Vec<(String, String)>,
        stage: Stage,
        key: &'static str,
        value: String,
    ) -> Result<()> {
        self.exporter
            .export(key, &value)
            .await
            .map_err(|source| Error::Export { stage, key, source })?;
        exports.push((key.to_string(), value));
        self.advance(stage);
        Ok(())
    }

    fn advance(&mut self, stage: Stage) {
        debug_assert!(stage > self.stage, "stage {stage} reached twice");
        debug!("Reached stage: {}", stage);
        self.stage = stage;
    }
}
