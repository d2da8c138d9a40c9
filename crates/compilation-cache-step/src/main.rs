//! Command-line entry point of the compilation cache step

use anyhow::{Context, Result};
use clap::Parser;
use compilation_cache_step::{
    DetachedProcessLauncher, EnvRepository, EnvmanExporter, Error, GitCloneFetcher,
    GoBinaryBuilder, HttpCredentials, OsEnvRepository, Step, StepInput, logging,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;

#[derive(Parser)]
#[command(name = "compilation-cache-step")]
#[command(about = "Build and start the Xcode compilation cache proxy")]
#[command(version)]
struct Cli {
    /// Directory the proxy sources are checked out in (defaults to the current directory)
    #[arg(long, value_name = "PATH")]
    work_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let env: Arc<dyn EnvRepository> = Arc::new(OsEnvRepository);

    let input = match StepInput::parse(env.as_ref()) {
        Ok(input) => input,
        Err(err) => {
            logging::init(false);
            error!("{:#}", anyhow::Error::from(Error::from(err)));
            return ExitCode::FAILURE;
        }
    };

    println!("{input}");
    println!();
    logging::init(input.verbose);

    match smol::block_on(run(cli, input, env)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, input: StepInput, env: Arc<dyn EnvRepository>) -> Result<()> {
    let work_dir = match cli.work_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("failed to resolve the working directory")?,
    };

    let credentials = match (input.git_http_username, input.git_http_password) {
        (Some(username), Some(password)) => Some(HttpCredentials { username, password }),
        _ => None,
    };

    let mut step = Step::new(
        work_dir,
        env.clone(),
        Box::new(GitCloneFetcher::new().with_credentials(credentials)),
        Box::new(GoBinaryBuilder::new()),
        Box::new(DetachedProcessLauncher::new(env)),
        Box::new(EnvmanExporter::new()),
    );

    step.run().await.map_err(|err| {
        let stage = err.stage();
        anyhow::Error::from(err).context(format!("step failed at stage: {stage}"))
    })?;

    Ok(())
}
