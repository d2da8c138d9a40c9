//! Reusable description of a program invocation

use async_process::Command as AsyncCommand;
use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};

/// Program, arguments, environment and working directory of one invocation
///
/// Unlike [`async_process::Command`] this is `Clone`, so a configured tool
/// (say `sh -c <script>` standing in for `go`) can be extended per call.
#[derive(Debug, Clone)]
pub struct Command {
    program: OsString,
    args: Vec<OsString>,
    env: BTreeMap<OsString, OsString>,
    current_dir: Option<PathBuf>,
    // When set the child sees only `env`
    isolated_env: bool,
}

impl Command {
    /// Invocation of `program` with no arguments
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            args: Vec::new(),
            env: BTreeMap::new(),
            current_dir: None,
            isolated_env: false,
        }
    }

    /// Start a by-value builder
    pub fn builder<S: AsRef<OsStr>>(program: S) -> CommandBuilder {
        CommandBuilder(Self::new(program))
    }

    /// Append one argument
    pub fn arg<S: AsRef<OsStr>>(&mut self, arg: S) -> &mut Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    /// Append arguments in order
    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|arg| arg.as_ref().to_owned()));
        self
    }

    /// Set a variable; a later value for the same key replaces the earlier one
    pub fn env<K, V>(&mut self, key: K, val: V) -> &mut Self
    where
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        self.env
            .insert(key.as_ref().to_owned(), val.as_ref().to_owned());
        self
    }

    /// Set several variables
    pub fn envs<I, K, V>(&mut self, vars: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        for (key, val) in vars {
            self.env(key, val);
        }
        self
    }

    /// Do not inherit the parent's environment
    pub fn env_clear(&mut self) -> &mut Self {
        self.isolated_env = true;
        self
    }

    /// Run in `dir`
    pub fn current_dir<P: AsRef<Path>>(&mut self, dir: P) -> &mut Self {
        self.current_dir = Some(dir.as_ref().to_owned());
        self
    }

    /// Program to run
    pub fn program(&self) -> &OsStr {
        &self.program
    }

    /// Arguments, in order
    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    /// Explicitly set variables
    pub fn environment(&self) -> &BTreeMap<OsString, OsString> {
        &self.env
    }

    /// Whether the child sees only [`Command::environment`]
    pub fn is_env_cleared(&self) -> bool {
        self.isolated_env
    }

    /// Working directory, if one was set
    pub fn working_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    /// Translate into a spawnable [`async_process::Command`]
    ///
    /// Stdio is left to the caller.
    pub fn prepare(&self) -> AsyncCommand {
        AsyncCommand::from(self.prepare_std())
    }

    /// Translate into a [`std::process::Command`]
    ///
    /// Used where the child is never awaited, and where unix-only spawn
    /// hooks are needed.
    pub fn prepare_std(&self) -> std::process::Command {
        let mut cmd = std::process::Command::new(&self.program);
        cmd.args(&self.args);
        if self.isolated_env {
            cmd.env_clear();
        }
        cmd.envs(&self.env);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

/// Renders the program and its arguments, never the environment
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// By-value builder returned by [`Command::builder`]
pub struct CommandBuilder(Command);

impl CommandBuilder {
    /// Append one argument
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.0.arg(arg);
        self
    }

    /// Append arguments in order
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.0.args(args);
        self
    }

    /// Set a variable
    pub fn env<K, V>(mut self, key: K, val: V) -> Self
    where
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        self.0.env(key, val);
        self
    }

    /// Replace the inherited environment with exactly `vars`
    pub fn clean_env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        self.0.env_clear().envs(vars);
        self
    }

    /// Run in `dir`
    pub fn current_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.0.current_dir(dir);
        self
    }

    /// Finish
    pub fn build(self) -> Command {
        self.0
    }
}
