//! Step inputs
//!
//! Inputs arrive as environment variables named after the input, the way the
//! CI runner passes them to every step.

use crate::env::EnvRepository;
use crate::error::ConfigError;
use std::fmt;

const VERBOSE: &str = "verbose";
const GIT_HTTP_USERNAME: &str = "git_http_username";
const GIT_HTTP_PASSWORD: &str = "git_http_password";
const BUILD_URL: &str = "build_url";
const BUILD_API_TOKEN: &str = "build_api_token";

/// A value that must never be printed
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wrap a sensitive value
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The actual value
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("*****")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("*****")
    }
}

/// Parsed step inputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepInput {
    /// Enables debug logging
    pub verbose: bool,
    /// Username for HTTP git remotes
    pub git_http_username: Option<String>,
    /// Password for HTTP git remotes
    pub git_http_password: Option<Secret>,
    /// URL of the running build
    pub build_url: Option<String>,
    /// API token of the running build
    pub build_api_token: Option<Secret>,
}

impl StepInput {
    /// Read the inputs from `env`
    pub fn parse(env: &dyn EnvRepository) -> Result<Self, ConfigError> {
        Ok(Self {
            verbose: parse_bool(VERBOSE, &required(env, VERBOSE)?)?,
            git_http_username: optional(env, GIT_HTTP_USERNAME),
            git_http_password: optional(env, GIT_HTTP_PASSWORD).map(Secret),
            build_url: optional(env, BUILD_URL),
            build_api_token: optional(env, BUILD_API_TOKEN).map(Secret),
        })
    }
}

/// Lists every input, secrets masked
impl fmt::Display for StepInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn show<T: fmt::Display>(value: &Option<T>) -> String {
            value.as_ref().map(ToString::to_string).unwrap_or_default()
        }

        writeln!(f, "Config:")?;
        writeln!(f, "- {VERBOSE}: {}", self.verbose)?;
        writeln!(f, "- {GIT_HTTP_USERNAME}: {}", show(&self.git_http_username))?;
        writeln!(f, "- {GIT_HTTP_PASSWORD}: {}", show(&self.git_http_password))?;
        writeln!(f, "- {BUILD_URL}: {}", show(&self.build_url))?;
        write!(f, "- {BUILD_API_TOKEN}: {}", show(&self.build_api_token))
    }
}

fn required(env: &dyn EnvRepository, key: &'static str) -> Result<String, ConfigError> {
    optional(env, key).ok_or(ConfigError::Missing { key })
}

fn optional(env: &dyn EnvRepository, key: &str) -> Option<String> {
    Some(env.get(key)).filter(|value| !value.trim().is_empty())
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key,
            value: value.to_string(),
        }),
    }
}
