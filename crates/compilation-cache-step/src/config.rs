//! Fixed names and locations the step works with

use std::path::PathBuf;

/// Repository holding the cache proxy sources
pub const CACHE_TOOLS_GIT_URL: &str = "git@github.com:bitrise-io/xcode-cache-tools.git";

/// Branch of [`CACHE_TOOLS_GIT_URL`] that is built
pub const CACHE_TOOLS_BRANCH: &str = "main";

/// Directory, relative to the work dir, the sources are cloned into
pub const TOOLS_DIR: &str = "xcode-cache-tools";

/// Go package of the proxy, relative to the checkout
pub const PROXY_MODULE_PATH: &str = "cmd/proxy";

/// File name of the compiled proxy
pub const PROXY_BINARY_NAME: &str = "xcode_cache_proxy";

/// Output variables, in the order they are exported
pub mod keys {
    /// Pid of the detached proxy
    pub const PROXY_PID: &str = "BITRISE_XCODE_COMPILATION_CACHE_PROXY_PID";
    /// Always `true` once the proxy runs
    pub const CACHE_ENABLED: &str = "BITRISE_XCODE_COMPILATION_CACHE_ENABLED";
    /// The compilation cache build settings
    pub const CACHE_ARGS: &str = "BITRISE_XCODE_COMPILATION_CACHE_ARGS";
    /// Extra xcodebuild arguments, read and then extended
    pub const ADDITIONAL_ARGS: &str = "BITRISE_XCODE_ADDITIONAL_ARGS";
}

/// Variables handed to the proxy at launch, read from the step's environment
pub const PROXY_ENV_KEYS: [&str; 4] = [
    "REMOTE_CACHE_TOKEN",
    "APP_ID",
    "ORG_ID",
    "LLVM_PROXY_TARGET_ADDR",
];

/// Where the proxy comes from and what it is called once built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySource {
    /// Git URL of the tools repository
    pub repository_url: String,
    /// Branch to check out
    pub branch: String,
    /// Checkout directory, relative to the work dir
    pub tools_dir: PathBuf,
    /// Package to compile, relative to the checkout
    pub module_path: PathBuf,
    /// Output file name of the build
    pub binary_name: String,
}

impl Default for ProxySource {
    fn default() -> Self {
        Self {
            repository_url: CACHE_TOOLS_GIT_URL.to_string(),
            branch: CACHE_TOOLS_BRANCH.to_string(),
            tools_dir: PathBuf::from(TOOLS_DIR),
            module_path: PathBuf::from(PROXY_MODULE_PATH),
            binary_name: PROXY_BINARY_NAME.to_string(),
        }
    }
}
