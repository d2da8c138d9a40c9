//! Compilation cache build settings

/// Build settings that turn on remote compilation caching, in order
pub const COMPILATION_CACHE_FLAGS: [&str; 5] = [
    "SWIFT_ENABLE_EXPLICIT_MODULES=YES",
    "COMPILATION_CACHE_ENABLE_CACHING=YES",
    "SWIFT_ENABLE_COMPILE_CACHE=1",
    "COMPILATION_CACHE_REMOTE_SERVICE_PATH=/tmp/llvmproxy.sock",
    "COMPILATION_CACHE_ENABLE_PLUGIN=1",
];

/// The cache flags as a single space separated argument string
pub fn compilation_cache_args() -> String {
    COMPILATION_CACHE_FLAGS.join(" ")
}

/// Append `cache_args` to whatever additional arguments an earlier step set
///
/// Earlier arguments stay in front so the cache flags are the last word.
pub fn merge_additional_args(prior: &str, cache_args: &str) -> String {
    if prior.is_empty() {
        cache_args.to_string()
    } else {
        format!("{prior} {cache_args}")
    }
}
