//! Log output setup

use tracing::Level;

/// Install the global subscriber; `verbose` turns on debug output
pub fn init(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}
