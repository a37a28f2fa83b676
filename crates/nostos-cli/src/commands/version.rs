//! `nostos version`

use super::CliResult;

/// Build identifier: the git SHA baked in by CI, falling back to the crate
/// version.
pub fn run() -> CliResult {
    let build = option_env!("NOSTOS_BUILD_SHA").unwrap_or(env!("CARGO_PKG_VERSION"));
    println!("build version: {build}");
    Ok(())
}
