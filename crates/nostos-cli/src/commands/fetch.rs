//! `nostos fetch`

use super::{App, CliResult};
use nostos_kube::{fetch_types, load_client};

pub async fn run(app: &App) -> CliResult {
    let client = load_client(&app.client_options).await?;
    let registry = fetch_types(client).await?;

    let mut kinds: Vec<String> = registry
        .list_types()
        .iter()
        .map(|t| format!("{}/{}", t.api_version(), t.kind))
        .collect();
    kinds.sort();
    println!("registered {} types from the cluster", kinds.len());
    for kind in kinds {
        println!("  {kind}");
    }
    Ok(())
}
