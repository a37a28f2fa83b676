//! `nostos diff`

use super::{App, CliResult};
use colored::Colorize;
use nostos_kube::{current_context, load_client, KubeCluster};
use nostos_planner::render::render_resource_diff;
use nostos_planner::{
    build_desired, diff_resources, filter_cluster_scoped, filter_system_namespace, ClusterClient,
};

pub async fn run(app: &App) -> CliResult {
    let registry = super::load_registry();
    let context = current_context(&app.client_options)?;
    let client = load_client(&app.client_options).await?;
    let cluster = KubeCluster::new(client);

    let mut live = cluster.list_resources().await?;
    if app.plan_options.ignore_system_namespace {
        live = filter_system_namespace(live);
    }
    if app.plan_options.ignore_cluster_scoped {
        live = filter_cluster_scoped(live, &registry);
    }
    let desired = build_desired(&app.workspace, &context, &app.plan_options, &registry)?;

    let diff = diff_resources(&live, &desired);
    for r in &diff.to_create {
        println!("{} {}", "+".green(), r.id());
    }
    for update in &diff.to_update {
        println!("{} {}", "~".yellow(), update.desired.id());
        for line in render_resource_diff(update).lines() {
            let rendered = match line.as_bytes().first() {
                Some(b'+') => line.green().to_string(),
                Some(b'-') => line.red().to_string(),
                Some(b'@') => line.cyan().to_string(),
                _ => line.to_string(),
            };
            println!("  {rendered}");
        }
    }
    for r in &diff.unmanaged {
        println!("{} {}", "?".red(), r.id());
    }
    Ok(())
}
