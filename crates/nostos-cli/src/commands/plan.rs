//! `nostos plan`

use super::{App, CliResult};
use colored::Colorize;
use nostos_kube::{current_context, load_client, KubeCluster};
use nostos_planner::{
    build_desired, diff_resources, filter_cluster_scoped, filter_system_namespace, ClusterClient,
    Dag,
};
use std::collections::HashSet;

pub async fn run(app: &App) -> CliResult {
    let dag = build_plan(app).await?;
    print_plan(&dag);
    Ok(())
}

/// Fetch cluster state, evaluate the workspace and produce the ordered
/// change plan.
pub async fn build_plan(app: &App) -> Result<Dag, super::CliError> {
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
    Ok(Dag::build(&diff.to_apply())?)
}

/// Render the DAG as a tree, roots first.
pub fn print_plan(dag: &Dag) {
    let mut visited = HashSet::new();
    for root in &dag.roots {
        print_node(dag, root, "", true, true, &mut visited);
    }
}

fn print_node(
    dag: &Dag,
    id: &str,
    prefix: &str,
    last: bool,
    root: bool,
    visited: &mut HashSet<String>,
) {
    let (connector, child_prefix) = if root {
        (String::new(), String::new())
    } else if last {
        (format!("{prefix}└─ "), format!("{prefix}   "))
    } else {
        (format!("{prefix}├─ "), format!("{prefix}│  "))
    };
    println!("{connector}{}", id.cyan());
    visited.insert(id.to_string());

    let Some(node) = dag.node(id) else { return };
    let children: Vec<&String> = node
        .children
        .iter()
        .filter(|c| !visited.contains(*c))
        .collect();
    let last_child = children.len().saturating_sub(1);
    for (i, child) in children.iter().enumerate() {
        print_node(dag, child, &child_prefix, i == last_child, false, visited);
    }
}
