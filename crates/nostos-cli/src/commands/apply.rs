//! `nostos apply`

use super::plan::build_plan;
use super::{App, CliResult};
use colored::Colorize;
use nostos_kube::{load_client, KubeCluster};
use nostos_planner::{ClusterClient, Dag, NodeStatus, Phase, Reconciler};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const SPINNER: [char; 4] = ['|', '/', '-', '\\'];

pub async fn run(app: &App) -> CliResult {
    let dag = build_plan(app).await?;
    let client = load_client(&app.client_options).await?;
    let cluster = Arc::new(KubeCluster::new(client));

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    if app.tty {
        apply_interactive(cluster, &dag, cancel).await
    } else {
        apply_plain(cluster, &dag, cancel).await
    }
}

/// Sequential apply with one log line per step.
async fn apply_plain(
    cluster: Arc<KubeCluster>,
    dag: &Dag,
    cancel: CancellationToken,
) -> CliResult {
    let total = dag.order.len();
    for (i, id) in dag.order.iter().enumerate() {
        if cancel.is_cancelled() {
            break;
        }
        let Some(resource) = &dag.nodes[id].resource else {
            continue;
        };
        let prefix = format!("{:>2}/{}", i + 1, total);
        println!("{prefix} applying {id}");
        if let Err(e) = cluster.apply(resource).await {
            println!("{prefix} failed {id}: {e}");
            return Err(e.into());
        }
        println!("{prefix} applied {id}");
    }
    Ok(())
}

/// Live status tree with a spinner, redrawn until every node settles.
async fn apply_interactive(
    cluster: Arc<KubeCluster>,
    dag: &Dag,
    cancel: CancellationToken,
) -> CliResult {
    let reconciler = Arc::new(Reconciler::new(cluster));
    let runner = {
        let reconciler = Arc::clone(&reconciler);
        let dag = dag.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { reconciler.run(&dag, cancel).await })
    };

    let mut frame = 0usize;
    loop {
        tokio::time::sleep(Duration::from_millis(150)).await;
        let statuses = reconciler.snapshot();
        // Clear screen and redraw.
        print!("\x1b[H\x1b[2J");
        print_status_tree(dag, &statuses, SPINNER[frame % SPINNER.len()]);
        frame += 1;

        let settled = statuses
            .values()
            .all(|s| s.error.is_some() || (s.phase == Phase::Applied && s.ready));
        if runner.is_finished() && (settled || cancel.is_cancelled()) {
            break;
        }
    }

    match runner.await {
        Ok(result) => result.map_err(Into::into),
        Err(join_err) => Err(anyhow::anyhow!("apply task failed: {join_err}").into()),
    }
}

fn print_status_tree(
    dag: &Dag,
    statuses: &indexmap::IndexMap<String, NodeStatus>,
    spinner: char,
) {
    let mut visited = HashSet::new();
    for root in &dag.roots {
        print_status_node(dag, root, "", true, true, statuses, spinner, &mut visited);
    }
}

#[allow(clippy::too_many_arguments)]
fn print_status_node(
    dag: &Dag,
    id: &str,
    prefix: &str,
    last: bool,
    root: bool,
    statuses: &indexmap::IndexMap<String, NodeStatus>,
    spinner: char,
    visited: &mut HashSet<String>,
) {
    let (connector, child_prefix) = if root {
        (String::new(), String::new())
    } else if last {
        (format!("{prefix}└─ "), format!("{prefix}   "))
    } else {
        (format!("{prefix}├─ "), format!("{prefix}│  "))
    };

    let marker = match statuses.get(id) {
        Some(s) if s.error.is_some() => "✗".red().to_string(),
        Some(s) if s.phase == Phase::Applied && s.ready => "✓".green().to_string(),
        Some(_) => spinner.to_string(),
        // Placeholder nodes have nothing to apply.
        None => "·".to_string(),
    };
    let detail = statuses
        .get(id)
        .map(|s| {
            s.error
                .clone()
                .unwrap_or_else(|| s.detail.clone())
        })
        .unwrap_or_default();
    println!("{connector}{marker} {} {}", id.cyan(), detail.dimmed());
    visited.insert(id.to_string());

    let Some(node) = dag.node(id) else { return };
    let children: Vec<&String> = node
        .children
        .iter()
        .filter(|c| !visited.contains(*c))
        .collect();
    let last_child = children.len().saturating_sub(1);
    for (i, child) in children.iter().enumerate() {
        print_status_node(
            dag,
            child,
            &child_prefix,
            i == last_child,
            false,
            statuses,
            spinner,
            visited,
        );
    }
}
