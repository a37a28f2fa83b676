//! The `nostos` command line.

mod commands;

use clap::{ArgAction, Parser, Subcommand};
use commands::App;
use nostos_kube::ClientOptions;
use nostos_planner::{PlanOptions, Workspace};
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "nostos",
    version,
    about = "Declarative Kubernetes configuration with its own DSL",
    long_about = "Nostos is a programming language designed for Kubernetes configuration,\n\
                  offering a plan/apply workflow as well as an integrated language server."
)]
struct Cli {
    /// Path to the kubeconfig file (default is the standard chain).
    #[arg(long, global = true, value_name = "PATH")]
    kubeconfig: Option<PathBuf>,

    /// Cluster context to plan against.
    #[arg(long, global = true, value_name = "NAME")]
    context: Option<String>,

    /// Workspace directory holding odyssey.no.
    #[arg(long, global = true, value_name = "PATH")]
    workspace_dir: Option<PathBuf>,

    /// Drop resources in kube- namespaces.
    #[arg(long, global = true, value_name = "BOOL", default_value_t = true, action = ArgAction::Set)]
    ignore_system_namespace: bool,

    /// Drop cluster-scoped resources.
    #[arg(long, global = true, value_name = "BOOL", default_value_t = true, action = ArgAction::Set)]
    ignore_cluster_scoped: bool,

    /// Force ANSI colors even when stdout is not a TTY.
    #[arg(long, global = true, value_name = "BOOL", default_value_t = false, action = ArgAction::Set)]
    color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate Nostos code from stdin or a file.
    Eval { file: Option<PathBuf> },
    /// Generate an execution plan.
    Plan,
    /// Show differences between cluster and desired resources.
    Diff,
    /// Apply the computed changes to the cluster.
    Apply,
    /// Populate the type registry from the cluster.
    Fetch,
    /// Speak the Language Server Protocol over stdin/stdout.
    Lsp,
    /// Print the build identifier.
    Version,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nostos=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let tty = std::io::stdout().is_terminal();
    if cli.color {
        colored::control::set_override(true);
    } else if !tty {
        colored::control::set_override(false);
    }

    let app = App {
        workspace: cli
            .workspace_dir
            .map(Workspace::new)
            .unwrap_or_else(Workspace::current),
        client_options: ClientOptions {
            kubeconfig: cli.kubeconfig,
            context: cli.context,
        },
        plan_options: PlanOptions {
            ignore_system_namespace: cli.ignore_system_namespace,
            ignore_cluster_scoped: cli.ignore_cluster_scoped,
        },
        tty,
    };

    let result = match cli.command {
        Command::Eval { file } => commands::eval::run(&app, file.as_deref()),
        Command::Plan => commands::plan::run(&app).await,
        Command::Diff => commands::diff::run(&app).await,
        Command::Apply => commands::apply::run(&app).await,
        Command::Fetch => commands::fetch::run(&app).await,
        Command::Lsp => commands::lsp::run().await,
        Command::Version => commands::version::run(),
    };

    match result {
        Ok(()) => {}
        Err(e) => {
            commands::report_error(&app, e);
            std::process::exit(1);
        }
    }
}
