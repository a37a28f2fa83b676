//! Subcommand implementations.

pub mod apply;
pub mod diff;
pub mod eval;
pub mod fetch;
pub mod lsp;
pub mod plan;
pub mod version;

use nostos_kube::ClientOptions;
use nostos_lang::{NostosError, Reporter};
use nostos_planner::{PlanOptions, Workspace};
use nostos_types::{default_registry, kubespec_enabled, kubespec_registry, Registry};

/// Shared command context assembled from the global flags.
pub struct App {
    pub workspace: Workspace,
    pub client_options: ClientOptions,
    pub plan_options: PlanOptions,
    pub tty: bool,
}

/// Command failure: language errors render through the pretty formatter,
/// everything else one line at a time.
pub enum CliError {
    Nostos(Vec<NostosError>),
    Other(anyhow::Error),
}

impl From<NostosError> for CliError {
    fn from(e: NostosError) -> CliError {
        CliError::Nostos(vec![e])
    }
}

impl From<anyhow::Error> for CliError {
    fn from(e: anyhow::Error) -> CliError {
        CliError::Other(e)
    }
}

impl From<nostos_planner::PlanError> for CliError {
    fn from(e: nostos_planner::PlanError) -> CliError {
        CliError::Other(anyhow::anyhow!(e))
    }
}

impl From<nostos_planner::ClusterError> for CliError {
    fn from(e: nostos_planner::ClusterError) -> CliError {
        CliError::Other(anyhow::anyhow!(e))
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> CliError {
        CliError::Other(anyhow::anyhow!(e))
    }
}

pub type CliResult = Result<(), CliError>;

pub fn report_error(app: &App, error: CliError) {
    match error {
        CliError::Nostos(errors) => {
            let reporter = if app.tty {
                Reporter::pretty()
            } else {
                Reporter::simple()
            };
            let _ = reporter.report(&errors, &mut std::io::stderr());
        }
        CliError::Other(e) => {
            eprintln!("error: {e:#}");
        }
    }
}

/// The process-wide type registry: the embedded kubespec dataset when
/// opted in, the built-in defaults otherwise.
pub fn load_registry() -> Registry {
    if kubespec_enabled() {
        match kubespec_registry() {
            Ok(registry) => return registry,
            Err(e) => {
                tracing::warn!(error = %e, "kubespec load failed, using defaults");
            }
        }
    }
    default_registry()
}
