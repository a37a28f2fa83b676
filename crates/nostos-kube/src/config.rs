//! Kubeconfig loading and context selection.

use anyhow::{Context as _, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::path::{Path, PathBuf};

/// Connection options from the CLI surface.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Explicit kubeconfig path; the default chain applies when absent.
    pub kubeconfig: Option<PathBuf>,
    /// Context override; the kubeconfig's current context applies when
    /// absent.
    pub context: Option<String>,
}

fn read_kubeconfig(path: Option<&Path>) -> Result<Kubeconfig> {
    match path {
        Some(p) => {
            Kubeconfig::read_from(p).with_context(|| format!("reading kubeconfig {}", p.display()))
        }
        None => Kubeconfig::read().context("reading default kubeconfig"),
    }
}

/// The context name plans run against.
pub fn current_context(options: &ClientOptions) -> Result<String> {
    if let Some(ctx) = &options.context {
        return Ok(ctx.clone());
    }
    let kubeconfig = read_kubeconfig(options.kubeconfig.as_deref())?;
    kubeconfig
        .current_context
        .context("kubeconfig has no current context")
}

/// Build an API client for the selected context.
pub async fn load_client(options: &ClientOptions) -> Result<Client> {
    let kubeconfig = read_kubeconfig(options.kubeconfig.as_deref())?;
    let config_options = KubeConfigOptions {
        context: options.context.clone(),
        ..KubeConfigOptions::default()
    };
    let config = Config::from_custom_kubeconfig(kubeconfig, &config_options)
        .await
        .context("building client config")?;
    Client::try_from(config).context("creating Kubernetes client")
}
