//! Desired-state loading from the workspace entry file.
//!
//! `odyssey.no` evaluates to a mapping from cluster-context name to a
//! mapping from namespace name to a list of entries; each entry is either a
//! path to a DSL file or an inline resource mapping. A named namespace
//! implies a `Namespace` resource.

use crate::resource::{filter_cluster_scoped, filter_system_namespace, Resource};
use indexmap::IndexMap;
use nostos_lang::{collect_parse_errors, parse_document, DocumentUri, NostosError, Position};
use nostos_types::{Registry, Value};
use nostos_vm::eval_with_dir;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Explicit workspace context, passed into every component that needs the
/// project root.
#[derive(Debug, Clone)]
pub struct Workspace {
    dir: PathBuf,
}

impl Workspace {
    pub fn new(dir: impl Into<PathBuf>) -> Workspace {
        Workspace { dir: dir.into() }
    }

    /// Workspace rooted at the current directory.
    pub fn current() -> Workspace {
        Workspace {
            dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The workspace entry file.
    pub fn entry_file(&self) -> PathBuf {
        self.dir.join("odyssey.no")
    }
}

/// Resource filtering toggles.
#[derive(Debug, Clone, Copy)]
pub struct PlanOptions {
    pub ignore_system_namespace: bool,
    pub ignore_cluster_scoped: bool,
}

impl Default for PlanOptions {
    fn default() -> PlanOptions {
        PlanOptions {
            ignore_system_namespace: true,
            ignore_cluster_scoped: true,
        }
    }
}

/// Evaluate the workspace entry file and collect the desired resources for
/// one cluster context.
///
/// An unknown context yields an empty set.
pub fn build_desired(
    workspace: &Workspace,
    context: &str,
    options: &PlanOptions,
    registry: &Registry,
) -> Result<Vec<Resource>, NostosError> {
    let entry = workspace.entry_file();
    let value = eval_file(&entry)?;
    let uri = DocumentUri::file(&entry);

    let Some(contexts) = value.as_map() else {
        return Err(NostosError::eval(
            uri,
            Position::default(),
            "odyssey file must evaluate to a mapping of cluster contexts",
        ));
    };
    let Some(entry_value) = contexts.get(context) else {
        debug!(context, "context not present in odyssey file");
        return Ok(Vec::new());
    };
    let Some(namespaces) = entry_value.as_map() else {
        return Err(NostosError::eval(
            uri,
            Position::default(),
            format!("odyssey context {context:?} must map namespaces to resource lists"),
        ));
    };

    let mut resources = Vec::new();
    for (namespace, items) in namespaces {
        if !namespace.is_empty() {
            resources.push(namespace_resource(namespace));
        }
        let Some(items) = items.as_list() else {
            return Err(NostosError::eval(
                uri.clone(),
                Position::default(),
                format!("namespace {namespace:?} must hold a list of resources"),
            ));
        };
        for item in items {
            match item {
                Value::String(path) => {
                    let loaded = load_resource_file(workspace, Path::new(path))?;
                    resources.extend(defaulted(loaded, namespace));
                }
                Value::Spec(spec) => {
                    let path = spec
                        .local_path(workspace.dir())
                        .map_err(|e| NostosError::io(uri.clone(), e.to_string()))?;
                    let loaded = load_resource_file(workspace, &path)?;
                    resources.extend(defaulted(loaded, namespace));
                }
                Value::Map(_) => {
                    let Some(resource) = Resource::from_value(item) else {
                        return Err(NostosError::eval(
                            uri.clone(),
                            Position::default(),
                            "inline resource must carry apiVersion and kind",
                        ));
                    };
                    resources.extend(defaulted(vec![resource], namespace));
                }
                other => {
                    return Err(NostosError::eval(
                        uri.clone(),
                        Position::default(),
                        format!("unsupported odyssey entry: {other:?}"),
                    ));
                }
            }
        }
    }

    if options.ignore_system_namespace {
        resources = filter_system_namespace(resources);
    }
    if options.ignore_cluster_scoped {
        resources = filter_cluster_scoped(resources, registry);
    }
    Ok(resources)
}

/// Lex, parse and evaluate one DSL file.
pub fn eval_file(path: &Path) -> Result<Value, NostosError> {
    let uri = DocumentUri::file(path);
    let source = std::fs::read_to_string(path)
        .map_err(|e| NostosError::io(uri.clone(), format!("failed to read {}: {e}", path.display())))?;
    let doc = parse_document(&source, &uri);
    if let Some(first) = collect_parse_errors(&doc.root).first() {
        return Err(NostosError::from(*first));
    }
    let base = path.parent().unwrap_or(Path::new("."));
    eval_with_dir(&doc.root, base, &uri)
}

/// Load one DSL file and interpret its value as a resource or a list of
/// resources.
fn load_resource_file(workspace: &Workspace, path: &Path) -> Result<Vec<Resource>, NostosError> {
    let mut full = if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace.dir().join(path)
    };
    if full.is_dir() {
        full = full.join("odyssey.no");
    }
    let uri = DocumentUri::file(&full);
    let value = eval_file(&full)?;
    match &value {
        Value::Map(_) => {
            let resource = Resource::from_value(&value).ok_or_else(|| {
                NostosError::eval(
                    uri,
                    Position::default(),
                    "value is not a resource: missing apiVersion or kind",
                )
            })?;
            Ok(vec![resource])
        }
        Value::List(items) => items
            .iter()
            .map(|item| {
                Resource::from_value(item).ok_or_else(|| {
                    NostosError::eval(
                        uri.clone(),
                        Position::default(),
                        "list entry is not a resource: missing apiVersion or kind",
                    )
                })
            })
            .collect(),
        _ => Err(NostosError::eval(
            uri,
            Position::default(),
            "value is not a resource: expected a mapping",
        )),
    }
}

/// Default the namespace on namespaced entries.
fn defaulted(resources: Vec<Resource>, namespace: &str) -> Vec<Resource> {
    if namespace.is_empty() {
        return resources;
    }
    resources
        .into_iter()
        .map(|mut r| {
            r.metadata
                .entry("namespace".to_string())
                .or_insert_with(|| Value::String(namespace.to_string()));
            r
        })
        .collect()
}

fn namespace_resource(name: &str) -> Resource {
    let mut metadata = IndexMap::new();
    metadata.insert("name".to_string(), Value::String(name.to_string()));
    Resource {
        api_version: "v1".to_string(),
        kind: "Namespace".to_string(),
        metadata,
        spec: IndexMap::new(),
        dependencies: Vec::new(),
    }
}
