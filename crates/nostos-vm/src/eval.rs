//! The evaluator proper.

use crate::builtins;
use indexmap::IndexMap;
use nostos_lang::{DocumentUri, MapNode, Node, NostosError};
use nostos_types::Value;
use std::path::{Path, PathBuf};

/// Evaluator state for one document.
pub struct Vm {
    stack: Vec<Value>,
    /// Directory relative imports resolve against.
    pub(crate) base_dir: PathBuf,
    pub(crate) uri: DocumentUri,
    /// Scope chain; lookups walk from the innermost scope outwards.
    scopes: Vec<IndexMap<String, Value>>,
    /// Evaluation frames for error reports.
    pub(crate) frames: Vec<String>,
    /// Canonical paths of imports currently being evaluated, outermost
    /// first. Shared down into child VMs for cycle detection.
    pub(crate) import_stack: Vec<PathBuf>,
}

/// Evaluate a node against the current directory.
pub fn eval(node: &Node) -> Result<Value, NostosError> {
    eval_with_dir(node, Path::new("."), &DocumentUri::default())
}

/// Evaluate a node with an explicit base directory and document identity.
pub fn eval_with_dir(node: &Node, dir: &Path, uri: &DocumentUri) -> Result<Value, NostosError> {
    let mut vm = Vm::new(dir, uri.clone());
    vm.eval_node(node)?;
    Ok(vm.pop())
}

impl Vm {
    pub(crate) fn new(dir: &Path, uri: DocumentUri) -> Vm {
        Vm {
            stack: Vec::new(),
            base_dir: dir.to_path_buf(),
            uri,
            scopes: Vec::new(),
            frames: Vec::new(),
            import_stack: Vec::new(),
        }
    }

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> Value {
        self.stack.pop().unwrap_or(Value::Null)
    }

    /// Evaluate a root node and take its value off the stack.
    pub(crate) fn eval_root(&mut self, node: &Node) -> Result<Value, NostosError> {
        self.eval_node(node)?;
        Ok(self.pop())
    }

    fn lookup(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Wrap a message with the node's position, the VM's document and the
    /// captured frame stack.
    pub(crate) fn error(&self, node: &Node, message: impl Into<String>) -> NostosError {
        NostosError::eval(self.uri.clone(), node.position(), message)
            .with_stack(self.frames.clone())
    }

    pub(crate) fn eval_node(&mut self, node: &Node) -> Result<(), NostosError> {
        match node {
            Node::Str { text, .. } => self.push(Value::String(text.clone())),
            Node::Number { value, .. } => self.push(Value::Number(*value)),
            Node::Path { spec, .. } => self.push(Value::Spec(spec.clone())),
            Node::Symbol { text, .. } => {
                let value = self.resolve_symbol(node, text)?;
                self.push(value);
            }
            Node::List { items, .. } => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    self.eval_node(item)?;
                    values.push(self.pop());
                }
                self.push(Value::List(values));
            }
            Node::Map(map) => {
                let value = self.eval_map(map)?;
                self.push(value);
            }
            Node::Function { .. } => {
                return Err(self.error(node, "functions not supported in evaluation"));
            }
            Node::Call { callee, arg } => {
                self.eval_node(callee)?;
                let target = self.pop();
                let Value::String(name) = target else {
                    return Err(self.error(node, "function name must be a symbol"));
                };
                let Some(builtin) = builtins::lookup(&name) else {
                    return Err(self.error(node, format!("unknown builtin {name}")));
                };
                self.eval_node(arg)?;
                let argument = self.pop();
                self.frames.push(format!("{name}(…)"));
                let result = builtin(self, argument).map_err(|e| {
                    if e.position == nostos_lang::Position::default() && e.stack.is_empty() {
                        self.error(node, e.message)
                    } else {
                        e
                    }
                });
                self.frames.pop();
                self.push(result?);
            }
            Node::Shovel { .. } => {
                return Err(self.error(node, "shovel operator not supported in evaluation"));
            }
            Node::Let {
                bindings, body, ..
            } => {
                // Bindings evaluate under the caller's environment, then
                // shadow it for the body.
                let mut scope = IndexMap::new();
                let mut entries: Vec<_> = bindings.entries.iter().collect();
                entries.sort_by_key(|(_, e)| e.key_position.offset);
                for (name, entry) in entries {
                    self.eval_node(&entry.value)?;
                    scope.insert(name.clone(), self.pop());
                }
                self.scopes.push(scope);
                let result = self.eval_node(body);
                self.scopes.pop();
                result?;
            }
            Node::ParseError(e) => return Err(NostosError::from(e)),
        }
        Ok(())
    }

    fn eval_map(&mut self, map: &MapNode) -> Result<Value, NostosError> {
        // Key order follows source byte offsets so evaluation is
        // deterministic across runs.
        let mut entries: Vec<_> = map.entries.iter().collect();
        entries.sort_by_key(|(_, e)| e.key_position.offset);
        let mut out = IndexMap::with_capacity(entries.len());
        for (key, entry) in entries {
            self.eval_node(&entry.value)?;
            out.insert(key.clone(), self.pop());
        }
        Ok(Value::Map(out))
    }

    fn resolve_symbol(&mut self, node: &Node, text: &str) -> Result<Value, NostosError> {
        if let Some(value) = self.lookup(text) {
            return Ok(value.clone());
        }
        if text.contains('.') {
            let mut parts = text.split('.');
            let head = parts.next().unwrap_or_default();
            if let Some(root) = self.lookup(head) {
                let mut current = root.clone();
                for part in parts {
                    let Value::Map(m) = &current else {
                        return Err(self.error(node, "dot operator requires map"));
                    };
                    let Some(next) = m.get(part) else {
                        return Err(self.error(node, format!("unknown field {part}")));
                    };
                    current = next.clone();
                }
                return Ok(current);
            }
        }
        // Unbound plain symbols read as bare string literals; the YAML-like
        // surface of the DSL depends on this.
        Ok(Value::String(text.to_string()))
    }
}
