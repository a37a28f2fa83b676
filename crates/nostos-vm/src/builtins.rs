//! Builtin functions callable from the DSL.

use crate::eval::Vm;
use nostos_lang::{parse_document, DocumentUri, NostosError, Position};
use nostos_types::Value;
use nostos_urispec::UriSpec;
use std::path::PathBuf;
use tracing::debug;

pub(crate) type BuiltinFn = fn(&mut Vm, Value) -> Result<Value, NostosError>;

/// The recognised builtin set.
pub(crate) fn lookup(name: &str) -> Option<BuiltinFn> {
    match name {
        "import" => Some(builtin_import),
        _ => None,
    }
}

/// Evaluate another document and return its value.
///
/// The argument is a path literal or a string. Local paths resolve against
/// the caller's base directory; git specs are cloned into the user cache.
/// Importing a directory reads `<dir>/odyssey.no`. The file is lexed,
/// parsed and evaluated in its own base directory; parse errors propagate.
fn builtin_import(vm: &mut Vm, arg: Value) -> Result<Value, NostosError> {
    let spec = match arg {
        Value::Spec(spec) => spec,
        Value::String(s) => UriSpec::parse(&s),
        _ => {
            return Err(NostosError::eval(
                vm.uri.clone(),
                Position::default(),
                "import expects a path argument",
            ));
        }
    };

    let mut path = spec
        .local_path(&vm.base_dir)
        .map_err(|e| NostosError::io(vm.uri.clone(), e.to_string()))?;
    if path.is_dir() {
        path = path.join("odyssey.no");
    }
    let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());

    if vm.import_stack.contains(&canonical) {
        let mut chain: Vec<String> = vm
            .import_stack
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        chain.push(canonical.display().to_string());
        return Err(NostosError::eval(
            vm.uri.clone(),
            Position::default(),
            format!("import cycle detected: {}", chain.join(" -> ")),
        ));
    }

    debug!(path = %path.display(), "importing");
    let source = std::fs::read_to_string(&path)
        .map_err(|e| NostosError::io(DocumentUri::file(&path), e.to_string()))?;

    let uri = DocumentUri::file(&path);
    let doc = parse_document(&source, &uri);
    if let Some(first) = nostos_lang::collect_parse_errors(&doc.root).first() {
        return Err(NostosError::from(*first));
    }

    let base = path
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let mut child = Vm::new(&base, uri);
    // Share the active-import stack so nested imports see the full chain.
    std::mem::swap(&mut child.import_stack, &mut vm.import_stack);
    child.import_stack.push(canonical);
    let result = child.eval_root(&doc.root);
    child.import_stack.pop();
    std::mem::swap(&mut child.import_stack, &mut vm.import_stack);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval_with_dir;
    use indexmap::IndexMap;
    use std::io::Write;

    fn parse(source: &str) -> nostos_lang::Node {
        parse_document(source, &DocumentUri::stdin()).root
    }

    fn write_file(dir: &std::path::Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, "{content}").unwrap();
        path
    }

    #[test]
    fn import_evaluates_the_target() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "example.no", "1");
        let ast = parse("foo: import(./example.no)");
        let got = eval_with_dir(&ast, dir.path(), &DocumentUri::stdin()).unwrap();
        let mut expected = IndexMap::new();
        expected.insert("foo".to_string(), Value::Number(1.0));
        assert_eq!(got, Value::Map(expected));
    }

    #[test]
    fn import_resolves_directories_to_odyssey() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("pkg");
        std::fs::create_dir(&sub).unwrap();
        write_file(&sub, "odyssey.no", "kind: \"FromDir\"");
        let ast = parse("x: import(./pkg)");
        let got = eval_with_dir(&ast, dir.path(), &DocumentUri::stdin()).unwrap();
        assert_eq!(
            got.get("x").and_then(|v| v.get("kind")),
            Some(&Value::String("FromDir".to_string()))
        );
    }

    #[test]
    fn nested_imports_use_their_own_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        write_file(&sub, "inner.no", "2");
        write_file(&sub, "outer.no", "val: import(./inner.no)");
        let ast = parse("x: import(./sub/outer.no)");
        let got = eval_with_dir(&ast, dir.path(), &DocumentUri::stdin()).unwrap();
        assert_eq!(
            got.get("x").and_then(|v| v.get("val")),
            Some(&Value::Number(2.0))
        );
    }

    #[test]
    fn import_cycles_are_detected() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.no", "x: import(./b.no)");
        write_file(dir.path(), "b.no", "y: import(./a.no)");
        let ast = parse("root: import(./a.no)");
        let err = eval_with_dir(&ast, dir.path(), &DocumentUri::stdin()).unwrap_err();
        assert!(
            err.message.contains("import cycle detected"),
            "unexpected error: {}",
            err.message
        );
    }

    #[test]
    fn self_import_is_a_cycle() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.no", "x: import(./a.no)");
        let ast = parse("root: import(./a.no)");
        let err = eval_with_dir(&ast, dir.path(), &DocumentUri::stdin()).unwrap_err();
        assert!(err.message.contains("import cycle detected"));
    }

    #[test]
    fn import_missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let ast = parse("x: import(./missing.no)");
        let err = eval_with_dir(&ast, dir.path(), &DocumentUri::stdin()).unwrap_err();
        assert!(!err.message.is_empty());
    }

    #[test]
    fn import_propagates_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "broken.no", "key:\t1");
        let ast = parse("x: import(./broken.no)");
        let err = eval_with_dir(&ast, dir.path(), &DocumentUri::stdin()).unwrap_err();
        assert!(err.message.contains("horizontal tabs"));
    }

    #[test]
    fn import_accepts_string_arguments() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "v.no", "3");
        let ast = parse("x: import(\"./v.no\")");
        let got = eval_with_dir(&ast, dir.path(), &DocumentUri::stdin()).unwrap();
        assert_eq!(got.get("x"), Some(&Value::Number(3.0)));
    }

    #[test]
    fn spec_example_let_import_field_access() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "svc.no", "spec:\n  ports:\n  - 80");
        let ast = parse("let svc: import(./svc.no) in svc.spec.ports");
        let got = eval_with_dir(&ast, dir.path(), &DocumentUri::stdin()).unwrap();
        assert_eq!(got, Value::List(vec![Value::Number(80.0)]));
    }
}
