//! `nostos eval [file]`

use super::{App, CliError, CliResult};
use nostos_lang::{parse_document, parse_errors, DocumentUri};
use nostos_types::inspect;
use nostos_vm::eval_with_dir;
use std::io::Read;
use std::path::{Path, PathBuf};

pub fn run(app: &App, file: Option<&Path>) -> CliResult {
    let (source, base_dir, uri) = match file {
        Some(path) => {
            let source = std::fs::read_to_string(path)?;
            let base = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            (source, base, DocumentUri::file(path))
        }
        None => {
            let mut source = String::new();
            std::io::stdin().read_to_string(&mut source)?;
            (
                source,
                app.workspace.dir().to_path_buf(),
                DocumentUri::stdin(),
            )
        }
    };

    let doc = parse_document(&source, &uri);
    let errors = parse_errors(&doc);
    if !errors.is_empty() {
        return Err(CliError::Nostos(errors));
    }
    let value = eval_with_dir(&doc.root, &base_dir, &uri)?;
    print!("{}", inspect::render(&value));
    Ok(())
}
