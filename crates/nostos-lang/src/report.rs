//! Human-readable error reports.

use crate::error::NostosError;
use colored::Colorize;
use std::io::Write;
use std::path::Path;

/// Renders one error as text.
pub trait Formatter {
    fn format(&self, err: &NostosError) -> String;
}

/// One-line format for non-TTY output.
pub struct SimpleFormatter;

impl Formatter for SimpleFormatter {
    fn format(&self, err: &NostosError) -> String {
        let path = err
            .uri
            .to_file_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| err.uri.to_string());
        format!(
            "{}:{}:{}: {}\n",
            path, err.position.line, err.position.character, err.message
        )
    }
}

/// Colored format with source context and a caret underline.
pub struct PrettyFormatter;

impl Formatter for PrettyFormatter {
    fn format(&self, err: &NostosError) -> String {
        let path = err.uri.to_file_path();
        let shown = path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| err.uri.to_string());

        let mut out = String::new();
        let header = format!("{}:{}:{}", shown, err.position.line, err.position.character);
        out.push_str(&format!("{}\n", header.bold()));
        out.push_str(&format!("{}\n", err.message.red()));

        if let Some(lines) = path.as_deref().and_then(read_lines) {
            render_context(&mut out, &lines, err);
        }
        out
    }
}

/// Append up to three context lines centred on the error with the caret
/// underline.
fn render_context(out: &mut String, lines: &[String], err: &NostosError) {
    let error_line = err.position.line as usize;
    if error_line >= lines.len() {
        return;
    }
    let start = error_line.saturating_sub(1);
    let end = (error_line + 1).min(lines.len() - 1);
    let num_width = format!("{}", end + 1).len();
    for i in start..=end {
        out.push_str(&format!("{:>num_width$} | {}\n", i + 1, lines[i]));
        if i == error_line {
            let pad = " ".repeat(num_width + 3 + err.position.character as usize);
            let carets = "^".repeat((err.position.length.max(1)) as usize);
            out.push_str(&format!("{pad}{}\n", carets.red()));
        }
    }
}

fn read_lines(path: &Path) -> Option<Vec<String>> {
    let text = std::fs::read_to_string(path).ok()?;
    Some(text.lines().map(str::to_string).collect())
}

/// Prints formatted errors, with a trailing summary when more than one.
pub struct Reporter {
    formatter: Box<dyn Formatter>,
}

impl Reporter {
    pub fn new(formatter: Box<dyn Formatter>) -> Reporter {
        Reporter { formatter }
    }

    pub fn pretty() -> Reporter {
        Reporter::new(Box::new(PrettyFormatter))
    }

    pub fn simple() -> Reporter {
        Reporter::new(Box::new(SimpleFormatter))
    }

    pub fn report(&self, errors: &[NostosError], out: &mut dyn Write) -> std::io::Result<()> {
        for err in errors {
            out.write_all(self.formatter.format(err).as_bytes())?;
        }
        if errors.len() > 1 {
            writeln!(out, "\n{} errors", errors.len())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::{DocumentUri, Position};
    use std::io::Write as _;

    fn sample_error(uri: DocumentUri) -> NostosError {
        NostosError::lex(uri, Position::new(5, 3, 1, 5), "bad number syntax")
    }

    #[test]
    fn simple_format_is_one_line() {
        let err = sample_error(DocumentUri::parse("stdin"));
        let got = SimpleFormatter.format(&err);
        assert_eq!(got, "stdin:1:5: bad number syntax\n");
    }

    #[test]
    fn pretty_format_underlines_the_token() {
        colored::control::set_override(false);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "ok: 1\nbad: 12x\nmore: 2\n").unwrap();
        let uri = DocumentUri::file(file.path());
        let err = NostosError::lex(uri, Position::new(11, 3, 1, 5), "bad number syntax");

        let got = PrettyFormatter.format(&err);
        assert!(got.contains("bad number syntax"));
        assert!(got.contains("1 | ok: 1"));
        assert!(got.contains("2 | bad: 12x"));
        assert!(got.contains("3 | more: 2"));
        // Caret length matches the token byte length.
        assert!(got.contains("^^^"), "missing caret underline: {got}");
    }

    #[test]
    fn reporter_appends_summary_for_multiple_errors() {
        let errs = vec![
            sample_error(DocumentUri::parse("stdin")),
            sample_error(DocumentUri::parse("stdin")),
        ];
        let mut out = Vec::new();
        Reporter::simple().report(&errs, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with("2 errors\n"));
    }

    #[test]
    fn reporter_no_summary_for_single_error() {
        let errs = vec![sample_error(DocumentUri::parse("stdin"))];
        let mut out = Vec::new();
        Reporter::simple().report(&errs, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(!text.contains("errors"));
    }
}
