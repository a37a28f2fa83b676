//! Source locations and document identity.

use std::path::{Path, PathBuf};

/// Location of one token in a document.
///
/// Byte offset and length index into the source text; line and character
/// follow the LSP convention (0-indexed line counting line feeds, character
/// offset within the line). Ordering is lexicographic by (line, character).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    /// Byte offset into the document.
    pub offset: u32,
    /// Byte length of the token.
    pub length: u32,
    /// 0-indexed line number.
    pub line: u32,
    /// Character offset within the line.
    pub character: u32,
}

impl Position {
    pub fn new(offset: u32, length: u32, line: u32, character: u32) -> Position {
        Position {
            offset,
            length,
            line,
            character,
        }
    }

    /// The position one past the end of this token, on the same line.
    pub fn end(&self, chars: u32) -> Position {
        Position {
            offset: self.offset + self.length,
            length: 0,
            line: self.line,
            character: self.character + chars,
        }
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Position) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Position) -> std::cmp::Ordering {
        (self.line, self.character, self.offset, self.length).cmp(&(
            other.line,
            other.character,
            other.offset,
            other.length,
        ))
    }
}

/// Identity of a source document.
///
/// Distinct from a filesystem path: documents may come from stdin, unsaved
/// editor buffers or git checkouts. Conversions to and from filesystem paths
/// happen explicitly at the boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct DocumentUri(String);

impl DocumentUri {
    pub fn parse(s: &str) -> DocumentUri {
        DocumentUri(s.to_string())
    }

    /// URI for a file on disk.
    pub fn file(path: &Path) -> DocumentUri {
        DocumentUri(format!("file://{}", path.display()))
    }

    /// URI for the standard input pseudo-document.
    pub fn stdin() -> DocumentUri {
        DocumentUri("stdin".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The filesystem path behind a `file://` URI.
    pub fn to_file_path(&self) -> Option<PathBuf> {
        self.0.strip_prefix("file://").map(PathBuf::from)
    }
}

impl std::fmt::Display for DocumentUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_by_line_then_character() {
        let a = Position::new(50, 1, 0, 50);
        let b = Position::new(10, 1, 1, 0);
        let c = Position::new(60, 1, 1, 4);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn file_uri_round_trip() {
        let uri = DocumentUri::file(Path::new("/work/odyssey.no"));
        assert_eq!(uri.as_str(), "file:///work/odyssey.no");
        assert_eq!(uri.to_file_path(), Some(PathBuf::from("/work/odyssey.no")));
        assert_eq!(DocumentUri::stdin().to_file_path(), None);
    }
}
