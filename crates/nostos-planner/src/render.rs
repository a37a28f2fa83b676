//! Textual rendering of resources and diffs for human display.

use crate::diff::ResourceUpdate;
use crate::resource::Resource;
use nostos_types::{inspect, Value};

/// Lines of context around each change in a unified diff.
const DIFF_CONTEXT: usize = 3;

/// Canonical YAML-like text for a resource: apiVersion, kind, metadata,
/// spec, in that order.
pub fn canonical_yaml(resource: &Resource) -> String {
    let mut out = String::new();
    out.push_str(&format!("apiVersion: {}\n", resource.api_version));
    out.push_str(&format!("kind: {}\n", resource.kind));
    out.push_str("metadata:\n");
    out.push_str(&indented(&Value::Map(resource.metadata.clone())));
    out.push_str("spec:\n");
    out.push_str(&indented(&Value::Map(resource.spec.clone())));
    out
}

fn indented(value: &Value) -> String {
    inspect::render(value)
        .lines()
        .map(|line| format!("  {line}\n"))
        .collect()
}

/// Unified diff between the current and desired rendering of a resource.
pub fn render_resource_diff(update: &ResourceUpdate) -> String {
    unified_diff(
        &canonical_yaml(&update.current),
        &canonical_yaml(&update.desired),
    )
}

/// Plain unified diff with a fixed amount of context.
pub fn unified_diff(old: &str, new: &str) -> String {
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();
    let ops = diff_ops(&old_lines, &new_lines);

    let mut out = String::new();
    let mut i = 0;
    while i < ops.len() {
        // Skip runs of equal lines, keeping context boundaries.
        if matches!(ops[i], Op::Equal(_, _)) {
            i += 1;
            continue;
        }
        // Start of a hunk: back up for leading context.
        let start = i.saturating_sub(DIFF_CONTEXT);
        let mut end = i;
        let mut gap = 0;
        while end < ops.len() {
            match ops[end] {
                Op::Equal(_, _) => {
                    gap += 1;
                    if gap > DIFF_CONTEXT * 2 {
                        break;
                    }
                }
                _ => gap = 0,
            }
            end += 1;
        }
        // Trim trailing context down to the fixed amount.
        let mut hunk_end = end;
        while hunk_end > i
            && matches!(ops[hunk_end - 1], Op::Equal(_, _))
            && hunk_end - last_change(&ops, i, hunk_end) > DIFF_CONTEXT
        {
            hunk_end -= 1;
        }

        out.push_str(&hunk_header(&ops[start..hunk_end]));
        for op in &ops[start..hunk_end] {
            match op {
                Op::Equal(a, _) => out.push_str(&format!(" {}\n", old_lines[*a])),
                Op::Delete(a) => out.push_str(&format!("-{}\n", old_lines[*a])),
                Op::Insert(b) => out.push_str(&format!("+{}\n", new_lines[*b])),
            }
        }
        i = end;
    }
    out
}

/// Index one past the last non-equal op in `ops[from..to]`.
fn last_change(ops: &[Op], from: usize, to: usize) -> usize {
    (from..to)
        .rev()
        .find(|&k| !matches!(ops[k], Op::Equal(_, _)))
        .map(|k| k + 1)
        .unwrap_or(from)
}

fn hunk_header(ops: &[Op]) -> String {
    let mut old_start = None;
    let mut new_start = None;
    let mut old_count = 0;
    let mut new_count = 0;
    for op in ops {
        match op {
            Op::Equal(a, b) => {
                old_start.get_or_insert(*a);
                new_start.get_or_insert(*b);
                old_count += 1;
                new_count += 1;
            }
            Op::Delete(a) => {
                old_start.get_or_insert(*a);
                old_count += 1;
            }
            Op::Insert(b) => {
                new_start.get_or_insert(*b);
                new_count += 1;
            }
        }
    }
    format!(
        "@@ -{},{} +{},{} @@\n",
        old_start.unwrap_or(0) + 1,
        old_count,
        new_start.unwrap_or(0) + 1,
        new_count
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    /// (old index, new index)
    Equal(usize, usize),
    Delete(usize),
    Insert(usize),
}

/// Longest-common-subsequence line diff.
fn diff_ops(old: &[&str], new: &[&str]) -> Vec<Op> {
    let n = old.len();
    let m = new.len();
    // lcs[i][j] = LCS length of old[i..] and new[j..]
    let mut lcs = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if old[i] == new[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }
    let mut ops = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if old[i] == new[j] {
            ops.push(Op::Equal(i, j));
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            ops.push(Op::Delete(i));
            i += 1;
        } else {
            ops.push(Op::Insert(j));
            j += 1;
        }
    }
    while i < n {
        ops.push(Op::Delete(i));
        i += 1;
    }
    while j < m {
        ops.push(Op::Insert(j));
        j += 1;
    }
    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn service(name: &str, port: f64) -> Resource {
        let mut r = Resource {
            api_version: "v1".to_string(),
            kind: "Service".to_string(),
            ..Resource::default()
        };
        r.metadata
            .insert("name".to_string(), Value::String(name.to_string()));
        r.spec.insert("port".to_string(), Value::Number(port));
        r
    }

    #[test]
    fn canonical_yaml_section_order() {
        let text = canonical_yaml(&service("redis", 6379.0));
        let api = text.find("apiVersion:").unwrap();
        let kind = text.find("kind:").unwrap();
        let metadata = text.find("metadata:").unwrap();
        let spec = text.find("spec:").unwrap();
        assert!(api < kind && kind < metadata && metadata < spec);
        assert!(text.contains("  name: \"redis\""));
        assert!(text.contains("  port: 6379"));
    }

    #[test]
    fn unified_diff_marks_changes() {
        let old = "a\nb\nc\nd\ne\nf\ng\n";
        let new = "a\nb\nc\nD\ne\nf\ng\n";
        let diff = unified_diff(old, new);
        assert!(diff.contains("-d\n"));
        assert!(diff.contains("+D\n"));
        // Three lines of context on each side.
        assert!(diff.contains(" a\n"));
        assert!(diff.contains(" g\n"));
        assert!(diff.starts_with("@@"));
    }

    #[test]
    fn unchanged_text_renders_no_hunks() {
        assert_eq!(unified_diff("a\nb\n", "a\nb\n"), "");
    }

    #[test]
    fn resource_diff_shows_spec_change() {
        let update = ResourceUpdate {
            current: service("redis", 6379.0),
            desired: service("redis", 6380.0),
        };
        let diff = render_resource_diff(&update);
        assert!(diff.contains("-  port: 6379"));
        assert!(diff.contains("+  port: 6380"));
    }

    #[test]
    fn empty_sections_render() {
        let r = Resource {
            api_version: "v1".to_string(),
            kind: "Thing".to_string(),
            metadata: IndexMap::new(),
            spec: IndexMap::new(),
            dependencies: Vec::new(),
        };
        let text = canonical_yaml(&r);
        assert!(text.contains("metadata:\n  {}\n"));
    }
}
