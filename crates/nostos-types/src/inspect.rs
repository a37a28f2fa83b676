//! YAML-like rendering of values.
//!
//! Used by `nostos eval` output and by the diff renderer. Map keys are
//! sorted so the output is canonical regardless of evaluation order.

use crate::Value;

/// Render a value as indented YAML-like text.
pub fn render(value: &Value) -> String {
    let mut out = String::new();
    render_value(value, 0, &mut out);
    out
}

fn render_value(value: &Value, indent: usize, out: &mut String) {
    let pad = "  ".repeat(indent);
    match value {
        Value::Map(m) => {
            if m.is_empty() {
                out.push_str(&pad);
                out.push_str("{}\n");
                return;
            }
            let mut keys: Vec<&String> = m.keys().collect();
            keys.sort();
            for key in keys {
                let child = &m[key.as_str()];
                out.push_str(&pad);
                out.push_str(key);
                out.push_str(": ");
                match child {
                    Value::Map(_) | Value::List(_) => {
                        out.push('\n');
                        render_value(child, indent + 1, out);
                    }
                    _ => {
                        out.push_str(&scalar(child));
                        out.push('\n');
                    }
                }
            }
        }
        Value::List(items) => {
            if items.is_empty() {
                out.push_str(&pad);
                out.push_str("[]\n");
                return;
            }
            for item in items {
                out.push_str(&pad);
                out.push_str("- ");
                match item {
                    Value::Map(_) | Value::List(_) => {
                        out.push('\n');
                        render_value(item, indent + 1, out);
                    }
                    _ => {
                        out.push_str(&scalar(item));
                        out.push('\n');
                    }
                }
            }
        }
        _ => {
            out.push_str(&pad);
            out.push_str(&scalar(value));
            out.push('\n');
        }
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_number(*n),
        Value::String(s) => format!("{s:?}"),
        Value::Spec(spec) => format!("{:?}", spec.raw),
        Value::Map(_) | Value::List(_) => unreachable!("containers handled by caller"),
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[test]
    fn renders_nested_map() {
        let mut inner = IndexMap::new();
        inner.insert("port".to_string(), Value::Number(80.0));
        let mut outer = IndexMap::new();
        outer.insert("spec".to_string(), Value::Map(inner));
        outer.insert("kind".to_string(), Value::String("Service".to_string()));
        let got = render(&Value::Map(outer));
        assert_eq!(got, "kind: \"Service\"\nspec: \n  port: 80\n");
    }

    #[test]
    fn renders_list_of_scalars() {
        let got = render(&Value::List(vec![
            Value::Number(1.0),
            Value::Number(2.5),
            Value::Null,
        ]));
        assert_eq!(got, "- 1\n- 2.5\n- null\n");
    }

    #[test]
    fn keys_are_sorted() {
        let mut m = IndexMap::new();
        m.insert("b".to_string(), Value::Number(2.0));
        m.insert("a".to_string(), Value::Number(1.0));
        assert_eq!(render(&Value::Map(m)), "a: 1\nb: 2\n");
    }

    #[test]
    fn empty_containers() {
        assert_eq!(render(&Value::Map(IndexMap::new())), "{}\n");
        assert_eq!(render(&Value::List(vec![])), "[]\n");
    }
}
