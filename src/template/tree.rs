//! Tree formatting for nested settings.
//!
//! Walks a JSON object depth first and yields one line per node, either as
//! YAML or as an HTML form of text inputs named by their dotted path. The
//! walk is lazy so the lines can be spliced straight into a
//! [`LazyTemplate`](super::LazyTemplate). [`parse_form`] reverses the HTML
//! form encoding back into a tree.

use std::collections::VecDeque;

use serde_json::{Map, Value};

use crate::http::query;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    Yaml,
    HtmlForm,
}

/// Lazy line producer over a JSON tree.
pub struct TreeLines {
    style: Style,
    indent_step: usize,
    stack: Vec<serde_json::map::IntoIter>,
    path: Vec<String>,
    pending: VecDeque<String>,
}

impl TreeLines {
    /// Render `tree` as YAML, indenting nested maps by `indent_step`.
    pub fn yaml(tree: Value, indent_step: usize) -> Self {
        Self::new(tree, Style::Yaml, indent_step)
    }

    /// Render `tree` as nested `<ul>` lists of labelled text inputs.
    pub fn html_form(tree: Value, indent_step: usize) -> Self {
        Self::new(tree, Style::HtmlForm, indent_step)
    }

    fn new(tree: Value, style: Style, indent_step: usize) -> Self {
        let mut lines = Self {
            style,
            indent_step,
            stack: Vec::new(),
            path: Vec::new(),
            pending: VecDeque::new(),
        };
        match tree {
            Value::Object(map) => lines.stack.push(map.into_iter()),
            leaf => lines.pending.push_back(format!("{}\n", scalar(&leaf))),
        }
        lines
    }

    fn pad(&self, width: usize) -> String {
        " ".repeat(width)
    }

    fn open(&mut self, key: &str) {
        let depth = self.path.len();
        match self.style {
            Style::Yaml => {
                let pad = self.pad(self.indent_step * depth);
                self.pending.push_back(format!("{pad}{key}:\n"));
            }
            Style::HtmlForm => {
                let li = self.pad(2 * self.indent_step * depth);
                let ul = self.pad(2 * self.indent_step * depth + self.indent_step);
                self.pending.push_back(format!("{li}<li>{}:\n", escape(key)));
                self.pending.push_back(format!("{ul}<ul>\n"));
            }
        }
    }

    fn close(&mut self) {
        if self.style == Style::HtmlForm {
            let depth = self.path.len();
            let li = self.pad(2 * self.indent_step * depth);
            let ul = self.pad(2 * self.indent_step * depth + self.indent_step);
            self.pending.push_back(format!("{ul}</ul>\n"));
            self.pending.push_back(format!("{li}</li>\n"));
        }
    }

    fn leaf(&mut self, key: &str, value: &Value) {
        let depth = self.path.len();
        match self.style {
            Style::Yaml => {
                let pad = self.pad(self.indent_step * depth);
                self.pending.push_back(format!("{pad}{key}: {}\n", scalar(value)));
            }
            Style::HtmlForm => {
                let pad = self.pad(2 * self.indent_step * depth);
                let name = self
                    .path
                    .iter()
                    .map(String::as_str)
                    .chain(std::iter::once(key))
                    .collect::<Vec<_>>()
                    .join(".");
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                self.pending.push_back(format!(
                    "{pad}<div class=\"slot\"><label>{}:</label><input type=\"text\" name=\"{}\" value=\"{}\"></div>\n",
                    escape(key),
                    escape(&name),
                    escape(&value),
                ));
            }
        }
    }
}

impl Iterator for TreeLines {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            if let Some(line) = self.pending.pop_front() {
                return Some(line);
            }
            let entry = self.stack.last_mut()?.next();
            match entry {
                Some((key, Value::Object(map))) => {
                    self.open(&key);
                    self.path.push(key);
                    self.stack.push(map.into_iter());
                }
                Some((key, leaf)) => self.leaf(&key, &leaf),
                None => {
                    self.stack.pop();
                    if self.path.pop().is_some() {
                        self.close();
                    }
                }
            }
        }
    }
}

/// Decode an urlencoded form with dotted names (`wifi.ssid=home`) into a
/// nested JSON object.
///
/// Values that parse as JSON keep their JSON type; anything else is kept as
/// a string, and a name without `=` becomes `null`.
pub fn parse_form(urlencoded: &str) -> Value {
    let mut root = Map::new();
    for (path, values) in query::parse(urlencoded).iter() {
        let Some(raw) = values.last() else { continue };
        let value = match raw {
            Some(raw) => serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone())),
            None => Value::Null,
        };
        insert_path(&mut root, path, value);
    }
    Value::Object(root)
}

fn insert_path(root: &mut Map<String, Value>, path: &str, value: Value) {
    let mut names: Vec<&str> = path.split('.').collect();
    let Some(last) = names.pop() else { return };
    let mut node = root;
    for name in names {
        let child = node
            .entry(name.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !child.is_object() {
            *child = Value::Object(Map::new());
        }
        let Value::Object(map) = child else { return };
        node = map;
    }
    node.insert(last.to_string(), value);
}

fn scalar(value: &Value) -> String {
    value.to_string()
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings() -> Value {
        json!({
            "name": "board",
            "wifi": { "ssid": "home", "channel": 6 },
        })
    }

    #[test]
    fn yaml_lines_indent_nested_maps() {
        let lines: Vec<_> = TreeLines::yaml(settings(), 2).collect();
        assert_eq!(
            lines,
            ["name: \"board\"\n", "wifi:\n", "  channel: 6\n", "  ssid: \"home\"\n"]
        );
    }

    #[test]
    fn html_form_names_inputs_by_path() {
        let lines: Vec<_> = TreeLines::html_form(json!({ "wifi": { "ssid": "a\"b" } }), 2).collect();
        assert_eq!(
            lines,
            [
                "<li>wifi:\n",
                "  <ul>\n",
                "    <div class=\"slot\"><label>ssid:</label><input type=\"text\" name=\"wifi.ssid\" value=\"a&quot;b\"></div>\n",
                "  </ul>\n",
                "</li>\n",
            ]
        );
    }

    #[test]
    fn scalar_root_is_single_line() {
        let lines: Vec<_> = TreeLines::yaml(json!(5), 2).collect();
        assert_eq!(lines, ["5\n"]);
    }

    #[test]
    fn parse_form_builds_nested_tree() {
        let tree = parse_form("name=board&wifi.ssid=my+home&wifi.channel=6&debug");
        assert_eq!(
            tree,
            json!({
                "name": "board",
                "wifi": { "ssid": "my home", "channel": 6 },
                "debug": null,
            })
        );
    }

    #[test]
    fn parse_form_round_trips_html_form_names() {
        let tree = parse_form("wifi.enabled=true&wifi.retries=3");
        assert_eq!(tree["wifi"]["enabled"], json!(true));
        assert_eq!(tree["wifi"]["retries"], json!(3));
    }
}
