//! Line-streaming template with nested splicing.
//!
//! # Responsibilities
//! - Pull one source line at a time and rewrite its tags
//! - Splice nested producers (other lazy templates, rendered eager
//!   templates, arbitrary line iterators) inline
//! - Carry the current line's indentation onto every spliced line after
//!   the first
//!
//! # Design Decisions
//! - One explicit state machine per template; nesting happens through the
//!   owned producer's own `next`, never through recursion in this type
//! - Producers are owned by value, so a template cannot contain itself
//! - Single pass: once exhausted, closed or failed the template yields
//!   `None` forever and never reopens its source
//! - Unknown tags are erased (the eager template keeps them literal)

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::Path;

use super::scanner::scan;
use super::TemplateError;

/// A boxed producer of text lines.
pub type LineStream = Box<dyn Iterator<Item = Result<String, TemplateError>>>;

/// The value registered for a tag.
pub enum Replacement {
    /// Substituted in place.
    Text(String),
    /// Spliced line by line. Consumed by the first tag that uses it.
    Lines(LineStream),
}

impl Replacement {
    pub fn text(value: impl ToString) -> Self {
        Replacement::Text(value.to_string())
    }

    /// Wrap an infallible line iterator.
    pub fn lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        I::IntoIter: 'static,
        S: Into<String>,
    {
        Replacement::Lines(Box::new(lines.into_iter().map(|line| Ok(line.into()))))
    }

    /// Wrap a fallible line iterator.
    pub fn try_lines<I>(lines: I) -> Self
    where
        I: IntoIterator<Item = Result<String, TemplateError>>,
        I::IntoIter: 'static,
    {
        Replacement::Lines(Box::new(lines.into_iter()))
    }
}

impl From<String> for Replacement {
    fn from(value: String) -> Self {
        Replacement::Text(value)
    }
}

impl From<&str> for Replacement {
    fn from(value: &str) -> Self {
        Replacement::Text(value.to_string())
    }
}

impl From<LazyTemplate> for Replacement {
    fn from(template: LazyTemplate) -> Self {
        Replacement::Lines(Box::new(template))
    }
}

impl fmt::Debug for Replacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Replacement::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Replacement::Lines(_) => f.write_str("Lines(..)"),
        }
    }
}

enum State {
    /// Next step reads a source line.
    Idle,
    /// Rewriting `line` from byte offset `at`.
    Scanning { line: String, at: usize },
    /// Draining a spliced producer. `pending` holds the pre-tag text until
    /// the first produced line claims it; `rest` resumes afterwards.
    Splicing {
        tag: String,
        producer: LineStream,
        pending: Option<String>,
        rest: String,
    },
    Done,
}

/// A lazily evaluated template over a line source.
pub struct LazyTemplate {
    source: Option<Box<dyn BufRead>>,
    replacements: HashMap<String, Replacement>,
    endline: String,
    rstrip_lines: bool,
    line_num: usize,
    indent: String,
    state: State,
}

impl LazyTemplate {
    pub fn from_reader(reader: impl BufRead + 'static) -> Self {
        Self {
            source: Some(Box::new(reader)),
            replacements: HashMap::new(),
            endline: "\n".to_string(),
            rstrip_lines: true,
            line_num: 0,
            indent: String::new(),
            state: State::Idle,
        }
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self::from_reader(Cursor::new(text.into()))
    }

    /// Open `path`; the file is read one line per produced line.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let file = File::open(path)?;
        Ok(Self::from_reader(BufReader::new(file)))
    }

    /// Terminator appended to each rewritten line when stripping.
    pub fn with_endline(mut self, endline: impl Into<String>) -> Self {
        self.endline = endline.into();
        self
    }

    /// When disabled, lines are yielded exactly as rewritten.
    pub fn with_rstrip_lines(mut self, rstrip: bool) -> Self {
        self.rstrip_lines = rstrip;
        self
    }

    /// Replace the whole replacement mapping.
    pub fn format<I, K>(&mut self, replacements: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, Replacement)>,
        K: Into<String>,
    {
        self.replacements = replacements
            .into_iter()
            .map(|(k, v)| (k.into(), v))
            .collect();
        self
    }

    /// Register a single replacement.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Replacement>) -> &mut Self {
        self.replacements.insert(name.into(), value.into());
        self
    }

    /// Number of source lines consumed so far.
    pub fn line_number(&self) -> usize {
        self.line_num
    }

    pub fn is_closed(&self) -> bool {
        self.source.is_none()
    }

    /// Release the source and any active nested producer. Idempotent.
    pub fn close(&mut self) {
        if self.source.take().is_some() {
            tracing::trace!(lines = self.line_num, "Template source closed");
        }
        self.state = State::Done;
    }

    /// Drain the remaining lines into one string, then close.
    pub fn render(&mut self) -> Result<String, TemplateError> {
        let mut out = String::new();
        for line in self.by_ref() {
            out.push_str(&line?);
        }
        self.close();
        Ok(out)
    }

    fn read_line(&mut self) -> Result<Option<String>, TemplateError> {
        let Some(source) = self.source.as_mut() else {
            return Ok(None);
        };
        let mut line = String::new();
        if source.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }

    fn finish_line(&self, line: String) -> String {
        if self.rstrip_lines {
            let mut out = line.trim_end().to_string();
            out.push_str(&self.endline);
            out
        } else {
            line
        }
    }

    fn fail(&mut self, err: TemplateError) -> Option<Result<String, TemplateError>> {
        tracing::debug!(line = self.line_num, error = %err, "Template failed");
        self.close();
        Some(Err(err))
    }
}

impl Iterator for LazyTemplate {
    type Item = Result<String, TemplateError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match std::mem::replace(&mut self.state, State::Idle) {
                State::Done => {
                    self.state = State::Done;
                    return None;
                }
                State::Idle => match self.read_line() {
                    Ok(Some(line)) => {
                        self.line_num += 1;
                        self.indent = leading_whitespace(&line).to_string();
                        self.state = State::Scanning { line, at: 0 };
                    }
                    Ok(None) => {
                        self.close();
                        return None;
                    }
                    Err(err) => return self.fail(err),
                },
                State::Scanning { mut line, at } => {
                    let tag = match scan(&line, at) {
                        Ok(Some(tag)) => tag,
                        Ok(None) => {
                            if line.is_empty() {
                                continue;
                            }
                            return Some(Ok(self.finish_line(line)));
                        }
                        Err(err) => return self.fail(err),
                    };
                    match self.replacements.get_mut(&tag.name) {
                        None => {
                            line.replace_range(tag.start..tag.end, "");
                            self.state = State::Scanning { line, at: tag.start };
                        }
                        Some(Replacement::Text(value)) => {
                            line.replace_range(tag.start..tag.end, value);
                            let at = tag.start + value.len();
                            self.state = State::Scanning { line, at };
                        }
                        Some(Replacement::Lines(stream)) => {
                            let producer = std::mem::replace(stream, Box::new(std::iter::empty()));
                            let rest = line[tag.end..].trim().to_string();
                            line.truncate(tag.start);
                            self.state = State::Splicing {
                                tag: tag.name,
                                producer,
                                pending: Some(line),
                                rest,
                            };
                        }
                    }
                }
                State::Splicing {
                    tag,
                    mut producer,
                    pending,
                    rest,
                } => match producer.next() {
                    Some(Ok(sub)) => {
                        let out = match pending {
                            Some(mut pre) => {
                                pre.push_str(&sub);
                                pre
                            }
                            None => format!("{}{}", self.indent, sub),
                        };
                        self.state = State::Splicing {
                            tag,
                            producer,
                            pending: None,
                            rest,
                        };
                        return Some(Ok(self.finish_line(out)));
                    }
                    Some(Err(err)) => {
                        return self.fail(TemplateError::Nested {
                            tag,
                            source: Box::new(err),
                        });
                    }
                    None => {
                        self.state = State::Scanning { line: rest, at: 0 };
                        // Empty producer: the pre-tag text still stands alone.
                        if let Some(pre) = pending.filter(|pre| !pre.trim().is_empty()) {
                            return Some(Ok(self.finish_line(pre)));
                        }
                    }
                },
            }
        }
    }
}

impl fmt::Debug for LazyTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyTemplate")
            .field("line_num", &self.line_num)
            .field("closed", &self.is_closed())
            .field("tags", &self.replacements.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn leading_whitespace(line: &str) -> &str {
    let trimmed = line.trim_start_matches(|c: char| c.is_whitespace() && c != '\n' && c != '\r');
    &line[..line.len() - trimmed.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::Template;

    fn collect(tmp: &mut LazyTemplate) -> Vec<String> {
        tmp.map(|line| line.unwrap()).collect()
    }

    #[test]
    fn plain_lines_are_rstripped_with_one_newline() {
        let mut tmp = LazyTemplate::from_text("a  \n  b\t\nc");
        assert_eq!(collect(&mut tmp), ["a\n", "  b\n", "c\n"]);
    }

    #[test]
    fn text_replacement_in_place() {
        let mut tmp = LazyTemplate::from_text("<div>{{ comment }}</div>\n");
        tmp.set("comment", "hello");
        assert_eq!(collect(&mut tmp), ["<div>hello</div>\n"]);
    }

    #[test]
    fn several_text_tags_on_one_line() {
        let mut tmp = LazyTemplate::from_text("{{a}}+{{ b }}={{c}}\n");
        tmp.format([
            ("a", Replacement::text(1)),
            ("b", Replacement::text(22)),
            ("c", Replacement::text(23)),
        ]);
        assert_eq!(collect(&mut tmp), ["1+22=23\n"]);
    }

    #[test]
    fn replacement_text_is_not_rescanned() {
        let mut tmp = LazyTemplate::from_text("x {{ a }} y\n");
        tmp.set("a", "{{ a }}");
        assert_eq!(collect(&mut tmp), ["x {{ a }} y\n"]);
    }

    #[test]
    fn unknown_tag_is_erased() {
        let mut tmp = LazyTemplate::from_text("<p>{{ missing }}!{{ known }}</p>\n");
        tmp.set("known", "ok");
        assert_eq!(collect(&mut tmp), ["<p>!ok</p>\n"]);
    }

    #[test]
    fn splice_prefixes_outer_indent_after_first_line() {
        let mut tmp = LazyTemplate::from_text("<table>\n    {{ rows }}\n</table>\n");
        tmp.set(
            "rows",
            Replacement::lines(["<tr>\n", "  <td>1</td>\n", "</tr>\n"]),
        );
        assert_eq!(
            collect(&mut tmp),
            [
                "<table>\n",
                "    <tr>\n",
                "      <td>1</td>\n",
                "    </tr>\n",
                "</table>\n",
            ]
        );
    }

    #[test]
    fn splice_of_k_lines_inserts_k_lines() {
        let k = 7;
        let rows: Vec<String> = (0..k).map(|i| format!("row {i}\n")).collect();
        let mut tmp = LazyTemplate::from_text("top\n  {{ rows }}\nbottom\n");
        tmp.set("rows", Replacement::lines(rows));
        let out = collect(&mut tmp);
        assert_eq!(out.len(), k + 2);
        assert_eq!(out[1], "  row 0\n");
        assert!(out[2..=k].iter().all(|line| line.starts_with("  row ")));
    }

    #[test]
    fn nested_lazy_template_and_remainder() {
        let mut js = LazyTemplate::from_text("var a = 1;\nif (a) {\n  go('{{ addr }}');\n}\n");
        js.set("addr", "10.0.0.1");
        let mut page = LazyTemplate::from_text("<script>\n  {{ javascript }} <!-- {{ note }} -->\n</script>\n");
        page.set("javascript", js).set("note", "end");
        assert_eq!(
            collect(&mut page),
            [
                "<script>\n",
                "  var a = 1;\n",
                "  if (a) {\n",
                "    go('10.0.0.1');\n",
                "  }\n",
                "<!-- end -->\n",
                "</script>\n",
            ]
        );
    }

    #[test]
    fn eager_rows_spliced_per_data_item() {
        let row = Template::new("<tr>\n  <td>{{ pin_id }}</td>\n</tr>\n").unwrap();
        let rows = [0, 2].into_iter().flat_map(move |id| {
            let mut row = row.clone();
            row.format([("pin_id", id)]);
            row.lines()
        });
        let mut page = LazyTemplate::from_text("  <table>\n    {{ table_content }}\n  </table>\n");
        page.set("table_content", Replacement::lines(rows));
        assert_eq!(
            page.render().unwrap(),
            "  <table>\n    <tr>\n      <td>0</td>\n    </tr>\n    <tr>\n      <td>2</td>\n    </tr>\n  </table>\n"
        );
    }

    #[test]
    fn producer_is_spent_after_first_splice() {
        let mut tmp = LazyTemplate::from_text("{{ rows }}\nagain: {{ rows }}\n");
        tmp.set("rows", Replacement::lines(["x\n", "y\n"]));
        assert_eq!(collect(&mut tmp), ["x\n", "y\n", "again:\n"]);
    }

    #[test]
    fn exhausted_template_does_not_restart() {
        let mut tmp = LazyTemplate::from_text("one\n");
        assert_eq!(collect(&mut tmp), ["one\n"]);
        assert!(tmp.is_closed());
        assert!(tmp.next().is_none());
        assert!(tmp.next().is_none());
    }

    #[test]
    fn close_is_idempotent() {
        let mut tmp = LazyTemplate::from_text("one\ntwo\n");
        assert_eq!(tmp.next().unwrap().unwrap(), "one\n");
        tmp.close();
        tmp.close();
        assert!(tmp.is_closed());
        assert!(tmp.next().is_none());
    }

    #[test]
    fn syntax_error_is_yielded_then_closes() {
        let mut tmp = LazyTemplate::from_text("fine\nbroken {{ tag\nnever\n");
        assert_eq!(tmp.next().unwrap().unwrap(), "fine\n");
        assert!(matches!(
            tmp.next(),
            Some(Err(TemplateError::UnterminatedTag { .. }))
        ));
        assert!(tmp.next().is_none());
        assert!(tmp.is_closed());
    }

    #[test]
    fn nested_error_is_wrapped_with_tag() {
        let inner = LazyTemplate::from_text("{{ bad tag }}\n");
        let mut outer = LazyTemplate::from_text("{{ inner }}\n");
        outer.set("inner", inner);
        match outer.next() {
            Some(Err(TemplateError::Nested { tag, .. })) => assert_eq!(tag, "inner"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn failing_line_producer_stops_the_page() {
        let rows = vec![
            Ok("<tr>1</tr>\n".to_string()),
            Err(TemplateError::MalformedTag {
                pos: 0,
                tag: "{{ ? }}".to_string(),
            }),
        ];
        let mut page = LazyTemplate::from_text("<table>\n  {{ rows }}\n</table>\n");
        page.set("rows", Replacement::try_lines(rows));
        assert_eq!(page.next().unwrap().unwrap(), "<table>\n");
        assert_eq!(page.next().unwrap().unwrap(), "  <tr>1</tr>\n");
        match page.next() {
            Some(Err(TemplateError::Nested { tag, source })) => {
                assert_eq!(tag, "rows");
                assert!(matches!(*source, TemplateError::MalformedTag { .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(page.next().is_none());
    }

    #[test]
    fn zero_tags_round_trip_when_not_stripping() {
        let text = "line one  \n\tline two\n";
        let mut tmp = LazyTemplate::from_text(text).with_rstrip_lines(false);
        assert_eq!(tmp.render().unwrap(), text);
    }

    #[test]
    fn file_source_closes_on_exhaustion() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, "<h1>{{ title }}</h1>\n").unwrap();
        let mut tmp = LazyTemplate::from_file(&path).unwrap();
        tmp.set("title", "Pins");
        assert_eq!(tmp.render().unwrap(), "<h1>Pins</h1>\n");
        assert!(tmp.is_closed());
        assert_eq!(tmp.line_number(), 1);
    }
}
