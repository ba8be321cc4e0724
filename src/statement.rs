//! Fragment sequences and render strategies.
//!
//! Every statement shape is built once as a [`Statement`], an ordered list of
//! fragments (one per logical line). A [`QueryWriter`] turns that list into
//! the lines of a generated body plus the exact text those lines produce.
//! Both writers consume the same fragments, so their text only differs in
//! whitespace.

use serde::Serialize;

use crate::settings::RenderStrategy;

/// One logical line of statement text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fragment {
    /// Nesting level: 0 for clause keywords, 1 for list items.
    pub depth: usize,
    pub text: String,
}

impl Fragment {
    /// Line as written into generated code.
    fn line(&self) -> String {
        format!("{}{} ", " ".repeat(self.depth + 1), self.text)
    }
}

/// Ordered fragments of one statement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Statement {
    fragments: Vec<Fragment>,
}

impl Statement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a clause keyword (`select`, `from`, `where`, ...).
    pub fn keyword(&mut self, text: &str) -> &mut Self {
        self.fragments.push(Fragment {
            depth: 0,
            text: text.to_string(),
        });
        self
    }

    /// Append one list item or term.
    pub fn item(&mut self, text: impl Into<String>) -> &mut Self {
        self.fragments.push(Fragment {
            depth: 1,
            text: text.into(),
        });
        self
    }

    /// Append items, `separator` after every item but the last.
    pub fn list<I, S>(&mut self, items: I, separator: &str) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items: Vec<String> = items.into_iter().map(Into::into).collect();
        let last = items.len().saturating_sub(1);
        for (i, item) in items.into_iter().enumerate() {
            if i < last {
                self.item(format!("{}{}", item, separator));
            } else {
                self.item(item);
            }
        }
        self
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Canonical single-line statement text.
    pub fn sql(&self) -> String {
        let joined: Vec<&str> = self.fragments.iter().map(|f| f.text.as_str()).collect();
        normalize(&joined.join(" "))
    }
}

/// Collapse whitespace runs and drop spaces just inside parentheses.
pub fn normalize(text: &str) -> String {
    let collapsed: Vec<&str> = text.split_whitespace().collect();
    collapsed.join(" ").replace("( ", "(").replace(" )", ")")
}

/// Statement text together with the code that builds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedQuery {
    pub strategy: RenderStrategy,
    /// Text exactly as the generated code produces it.
    pub text: String,
    /// Generated lines, ending with `query` bound to the text.
    pub code: Vec<String>,
}

impl RenderedQuery {
    /// Text with whitespace normalized; equal across strategies.
    pub fn normalized(&self) -> String {
        normalize(&self.text)
    }
}

/// Turns fragments into generated code.
pub trait QueryWriter {
    fn write(&self, statement: &Statement) -> RenderedQuery;
}

/// `let mut query = String::new();` then one `push_str` per fragment.
pub struct IncrementalAppend;

impl QueryWriter for IncrementalAppend {
    fn write(&self, statement: &Statement) -> RenderedQuery {
        let mut text = String::new();
        let mut code = vec!["let mut query = String::new();".to_string()];

        for fragment in statement.fragments() {
            let line = fragment.line();
            code.push(format!("query.push_str({:?});", line));
            text.push_str(&line);
        }

        RenderedQuery {
            strategy: RenderStrategy::IncrementalAppend,
            text,
            code,
        }
    }
}

/// One raw multi-line literal.
pub struct LiteralBlock;

impl QueryWriter for LiteralBlock {
    fn write(&self, statement: &Statement) -> RenderedQuery {
        let lines: Vec<String> = statement.fragments().iter().map(Fragment::line).collect();

        let mut code = Vec::with_capacity(lines.len() + 2);
        code.push("let query = r#\"".to_string());
        code.extend(lines.iter().cloned());
        code.push("\"#;".to_string());

        RenderedQuery {
            strategy: RenderStrategy::LiteralBlock,
            // The literal opens and closes on lines of its own
            text: format!("\n{}\n", lines.join("\n")),
            code,
        }
    }
}

impl RenderStrategy {
    pub fn writer(&self) -> Box<dyn QueryWriter> {
        match self {
            RenderStrategy::IncrementalAppend => Box::new(IncrementalAppend),
            RenderStrategy::LiteralBlock => Box::new(LiteralBlock),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn select() -> Statement {
        let mut stmt = Statement::new();
        stmt.keyword("select")
            .list(["Id", "Name"], ",")
            .keyword("from")
            .item("Customer")
            .keyword("where")
            .list(["Id = @Id", "Region = @Region"], " and");
        stmt
    }

    #[test]
    fn test_list_separators() {
        let stmt = select();
        let texts: Vec<&str> = stmt.fragments().iter().map(|f| f.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "select",
                "Id,",
                "Name",
                "from",
                "Customer",
                "where",
                "Id = @Id and",
                "Region = @Region"
            ]
        );
    }

    #[test]
    fn test_canonical_sql() {
        assert_eq!(
            select().sql(),
            "select Id, Name from Customer where Id = @Id and Region = @Region"
        );
    }

    #[test]
    fn test_parentheses_tightened() {
        let mut stmt = Statement::new();
        stmt.keyword("insert into")
            .item("Customer")
            .item("(")
            .list(["Id", "Name"], ",")
            .item(")");
        assert_eq!(stmt.sql(), "insert into Customer (Id, Name)");
    }

    #[test]
    fn test_incremental_append() {
        let rendered = IncrementalAppend.write(&select());
        assert_eq!(rendered.code[0], "let mut query = String::new();");
        assert_eq!(rendered.code[1], "query.push_str(\" select \");");
        assert_eq!(rendered.code[2], "query.push_str(\"  Id, \");");
        assert_eq!(rendered.code.len(), 1 + select().fragments().len());
    }

    #[test]
    fn test_literal_block() {
        let rendered = LiteralBlock.write(&select());
        assert_eq!(rendered.code.first().unwrap(), "let query = r#\"");
        assert_eq!(rendered.code.last().unwrap(), "\"#;");
        assert_eq!(rendered.code[1], " select ");
        assert!(rendered.text.contains("\n  Name \n"));
    }

    #[test]
    fn test_strategies_agree() {
        let stmt = select();
        let appended = RenderStrategy::IncrementalAppend.writer().write(&stmt);
        let literal = RenderStrategy::LiteralBlock.writer().write(&stmt);
        assert_ne!(appended.text, literal.text);
        assert_eq!(appended.normalized(), literal.normalized());
        assert_eq!(appended.normalized(), stmt.sql());
    }

    #[test]
    fn test_empty_list() {
        let mut stmt = Statement::new();
        stmt.list(Vec::<String>::new(), ",");
        assert!(stmt.fragments().is_empty());
    }
}
