//! 诊断信息。
//!
//! 所有可恢复的问题都以 [`Diagnostic`] 的形式收集起来，处理过程不会因此中断。

use annotate_snippets::{
    display_list::{DisplayList, FormatOptions},
    snippet::{Annotation, AnnotationType, Snippet},
};
use thiserror::Error;

use crate::utils::{LinesInfo, Span};

/// 诊断类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// Unexpected token, unbalanced parentheses or braces.
    Syntax,
    /// Undefined interface, frame or architecture; ambiguous system architecture.
    Reference,
    /// Malformed `tentative` / `alternative` statement.
    Macro,
    /// Missing include file.
    Resource,
    /// Cyclic inheritance, nesting or delegation.
    Cycle,
}

impl DiagnosticKind {
    fn label(self) -> &'static str {
        match self {
            DiagnosticKind::Syntax => "syntax error",
            DiagnosticKind::Reference => "undefined reference",
            DiagnosticKind::Macro => "macro error",
            DiagnosticKind::Resource => "missing resource",
            DiagnosticKind::Cycle => "cycle detected",
        }
    }
}

/// 一条诊断信息，显示为 `<file>: <message>`。
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{file}: {message}")]
pub struct Diagnostic {
    /// 类别
    pub kind: DiagnosticKind,
    /// 文件名或所在构造的名称
    pub file: String,
    /// 消息
    pub message: String,
    excerpt: Option<LinesInfo>,
}

impl Diagnostic {
    /// 创建一条诊断信息。
    pub fn new(kind: DiagnosticKind, file: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            file: file.into(),
            message: message.into(),
            excerpt: None,
        }
    }

    /// 附加出错位置的源代码片段。
    pub fn with_span(mut self, source: &str, start: usize, end: usize) -> Self {
        self.excerpt = Span::new(&self.file, source, start, end).lines();
        self
    }

    /// 是否带有源代码片段。
    pub fn has_excerpt(&self) -> bool {
        self.excerpt.is_some()
    }

    /// 渲染为带源代码标注的片段。没有位置信息时退化为单行文本。
    pub fn to_snippet(&self, color: bool) -> String {
        let Some(lines) = &self.excerpt else {
            return self.to_string();
        };

        let snippet = Snippet {
            title: Some(Annotation {
                id: None,
                label: Some(self.kind.label()),
                annotation_type: AnnotationType::Warning,
            }),
            footer: vec![],
            slices: vec![lines.as_annotation(&self.message, AnnotationType::Warning)],
            opt: FormatOptions {
                color,
                ..Default::default()
            },
        };

        DisplayList::from(snippet).to_string()
    }
}

/// 诊断信息收集器
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    /// 创建一个空的收集器。
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一条诊断信息。
    pub fn report(&mut self, diagnostic: Diagnostic) {
        tracing::debug!(kind = ?diagnostic.kind, "{}", diagnostic);
        self.items.push(diagnostic);
    }

    /// 已记录的条数。
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// 是否没有任何诊断信息。
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 按记录顺序遍历。
    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    /// 是否存在某一类别的诊断信息。
    pub fn contains(&self, kind: DiagnosticKind) -> bool {
        self.items.iter().any(|d| d.kind == kind)
    }

    /// 转换为列表。
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_file_and_message() {
        let d = Diagnostic::new(DiagnosticKind::Resource, "a.adl", "Unable to include file b.adl");
        assert_eq!(d.to_string(), "a.adl: Unable to include file b.adl");
        assert_eq!(d.to_snippet(false), d.to_string());
    }

    #[test]
    fn snippet_shows_the_offending_line() {
        let source = "frame F {\n\tbogus\n};\n";
        let start = source.find("bogus").unwrap();
        let d = Diagnostic::new(DiagnosticKind::Syntax, "f.adl", "Unknown token 'bogus' in frame 'F'")
            .with_span(source, start, start + 5);
        assert!(d.has_excerpt());
        let rendered = d.to_snippet(false);
        assert!(rendered.contains("bogus"));
        assert!(rendered.contains("f.adl"));
    }

    #[test]
    fn sink_counts_by_kind() {
        let mut sink = Diagnostics::new();
        assert!(sink.is_empty());
        sink.report(Diagnostic::new(DiagnosticKind::Cycle, "I", "cyclic"));
        assert_eq!(sink.len(), 1);
        assert!(sink.contains(DiagnosticKind::Cycle));
        assert!(!sink.contains(DiagnosticKind::Syntax));
    }
}
