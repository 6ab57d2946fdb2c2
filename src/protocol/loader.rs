//! 从源文本读入协议：去掉注释，展开包含文件与宏。

use std::ops::Range;

use crate::{
    diagnostic::{Diagnostic, DiagnosticKind, Diagnostics},
    frontend::{
        include::IncludeResolver,
        tokenizer::{tokenize, BP_DELIMITERS},
    },
    source::SourceFile,
};

use super::{macros, Protocol, NULL};

/// 读入 `file` 中 `range` 范围内的协议文本。
pub fn load(
    file: &SourceFile,
    range: Range<usize>,
    includes: &IncludeResolver,
    diagnostics: &mut Diagnostics,
) -> Protocol {
    let tokens = collect(file, range, includes, diagnostics, &mut vec![file.name.clone()]);
    Protocol::new(macros::expand(&tokens, &file.name, diagnostics))
}

enum Comment {
    None,
    Block,
    Line,
}

enum Include {
    None,
    Path,
    Close,
}

fn collect(
    file: &SourceFile,
    range: Range<usize>,
    includes: &IncludeResolver,
    diagnostics: &mut Diagnostics,
    stack: &mut Vec<String>,
) -> Vec<String> {
    let offset = range.start;
    let mut result = vec![];
    let mut comment = Comment::None;
    let mut include = Include::None;

    for token in tokenize(&file.text[range], BP_DELIMITERS, true, true) {
        match comment {
            Comment::Block => {
                if token == "*/" {
                    comment = Comment::None;
                }
                continue;
            }
            Comment::Line => {
                if token == "\n" {
                    comment = Comment::None;
                }
                continue;
            }
            Comment::None => {}
        }

        match token.text {
            "/*" => {
                comment = Comment::Block;
                continue;
            }
            "#" => {
                comment = Comment::Line;
                continue;
            }
            "\n" => continue,
            _ => {}
        }

        let start = offset + token.start;
        match include {
            Include::None if token == "[" => include = Include::Path,
            Include::None => result.push(token.text.to_string()),
            Include::Path => {
                match includes.load_protocol(token.text, file) {
                    Ok(included) if stack.contains(&included.name) => diagnostics.report(
                        Diagnostic::new(
                            DiagnosticKind::Cycle,
                            &file.name,
                            format!("File {} includes itself", included.name),
                        )
                        .with_span(&file.text, start, start + token.text.len()),
                    ),
                    Ok(included) => {
                        stack.push(included.name.clone());
                        let range = 0..included.text.len();
                        let tokens = collect(&included, range, includes, diagnostics, stack);
                        stack.pop();
                        if tokens.is_empty() {
                            result.push(NULL.to_string());
                        } else {
                            result.push("(".to_string());
                            result.extend(tokens);
                            result.push(")".to_string());
                        }
                    }
                    Err(diagnostic) => diagnostics.report(diagnostic.with_span(
                        &file.text,
                        start,
                        start + token.text.len(),
                    )),
                }
                include = Include::Close;
            }
            Include::Close => {
                if token != "]" {
                    diagnostics.report(
                        Diagnostic::new(DiagnosticKind::Syntax, &file.name, "Expected ]")
                            .with_span(&file.text, start, start + token.text.len()),
                    );
                    result.push(token.text.to_string());
                }
                include = Include::None;
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemoryFs;

    fn load_text(fs: &MemoryFs, text: &str) -> (Protocol, Diagnostics) {
        let resolver = IncludeResolver::new(fs, "p");
        let file = SourceFile::new("p/f.adl", text, "p");
        let mut diagnostics = Diagnostics::new();
        let protocol = load(&file, 0..file.text.len(), &resolver, &mut diagnostics);
        (protocol, diagnostics)
    }

    #[test]
    fn comments_are_dropped() {
        let fs = MemoryFs::new();
        let (protocol, diagnostics) = load_text(&fs, "?a /* (x) */ ;\n# !ignored\n!b");
        assert_eq!(protocol.to_string(), "? a ; ! b");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn includes_are_parenthesized() {
        let fs = MemoryFs::new()
            .file("p/part.bp", "!x ; ?y")
            .file("p/empty.bp", "# nothing\n");
        let (protocol, diagnostics) = load_text(&fs, "?a ; [part.bp] ; [empty.bp]");
        assert_eq!(protocol.to_string(), "? a ; ( ! x ; ? y ) ; NULL");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn include_path_is_taken_literally() {
        let fs = MemoryFs::new().file("p/a%b.bp", "!x");
        let (protocol, diagnostics) = load_text(&fs, "?a ; [a%b.bp]");
        assert_eq!(protocol.to_string(), "? a ; ( ! x )");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn missing_include_is_reported() {
        let fs = MemoryFs::new();
        let (protocol, diagnostics) = load_text(&fs, "?a ; [gone.bp]");
        assert_eq!(protocol.to_string(), "? a ;");
        assert!(diagnostics.contains(DiagnosticKind::Resource));
    }

    #[test]
    fn recursive_include_is_a_cycle() {
        let fs = MemoryFs::new().file("p/loop.bp", "!a ; [loop.bp]");
        let (protocol, diagnostics) = load_text(&fs, "[loop.bp]");
        assert_eq!(protocol.to_string(), "( ! a ; )");
        assert!(diagnostics.contains(DiagnosticKind::Cycle));
    }

    #[test]
    fn macros_are_expanded_after_includes() {
        let fs = MemoryFs::new().file("p/opt.bp", "tentative { !z }");
        let (protocol, _) = load_text(&fs, "[opt.bp]");
        assert_eq!(protocol.to_string(), "( ( ! z ) + NULL )");
    }

    #[test]
    fn range_selects_part_of_file() {
        let fs = MemoryFs::new();
        let resolver = IncludeResolver::new(&fs, "p");
        let text = "protocol: { !a ; ?b }";
        let file = SourceFile::new("p/f.adl", text, "p");
        let mut diagnostics = Diagnostics::new();
        let start = text.find('!').unwrap();
        let end = text.rfind('}').unwrap();
        let protocol = load(&file, start..end, &resolver, &mut diagnostics);
        assert_eq!(protocol.to_string(), "! a ; ? b");
    }
}
