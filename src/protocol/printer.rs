//! 协议排版。

use crate::diagnostic::{Diagnostic, DiagnosticKind, Diagnostics};

use super::NULL;

fn tabs(count: usize) -> String {
    "\t".repeat(count)
}

/// 将词法单元序列排版为缩进文本，每个事件或括号占一行。
///
/// 排版只看结构：`(` 与 `)` 各占一行并改变缩进，`!`、`?` 与 `NULL` 另起一行，
/// `*` 紧贴前一个单元，`;`、`+`、`||`、`|` 前面加一个空格，其余单元直接拼接。
/// 括号不平衡时报告诊断信息，但仍然输出。
pub fn render(tokens: &[String], indent: usize, origin: &str, diagnostics: &mut Diagnostics) -> String {
    let mut output = String::new();
    let mut level = 0usize;
    let mut unbalanced = false;

    for token in tokens {
        match token.as_str() {
            ";" | "+" | "||" | "|" => {
                output.push(' ');
                output.push_str(token);
            }
            "(" => {
                output.push_str(&format!("\n{}(", tabs(indent + level)));
                level += 1;
            }
            ")" | "}" => {
                match level.checked_sub(1) {
                    Some(l) => level = l,
                    None => unbalanced = true,
                }
                output.push_str(&format!("\n{}{}", tabs(indent + level), token));
            }
            "{" => {
                output.push_str(" {");
                level += 1;
            }
            "*" => output.push('*'),
            "!" | "?" => output.push_str(&format!("\n{}{}", tabs(indent + level), token)),
            _ if token == NULL => output.push_str(&format!("\n{}{}", tabs(indent + level), token)),
            _ => output.push_str(token),
        }
    }

    if unbalanced || level != 0 {
        diagnostics.report(Diagnostic::new(
            DiagnosticKind::Syntax,
            origin,
            "Wrong number of parentheses",
        ));
    }

    let output = output.trim_start_matches('\n');
    if output.trim().is_empty() {
        format!("{}{}", tabs(indent), NULL)
    } else {
        output.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Protocol;
    use pretty_assertions::assert_eq;

    fn print(text: &str) -> (String, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let output = render(Protocol::parse(text).tokens(), 0, "t.bp", &mut diagnostics);
        (output, diagnostics)
    }

    #[test]
    fn events_and_operators() {
        let (output, diagnostics) = print("?a.open ; (!b.read* + NULL) || !c.close");
        assert_eq!(
            output,
            "?a.open ;\n(\n\t!b.read* +\n\tNULL\n) ||\n!c.close"
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn base_indent_applies_to_every_line() {
        let mut diagnostics = Diagnostics::new();
        let output = render(Protocol::parse("(!a)").tokens(), 2, "t.bp", &mut diagnostics);
        assert_eq!(output, "\t\t(\n\t\t\t!a\n\t\t)");
    }

    #[test]
    fn stray_braces_indent_inline() {
        let (output, diagnostics) = print("tentative { !a }");
        assert_eq!(output, "tentative {\n\t!a\n}");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn empty_renders_null() {
        let (output, _) = print("");
        assert_eq!(output, "NULL");
    }

    #[test]
    fn unbalanced_parentheses_still_render() {
        let (output, diagnostics) = print("!a )");
        assert_eq!(output, "!a\n)");
        assert_eq!(diagnostics.len(), 1);

        let (_, diagnostics) = print("( !a");
        assert_eq!(diagnostics.len(), 1);
    }
}
