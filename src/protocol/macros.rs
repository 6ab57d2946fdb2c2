//! 协议宏展开：`tentative` 与 `alternative`。
//!
//! ```text
//! tentative { P }                   =>  ( P ) + NULL
//! alternative (v0; v1; v2) { P }    =>  ( P[v0 -> v1] ) + ( P[v0 -> v2] )
//! ```

use crate::diagnostic::{Diagnostic, DiagnosticKind, Diagnostics};

use super::NULL;

/// 展开词法单元序列中的所有宏，宏体中的宏递归展开。
pub fn expand(tokens: &[String], origin: &str, diagnostics: &mut Diagnostics) -> Vec<String> {
    Expander {
        origin,
        diagnostics,
    }
    .expand(tokens)
}

struct Expander<'a> {
    origin: &'a str,
    diagnostics: &'a mut Diagnostics,
}

impl Expander<'_> {
    fn expand(&mut self, tokens: &[String]) -> Vec<String> {
        let mut result = vec![];
        let mut i = 0;

        while i < tokens.len() {
            match tokens[i].as_str() {
                "tentative" => i = self.tentative(tokens, i, &mut result),
                "alternative" => i = self.alternative(tokens, i, &mut result),
                _ => {
                    result.push(tokens[i].clone());
                    i += 1;
                }
            }
        }

        result
    }

    /// Expands the `tentative` at `start`, returns the index to continue from.
    fn tentative(&mut self, tokens: &[String], start: usize, result: &mut Vec<String>) -> usize {
        if tokens.get(start + 1).map(String::as_str) != Some("{") {
            self.report("Unexpected tentative statement");
            result.push(tokens[start].clone());
            return start + 1;
        }

        let Some(end) = block_end(tokens, start + 1) else {
            self.report("Syntax error in tentative statement");
            result.extend_from_slice(&tokens[start..]);
            return tokens.len();
        };

        result.push("(".to_string());
        result.extend(self.expand(&tokens[start + 2..end]));
        result.push(")".to_string());
        result.push("+".to_string());
        result.push(NULL.to_string());
        end + 1
    }

    /// Expands the `alternative` at `start`, returns the index to continue from.
    fn alternative(&mut self, tokens: &[String], start: usize, result: &mut Vec<String>) -> usize {
        if tokens.get(start + 1).map(String::as_str) != Some("(") {
            self.report("Unexpected alternative statement");
            result.push(tokens[start].clone());
            return start + 1;
        }

        let Some(close) = tokens[start + 2..]
            .iter()
            .position(|t| t == ")")
            .map(|p| p + start + 2)
        else {
            self.report("Syntax error in alternative statement");
            result.extend_from_slice(&tokens[start..]);
            return tokens.len();
        };

        if tokens.get(close + 1).map(String::as_str) != Some("{") {
            self.report("Syntax error in alternative statement");
            result.extend_from_slice(&tokens[start..=close]);
            return close + 1;
        }

        let Some(end) = block_end(tokens, close + 1) else {
            self.report("Syntax error in alternative statement");
            result.extend_from_slice(&tokens[start..]);
            return tokens.len();
        };

        let Some(names) = self.names(&tokens[start + 2..close]) else {
            return end + 1;
        };
        if names.len() < 2 {
            self.report("Too few arguments of alternative statement, at least two names expected");
            return end + 1;
        }

        let body = &tokens[close + 2..end];
        let (pattern, replacements) = names.split_at(1);
        for (i, replacement) in replacements.iter().enumerate() {
            if i > 0 {
                result.push("+".to_string());
            }
            let renamed = body
                .iter()
                .map(|t| rename(t, &pattern[0], replacement))
                .collect::<Vec<_>>();
            result.push("(".to_string());
            result.extend(self.expand(&renamed));
            result.push(")".to_string());
        }
        end + 1
    }

    /// Splits `v0 ; v1 ; ...` into names. Reports and returns `None` when a
    /// segment is not exactly one token.
    fn names<'t>(&mut self, header: &'t [String]) -> Option<Vec<&'t str>> {
        let mut names = vec![];
        for segment in header.split(|t| t == ";") {
            match segment {
                [] => {}
                [name] => names.push(name.as_str()),
                _ => {
                    self.report("Syntax error in alternative statement");
                    return None;
                }
            }
        }
        Some(names)
    }

    fn report(&mut self, message: &str) {
        self.diagnostics.report(Diagnostic::new(
            DiagnosticKind::Macro,
            self.origin,
            message,
        ));
    }
}

/// Index of the `}` matching the `{` at `open`.
fn block_end(tokens: &[String], open: usize) -> Option<usize> {
    let mut level = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        match token.as_str() {
            "{" => level += 1,
            "}" => {
                level -= 1;
                if level == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// `pattern.suffix` becomes `replacement.suffix`; other tokens are untouched.
fn rename(token: &str, pattern: &str, replacement: &str) -> String {
    match token
        .strip_prefix(pattern)
        .and_then(|rest| rest.strip_prefix('.'))
    {
        Some(suffix) => format!("{}.{}", replacement, suffix),
        None => token.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Protocol;

    fn run(text: &str) -> (String, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let tokens = expand(Protocol::parse(text).tokens(), "t.bp", &mut diagnostics);
        (tokens.join(" "), diagnostics)
    }

    #[test]
    fn tentative_is_choice_with_null() {
        let (output, diagnostics) = run("tentative { !a }");
        assert_eq!(output, "( ! a ) + NULL");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn tentative_nested() {
        let (output, _) = run("?x ; tentative { !a ; tentative { !b } }");
        assert_eq!(output, "? x ; ( ! a ; ( ! b ) + NULL ) + NULL");
    }

    #[test]
    fn alternative_renames_dotted_prefix() {
        let (output, diagnostics) = run("alternative (x; y; z) { ?x.foo ; !a }");
        assert_eq!(output, "( ? y.foo ; ! a ) + ( ? z.foo ; ! a )");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn alternative_leaves_other_tokens_alone() {
        let (output, _) = run("alternative (x; y) { !xx.foo ; !x ; ?x.bar.baz }");
        assert_eq!(output, "( ! xx.foo ; ! x ; ? y.bar.baz )");
    }

    #[test]
    fn alternative_with_nested_tentative() {
        let (output, _) = run("alternative (fs; fat) { tentative { ?fs.mount } }");
        assert_eq!(output, "( ( ? fat.mount ) + NULL )");
    }

    #[test]
    fn alternative_needs_two_names() {
        let (output, diagnostics) = run("!a ; alternative (x) { ?x.foo } ; !b");
        assert_eq!(output, "! a ; ; ! b");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics.contains(DiagnosticKind::Macro));
    }

    #[test]
    fn malformed_macros_pass_through() {
        let (output, diagnostics) = run("tentative !a");
        assert_eq!(output, "tentative ! a");
        assert_eq!(diagnostics.len(), 1);

        let (output, diagnostics) = run("tentative { !a");
        assert_eq!(output, "tentative { ! a");
        assert_eq!(diagnostics.len(), 1);

        let (output, diagnostics) = run("alternative (x; y) !a");
        assert_eq!(output, "alternative ( x ; y ) ! a");
        assert_eq!(diagnostics.len(), 1);
    }
}
