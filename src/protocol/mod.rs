//! 行为协议（Behavior Protocol）。
//!
//! 协议在内部始终是一个词法单元序列。选择与并行等运算符只作为结构上的记号处理，
//! 不解释其含义。

use std::fmt::Display;

use crate::{
    diagnostic::{Diagnostic, DiagnosticKind, Diagnostics},
    frontend::{
        state::is_identifier,
        tokenizer::{tokenize, BP_DELIMITERS},
    },
};

pub mod loader;
pub mod macros;
pub mod printer;

/// 空操作标记
pub const NULL: &str = "NULL";

/// 一个行为协议
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Protocol {
    tokens: Vec<String>,
}

impl Protocol {
    /// 从词法单元创建协议。
    pub fn new(tokens: Vec<String>) -> Self {
        Self { tokens }
    }

    /// Tokenizes bare protocol text. Comments, includes and macros are not
    /// processed, see [`loader`] for that.
    pub fn parse(text: &str) -> Self {
        let tokens = tokenize(text, BP_DELIMITERS, true, true)
            .into_iter()
            .filter(|t| t.text != "\n")
            .map(|t| t.text.to_string())
            .collect();
        Self { tokens }
    }

    /// 词法单元序列。
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// 是否为空协议。
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// 转换为提供接口的协议。
    ///
    /// 每个接收事件 `?m` 被限定为 `?iface.m`（只改写标识符，已经带点的名称保持不变），
    /// 整个协议包装为 `( ... )*`，表示事件可以通过该接口被调用任意多次。
    pub fn extend(&self, iface: &str, origin: &str, diagnostics: &mut Diagnostics) -> Protocol {
        let mut tokens = Vec::with_capacity(self.tokens.len() + 3);
        tokens.push("(".to_string());

        let mut iter = self.tokens.iter().peekable();
        while let Some(token) = iter.next() {
            tokens.push(token.clone());
            if token != "?" {
                continue;
            }
            match iter.next() {
                Some(event) if is_identifier(event) && event != NULL => {
                    tokens.push(format!("{}.{}", iface, event))
                }
                Some(event) => tokens.push(event.clone()),
                None => diagnostics.report(Diagnostic::new(
                    DiagnosticKind::Syntax,
                    origin,
                    "Unexpected end of protocol",
                )),
            }
        }

        tokens.push(")".to_string());
        tokens.push("*".to_string());
        Protocol { tokens }
    }

    /// 以选择运算符合并多个协议：`( p0 ) + ( p1 ) + ...`。
    pub fn merge(protocols: Vec<Protocol>) -> Protocol {
        if protocols.len() <= 1 {
            return protocols.into_iter().next().unwrap_or_default();
        }

        let mut tokens = vec![];
        for (i, protocol) in protocols.into_iter().enumerate() {
            if i > 0 {
                tokens.push("+".to_string());
            }
            tokens.push("(".to_string());
            tokens.extend(protocol.tokens);
            tokens.push(")".to_string());
        }
        Protocol { tokens }
    }

    /// 缩进排版，见 [`printer::render`]。
    pub fn render(&self, indent: usize, origin: &str, diagnostics: &mut Diagnostics) -> String {
        printer::render(&self.tokens, indent, origin, diagnostics)
    }
}

impl Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tokens.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_qualifies_bare_receive_events() {
        let mut diagnostics = Diagnostics::new();
        let protocol = Protocol::parse("?m ; !out.x ; ?Other.n");
        let extended = protocol.extend("Dev", "F.bp", &mut diagnostics);
        assert_eq!(extended.to_string(), "( ? Dev.m ; ! out.x ; ? Other.n ) *");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn extend_does_not_double_qualify() {
        let mut diagnostics = Diagnostics::new();
        let once = Protocol::parse("?m").extend("Dev", "F.bp", &mut diagnostics);
        let twice = once.extend("Dev", "F.bp", &mut diagnostics);
        assert_eq!(twice.to_string(), "( ( ? Dev.m ) * ) *");
        assert_eq!(twice.tokens().iter().filter(|t| t.contains("Dev.Dev")).count(), 0);
    }

    #[test]
    fn extend_leaves_non_identifiers_alone() {
        let mut diagnostics = Diagnostics::new();
        let protocol = Protocol::parse("? ( ?m ) ; ?NULL ; ?1x");
        let extended = protocol.extend("Dev", "F.bp", &mut diagnostics);
        assert_eq!(extended.to_string(), "( ? ( ? Dev.m ) ; ? NULL ; ? 1x ) *");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn extend_reports_dangling_receive() {
        let mut diagnostics = Diagnostics::new();
        Protocol::parse("!a ; ?").extend("Dev", "F.bp", &mut diagnostics);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn merge_cardinalities() {
        assert!(Protocol::merge(vec![]).is_empty());

        let single = Protocol::parse("!a");
        assert_eq!(Protocol::merge(vec![single.clone()]), single);

        let merged = Protocol::merge(vec![
            Protocol::parse("!a"),
            Protocol::parse("?b"),
            Protocol::parse("NULL"),
        ]);
        assert_eq!(merged.to_string(), "( ! a ) + ( ? b ) + ( NULL )");
    }
}
