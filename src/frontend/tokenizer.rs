//! 分词器。

use std::cmp::Reverse;

/// Delimiters of the architecture description language.
pub const ADL_DELIMITERS: &[&str] = &[
    "\n", " ", "\t", "(", ")", "{", "}", "[", "]", "/*", "*/", "#", ";",
];

/// Delimiters of the behavior protocol sub-language.
pub const BP_DELIMITERS: &[&str] = &[
    "\n", " ", "\t", "(", ")", "{", "}", "[", "]", "/*", "*/", "#", "*", ";", "+", "||", "|",
    "!", "?",
];

/// 源文本中的一个词法单元
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    /// 文本
    pub text: &'a str,
    /// 在源文本中的字节偏移
    pub start: usize,
}

impl<'a> Token<'a> {
    /// 结束位置（不含）。
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }
}

impl PartialEq<str> for Token<'_> {
    fn eq(&self, other: &str) -> bool {
        self.text == other
    }
}

impl PartialEq<&str> for Token<'_> {
    fn eq(&self, other: &&str) -> bool {
        self.text == *other
    }
}

impl std::fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.text)
    }
}

/// 按分隔符切分文本。
///
/// 每个位置上优先匹配最长的分隔符。`trim` 去掉每个词法单元两端的空格与制表符，
/// 去掉后为空的单元会被丢弃。`separate` 为真时分隔符单独成为一个词法单元，
/// 否则分隔符只作为切分点，并成为下一个词法单元的开头。
pub fn tokenize<'a>(
    text: &'a str,
    delimiters: &[&str],
    trim: bool,
    separate: bool,
) -> Vec<Token<'a>> {
    let mut delimiters = delimiters
        .iter()
        .copied()
        .filter(|d| !d.is_empty())
        .collect::<Vec<_>>();
    delimiters.sort_by_key(|d| Reverse(d.len()));

    let mut tokens = vec![];
    let mut last = 0;
    let mut i = 0;

    while i < text.len() {
        match delimiters.iter().find(|d| text[i..].starts_with(**d)) {
            Some(delim) => {
                if separate {
                    push(&mut tokens, text, last, i, trim);
                    push(&mut tokens, text, i, i + delim.len(), trim);
                    last = i + delim.len();
                } else if i > 0 {
                    push(&mut tokens, text, last, i, trim);
                    last = i;
                }
                i += delim.len();
            }
            None => i += text[i..].chars().next().map_or(1, char::len_utf8),
        }
    }

    push(&mut tokens, text, last, text.len(), trim);
    tokens
}

fn push<'a>(tokens: &mut Vec<Token<'a>>, text: &'a str, start: usize, end: usize, trim: bool) {
    let raw = &text[start..end];
    let (token, start) = if trim {
        let blank = |c: char| c == ' ' || c == '\t';
        let trimmed = raw.trim_start_matches(blank);
        let offset = raw.len() - trimmed.len();
        (trimmed.trim_end_matches(blank), start + offset)
    } else {
        (raw, start)
    };

    if !token.is_empty() {
        tokens.push(Token { text: token, start });
    }
}
