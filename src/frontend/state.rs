//! 解析器状态。
//!
//! 每个类别同时至多有一个活动的子状态，因此状态用嵌套的枚举表示。

use std::ops::Range;

use crate::ast::Port;

use super::tokenizer::Token;

/// 注释
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comment {
    /// 不在注释中
    None,
    /// `/* ... */`
    Block,
    /// `# ...` 直到行尾
    Line,
}

/// 包含指令 `[path]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Include {
    /// 不在包含指令中
    None,
    /// 已读到 `[`，等待路径
    Path,
    /// 等待 `]`
    Close,
}

/// 顶层声明
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    /// 声明之间
    Top,
    /// 读到 `system`，等待 `architecture`
    System,
    /// `frame`
    Frame(FrameDecl),
    /// `interface`
    Interface(InterfaceDecl),
    /// `architecture`
    Architecture(ArchDecl),
    /// 出错后跳过，直到花括号深度为 0 处的下一个顶层关键字
    Skip(usize),
}

impl Decl {
    /// 当前声明的种类与名称。
    pub fn describe(&self) -> Option<(&'static str, &str)> {
        match self {
            Decl::Frame(decl) => Some(("frame", &decl.name)),
            Decl::Interface(decl) => Some(("interface", &decl.name)),
            Decl::Architecture(decl) => Some(("architecture", &decl.name)),
            Decl::System => Some(("architecture", "")),
            Decl::Top | Decl::Skip(_) => None,
        }
    }

    /// 是否正在收集协议文本。
    pub fn is_capturing(&self) -> bool {
        matches!(
            self,
            Decl::Frame(FrameDecl {
                phase: FramePhase::Body(FrameSection::Protocol(_)),
                ..
            }) | Decl::Interface(InterfaceDecl {
                phase: InterfacePhase::Body(InterfaceSection::Protocol(_)),
                ..
            })
        )
    }
}

/// `frame NAME ...`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameDecl {
    /// 名称，读到之前为空
    pub name: String,
    /// 阶段
    pub phase: FramePhase,
}

/// 帧声明的阶段
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FramePhase {
    /// 等待名称
    #[default]
    Name,
    /// 等待 `{` 或 `;`
    Head,
    /// 帧体
    Body(FrameSection),
    /// 帧体结束，等待 `;`
    Fin,
}

/// 帧体中的小节
#[derive(Debug, Clone, PartialEq)]
pub enum FrameSection {
    /// 小节之间
    Idle,
    /// `provides:` 或 `requires:` 中的 `INTERFACE VAR;`
    Ports(Side, Pair),
    /// 读到 `protocol:`，等待 `{`
    ProtocolOpen,
    /// 协议文本
    Protocol(Capture),
}

/// 提供还是需要
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// `provides:`
    Provides,
    /// `requires:`
    Requires,
}

/// `INTERFACE VAR ;`
#[derive(Debug, Clone, PartialEq)]
pub enum Pair {
    /// 等待接口名
    Iface,
    /// 等待变量名
    Var(String),
    /// 等待 `;`
    Fin,
}

/// `interface NAME ...`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterfaceDecl {
    /// 名称，读到之前为空
    pub name: String,
    /// 阶段
    pub phase: InterfacePhase,
}

/// 接口声明的阶段
#[derive(Debug, Clone, Default, PartialEq)]
pub enum InterfacePhase {
    /// 等待名称
    #[default]
    Name,
    /// 等待 `extends`、`{` 或 `;`；参数表示是否已读过 `extends`
    Head(bool),
    /// 等待父接口名
    Extends,
    /// 接口体
    Body(InterfaceSection),
    /// 接口体结束，等待 `;`
    Fin,
}

/// 接口体中的小节
#[derive(Debug, Clone, PartialEq)]
pub enum InterfaceSection {
    /// 小节之间
    Idle,
    /// 方法原型
    Method(Method),
    /// 读到 `protocol:`，等待 `{`
    ProtocolOpen,
    /// 协议文本
    Protocol(Capture),
}

/// `RETURNTYPE NAME ( ... ) ;`
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    /// 目前为止的原型文本
    pub text: String,
    /// 步骤
    pub step: MethodStep,
}

/// 方法原型的步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodStep {
    /// 等待方法名
    Name,
    /// 等待 `(`
    LeftPar,
    /// 参数列表，原样保留
    Params {
        /// 圆括号深度
        depth: usize,
        /// 上一个单元是否为 `(`
        open: bool,
    },
    /// 等待 `;`
    Fin,
}

/// `architecture NAME ...`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArchDecl {
    /// 名称，读到之前为空
    pub name: String,
    /// 是否为 `system architecture`
    pub system: bool,
    /// 阶段
    pub phase: ArchPhase,
}

/// 体系结构声明的阶段
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ArchPhase {
    /// 等待名称
    #[default]
    Name,
    /// 等待 `{` 或 `;`
    Head,
    /// 体系结构体
    Body(ArchStmt),
    /// 体系结构体结束，等待 `;`
    Fin,
}

/// 体系结构体中的语句
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub enum ArchStmt {
    /// 语句之间
    Idle,
    /// `inst TYPE VAR`：等待类型
    InstType,
    /// `inst TYPE VAR`：等待变量名
    InstVar(String),
    /// `bind A:B to C:D`
    BindFrom,
    BindTo(Port),
    BindDest(Port),
    /// `delegate A to B:C`
    DelegateFrom,
    DelegateTo(String),
    DelegateDest(String),
    /// `subsume A:B to C`
    SubsumeFrom,
    SubsumeTo(Port),
    SubsumeDest(Port),
    /// 等待 `;`
    Fin,
}

/// 正在收集的协议文本，记录起点与花括号深度
#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    /// 协议文本所在的文件
    pub file: String,
    /// 起始偏移（`{` 之后）
    pub start: usize,
    /// 花括号深度
    pub depth: usize,
}

impl Capture {
    /// 从 `{` 之后开始收集。
    pub fn new(file: &str, open: &Token) -> Self {
        Self {
            file: file.to_string(),
            start: open.end(),
            depth: 1,
        }
    }

    /// 读入一个词法单元；遇到匹配的 `}` 时返回协议文本的范围。
    pub fn step(&mut self, token: &Token) -> Option<Range<usize>> {
        match token.text {
            "{" => self.depth += 1,
            "}" => {
                self.depth -= 1;
                if self.depth == 0 {
                    return Some(self.start..token.start);
                }
            }
            _ => {}
        }
        None
    }
}

/// 标识符：字母或下划线开头，由字母、数字、下划线组成。
pub fn is_identifier(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// 端口描述符 `a:b`，两边都是标识符。
pub fn descriptor(token: &str) -> Option<Port> {
    let (instance, member) = token.split_once(':')?;
    if is_identifier(instance) && is_identifier(member) {
        Some(Port::new(instance, member))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers() {
        assert!(is_identifier("_dev0"));
        assert!(is_identifier("Fat"));
        assert!(!is_identifier("0dev"));
        assert!(!is_identifier("a.b"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn descriptors() {
        assert_eq!(descriptor("vfs:fs"), Some(Port::new("vfs", "fs")));
        assert_eq!(descriptor("vfs:fs:x"), None);
        assert_eq!(descriptor("vfs"), None);
        assert_eq!(descriptor(":fs"), None);
    }

    #[test]
    fn capture_tracks_nested_braces() {
        let open = Token { text: "{", start: 10 };
        let mut capture = Capture::new("f.adl", &open);
        assert_eq!(capture.step(&Token { text: "{", start: 15 }), None);
        assert_eq!(capture.step(&Token { text: "}", start: 20 }), None);
        assert_eq!(capture.step(&Token { text: "}", start: 25 }), Some(11..25));
    }
}
