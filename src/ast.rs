//! 声明的数据模型。

use std::fmt::Display;

use crate::protocol::Protocol;

/// 端口描述符 `instance:member`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Port {
    /// 实例名（或接口名）
    pub instance: String,
    /// 成员名
    pub member: String,
}

impl Port {
    /// 创建端口。
    pub fn new(instance: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
            member: member.into(),
        }
    }
}

impl Display for Port {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.instance, self.member)
    }
}

/// `provides:` 或 `requires:` 中的一项：接口名与局部变量名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceVar {
    /// 接口名
    pub iface: String,
    /// 变量名
    pub var: String,
}

/// 帧：叶子组件
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    /// 名称
    pub name: String,
    /// 首次声明所在的文件
    pub file: String,
    /// 自身的协议
    pub protocol: Option<Protocol>,
    /// 提供的接口
    pub provides: Vec<InterfaceVar>,
    /// 需要的接口
    pub requires: Vec<InterfaceVar>,
}

/// 接口
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Interface {
    /// 名称
    pub name: String,
    /// 首次声明所在的文件
    pub file: String,
    /// 父接口（单继承）
    pub extends: Option<String>,
    /// 自身的协议
    pub protocol: Option<Protocol>,
    /// 方法原型，原样保留
    pub methods: Vec<String>,
}

/// `inst TYPE VAR;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inst {
    /// 帧或体系结构的名称
    pub ty: String,
    /// 实例变量名
    pub var: String,
}

/// `bind A:B to C:D;`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bind {
    /// 源端口
    pub from: Port,
    /// 目标端口
    pub to: Port,
}

impl Display for Bind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// `delegate A to B:C;`，把内部端口 `B:C` 以名称 `A` 暴露出去
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delegate {
    /// 对外的端口名
    pub from: String,
    /// 内部端口
    pub to: Port,
}

/// `subsume A:B to C;`，由内部端口 `A:B` 满足对外声明的端口 `C`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subsume {
    /// 内部端口
    pub from: Port,
    /// 对外的端口名
    pub to: String,
}

/// 体系结构：帧与子体系结构的组合
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Architecture {
    /// 名称
    pub name: String,
    /// 首次声明所在的文件
    pub file: String,
    /// 是否为系统体系结构
    pub is_system: bool,
    /// 实例
    pub insts: Vec<Inst>,
    /// 绑定
    pub binds: Vec<Bind>,
    /// 委托
    pub delegates: Vec<Delegate>,
    /// 包含
    pub subsumes: Vec<Subsume>,
}
