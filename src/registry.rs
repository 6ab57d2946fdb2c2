//! 符号表。
//!
//! 解析阶段写入，展平阶段只读。各表保持插入顺序，因此遍历结果是确定的。

use std::collections::HashMap;

use crate::{
    ast::{Architecture, Frame, Interface},
    diagnostic::{Diagnostic, DiagnosticKind, Diagnostics},
    protocol::Protocol,
};

/// 按名称索引、保持插入顺序的表
#[derive(Debug, Clone)]
pub struct Table<T> {
    items: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            items: vec![],
            index: HashMap::new(),
        }
    }
}

impl<T> Table<T> {
    /// 按名称查找。
    pub fn get(&self, name: &str) -> Option<&T> {
        self.index.get(name).map(|&i| &self.items[i])
    }

    /// 按名称查找，不存在时插入 `make()` 的结果。
    pub fn get_or_insert_with(&mut self, name: &str, make: impl FnOnce() -> T) -> &mut T {
        let i = match self.index.get(name) {
            Some(&i) => i,
            None => {
                self.items.push(make());
                self.index.insert(name.to_string(), self.items.len() - 1);
                self.items.len() - 1
            }
        };
        &mut self.items[i]
    }

    /// 按插入顺序遍历。
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// 条目数。
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// 是否为空。
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// 符号表
#[derive(Debug, Clone, Default)]
pub struct Registry {
    /// 帧
    pub frames: Table<Frame>,
    /// 接口
    pub interfaces: Table<Interface>,
    /// 体系结构
    pub architectures: Table<Architecture>,
}

impl Registry {
    /// 创建空的符号表。
    pub fn new() -> Self {
        Self::default()
    }

    /// 查找帧。
    pub fn frame(&self, name: &str) -> Option<&Frame> {
        self.frames.get(name)
    }

    /// 查找接口。
    pub fn interface(&self, name: &str) -> Option<&Interface> {
        self.interfaces.get(name)
    }

    /// 查找体系结构。
    pub fn architecture(&self, name: &str) -> Option<&Architecture> {
        self.architectures.get(name)
    }

    /// 取得帧，不存在时登记一个只有名称的帧。
    pub fn frame_mut(&mut self, name: &str) -> &mut Frame {
        self.frames.get_or_insert_with(name, || Frame {
            name: name.to_string(),
            ..Default::default()
        })
    }

    /// 取得接口，不存在时登记一个只有名称的接口。
    pub fn interface_mut(&mut self, name: &str) -> &mut Interface {
        self.interfaces.get_or_insert_with(name, || Interface {
            name: name.to_string(),
            ..Default::default()
        })
    }

    /// 取得体系结构，不存在时登记一个只有名称的体系结构。
    pub fn architecture_mut(&mut self, name: &str) -> &mut Architecture {
        self.architectures.get_or_insert_with(name, || Architecture {
            name: name.to_string(),
            ..Default::default()
        })
    }

    /// 系统体系结构。
    ///
    /// 按登记顺序取第一个带有系统标记的体系结构；有多个时报告诊断信息。
    pub fn system_architecture(&self, diagnostics: &mut Diagnostics) -> Option<&Architecture> {
        let mut systems = self.architectures.iter().filter(|arch| arch.is_system);
        let first = systems.next()?;
        let others = systems.map(|arch| arch.name.as_str()).collect::<Vec<_>>();
        if !others.is_empty() {
            diagnostics.report(Diagnostic::new(
                DiagnosticKind::Reference,
                &first.file,
                format!(
                    "Multiple system architectures defined ({}), using '{}'",
                    others.join(", "),
                    first.name
                ),
            ));
        }
        Some(first)
    }

    /// 沿 `extends` 链收集祖先接口的协议，最近的祖先在前。
    pub fn inherited_protocols<'a>(
        &'a self,
        iface: &'a Interface,
        diagnostics: &mut Diagnostics,
    ) -> Vec<&'a Protocol> {
        let mut result = vec![];
        let mut visited = vec![iface.name.as_str()];
        let mut current = iface;

        while let Some(parent) = &current.extends {
            if visited.contains(&parent.as_str()) {
                diagnostics.report(Diagnostic::new(
                    DiagnosticKind::Cycle,
                    &current.file,
                    format!("Cyclic inheritance through '{}' in interface '{}'", parent, current.name),
                ));
                break;
            }

            let Some(supiface) = self.interface(parent) else {
                diagnostics.report(Diagnostic::new(
                    DiagnosticKind::Reference,
                    &current.file,
                    format!("Extends unknown interface '{}' in interface '{}'", parent, current.name),
                ));
                break;
            };

            if let Some(protocol) = &supiface.protocol {
                result.push(protocol);
            }
            visited.push(&supiface.name);
            current = supiface;
        }

        result
    }
}
