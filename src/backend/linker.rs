//! 链接：为每个帧实例合成协议，并生成描述组件连接关系的链接文件。

use std::fmt::Write;

use crate::{
    ast::Frame,
    diagnostic::{Diagnostic, DiagnosticKind, Diagnostics},
    protocol::{Protocol, NULL},
    registry::Registry,
};

use super::flatten::{direct_binds, flatten_binds, Flattened};

/// 不做任何事的占位组件。
pub const NULL_COMPONENT: &str = "null.bp";

/// 一个输出文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// 文件名
    pub name: String,
    /// 内容
    pub contents: String,
}

/// 链接结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Linked {
    /// 组件协议，第一个总是 [`NULL_COMPONENT`]
    pub components: Vec<Artifact>,
    /// 链接文件 `<system>.archbp`
    pub linking: Artifact,
}

/// 合成帧的完整协议。
///
/// 依次为帧自身的协议，以及每个提供接口的协议和其祖先接口的协议，
/// 后者都以接口名限定并包装为重复。最后以选择运算符合并。
pub fn compose(registry: &Registry, frame: &Frame, diagnostics: &mut Diagnostics) -> Protocol {
    let mut candidates = vec![];
    if let Some(protocol) = &frame.protocol {
        candidates.push(protocol.clone());
    }

    for provided in &frame.provides {
        let Some(iface) = registry.interface(&provided.iface) else {
            diagnostics.report(Diagnostic::new(
                DiagnosticKind::Reference,
                &frame.file,
                format!("Provided interface '{}' is undefined in frame '{}'", provided.iface, frame.name),
            ));
            continue;
        };

        if let Some(protocol) = &iface.protocol {
            candidates.push(protocol.extend(&iface.name, &frame.file, diagnostics));
        }
        for protocol in registry.inherited_protocols(iface, diagnostics) {
            candidates.push(protocol.extend(&iface.name, &frame.file, diagnostics));
        }
    }

    Protocol::merge(candidates)
}

/// 生成组件协议文件与链接文件。
pub fn link(registry: &Registry, flattened: &Flattened, diagnostics: &mut Diagnostics) -> Linked {
    let mut components = vec![Artifact {
        name: NULL_COMPONENT.to_string(),
        contents: format!("{}\n", NULL),
    }];
    let mut linking = format!("frame \"{}\"\n", NULL_COMPONENT);

    for instance in &flattened.instances {
        let frame = instance.frame;
        let name = format!("{}.bp", frame.name);
        writeln!(linking, "instantiate {} from \"{}\"", instance.name, name).ok();

        if components.iter().any(|component| component.name == name) {
            continue;
        }
        let rendered = compose(registry, frame, diagnostics).render(0, &frame.file, diagnostics);
        components.push(Artifact {
            name,
            contents: format!("{}\n", rendered.trim()),
        });
    }

    let binds = flatten_binds(
        &flattened.binds,
        &flattened.delegates,
        &flattened.subsumes,
        diagnostics,
    );
    for (to, sources) in direct_binds(&binds) {
        let sources = sources.iter().map(ToString::to_string).collect::<Vec<_>>();
        writeln!(linking, "bind {} to {}", sources.join(", "), to).ok();
    }

    Linked {
        components,
        linking: Artifact {
            name: format!("{}.archbp", flattened.system),
            contents: format!("{}\n", linking.trim()),
        },
    }
}
