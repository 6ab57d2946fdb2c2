//! 体系结构展平。
//!
//! 从系统体系结构出发遍历实例化树，为每个帧实例生成限定名称，
//! 收集绑定，并把委托与包含改写为端点之间的直接绑定。

use std::collections::{BTreeMap, BTreeSet, HashSet};

use thiserror::Error;

use crate::{
    ast::{Architecture, Bind, Frame, Port},
    diagnostic::{Diagnostic, DiagnosticKind, Diagnostics},
    registry::Registry,
};

/// 展平失败
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlattenError {
    /// 没有系统体系结构
    #[error("No system architecture defined")]
    NoSystemArchitecture,
}

/// 帧实例
#[derive(Debug, Clone, PartialEq)]
pub struct Instance<'a> {
    /// 限定名称
    pub name: String,
    /// 实例化的帧
    pub frame: &'a Frame,
}

/// 端口改写规则：凡是出现 `declared` 的地方改为 `replacement`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    /// 对外声明的端口
    pub declared: Port,
    /// 实际的端口
    pub replacement: Port,
    /// 声明该规则的文件
    pub file: String,
}

/// 展平结果
#[derive(Debug, Clone, PartialEq)]
pub struct Flattened<'a> {
    /// 系统体系结构的名称
    pub system: String,
    /// 帧实例，按遍历顺序
    pub instances: Vec<Instance<'a>>,
    /// 限定后的绑定
    pub binds: Vec<Bind>,
    /// 委托：改写绑定的目标
    pub delegates: Vec<Rewrite>,
    /// 包含：改写绑定的源
    pub subsumes: Vec<Rewrite>,
}

/// 为名称加上前缀，顶层的前缀为空。
pub fn qualify(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}_{}", prefix, name)
    }
}

/// 展平系统体系结构。
pub fn flatten<'a>(registry: &'a Registry, diagnostics: &mut Diagnostics) -> Result<Flattened<'a>, FlattenError> {
    let system = registry
        .system_architecture(diagnostics)
        .ok_or(FlattenError::NoSystemArchitecture)?;
    tracing::debug!(system = %system.name, "flattening");

    let mut flattener = Flattener {
        registry,
        diagnostics,
        stack: vec![],
        result: Flattened {
            system: system.name.clone(),
            instances: vec![],
            binds: vec![],
            delegates: vec![],
            subsumes: vec![],
        },
    };
    flattener.walk(system, "");
    Ok(flattener.result)
}

struct Flattener<'a, 'd> {
    registry: &'a Registry,
    diagnostics: &'d mut Diagnostics,
    /// 正在展开的体系结构
    stack: Vec<&'a str>,
    result: Flattened<'a>,
}

impl<'a> Flattener<'a, '_> {
    fn walk(&mut self, arch: &'a Architecture, prefix: &str) {
        self.stack.push(&arch.name);

        for inst in &arch.insts {
            if let Some(sub) = self.registry.architecture(&inst.ty) {
                if self.stack.contains(&sub.name.as_str()) {
                    self.report(
                        DiagnosticKind::Cycle,
                        arch,
                        format!("Architecture '{}' instantiates itself through '{}'", sub.name, inst.var),
                    );
                    continue;
                }
                self.walk(sub, &qualify(prefix, &sub.name));
            } else if let Some(frame) = self.registry.frame(&inst.ty) {
                self.result.instances.push(Instance {
                    name: qualify(prefix, &inst.var),
                    frame,
                });
            } else {
                self.report(
                    DiagnosticKind::Reference,
                    arch,
                    format!("Unknown frame or architecture '{}' for instance '{}'", inst.ty, inst.var),
                );
            }
        }

        let port = |port: &Port| Port::new(qualify(prefix, &port.instance), &port.member);

        for bind in &arch.binds {
            self.result.binds.push(Bind {
                from: port(&bind.from),
                to: port(&bind.to),
            });
        }

        let top = self.stack.len() == 1;
        for delegate in &arch.delegates {
            if top {
                let message = format!("Delegate '{}' is not allowed in the system architecture", delegate.from);
                self.report(DiagnosticKind::Reference, arch, message);
                continue;
            }
            self.result.delegates.push(Rewrite {
                declared: Port::new(prefix, &delegate.from),
                replacement: port(&delegate.to),
                file: arch.file.clone(),
            });
        }
        for subsume in &arch.subsumes {
            if top {
                let message = format!("Subsume '{}' is not allowed in the system architecture", subsume.to);
                self.report(DiagnosticKind::Reference, arch, message);
                continue;
            }
            self.result.subsumes.push(Rewrite {
                declared: Port::new(prefix, &subsume.to),
                replacement: port(&subsume.from),
                file: arch.file.clone(),
            });
        }

        self.stack.pop();
    }

    fn report(&mut self, kind: DiagnosticKind, arch: &Architecture, message: String) {
        let message = format!("{} in architecture '{}'", message, arch.name);
        self.diagnostics.report(Diagnostic::new(kind, &arch.file, message));
    }
}

/// 反复应用委托与包含规则，直到没有绑定再被改写。
///
/// 每条改写产生的绑定都记录其来历；若改写结果在来历中已经出现，
/// 说明规则构成环，报告诊断信息并丢弃这条绑定。
pub fn flatten_binds(
    binds: &[Bind],
    delegates: &[Rewrite],
    subsumes: &[Rewrite],
    diagnostics: &mut Diagnostics,
) -> Vec<Bind> {
    let mut current = binds.iter().map(|bind| (bind.clone(), vec![])).collect::<Vec<_>>();

    loop {
        let mut changed = false;
        let mut seen = HashSet::new();
        let mut next = vec![];

        for (bind, mut ancestry) in current {
            let rewrites = delegates
                .iter()
                .filter(|rule| rule.declared == bind.to)
                .map(|rule| {
                    let rewritten = Bind {
                        from: bind.from.clone(),
                        to: rule.replacement.clone(),
                    };
                    (rewritten, rule)
                })
                .chain(
                    subsumes
                        .iter()
                        .filter(|rule| rule.declared == bind.from)
                        .map(|rule| {
                            let rewritten = Bind {
                                from: rule.replacement.clone(),
                                to: bind.to.clone(),
                            };
                            (rewritten, rule)
                        }),
                )
                .collect::<Vec<_>>();

            if rewrites.is_empty() {
                if seen.insert(bind.clone()) {
                    next.push((bind, ancestry));
                }
                continue;
            }

            changed = true;
            ancestry.push(bind);
            for (rewritten, rule) in rewrites {
                if ancestry.contains(&rewritten) {
                    diagnostics.report(Diagnostic::new(
                        DiagnosticKind::Cycle,
                        &rule.file,
                        format!("Cyclic delegation or subsumption at binding {}", rewritten),
                    ));
                    continue;
                }
                if seen.insert(rewritten.clone()) {
                    next.push((rewritten, ancestry.clone()));
                }
            }
        }

        current = next;
        if !changed {
            break;
        }
    }

    current.into_iter().map(|(bind, _)| bind).collect()
}

/// 按目标端口分组，每个目标对应其全部源端口。
pub fn direct_binds(binds: &[Bind]) -> BTreeMap<Port, BTreeSet<Port>> {
    let mut result = BTreeMap::<Port, BTreeSet<Port>>::new();
    for bind in binds {
        result.entry(bind.to.clone()).or_default().insert(bind.from.clone());
    }
    result
}
