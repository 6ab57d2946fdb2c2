//! 体系结构描述语言解析器。
//!
//! 逐个读入词法单元，识别 `frame`、`interface`、`architecture` 与
//! `system architecture` 声明，把符号登记到 [`Registry`]，同时输出重新排版的源文本。

use crate::{
    ast::{Bind, Delegate, Inst, InterfaceVar, Subsume},
    diagnostic::{Diagnostic, DiagnosticKind, Diagnostics},
    protocol::{loader, Protocol},
    registry::Registry,
    source::SourceFile,
};

use super::{
    include::IncludeResolver,
    state::*,
    tokenizer::{tokenize, Token, ADL_DELIMITERS},
};

/// 解析一个源文件，返回重新排版后的文本。
pub fn parse(
    file: &SourceFile,
    registry: &mut Registry,
    includes: &IncludeResolver,
    diagnostics: &mut Diagnostics,
) -> String {
    let mut parser = Parser {
        registry,
        includes,
        diagnostics,
        output: String::new(),
        comment: Comment::None,
        include: Include::None,
        decl: Decl::Top,
        stack: vec![],
    };
    parser.feed(file);
    parser.finish(file)
}

struct Parser<'a, 'fs> {
    registry: &'a mut Registry,
    includes: &'a IncludeResolver<'fs>,
    diagnostics: &'a mut Diagnostics,
    output: String,
    comment: Comment,
    include: Include,
    decl: Decl,
    /// Files being parsed, outermost first.
    stack: Vec<String>,
}

/// Declarations seen again through an include do not repeat their entries.
fn add<T: PartialEq>(list: &mut Vec<T>, item: T) {
    if !list.contains(&item) {
        list.push(item);
    }
}

impl Parser<'_, '_> {
    fn feed(&mut self, file: &SourceFile) {
        tracing::debug!(file = %file.name, "parsing");
        self.stack.push(file.name.clone());

        for token in tokenize(&file.text, ADL_DELIMITERS, true, true) {
            self.token(file, token);
        }

        self.comment = Comment::None;
        if self.include != Include::None {
            self.diagnostics.report(Diagnostic::new(
                DiagnosticKind::Syntax,
                &file.name,
                "Unterminated include directive",
            ));
            self.include = Include::None;
        }
        if self.decl.is_capturing() {
            let message = match self.decl.describe() {
                Some((kind, name)) => format!("Unterminated protocol in {} '{}'", kind, name),
                None => "Unterminated protocol".to_string(),
            };
            self.diagnostics
                .report(Diagnostic::new(DiagnosticKind::Syntax, &file.name, message));
            self.decl = Decl::Skip(1);
        }

        self.stack.pop();
    }

    fn finish(self, file: &SourceFile) -> String {
        if let Some((kind, name)) = self.decl.describe() {
            self.diagnostics.report(Diagnostic::new(
                DiagnosticKind::Syntax,
                &file.name,
                format!("Unexpected end of file in {} '{}'", kind, name),
            ));
        }

        let output = self.output.trim();
        if output.is_empty() {
            "/* Empty */\n".to_string()
        } else {
            format!("{}\n", output)
        }
    }

    fn token(&mut self, file: &SourceFile, token: Token) {
        match self.comment {
            Comment::Block => {
                if token == "*/" {
                    self.comment = Comment::None;
                }
                return;
            }
            Comment::Line => {
                if token == "\n" {
                    self.comment = Comment::None;
                }
                return;
            }
            Comment::None => {}
        }

        match token.text {
            "/*" => {
                self.comment = Comment::Block;
                return;
            }
            "#" => {
                self.comment = Comment::Line;
                return;
            }
            "\n" => return,
            _ => {}
        }

        // Protocol text is handed over verbatim, includes in it are resolved
        // by the protocol loader.
        if !self.decl.is_capturing() {
            match self.include {
                Include::None if token == "[" => {
                    self.include = Include::Path;
                    return;
                }
                Include::None => {}
                Include::Path => {
                    self.include = Include::None;
                    self.include_file(file, &token);
                    self.include = Include::Close;
                    return;
                }
                Include::Close => {
                    self.include = Include::None;
                    if token != "]" {
                        self.report(file, &token, "Expected ]".to_string());
                    }
                    return;
                }
            }
        }

        let decl = std::mem::replace(&mut self.decl, Decl::Top);
        self.decl = self.step(decl, file, token);
    }

    fn include_file(&mut self, file: &SourceFile, token: &Token) {
        match self.includes.load(token.text, file) {
            Ok(included) if self.stack.contains(&included.name) => {
                let message = format!("File {} includes itself", included.name);
                self.diagnostics.report(
                    Diagnostic::new(DiagnosticKind::Cycle, &file.name, message)
                        .with_span(&file.text, token.start, token.end()),
                );
            }
            Ok(included) => self.feed(&included),
            Err(diagnostic) => self
                .diagnostics
                .report(diagnostic.with_span(&file.text, token.start, token.end())),
        }
    }

    fn report(&mut self, file: &SourceFile, token: &Token, message: String) {
        self.diagnostics.report(
            Diagnostic::new(DiagnosticKind::Syntax, &file.name, message)
                .with_span(&file.text, token.start, token.end()),
        );
    }

    /// Reports an unexpected token and skips the rest of the declaration.
    /// `depth` is the brace depth the offending token was found at.
    fn error(&mut self, file: &SourceFile, token: Token, expected: &str, decl: (&str, &str), depth: usize) -> Decl {
        let (kind, name) = decl;
        let message = if name.is_empty() {
            format!("{} in {}, found '{}'", expected, kind, token)
        } else {
            format!("{} in {} '{}', found '{}'", expected, kind, name, token)
        };
        self.report(file, &token, message);
        self.skip(depth, file, token)
    }

    fn step(&mut self, decl: Decl, file: &SourceFile, token: Token) -> Decl {
        match decl {
            Decl::Top => self.top(file, token),
            Decl::System => {
                if token != "architecture" {
                    return self.error(file, token, "Expected 'architecture'", ("system", ""), 0);
                }
                self.output.push_str("architecture ");
                Decl::Architecture(ArchDecl {
                    system: true,
                    ..Default::default()
                })
            }
            Decl::Frame(decl) => self.frame(decl, file, token),
            Decl::Interface(decl) => self.interface(decl, file, token),
            Decl::Architecture(decl) => self.architecture(decl, file, token),
            Decl::Skip(depth) => self.skip(depth, file, token),
        }
    }

    fn top(&mut self, file: &SourceFile, token: Token) -> Decl {
        match token.text {
            "frame" => {
                self.output.push_str("\n\nframe ");
                Decl::Frame(FrameDecl::default())
            }
            "interface" => {
                self.output.push_str("\n\ninterface ");
                Decl::Interface(InterfaceDecl::default())
            }
            "architecture" => {
                self.output.push_str("\n\narchitecture ");
                Decl::Architecture(ArchDecl::default())
            }
            "system" => {
                self.output.push_str("\n\nsystem ");
                Decl::System
            }
            _ => {
                self.report(file, &token, format!("Unknown token '{}'", token));
                Decl::Top
            }
        }
    }

    fn skip(&mut self, depth: usize, file: &SourceFile, token: Token) -> Decl {
        match token.text {
            "{" => Decl::Skip(depth + 1),
            "}" => Decl::Skip(depth.saturating_sub(1)),
            "frame" | "interface" | "architecture" | "system" if depth == 0 => self.top(file, token),
            _ => Decl::Skip(depth),
        }
    }

    /// Loads the captured protocol text and echoes it.
    fn protocol(&mut self, file: &SourceFile, range: std::ops::Range<usize>) -> Protocol {
        let protocol = loader::load(file, range, self.includes, self.diagnostics);
        let rendered = protocol.render(2, &file.name, self.diagnostics);
        self.output.push_str(&format!("\n{}\n\t}}", rendered));
        protocol
    }

    fn open_protocol(&mut self, file: &SourceFile, token: &Token) -> Option<Capture> {
        if token != "{" {
            return None;
        }
        self.output.push_str(" {");
        Some(Capture::new(&file.name, token))
    }

    // frame NAME { provides: ... requires: ... protocol: { ... } };

    fn frame(&mut self, decl: FrameDecl, file: &SourceFile, token: Token) -> Decl {
        let FrameDecl { name, phase } = decl;
        let phase = match phase {
            FramePhase::Name => {
                if !is_identifier(token.text) {
                    return self.error(file, token, "Expected frame name", ("frame", ""), 0);
                }
                let frame = self.registry.frame_mut(token.text);
                if frame.file.is_empty() {
                    frame.file = file.name.clone();
                }
                self.output.push_str(token.text);
                return Decl::Frame(FrameDecl {
                    name: token.text.to_string(),
                    phase: FramePhase::Head,
                });
            }
            FramePhase::Head => match token.text {
                "{" => {
                    self.output.push_str(" {");
                    FramePhase::Body(FrameSection::Idle)
                }
                ";" => {
                    self.output.push_str(";\n");
                    return Decl::Top;
                }
                _ => return self.error(file, token, "Unknown token in head", ("frame", name.as_str()), 0),
            },
            FramePhase::Body(section) => return self.frame_body(name, section, file, token),
            FramePhase::Fin => {
                if token != ";" {
                    return self.error(file, token, "Expected ';'", ("frame", name.as_str()), 0);
                }
                self.output.push_str(";\n");
                return Decl::Top;
            }
        };
        Decl::Frame(FrameDecl { name, phase })
    }

    fn frame_body(&mut self, name: String, section: FrameSection, file: &SourceFile, token: Token) -> Decl {
        let section = match section {
            FrameSection::Idle => match token.text {
                "}" => {
                    self.output.push_str("\n}");
                    return Decl::Frame(FrameDecl {
                        name,
                        phase: FramePhase::Fin,
                    });
                }
                "provides:" | "requires:" => {
                    self.output.push_str(&format!("\n\t{}", token));
                    let side = if token == "provides:" {
                        Side::Provides
                    } else {
                        Side::Requires
                    };
                    FrameSection::Ports(side, Pair::Iface)
                }
                "protocol:" => {
                    self.output.push_str("\n\tprotocol:");
                    FrameSection::ProtocolOpen
                }
                _ => return self.error(file, token, "Unknown token", ("frame", name.as_str()), 1),
            },
            FrameSection::Ports(_, Pair::Iface) if token == "}" || token.text.ends_with(':') => {
                return self.frame_body(name, FrameSection::Idle, file, token);
            }
            FrameSection::Ports(side, Pair::Iface) => {
                if !is_identifier(token.text) {
                    return self.error(file, token, "Interface name expected", ("frame", name.as_str()), 1);
                }
                self.output.push_str(&format!("\n\t\t{} ", token));
                FrameSection::Ports(side, Pair::Var(token.text.to_string()))
            }
            FrameSection::Ports(side, Pair::Var(iface)) => {
                if !is_identifier(token.text) {
                    return self.error(file, token, "Variable name expected", ("frame", name.as_str()), 1);
                }
                let entry = InterfaceVar {
                    iface,
                    var: token.text.to_string(),
                };
                let frame = self.registry.frame_mut(&name);
                match side {
                    Side::Provides => add(&mut frame.provides, entry),
                    Side::Requires => add(&mut frame.requires, entry),
                }
                self.output.push_str(token.text);
                FrameSection::Ports(side, Pair::Fin)
            }
            FrameSection::Ports(side, Pair::Fin) => {
                if token != ";" {
                    return self.error(file, token, "Expected ';'", ("frame", name.as_str()), 1);
                }
                self.output.push(';');
                FrameSection::Ports(side, Pair::Iface)
            }
            FrameSection::ProtocolOpen => match self.open_protocol(file, &token) {
                Some(capture) => FrameSection::Protocol(capture),
                None => return self.error(file, token, "Expected '{'", ("frame", name.as_str()), 1),
            },
            FrameSection::Protocol(mut capture) => match capture.step(&token) {
                None => FrameSection::Protocol(capture),
                Some(range) => {
                    let protocol = self.protocol(file, range);
                    let slot = &mut self.registry.frame_mut(&name).protocol;
                    let conflict = match slot {
                        Some(existing) => *existing != protocol,
                        None => {
                            *slot = Some(protocol);
                            false
                        }
                    };
                    if conflict {
                        self.report(file, &token, format!("Protocol for frame '{}' already defined", name));
                    }
                    FrameSection::Idle
                }
            },
        };
        Decl::Frame(FrameDecl {
            name,
            phase: FramePhase::Body(section),
        })
    }

    // interface NAME [extends NAME] { RET method(...); protocol: { ... } };

    fn interface(&mut self, decl: InterfaceDecl, file: &SourceFile, token: Token) -> Decl {
        let InterfaceDecl { name, phase } = decl;
        let phase = match phase {
            InterfacePhase::Name => {
                if !is_identifier(token.text) {
                    return self.error(file, token, "Expected interface name", ("interface", ""), 0);
                }
                let iface = self.registry.interface_mut(token.text);
                if iface.file.is_empty() {
                    iface.file = file.name.clone();
                }
                self.output.push_str(token.text);
                return Decl::Interface(InterfaceDecl {
                    name: token.text.to_string(),
                    phase: InterfacePhase::Head(false),
                });
            }
            InterfacePhase::Head(extended) => match token.text {
                "extends" if !extended => {
                    self.output.push_str(" extends ");
                    InterfacePhase::Extends
                }
                "{" => {
                    self.output.push_str(" {");
                    InterfacePhase::Body(InterfaceSection::Idle)
                }
                ";" => {
                    self.output.push_str(";\n");
                    return Decl::Top;
                }
                _ => return self.error(file, token, "Unknown token in head", ("interface", name.as_str()), 0),
            },
            InterfacePhase::Extends => {
                if !is_identifier(token.text) {
                    return self.error(file, token, "Expected parent interface name", ("interface", name.as_str()), 0);
                }
                let parent = self
                    .registry
                    .interface_mut(&name)
                    .extends
                    .get_or_insert_with(|| token.text.to_string())
                    .clone();
                if parent != token.text {
                    let message = format!("Interface '{}' already extends '{}'", name, parent);
                    self.report(file, &token, message);
                }
                self.output.push_str(token.text);
                InterfacePhase::Head(true)
            }
            InterfacePhase::Body(section) => return self.interface_body(name, section, file, token),
            InterfacePhase::Fin => {
                if token != ";" {
                    return self.error(file, token, "Expected ';'", ("interface", name.as_str()), 0);
                }
                self.output.push_str(";\n");
                return Decl::Top;
            }
        };
        Decl::Interface(InterfaceDecl { name, phase })
    }

    fn interface_body(
        &mut self,
        name: String,
        section: InterfaceSection,
        file: &SourceFile,
        token: Token,
    ) -> Decl {
        let section = match section {
            InterfaceSection::Idle => match token.text {
                "}" => {
                    self.output.push_str("\n}");
                    return Decl::Interface(InterfaceDecl {
                        name,
                        phase: InterfacePhase::Fin,
                    });
                }
                "protocol:" => {
                    self.output.push_str("\n\tprotocol:");
                    InterfaceSection::ProtocolOpen
                }
                ret if is_identifier(ret) => {
                    self.output.push_str(&format!("\n\t{} ", ret));
                    InterfaceSection::Method(Method {
                        text: format!("{} ", ret),
                        step: MethodStep::Name,
                    })
                }
                _ => return self.error(file, token, "Unknown token", ("interface", name.as_str()), 1),
            },
            InterfaceSection::Method(method) => match self.method(&name, method, &token) {
                Ok(Some(method)) => InterfaceSection::Method(method),
                Ok(None) => InterfaceSection::Idle,
                Err(expected) => return self.error(file, token, expected, ("interface", name.as_str()), 1),
            },
            InterfaceSection::ProtocolOpen => match self.open_protocol(file, &token) {
                Some(capture) => InterfaceSection::Protocol(capture),
                None => return self.error(file, token, "Expected '{'", ("interface", name.as_str()), 1),
            },
            InterfaceSection::Protocol(mut capture) => match capture.step(&token) {
                None => InterfaceSection::Protocol(capture),
                Some(range) => {
                    let protocol = self.protocol(file, range);
                    let slot = &mut self.registry.interface_mut(&name).protocol;
                    let conflict = match slot {
                        Some(existing) => *existing != protocol,
                        None => {
                            *slot = Some(protocol);
                            false
                        }
                    };
                    if conflict {
                        self.report(file, &token, format!("Protocol for interface '{}' already defined", name));
                    }
                    InterfaceSection::Idle
                }
            },
        };
        Decl::Interface(InterfaceDecl {
            name,
            phase: InterfacePhase::Body(section),
        })
    }

    /// Advances a method prototype. `Ok(None)` when the prototype is complete,
    /// `Err` names what was expected instead of `token`.
    fn method(&mut self, iface: &str, mut method: Method, token: &Token) -> Result<Option<Method>, &'static str> {
        let piece = match method.step {
            MethodStep::Name => {
                if !is_identifier(token.text) {
                    return Err("Method identifier expected");
                }
                method.step = MethodStep::LeftPar;
                token.text.to_string()
            }
            MethodStep::LeftPar => {
                if token != "(" {
                    return Err("Expected '('");
                }
                method.step = MethodStep::Params {
                    depth: 1,
                    open: true,
                };
                "(".to_string()
            }
            MethodStep::Params { depth, open } => {
                let depth = match token.text {
                    "(" => depth + 1,
                    ")" => depth - 1,
                    _ => depth,
                };
                let piece = if open || token == ")" {
                    token.text.to_string()
                } else {
                    format!(" {}", token)
                };
                method.step = if depth == 0 {
                    MethodStep::Fin
                } else {
                    MethodStep::Params {
                        depth,
                        open: token == "(",
                    }
                };
                piece
            }
            MethodStep::Fin => {
                if token != ";" {
                    return Err("Expected ';'");
                }
                self.output.push(';');
                add(&mut self.registry.interface_mut(iface).methods, method.text);
                return Ok(None);
            }
        };

        self.output.push_str(&piece);
        method.text.push_str(&piece);
        Ok(Some(method))
    }

    // [system] architecture NAME { inst ...; bind ...; delegate ...; subsume ...; };

    fn architecture(&mut self, decl: ArchDecl, file: &SourceFile, token: Token) -> Decl {
        let ArchDecl {
            name,
            system,
            phase,
        } = decl;
        let phase = match phase {
            ArchPhase::Name => {
                if !is_identifier(token.text) {
                    return self.error(file, token, "Expected architecture name", ("architecture", ""), 0);
                }
                let arch = self.registry.architecture_mut(token.text);
                arch.is_system |= system;
                if arch.file.is_empty() {
                    arch.file = file.name.clone();
                }
                self.output.push_str(token.text);
                return Decl::Architecture(ArchDecl {
                    name: token.text.to_string(),
                    system,
                    phase: ArchPhase::Head,
                });
            }
            ArchPhase::Head => match token.text {
                "{" => {
                    self.output.push_str(" {");
                    ArchPhase::Body(ArchStmt::Idle)
                }
                ";" => {
                    self.output.push_str(";\n");
                    return Decl::Top;
                }
                _ => return self.error(file, token, "Unknown token in head", ("architecture", name.as_str()), 0),
            },
            ArchPhase::Body(stmt) => match self.arch_stmt(&name, stmt, &token) {
                Ok(Some(stmt)) => ArchPhase::Body(stmt),
                Ok(None) => ArchPhase::Fin,
                Err(expected) => return self.error(file, token, expected, ("architecture", name.as_str()), 1),
            },
            ArchPhase::Fin => {
                if token != ";" {
                    return self.error(file, token, "Expected ';'", ("architecture", name.as_str()), 0);
                }
                self.output.push_str(";\n");
                return Decl::Top;
            }
        };
        Decl::Architecture(ArchDecl {
            name,
            system,
            phase,
        })
    }

    /// Advances a statement of the architecture body. `Ok(None)` when the
    /// body is closed, `Err` names what was expected instead of `token`.
    fn arch_stmt(&mut self, name: &str, stmt: ArchStmt, token: &Token) -> Result<Option<ArchStmt>, &'static str> {
        let (piece, next) = match stmt {
            ArchStmt::Idle => match token.text {
                "}" => {
                    self.output.push_str("\n}");
                    return Ok(None);
                }
                "inst" => ("\n\tinst ".to_string(), ArchStmt::InstType),
                "bind" => ("\n\tbind ".to_string(), ArchStmt::BindFrom),
                "delegate" => ("\n\tdelegate ".to_string(), ArchStmt::DelegateFrom),
                "subsume" => ("\n\tsubsume ".to_string(), ArchStmt::SubsumeFrom),
                _ => return Err("Unknown token"),
            },

            ArchStmt::InstType => {
                if !is_identifier(token.text) {
                    return Err("Expected frame/architecture type");
                }
                (format!("{} ", token), ArchStmt::InstVar(token.text.to_string()))
            }
            ArchStmt::InstVar(ty) => {
                if !is_identifier(token.text) {
                    return Err("Expected instance name");
                }
                let inst = Inst {
                    ty,
                    var: token.text.to_string(),
                };
                add(&mut self.registry.architecture_mut(name).insts, inst);
                (token.text.to_string(), ArchStmt::Fin)
            }

            ArchStmt::BindFrom => {
                let from = descriptor(token.text).ok_or("Expected interface descriptor")?;
                (format!("{} ", token), ArchStmt::BindTo(from))
            }
            ArchStmt::BindTo(from) => {
                if token != "to" {
                    return Err("Expected 'to'");
                }
                ("to ".to_string(), ArchStmt::BindDest(from))
            }
            ArchStmt::BindDest(from) => {
                let to = descriptor(token.text).ok_or("Expected second interface descriptor")?;
                add(&mut self.registry.architecture_mut(name).binds, Bind { from, to });
                (token.text.to_string(), ArchStmt::Fin)
            }

            ArchStmt::DelegateFrom => {
                if !is_identifier(token.text) {
                    return Err("Expected interface name");
                }
                (format!("{} ", token), ArchStmt::DelegateTo(token.text.to_string()))
            }
            ArchStmt::DelegateTo(from) => {
                if token != "to" {
                    return Err("Expected 'to'");
                }
                ("to ".to_string(), ArchStmt::DelegateDest(from))
            }
            ArchStmt::DelegateDest(from) => {
                let to = descriptor(token.text).ok_or("Expected interface descriptor")?;
                add(&mut self.registry.architecture_mut(name).delegates, Delegate { from, to });
                (token.text.to_string(), ArchStmt::Fin)
            }

            ArchStmt::SubsumeFrom => {
                let from = descriptor(token.text).ok_or("Expected interface descriptor")?;
                (format!("{} ", token), ArchStmt::SubsumeTo(from))
            }
            ArchStmt::SubsumeTo(from) => {
                if token != "to" {
                    return Err("Expected 'to'");
                }
                ("to ".to_string(), ArchStmt::SubsumeDest(from))
            }
            ArchStmt::SubsumeDest(from) => {
                if !is_identifier(token.text) {
                    return Err("Expected interface name");
                }
                let subsume = Subsume {
                    from,
                    to: token.text.to_string(),
                };
                add(&mut self.registry.architecture_mut(name).subsumes, subsume);
                (token.text.to_string(), ArchStmt::Fin)
            }

            ArchStmt::Fin => {
                if token != ";" {
                    return Err("Expected ';'");
                }
                (";".to_string(), ArchStmt::Idle)
            }
        };

        self.output.push_str(&piece);
        Ok(Some(next))
    }
}
