//! A preprocessor for component architecture descriptions.
//!
//! Reads frames, interfaces and architectures written in an architecture
//! description language with embedded behavior protocols, flattens the system
//! architecture and emits one behavior protocol per component together with a
//! linking file for a model checker.

#![deny(missing_docs)]

pub mod ast;
pub mod backend;
pub mod diagnostic;
pub mod frontend;
pub mod options;
pub mod protocol;
pub mod registry;
pub mod source;
pub mod target;
pub(crate) mod utils;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use diagnostic::{Diagnostic, DiagnosticKind, Diagnostics};
use frontend::{include::IncludeResolver, tokenizer::tokenize};
use options::Options;
use registry::Registry;
use source::{FileSystem, SourceFile};
use target::Target;

/// 编译器上下文
pub struct Context<'fs> {
    fs: &'fs dyn FileSystem,
    root: PathBuf,
    options: Options,
    registry: Registry,
    diagnostics: Diagnostics,
    /// 重新排版的源文件：输出文件名与内容
    sources: Vec<(String, String)>,
}

/// 一次运行的结果
#[derive(Debug, Default)]
pub struct Report {
    /// 全部诊断信息，按报告顺序
    pub diagnostics: Vec<Diagnostic>,
    /// 展平所用的系统体系结构
    pub system: Option<String>,
}

impl Report {
    /// 是否没有任何诊断信息。
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

impl<'fs> Context<'fs> {
    /// 创建一个新的编译器上下文，`root` 为项目根目录。
    pub fn new(fs: &'fs dyn FileSystem, root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            root: root.into(),
            options: Options::default(),
            registry: Registry::new(),
            diagnostics: Diagnostics::new(),
            sources: vec![],
        }
    }

    /// 设置运行选项。
    pub fn set_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// 是否为源文件：文件名按 `.` 切分后的最后一段等于扩展名。
    pub fn is_source(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            return false;
        };
        tokenize(name, &["."], false, false)
            .last()
            .map_or(false, |token| token.text == self.options.extension)
    }

    /// 解析一个源文件。
    pub fn add_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = SourceFile::load(self.fs, path)
            .with_context(|| format!("Unable to read {}", path.display()))?;

        let includes = IncludeResolver::new(self.fs, &self.root);
        let output = frontend::parser::parse(&file, &mut self.registry, &includes, &mut self.diagnostics);

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.name.clone());
        self.sources.push((name, output));
        Ok(self)
    }

    /// 解析项目根目录下的所有源文件。
    pub fn add_tree(self) -> Result<Self> {
        let files = self
            .fs
            .enumerate(&self.root)
            .with_context(|| format!("Unable to list {}", self.root.display()))?;
        let sources = files
            .into_iter()
            .filter(|path| self.is_source(path))
            .collect::<Vec<_>>();
        tracing::debug!(count = sources.len(), root = %self.root.display(), "sources found");

        sources.into_iter().try_fold(self, |context, path| context.add_file(path))
    }

    /// 展平、链接并写出所有文件。
    pub fn output(mut self, target: &mut dyn Target) -> Result<Report> {
        if self.options.emit_adl {
            for (name, contents) in &self.sources {
                target.write(name, contents)?;
            }
        }

        let system = match backend::flatten::flatten(&self.registry, &mut self.diagnostics) {
            Ok(flattened) => {
                let linked = backend::linker::link(&self.registry, &flattened, &mut self.diagnostics);
                if self.options.emit_bp {
                    for component in &linked.components {
                        target.write_artifact(component)?;
                    }
                }
                if self.options.emit_archbp {
                    target.write_artifact(&linked.linking)?;
                }
                Some(flattened.system)
            }
            Err(error) => {
                tracing::warn!(%error, "skipping linking");
                self.diagnostics.report(Diagnostic::new(
                    DiagnosticKind::Reference,
                    self.root.display().to_string(),
                    error.to_string(),
                ));
                None
            }
        };

        Ok(Report {
            diagnostics: self.diagnostics.into_vec(),
            system,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{source::MemoryFs, target::Memory};
    use pretty_assertions::assert_eq;

    #[test]
    fn source_discovery() {
        let fs = MemoryFs::new();
        let context = Context::new(&fs, "p");
        assert!(context.is_source(Path::new("p/os.adl")));
        assert!(context.is_source(Path::new("p/os.v2.adl")));
        assert!(!context.is_source(Path::new("p/os.adl.bak")));
        assert!(!context.is_source(Path::new("p/osadl")));
        assert!(!context.is_source(Path::new("p/fs.bp")));
    }

    #[test]
    fn sources_in_any_order() {
        let fs = MemoryFs::new()
            .file("p/a/system.adl", "system architecture Os { inst Fs fs; };")
            .file("p/b/frames.adl", "frame Fs { provides: IFs f; };")
            .file("p/b/ifaces.adl", "interface IFs { protocol: { ?open } };")
            .file("p/b/notes.txt", "frame Ignored;");

        let mut target = Memory::new();
        let report = Context::new(&fs, "p")
            .add_tree()
            .unwrap()
            .output(&mut target)
            .unwrap();

        assert!(report.is_clean(), "{:?}", report.diagnostics);
        assert_eq!(report.system.as_deref(), Some("Os"));

        let names = target.names().collect::<Vec<_>>();
        assert_eq!(
            names,
            vec!["Fs.bp", "Os.archbp", "frames.adl", "ifaces.adl", "null.bp", "system.adl"]
        );
        assert_eq!(target.get("Fs.bp"), Some("(\n\t?IFs.open\n)*\n"));
        assert_eq!(
            target.get("Os.archbp"),
            Some("frame \"null.bp\"\ninstantiate fs from \"Fs.bp\"\n")
        );
    }

    #[test]
    fn missing_system_architecture_still_writes_sources() {
        let fs = MemoryFs::new().file("p/f.adl", "frame F;");
        let mut target = Memory::new();
        let report = Context::new(&fs, "p")
            .add_tree()
            .unwrap()
            .output(&mut target)
            .unwrap();

        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.system, None);
        assert_eq!(target.names().collect::<Vec<_>>(), vec!["f.adl"]);
        assert_eq!(target.get("f.adl"), Some("frame F;\n"));
    }

    #[test]
    fn options_select_outputs() {
        let fs = MemoryFs::new().file("p/os.adl", "frame F; system architecture Os { inst F f; };");
        let mut target = Memory::new();
        Context::new(&fs, "p")
            .set_options(Options {
                emit_adl: false,
                emit_bp: false,
                ..Default::default()
            })
            .add_tree()
            .unwrap()
            .output(&mut target)
            .unwrap();

        assert_eq!(target.names().collect::<Vec<_>>(), vec!["Os.archbp"]);
    }

    #[test]
    fn diagnostics_name_the_declaring_file() {
        let fs = MemoryFs::new().file(
            "p/broken.adl",
            "frame A { provides: IMissing m; };\nsystem architecture S { inst A a; inst Ghost g; };",
        );
        let mut target = Memory::new();
        let report = Context::new(&fs, "p")
            .add_tree()
            .unwrap()
            .output(&mut target)
            .unwrap();

        let messages = report.diagnostics.iter().map(ToString::to_string).collect::<Vec<_>>();
        assert_eq!(
            messages,
            vec![
                "p/broken.adl: Unknown frame or architecture 'Ghost' for instance 'g' in architecture 'S'",
                "p/broken.adl: Provided interface 'IMissing' is undefined in frame 'A'",
            ]
        );
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let fs = MemoryFs::new();
        assert!(Context::new(&fs, "p").add_file("p/gone.adl").is_err());
    }
}
