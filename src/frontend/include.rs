//! 包含指令 `[path]` 与 `[path%arg]`。

use std::path::{Path, PathBuf};

use crate::{
    diagnostic::{Diagnostic, DiagnosticKind},
    source::{FileSystem, SourceFile},
};

/// 被包含文件中的替换标记。
pub const MARKER: &str = "%%";

/// 解析后的包含指令
#[derive(Debug, Clone, PartialEq)]
pub struct Include {
    /// 被包含文件的路径
    pub path: PathBuf,
    /// 被包含文件中相对路径的基准目录
    pub root: PathBuf,
    /// 替换 [`MARKER`] 的实参
    pub argument: String,
}

/// 包含指令解析器
pub struct IncludeResolver<'a> {
    fs: &'a dyn FileSystem,
    base: PathBuf,
}

impl<'a> IncludeResolver<'a> {
    /// `base` 是项目根目录，以 `/` 开头的路径相对于它解析。
    pub fn new(fs: &'a dyn FileSystem, base: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            base: base.into(),
        }
    }

    /// 解析指令文本，`root` 为当前目录。
    ///
    /// 相对于项目根目录的文件，其中的包含指令相对于它自己的目录解析；
    /// 相对于当前目录的文件则继续使用原来的当前目录。
    pub fn resolve(&self, directive: &str, root: &Path) -> Include {
        let mut parts = directive.split('%');
        let path = parts.next().unwrap_or_default();
        let argument = parts.next().unwrap_or(MARKER).to_string();
        self.locate(path, root, argument)
    }

    fn locate(&self, path: &str, root: &Path, argument: String) -> Include {
        let (path, root) = match path.strip_prefix('/') {
            Some(absolute) => {
                let path = self.base.join(absolute);
                let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
                (path, root)
            }
            None => (root.join(path), root.to_path_buf()),
        };

        Include {
            path,
            root,
            argument,
        }
    }

    /// 读入被包含的文件并完成标记替换。
    pub fn load(&self, directive: &str, from: &SourceFile) -> Result<SourceFile, Diagnostic> {
        self.read(self.resolve(directive, &from.root), from)
    }

    /// 读入协议中包含的文件。整个指令都是路径，没有实参。
    pub fn load_protocol(&self, path: &str, from: &SourceFile) -> Result<SourceFile, Diagnostic> {
        self.read(self.locate(path, &from.root, MARKER.to_string()), from)
    }

    fn read(&self, include: Include, from: &SourceFile) -> Result<SourceFile, Diagnostic> {
        if !self.fs.is_file(&include.path) {
            return Err(self.missing(&include, from));
        }

        let text = self
            .fs
            .read_to_string(&include.path)
            .map_err(|_| self.missing(&include, from))?;
        tracing::debug!(path = %include.path.display(), "including");

        Ok(SourceFile::new(
            include.path.display().to_string(),
            text.replace(MARKER, &include.argument),
            include.root,
        ))
    }

    fn missing(&self, include: &Include, from: &SourceFile) -> Diagnostic {
        Diagnostic::new(
            DiagnosticKind::Resource,
            &from.name,
            format!("Unable to include file {}", include.path.display()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemoryFs;

    #[test]
    fn relative_include_keeps_current_root() {
        let fs = MemoryFs::new();
        let resolver = IncludeResolver::new(&fs, "proj");
        let include = resolver.resolve("sub/x.adl", Path::new("proj/cur"));
        assert_eq!(include.path, PathBuf::from("proj/cur/sub/x.adl"));
        assert_eq!(include.root, PathBuf::from("proj/cur"));
        assert_eq!(include.argument, MARKER);
    }

    #[test]
    fn rooted_include_uses_its_own_directory() {
        let fs = MemoryFs::new();
        let resolver = IncludeResolver::new(&fs, "proj");
        let include = resolver.resolve("/lib/ifaces/x.adl%fs", Path::new("proj/cur"));
        assert_eq!(include.path, PathBuf::from("proj/lib/ifaces/x.adl"));
        assert_eq!(include.root, PathBuf::from("proj/lib/ifaces"));
        assert_eq!(include.argument, "fs");
    }

    #[test]
    fn load_substitutes_marker() {
        let fs = MemoryFs::new().file("p/gen.adl", "interface %%_iface;");
        let resolver = IncludeResolver::new(&fs, "p");
        let from = SourceFile::new("p/main.adl", "", "p");
        let file = resolver.load("gen.adl%vfs", &from).unwrap();
        assert_eq!(file.text, "interface vfs_iface;");

        let file = resolver.load("gen.adl", &from).unwrap();
        assert_eq!(file.text, "interface %%_iface;");
    }

    #[test]
    fn protocol_paths_keep_percent() {
        let fs = MemoryFs::new().file("p/a%b.bp", "?x %% !y");
        let resolver = IncludeResolver::new(&fs, "p");
        let from = SourceFile::new("p/main.adl", "", "p");
        let file = resolver.load_protocol("a%b.bp", &from).unwrap();
        assert_eq!(file.name, "p/a%b.bp");
        assert_eq!(file.text, "?x %% !y");
        assert!(resolver.load("a%b.bp", &from).is_err());
    }

    #[test]
    fn missing_file_is_a_resource_diagnostic() {
        let fs = MemoryFs::new();
        let resolver = IncludeResolver::new(&fs, "p");
        let from = SourceFile::new("p/main.adl", "", "p");
        let err = resolver.load("nope.adl", &from).unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::Resource);
        assert_eq!(err.to_string(), "p/main.adl: Unable to include file p/nope.adl");
    }
}
