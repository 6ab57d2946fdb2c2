//! 源文件访问。
//!
//! 目录遍历与文件读取只在边界上使用，核心逻辑通过 [`FileSystem`] 访问它们。

use std::{
    collections::BTreeMap,
    io,
    path::{Path, PathBuf},
};

/// 文件系统
pub trait FileSystem {
    /// 读取整个文件。
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// 是否存在该文件。
    fn is_file(&self, path: &Path) -> bool;

    /// 递归列出 `root` 下的所有文件，按路径排序。
    fn enumerate(&self, root: &Path) -> io::Result<Vec<PathBuf>>;
}

/// 本地文件系统
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFs;

impl FileSystem for OsFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn enumerate(&self, root: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files = vec![];
        walk(root, &mut files)?;
        Ok(files)
    }
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
    let mut entries = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            walk(&path, files)?;
        } else if path.is_file() {
            files.push(path);
        }
    }
    Ok(())
}

/// 内存中的文件系统，用于测试与嵌入。
#[derive(Debug, Default, Clone)]
pub struct MemoryFs {
    files: BTreeMap<PathBuf, String>,
}

impl MemoryFs {
    /// 创建一个空的文件系统。
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加一个文件。
    pub fn file(mut self, path: impl AsRef<Path>, contents: impl Into<String>) -> Self {
        self.files
            .insert(normalize(path.as_ref()), contents.into());
        self
    }
}

impl FileSystem for MemoryFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files
            .get(&normalize(path))
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.contains_key(&normalize(path))
    }

    fn enumerate(&self, root: &Path) -> io::Result<Vec<PathBuf>> {
        let root = normalize(root);
        Ok(self
            .files
            .keys()
            .filter(|path| root.as_os_str().is_empty() || path.starts_with(&root))
            .cloned()
            .collect())
    }
}

/// Drops `.` components so that `./a/b` and `a/b` name the same file.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, std::path::Component::CurDir))
        .collect()
}

/// 已读入的源文件
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// 用于诊断信息的文件名
    pub name: String,
    /// 文件内容
    pub text: String,
    /// 相对路径包含的基准目录
    pub root: PathBuf,
}

impl SourceFile {
    /// 创建一个源文件。
    pub fn new(name: impl Into<String>, text: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            root: root.into(),
        }
    }

    /// 从文件系统读入，基准目录为文件所在目录。
    pub fn load(fs: &dyn FileSystem, path: &Path) -> io::Result<Self> {
        let text = fs.read_to_string(path)?;
        let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(Self::new(path.display().to_string(), text, root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_fs_enumerates_under_root() {
        let fs = MemoryFs::new()
            .file("src/a.adl", "")
            .file("src/sub/b.adl", "")
            .file("other/c.adl", "");
        let files = fs.enumerate(Path::new("src")).unwrap();
        assert_eq!(
            files,
            vec![PathBuf::from("src/a.adl"), PathBuf::from("src/sub/b.adl")]
        );
    }

    #[test]
    fn memory_fs_ignores_cur_dir() {
        let fs = MemoryFs::new().file("./x/y.adl", "frame F;");
        assert!(fs.is_file(Path::new("x/y.adl")));
        assert_eq!(fs.read_to_string(Path::new("./x/./y.adl")).unwrap(), "frame F;");
        assert!(fs.read_to_string(Path::new("x/z.adl")).is_err());
    }

    #[test]
    fn load_sets_root_to_parent() {
        let fs = MemoryFs::new().file("a/b/c.adl", "");
        let file = SourceFile::load(&fs, Path::new("a/b/c.adl")).unwrap();
        assert_eq!(file.root, PathBuf::from("a/b"));
        assert_eq!(file.name, "a/b/c.adl");
    }
}
