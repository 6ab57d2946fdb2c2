//! 输出目标

use anyhow::Result;

use crate::backend::linker::Artifact;

mod directory;
mod memory;
pub use directory::Directory;
pub use memory::Memory;

/// 输出目标：按文件名保存生成的文本
pub trait Target {
    /// 写入一个文件。同名文件已经写过时覆盖它。
    fn write(&mut self, name: &str, contents: &str) -> Result<()>;

    /// 写入链接阶段生成的文件。
    fn write_artifact(&mut self, artifact: &Artifact) -> Result<()> {
        self.write(&artifact.name, &artifact.contents)
    }
}
