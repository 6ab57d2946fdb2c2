//! 写入内存

use std::collections::BTreeMap;

use anyhow::Result;

/// 在内存中保存输出，按文件名排序
#[derive(Debug, Default, Clone)]
pub struct Memory {
    files: BTreeMap<String, String>,
}

impl Memory {
    /// 创建空的输出目标。
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取一个输出文件。
    pub fn get(&self, name: &str) -> Option<&str> {
        self.files.get(name).map(String::as_str)
    }

    /// 所有输出文件名。
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }
}

impl super::Target for Memory {
    fn write(&mut self, name: &str, contents: &str) -> Result<()> {
        if self.files.insert(name.to_string(), contents.to_string()).is_some() {
            tracing::warn!(name, "overwriting output written earlier in this run");
        }
        Ok(())
    }
}
