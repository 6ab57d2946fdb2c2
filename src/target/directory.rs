//! 写入目录

use std::path::PathBuf;

use anyhow::{Context, Result};

/// 把所有输出平铺写入一个目录
#[derive(Debug)]
pub struct Directory {
    root: PathBuf,
}

impl Directory {
    /// 输出到 `root`，目录必须已经存在。
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl super::Target for Directory {
    fn write(&mut self, name: &str, contents: &str) -> Result<()> {
        let path = self.root.join(name);
        // 本次运行先前写过的文件也在磁盘上
        if path.exists() {
            tracing::warn!(path = %path.display(), "overwriting existing file");
        }

        std::fs::write(&path, contents).with_context(|| format!("Unable to write {}", path.display()))?;
        tracing::info!(path = %path.display(), "written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::Target;
    use std::{
        io,
        sync::{Arc, Mutex},
    };

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn warnings(f: impl FnOnce()) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn last_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let mut target = Directory::new(dir.path());
        let log = warnings(|| {
            target.write("a.adl", "first\n").unwrap();
            target.write("a.adl", "second\n").unwrap();
        });
        assert_eq!(std::fs::read_to_string(dir.path().join("a.adl")).unwrap(), "second\n");
        assert_eq!(log.matches("overwriting existing file").count(), 1);
    }

    #[test]
    fn file_left_by_earlier_run_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Os.archbp"), "stale\n").unwrap();

        let mut target = Directory::new(dir.path());
        let log = warnings(|| {
            target.write("Os.archbp", "frame \"null.bp\"\n").unwrap();
            target.write("null.bp", "NULL\n").unwrap();
        });
        assert!(log.contains("overwriting existing file"), "{}", log);
        assert!(log.contains("Os.archbp"), "{}", log);
        assert!(!log.contains("null.bp"), "{}", log);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("Os.archbp")).unwrap(),
            "frame \"null.bp\"\n"
        );
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut target = Directory::new(dir.path().join("gone"));
        assert!(target.write("a.bp", "NULL\n").is_err());
    }
}
