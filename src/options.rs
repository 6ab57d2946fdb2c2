//! 运行选项。

/// 运行选项。
#[derive(Clone, Debug)]
pub struct Options {
    /// 源文件的扩展名，包括开头的点。
    pub extension: String,
    /// 输出重新排版的源文件。
    pub emit_adl: bool,
    /// 输出各帧的协议文件与 `null.bp`。
    pub emit_bp: bool,
    /// 输出链接文件。
    pub emit_archbp: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            extension: ".adl".to_string(),
            emit_adl: true,
            emit_bp: true,
            emit_archbp: true,
        }
    }
}
