use annotate_snippets::snippet::{AnnotationType, Slice, SourceAnnotation};

/// 位置信息片段
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span<'a> {
    pub filename: &'a str,
    pub source: &'a str,
    pub start: usize,
    pub end: usize,
}

impl<'a> Span<'a> {
    /// 创建一个新的 `Span`。
    pub fn new(filename: &'a str, source: &'a str, start: usize, end: usize) -> Self {
        Self {
            filename,
            source,
            start,
            end,
        }
    }

    /// 取出包含 Span 的那几行。
    pub fn lines(&self) -> Option<LinesInfo> {
        let mut lines = self.source.split_inclusive('\n').enumerate();

        let mut start = 0;
        let mut end = 0;
        let mut line_start = 0;
        for (i, line) in lines.by_ref() {
            let next = start + line.len();
            if next > self.start {
                line_start = i + 1;
                end = next;
                break;
            }
            start = next;
        }
        if line_start == 0 {
            return None;
        }

        for (_, line) in lines {
            if end >= self.end {
                break;
            }
            end += line.len();
        }

        let source = self.source[start..end].trim_end_matches('\n');
        let range_end = (self.end - start).min(source.len());
        Some(LinesInfo {
            filename: self.filename.to_string(),
            source: source.to_string(),
            line_start,
            range: ((self.start - start).min(range_end), range_end),
        })
    }
}

/// 所在行的信息
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LinesInfo {
    /// 文件名
    pub filename: String,
    /// 包含 Span 的某几行
    pub source: String,
    /// 起始行号
    pub line_start: usize,
    /// Span 在 source 中的切片
    pub range: (usize, usize),
}

impl LinesInfo {
    pub fn as_annotation<'a>(&'a self, message: &'a str, annotation_type: AnnotationType) -> Slice<'a> {
        Slice {
            source: &self.source,
            line_start: self.line_start,
            origin: Some(&self.filename),
            annotations: vec![SourceAnnotation {
                range: self.range,
                label: message,
                annotation_type,
            }],
            fold: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_locate_the_token() {
        let source = "frame F {\n\tbogus\n};\n";
        let start = source.find("bogus").unwrap();
        let info = Span::new("f.adl", source, start, start + 5).lines().unwrap();
        assert_eq!(info.line_start, 2);
        assert_eq!(info.source, "\tbogus");
        assert_eq!(info.range, (1, 6));
    }

    #[test]
    fn lines_out_of_range() {
        assert!(Span::new("f.adl", "abc", 10, 11).lines().is_none());
    }
}
