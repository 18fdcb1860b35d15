//! # CIF 写出辅助
//!
//! 将参数、描述符与循环表渲染为 CIF 1.1 文本。
//!
//! ## 依赖关系
//! - 被各模型的 `to_cif` 使用
//! - 与 `parsers/cif.rs`（读取）相对

use crate::core::parameter::{Parameter, StringDescriptor};

/// 格式化文本值：含空白或保留字符时加引号，空串写为 `?`
pub fn format_value(value: &str) -> String {
    if value.is_empty() {
        return "?".to_string();
    }
    let needs_quotes = value.chars().any(char::is_whitespace)
        || value.starts_with(|c: char| "_#$'\"[];".contains(c))
        || value.eq_ignore_ascii_case("loop_")
        || value.to_ascii_lowercase().starts_with("data_");
    if !needs_quotes {
        return value.to_string();
    }
    if value.contains('"') {
        format!("'{}'", value)
    } else {
        format!("\"{}\"", value)
    }
}

/// CIF 文本构建器
#[derive(Debug, Default)]
pub struct CifWriter {
    out: String,
}

impl CifWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写出 `data_name` 块头
    pub fn data_block(&mut self, name: &str) -> &mut Self {
        self.out.push_str(&format!("data_{}\n", name));
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.out.push('\n');
        self
    }

    pub fn comment(&mut self, text: &str) -> &mut Self {
        self.out.push_str(&format!("# {}\n", text));
        self
    }

    /// 写出 `tag value` 行
    pub fn item(&mut self, tag: &str, value: &str) -> &mut Self {
        self.out.push_str(&format!("{} {}\n", tag, value));
        self
    }

    pub fn parameter(&mut self, p: &Parameter) -> &mut Self {
        self.item(p.cif_name(), &p.cif_value())
    }

    pub fn descriptor(&mut self, d: &StringDescriptor) -> &mut Self {
        self.item(d.cif_name(), &d.cif_value())
    }

    /// 写出多行文本字段（`;` 定界）
    pub fn text_field(&mut self, tag: &str, text: &str) -> &mut Self {
        self.out.push_str(&format!("{}\n;\n{}\n;\n", tag, text));
        self
    }

    /// 写出循环表
    ///
    /// `max_rows` 给定且行数超过其两倍时，仅保留首尾各 `max_rows` 行，中间写 `...`，
    /// 仅用于终端显示。
    pub fn loop_table(
        &mut self,
        tags: &[&str],
        rows: &[Vec<String>],
        max_rows: Option<usize>,
    ) -> &mut Self {
        if rows.is_empty() {
            return self;
        }
        self.out.push_str("loop_\n");
        for tag in tags {
            self.out.push_str(tag);
            self.out.push('\n');
        }

        let widths: Vec<usize> = (0..tags.len())
            .map(|col| {
                rows.iter()
                    .map(|r| r.get(col).map(|s| s.chars().count()).unwrap_or(0))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let render = |row: &Vec<String>| -> String {
            row.iter()
                .enumerate()
                .map(|(i, v)| format!("{:<width$}", v, width = widths[i]))
                .collect::<Vec<_>>()
                .join(" ")
                .trim_end()
                .to_string()
        };

        match max_rows {
            Some(n) if rows.len() > 2 * n => {
                for row in &rows[..n] {
                    self.out.push_str(&render(row));
                    self.out.push('\n');
                }
                self.out.push_str("...\n");
                for row in &rows[rows.len() - n..] {
                    self.out.push_str(&render(row));
                    self.out.push('\n');
                }
            }
            _ => {
                for row in rows {
                    self.out.push_str(&render(row));
                    self.out.push('\n');
                }
            }
        }
        self
    }

    pub fn finish(self) -> String {
        self.out
    }
}

/// 将长文本按单词折行
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_value_quoting() {
        assert_eq!(format_value("powder"), "powder");
        assert_eq!(format_value("F d -3 m"), "\"F d -3 m\"");
        assert_eq!(format_value("it's here"), "\"it's here\"");
        assert_eq!(format_value("_tag"), "\"_tag\"");
        assert_eq!(format_value(""), "?");
    }

    #[test]
    fn test_loop_truncation() {
        let rows: Vec<Vec<String>> = (0..10).map(|i| vec![i.to_string()]).collect();
        let mut w = CifWriter::new();
        w.loop_table(&["_pd_data.point_id"], &rows, Some(2));
        let text = w.finish();
        assert!(text.contains("...\n"));
        assert!(text.contains("\n0\n1\n...\n8\n9\n"));
    }

    #[test]
    fn test_loop_full_when_short() {
        let rows: Vec<Vec<String>> = (0..3).map(|i| vec![i.to_string(), "x".into()]).collect();
        let mut w = CifWriter::new();
        w.loop_table(&["_a.id", "_a.v"], &rows, Some(2));
        assert!(!w.finish().contains("..."));
    }

    #[test]
    fn test_wrap_text() {
        let lines = wrap_text("one two three four", 9);
        assert_eq!(lines, vec!["one two", "three", "four"]);
    }
}
