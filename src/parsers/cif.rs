//! # CIF 1.1 格式解析器
//!
//! 将 CIF 文本解析为数据块、单值条目与循环表。
//!
//! ## CIF 格式说明
//! ```text
//! data_si
//! _cell.length_a 5.4315(2)
//! _space_group.name_H-M_alt 'F d -3 m'
//! loop_
//! _atom_site.label
//! _atom_site.fract_x
//! Si 0.125
//! ```
//!
//! 支持注释 `#`、单/双引号字符串与 `;` 定界的多行文本字段。
//! 标签查找大小写不敏感。
//!
//! ## 依赖关系
//! - 被 `sample_models/`、`experiments/`、`analysis/`、`project/` 使用

use crate::error::{DiffError, Result};

use std::fs;
use std::path::Path;

/// 循环表
#[derive(Debug, Clone, Default)]
pub struct CifLoop {
    pub tags: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CifLoop {
    /// 列索引（大小写不敏感）
    pub fn column(&self, tag: &str) -> Option<usize> {
        self.tags.iter().position(|t| t.eq_ignore_ascii_case(tag))
    }

    /// 某列的全部值
    pub fn values(&self, tag: &str) -> Option<Vec<&str>> {
        let col = self.column(tag)?;
        Some(self.rows.iter().map(|r| r[col].as_str()).collect())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// 数据块
#[derive(Debug, Clone, Default)]
pub struct CifBlock {
    pub name: String,
    pub items: Vec<(String, String)>,
    pub loops: Vec<CifLoop>,
}

impl CifBlock {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// 单值条目；若只出现在单行循环中也返回
    pub fn find_value(&self, tag: &str) -> Option<&str> {
        if let Some((_, v)) = self.items.iter().find(|(t, _)| t.eq_ignore_ascii_case(tag)) {
            return Some(v.as_str());
        }
        let lp = self.find_loop(tag)?;
        let col = lp.column(tag)?;
        lp.rows.first().map(|r| r[col].as_str())
    }

    /// 按候选标签依次查找单值条目
    pub fn find_any(&self, tags: &[&str]) -> Option<&str> {
        tags.iter().find_map(|t| self.find_value(t))
    }

    /// 循环列或单值条目（视为一行）
    pub fn find_values(&self, tag: &str) -> Option<Vec<&str>> {
        if let Some(lp) = self.find_loop(tag) {
            return lp.values(tag);
        }
        self.items
            .iter()
            .find(|(t, _)| t.eq_ignore_ascii_case(tag))
            .map(|(_, v)| vec![v.as_str()])
    }

    /// 包含指定标签的循环表
    pub fn find_loop(&self, tag: &str) -> Option<&CifLoop> {
        self.loops.iter().find(|lp| lp.column(tag).is_some())
    }

    /// 按候选标签查找循环表
    pub fn find_loop_any(&self, tags: &[&str]) -> Option<&CifLoop> {
        tags.iter().find_map(|t| self.find_loop(t))
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.find_values(tag).is_some()
    }

    /// 必需的单值条目
    pub fn require(&self, tag: &str) -> Result<&str> {
        self.find_value(tag).ok_or_else(|| DiffError::MissingCifItem {
            block: self.name.clone(),
            tag: tag.to_string(),
        })
    }
}

/// CIF 文档
#[derive(Debug, Clone, Default)]
pub struct CifDocument {
    pub blocks: Vec<CifBlock>,
}

impl CifDocument {
    pub fn block(&self, name: &str) -> Option<&CifBlock> {
        self.blocks.iter().find(|b| b.name.eq_ignore_ascii_case(name))
    }

    pub fn first(&self) -> Option<&CifBlock> {
        self.blocks.first()
    }
}

/// 解析 CIF 文件
pub fn parse_cif_file(path: &Path) -> Result<CifDocument> {
    let content = fs::read_to_string(path).map_err(|e| DiffError::read(path, e))?;
    parse_cif_content(&content).map_err(|e| match e {
        DiffError::CifSyntax { line, reason } => DiffError::ParseError {
            format: "CIF".to_string(),
            path: path.display().to_string(),
            reason: format!("line {}: {}", line, reason),
        },
        other => other,
    })
}

// ─────────────────────────────────────────────────────────────
// 词法分析
// ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    DataBlock(String),
    Loop,
    Tag(String),
    Value(String),
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    line: usize,
}

fn tokenize(content: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let lines: Vec<&str> = content.lines().collect();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let line_no = i + 1;

        // 多行文本字段
        if line.starts_with(';') {
            let mut text = vec![line[1..].to_string()];
            i += 1;
            loop {
                let Some(next) = lines.get(i) else {
                    return Err(DiffError::CifSyntax {
                        line: line_no,
                        reason: "unterminated text field".to_string(),
                    });
                };
                if next.starts_with(';') {
                    break;
                }
                text.push(next.to_string());
                i += 1;
            }
            let value = text.join("\n").trim().to_string();
            tokens.push(Token {
                kind: TokenKind::Value(value),
                line: line_no,
            });
            i += 1;
            continue;
        }

        tokenize_line(line, line_no, &mut tokens)?;
        i += 1;
    }

    Ok(tokens)
}

fn tokenize_line(line: &str, line_no: usize, tokens: &mut Vec<Token>) -> Result<()> {
    let chars: Vec<char> = line.chars().collect();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];
        if c.is_whitespace() {
            pos += 1;
            continue;
        }
        if c == '#' {
            break;
        }

        if c == '\'' || c == '"' {
            // 引号只在其后为空白或行尾时闭合
            let quote = c;
            let start = pos + 1;
            let mut end = start;
            loop {
                if end >= chars.len() {
                    return Err(DiffError::CifSyntax {
                        line: line_no,
                        reason: "unterminated quoted string".to_string(),
                    });
                }
                if chars[end] == quote
                    && (end + 1 == chars.len() || chars[end + 1].is_whitespace())
                {
                    break;
                }
                end += 1;
            }
            let value: String = chars[start..end].iter().collect();
            tokens.push(Token {
                kind: TokenKind::Value(value),
                line: line_no,
            });
            pos = end + 1;
            continue;
        }

        let start = pos;
        while pos < chars.len() && !chars[pos].is_whitespace() {
            pos += 1;
        }
        let word: String = chars[start..pos].iter().collect();
        let lower = word.to_ascii_lowercase();

        let kind = if lower.starts_with("data_") {
            TokenKind::DataBlock(word[5..].to_string())
        } else if lower == "loop_" {
            TokenKind::Loop
        } else if word.starts_with('_') {
            TokenKind::Tag(word)
        } else {
            TokenKind::Value(word)
        };
        tokens.push(Token {
            kind,
            line: line_no,
        });
    }

    Ok(())
}

// ─────────────────────────────────────────────────────────────
// 语法分析
// ─────────────────────────────────────────────────────────────

/// 从字符串内容解析 CIF
pub fn parse_cif_content(content: &str) -> Result<CifDocument> {
    let tokens = tokenize(content)?;
    let mut doc = CifDocument::default();
    let mut pos = 0;

    while pos < tokens.len() {
        let token = &tokens[pos];
        match &token.kind {
            TokenKind::DataBlock(name) => {
                doc.blocks.push(CifBlock::new(name));
                pos += 1;
            }
            TokenKind::Tag(tag) => {
                let block = current_block(&mut doc, token.line)?;
                let value = match tokens.get(pos + 1).map(|t| &t.kind) {
                    Some(TokenKind::Value(v)) => v.clone(),
                    _ => {
                        return Err(DiffError::CifSyntax {
                            line: token.line,
                            reason: format!("tag '{}' has no value", tag),
                        })
                    }
                };
                block.items.push((tag.clone(), value));
                pos += 2;
            }
            TokenKind::Loop => {
                let line = token.line;
                pos += 1;
                let mut lp = CifLoop::default();
                while let Some(TokenKind::Tag(tag)) = tokens.get(pos).map(|t| &t.kind) {
                    lp.tags.push(tag.clone());
                    pos += 1;
                }
                if lp.tags.is_empty() {
                    return Err(DiffError::CifSyntax {
                        line,
                        reason: "loop_ without tags".to_string(),
                    });
                }
                let mut values = Vec::new();
                while let Some(TokenKind::Value(v)) = tokens.get(pos).map(|t| &t.kind) {
                    values.push(v.clone());
                    pos += 1;
                }
                if values.len() % lp.tags.len() != 0 {
                    return Err(DiffError::CifSyntax {
                        line,
                        reason: format!(
                            "loop has {} values for {} tags",
                            values.len(),
                            lp.tags.len()
                        ),
                    });
                }
                lp.rows = values
                    .chunks(lp.tags.len())
                    .map(|chunk| chunk.to_vec())
                    .collect();
                current_block(&mut doc, line)?.loops.push(lp);
            }
            TokenKind::Value(v) => {
                return Err(DiffError::CifSyntax {
                    line: token.line,
                    reason: format!("unexpected value '{}'", v),
                });
            }
        }
    }

    Ok(doc)
}

fn current_block(doc: &mut CifDocument, line: usize) -> Result<&mut CifBlock> {
    doc.blocks.last_mut().ok_or(DiffError::CifSyntax {
        line,
        reason: "content before the first data_ block".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
# comment line
data_lbco
_space_group.name_H-M_alt  'P m -3 m'
_cell.length_a  3.88(1)   # trailing comment
_space_group.IT_coordinate_system_code 1

loop_
_atom_site.label
_atom_site.type_symbol
_atom_site.fract_x
La La 0
O  O  0.5

data_second
_project.description
;
multi line
text
;
"#;

    #[test]
    fn test_parse_blocks_and_items() {
        let doc = parse_cif_content(SAMPLE).unwrap();
        assert_eq!(doc.blocks.len(), 2);
        let b = doc.block("LBCO").unwrap();
        assert_eq!(b.find_value("_space_group.name_h-m_alt"), Some("P m -3 m"));
        assert_eq!(b.find_value("_cell.length_a"), Some("3.88(1)"));
        assert_eq!(
            b.find_values("_atom_site.label"),
            Some(vec!["La", "O"])
        );
        assert_eq!(b.find_loop("_atom_site.fract_x").map(|l| l.len()), Some(2));
    }

    #[test]
    fn test_text_field() {
        let doc = parse_cif_content(SAMPLE).unwrap();
        let b = doc.block("second").unwrap();
        assert_eq!(
            b.find_value("_project.description"),
            Some("multi line\ntext")
        );
    }

    #[test]
    fn test_quote_with_apostrophe_inside() {
        let doc = parse_cif_content("data_x\n_a.b 'it's fine'\n").unwrap();
        assert_eq!(doc.blocks[0].find_value("_a.b"), Some("it's fine"));
    }

    #[test]
    fn test_loop_value_count_mismatch() {
        let err = parse_cif_content("data_x\nloop_\n_a.b\n_a.c\n1 2 3\n").unwrap_err();
        assert!(matches!(err, DiffError::CifSyntax { .. }));
    }

    #[test]
    fn test_content_before_block() {
        assert!(parse_cif_content("_a.b 1\n").is_err());
    }

    #[test]
    fn test_missing_required_item() {
        let doc = parse_cif_content("data_x\n_a.b 1\n").unwrap();
        assert!(doc.blocks[0].require("_a.c").is_err());
        assert_eq!(doc.blocks[0].require("_a.b").unwrap(), "1");
    }
}
