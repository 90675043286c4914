//! 过滤词文件加载（TOML）
use serde::Deserialize;
use std::path::Path;

use crate::error::{Result, ScanError};
use crate::options::ScanOptions;

/// `[filters]` 段
#[derive(Debug, Clone, Default, Deserialize)]
struct FilterSection {
    #[serde(default)]
    suppress: Vec<String>,
    #[serde(default)]
    include: Vec<String>,
}

/// 顶层过滤文件结构
#[derive(Debug, Clone, Default, Deserialize)]
struct FilterFile {
    #[serde(default)]
    filters: FilterSection,
}

/// 归一化后的过滤词
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterTerms {
    pub suppress: Vec<String>,
    pub include: Vec<String>,
}

impl FilterTerms {
    /// 合并进扫描选项（追加在命令行给出的词之后）
    pub fn apply(self, opts: ScanOptions) -> ScanOptions {
        opts.with_suppress_terms(self.suppress).with_include_terms(self.include)
    }
}

/// 解析过滤文件文本；空白词被丢弃
pub fn parse_filter_terms(txt: &str, path: &Path) -> Result<FilterTerms> {
    let parsed: FilterFile = toml::from_str(txt)
        .map_err(|source| ScanError::FilterParse { path: path.to_path_buf(), source })?;
    let keep = |v: Vec<String>| -> Vec<String> {
        v.into_iter().filter(|t| !t.trim().is_empty()).collect()
    };
    Ok(FilterTerms {
        suppress: keep(parsed.filters.suppress),
        include: keep(parsed.filters.include),
    })
}

/// 从 TOML 过滤文件加载排除词与包含词
pub fn load_filter_terms(path: &Path) -> Result<FilterTerms> {
    let txt = std::fs::read_to_string(path)
        .map_err(|source| ScanError::FilterIo { path: path.to_path_buf(), source })?;
    parse_filter_terms(&txt, path)
}
