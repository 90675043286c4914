//! 扫描选项与统计信息（模块）
use crate::error::{Result, ScanError};

/// 默认最小串长
pub const DEFAULT_MIN_LENGTH: usize = 6;

/// 扫描选项
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// 最小串长（按字符计）；≤1 时按默认值 6 处理
    pub min_length: usize,
    /// 窄模式下是否接受合法 UTF-8 多字节字符
    pub wide_unicode: bool,
    /// 是否探测大端双字节（"字符 + 0x00"）串
    pub wide_runs: bool,
    /// 字母数字及常见标点（空格 , . CR LF）所占百分比下限；0 表示不限制
    pub min_alpha_ratio: u8,
    /// 整串（忽略大小写）完全相同即排除
    pub suppress_terms: Vec<String>,
    /// 非空时作为白名单：整串（忽略大小写）须包含其一
    pub include_terms: Vec<String>,
    /// 输出行是否带 8 位大写十六进制偏移前缀
    pub annotate_offsets: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_MIN_LENGTH,
            wide_unicode: false,
            wide_runs: false,
            min_alpha_ratio: 0,
            suppress_terms: Vec::new(),
            include_terms: Vec::new(),
            annotate_offsets: false,
        }
    }
}

impl ScanOptions {
    pub fn new(min_length: usize) -> Self {
        Self::default().with_min_length(min_length)
    }

    /// 设置最小串长（≤1 回落到默认值）
    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = clamp_min_length(min_length);
        self
    }

    pub fn with_wide_unicode(mut self, on: bool) -> Self {
        self.wide_unicode = on;
        self
    }

    pub fn with_wide_runs(mut self, on: bool) -> Self {
        self.wide_runs = on;
        self
    }

    pub fn with_min_alpha_ratio(mut self, percent: u8) -> Self {
        self.min_alpha_ratio = percent;
        self
    }

    pub fn with_suppress_terms<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suppress_terms.extend(terms.into_iter().map(Into::into));
        self
    }

    pub fn with_include_terms<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_terms.extend(terms.into_iter().map(Into::into));
        self
    }

    pub fn with_annotate_offsets(mut self, on: bool) -> Self {
        self.annotate_offsets = on;
        self
    }

    /// 实际生效的最小串长（直接改字段的调用方同样受钳制）
    pub fn effective_min_length(&self) -> usize {
        clamp_min_length(self.min_length)
    }

    /// 校验取值范围
    pub fn validate(&self) -> Result<()> {
        if self.min_alpha_ratio > 100 {
            return Err(ScanError::InvalidOption(format!(
                "alpha ratio must be within 0..=100, got {}",
                self.min_alpha_ratio
            )));
        }
        if self.suppress_terms.iter().chain(&self.include_terms).any(|t| t.is_empty()) {
            return Err(ScanError::InvalidOption("filter terms must not be empty".into()));
        }
        Ok(())
    }
}

fn clamp_min_length(n: usize) -> usize {
    if n > 1 { n } else { DEFAULT_MIN_LENGTH }
}

/// 单个缓冲区的串计数
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunCounts {
    pub narrow_runs: usize,
    pub wide_runs: usize,
    /// 宽串前紧邻窄串被合并输出的次数
    pub adjacent_merges: usize,
}

impl RunCounts {
    pub fn add(&mut self, other: &RunCounts) {
        self.narrow_runs += other.narrow_runs;
        self.wide_runs += other.wide_runs;
        self.adjacent_merges += other.adjacent_merges;
    }
}

/// 扫描统计信息（便于 CLI 打印）
#[derive(Debug, Default, Clone)]
pub struct ScanStats {
    pub files_scanned: usize,
    pub files_failed: usize,
    /// 被"保留最新同名文件"规则排除的文件数
    pub files_excluded: usize,
    /// 输出文件写失败的次数
    pub outputs_failed: usize,
    pub runs: RunCounts,
}
