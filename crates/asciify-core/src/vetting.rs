//! 串审核策略：长度 → 可读比例 → 排除词（整串）→ 包含词（子串白名单）
//!
//! 顺序固定：先做廉价的结构检查，再做子串过滤；排除先于包含，
//! 因此一个恰好命中排除词的串即使也命中包含词仍被拒绝。
use std::collections::HashSet;

use aho_corasick::AhoCorasick;

use crate::error::Result;
use crate::options::ScanOptions;

/// 计入可读比例的字符：空格 , . CR LF 数字 大小写字母
#[inline]
fn is_readable(c: char) -> bool {
    matches!(c, ' ' | ',' | '.' | '\r' | '\n') || c.is_ascii_alphanumeric()
}

/// 结构检查：字符数与可读比例（整数除法，向下取整）
pub fn passes_structure(text: &str, min_length: usize, min_alpha_ratio: u8) -> bool {
    let total = text.chars().count();
    if total < min_length {
        return false;
    }
    if min_alpha_ratio > 0 {
        if total == 0 {
            return false;
        }
        let readable = text.chars().filter(|&c| is_readable(c)).count();
        if readable * 100 / total < usize::from(min_alpha_ratio) {
            return false;
        }
    }
    true
}

/// 单次审核（逐次构建过滤集合；批量场景请用 [`Vetter`]）
pub fn vet(
    text: &str,
    min_length: usize,
    min_alpha_ratio: u8,
    suppress: &[String],
    include: &[String],
) -> bool {
    if !passes_structure(text, min_length, min_alpha_ratio) {
        return false;
    }
    let lower = text.to_lowercase();
    if suppress.iter().any(|t| t.to_lowercase() == lower) {
        return false;
    }
    include.is_empty() || include.iter().any(|t| lower.contains(&t.to_lowercase()))
}

/// 预编译的审核器：排除词转小写放入集合，包含词构建 Aho-Corasick 自动机
#[derive(Debug, Clone)]
pub struct Vetter {
    min_length: usize,
    min_alpha_ratio: u8,
    suppress: HashSet<String>,
    include: Option<AhoCorasick>,
}

impl Vetter {
    pub fn new(opts: &ScanOptions) -> Result<Self> {
        let suppress = opts.suppress_terms.iter().map(|t| t.to_lowercase()).collect();
        let include = if opts.include_terms.is_empty() {
            None
        } else {
            let lowered: Vec<String> =
                opts.include_terms.iter().map(|t| t.to_lowercase()).collect();
            Some(AhoCorasick::new(&lowered)?)
        };
        Ok(Self {
            min_length: opts.effective_min_length(),
            min_alpha_ratio: opts.min_alpha_ratio,
            suppress,
            include,
        })
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    /// 宽串合并前对紧邻窄串的降阈值检查：只看结构，长度下限取 min(3, min_length)
    pub fn passes_reduced(&self, text: &str) -> bool {
        passes_structure(text, self.min_length.min(3), self.min_alpha_ratio)
    }

    pub fn vet(&self, text: &str) -> bool {
        if !passes_structure(text, self.min_length, self.min_alpha_ratio) {
            return false;
        }
        if self.suppress.is_empty() && self.include.is_none() {
            return true;
        }
        let lower = text.to_lowercase();
        if self.suppress.contains(&lower) {
            return false;
        }
        match &self.include {
            Some(ac) => ac.is_match(&lower),
            None => true,
        }
    }
}
