//! 公共类型（对外暴露）
use serde::Serialize;

/// 命中串的编码类别
/// - Narrow：单字节 ASCII（可选带 UTF-8 多字节字符）
/// - Wide：大端双字节（"字符 + 0x00" 成对）串
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingKind {
    Narrow,
    Wide,
}

/// 单次解码结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedUnit {
    /// 得到一个可打印片段（窄模式为单个字符，宽模式为整串），`next` 为新游标
    Accepted { fragment: String, next: usize },
    /// 不可打印；`next` 为恢复位置（窄模式恰好前进 1 字节，宽模式不前进）
    Rejected { next: usize },
}

impl DecodedUnit {
    /// 新游标位置（无论接受与否）
    pub fn next(&self) -> usize {
        match self {
            DecodedUnit::Accepted { next, .. } | DecodedUnit::Rejected { next } => *next,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, DecodedUnit::Accepted { .. })
    }
}

/// 通过审核的串（输出项）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedRun {
    /// 串首字节在缓冲区内的偏移
    pub start_offset: usize,
    pub text: String,
    pub encoding: EncodingKind,
}

impl AcceptedRun {
    /// 转成一行输出文本；`annotate_offsets` 为真时加 `%08X: ` 前缀
    pub fn to_line(&self, annotate_offsets: bool) -> String {
        if annotate_offsets {
            format!("{:08X}: {}\n", self.start_offset, self.text)
        } else {
            format!("{}\n", self.text)
        }
    }
}

/// JSON 行输出项（`--format json` 的单个元素）
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord<'a> {
    pub file: &'a str,
    pub offset: usize,
    pub encoding: EncodingKind,
    pub text: &'a str,
}
