//! 窄模式解码器：低位 ASCII，可选合法 UTF-8 多字节字符
//!
//! UTF-8 首字节高位计数（RFC 3629）：
//!   110x xxxx   后随 1 个续字节
//!   1110 xxxx   后随 2 个续字节
//!   1111 0xxx   后随 3 个续字节
//!   10xx xxxx   续字节本身，不能作为首字节
//!
//! 任何失败都只前进 1 字节（首字节之后），即使已经试探性地检查了后续最多 3 个字节。
use unicode_general_category::{get_general_category, GeneralCategory};

use crate::types::DecodedUnit;

/// 低位可接受字节：0x20–0x7E，外加 TAB 与 LF（CR 不在其内）
#[inline]
pub(crate) fn is_low_bit(b: u8) -> bool {
    matches!(b, 0x20..=0x7E | 0x09 | 0x0A)
}

#[inline]
fn is_continuation(b: u8) -> bool {
    b & 0b1100_0000 == 0b1000_0000
}

/// 首字节第 6 位到第 3 位连续为 1 的个数，即期望的续字节数
#[inline]
fn continuation_count(lead: u8) -> usize {
    ((lead << 1).leading_ones() as usize).min(4)
}

/// 控制、格式、私用、未分配、代理类码点不算可读字符
fn is_excluded_category(ch: char) -> bool {
    matches!(
        get_general_category(ch),
        GeneralCategory::Control
            | GeneralCategory::Format
            | GeneralCategory::PrivateUse
            | GeneralCategory::Unassigned
            | GeneralCategory::Surrogate
    )
}

/// 从 `cursor` 处解码一个可打印单元
pub fn decode_narrow(buf: &[u8], cursor: usize, allow_wide_unicode: bool) -> DecodedUnit {
    let b = match buf.get(cursor) {
        Some(&b) => b,
        None => return DecodedUnit::Rejected { next: cursor },
    };
    if is_low_bit(b) {
        return DecodedUnit::Accepted { fragment: char::from(b).to_string(), next: cursor + 1 };
    }

    // 所有拒绝路径统一只消费首字节
    let skip = DecodedUnit::Rejected { next: cursor + 1 };
    if !allow_wide_unicode || b < 0x80 || is_continuation(b) {
        return skip;
    }
    let extra = continuation_count(b);
    if !(1..=3).contains(&extra) {
        return skip;
    }

    let end = cursor + 1 + extra;
    let seq = match buf.get(cursor..end) {
        Some(seq) => seq,
        None => return skip,
    };
    if !seq[1..].iter().all(|&c| is_continuation(c)) {
        return skip;
    }
    // 过长编码、代理区、超出 U+10FFFF 均在此失败
    let ch = match std::str::from_utf8(seq).ok().and_then(|s| s.chars().next()) {
        Some(ch) => ch,
        None => return skip,
    };
    if is_excluded_category(ch) {
        return skip;
    }
    DecodedUnit::Accepted { fragment: ch.to_string(), next: end }
}
