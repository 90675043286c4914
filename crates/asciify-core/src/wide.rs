//! 宽串探测：连续的 "低位可打印字节 + 0x00" 对，以 0x00 0x00 结尾
//!
//! 整串原子化：要么整串接受，要么什么都不消费。
use crate::narrow::is_low_bit;
use crate::types::DecodedUnit;

/// 从 `cursor` 处尝试读取一整段宽串
///
/// 成功时 `next` 指向终止符 0x00 0x00 本身（不跳过），以便窄模式继续处理这两个零字节。
/// 失败或去掉尾部空白后长度不足 `min_length` 时返回 `Rejected { next: cursor }`。
pub fn decode_wide_run(buf: &[u8], cursor: usize, min_length: usize) -> DecodedUnit {
    match read_wide_run(buf, cursor, min_length) {
        Ok((fragment, next)) => DecodedUnit::Accepted { fragment, next },
        Err(_) => DecodedUnit::Rejected { next: cursor },
    }
}

/// 同 [`decode_wide_run`]，失败时给出判定失败的字节对下标
///
/// 从 `cursor` 与该下标之间任一同奇偶位置起步，都会走到同一字节对，
/// 且累积的文本只会更短，因此结果必然同样失败。
pub(crate) fn read_wide_run(
    buf: &[u8],
    cursor: usize,
    min_length: usize,
) -> Result<(String, usize), usize> {
    let mut text = String::new();
    let mut index = cursor;

    loop {
        let pair = buf.get(index..index + 2).ok_or(index)?;
        if is_low_bit(pair[0]) && pair[1] == 0 {
            text.push(char::from(pair[0]));
            index += 2;
            continue;
        }
        if text.len() > 1 && pair[0] == 0 && pair[1] == 0 {
            break;
        }
        return Err(index);
    }

    let trimmed_len = text.trim_end().len();
    text.truncate(trimmed_len);
    if text.chars().count() >= min_length {
        Ok((text, index))
    } else {
        Err(index)
    }
}
