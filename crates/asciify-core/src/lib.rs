//! 二进制文本提取核心库
//!
//! 设计要点：
//! - 逐字节扫描任意二进制缓冲区，提取可读文本串，
//!   分为窄串（低位 ASCII，可选 UTF-8）与宽串（"字符 + 0x00"）。
//! - 每个位置先试宽串再试窄解码；任何解码失败只前进 1 字节，保证 N 字节缓冲区至多 N 步结束。
//! - 收尾的串依次经过长度、可读比例、排除词、包含词四道审核。
//! - 无全局可变状态：计数随扫描结果返回，由调用方汇总。

mod assembler;
mod error;
mod filters;
mod narrow;
mod options;
mod scan;
mod select;
mod sink;
mod types;
mod vetting;
mod wide;

pub use assembler::{scan_buffer, Runs, ScanReport, Scanner};
pub use error::{Result, ScanError};
pub use filters::{load_filter_terms, parse_filter_terms, FilterTerms};
pub use narrow::decode_narrow;
pub use options::{RunCounts, ScanOptions, ScanStats, DEFAULT_MIN_LENGTH};
pub use scan::{read_input, scan_and_write, scan_file};
pub use select::{FileMask, FileSelector, Selection};
pub use sink::{OutputFormat, OutputTarget, RunWriter};
pub use types::{AcceptedRun, DecodedUnit, EncodingKind, RunRecord};
pub use vetting::{passes_structure, vet, Vetter};
pub use wide::decode_wide_run;
