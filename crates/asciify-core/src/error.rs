//! 错误类型
//!
//! 解码层面的异常（非法 UTF-8 续字节、类别被排除的码点、宽串缺终止符、缓冲区耗尽）
//! 属于数据特征，全部在组装器内部吸收，不会出现在这里。
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    /// 输入文件无法读取（单文件失败，不影响同级文件）
    #[error("cannot read input {path}: {source}")]
    InputUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 输出目标无法写入
    #[error("cannot write output {path}: {source}")]
    OutputUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read filter file {path}: {source}")]
    FilterIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed filter file {path}: {source}")]
    FilterParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid file mask {mask:?}: {source}")]
    InvalidMask {
        mask: String,
        #[source]
        source: regex::Error,
    },

    #[error("cannot build include-term matcher: {0}")]
    Matcher(#[from] aho_corasick::BuildError),

    #[error("cannot start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("invalid option: {0}")]
    InvalidOption(String),

    /// 控制台写入失败
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ScanError>;
