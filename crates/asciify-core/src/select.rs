//! 输入文件挑选：文件名掩码、目录递归、同目录"只保留最新"去重
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Result, ScanError};

/// 文件名掩码（shell 风格：`*` 任意串，`?` 单个字符），编译为锚定正则
#[derive(Debug, Clone)]
pub struct FileMask {
    re: Option<Regex>,
}

impl FileMask {
    pub fn new(mask: &str) -> Result<Self> {
        if mask.is_empty() {
            return Ok(Self { re: None });
        }
        let mut pat = String::with_capacity(mask.len() + 8);
        pat.push('^');
        for ch in mask.chars() {
            match ch {
                '*' => pat.push_str(".*"),
                '?' => pat.push('.'),
                c => pat.push_str(&regex::escape(c.encode_utf8(&mut [0u8; 4]))),
            }
        }
        pat.push('$');
        let re = Regex::new(&pat)
            .map_err(|source| ScanError::InvalidMask { mask: mask.to_string(), source })?;
        Ok(Self { re: Some(re) })
    }

    pub fn matches(&self, file_name: &str) -> bool {
        self.re.as_ref().map_or(true, |re| re.is_match(file_name))
    }
}

/// 挑选结果
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// 按处理顺序排列：每个目录内按修改时间从新到旧，子目录随后按名称递归
    pub included: Vec<PathBuf>,
    /// 被去重规则排除的文件
    pub excluded: Vec<PathBuf>,
}

/// 文件挑选器
#[derive(Debug, Clone)]
pub struct FileSelector {
    mask: FileMask,
    recursive: bool,
    /// 文件名带日期/序号时，截到该串首次出现处作为"基名"；
    /// 同目录同基名只保留最新的一个（区分大小写）
    skip_older_match: Option<String>,
}

impl FileSelector {
    pub fn new(mask: &str) -> Result<Self> {
        Ok(Self { mask: FileMask::new(mask)?, recursive: false, skip_older_match: None })
    }

    pub fn recursive(mut self, on: bool) -> Self {
        self.recursive = on;
        self
    }

    pub fn skip_older_match(mut self, marker: Option<String>) -> Self {
        self.skip_older_match = marker.filter(|m| !m.is_empty());
        self
    }

    /// 从 `root` 开始挑选
    pub fn select(&self, root: &Path) -> Selection {
        let mut sel = Selection::default();
        self.visit(root, &mut sel);
        sel
    }

    fn visit(&self, dir: &Path, sel: &mut Selection) {
        let mut files: Vec<(PathBuf, SystemTime)> = Vec::new();
        let mut subdirs: Vec<PathBuf> = Vec::new();

        // 每次只看一层，递归由自己控制（去重集合按目录重置）
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    debug!(dir = %dir.display(), %err, "skipping unreadable entry");
                    continue;
                }
            };
            // 符号链接按目标判断：指向文件的照常挑选，指向目录的不跟进
            let meta = if entry.path_is_symlink() {
                match fs::metadata(entry.path()) {
                    Ok(m) if m.is_file() => m,
                    Ok(_) => {
                        debug!(link = %entry.path().display(), "not following directory link");
                        continue;
                    }
                    Err(err) => {
                        debug!(link = %entry.path().display(), %err, "skipping broken symlink");
                        continue;
                    }
                }
            } else if entry.file_type().is_dir() {
                subdirs.push(entry.into_path());
                continue;
            } else if entry.file_type().is_file() {
                match entry.metadata() {
                    Ok(m) => m,
                    Err(err) => {
                        debug!(file = %entry.path().display(), %err, "skipping unreadable file");
                        continue;
                    }
                }
            } else {
                continue;
            };

            if entry.file_name().to_str().map_or(false, |n| self.mask.matches(n)) {
                let mtime = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                files.push((entry.into_path(), mtime));
            }
        }

        // 新的在前；同一时间按文件名，保证顺序可复现
        files.sort_by(|a, b| {
            b.1.cmp(&a.1).then_with(|| a.0.file_name().cmp(&b.0.file_name()))
        });
        subdirs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        let mut base_names: HashSet<String> = HashSet::new();
        for (path, _) in files {
            let name = path.file_name().and_then(|s| s.to_str()).unwrap_or_default();
            if self.is_first_of_kind(name, &mut base_names) {
                sel.included.push(path);
            } else {
                debug!(file = %path.display(), "older duplicate excluded");
                sel.excluded.push(path);
            }
        }

        if self.recursive {
            for sub in subdirs {
                self.visit(&sub, sel);
            }
        }
    }

    fn is_first_of_kind(&self, name: &str, seen: &mut HashSet<String>) -> bool {
        let marker = match &self.skip_older_match {
            Some(m) => m,
            None => return true,
        };
        let base = match name.find(marker.as_str()) {
            Some(idx) => &name[..idx],
            None => name,
        };
        seen.insert(base.to_string())
    }
}
