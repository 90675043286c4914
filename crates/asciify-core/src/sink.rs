//! 输出目标：控制台、源文件旁的 `.txt`、或扁平化到指定目录
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::assembler::ScanReport;
use crate::error::{Result, ScanError};
use crate::types::RunRecord;

/// 输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// 每串一行（可带偏移前缀）
    #[default]
    Text,
    /// 每串一个 JSON 对象（JSON Lines）
    Json,
}

/// 输出去向
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputTarget {
    #[default]
    Console,
    /// `<源文件>.txt`，与源文件同目录
    BesideInput,
    /// `<out_dir>/<相对 root 的目录，分隔符换成 '-'>-<文件名>.txt`
    Flattened { root: PathBuf, out_dir: PathBuf },
}

impl OutputTarget {
    /// 给定源文件对应的输出文件路径；控制台返回 None
    pub fn file_for(&self, input: &Path) -> Option<PathBuf> {
        match self {
            OutputTarget::Console => None,
            OutputTarget::BesideInput => {
                let mut s: OsString = input.as_os_str().to_owned();
                s.push(".txt");
                Some(PathBuf::from(s))
            }
            OutputTarget::Flattened { root, out_dir } => {
                Some(out_dir.join(flattened_name(root, input)))
            }
        }
    }
}

/// 把 `root` 下的相对目录压平成文件名前缀
fn flattened_name(root: &Path, input: &Path) -> String {
    let file = input.file_name().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let rel = input.parent().and_then(|p| p.strip_prefix(root).ok());
    let prefix: Vec<String> = rel
        .map(|r| r.components().map(|c| c.as_os_str().to_string_lossy().into_owned()).collect())
        .unwrap_or_default();
    if prefix.is_empty() {
        format!("{file}.txt")
    } else {
        format!("{}-{file}.txt", prefix.join("-"))
    }
}

/// 把每个文件的扫描结果写到目标
pub struct RunWriter<'w> {
    target: OutputTarget,
    format: OutputFormat,
    annotate_offsets: bool,
    /// 写文件时是否同时回显到控制台
    echo_console: bool,
    console: &'w mut dyn Write,
}

impl<'w> RunWriter<'w> {
    pub fn new(target: OutputTarget, format: OutputFormat, console: &'w mut dyn Write) -> Self {
        Self { target, format, annotate_offsets: false, echo_console: false, console }
    }

    pub fn annotate_offsets(mut self, on: bool) -> Self {
        self.annotate_offsets = on;
        self
    }

    pub fn echo_console(mut self, on: bool) -> Self {
        self.echo_console = on;
        self
    }

    /// 写出一个文件的结果；控制台写失败直接返回，文件写失败返回 `OutputUnavailable`
    pub fn write_file(&mut self, input: &Path, report: &ScanReport) -> Result<()> {
        let body = self.render(input, report)?;
        let to_file = self.target.file_for(input);

        if to_file.is_none() || self.echo_console {
            self.console.write_all(body.as_bytes())?;
            if self.format == OutputFormat::Text {
                // 控制台上每个文件之后空一行
                self.console.write_all(b"\n")?;
            }
        }

        if let Some(out) = to_file {
            if let Some(dir) = out.parent() {
                if !dir.as_os_str().is_empty() {
                    fs::create_dir_all(dir).map_err(|source| ScanError::OutputUnavailable {
                        path: dir.to_path_buf(),
                        source,
                    })?;
                }
            }
            fs::write(&out, body.as_bytes())
                .map_err(|source| ScanError::OutputUnavailable { path: out, source })?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.console.flush()?;
        Ok(())
    }

    fn render(&self, input: &Path, report: &ScanReport) -> Result<String> {
        match self.format {
            OutputFormat::Text => Ok(report.render(self.annotate_offsets)),
            OutputFormat::Json => {
                let file = input.to_string_lossy();
                let mut body = String::new();
                for run in &report.runs {
                    let rec = RunRecord {
                        file: &file,
                        offset: run.start_offset,
                        encoding: run.encoding,
                        text: &run.text,
                    };
                    body.push_str(&serde_json::to_string(&rec)?);
                    body.push('\n');
                }
                Ok(body)
            }
        }
    }
}
