use anyhow::{bail, Context, Result};
use asciify_core::{
    load_filter_terms, scan_and_write, FileSelector, OutputFormat, OutputTarget, RunWriter,
    ScanOptions, Scanner,
};
use clap::{Parser, ValueEnum};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 命令行入口（基于 clap）
#[derive(Parser, Debug)]
#[command(
    name = "asciify",
    version,
    about = "从二进制文件中提取可读文本（可选 UTF-8 / 大端 UTF-16）",
    long_about = "从二进制文件中提取可读文本（可选 UTF-8 / 大端 UTF-16）。\n\
                  默认只取低位 ASCII（0x20-0x7E、TAB、LF），长度不少于 6 个字符，输出到控制台。"
)]
struct Cli {
    /// 输入文件名或掩码（`*`、`?`）；不含目录时相对当前目录
    #[arg(short = 'i', long)]
    input: String,

    /// 最小串长；≤1 时取 6
    #[arg(long = "min-len", default_value_t = 6)]
    min_len: usize,

    /// 接受合法 UTF-8 多字节字符（噪声会明显变多）
    #[arg(long)]
    utf8: bool,

    /// 探测大端 UTF-16 串（仅 ASCII 范围字符）
    #[arg(long)]
    utf16: bool,

    /// 字母数字及空格 , . CR LF 的最低百分比；0 表示不限制，80 左右可明显降噪
    #[arg(
        long = "alpha-ratio",
        default_value_t = 0,
        value_parser = clap::value_parser!(u8).range(0..=100)
    )]
    alpha_ratio: u8,

    /// 整串（忽略大小写）等于该词即丢弃，可重复
    #[arg(long)]
    suppress: Vec<String>,

    /// 只保留（忽略大小写）包含该词的串，可重复
    #[arg(long)]
    include: Vec<String>,

    /// 过滤词文件（TOML，[filters] suppress / include）
    #[arg(long)]
    filters: Option<PathBuf>,

    /// 每行前加 8 位大写十六进制偏移
    #[arg(long)]
    offsets: bool,

    /// 递归子目录
    #[arg(short = 'r')]
    recurse: bool,

    /// 文件名含日期/序号时，截到该串之前作为基名，同目录只处理最新的一个（区分大小写）
    #[arg(long = "skip-older-match")]
    skip_older_match: Option<String>,

    /// 为每个文件写出 `<文件名>.txt`
    #[arg(short = 'o')]
    write_files: bool,

    /// 输出目录；目录层级压平为 dir1-dir2-文件名.txt（隐含 -o）
    #[arg(short = 'p')]
    write_path: Option<PathBuf>,

    /// 写文件的同时输出到控制台
    #[arg(short = 'v')]
    verbose: bool,

    /// 调试日志：列出处理/排除的文件与统计
    #[arg(short = 'd', long)]
    debug: bool,

    /// 输出格式
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// 线程数（"auto"=CPU 核心数；1 为串行）
    #[arg(long, default_value = "auto")]
    threads: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    // 初始化日志（支持通过 RUST_LOG 控制等级，例如 info、debug）
    init_tracing(cli.debug);

    let (folder, mask) = split_input(&cli.input)?;
    info!(folder = %folder.display(), %mask, "starting scan");

    // 组装扫描参数：命令行过滤词在前，过滤文件中的词追加在后
    let mut opts = ScanOptions::new(cli.min_len)
        .with_wide_unicode(cli.utf8)
        .with_wide_runs(cli.utf16)
        .with_min_alpha_ratio(cli.alpha_ratio)
        .with_suppress_terms(cli.suppress)
        .with_include_terms(cli.include)
        .with_annotate_offsets(cli.offsets);
    if let Some(path) = &cli.filters {
        opts = load_filter_terms(path).context("load filter file")?.apply(opts);
    }
    let scanner = Scanner::new(opts).context("invalid scan options")?;

    let selection = FileSelector::new(&mask)
        .context("invalid file mask")?
        .recursive(cli.recurse)
        .skip_older_match(cli.skip_older_match)
        .select(&folder);
    if selection.included.is_empty() && selection.excluded.is_empty() && !cli.recurse {
        bail!("no files matching {mask} in {}", folder.display());
    }
    for path in &selection.included {
        debug!(file = %path.display(), "included");
    }
    for path in &selection.excluded {
        debug!(file = %path.display(), "excluded");
    }

    let target = match (cli.write_path, cli.write_files) {
        (Some(out_dir), _) => OutputTarget::Flattened { root: folder.clone(), out_dir },
        (None, true) => OutputTarget::BesideInput,
        (None, false) => OutputTarget::Console,
    };
    let format = match cli.format {
        Format::Text => OutputFormat::Text,
        Format::Json => OutputFormat::Json,
    };

    let stdout = std::io::stdout();
    let mut console = BufWriter::new(stdout.lock());
    let mut writer = RunWriter::new(target, format, &mut console)
        .annotate_offsets(scanner.options().annotate_offsets)
        .echo_console(cli.verbose);

    let stats = scan_and_write(&selection, &mut writer, &scanner, parse_threads(&cli.threads))
        .context("scan and write failed")?;
    drop(writer);
    console.flush().ok();

    info!(
        files_scanned = stats.files_scanned,
        files_failed = stats.files_failed,
        files_excluded = stats.files_excluded,
        outputs_failed = stats.outputs_failed,
        narrow_runs = stats.runs.narrow_runs,
        wide_runs = stats.runs.wide_runs,
        adjacent_merges = stats.runs.adjacent_merges,
        "scan finished"
    );
    Ok(())
}

fn init_tracing(debug: bool) {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    // 日志走 stderr，stdout 只留提取出的文本；RUST_LOG 优先
    let default_level = if debug { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// 拆分输入参数为（目录，文件名掩码）；不含目录时取当前目录
fn split_input(input: &str) -> Result<(PathBuf, String)> {
    let path = Path::new(input);
    let (folder, mask) = match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => {
            (parent.to_path_buf(), name.to_string_lossy().into_owned())
        }
        _ => (std::env::current_dir().context("resolve current directory")?, input.to_string()),
    };
    if !folder.is_dir() {
        bail!("directory not found: {}", folder.display());
    }
    Ok((folder, mask))
}

/// 解析线程参数
fn parse_threads(s: &str) -> Option<usize> {
    if s.eq_ignore_ascii_case("auto") {
        return None;
    }
    match s.parse::<usize>() {
        Ok(n) if n >= 1 => Some(n),
        _ => None,
    }
}
