//! 扫描主流程与并行调度
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error};

use crate::assembler::{ScanReport, Scanner};
use crate::error::{Result, ScanError};
use crate::options::ScanStats;
use crate::select::Selection;
use crate::sink::RunWriter;

/// 整读一个输入文件；句柄在返回前释放
pub fn read_input(path: &Path) -> Result<Vec<u8>> {
    let read = || -> std::io::Result<Vec<u8>> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(buf)
    };
    read().map_err(|source| ScanError::InputUnavailable { path: path.to_path_buf(), source })
}

/// 读取并扫描单个文件
pub fn scan_file(path: &Path, scanner: &Scanner) -> Result<ScanReport> {
    let buf = read_input(path)?;
    Ok(scanner.scan_to_report(&buf))
}

/// 按 `selection.included` 的顺序扫描并写出结果
/// - 读取失败只记日志并计入 `files_failed`，不影响其余文件
/// - 输出文件写失败同样只记日志
/// - `threads` 为 None 时取 CPU 核数；大于 1 且文件多于 1 个时并行扫描，写出顺序不变
pub fn scan_and_write(
    selection: &Selection,
    writer: &mut RunWriter<'_>,
    scanner: &Scanner,
    threads: Option<usize>,
) -> Result<ScanStats> {
    let mut stats = ScanStats { files_excluded: selection.excluded.len(), ..ScanStats::default() };

    let threads = threads.unwrap_or_else(num_cpus::get);
    let use_parallel = threads > 1 && selection.included.len() > 1;

    if use_parallel {
        scan_and_write_parallel(&selection.included, writer, scanner, &mut stats, threads)?;
    } else {
        for path in &selection.included {
            let res = scan_file(path, scanner);
            record(path, res, writer, &mut stats)?;
        }
    }
    writer.flush()?;
    Ok(stats)
}

/// 汇总单个文件的结果；只有控制台写失败会中止整个流程
fn record(
    path: &Path,
    res: Result<ScanReport>,
    writer: &mut RunWriter<'_>,
    stats: &mut ScanStats,
) -> Result<()> {
    let report = match res {
        Ok(r) => r,
        Err(err) => {
            error!(file = %path.display(), %err, "skipping file");
            stats.files_failed += 1;
            return Ok(());
        }
    };
    stats.files_scanned += 1;
    stats.runs.add(&report.counts);
    debug!(
        file = %path.display(),
        narrow = report.counts.narrow_runs,
        wide = report.counts.wide_runs,
        "file scanned"
    );
    match writer.write_file(path, &report) {
        Ok(()) => Ok(()),
        Err(err @ ScanError::OutputUnavailable { .. }) => {
            error!(file = %path.display(), %err, "cannot write output");
            stats.outputs_failed += 1;
            Ok(())
        }
        Err(err) => Err(err),
    }
}

/// 并行调度：
/// - 后台线程内用 Rayon 线程池并行扫描，每个任务独占自己的缓冲区与串状态
/// - 当前线程作为唯一 Writer，按 idx 重排后写出，保证顺序稳定
fn scan_and_write_parallel(
    files: &[PathBuf],
    writer: &mut RunWriter<'_>,
    scanner: &Scanner,
    stats: &mut ScanStats,
    threads: usize,
) -> Result<()> {
    use crossbeam_channel as channel;
    use rayon::prelude::*;
    use std::collections::BTreeMap;

    type Msg = (usize /*idx*/, Result<ScanReport>);
    let (tx, rx) = channel::bounded::<Msg>(256);

    let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
    let scanner = Arc::new(scanner.clone());
    let files_vec: Vec<(usize, PathBuf)> = files.iter().cloned().enumerate().collect();

    let scan_thread = std::thread::spawn(move || {
        pool.install(|| {
            files_vec.par_iter().for_each_with(tx, |tx, (idx, path)| {
                let _ = tx.send((*idx, scan_file(path, &scanner)));
            });
        });
        // 结束后 Sender 全部被丢弃，Receiver 将收到关闭信号
    });

    let mut next_idx: usize = 0;
    let mut pending: BTreeMap<usize, Result<ScanReport>> = BTreeMap::new();
    let mut outcome: Result<()> = Ok(());

    while let Ok((idx, res)) = rx.recv() {
        pending.insert(idx, res);
        while let Some(res) = pending.remove(&next_idx) {
            // 控制台已失败时仍需把通道读空，让扫描线程正常退出
            if outcome.is_ok() {
                outcome = record(&files[next_idx], res, writer, stats);
            }
            next_idx += 1;
        }
    }

    if scan_thread.join().is_err() {
        error!("scan worker panicked");
    }
    outcome
}
