//! 串组装器：在缓冲区上驱动宽/窄两个解码器，累积候选串并交给审核
//!
//! 每个游标位置的尝试顺序：
//! 1. 若开启宽串探测，先试宽串（宽串原子且较长，窄模式会把其中的零字节拆碎）；
//!    上次失败位置之前的同奇偶起点不再重试，整体保持线性；
//! 2. 宽串失败或未开启时走窄解码：接受则追加到当前串，
//!    拒绝则收尾当前串并审核；
//! 3. 缓冲区结束时收尾仍未关闭的串。
use tracing::warn;

use crate::error::Result;
use crate::narrow::decode_narrow;
use crate::options::{RunCounts, ScanOptions};
use crate::types::{AcceptedRun, DecodedUnit, EncodingKind};
use crate::vetting::Vetter;
use crate::wide::read_wide_run;

/// 宽串前紧邻窄串合并时使用的分隔符
const MERGE_SEPARATOR: char = '\n';

/// 正在累积的候选串
#[derive(Debug, Default)]
struct Run {
    start_offset: Option<usize>,
    text: String,
    contains_wide_unit: bool,
}

/// 预编译好的扫描器；可对任意多个缓冲区复用
#[derive(Debug, Clone)]
pub struct Scanner {
    opts: ScanOptions,
    vetter: Vetter,
}

impl Scanner {
    pub fn new(opts: ScanOptions) -> Result<Self> {
        opts.validate()?;
        let vetter = Vetter::new(&opts)?;
        Ok(Self { opts, vetter })
    }

    pub fn options(&self) -> &ScanOptions {
        &self.opts
    }

    /// 惰性扫描；每次调用都从偏移 0 重新开始
    pub fn scan<'a>(&'a self, buf: &'a [u8]) -> Runs<'a> {
        Runs {
            buf,
            cursor: 0,
            run: Run::default(),
            vetter: &self.vetter,
            wide_unicode: self.opts.wide_unicode,
            wide_runs: self.opts.wide_runs,
            wide_fail_until: [0; 2],
            counts: RunCounts::default(),
        }
    }

    /// 一次性扫描整个缓冲区，返回全部通过审核的串与计数
    pub fn scan_to_report(&self, buf: &[u8]) -> ScanReport {
        let mut runs = self.scan(buf);
        let accepted: Vec<AcceptedRun> = runs.by_ref().collect();
        ScanReport { runs: accepted, counts: runs.counts() }
    }
}

/// 单个缓冲区的扫描结果
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub runs: Vec<AcceptedRun>,
    pub counts: RunCounts,
}

impl ScanReport {
    /// 按行拼接输出文本
    pub fn render(&self, annotate_offsets: bool) -> String {
        self.runs.iter().map(|r| r.to_line(annotate_offsets)).collect()
    }
}

/// 便捷入口：按给定选项扫描一个缓冲区
pub fn scan_buffer(buf: &[u8], opts: &ScanOptions) -> Result<ScanReport> {
    Ok(Scanner::new(opts.clone())?.scan_to_report(buf))
}

/// 通过审核的串的惰性序列
#[derive(Debug)]
pub struct Runs<'a> {
    buf: &'a [u8],
    cursor: usize,
    run: Run,
    vetter: &'a Vetter,
    wide_unicode: bool,
    wide_runs: bool,
    /// 按起点奇偶分别记录：低于该下标的起点已知宽串必然失败
    wide_fail_until: [usize; 2],
    counts: RunCounts,
}

impl<'a> Runs<'a> {
    /// 截至目前已产出的串计数
    pub fn counts(&self) -> RunCounts {
        self.counts
    }

    /// 当前游标（已消费到的位置）
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// 宽串命中：宽串独立成串立即收尾；若此前已有窄串在累积，
    /// 窄串按降低的阈值单独检查，合格则去掉首尾空白后接在宽串前面
    /// 一并输出。
    fn absorb_wide(&mut self, at: usize, wide_text: String) -> Option<AcceptedRun> {
        let mut run = std::mem::take(&mut self.run);
        run.start_offset.get_or_insert(at);
        run.contains_wide_unit = true;

        if !run.text.is_empty() && self.vetter.passes_reduced(&run.text) {
            let narrow = run.text.trim();
            warn!(
                offset = run.start_offset.unwrap_or(at),
                narrow = %narrow,
                wide = %wide_text,
                "wide run directly follows narrow text, merging"
            );
            self.counts.adjacent_merges += 1;
            run.text = format!("{narrow}{MERGE_SEPARATOR}{wide_text}");
        } else {
            run.text = wide_text;
            run.start_offset = Some(at);
        }
        self.finish(run)
    }

    /// 收尾当前窄串（空串不审核）
    fn close(&mut self) -> Option<AcceptedRun> {
        let run = std::mem::take(&mut self.run);
        self.finish(run)
    }

    fn finish(&mut self, run: Run) -> Option<AcceptedRun> {
        if run.text.is_empty() || !self.vetter.vet(&run.text) {
            return None;
        }
        let encoding = if run.contains_wide_unit {
            self.counts.wide_runs += 1;
            EncodingKind::Wide
        } else {
            self.counts.narrow_runs += 1;
            EncodingKind::Narrow
        };
        Some(AcceptedRun {
            start_offset: run.start_offset.unwrap_or(0),
            text: run.text,
            encoding,
        })
    }
}

impl<'a> Iterator for Runs<'a> {
    type Item = AcceptedRun;

    fn next(&mut self) -> Option<AcceptedRun> {
        while self.cursor < self.buf.len() {
            let at = self.cursor;
            let parity = at & 1;
            if self.wide_runs && at >= self.wide_fail_until[parity] {
                match read_wide_run(self.buf, at, self.vetter.min_length()) {
                    Ok((fragment, next)) => {
                        self.cursor = next;
                        if let Some(run) = self.absorb_wide(at, fragment) {
                            return Some(run);
                        }
                        continue;
                    }
                    Err(failed_at) => self.wide_fail_until[parity] = failed_at,
                }
            }

            let unit = decode_narrow(self.buf, at, self.wide_unicode);
            self.cursor = unit.next();
            match unit {
                DecodedUnit::Accepted { fragment, .. } => {
                    self.run.start_offset.get_or_insert(at);
                    self.run.text.push_str(&fragment);
                }
                DecodedUnit::Rejected { .. } => {
                    if let Some(run) = self.close() {
                        return Some(run);
                    }
                }
            }
        }
        self.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(buf: &[u8], opts: ScanOptions) -> Vec<String> {
        let scanner = Scanner::new(opts).unwrap();
        scanner.scan(buf).map(|r| r.text).collect()
    }

    fn wide(s: &str) -> Vec<u8> {
        s.bytes().flat_map(|b| [b, 0]).collect()
    }

    #[test]
    fn plain_ascii_is_one_run() {
        let text = "Hello, World! This is ASCII text.";
        let report = scan_buffer(text.as_bytes(), &ScanOptions::new(6)).unwrap();
        assert_eq!(report.runs.len(), 1);
        assert_eq!(report.runs[0].text, text);
        assert_eq!(report.runs[0].start_offset, 0);
        assert_eq!(report.runs[0].encoding, EncodingKind::Narrow);
        assert_eq!(
            report.counts,
            RunCounts { narrow_runs: 1, wide_runs: 0, adjacent_merges: 0 }
        );
    }

    #[test]
    fn short_run_is_dropped_before_long_one() {
        let buf = [0x00, 0x01, b'O', b'K', 0x02, b'a', b'b', b'c', b'd', b'e', b'f'];
        let report = scan_buffer(&buf, &ScanOptions::new(5)).unwrap();
        assert_eq!(report.runs.len(), 1);
        assert_eq!(report.runs[0].text, "abcdef");
        assert_eq!(report.runs[0].start_offset, 5);
    }

    #[test]
    fn run_ending_exactly_at_buffer_end() {
        assert_eq!(texts(b"\x00\x00abcdef", ScanOptions::new(6)), vec!["abcdef"]);
        assert!(texts(b"\x00\x00abcde", ScanOptions::new(6)).is_empty());
    }

    #[test]
    fn runs_split_on_rejected_bytes() {
        let buf = b"first line\x00\x13second line\x7fthird";
        assert_eq!(texts(buf, ScanOptions::new(6)), vec!["first line", "second line"]);
    }

    #[test]
    fn utf8_char_joins_surrounding_text() {
        let opts = ScanOptions::new(3).with_wide_unicode(true);
        assert_eq!(texts("a€b".as_bytes(), opts.clone()), vec!["a€b"]);
        assert_eq!(texts("x\u{1F600}y".as_bytes(), opts), vec!["x\u{1F600}y"]);
    }

    #[test]
    fn utf8_ignored_without_unicode_mode() {
        assert_eq!(texts("abc€def".as_bytes(), ScanOptions::new(3)), vec!["abc", "def"]);
    }

    #[test]
    fn truncated_utf8_at_end_closes_run() {
        let mut buf = b"abcdef".to_vec();
        buf.extend([0xE2, 0x82]);
        let opts = ScanOptions::new(6).with_wide_unicode(true);
        assert_eq!(texts(&buf, opts), vec!["abcdef"]);
    }

    #[test]
    fn wide_run_is_reported_as_wide() {
        let buf = [b'H', 0, b'i', 0, 0, 0];
        let scanner = Scanner::new(ScanOptions::new(2).with_wide_runs(true)).unwrap();
        let runs: Vec<AcceptedRun> = scanner.scan(&buf).collect();
        assert_eq!(
            runs,
            vec![AcceptedRun { start_offset: 0, text: "Hi".into(), encoding: EncodingKind::Wide }]
        );
    }

    #[test]
    fn wide_bytes_without_wide_mode_are_fragments() {
        let mut buf = wide("Hello World");
        buf.extend([0, 0]);
        assert!(texts(&buf, ScanOptions::new(2)).is_empty());
    }

    #[test]
    fn wide_run_with_truncated_terminator_is_not_reported() {
        let mut buf = wide("Hello World");
        buf.push(0);
        let report = scan_buffer(&buf, &ScanOptions::new(2).with_wide_runs(true)).unwrap();
        assert!(report.runs.is_empty());
        assert_eq!(report.counts.wide_runs, 0);
    }

    #[test]
    fn narrow_text_before_wide_run_is_merged() {
        let mut buf = b"abc".to_vec();
        buf.extend(wide("World"));
        buf.extend([0, 0]);
        let report = scan_buffer(&buf, &ScanOptions::new(5).with_wide_runs(true)).unwrap();
        assert_eq!(
            report.runs,
            vec![AcceptedRun {
                start_offset: 0,
                text: "abc\nWorld".into(),
                encoding: EncodingKind::Wide
            }]
        );
        assert_eq!(
            report.counts,
            RunCounts { narrow_runs: 0, wide_runs: 1, adjacent_merges: 1 }
        );
    }

    #[test]
    fn terms_apply_to_merged_text() {
        let mut buf = b"abc".to_vec();
        buf.extend(wide("World"));
        buf.extend([0, 0]);
        let opts = ScanOptions::new(5).with_wide_runs(true);

        let suppressed = scan_buffer(&buf, &opts.clone().with_suppress_terms(["ABC\nworld"]))
            .unwrap();
        assert!(suppressed.runs.is_empty());
        assert_eq!(
            suppressed.counts,
            RunCounts { narrow_runs: 0, wide_runs: 0, adjacent_merges: 1 }
        );

        // 整个宽串单独不会被排除词命中
        let whole = scan_buffer(&buf, &opts.clone().with_suppress_terms(["world"])).unwrap();
        assert_eq!(whole.runs.len(), 1);
        assert_eq!(whole.runs[0].text, "abc\nWorld");

        // 包含词只出现在窄串前缀里，也对合并后的整串生效
        let included = scan_buffer(&buf, &opts.clone().with_include_terms(["abc"])).unwrap();
        assert_eq!(included.runs.len(), 1);
        assert_eq!(included.runs[0].start_offset, 0);
        assert_eq!(included.runs[0].encoding, EncodingKind::Wide);

        let excluded = scan_buffer(&buf, &opts.with_include_terms(["zzz"])).unwrap();
        assert!(excluded.runs.is_empty());
        assert_eq!(excluded.counts.adjacent_merges, 1);
    }

    #[test]
    fn short_narrow_text_before_wide_run_is_dropped() {
        let mut buf = b"ab".to_vec();
        buf.extend(wide("World"));
        buf.extend([0, 0]);
        let report = scan_buffer(&buf, &ScanOptions::new(5).with_wide_runs(true)).unwrap();
        assert_eq!(
            report.runs,
            vec![AcceptedRun {
                start_offset: 2,
                text: "World".into(),
                encoding: EncodingKind::Wide
            }]
        );
        assert_eq!(report.counts.adjacent_merges, 0);
    }

    #[test]
    fn narrow_and_wide_runs_in_one_buffer() {
        let mut buf = b"\x01narrow text\x00\x00".to_vec();
        let wide_at = buf.len();
        buf.extend(wide("wide text"));
        buf.extend([0, 0, 0x05]);
        buf.extend(b"tail text");
        let scanner = Scanner::new(ScanOptions::new(6).with_wide_runs(true)).unwrap();
        let runs: Vec<AcceptedRun> = scanner.scan(&buf).collect();
        assert_eq!(
            runs,
            vec![
                AcceptedRun {
                    start_offset: 1,
                    text: "narrow text".into(),
                    encoding: EncodingKind::Narrow
                },
                AcceptedRun {
                    start_offset: wide_at,
                    text: "wide text".into(),
                    encoding: EncodingKind::Wide
                },
                AcceptedRun {
                    start_offset: buf.len() - 9,
                    text: "tail text".into(),
                    encoding: EncodingKind::Narrow
                },
            ]
        );
    }

    #[test]
    fn filters_apply_to_assembled_runs() {
        let buf = b"Untitled\x00Invoice 2024\x00Receipt 2024\x00";
        let opts = ScanOptions::new(6)
            .with_suppress_terms(["untitled"])
            .with_include_terms(["invoice", "untitled"]);
        assert_eq!(texts(buf, opts), vec!["Invoice 2024"]);
    }

    #[test]
    fn scan_is_restartable() {
        let buf = b"\x00one run here\x00another run\x00";
        let scanner = Scanner::new(ScanOptions::new(6)).unwrap();
        let first: Vec<AcceptedRun> = scanner.scan(buf).collect();
        let second: Vec<AcceptedRun> = scanner.scan(buf).collect();
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[test]
    fn iterator_is_fused_after_end() {
        let scanner = Scanner::new(ScanOptions::new(6)).unwrap();
        let mut runs = scanner.scan(b"abcdefgh");
        assert!(runs.next().is_some());
        assert!(runs.next().is_none());
        assert!(runs.next().is_none());
        assert_eq!(runs.cursor(), 8);
    }

    #[test]
    fn render_with_offsets() {
        let buf = b"\x00\x00\x00\x00abcdef\x00ghijkl";
        let report = scan_buffer(buf, &ScanOptions::new(6)).unwrap();
        assert_eq!(report.render(true), "00000004: abcdef\n0000000B: ghijkl\n");
        assert_eq!(report.render(false), "abcdef\nghijkl\n");
    }

    #[test]
    fn unterminated_wide_stretch_scans_in_linear_time() {
        let mut buf = b"\xff\xfe".to_vec();
        buf.extend(std::iter::repeat([b'a', 0]).take(512 * 1024).flatten());
        let opts = ScanOptions::new(6).with_wide_runs(true);
        let scanner = Scanner::new(opts).unwrap();

        let started = std::time::Instant::now();
        let report = scanner.scan_to_report(&buf);
        let elapsed = started.elapsed();

        assert!(report.runs.is_empty());
        assert!(elapsed < std::time::Duration::from_secs(10), "took {elapsed:?}");
    }

    #[test]
    fn failed_wide_attempt_keeps_later_runs() {
        // 奇数起点的未终止宽串之后，偶数与奇数起点的正常宽串都不受影响
        let mut buf = vec![0x01];
        buf.extend(wide("dangling"));
        buf.push(0x02);
        let first_at = buf.len();
        buf.extend(wide("first run"));
        buf.extend([0, 0, 0x03]);
        let second_at = buf.len();
        buf.extend(wide("second run"));
        buf.extend([0, 0]);
        assert_eq!(first_at % 2, 0);
        assert_eq!(second_at % 2, 1);

        let scanner = Scanner::new(ScanOptions::new(6).with_wide_runs(true)).unwrap();
        let runs: Vec<(usize, String)> =
            scanner.scan(&buf).map(|r| (r.start_offset, r.text)).collect();
        assert_eq!(
            runs,
            vec![(first_at, "first run".to_string()), (second_at, "second run".to_string())]
        );
    }
}
