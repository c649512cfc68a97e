use std::fmt::Write as _;

use chrono::NaiveDateTime;
use digest_common::FetchStats;

/// Failure lines shown in the email; the rest stay in the log.
const MAX_ERRORS_SHOWN: usize = 5;

/// Markdown appendix describing the fetch run.
pub fn format_stats(stats: &FetchStats, generated_at: NaiveDateTime) -> String {
    let mut out = String::from("\n---\n\n## 📊 本次抓取统计\n\n");
    let _ = writeln!(out, "- 总账号数: {}", stats.total_accounts);
    let _ = writeln!(out, "- 成功抓取: {}", stats.successful_accounts);
    let _ = writeln!(out, "- 失败账号: {}", stats.failed_accounts);
    let _ = writeln!(out, "- 总推文数: {}", stats.total_tweets);
    if stats.filtered_old_tweets > 0 {
        let _ = writeln!(out, "- 过滤旧推文: {}", stats.filtered_old_tweets);
    }
    if stats.threads_detected > 0 {
        let _ = writeln!(out, "- 合并 Thread: {}", stats.threads_detected);
    }
    if let Some(rate) = stats.success_rate() {
        let _ = writeln!(out, "- 成功率: {rate:.1}%");
    }

    if !stats.errors.is_empty() {
        out.push_str("\n失败账号:\n");
        for e in stats.errors.iter().take(MAX_ERRORS_SHOWN) {
            let _ = writeln!(out, "- {e}");
        }
    }

    let _ = write!(out, "\n生成时间: {}", generated_at.format("%Y-%m-%d %H:%M:%S"));
    out
}
