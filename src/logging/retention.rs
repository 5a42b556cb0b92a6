//! 过期日志清理.

use anyhow::{Context, Result};
use chrono::{Duration as ChronoDuration, Local, NaiveDate};
use std::fs;
use std::path::Path;
use tracing::warn;

/// 删除早于保留期的 `{prefix}.{YYYY-MM-DD}.log`, 返回删除的文件数
pub fn cleanup_logs(directory: &Path, prefix: &str, retention_days: i64) -> Result<usize> {
    if !directory.exists() {
        return Ok(0);
    }
    let cutoff = Local::now().date_naive() - ChronoDuration::days(retention_days.max(0));
    cleanup_before(directory, prefix, cutoff)
}

fn cleanup_before(directory: &Path, prefix: &str, cutoff: NaiveDate) -> Result<usize> {
    let entries = fs::read_dir(directory)
        .with_context(|| format!("读取日志目录失败, path={}", directory.display()))?;

    let mut removed = 0;
    for entry in entries {
        let entry = entry?;
        let file_name = entry.file_name().to_string_lossy().to_string();
        let Some(date) = parse_log_name(&file_name, prefix) else {
            continue;
        };
        if date >= cutoff {
            continue;
        }
        match fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(err) => warn!("删除过期日志失败, file={}: {}", file_name, err),
        }
    }
    Ok(removed)
}

fn parse_log_name(file_name: &str, prefix: &str) -> Option<NaiveDate> {
    let date_part = file_name
        .strip_prefix(prefix)?
        .strip_prefix('.')?
        .strip_suffix(".log")?;
    if date_part.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}
