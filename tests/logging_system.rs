use chrono::Datelike;
use std::fs;
use std::path::{Path, PathBuf};
use yin::logging::{LoggingConfig, build_log_path, cleanup_logs, init};

// 注意: tracing 的全局订阅器只能初始化一次,
// 本文件中只有 test_logging_init_writes_file 调用 init()

/// 获取当前日期的日志文件路径
fn get_today_log_path(dir: &Path, prefix: &str) -> PathBuf {
    let today = chrono::Local::now().date_naive();
    dir.join(format!("{}.{}.log", prefix, today.format("%Y-%m-%d")))
}

#[test]
fn test_logging_init_writes_file() {
    let temp_dir = tempfile::TempDir::new().expect("创建临时目录失败");
    let log_dir = temp_dir.path().join("logs");
    fs::create_dir_all(&log_dir).unwrap();
    // 过期文件应在初始化时被清理
    let stale = log_dir.join("yin-test.2000-01-01.log");
    fs::write(&stale, b"old").unwrap();

    let config = LoggingConfig {
        level: "info".to_string(),
        directory: Some(log_dir.clone()),
        file_prefix: "yin-test".to_string(),
        retention_days: 7,
    };
    init(config.clone()).expect("日志初始化失败");
    assert!(!stale.exists(), "过期日志应该被删除");

    tracing::info!("信息日志_INFO_MSG");
    tracing::debug!("调试日志_DEBUG_MSG");
    // 库 crate 通过 log 门面输出
    log::warn!("桥接日志_LOG_WARN");

    std::thread::sleep(std::time::Duration::from_millis(200));

    let log_file = get_today_log_path(&log_dir, "yin-test");
    let content = fs::read_to_string(&log_file)
        .unwrap_or_else(|e| panic!("读取日志文件失败: {:?}, 错误: {}", log_file, e));
    assert!(content.contains("信息日志_INFO_MSG"), "文件内容:\n{}", content);
    assert!(content.contains("桥接日志_LOG_WARN"), "文件内容:\n{}", content);
    assert!(content.contains("INFO"));
    assert!(!content.contains("调试日志_DEBUG_MSG"), "debug 日志应该被过滤掉");

    // 重复初始化返回错误而不是 panic
    assert!(init(config).is_err());
}

#[test]
fn test_logging_file_naming_format() {
    let today = chrono::Local::now().date_naive();
    for prefix in ["yin", "yin-cli", "decoder"] {
        let path = build_log_path(Path::new("logs"), prefix, today);
        let file_name = path.file_name().unwrap().to_string_lossy().to_string();

        assert!(file_name.starts_with(prefix));
        assert!(file_name.ends_with(".log"));
        // 格式: {prefix}.{YYYY-MM-DD}.log
        let date_part = &file_name[prefix.len() + 1..file_name.len() - 4];
        assert_eq!(date_part.len(), 10);
        assert_eq!(
            date_part,
            format!("{:04}-{:02}-{:02}", today.year(), today.month(), today.day())
        );
    }
}

#[test]
fn test_cleanup_keeps_recent_files() {
    let temp_dir = tempfile::TempDir::new().expect("创建临时目录失败");
    let dir = temp_dir.path();
    let today = get_today_log_path(dir, "keep");
    fs::write(&today, b"today").unwrap();
    fs::write(dir.join("keep.1999-12-31.log"), b"old").unwrap();

    let removed = cleanup_logs(dir, "keep", 30).unwrap();
    assert_eq!(removed, 1);
    assert!(today.exists());
}
