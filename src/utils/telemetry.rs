// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// 默认日志过滤规则
pub const DEFAULT_FILTER: &str = "info,storage_scraper=debug";
/// 日志文件过滤规则，与控制台级别无关
pub const FILE_FILTER: &str = "info,storage_scraper=debug";
/// 日志文件名（按天滚动，实际文件带日期后缀）
pub const LOG_FILE_NAME: &str = "storage_scraper.log";

/// 根据 verbose 标志选择日志过滤规则，`RUST_LOG` 优先
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        DEFAULT_FILTER
    }
}

/// 创建按天滚动的非阻塞日志文件写入器
///
/// 返回的 `WorkerGuard` 被丢弃时会刷新剩余日志
pub fn file_writer(log_dir: impl AsRef<Path>) -> (NonBlocking, WorkerGuard) {
    tracing_appender::non_blocking(rolling::daily(log_dir, LOG_FILE_NAME))
}

/// 初始化日志
///
/// 控制台层遵循 `RUST_LOG` 或 verbose 标志，文件层始终记录 debug 级别的本 crate 日志。
///
/// # 参数
///
/// * `verbose` - 是否输出 debug 日志到控制台
/// * `log_dir` - 日志文件目录
///
/// # 返回值
///
/// 文件写入器的 guard，调用方需持有到进程结束
pub fn init_telemetry(verbose: bool, log_dir: impl AsRef<Path>) -> WorkerGuard {
    let (writer, guard) = file_writer(log_dir);

    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter(verbose).into());

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_filter(EnvFilter::new(FILE_FILTER));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_filter(console_filter))
        .with(file_layer)
        .init();

    guard
}
