use std::error::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// # Summary
/// 初始化全局日志：控制台 + 按天滚动的文件。
///
/// # Logic
/// 1. 过滤级别取 `RUST_LOG`，缺省为 `info`。
/// 2. 文件写入 `<log_dir>/kizashi.log.<日期>`，经由非阻塞 writer。
///
/// # Returns
/// 非阻塞 writer 的 guard，调用方必须持有到进程退出，否则尾部日志会丢失。
pub fn init_logging(log_dir: &str) -> Result<WorkerGuard, Box<dyn Error>> {
    std::fs::create_dir_all(log_dir)?;
    let file = RollingFileAppender::new(Rotation::DAILY, log_dir, "kizashi.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stdout))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_line_number(true)
                .with_writer(file_writer),
        )
        .try_init()?;

    Ok(guard)
}
