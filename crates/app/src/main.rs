mod bootstrap;
mod logging;
mod settings;

use std::path::PathBuf;
use std::sync::Arc;

use kizashi_api::server::{AppState, start_server};
use kizashi_core::common::install_crypto_provider;
use kizashi_core::common::time::RealTimeProvider;
use kizashi_scanner::{NotificationDispatcher, ScanOrchestrator, ScanSettings};
use kizashi_store::signal::SqliteSignalStore;
use tokio::sync::{Semaphore, watch};
use tracing::{error, info, warn};

/// 日志目录
const LOG_DIR: &str = "logs";

/// # Summary
/// 应用启动入口，纯粹的 DI 容器。
/// 负责实例化所有具体实现组件并通过 `Arc<dyn Trait>` 注入到 ScanOrchestrator。
///
/// # Logic
/// 1. 加载配置并初始化日志。
/// 2. 实例化基础设施层 (Store、Provider、Notifier)，播种标的池。
/// 3. 构造应用服务层 (ScanOrchestrator)。
/// 4. 启动周期扫描循环与 HTTP 服务。
/// 5. 收到 Ctrl-C 后广播关闭信号，等待两者退出。
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 配置与日志
    let config_path = std::env::var("KIZASHI_CONFIG")
        .unwrap_or_else(|_| settings::DEFAULT_CONFIG_PATH.to_string());
    let config = settings::load_config(&PathBuf::from(&config_path))?;
    let _log_guard = logging::init_logging(LOG_DIR)?;
    info!(config = %config_path, "Kizashi scanner starting...");

    install_crypto_provider();

    // 2. 基础设施层
    kizashi_store::config::set_root_dir(PathBuf::from(&config.database.data_dir));
    let store = Arc::new(SqliteSignalStore::new().await?);
    bootstrap::seed_symbols(store.as_ref(), &config.symbols).await?;

    let provider = bootstrap::build_provider(&config.provider)?;
    let dispatcher = Arc::new(NotificationDispatcher::new(bootstrap::build_notifiers(
        &config.notify,
    )));
    info!(channels = ?dispatcher.channels(), "notification channels ready");

    // 3. 应用服务层
    let limiter = Arc::new(Semaphore::new(config.scanner.max_concurrent));
    let orchestrator = ScanOrchestrator::new(
        provider,
        store.clone(),
        store.clone(),
        dispatcher,
        limiter,
        Arc::new(RealTimeProvider),
        ScanSettings::from_config(&config.scanner),
    );

    // 4. 扫描循环与 HTTP 服务
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scanner = tokio::spawn(orchestrator.clone().run(shutdown_rx.clone()));

    let state = AppState {
        orchestrator,
        signals: store,
        webhook_secret: config.server.secret(),
    };
    if state.webhook_secret.is_none() {
        warn!("webhook secret not configured, /webhook accepts any caller");
    }
    let bind_addr = config.server.bind_addr();
    let mut server =
        tokio::spawn(async move { start_server(state, &bind_addr, shutdown_rx).await });

    // 5. 等待退出信号
    let server_finished = tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res?;
            info!("Shutdown signal received. Stopping...");
            false
        }
        res = &mut server => {
            match res {
                Ok(Ok(())) => warn!("API server exited"),
                Ok(Err(e)) => error!(error = %e, "API server failed"),
                Err(e) => error!(error = %e, "API server task aborted"),
            }
            true
        }
    };

    if let Err(e) = shutdown_tx.send(true) {
        warn!(error = %e, "shutdown receivers already gone");
    }
    if !server_finished {
        match server.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "API server failed during shutdown"),
            Err(e) => error!(error = %e, "API server task aborted"),
        }
    }
    if let Err(e) = scanner.await {
        error!(error = %e, "scanner loop aborted");
    }

    info!("Kizashi scanner stopped.");
    Ok(())
}
