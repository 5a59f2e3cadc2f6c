//! 启动期的组件装配：行情源选择、通知渠道构建、标的池播种。

use kizashi_core::config::{NotifyConfig, ProviderConfig, ProviderKind, SymbolsConfig, parse_seed_lines};
use kizashi_core::market::error::MarketError;
use kizashi_core::market::port::MarketDataProvider;
use kizashi_core::notify::port::Notifier;
use kizashi_core::store::error::StoreError;
use kizashi_core::store::port::SymbolStore;
use kizashi_feed::csv::CsvProvider;
use kizashi_feed::yahoo::YahooProvider;
use kizashi_notify::telegram::TelegramNotifier;
use kizashi_notify::whatsapp::WhatsAppNotifier;
use std::sync::Arc;
use tracing::{info, warn};

/// 按配置选定唯一的行情源
pub fn build_provider(cfg: &ProviderConfig) -> Result<Arc<dyn MarketDataProvider>, MarketError> {
    let provider: Arc<dyn MarketDataProvider> = match cfg.kind {
        ProviderKind::Yahoo => Arc::new(YahooProvider::new(&cfg.yahoo_range)?),
        ProviderKind::Csv => Arc::new(CsvProvider::new(&cfg.csv_dir)),
    };
    info!(provider = provider.name(), "market data provider selected");
    Ok(provider)
}

/// # Summary
/// 只为凭据完整的渠道构建通知器。
///
/// # Logic
/// 构建失败的渠道记录警告后跳过，不阻止启动。
pub fn build_notifiers(cfg: &NotifyConfig) -> Vec<Arc<dyn Notifier>> {
    let mut notifiers: Vec<Arc<dyn Notifier>> = Vec::new();

    if let Some((token, chat_id)) = cfg.telegram() {
        match TelegramNotifier::new(token, chat_id) {
            Ok(n) => notifiers.push(Arc::new(n)),
            Err(e) => warn!(error = %e, "telegram notifier disabled"),
        }
    }
    if let Some((sid, token, from, to)) = cfg.whatsapp() {
        match WhatsAppNotifier::new(sid, token, from, to) {
            Ok(n) => notifiers.push(Arc::new(n)),
            Err(e) => warn!(error = %e, "whatsapp notifier disabled"),
        }
    }

    if notifiers.is_empty() {
        warn!("no notification channel configured, alerts will only be logged");
    }
    notifiers
}

/// # Summary
/// 将配置与种子文件中的标的写入标的池 (已存在的保持不变)。
///
/// # Logic
/// 1. 配置中的逗号列表，来源记为 `config`。
/// 2. 种子文件每行一个标的，`#` 之后为注释，来源记为 `file`；文件不存在只告警。
///
/// # Returns
/// 新增的标的数量。
pub async fn seed_symbols(store: &dyn SymbolStore, cfg: &SymbolsConfig) -> Result<usize, StoreError> {
    let mut added = 0;
    for symbol in cfg.seed_list() {
        if store.add_symbol(&symbol, "config").await? {
            added += 1;
        }
    }

    if let Some(path) = cfg.seed_file.as_deref() {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                for symbol in parse_seed_lines(&content) {
                    if store.add_symbol(&symbol, "file").await? {
                        added += 1;
                    }
                }
            }
            Err(e) => warn!(path, error = %e, "symbol seed file unreadable"),
        }
    }

    info!(added, "symbol universe seeded");
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kizashi_core::common::install_crypto_provider;
    use kizashi_store::memory::MemorySignalStore;

    #[tokio::test]
    async fn test_seed_symbols_from_config_and_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("symbols.txt");
        std::fs::write(&path, "# majors\nUSDJPY=X\nAAPL  # duplicate of config\n\nQQQ\n")?;

        let store = MemorySignalStore::new();
        let cfg = SymbolsConfig {
            seed: "EURUSD=X, AAPL,".to_string(),
            seed_file: Some(path.to_string_lossy().into_owned()),
        };
        assert_eq!(seed_symbols(&store, &cfg).await?, 4);
        assert_eq!(
            store.list_symbols(false).await?,
            vec!["AAPL", "EURUSD=X", "QQQ", "USDJPY=X"]
        );
        assert_eq!(store.get_symbol("QQQ").await?.map(|e| e.source), Some("file".to_string()));

        // 第二次播种不新增
        assert_eq!(seed_symbols(&store, &cfg).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_seed_file_is_tolerated() -> anyhow::Result<()> {
        let store = MemorySignalStore::new();
        let cfg = SymbolsConfig {
            seed: "SPY".to_string(),
            seed_file: Some("/nonexistent/kizashi/symbols.txt".to_string()),
        };
        assert_eq!(seed_symbols(&store, &cfg).await?, 1);
        Ok(())
    }

    #[test]
    fn test_notifiers_require_credentials() {
        install_crypto_provider();
        assert!(build_notifiers(&NotifyConfig::default()).is_empty());

        let cfg = NotifyConfig {
            telegram_bot_token: Some("T0KEN".to_string()),
            telegram_chat_id: Some("42".to_string()),
            twilio_account_sid: Some("AC123".to_string()),
            twilio_auth_token: Some("  ".to_string()),
            ..NotifyConfig::default()
        };
        let notifiers = build_notifiers(&cfg);
        assert_eq!(notifiers.len(), 1);
    }
}
