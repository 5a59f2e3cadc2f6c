use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kizashi_core::signal::entity::{NotifyChannel, Signal, StoreStats, SymbolEntry};
use kizashi_core::store::error::StoreError;
use kizashi_core::store::port::{SignalStore, SymbolStore};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

type SignalKey = (String, DateTime<Utc>);

#[derive(Default)]
struct Inner {
    // 值中的 u64 为插入序号，用于 created_at 相同时的排序
    signals: HashMap<SignalKey, (u64, Signal)>,
    symbols: BTreeMap<String, SymbolEntry>,
    next_seq: u64,
}

/// # Summary
/// 进程内的 SignalStore / SymbolStore 实现，语义与 SQLite 版本一致，进程退出即丢失。
///
/// # Invariants
/// - 单把 `RwLock` 保护全部状态，`insert` 的 "检查并插入" 在写锁内完成，并发插入同一身份恰好一方成功。
#[derive(Default)]
pub struct MemorySignalStore {
    inner: RwLock<Inner>,
}

impl MemorySignalStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn update<F>(&self, symbol: &str, bos_time: DateTime<Utc>, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Signal),
    {
        let mut inner = self.inner.write().await;
        let (_, signal) = inner
            .signals
            .get_mut(&(symbol.to_string(), bos_time))
            .ok_or_else(|| StoreError::NotFound(format!("{}@{}", symbol, bos_time)))?;
        f(signal);
        Ok(())
    }
}

#[async_trait]
impl SignalStore for MemorySignalStore {
    async fn insert(&self, signal: &Signal) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let key = (signal.symbol.clone(), signal.bos_time);
        if inner.signals.contains_key(&key) {
            return Ok(false);
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.signals.insert(key, (seq, signal.clone()));
        Ok(true)
    }

    async fn get(
        &self,
        symbol: &str,
        bos_time: DateTime<Utc>,
    ) -> Result<Option<Signal>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .signals
            .get(&(symbol.to_string(), bos_time))
            .map(|(_, s)| s.clone()))
    }

    async fn mark_bos_sent(&self, symbol: &str, bos_time: DateTime<Utc>) -> Result<(), StoreError> {
        self.update(symbol, bos_time, |s| s.notified_bos = true).await
    }

    async fn mark_market_sent(
        &self,
        symbol: &str,
        bos_time: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.update(symbol, bos_time, |s| s.notified_market = true)
            .await
    }

    async fn mark_notified_channel(
        &self,
        symbol: &str,
        bos_time: DateTime<Utc>,
        channel: NotifyChannel,
    ) -> Result<(), StoreError> {
        self.update(symbol, bos_time, |s| match channel {
            NotifyChannel::Telegram => s.notified_telegram = true,
            NotifyChannel::WhatsApp => s.notified_whatsapp = true,
        })
        .await
    }

    async fn update_pulled_back(
        &self,
        symbol: &str,
        bos_time: DateTime<Utc>,
        pulled_back: bool,
    ) -> Result<(), StoreError> {
        if !pulled_back {
            return Ok(());
        }
        self.update(symbol, bos_time, |s| s.pulled_back = true).await
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Signal>, StoreError> {
        let inner = self.inner.read().await;
        let mut all: Vec<&(u64, Signal)> = inner.signals.values().collect();
        all.sort_by(|a, b| {
            b.1.created_at
                .cmp(&a.1.created_at)
                .then_with(|| b.0.cmp(&a.0))
        });
        Ok(all.into_iter().take(limit).map(|(_, s)| s.clone()).collect())
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let inner = self.inner.read().await;
        let signals = inner.signals.values().map(|(_, s)| s);
        let tally = |pred: fn(&Signal) -> bool| {
            u64::try_from(signals.clone().filter(|s| pred(s)).count()).unwrap_or_default()
        };
        Ok(StoreStats {
            total_signals: u64::try_from(inner.signals.len()).unwrap_or_default(),
            market_sent: tally(|s| s.notified_market),
            pulled_back: tally(|s| s.pulled_back),
            enabled_symbols: u64::try_from(inner.symbols.values().filter(|e| e.enabled).count())
                .unwrap_or_default(),
        })
    }
}

#[async_trait]
impl SymbolStore for MemorySignalStore {
    async fn list_symbols(&self, enabled_only: bool) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .symbols
            .values()
            .filter(|e| !enabled_only || e.enabled)
            .map(|e| e.symbol.clone())
            .collect())
    }

    async fn get_symbol(&self, symbol: &str) -> Result<Option<SymbolEntry>, StoreError> {
        Ok(self.inner.read().await.symbols.get(symbol).cloned())
    }

    async fn add_symbol(&self, symbol: &str, source: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.symbols.contains_key(symbol) {
            return Ok(false);
        }
        inner.symbols.insert(
            symbol.to_string(),
            SymbolEntry {
                symbol: symbol.to_string(),
                source: source.to_string(),
                enabled: true,
                created_at: Utc::now(),
            },
        );
        Ok(true)
    }

    async fn set_enabled(&self, symbol: &str, enabled: bool) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let entry = inner
            .symbols
            .get_mut(symbol)
            .ok_or_else(|| StoreError::NotFound(symbol.to_string()))?;
        entry.enabled = enabled;
        Ok(())
    }
}
