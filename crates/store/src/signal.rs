use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kizashi_core::signal::entity::{NotifyChannel, Signal, StoreStats, SymbolEntry};
use kizashi_core::store::error::StoreError;
use kizashi_core::store::port::{SignalStore, SymbolStore};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// 默认信号数据库文件名
const DEFAULT_SIGNAL_DB: &str = "signals.db";

const SIGNAL_COLUMNS: &str = "symbol, bos_ts, direction, entry, zone_low, zone_high, stop, \
     tp1, tp2, tp3, atr, rr_tp2, pulled_back, notified_bos, notified_market, \
     notified_telegram, notified_whatsapp, created_at";

/// SignalStore / SymbolStore 的 SQLite 实现。
///
/// # Summary
/// 在单个 SQLite 文件 (`signals.db`) 中保存信号审计记录与扫描标的池。
///
/// # Invariants
/// * `signals` 表上有 `UNIQUE(symbol, bos_ts)`，去重由数据库保证。
/// * 所有标记位的更新只会写入 1，SQL 层面即保证单向。
/// * 开启 WAL 与 busy timeout，允许周期扫描与 webhook 触发并发写入。
pub struct SqliteSignalStore {
    pool: SqlitePool,
}

#[derive(FromRow)]
struct SignalRow {
    symbol: String,
    bos_ts: DateTime<Utc>,
    direction: String,
    entry: f64,
    zone_low: f64,
    zone_high: f64,
    stop: f64,
    tp1: f64,
    tp2: f64,
    tp3: f64,
    atr: f64,
    rr_tp2: f64,
    pulled_back: bool,
    notified_bos: bool,
    notified_market: bool,
    notified_telegram: bool,
    notified_whatsapp: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<SignalRow> for Signal {
    type Error = StoreError;

    fn try_from(row: SignalRow) -> Result<Self, Self::Error> {
        let direction = row.direction.parse().map_err(StoreError::Corrupted)?;
        Ok(Signal {
            symbol: row.symbol,
            bos_time: row.bos_ts,
            direction,
            entry: row.entry,
            zone_low: row.zone_low,
            zone_high: row.zone_high,
            stop: row.stop,
            tp1: row.tp1,
            tp2: row.tp2,
            tp3: row.tp3,
            atr: row.atr,
            rr_tp2: row.rr_tp2,
            pulled_back: row.pulled_back,
            notified_bos: row.notified_bos,
            notified_market: row.notified_market,
            notified_telegram: row.notified_telegram,
            notified_whatsapp: row.notified_whatsapp,
            created_at: row.created_at,
        })
    }
}

fn db_err(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

impl SqliteSignalStore {
    /// 在配置的数据根目录下打开 `signals.db`。
    ///
    /// # Returns
    /// * `Result<Self, StoreError>` - 存储实例或初始化错误。
    pub async fn new() -> Result<Self, StoreError> {
        let root = crate::config::get_root_dir();
        Self::open(&root.join(DEFAULT_SIGNAL_DB)).await
    }

    /// # Summary
    /// 打开指定路径的数据库并初始化表结构。
    ///
    /// # Logic
    /// 1. 确保父目录存在。
    /// 2. 配置 `create_if_missing`、WAL 与 5 秒 busy timeout。
    /// 3. 执行 DDL 创建 `signals` 与 `symbols` 表。
    ///
    /// # Arguments
    /// * `db_path` - 数据库文件路径。
    pub async fn open(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::InitError(e.to_string()))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(|e| StoreError::InitError(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS signals (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL,
                bos_ts TEXT NOT NULL,
                direction TEXT NOT NULL,
                entry REAL NOT NULL,
                zone_low REAL NOT NULL,
                zone_high REAL NOT NULL,
                stop REAL NOT NULL,
                tp1 REAL NOT NULL,
                tp2 REAL NOT NULL,
                tp3 REAL NOT NULL,
                atr REAL NOT NULL,
                rr_tp2 REAL NOT NULL,
                pulled_back INTEGER NOT NULL DEFAULT 0,
                notified_bos INTEGER NOT NULL DEFAULT 0,
                notified_market INTEGER NOT NULL DEFAULT 0,
                notified_telegram INTEGER NOT NULL DEFAULT 0,
                notified_whatsapp INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                UNIQUE(symbol, bos_ts)
            );

            CREATE INDEX IF NOT EXISTS idx_signals_created ON signals (created_at);

            CREATE TABLE IF NOT EXISTS symbols (
                symbol TEXT PRIMARY KEY,
                source TEXT NOT NULL,
                enabled INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| StoreError::InitError(e.to_string()))?;

        Ok(Self { pool })
    }

    /// 将某个标记列置为 1；记录不存在时返回 NotFound
    async fn set_flag(
        &self,
        column: &'static str,
        symbol: &str,
        bos_time: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let sql = format!(
            "UPDATE signals SET {} = 1 WHERE symbol = ? AND bos_ts = ?",
            column
        );
        let result = sqlx::query(&sql)
            .bind(symbol)
            .bind(bos_time)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("{}@{}", symbol, bos_time)));
        }
        Ok(())
    }
}

fn count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

#[async_trait]
impl SignalStore for SqliteSignalStore {
    /// # Summary
    /// 插入新信号。
    ///
    /// # Logic
    /// 1. 执行普通 INSERT，所有标记位取自传入的实体。
    /// 2. 唯一约束冲突转换为 `Ok(false)`，其余数据库错误照常返回。
    async fn insert(&self, signal: &Signal) -> Result<bool, StoreError> {
        let sql = format!(
            "INSERT INTO signals ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            SIGNAL_COLUMNS
        );
        let result = sqlx::query(&sql)
            .bind(&signal.symbol)
            .bind(signal.bos_time)
            .bind(signal.direction.as_str())
            .bind(signal.entry)
            .bind(signal.zone_low)
            .bind(signal.zone_high)
            .bind(signal.stop)
            .bind(signal.tp1)
            .bind(signal.tp2)
            .bind(signal.tp3)
            .bind(signal.atr)
            .bind(signal.rr_tp2)
            .bind(signal.pulled_back)
            .bind(signal.notified_bos)
            .bind(signal.notified_market)
            .bind(signal.notified_telegram)
            .bind(signal.notified_whatsapp)
            .bind(signal.created_at)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e)
                if e
                    .as_database_error()
                    .is_some_and(|db| db.is_unique_violation()) =>
            {
                debug!(symbol = %signal.symbol, bos_ts = %signal.bos_time, "signal already stored");
                Ok(false)
            }
            Err(e) => Err(db_err(e)),
        }
    }

    async fn get(
        &self,
        symbol: &str,
        bos_time: DateTime<Utc>,
    ) -> Result<Option<Signal>, StoreError> {
        let sql = format!(
            "SELECT {} FROM signals WHERE symbol = ? AND bos_ts = ?",
            SIGNAL_COLUMNS
        );
        sqlx::query_as::<_, SignalRow>(&sql)
            .bind(symbol)
            .bind(bos_time)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .map(Signal::try_from)
            .transpose()
    }

    async fn mark_bos_sent(&self, symbol: &str, bos_time: DateTime<Utc>) -> Result<(), StoreError> {
        self.set_flag("notified_bos", symbol, bos_time).await
    }

    async fn mark_market_sent(
        &self,
        symbol: &str,
        bos_time: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.set_flag("notified_market", symbol, bos_time).await
    }

    async fn mark_notified_channel(
        &self,
        symbol: &str,
        bos_time: DateTime<Utc>,
        channel: NotifyChannel,
    ) -> Result<(), StoreError> {
        let column = match channel {
            NotifyChannel::Telegram => "notified_telegram",
            NotifyChannel::WhatsApp => "notified_whatsapp",
        };
        self.set_flag(column, symbol, bos_time).await
    }

    /// # Summary
    /// 更新回踩标记。
    ///
    /// # Logic
    /// 只有 `true` 会写库；`false` 不会把已置位的记录改回去。
    async fn update_pulled_back(
        &self,
        symbol: &str,
        bos_time: DateTime<Utc>,
        pulled_back: bool,
    ) -> Result<(), StoreError> {
        if !pulled_back {
            return Ok(());
        }
        self.set_flag("pulled_back", symbol, bos_time).await
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Signal>, StoreError> {
        let sql = format!(
            "SELECT {} FROM signals ORDER BY created_at DESC, id DESC LIMIT ?",
            SIGNAL_COLUMNS
        );
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        sqlx::query_as::<_, SignalRow>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(Signal::try_from)
            .collect()
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let (total, market_sent, pulled_back) = sqlx::query_as::<_, (i64, i64, i64)>(
            "SELECT COUNT(*), COALESCE(SUM(notified_market), 0), COALESCE(SUM(pulled_back), 0) FROM signals",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        let enabled: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM symbols WHERE enabled = 1")
                .fetch_one(&self.pool)
                .await
                .map_err(db_err)?;

        Ok(StoreStats {
            total_signals: count(total),
            market_sent: count(market_sent),
            pulled_back: count(pulled_back),
            enabled_symbols: count(enabled),
        })
    }
}

#[async_trait]
impl SymbolStore for SqliteSignalStore {
    async fn list_symbols(&self, enabled_only: bool) -> Result<Vec<String>, StoreError> {
        let sql = if enabled_only {
            "SELECT symbol FROM symbols WHERE enabled = 1 ORDER BY symbol"
        } else {
            "SELECT symbol FROM symbols ORDER BY symbol"
        };
        sqlx::query_scalar::<_, String>(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn get_symbol(&self, symbol: &str) -> Result<Option<SymbolEntry>, StoreError> {
        let row = sqlx::query_as::<_, (String, String, bool, DateTime<Utc>)>(
            "SELECT symbol, source, enabled, created_at FROM symbols WHERE symbol = ?",
        )
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.map(|r| SymbolEntry {
            symbol: r.0,
            source: r.1,
            enabled: r.2,
            created_at: r.3,
        }))
    }

    /// # Summary
    /// 添加标的。
    ///
    /// # Logic
    /// `INSERT OR IGNORE`，以受影响行数判断是否新增。
    async fn add_symbol(&self, symbol: &str, source: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO symbols (symbol, source, enabled, created_at) VALUES (?, ?, 1, ?)",
        )
        .bind(symbol)
        .bind(source)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn set_enabled(&self, symbol: &str, enabled: bool) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE symbols SET enabled = ? WHERE symbol = ?")
            .bind(enabled)
            .bind(symbol)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(symbol.to_string()));
        }
        Ok(())
    }
}
