//! In-memory snapshot of everything the terminal has reported.
//!
//! The store keeps two append-only sequences in arrival order: OHLC snapshots and
//! trade records. Connection workers are the only writers and HTTP handlers the only
//! readers; both share one `Arc<SnapshotStore>`.
//!
//! Design notes:
//! - Each sequence sits behind its own `RwLock`, so readers of one never wait on
//!   writers of the other and many readers proceed in parallel.
//! - A record is fully built before it is pushed under the write guard; readers only
//!   ever clone whole records.
//! - Records are immutable once appended, so a poisoned lock still guards consistent
//!   data and is recovered instead of propagated.
//! - Growth is unbounded unless a [`RetentionPolicy`] caps it, in which case the
//!   oldest entries are evicted first.

use bridge_common::{OhlcRecord, TradeRecord};
use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Upper bounds on how many records of each kind are kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Maximum OHLC snapshots kept; `None` keeps everything.
    pub max_ohlc: Option<usize>,
    /// Maximum trade records kept; `None` keeps everything.
    pub max_trades: Option<usize>,
}

impl RetentionPolicy {
    /// Keep every record for the life of the process.
    pub fn unbounded() -> Self {
        Self::default()
    }
}

/// Concurrency-safe holder of the latest OHLC record and the full trade history.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    ohlc: RwLock<VecDeque<OhlcRecord>>,
    trades: RwLock<VecDeque<TradeRecord>>,
    retention: RetentionPolicy,
}

impl SnapshotStore {
    /// Create an empty store that never evicts.
    pub fn new() -> Self {
        Self::with_retention(RetentionPolicy::unbounded())
    }

    /// Create an empty store with the given retention caps.
    pub fn with_retention(retention: RetentionPolicy) -> Self {
        Self {
            ohlc: RwLock::new(VecDeque::new()),
            trades: RwLock::new(VecDeque::new()),
            retention,
        }
    }

    /// Append one OHLC snapshot.
    pub fn append_ohlc(&self, record: OhlcRecord) {
        let mut ohlc = write(&self.ohlc);
        ohlc.push_back(record);
        evict(&mut ohlc, self.retention.max_ohlc);
    }

    /// Append a batch of trades, keeping their relative order.
    pub fn append_trades<I>(&self, records: I)
    where
        I: IntoIterator<Item = TradeRecord>,
    {
        let mut trades = write(&self.trades);
        trades.extend(records);
        evict(&mut trades, self.retention.max_trades);
    }

    /// Most recently appended OHLC snapshot, if any has arrived.
    pub fn latest_ohlc(&self) -> Option<OhlcRecord> {
        read(&self.ohlc).back().cloned()
    }

    /// Point-in-time copy of every stored trade, oldest first.
    pub fn all_trades(&self) -> Vec<TradeRecord> {
        read(&self.trades).iter().cloned().collect()
    }

    /// Number of OHLC snapshots currently held.
    pub fn len_ohlc(&self) -> usize {
        read(&self.ohlc).len()
    }

    /// Number of trade records currently held.
    pub fn len_trades(&self) -> usize {
        read(&self.trades).len()
    }

    /// Retention caps this store was built with.
    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn evict<T>(records: &mut VecDeque<T>, cap: Option<usize>) {
    if let Some(cap) = cap {
        let excess = records.len().saturating_sub(cap);
        records.drain(..excess);
    }
}
