//! Snapshot inputs consumed by the recorder
//!
//! Accounts and positions come from the trading engine; the recorder only
//! needs the small capability sets below.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

pub trait Account {
    fn equity(&self) -> f64;
    fn available_balance(&self) -> f64;
    /// Initial margin ratio
    fn imr(&self) -> f64;
    /// Maintenance margin ratio
    fn mmr(&self) -> f64;
}

pub trait Position {
    /// Signed size in base units
    fn size_in_coin(&self) -> f64;
    /// Average entry price, zero when unknown
    fn entry_price(&self) -> f64;
}

impl<T: Account + ?Sized> Account for &T {
    fn equity(&self) -> f64 {
        (**self).equity()
    }
    fn available_balance(&self) -> f64 {
        (**self).available_balance()
    }
    fn imr(&self) -> f64 {
        (**self).imr()
    }
    fn mmr(&self) -> f64 {
        (**self).mmr()
    }
}

impl<T: Account + ?Sized> Account for Arc<T> {
    fn equity(&self) -> f64 {
        (**self).equity()
    }
    fn available_balance(&self) -> f64 {
        (**self).available_balance()
    }
    fn imr(&self) -> f64 {
        (**self).imr()
    }
    fn mmr(&self) -> f64 {
        (**self).mmr()
    }
}

impl<T: Position + ?Sized> Position for &T {
    fn size_in_coin(&self) -> f64 {
        (**self).size_in_coin()
    }
    fn entry_price(&self) -> f64 {
        (**self).entry_price()
    }
}

impl<T: Position + ?Sized> Position for Arc<T> {
    fn size_in_coin(&self) -> f64 {
        (**self).size_in_coin()
    }
    fn entry_price(&self) -> f64 {
        (**self).entry_price()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSnapshot {
    pub equity: f64,
    pub available_balance: f64,
    #[serde(default)]
    pub imr: f64,
    #[serde(default)]
    pub mmr: f64,
}

impl Account for AccountSnapshot {
    fn equity(&self) -> f64 {
        self.equity
    }
    fn available_balance(&self) -> f64 {
        self.available_balance
    }
    fn imr(&self) -> f64 {
        self.imr
    }
    fn mmr(&self) -> f64 {
        self.mmr
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSnapshot {
    pub size_in_coin: f64,
    #[serde(default)]
    pub entry_price: f64,
}

impl Position for PositionSnapshot {
    fn size_in_coin(&self) -> f64 {
        self.size_in_coin
    }
    fn entry_price(&self) -> f64 {
        self.entry_price
    }
}

/// Borrowed inputs for one `Recorder::save` call.
///
/// Positions and mid-prices are keyed by each side's own symbol. Volumes
/// and max open values are keyed by the primary symbol.
pub struct Snapshot<'a, A: Account + ?Sized, P: Position> {
    pub timestamp: DateTime<Utc>,
    pub primary_account: Option<&'a A>,
    pub secondary_account: Option<&'a A>,
    pub primary_positions: &'a HashMap<String, P>,
    pub secondary_positions: &'a HashMap<String, P>,
    pub primary_mid_prices: &'a HashMap<String, f64>,
    pub secondary_mid_prices: &'a HashMap<String, f64>,
    pub primary_volumes_24h: &'a HashMap<String, f64>,
    pub secondary_volumes_24h: &'a HashMap<String, f64>,
    pub primary_volumes_30d: &'a HashMap<String, f64>,
    pub secondary_volumes_30d: &'a HashMap<String, f64>,
    pub primary_max_leverage: f64,
    pub secondary_max_leverage: f64,
    pub max_open_values: &'a HashMap<String, f64>,
}

/// Owned snapshot, one JSON object per line in replay files
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotRecord {
    pub timestamp: DateTime<Utc>,
    pub primary_account: Option<AccountSnapshot>,
    pub secondary_account: Option<AccountSnapshot>,
    pub primary_positions: HashMap<String, PositionSnapshot>,
    pub secondary_positions: HashMap<String, PositionSnapshot>,
    pub primary_mid_prices: HashMap<String, f64>,
    pub secondary_mid_prices: HashMap<String, f64>,
    pub primary_volumes_24h: HashMap<String, f64>,
    pub secondary_volumes_24h: HashMap<String, f64>,
    pub primary_volumes_30d: HashMap<String, f64>,
    pub secondary_volumes_30d: HashMap<String, f64>,
    pub primary_max_leverage: f64,
    pub secondary_max_leverage: f64,
    pub max_open_values: HashMap<String, f64>,
}

impl SnapshotRecord {
    pub fn as_snapshot(&self) -> Snapshot<'_, AccountSnapshot, PositionSnapshot> {
        Snapshot {
            timestamp: self.timestamp,
            primary_account: self.primary_account.as_ref(),
            secondary_account: self.secondary_account.as_ref(),
            primary_positions: &self.primary_positions,
            secondary_positions: &self.secondary_positions,
            primary_mid_prices: &self.primary_mid_prices,
            secondary_mid_prices: &self.secondary_mid_prices,
            primary_volumes_24h: &self.primary_volumes_24h,
            secondary_volumes_24h: &self.secondary_volumes_24h,
            primary_volumes_30d: &self.primary_volumes_30d,
            secondary_volumes_30d: &self.secondary_volumes_30d,
            primary_max_leverage: self.primary_max_leverage,
            secondary_max_leverage: self.secondary_max_leverage,
            max_open_values: &self.max_open_values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_record_from_json() {
        let line = r#"{
            "timestamp": "2024-03-01T12:00:00Z",
            "primaryAccount": {"equity": 1000.0, "availableBalance": 800.0, "imr": 0.1, "mmr": 0.05},
            "primaryPositions": {"BTCUSDT": {"sizeInCoin": 0.5}},
            "primaryMidPrices": {"BTCUSDT": 60000.0},
            "primaryMaxLeverage": 3.0
        }"#;

        let record: SnapshotRecord = serde_json::from_str(line).unwrap();
        let snapshot = record.as_snapshot();

        assert_eq!(snapshot.primary_account.unwrap().available_balance(), 800.0);
        assert!(snapshot.secondary_account.is_none());
        assert_eq!(snapshot.primary_positions["BTCUSDT"].entry_price(), 0.0);
        assert_eq!(snapshot.primary_max_leverage, 3.0);
        assert!(snapshot.max_open_values.is_empty());
    }
}
