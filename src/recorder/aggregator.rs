//! Per-pair and portfolio metric computation
//!
//! Every symbol pair is resolved against the snapshot maps; a missing entry
//! or zero mid-price is an error naming the field and symbol. Ratio fields
//! in the summary are omitted whenever their denominator is not positive.

use super::snapshot::{Account, Position, Snapshot};
use crate::config::ConfigError;
use crate::point::{FieldValue, Fields};
use crate::sink::SinkError;
use std::collections::HashMap;

#[derive(Debug)]
pub enum RecorderError {
    MissingPrimaryAccount,
    MissingField { field: &'static str, symbol: String },
    Config(ConfigError),
    Sink(SinkError),
}

impl From<ConfigError> for RecorderError {
    fn from(err: ConfigError) -> Self {
        RecorderError::Config(err)
    }
}

impl From<SinkError> for RecorderError {
    fn from(err: SinkError) -> Self {
        RecorderError::Sink(err)
    }
}

impl std::fmt::Display for RecorderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecorderError::MissingPrimaryAccount => write!(f, "missing primary account"),
            RecorderError::MissingField { field, symbol } => {
                write!(f, "{} for {} is missing", field, symbol)
            }
            RecorderError::Config(e) => write!(f, "Config error: {}", e),
            RecorderError::Sink(e) => write!(f, "Sink error: {}", e),
        }
    }
}

impl std::error::Error for RecorderError {}

fn require<'m, V>(
    map: &'m HashMap<String, V>,
    key: &str,
    field: &'static str,
    symbol: &str,
) -> Result<&'m V, RecorderError> {
    map.get(key).ok_or_else(|| RecorderError::MissingField {
        field,
        symbol: symbol.to_string(),
    })
}

fn require_price(
    map: &HashMap<String, f64>,
    key: &str,
    field: &'static str,
) -> Result<f64, RecorderError> {
    match map.get(key) {
        Some(price) if *price != 0.0 => Ok(*price),
        _ => Err(RecorderError::MissingField {
            field,
            symbol: key.to_string(),
        }),
    }
}

/// Metrics for one primary/secondary symbol pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairMetrics {
    pub primary_size: f64,
    pub secondary_size: f64,
    /// Entry price, or mid-price when the position has no entry price
    pub primary_price: f64,
    pub secondary_price: f64,
    pub primary_mid_price: f64,
    pub secondary_mid_price: f64,
    pub primary_value: f64,
    pub secondary_value: f64,
    pub unhedged_value: f64,
    pub primary_volume_24h: f64,
    pub secondary_volume_24h: f64,
    pub primary_volume_30d: f64,
    pub secondary_volume_30d: f64,
    pub max_open_value: f64,
}

impl PairMetrics {
    /// Resolve one pair from the snapshot maps
    pub fn resolve<A, P>(
        snapshot: &Snapshot<'_, A, P>,
        primary_symbol: &str,
        secondary_symbol: &str,
    ) -> Result<Self, RecorderError>
    where
        A: Account + ?Sized,
        P: Position,
    {
        let primary_position = require(
            snapshot.primary_positions,
            primary_symbol,
            "xPosition",
            primary_symbol,
        )?;
        let secondary_position = require(
            snapshot.secondary_positions,
            secondary_symbol,
            "yPosition",
            secondary_symbol,
        )?;
        let primary_mid_price = require_price(snapshot.primary_mid_prices, primary_symbol, "xMidPrice")?;
        let secondary_mid_price =
            require_price(snapshot.secondary_mid_prices, secondary_symbol, "yMidPrice")?;
        let primary_volume_24h = *require(
            snapshot.primary_volumes_24h,
            primary_symbol,
            "xVolume24H",
            primary_symbol,
        )?;
        let secondary_volume_24h = *require(
            snapshot.secondary_volumes_24h,
            primary_symbol,
            "yVolume24H",
            secondary_symbol,
        )?;
        let primary_volume_30d = *require(
            snapshot.primary_volumes_30d,
            primary_symbol,
            "xVolume30D",
            primary_symbol,
        )?;
        let secondary_volume_30d = *require(
            snapshot.secondary_volumes_30d,
            primary_symbol,
            "yVolume30D",
            secondary_symbol,
        )?;
        let max_open_value = *require(
            snapshot.max_open_values,
            primary_symbol,
            "maxOpenValue",
            primary_symbol,
        )?;

        let primary_size = primary_position.size_in_coin();
        let secondary_size = secondary_position.size_in_coin();
        let primary_price = match primary_position.entry_price() {
            p if p == 0.0 => primary_mid_price,
            p => p,
        };
        let secondary_price = match secondary_position.entry_price() {
            p if p == 0.0 => secondary_mid_price,
            p => p,
        };

        Ok(Self {
            primary_size,
            secondary_size,
            primary_price,
            secondary_price,
            primary_mid_price,
            secondary_mid_price,
            primary_value: primary_size * primary_price,
            secondary_value: secondary_size * secondary_price,
            unhedged_value: (primary_size + secondary_size)
                * (primary_mid_price + secondary_mid_price)
                / 2.0,
            primary_volume_24h,
            secondary_volume_24h,
            primary_volume_30d,
            secondary_volume_30d,
            max_open_value,
        })
    }

    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        put(&mut fields, "xSize", self.primary_size);
        put(&mut fields, "ySize", self.secondary_size);
        put(&mut fields, "xValue", self.primary_value);
        put(&mut fields, "yValue", self.secondary_value);
        put(&mut fields, "maxOpenValue", self.max_open_value);
        put(&mut fields, "xPrice", self.primary_price);
        put(&mut fields, "yPrice", self.secondary_price);
        put(&mut fields, "xMidPrice", self.primary_mid_price);
        put(&mut fields, "yMidPrice", self.secondary_mid_price);
        put(&mut fields, "unhedgedValue", self.unhedged_value);
        put(&mut fields, "xVolume24H", self.primary_volume_24h);
        put(&mut fields, "yVolume24H", self.secondary_volume_24h);
        put(&mut fields, "xVolume30D", self.primary_volume_30d);
        put(&mut fields, "yVolume30D", self.secondary_volume_30d);
        fields
    }
}

fn put(fields: &mut Fields, key: &str, value: f64) {
    fields.insert(key.to_string(), FieldValue::Float(value));
}

/// Running totals for one side of the book
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SideTotals {
    pub open_value: f64,
    pub long_value: f64,
    pub short_value: f64,
    pub volume_24h: f64,
    pub volume_30d: f64,
}

impl SideTotals {
    fn add(&mut self, value: f64, volume_24h: f64, volume_30d: f64) {
        self.open_value += value.abs();
        if value >= 0.0 {
            self.long_value += value;
        } else {
            self.short_value -= value;
        }
        self.volume_24h += volume_24h;
        self.volume_30d += volume_30d;
    }

    fn put_ratios(&self, fields: &mut Fields, prefix: &str, balance: f64) {
        if balance > 0.0 {
            put(fields, &format!("{}Leverage", prefix), self.open_value / balance);
            put(fields, &format!("{}Turnover", prefix), self.volume_24h / balance);
        }
        if self.open_value > 0.0 {
            put(fields, &format!("{}TotalLongValue", prefix), self.long_value);
            put(fields, &format!("{}TotalShortValue", prefix), self.short_value);
            put(
                fields,
                &format!("{}Imbalance", prefix),
                (self.long_value - self.short_value) / self.open_value,
            );
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PortfolioTotals {
    pub primary: SideTotals,
    pub secondary: SideTotals,
    /// Sum of absolute unhedged value across pairs
    pub unhedged_value: f64,
}

impl PortfolioTotals {
    pub fn accumulate(&mut self, pair: &PairMetrics) {
        self.primary.add(
            pair.primary_value,
            pair.primary_volume_24h,
            pair.primary_volume_30d,
        );
        self.secondary.add(
            pair.secondary_value,
            pair.secondary_volume_24h,
            pair.secondary_volume_30d,
        );
        self.unhedged_value += pair.unhedged_value.abs();
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct AccountMetrics {
    balance: f64,
    available: f64,
    imr: f64,
    mmr: f64,
}

impl AccountMetrics {
    fn read<A: Account + ?Sized>(account: &A) -> Self {
        Self {
            balance: account.equity(),
            available: account.available_balance(),
            imr: account.imr(),
            mmr: account.mmr(),
        }
    }
}

/// Portfolio level fields for the summary point.
///
/// Without a secondary account the secondary side mirrors the primary
/// account and the total balance is the primary balance alone.
pub fn summary_fields<A: Account + ?Sized>(
    primary_account: &A,
    secondary_account: Option<&A>,
    totals: &PortfolioTotals,
    primary_max_leverage: f64,
    secondary_max_leverage: f64,
    start_value: f64,
) -> Fields {
    let primary = AccountMetrics::read(primary_account);
    let (secondary, total_balance) = match secondary_account {
        Some(account) => {
            let secondary = AccountMetrics::read(account);
            (secondary, primary.balance + secondary.balance)
        }
        None => (primary, primary.balance),
    };

    let mut fields = Fields::new();
    put(&mut fields, "xIMR", primary.imr);
    put(&mut fields, "yIMR", secondary.imr);
    put(&mut fields, "xMMR", primary.mmr);
    put(&mut fields, "yMMR", secondary.mmr);
    put(&mut fields, "totalUnhedgedValue", totals.unhedged_value);
    put(&mut fields, "totalBalance", total_balance);
    put(&mut fields, "xBalance", primary.balance);
    put(&mut fields, "yBalance", secondary.balance);
    put(&mut fields, "xAvailable", primary.available);
    put(&mut fields, "yAvailable", secondary.available);
    put(&mut fields, "xTotal30DVolume", totals.primary.volume_30d);
    put(&mut fields, "yTotal30DVolume", totals.secondary.volume_30d);
    put(&mut fields, "xTotal24HVolume", totals.primary.volume_24h);
    put(&mut fields, "yTotal24HVolume", totals.secondary.volume_24h);
    put(&mut fields, "xMaxLeverage", primary_max_leverage);
    put(&mut fields, "yMaxLeverage", secondary_max_leverage);
    put(&mut fields, "xTotalOpenValue", totals.primary.open_value);
    put(&mut fields, "yTotalOpenValue", totals.secondary.open_value);

    totals.primary.put_ratios(&mut fields, "x", primary.balance);
    totals.secondary.put_ratios(&mut fields, "y", secondary.balance);

    if total_balance > 0.0 {
        put(
            &mut fields,
            "xyLeverage",
            (totals.primary.open_value + totals.secondary.open_value) / total_balance,
        );
        put(
            &mut fields,
            "xyTurnover",
            (totals.primary.volume_24h + totals.secondary.volume_24h) / total_balance,
        );
    }

    put(&mut fields, "startValue", start_value);
    if start_value > 0.0 {
        put(&mut fields, "netWorth", total_balance / start_value);
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::snapshot::AccountSnapshot;

    fn pair(primary_value: f64, secondary_value: f64) -> PairMetrics {
        PairMetrics {
            primary_size: 1.0,
            secondary_size: -1.0,
            primary_price: 1.0,
            secondary_price: 1.0,
            primary_mid_price: 1.0,
            secondary_mid_price: 1.0,
            primary_value,
            secondary_value,
            unhedged_value: -3.0,
            primary_volume_24h: 10.0,
            secondary_volume_24h: 20.0,
            primary_volume_30d: 100.0,
            secondary_volume_30d: 200.0,
            max_open_value: 0.0,
        }
    }

    fn account(equity: f64) -> AccountSnapshot {
        AccountSnapshot {
            equity,
            available_balance: equity / 2.0,
            imr: 0.1,
            mmr: 0.05,
        }
    }

    fn float(fields: &Fields, key: &str) -> f64 {
        fields.get(key).and_then(FieldValue::as_f64).unwrap()
    }

    #[test]
    fn test_totals_split_long_and_short() {
        let mut totals = PortfolioTotals::default();
        totals.accumulate(&pair(300.0, -300.0));
        totals.accumulate(&pair(-100.0, 100.0));

        assert_eq!(totals.primary.open_value, 400.0);
        assert_eq!(totals.primary.long_value, 300.0);
        assert_eq!(totals.primary.short_value, 100.0);
        assert_eq!(totals.secondary.long_value, 100.0);
        assert_eq!(totals.secondary.short_value, 300.0);
        assert_eq!(totals.unhedged_value, 6.0);
        assert_eq!(totals.primary.volume_24h, 20.0);
        assert_eq!(totals.secondary.volume_30d, 400.0);
    }

    #[test]
    fn test_summary_ratios_with_two_accounts() {
        let mut totals = PortfolioTotals::default();
        totals.accumulate(&pair(300.0, -300.0));
        totals.accumulate(&pair(-100.0, 100.0));

        let primary = account(1000.0);
        let secondary = account(500.0);
        let fields = summary_fields(&primary, Some(&secondary), &totals, 5.0, 3.0, 3000.0);

        assert_eq!(float(&fields, "totalBalance"), 1500.0);
        assert_eq!(float(&fields, "xLeverage"), 0.4);
        assert_eq!(float(&fields, "yLeverage"), 0.8);
        assert_eq!(float(&fields, "xTurnover"), 0.02);
        assert_eq!(float(&fields, "xImbalance"), 0.5);
        assert_eq!(float(&fields, "yImbalance"), -0.5);
        assert_eq!(float(&fields, "xyTurnover"), 60.0 / 1500.0);
        assert_eq!(float(&fields, "netWorth"), 0.5);
        assert_eq!(float(&fields, "yAvailable"), 250.0);
        assert_eq!(float(&fields, "xMaxLeverage"), 5.0);
    }

    #[test]
    fn test_single_leg_mirrors_primary() {
        let totals = PortfolioTotals::default();
        let primary = account(1000.0);
        let fields = summary_fields(&primary, None, &totals, 1.0, 1.0, 0.0);

        assert_eq!(float(&fields, "yBalance"), 1000.0);
        assert_eq!(float(&fields, "yIMR"), 0.1);
        assert_eq!(float(&fields, "totalBalance"), 1000.0);
        assert!(!fields.contains_key("netWorth"));
        assert!(!fields.contains_key("xImbalance"));
        assert!(!fields.contains_key("xTotalLongValue"));
        assert_eq!(float(&fields, "xLeverage"), 0.0);
    }

    #[test]
    fn test_ratios_omitted_for_non_positive_balance() {
        let mut totals = PortfolioTotals::default();
        totals.accumulate(&pair(300.0, -300.0));

        let primary = account(0.0);
        let secondary = account(-10.0);
        let fields = summary_fields(&primary, Some(&secondary), &totals, 1.0, 1.0, 100.0);

        for key in ["xLeverage", "xTurnover", "yLeverage", "yTurnover", "xyLeverage", "xyTurnover"] {
            assert!(!fields.contains_key(key), "{} should be omitted", key);
        }
        // Imbalance depends on open value only
        assert_eq!(float(&fields, "xImbalance"), 1.0);
        assert_eq!(float(&fields, "netWorth"), -0.1);
    }
}
