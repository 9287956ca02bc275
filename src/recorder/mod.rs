//! Recorder - snapshot aggregation and fan-out
//!
//! ```text
//! Snapshot (accounts, positions, prices, volumes)
//!     ↓
//! PairMetrics per symbol pair  →  Point (type=symbol)
//!     ↓
//! PortfolioTotals + accounts   →  Point (type=summary)
//!     ↓
//! push to every BatchWriter
//! ```

pub mod aggregator;
pub mod fanout;
pub mod order;
pub mod snapshot;

pub use aggregator::{summary_fields, PairMetrics, PortfolioTotals, RecorderError, SideTotals};
pub use fanout::Recorder;
pub use order::Order;
pub use snapshot::{Account, AccountSnapshot, Position, PositionSnapshot, Snapshot, SnapshotRecord};
