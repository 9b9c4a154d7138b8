//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The engine never executes SQL; the service loads touchpoints here,
//! hands them to the engine, and writes the breakdown back through
//! `save_attribution_results`.

use crate::{
    error::AttributionResult,
    touchpoint::parse_timestamp,
};
use chrono::{DateTime, Utc};
use rusqlite::{types::Type, Connection, Row};

mod analytics;
mod attribution;
mod deal;
mod partner;
mod touchpoint;

pub use analytics::{
    AnalyticsOverview, DateRange, ModelUsage, MonthlyPayout, OverviewTotals, PartnerAnalytics,
    PartnerDealAttribution, PartnerPerformance, PartnerStats, RecentDeal, RoleCount,
};
pub use attribution::CachedAttribution;
pub use deal::{Deal, NewDeal};
pub use partner::{NewPartner, Partner};
pub use touchpoint::{NewTouchpoint, TouchpointFilter, TouchpointRecord};

pub struct AttributionStore {
    conn: Connection,
}

impl AttributionStore {
    pub fn open(path: &str) -> AttributionResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> AttributionResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> AttributionResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_attribution_cache.sql"))?;
        Ok(())
    }
}

// ── Row helpers ────────────────────────────────────────────────────

/// Read an RFC 3339 text column as a UTC timestamp.
fn ts_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
    })
}

/// Read a JSON text column.
fn json_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<serde_json::Value> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
    })
}
