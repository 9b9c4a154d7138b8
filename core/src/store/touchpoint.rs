//! Store methods for the touchpoint event log.

use super::{json_column, ts_column, AttributionStore};
use crate::{
    error::AttributionResult,
    model::TouchpointRole,
    touchpoint::{format_timestamp, truncate_to_millis, Touchpoint},
    types::{DealId, PartnerId},
};
use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTouchpoint {
    pub partner_id:      PartnerId,
    pub deal_id:         DealId,
    /// Defaults to now.
    #[serde(default)]
    pub timestamp:       Option<DateTime<Utc>>,
    #[serde(default)]
    pub touchpoint_type: TouchpointRole,
    #[serde(default)]
    pub metadata:        Option<serde_json::Value>,
}

/// A touchpoint as recorded in the event log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TouchpointRecord {
    pub touchpoint_id:   String,
    pub partner_id:      PartnerId,
    pub deal_id:         DealId,
    pub timestamp:       DateTime<Utc>,
    pub touchpoint_type: TouchpointRole,
    pub metadata:        serde_json::Value,
    pub created_at:      DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TouchpointFilter {
    #[serde(default)]
    pub deal_id:    Option<DealId>,
    #[serde(default)]
    pub partner_id: Option<PartnerId>,
}

impl AttributionStore {
    // ── Touchpoint ────────────────────────────────────────────────

    pub fn insert_touchpoint(&self, new: &NewTouchpoint) -> AttributionResult<TouchpointRecord> {
        let now = truncate_to_millis(Utc::now());
        let record = TouchpointRecord {
            touchpoint_id: uuid::Uuid::new_v4().to_string(),
            partner_id: new.partner_id.clone(),
            deal_id: new.deal_id.clone(),
            timestamp: new.timestamp.map_or(now, truncate_to_millis),
            touchpoint_type: new.touchpoint_type.clone(),
            metadata: new.metadata.clone().unwrap_or_else(|| serde_json::json!({})),
            created_at: now,
        };
        self.conn.execute(
            "INSERT INTO touchpoint (
                touchpoint_id, partner_id, deal_id, timestamp, touchpoint_type, metadata, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.touchpoint_id,
                record.partner_id,
                record.deal_id,
                format_timestamp(&record.timestamp),
                record.touchpoint_type.as_str(),
                serde_json::to_string(&record.metadata)?,
                format_timestamp(&record.created_at),
            ],
        )?;
        Ok(record)
    }

    /// The engine's input for a deal: chronological, equal timestamps in
    /// insertion order, each carrying the partner's display name.
    pub fn touchpoints_for_deal(&self, deal_id: &str) -> AttributionResult<Vec<Touchpoint>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.partner_id, p.name, t.deal_id, t.timestamp, t.touchpoint_type, t.metadata
             FROM touchpoint t
             JOIN partner p ON t.partner_id = p.partner_id
             WHERE t.deal_id = ?1
             ORDER BY t.timestamp ASC, t.seq ASC",
        )?;
        let rows = stmt.query_map(params![deal_id], |row| {
            Ok(Touchpoint {
                partner_id: row.get(0)?,
                partner_name: row.get(1)?,
                deal_id: row.get(2)?,
                timestamp: ts_column(row, 3)?,
                role: TouchpointRole::from_tag(&row.get::<_, String>(4)?),
                metadata: json_column(row, 5)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Newest first, optionally narrowed to a deal and/or partner.
    pub fn list_touchpoints(
        &self,
        filter: &TouchpointFilter,
        limit: u32,
        offset: u32,
    ) -> AttributionResult<Vec<TouchpointRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT touchpoint_id, partner_id, deal_id, timestamp, touchpoint_type, metadata, created_at
             FROM touchpoint
             WHERE (?1 IS NULL OR deal_id = ?1)
               AND (?2 IS NULL OR partner_id = ?2)
             ORDER BY timestamp DESC, seq DESC
             LIMIT ?3 OFFSET ?4",
        )?;
        let rows = stmt.query_map(
            params![filter.deal_id, filter.partner_id, limit, offset],
            |row| {
                Ok(TouchpointRecord {
                    touchpoint_id: row.get(0)?,
                    partner_id: row.get(1)?,
                    deal_id: row.get(2)?,
                    timestamp: ts_column(row, 3)?,
                    touchpoint_type: TouchpointRole::from_tag(&row.get::<_, String>(4)?),
                    metadata: json_column(row, 5)?,
                    created_at: ts_column(row, 6)?,
                })
            },
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
