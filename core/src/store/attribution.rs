//! Store methods for the attribution result cache.
//!
//! RULE: A deal's cached rows are only ever replaced wholesale, inside one
//! transaction. Readers see either the previous set or the new set.

use super::{ts_column, AttributionStore};
use crate::{
    breakdown::{AttributionBreakdown, PartnerAttribution},
    error::AttributionResult,
    model::AttributionModel,
    touchpoint::format_timestamp,
    types::DealId,
};
use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};

/// Previously saved attribution rows for one deal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CachedAttribution {
    pub deal_id:       DealId,
    pub model:         AttributionModel,
    /// Payout descending.
    pub attributions:  Vec<PartnerAttribution>,
    pub calculated_at: DateTime<Utc>,
}

struct CachedRow {
    model:         String,
    entry:         PartnerAttribution,
    calculated_at: DateTime<Utc>,
}

impl AttributionStore {
    // ── Attribution cache ─────────────────────────────────────────

    /// Replace every cached row for `breakdown.deal_id` with its entries.
    /// On any failure the transaction rolls back and the old rows stay.
    pub fn save_attribution_results(&self, breakdown: &AttributionBreakdown) -> AttributionResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        let cleared = tx.execute(
            "DELETE FROM attribution_result WHERE deal_id = ?1",
            params![breakdown.deal_id],
        )?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO attribution_result (
                    result_id, deal_id, partner_id, model, attribution_percentage,
                    payout_amount, touchpoint_count, role_summary, calculated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            let calculated_at = format_timestamp(&breakdown.calculated_at);
            for attr in &breakdown.attributions {
                insert.execute(params![
                    uuid::Uuid::new_v4().to_string(),
                    breakdown.deal_id,
                    attr.partner_id,
                    breakdown.model.as_str(),
                    attr.percentage,
                    attr.payout,
                    attr.touchpoints,
                    attr.role,
                    calculated_at,
                ])?;
            }
        }
        tx.commit()?;
        log::info!(
            "deal={} attribution cache replaced: {cleared} rows cleared, {} written ({})",
            breakdown.deal_id,
            breakdown.attributions.len(),
            breakdown.model
        );
        Ok(())
    }

    /// Cached rows for a deal, payout descending. `None` when nothing is cached.
    pub fn load_cached_attribution(&self, deal_id: &str) -> AttributionResult<Option<CachedAttribution>> {
        let mut stmt = self.conn.prepare(
            "SELECT ar.partner_id, p.name, ar.attribution_percentage, ar.payout_amount,
                    ar.touchpoint_count, ar.role_summary, ar.model, ar.calculated_at
             FROM attribution_result ar
             JOIN partner p ON ar.partner_id = p.partner_id
             WHERE ar.deal_id = ?1
             ORDER BY ar.payout_amount DESC, ar.rowid ASC",
        )?;
        let rows = stmt
            .query_map(params![deal_id], |row| {
                Ok(CachedRow {
                    entry: PartnerAttribution {
                        partner_id: row.get(0)?,
                        partner_name: row.get(1)?,
                        percentage: row.get(2)?,
                        payout: row.get(3)?,
                        touchpoints: row.get(4)?,
                        role: row.get(5)?,
                    },
                    model: row.get(6)?,
                    calculated_at: ts_column(row, 7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let Some(first) = rows.first() else {
            return Ok(None);
        };
        let model: AttributionModel = first.model.parse()?;
        let calculated_at = first.calculated_at;
        Ok(Some(CachedAttribution {
            deal_id: deal_id.to_string(),
            model,
            attributions: rows.into_iter().map(|r| r.entry).collect(),
            calculated_at,
        }))
    }

    /// Number of cached rows for a deal (for tests).
    pub fn attribution_row_count(&self, deal_id: &str) -> AttributionResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM attribution_result WHERE deal_id = ?1",
            params![deal_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
