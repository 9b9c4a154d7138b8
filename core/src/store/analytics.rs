//! Read-only reporting queries over deals, touchpoints and cached results.

use super::{ts_column, AttributionStore, Partner};
use crate::{
    error::{AttributionError, AttributionResult},
    touchpoint::format_timestamp,
    types::{DealId, Money, PartnerId},
};
use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};

const TOP_PARTNERS: u32 = 20;
const RECENT_DEALS: u32 = 10;
const MONTHS_OF_HISTORY: u32 = 12;

/// Inclusive bounds on deal close date (touchpoint timestamp for role counts).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct DateRange {
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end:   Option<DateTime<Utc>>,
}

impl DateRange {
    fn bounds(&self) -> (Option<String>, Option<String>) {
        (
            self.start.as_ref().map(format_timestamp),
            self.end.as_ref().map(format_timestamp),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverviewTotals {
    pub total_deals:   i64,
    pub total_revenue: Money,
    pub avg_deal_size: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartnerPerformance {
    pub partner_id:          PartnerId,
    pub name:                String,
    pub deals_count:         i64,
    pub total_payout:        Money,
    pub avg_attribution_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelUsage {
    pub attribution_model: String,
    pub count:             i64,
    pub total_amount:      Money,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoleCount {
    pub touchpoint_type: String,
    pub count:           i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecentDeal {
    pub deal_id:           DealId,
    pub amount:            Money,
    pub closed_date:       DateTime<Utc>,
    pub attribution_model: String,
    pub touchpoints_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyticsOverview {
    pub overview:     OverviewTotals,
    pub partners:     Vec<PartnerPerformance>,
    pub models:       Vec<ModelUsage>,
    pub touchpoints:  Vec<RoleCount>,
    pub recent_deals: Vec<RecentDeal>,
    pub range:        DateRange,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartnerStats {
    pub total_deals:        i64,
    pub total_payout:       Money,
    pub total_attributions: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartnerDealAttribution {
    pub deal_id:                DealId,
    pub amount:                 Money,
    pub closed_date:            DateTime<Utc>,
    pub attribution_model:      String,
    pub attribution_percentage: f64,
    pub payout_amount:          Money,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthlyPayout {
    /// `YYYY-MM`
    pub month:        String,
    pub deals_count:  i64,
    pub total_payout: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartnerAnalytics {
    pub partner:     Partner,
    pub stats:       PartnerStats,
    pub deals:       Vec<PartnerDealAttribution>,
    pub touchpoints: Vec<RoleCount>,
    pub monthly:     Vec<MonthlyPayout>,
}

impl AttributionStore {
    // ── Dashboard analytics ───────────────────────────────────────

    pub fn analytics_overview(&self, range: &DateRange) -> AttributionResult<AnalyticsOverview> {
        let (start, end) = range.bounds();

        let overview = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(amount), 0.0), COALESCE(AVG(amount), 0.0)
             FROM deal
             WHERE (?1 IS NULL OR closed_date >= ?1)
               AND (?2 IS NULL OR closed_date <= ?2)",
            params![start, end],
            |row| {
                Ok(OverviewTotals {
                    total_deals: row.get(0)?,
                    total_revenue: row.get(1)?,
                    avg_deal_size: row.get(2)?,
                })
            },
        )?;

        let partners = {
            let mut stmt = self.conn.prepare(
                "SELECT p.partner_id, p.name,
                        COUNT(DISTINCT ar.deal_id),
                        COALESCE(SUM(ar.payout_amount), 0.0),
                        COALESCE(AVG(ar.attribution_percentage), 0.0)
                 FROM partner p
                 LEFT JOIN attribution_result ar
                   ON ar.partner_id = p.partner_id
                  AND ar.deal_id IN (
                      SELECT deal_id FROM deal
                      WHERE (?1 IS NULL OR closed_date >= ?1)
                        AND (?2 IS NULL OR closed_date <= ?2))
                 GROUP BY p.partner_id, p.name
                 ORDER BY 4 DESC, p.partner_id ASC
                 LIMIT ?3",
            )?;
            let rows = stmt.query_map(params![start, end, TOP_PARTNERS], |row| {
                Ok(PartnerPerformance {
                    partner_id: row.get(0)?,
                    name: row.get(1)?,
                    deals_count: row.get(2)?,
                    total_payout: row.get(3)?,
                    avg_attribution_pct: row.get(4)?,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        let models = {
            let mut stmt = self.conn.prepare(
                "SELECT attribution_model, COUNT(*), COALESCE(SUM(amount), 0.0)
                 FROM deal
                 WHERE (?1 IS NULL OR closed_date >= ?1)
                   AND (?2 IS NULL OR closed_date <= ?2)
                 GROUP BY attribution_model
                 ORDER BY 2 DESC, attribution_model ASC",
            )?;
            let rows = stmt.query_map(params![start, end], |row| {
                Ok(ModelUsage {
                    attribution_model: row.get(0)?,
                    count: row.get(1)?,
                    total_amount: row.get(2)?,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        let touchpoints = {
            let mut stmt = self.conn.prepare(
                "SELECT touchpoint_type, COUNT(*)
                 FROM touchpoint
                 WHERE (?1 IS NULL OR timestamp >= ?1)
                   AND (?2 IS NULL OR timestamp <= ?2)
                 GROUP BY touchpoint_type
                 ORDER BY 2 DESC, touchpoint_type ASC",
            )?;
            let rows = stmt.query_map(params![start, end], role_count_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        let recent_deals = {
            let mut stmt = self.conn.prepare(
                "SELECT d.deal_id, d.amount, d.closed_date, d.attribution_model, COUNT(t.seq)
                 FROM deal d
                 LEFT JOIN touchpoint t ON t.deal_id = d.deal_id
                 GROUP BY d.deal_id
                 ORDER BY d.closed_date DESC, d.deal_id ASC
                 LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![RECENT_DEALS], |row| {
                Ok(RecentDeal {
                    deal_id: row.get(0)?,
                    amount: row.get(1)?,
                    closed_date: ts_column(row, 2)?,
                    attribution_model: row.get(3)?,
                    touchpoints_count: row.get(4)?,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        Ok(AnalyticsOverview {
            overview,
            partners,
            models,
            touchpoints,
            recent_deals,
            range: *range,
        })
    }

    pub fn partner_stats(&self, partner_id: &str) -> AttributionResult<PartnerStats> {
        let stats = self.conn.query_row(
            "SELECT COUNT(DISTINCT deal_id), COALESCE(SUM(payout_amount), 0.0), COUNT(*)
             FROM attribution_result
             WHERE partner_id = ?1",
            params![partner_id],
            |row| {
                Ok(PartnerStats {
                    total_deals: row.get(0)?,
                    total_payout: row.get(1)?,
                    total_attributions: row.get(2)?,
                })
            },
        )?;
        Ok(stats)
    }

    pub fn partner_analytics(&self, partner_id: &str) -> AttributionResult<PartnerAnalytics> {
        let partner = self
            .get_partner(partner_id)?
            .ok_or_else(|| AttributionError::PartnerNotFound {
                partner_id: partner_id.to_string(),
            })?;
        let stats = self.partner_stats(partner_id)?;

        let deals = {
            let mut stmt = self.conn.prepare(
                "SELECT d.deal_id, d.amount, d.closed_date, d.attribution_model,
                        ar.attribution_percentage, ar.payout_amount
                 FROM attribution_result ar
                 JOIN deal d ON ar.deal_id = d.deal_id
                 WHERE ar.partner_id = ?1
                 ORDER BY d.closed_date DESC, d.deal_id ASC",
            )?;
            let rows = stmt.query_map(params![partner_id], |row| {
                Ok(PartnerDealAttribution {
                    deal_id: row.get(0)?,
                    amount: row.get(1)?,
                    closed_date: ts_column(row, 2)?,
                    attribution_model: row.get(3)?,
                    attribution_percentage: row.get(4)?,
                    payout_amount: row.get(5)?,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        let touchpoints = {
            let mut stmt = self.conn.prepare(
                "SELECT touchpoint_type, COUNT(*)
                 FROM touchpoint
                 WHERE partner_id = ?1
                 GROUP BY touchpoint_type
                 ORDER BY 2 DESC, touchpoint_type ASC",
            )?;
            let rows = stmt.query_map(params![partner_id], role_count_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        let monthly = {
            let mut stmt = self.conn.prepare(
                "SELECT substr(d.closed_date, 1, 7) AS month,
                        COUNT(*),
                        COALESCE(SUM(ar.payout_amount), 0.0)
                 FROM attribution_result ar
                 JOIN deal d ON ar.deal_id = d.deal_id
                 WHERE ar.partner_id = ?1
                 GROUP BY month
                 ORDER BY month DESC
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![partner_id, MONTHS_OF_HISTORY], |row| {
                Ok(MonthlyPayout {
                    month: row.get(0)?,
                    deals_count: row.get(1)?,
                    total_payout: row.get(2)?,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        Ok(PartnerAnalytics {
            partner,
            stats,
            deals,
            touchpoints,
            monthly,
        })
    }
}

fn role_count_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RoleCount> {
    Ok(RoleCount {
        touchpoint_type: row.get(0)?,
        count: row.get(1)?,
    })
}
