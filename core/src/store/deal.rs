//! Store methods for deals.

use super::{ts_column, AttributionStore};
use crate::{
    breakdown::DealContext,
    error::{AttributionError, AttributionResult},
    model::AttributionModel,
    touchpoint::{format_timestamp, truncate_to_millis},
    types::{DealId, Money},
};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDeal {
    #[serde(default)]
    pub deal_id:           Option<DealId>,
    pub amount:            Money,
    /// Defaults to now.
    #[serde(default)]
    pub closed_date:       Option<DateTime<Utc>>,
    pub attribution_model: AttributionModel,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Deal {
    pub deal_id:           DealId,
    pub amount:            Money,
    pub closed_date:       DateTime<Utc>,
    pub attribution_model: AttributionModel,
    pub created_at:        DateTime<Utc>,
}

impl Deal {
    pub fn context(&self) -> DealContext {
        DealContext {
            deal_id: self.deal_id.clone(),
            amount:  self.amount,
            model:   self.attribution_model,
        }
    }
}

/// A deal row before its model column has been checked.
struct RawDeal {
    deal_id:     DealId,
    amount:      Money,
    closed_date: DateTime<Utc>,
    model:       String,
    created_at:  DateTime<Utc>,
}

impl RawDeal {
    fn into_deal(self) -> AttributionResult<Deal> {
        Ok(Deal {
            attribution_model: self.model.parse()?,
            deal_id: self.deal_id,
            amount: self.amount,
            closed_date: self.closed_date,
            created_at: self.created_at,
        })
    }
}

impl AttributionStore {
    // ── Deal ──────────────────────────────────────────────────────

    pub fn insert_deal(&self, new: &NewDeal) -> AttributionResult<Deal> {
        if !(new.amount.is_finite() && new.amount > 0.0) {
            return Err(AttributionError::InvalidAmount { amount: new.amount });
        }
        let now = truncate_to_millis(Utc::now());
        let deal = Deal {
            deal_id: new
                .deal_id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            amount: new.amount,
            closed_date: new.closed_date.map_or(now, truncate_to_millis),
            attribution_model: new.attribution_model,
            created_at: now,
        };
        self.conn.execute(
            "INSERT INTO deal (deal_id, amount, closed_date, attribution_model, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                deal.deal_id,
                deal.amount,
                format_timestamp(&deal.closed_date),
                deal.attribution_model.as_str(),
                format_timestamp(&deal.created_at),
            ],
        )?;
        Ok(deal)
    }

    /// Fails with `UnknownModel` if the stored model name is not one of the five.
    pub fn get_deal(&self, deal_id: &str) -> AttributionResult<Option<Deal>> {
        let raw = self
            .conn
            .query_row(
                "SELECT deal_id, amount, closed_date, attribution_model, created_at
                 FROM deal WHERE deal_id = ?1",
                params![deal_id],
                raw_deal_from_row,
            )
            .optional()?;
        raw.map(RawDeal::into_deal).transpose()
    }

    /// Most recently closed first.
    pub fn list_deals(&self, limit: u32, offset: u32) -> AttributionResult<Vec<Deal>> {
        let mut stmt = self.conn.prepare(
            "SELECT deal_id, amount, closed_date, attribution_model, created_at
             FROM deal
             ORDER BY closed_date DESC, rowid DESC
             LIMIT ?1 OFFSET ?2",
        )?;
        let raws = stmt
            .query_map(params![limit, offset], raw_deal_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raws.into_iter().map(RawDeal::into_deal).collect()
    }

    pub fn deal_count(&self) -> AttributionResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM deal", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn raw_deal_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawDeal> {
    Ok(RawDeal {
        deal_id: row.get(0)?,
        amount: row.get(1)?,
        closed_date: ts_column(row, 2)?,
        model: row.get(3)?,
        created_at: ts_column(row, 4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AttributionConfig,
        service::AttributionService,
        store::NewPartner,
        touchpoint::parse_timestamp,
    };

    fn store() -> AttributionStore {
        let store = AttributionStore::in_memory().unwrap();
        store.migrate().unwrap();
        store
    }

    fn deal(id: &str, closed: &str) -> NewDeal {
        NewDeal {
            deal_id: Some(id.into()),
            amount: 1_000.0,
            closed_date: Some(parse_timestamp(closed).unwrap()),
            attribution_model: AttributionModel::Equal,
        }
    }

    /// A deal row written by another tool with a model name outside the
    /// five fails on read, and the service refuses to attribute it.
    #[test]
    fn stored_unknown_model_fails_fast() {
        let store = store();
        store
            .conn
            .execute(
                "INSERT INTO deal (deal_id, amount, closed_date, attribution_model, created_at)
                 VALUES ('deal-linear', 500.0, '2024-01-01T00:00:00.000Z', 'linear',
                         '2024-01-01T00:00:00.000Z')",
                [],
            )
            .unwrap();

        let err = store.get_deal("deal-linear").unwrap_err();
        assert!(
            matches!(err, AttributionError::UnknownModel { ref model } if model == "linear"),
            "got {err}"
        );

        let service = AttributionService::new(store, AttributionConfig::default());
        let err = service.attribution_for_deal("deal-linear", false).unwrap_err();
        assert!(matches!(err, AttributionError::UnknownModel { .. }), "got {err}");
        assert_eq!(service.store().attribution_row_count("deal-linear").unwrap(), 0);
    }

    /// Deals list most recently closed first, regardless of insert order.
    #[test]
    fn list_deals_orders_by_close_date_descending() {
        let store = store();
        store.insert_deal(&deal("deal-b", "2024-02-01T00:00:00Z")).unwrap();
        store.insert_deal(&deal("deal-c", "2024-03-01T00:00:00Z")).unwrap();
        store.insert_deal(&deal("deal-a", "2024-01-01T00:00:00Z")).unwrap();

        let ids: Vec<_> = store
            .list_deals(10, 0)
            .unwrap()
            .into_iter()
            .map(|d| d.deal_id)
            .collect();
        assert_eq!(ids, ["deal-c", "deal-b", "deal-a"]);

        let page: Vec<_> = store.list_deals(1, 1).unwrap().into_iter().map(|d| d.deal_id).collect();
        assert_eq!(page, ["deal-b"]);
    }

    /// The returned record equals the row read back: sub-millisecond
    /// precision is dropped before either is built.
    #[test]
    fn inserted_deal_matches_stored_row() {
        let store = store();
        let inserted = store
            .insert_deal(&NewDeal {
                closed_date: Some(parse_timestamp("2024-01-01T00:00:00.123456Z").unwrap()),
                ..deal("deal-precise", "2024-01-01T00:00:00Z")
            })
            .unwrap();
        let read = store.get_deal("deal-precise").unwrap().unwrap();
        assert_eq!(read, inserted);
        assert_eq!(
            read.closed_date,
            parse_timestamp("2024-01-01T00:00:00.123Z").unwrap()
        );

        // Partners share the same path for created_at.
        let partner = store
            .insert_partner(&NewPartner {
                partner_id: Some("p1".into()),
                name: "Alice".into(),
                email: "alice@test.example".into(),
                payout_details: None,
            })
            .unwrap();
        assert_eq!(store.get_partner("p1").unwrap().unwrap(), partner);
    }
}
