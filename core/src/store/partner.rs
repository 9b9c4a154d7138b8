//! Store methods for partners.

use super::{json_column, ts_column, AttributionStore};
use crate::{
    error::AttributionResult,
    touchpoint::{format_timestamp, truncate_to_millis},
    types::PartnerId,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPartner {
    /// Generated when absent.
    #[serde(default)]
    pub partner_id:     Option<PartnerId>,
    pub name:           String,
    pub email:          String,
    #[serde(default)]
    pub payout_details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Partner {
    pub partner_id:     PartnerId,
    pub name:           String,
    pub email:          String,
    pub payout_details: serde_json::Value,
    pub created_at:     DateTime<Utc>,
}

impl AttributionStore {
    // ── Partner ───────────────────────────────────────────────────

    pub fn insert_partner(&self, new: &NewPartner) -> AttributionResult<Partner> {
        let partner = Partner {
            partner_id: new
                .partner_id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            name: new.name.clone(),
            email: new.email.clone(),
            payout_details: new
                .payout_details
                .clone()
                .unwrap_or_else(|| serde_json::json!({})),
            created_at: truncate_to_millis(Utc::now()),
        };
        self.conn.execute(
            "INSERT INTO partner (partner_id, name, email, payout_details, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                partner.partner_id,
                partner.name,
                partner.email,
                serde_json::to_string(&partner.payout_details)?,
                format_timestamp(&partner.created_at),
            ],
        )?;
        Ok(partner)
    }

    pub fn get_partner(&self, partner_id: &str) -> AttributionResult<Option<Partner>> {
        let partner = self
            .conn
            .query_row(
                "SELECT partner_id, name, email, payout_details, created_at
                 FROM partner WHERE partner_id = ?1",
                params![partner_id],
                partner_from_row,
            )
            .optional()?;
        Ok(partner)
    }

    /// Newest first.
    pub fn list_partners(&self, limit: u32, offset: u32) -> AttributionResult<Vec<Partner>> {
        let mut stmt = self.conn.prepare(
            "SELECT partner_id, name, email, payout_details, created_at
             FROM partner
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?1 OFFSET ?2",
        )?;
        let rows = stmt.query_map(params![limit, offset], partner_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

fn partner_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Partner> {
    Ok(Partner {
        partner_id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        payout_details: json_column(row, 3)?,
        created_at: ts_column(row, 4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Partners list newest first; ties within a millisecond fall back to
    /// insertion order, newest first.
    #[test]
    fn list_partners_is_newest_first() {
        let store = AttributionStore::in_memory().unwrap();
        store.migrate().unwrap();
        for (id, name) in [("p1", "Alice"), ("p2", "Bob"), ("p3", "Charlie")] {
            store
                .insert_partner(&NewPartner {
                    partner_id: Some(id.into()),
                    name: name.into(),
                    email: format!("{id}@test.example"),
                    payout_details: None,
                })
                .unwrap();
        }

        let ids: Vec<_> = store
            .list_partners(10, 0)
            .unwrap()
            .into_iter()
            .map(|p| p.partner_id)
            .collect();
        assert_eq!(ids, ["p3", "p2", "p1"]);

        let page = store.list_partners(2, 2).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].partner_id, "p1");
        assert_eq!(page[0].payout_details, serde_json::json!({}));
    }
}
