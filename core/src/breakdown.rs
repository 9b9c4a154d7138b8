//! The engine's output shape.

use crate::{
    model::AttributionModel,
    types::{DealId, Money, PartnerId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the engine needs to know about a deal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DealContext {
    pub deal_id: DealId,
    pub amount:  Money,
    pub model:   AttributionModel,
}

/// One partner's share of a deal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartnerAttribution {
    pub partner_id:   PartnerId,
    pub partner_name: String,
    /// 0–100, rounded to 2 decimal places.
    pub percentage:   f64,
    pub payout:       Money,
    /// Every touchpoint this partner has on the deal, whichever model is used.
    pub touchpoints:  u32,
    /// Distinct roles touched, comma-joined. Role-based model only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role:         Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttributionBreakdown {
    pub deal_id:       DealId,
    pub total_amount:  Money,
    pub model:         AttributionModel,
    /// Ordered by payout descending; ties keep first-encountered partner order.
    pub attributions:  Vec<PartnerAttribution>,
    pub calculated_at: DateTime<Utc>,
}

impl AttributionBreakdown {
    /// A deal with no touchpoints: nothing to attribute, not an error.
    pub fn empty(deal: &DealContext, calculated_at: DateTime<Utc>) -> Self {
        Self {
            deal_id: deal.deal_id.clone(),
            total_amount: deal.amount,
            model: deal.model,
            attributions: Vec::new(),
            calculated_at,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.attributions.is_empty()
    }

    pub fn total_payout(&self) -> Money {
        self.attributions.iter().map(|a| a.payout).sum()
    }

    pub fn total_percentage(&self) -> f64 {
        self.attributions.iter().map(|a| a.percentage).sum()
    }

    pub fn for_partner(&self, partner_id: &str) -> Option<&PartnerAttribution> {
        self.attributions.iter().find(|a| a.partner_id == partner_id)
    }
}
