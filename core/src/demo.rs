//! Seeded demo dataset: partners, closed deals and their touchpoints.
//!
//! Same seed + same anchor = identical dataset, down to every timestamp.
//! Used by the runner's `--demo` flag and by tests that need a populated
//! store without hand-writing fixtures.

use crate::{
    error::AttributionResult,
    model::{AttributionModel, TouchpointRole},
    rng::{DemoRng, StreamSlot},
    store::{AttributionStore, NewDeal, NewPartner, NewTouchpoint},
};
use chrono::{DateTime, Duration, Utc};

const MAX_TOUCHPOINTS_PER_DEAL: u64 = 6;
const TOUCH_WINDOW_MINUTES: u64 = 60 * 24 * 60; // 60 days before close
const MIN_DEAL_AMOUNT: f64 = 1_000.0;
const MAX_DEAL_AMOUNT: f64 = 250_000.0;

/// Relative frequency of each role in generated touchpoints.
const ROLE_MIX: [(TouchpointRole, f64); 6] = [
    (TouchpointRole::Referral, 0.20),
    (TouchpointRole::Demo,     0.25),
    (TouchpointRole::Intro,    0.15),
    (TouchpointRole::Support,  0.15),
    (TouchpointRole::Closer,   0.15),
    (TouchpointRole::Other,    0.10),
];

#[derive(Debug, Clone)]
pub struct DemoDataset {
    pub partners:    Vec<NewPartner>,
    pub deals:       Vec<NewDeal>,
    pub touchpoints: Vec<NewTouchpoint>,
}

impl DemoDataset {
    /// Build `partner_count` partners and `deal_count` deals. Deals close one
    /// day apart starting at `anchor`; touchpoints fall in the 60 days
    /// before each close.
    pub fn generate(
        seed: u64,
        partner_count: usize,
        deal_count: usize,
        anchor: DateTime<Utc>,
    ) -> Self {
        let mut partner_rng = DemoRng::new(seed, StreamSlot::Partners);
        let mut deal_rng = DemoRng::new(seed, StreamSlot::Deals);
        let mut touch_rng = DemoRng::new(seed, StreamSlot::Touchpoints);

        let partners: Vec<NewPartner> = (0..partner_count.max(1))
            .map(|i| {
                let name = partner_name(&mut partner_rng);
                let slug: String = name
                    .to_lowercase()
                    .chars()
                    .filter(|c| c.is_ascii_alphanumeric())
                    .collect();
                NewPartner {
                    partner_id: Some(format!("partner-{i:03}")),
                    email: format!("{slug}.{i}@partners.example"),
                    name,
                    payout_details: Some(serde_json::json!({ "method": "ach" })),
                }
            })
            .collect();

        let role_weights: Vec<f64> = ROLE_MIX.iter().map(|(_, w)| *w).collect();
        let mut deals = Vec::with_capacity(deal_count);
        let mut touchpoints = Vec::new();

        for d in 0..deal_count {
            let deal_id = format!("deal-{d:04}");
            let amount = deal_rng.pareto(MIN_DEAL_AMOUNT, 1.6).min(MAX_DEAL_AMOUNT);
            let closed_date = anchor + Duration::days(d as i64);
            deals.push(NewDeal {
                deal_id: Some(deal_id.clone()),
                amount: (amount * 100.0).round() / 100.0,
                closed_date: Some(closed_date),
                attribution_model: *deal_rng.pick(&AttributionModel::ALL),
            });

            let count = 1 + touch_rng.next_u64_below(MAX_TOUCHPOINTS_PER_DEAL);
            let mut offsets: Vec<u64> = (0..count)
                .map(|_| touch_rng.next_u64_below(TOUCH_WINDOW_MINUTES))
                .collect();
            offsets.sort_unstable_by(|a, b| b.cmp(a));

            for offset in offsets {
                let partner = touch_rng.pick(&partners);
                let role = ROLE_MIX[touch_rng.weighted_index(&role_weights)].0.clone();
                touchpoints.push(NewTouchpoint {
                    partner_id: partner.partner_id.clone().unwrap_or_default(),
                    deal_id: deal_id.clone(),
                    timestamp: Some(closed_date - Duration::minutes(offset as i64)),
                    touchpoint_type: role,
                    metadata: Some(serde_json::json!({ "source": "demo" })),
                });
            }
        }

        Self { partners, deals, touchpoints }
    }

    /// Persist every record. Not transactional: a failure part-way leaves
    /// earlier records in place.
    pub fn load_into(&self, store: &AttributionStore) -> AttributionResult<()> {
        for p in &self.partners {
            store.insert_partner(p)?;
        }
        for d in &self.deals {
            store.insert_deal(d)?;
        }
        for t in &self.touchpoints {
            store.insert_touchpoint(t)?;
        }
        log::info!(
            "demo dataset loaded: {} partners, {} deals, {} touchpoints",
            self.partners.len(),
            self.deals.len(),
            self.touchpoints.len()
        );
        Ok(())
    }
}

/// "Prefix Industry Suffix", e.g. "Summit Cloud Partners".
fn partner_name(rng: &mut DemoRng) -> String {
    const PREFIXES: &[&str] = &[
        "Summit", "Northwind", "Bluefin", "Keystone", "Harbor", "Vertex", "Atlas",
        "Cobalt", "Redwood", "Meridian", "Lighthouse", "Granite", "Silverline", "Beacon",
    ];
    const INDUSTRIES: &[&str] = &[
        "Cloud", "Data", "Security", "Analytics", "Systems", "Software", "Digital",
        "Networks", "Integration", "Commerce",
    ];
    const SUFFIXES: &[&str] = &[
        "Partners", "Consulting", "Group", "Solutions", "Advisors", "Labs", "Collective",
    ];

    let prefix = rng.pick(PREFIXES);
    let industry = rng.pick(INDUSTRIES);
    if rng.chance(0.8) {
        format!("{prefix} {industry} {}", rng.pick(SUFFIXES))
    } else {
        format!("{prefix} {industry}")
    }
}
