//! The attribution engine: maps (deal amount, touchpoints, model) to a
//! normalized credit split.
//!
//! RULES:
//!   - Pure: no I/O, no clock reads, no hidden state. The caller supplies
//!     `calculated_at` so identical inputs give identical output.
//!   - Touchpoints are processed in chronological order. Equal timestamps
//!     keep input order (the store's insertion order).
//!   - Entries are unique per partner, in first-encountered order until the
//!     final presentation sort.
//!   - Normalization pushes any payout residue above the configured
//!     tolerance onto the largest holder, then rounds to 2 decimal places.

use crate::{
    breakdown::{AttributionBreakdown, DealContext, PartnerAttribution},
    config::AttributionConfig,
    error::{AttributionError, AttributionResult},
    model::{AttributionModel, TouchpointRole},
    touchpoint::{sort_chronologically, Touchpoint},
    types::Money,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct AttributionEngine {
    config: AttributionConfig,
}

/// Per-partner accumulator. Order of creation is order of first touch.
#[derive(Debug, Clone)]
struct PartnerTally {
    partner_id:   String,
    partner_name: String,
    touchpoints:  u32,
    score:        f64,
    roles:        Vec<TouchpointRole>,
}

impl PartnerTally {
    fn entry(&self, percentage: f64, payout: Money, role: Option<String>) -> PartnerAttribution {
        PartnerAttribution {
            partner_id: self.partner_id.clone(),
            partner_name: self.partner_name.clone(),
            percentage,
            payout,
            touchpoints: self.touchpoints,
            role,
        }
    }

    fn role_summary(&self) -> String {
        self.roles
            .iter()
            .map(|r| r.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl AttributionEngine {
    pub fn new(config: AttributionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AttributionConfig {
        &self.config
    }

    /// Compute the credit split for one deal.
    ///
    /// `touchpoints` should all belong to `deal`; that is not checked.
    /// An empty slice yields an empty breakdown.
    pub fn compute_attribution(
        &self,
        deal: &DealContext,
        touchpoints: &[Touchpoint],
        calculated_at: DateTime<Utc>,
    ) -> AttributionResult<AttributionBreakdown> {
        if !(deal.amount.is_finite() && deal.amount > 0.0) {
            return Err(AttributionError::InvalidAmount { amount: deal.amount });
        }
        if touchpoints.is_empty() {
            return Ok(AttributionBreakdown::empty(deal, calculated_at));
        }

        let mut ordered = touchpoints.to_vec();
        sort_chronologically(&mut ordered);

        let raw = match deal.model {
            AttributionModel::Equal      => equal_split(&ordered, deal.amount),
            AttributionModel::FirstTouch => first_touch(&ordered, deal.amount),
            AttributionModel::LastTouch  => last_touch(&ordered, deal.amount),
            AttributionModel::RoleBased  => self.role_based(&ordered, deal.amount),
            AttributionModel::TimeDecay  => self.time_decay(&ordered, deal.amount),
        };

        let mut attributions = self.normalize(raw, deal.amount);
        // Stable: equal payouts keep first-encountered order.
        attributions.sort_by(|a, b| b.payout.total_cmp(&a.payout));

        Ok(AttributionBreakdown {
            deal_id: deal.deal_id.clone(),
            total_amount: deal.amount,
            model: deal.model,
            attributions,
            calculated_at,
        })
    }

    fn role_based(&self, ordered: &[Touchpoint], amount: Money) -> Vec<PartnerAttribution> {
        let weights = &self.config.role_weights;
        let tallies = tally(ordered, |t| weights.weight(&t.role));
        proportional(&tallies, amount, true)
    }

    fn time_decay(&self, ordered: &[Touchpoint], amount: Money) -> Vec<PartnerAttribution> {
        // "now" is the latest touchpoint, not the wall clock.
        let now = match ordered.last() {
            Some(t) => t.timestamp,
            None => return Vec::new(),
        };
        let k = self.config.decay_constant();
        let tallies = tally(ordered, |t| {
            let age_ms = (now - t.timestamp).num_milliseconds() as f64;
            (-k * age_ms).exp()
        });
        proportional(&tallies, amount, false)
    }

    /// Reconcile floating-point drift, round for output, then reconcile the
    /// cents lost to rounding.
    fn normalize(&self, mut entries: Vec<PartnerAttribution>, amount: Money) -> Vec<PartnerAttribution> {
        let total: Money = entries.iter().map(|e| e.payout).sum();
        let diff = amount - total;

        if diff.abs() > self.config.residual_tolerance {
            if let Some(largest) = largest_holder(&entries) {
                let entry = &mut entries[largest];
                log::debug!(
                    "normalize: assigning residue {diff:.6} to partner {}",
                    entry.partner_id
                );
                entry.payout += diff;
                entry.percentage = entry.payout / amount * 100.0;
            }
        }

        for entry in &mut entries {
            entry.percentage = round_cents(entry.percentage);
            entry.payout = round_cents(entry.payout);
        }

        // Rounding each entry on its own can leave whole cents over or
        // under; those go to the largest holder as well.
        let Some(largest) = largest_holder(&entries) else {
            return entries;
        };
        let tolerance = self.config.residual_tolerance;

        let cents = round_cents(amount - entries.iter().map(|e| e.payout).sum::<Money>());
        if cents.abs() > tolerance {
            let entry = &mut entries[largest];
            log::debug!(
                "normalize: assigning rounding residue {cents:.2} to partner {}",
                entry.partner_id
            );
            entry.payout = round_cents(entry.payout + cents);
            entry.percentage = round_cents(entry.payout / amount * 100.0);
        }

        let points = round_cents(100.0 - entries.iter().map(|e| e.percentage).sum::<f64>());
        if points.abs() > tolerance {
            let entry = &mut entries[largest];
            entry.percentage = round_cents(entry.percentage + points);
        }
        entries
    }
}

/// Group touchpoints by partner, summing `weight` per touchpoint.
fn tally<F>(ordered: &[Touchpoint], weight: F) -> Vec<PartnerTally>
where
    F: Fn(&Touchpoint) -> f64,
{
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut tallies: Vec<PartnerTally> = Vec::new();

    for t in ordered {
        let slot = *index.entry(t.partner_id.as_str()).or_insert_with(|| {
            tallies.push(PartnerTally {
                partner_id:   t.partner_id.clone(),
                partner_name: t.partner_name.clone(),
                touchpoints:  0,
                score:        0.0,
                roles:        Vec::new(),
            });
            tallies.len() - 1
        });
        let tally = &mut tallies[slot];
        tally.touchpoints += 1;
        tally.score += weight(t);
        if !tally.roles.contains(&t.role) {
            tally.roles.push(t.role.clone());
        }
    }
    tallies
}

fn equal_split(ordered: &[Touchpoint], amount: Money) -> Vec<PartnerAttribution> {
    let tallies = tally(ordered, |_| 1.0);
    let partners = tallies.len() as f64;
    tallies
        .iter()
        .map(|t| t.entry(100.0 / partners, amount / partners, None))
        .collect()
}

fn first_touch(ordered: &[Touchpoint], amount: Money) -> Vec<PartnerAttribution> {
    sole_credit(ordered, ordered.first(), amount)
}

fn last_touch(ordered: &[Touchpoint], amount: Money) -> Vec<PartnerAttribution> {
    sole_credit(ordered, ordered.last(), amount)
}

/// 100% to one partner; the touchpoint count still covers the whole sequence.
fn sole_credit(
    ordered: &[Touchpoint],
    winner: Option<&Touchpoint>,
    amount: Money,
) -> Vec<PartnerAttribution> {
    let Some(winner) = winner else {
        return Vec::new();
    };
    tally(ordered, |_| 0.0)
        .iter()
        .filter(|t| t.partner_id == winner.partner_id)
        .map(|t| t.entry(100.0, amount, None))
        .collect()
}

fn proportional(tallies: &[PartnerTally], amount: Money, with_roles: bool) -> Vec<PartnerAttribution> {
    let total: f64 = tallies.iter().map(|t| t.score).sum();
    tallies
        .iter()
        .map(|t| {
            let share = t.score / total;
            let role = with_roles.then(|| t.role_summary());
            t.entry(share * 100.0, share * amount, role)
        })
        .collect()
}

/// Index of the first entry holding the maximum payout.
fn largest_holder(entries: &[PartnerAttribution]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, e) in entries.iter().enumerate() {
        match best {
            Some(b) if e.payout <= entries[b].payout => {}
            _ => best = Some(i),
        }
    }
    best
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
