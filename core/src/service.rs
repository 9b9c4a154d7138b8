//! Attribution service. Ties the store and the engine together.
//!
//! Flow for one deal:
//!   1. Look up the deal (the only existence check in the system).
//!   2. Serve cached rows unless a recompute is requested.
//!   3. Otherwise load touchpoints, compute, and replace the cache.
//!
//! Two recomputes of the same deal may race; the last writer wins.
//! Callers that need ordering must serialize per deal id themselves.

use crate::{
    breakdown::{AttributionBreakdown, DealContext},
    config::AttributionConfig,
    engine::AttributionEngine,
    error::{AttributionError, AttributionResult},
    model::AttributionModel,
    store::{AttributionStore, Deal},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A breakdown plus whether it came from the cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttributionView {
    #[serde(flatten)]
    pub breakdown: AttributionBreakdown,
    pub cached:    bool,
}

pub struct AttributionService {
    store:  AttributionStore,
    engine: AttributionEngine,
}

impl AttributionService {
    pub fn new(store: AttributionStore, config: AttributionConfig) -> Self {
        Self {
            store,
            engine: AttributionEngine::new(config),
        }
    }

    pub fn store(&self) -> &AttributionStore {
        &self.store
    }

    pub fn engine(&self) -> &AttributionEngine {
        &self.engine
    }

    /// Cached breakdown if one exists and `recalculate` is false;
    /// otherwise a fresh computation that replaces the cache.
    pub fn attribution_for_deal(
        &self,
        deal_id: &str,
        recalculate: bool,
    ) -> AttributionResult<AttributionView> {
        let deal = self.require_deal(deal_id)?;

        if !recalculate {
            if let Some(cached) = self.store.load_cached_attribution(deal_id)? {
                log::debug!("deal={deal_id} serving {} cached rows", cached.attributions.len());
                return Ok(AttributionView {
                    breakdown: AttributionBreakdown {
                        deal_id: deal.deal_id,
                        total_amount: deal.amount,
                        model: cached.model,
                        attributions: cached.attributions,
                        calculated_at: cached.calculated_at,
                    },
                    cached: true,
                });
            }
        }

        let breakdown = self.compute_and_save(&deal)?;
        Ok(AttributionView { breakdown, cached: false })
    }

    /// Always recompute and overwrite the cache.
    pub fn recalculate(&self, deal_id: &str) -> AttributionResult<AttributionBreakdown> {
        let deal = self.require_deal(deal_id)?;
        self.compute_and_save(&deal)
    }

    /// Compute under `model` instead of the deal's own model.
    /// The cache is not touched.
    pub fn preview(
        &self,
        deal_id: &str,
        model: AttributionModel,
    ) -> AttributionResult<AttributionBreakdown> {
        let deal = self.require_deal(deal_id)?;
        let context = DealContext { model, ..deal.context() };
        let touchpoints = self.store.touchpoints_for_deal(deal_id)?;
        self.engine.compute_attribution(&context, &touchpoints, Utc::now())
    }

    fn require_deal(&self, deal_id: &str) -> AttributionResult<Deal> {
        self.store
            .get_deal(deal_id)?
            .ok_or_else(|| AttributionError::DealNotFound { deal_id: deal_id.to_string() })
    }

    fn compute_and_save(&self, deal: &Deal) -> AttributionResult<AttributionBreakdown> {
        let touchpoints = self.store.touchpoints_for_deal(&deal.deal_id)?;
        let breakdown = self
            .engine
            .compute_attribution(&deal.context(), &touchpoints, Utc::now())?;
        log::info!(
            "deal={} recomputed under {}: {} touchpoints, {} partners",
            deal.deal_id,
            breakdown.model,
            touchpoints.len(),
            breakdown.attributions.len()
        );
        self.store.save_attribution_results(&breakdown)?;
        Ok(breakdown)
    }
}
