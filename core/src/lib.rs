//! Partner attribution: splits credit for a closed deal among the partners
//! whose touchpoints contributed to it, and caches the split per deal.

pub mod breakdown;
pub mod config;
pub mod demo;
pub mod engine;
pub mod error;
pub mod model;
pub mod rng;
pub mod service;
pub mod store;
pub mod touchpoint;
pub mod types;

pub use breakdown::{AttributionBreakdown, DealContext, PartnerAttribution};
pub use config::{AttributionConfig, RoleWeights};
pub use engine::AttributionEngine;
pub use error::{AttributionError, AttributionResult};
pub use model::{AttributionModel, TouchpointRole};
pub use service::{AttributionService, AttributionView};
pub use store::AttributionStore;
pub use touchpoint::Touchpoint;
