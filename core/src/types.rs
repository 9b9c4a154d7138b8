//! Shared primitive types used across the attribution engine.

/// A stable, unique identifier for a partner.
pub type PartnerId = String;

/// The identifier of a closed deal.
pub type DealId = String;

/// Currency units. No multi-currency handling: every amount in a run is
/// denominated in the same currency.
pub type Money = f64;
