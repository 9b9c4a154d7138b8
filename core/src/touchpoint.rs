//! Touchpoints: the engine's only input besides the deal itself.
//!
//! Touchpoints are owned by the event log and never mutated here.

use crate::{
    error::{AttributionError, AttributionResult},
    model::TouchpointRole,
    types::{DealId, PartnerId},
};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Touchpoint {
    pub partner_id:   PartnerId,
    pub partner_name: String,
    /// May be omitted when the deal is implied by the caller.
    #[serde(default)]
    pub deal_id:      DealId,
    pub timestamp:    DateTime<Utc>,
    #[serde(rename = "touchpoint_type", default)]
    pub role:         TouchpointRole,
    /// Opaque to the engine.
    #[serde(default)]
    pub metadata:     serde_json::Value,
}

impl Touchpoint {
    pub fn new(
        partner_id: impl Into<PartnerId>,
        partner_name: impl Into<String>,
        deal_id: impl Into<DealId>,
        timestamp: DateTime<Utc>,
        role: TouchpointRole,
    ) -> Self {
        Self {
            partner_id: partner_id.into(),
            partner_name: partner_name.into(),
            deal_id: deal_id.into(),
            timestamp,
            role,
            metadata: serde_json::Value::Object(Default::default()),
        }
    }
}

/// Stable sort by timestamp. Equal timestamps keep their input order,
/// which is the store's insertion order.
pub fn sort_chronologically(touchpoints: &mut [Touchpoint]) {
    touchpoints.sort_by_key(|t| t.timestamp);
}

/// Parse an ISO-8601 / RFC 3339 timestamp into UTC.
pub fn parse_timestamp(value: &str) -> AttributionResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| AttributionError::InvalidTimestamp { value: value.to_string() })
}

/// Drop sub-millisecond precision, matching what `format_timestamp` keeps.
pub fn truncate_to_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(3)
}

/// Canonical text form used in the database: fixed-width millisecond
/// precision in UTC, so lexical order matches chronological order.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
