//! Attribution models and touchpoint roles.
//!
//! RULE: The five models are fixed. A model name that does not map to a
//! variant here is a configuration bug and fails with `UnknownModel`.

use crate::error::{AttributionError, AttributionResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum AttributionModel {
    Equal,
    RoleBased,
    FirstTouch,
    LastTouch,
    TimeDecay,
}

impl AttributionModel {
    pub const ALL: [AttributionModel; 5] = [
        Self::Equal,
        Self::RoleBased,
        Self::FirstTouch,
        Self::LastTouch,
        Self::TimeDecay,
    ];

    /// Stable name, as stored in the `deal.attribution_model` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equal      => "equal",
            Self::RoleBased  => "role-based",
            Self::FirstTouch => "first-touch",
            Self::LastTouch  => "last-touch",
            Self::TimeDecay  => "time-decay",
        }
    }
}

impl FromStr for AttributionModel {
    type Err = AttributionError;

    fn from_str(s: &str) -> AttributionResult<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| AttributionError::UnknownModel { model: s.to_string() })
    }
}

impl fmt::Display for AttributionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The part a partner played in a touchpoint.
///
/// Tags outside the closed set deserialize to `Unrecognized`, which keeps
/// the raw tag for reporting and is weighted like `Other`. A missing or
/// null tag is `Other`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(from = "Option<String>", into = "String")]
pub enum TouchpointRole {
    Referral,
    Demo,
    Intro,
    Support,
    Closer,
    #[default]
    Other,
    Unrecognized(String),
}

impl TouchpointRole {
    /// The tag as stored and reported; the raw tag for `Unrecognized`.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Referral        => "referral",
            Self::Demo            => "demo",
            Self::Intro           => "intro",
            Self::Support         => "support",
            Self::Closer          => "closer",
            Self::Other           => "other",
            Self::Unrecognized(t) => t.as_str(),
        }
    }

    /// Lenient parse: anything outside the closed set is kept verbatim.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "referral" => Self::Referral,
            "demo"     => Self::Demo,
            "intro"    => Self::Intro,
            "support"  => Self::Support,
            "closer"   => Self::Closer,
            "other"    => Self::Other,
            unknown    => Self::Unrecognized(unknown.to_string()),
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl From<Option<String>> for TouchpointRole {
    fn from(tag: Option<String>) -> Self {
        let Some(tag) = tag else {
            return Self::Other;
        };
        let role = Self::from_tag(&tag);
        if !role.is_recognized() {
            log::warn!("unrecognized touchpoint role '{tag}', weighting as 'other'");
        }
        role
    }
}

impl From<TouchpointRole> for String {
    fn from(role: TouchpointRole) -> Self {
        match role {
            TouchpointRole::Unrecognized(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for TouchpointRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_names_round_trip_through_from_str() {
        for model in AttributionModel::ALL {
            assert_eq!(model.as_str().parse::<AttributionModel>().unwrap(), model);
        }
    }

    #[test]
    fn unknown_model_is_rejected() {
        let err = "linear".parse::<AttributionModel>().unwrap_err();
        assert!(
            matches!(err, AttributionError::UnknownModel { ref model } if model == "linear"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn model_serializes_as_kebab_case() {
        let json = serde_json::to_string(&AttributionModel::TimeDecay).unwrap();
        assert_eq!(json, "\"time-decay\"");
    }

    /// An unknown tag is kept verbatim and serializes back unchanged.
    #[test]
    fn unknown_role_tag_keeps_its_text() {
        let role: TouchpointRole = serde_json::from_str("\"webinar\"").unwrap();
        assert_eq!(role, TouchpointRole::Unrecognized("webinar".into()));
        assert_eq!(role.as_str(), "webinar");
        assert_eq!(serde_json::to_string(&role).unwrap(), "\"webinar\"");

        let role: TouchpointRole = serde_json::from_str("\"closer\"").unwrap();
        assert_eq!(role, TouchpointRole::Closer);
    }

    /// A null tag is the same as a missing one: `Other`.
    #[test]
    fn null_role_tag_is_other() {
        let role: TouchpointRole = serde_json::from_str("null").unwrap();
        assert_eq!(role, TouchpointRole::Other);
    }
}
