//! Attribution service tests.
//!
//! Tests cover: cache-or-compute, forced recalculation, previews that
//! leave the cache alone, and the failure modes surfaced to callers.

use attribution_core::{
    store::{AttributionStore, NewDeal, NewPartner, NewTouchpoint},
    touchpoint::parse_timestamp,
    AttributionConfig, AttributionError, AttributionModel, AttributionService, TouchpointRole,
};

fn build_service() -> AttributionService {
    let _ = env_logger::builder().is_test(true).try_init();
    let store = AttributionStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    for (id, name) in [("p1", "Alice"), ("p2", "Bob"), ("p3", "Charlie")] {
        store
            .insert_partner(&NewPartner {
                partner_id: Some(id.into()),
                name: name.into(),
                email: format!("{}@test.example", name.to_lowercase()),
                payout_details: Some(serde_json::json!({ "iban": "XX00" })),
            })
            .expect("insert partner");
    }
    AttributionService::new(store, AttributionConfig::default())
}

fn add_deal(service: &AttributionService, deal_id: &str, amount: f64, model: AttributionModel) {
    service
        .store()
        .insert_deal(&NewDeal {
            deal_id: Some(deal_id.into()),
            amount,
            closed_date: None,
            attribution_model: model,
        })
        .expect("insert deal");
}

fn touch(service: &AttributionService, deal_id: &str, partner: &str, ts: &str, role: TouchpointRole) {
    service
        .store()
        .insert_touchpoint(&NewTouchpoint {
            partner_id: partner.into(),
            deal_id: deal_id.into(),
            timestamp: Some(parse_timestamp(ts).unwrap()),
            touchpoint_type: role,
            metadata: None,
        })
        .expect("insert touchpoint");
}

fn seed_role_deal(service: &AttributionService) {
    add_deal(service, "deal-rb", 10_000.0, AttributionModel::RoleBased);
    touch(service, "deal-rb", "p1", "2024-05-01T10:00:00Z", TouchpointRole::Referral);
    touch(service, "deal-rb", "p2", "2024-05-02T10:00:00Z", TouchpointRole::Demo);
    touch(service, "deal-rb", "p3", "2024-05-03T10:00:00Z", TouchpointRole::Closer);
}

/// The first lookup computes and caches; the second is served from the cache unchanged.
#[test]
fn first_lookup_computes_then_serves_cache() {
    let service = build_service();
    seed_role_deal(&service);

    let fresh = service.attribution_for_deal("deal-rb", false).unwrap();
    assert!(!fresh.cached);
    assert_eq!(fresh.breakdown.model, AttributionModel::RoleBased);
    assert_eq!(fresh.breakdown.attributions.len(), 3);

    let cached = service.attribution_for_deal("deal-rb", false).unwrap();
    assert!(cached.cached);
    assert_eq!(cached.breakdown.total_amount, 10_000.0);
    assert_eq!(cached.breakdown.attributions, fresh.breakdown.attributions);
}

/// A touchpoint recorded after caching only shows once recalculation is requested.
#[test]
fn recalculate_flag_bypasses_cache() {
    let service = build_service();
    seed_role_deal(&service);
    service.attribution_for_deal("deal-rb", false).unwrap();

    // A late touchpoint only shows up once the deal is recomputed.
    touch(&service, "deal-rb", "p1", "2024-05-04T10:00:00Z", TouchpointRole::Closer);

    let stale = service.attribution_for_deal("deal-rb", false).unwrap();
    assert!(stale.cached);
    assert_eq!(stale.breakdown.for_partner("p1").unwrap().touchpoints, 1);

    let fresh = service.attribution_for_deal("deal-rb", true).unwrap();
    assert!(!fresh.cached);
    assert_eq!(fresh.breakdown.for_partner("p1").unwrap().touchpoints, 2);

    let after = service.attribution_for_deal("deal-rb", false).unwrap();
    assert!(after.cached);
    assert_eq!(after.breakdown.for_partner("p1").unwrap().touchpoints, 2);
}

/// Recalculating twice leaves exactly one row per partner.
#[test]
fn recalculate_overwrites_cache_rows() {
    let service = build_service();
    seed_role_deal(&service);

    let first = service.recalculate("deal-rb").unwrap();
    let second = service.recalculate("deal-rb").unwrap();
    assert_eq!(first.attributions, second.attributions);
    assert_eq!(service.store().attribution_row_count("deal-rb").unwrap(), 3);
}

/// Previewing last-touch credits the closer and writes nothing to the cache.
#[test]
fn preview_uses_other_model_without_touching_cache() {
    let service = build_service();
    seed_role_deal(&service);

    let preview = service.preview("deal-rb", AttributionModel::LastTouch).unwrap();
    assert_eq!(preview.model, AttributionModel::LastTouch);
    assert_eq!(preview.attributions.len(), 1);
    assert_eq!(preview.attributions[0].partner_id, "p3");
    assert_eq!(service.store().attribution_row_count("deal-rb").unwrap(), 0);
}

/// A deal with no touchpoints attributes to an empty breakdown and caches nothing.
#[test]
fn deal_without_touchpoints_is_not_an_error() {
    let service = build_service();
    add_deal(&service, "deal-empty", 5_000.0, AttributionModel::Equal);

    let view = service.attribution_for_deal("deal-empty", false).unwrap();
    assert!(!view.cached);
    assert!(view.breakdown.is_empty());
    assert_eq!(service.store().attribution_row_count("deal-empty").unwrap(), 0);
}

/// Looking up an unknown deal fails with DealNotFound.
#[test]
fn missing_deal_is_reported() {
    let service = build_service();
    let err = service.attribution_for_deal("nope", false).unwrap_err();
    assert!(
        matches!(err, AttributionError::DealNotFound { ref deal_id } if deal_id == "nope"),
        "got {err}"
    );
}

/// A deal with a zero amount is refused before it reaches the database.
#[test]
fn non_positive_deal_amount_is_rejected_on_insert() {
    let service = build_service();
    let err = service
        .store()
        .insert_deal(&NewDeal {
            deal_id: Some("deal-zero".into()),
            amount: 0.0,
            closed_date: None,
            attribution_model: AttributionModel::Equal,
        })
        .unwrap_err();
    assert!(matches!(err, AttributionError::InvalidAmount { .. }), "got {err}");
}

/// The view serializes the breakdown fields at the top level beside `cached`.
#[test]
fn view_serializes_flat_with_cached_flag() {
    let service = build_service();
    seed_role_deal(&service);

    let view = service.attribution_for_deal("deal-rb", false).unwrap();
    let json = serde_json::to_value(&view).unwrap();
    assert_eq!(json["deal_id"], "deal-rb");
    assert_eq!(json["model"], "role-based");
    assert_eq!(json["cached"], false);
    assert_eq!(json["attributions"][0]["partner_id"], "p3");
    assert_eq!(json["attributions"][0]["role"], "closer");
}
