//! Two-tier lookup of referenced curated rows.
//!
//! Tier one matches the target's upstream id. Tier two, tried only when the
//! payload carries no upstream id, matches the target's fallback column
//! (names of venues, songs and people). An id that misses is unresolved, it
//! never falls through to a name. Resolution never creates rows.

use crate::curated_store::CuratedStore;
use crate::entities::spec_for;
use crate::mapping::{first_text, first_value, ReferenceSpec};
use anyhow::Result;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Resolved(i64),
    /// The payload names a target that isn't in the curated layer.
    Unresolved,
    /// The payload carries nothing to resolve.
    Absent,
}

pub struct EntityResolver {
    store: Arc<dyn CuratedStore>,
}

impl EntityResolver {
    pub fn new(store: Arc<dyn CuratedStore>) -> Self {
        Self { store }
    }

    pub fn resolve(&self, reference: &ReferenceSpec, payload: &Map<String, Value>) -> Result<Resolution> {
        if let Some(external_id) = first_text(payload, reference.id_keys) {
            return match self.store.find_by_external_id(reference.target, &external_id)? {
                Some(id) => Ok(Resolution::Resolved(id)),
                None => {
                    debug!("Unresolved {} reference to id {:?}", reference.target, external_id);
                    Ok(Resolution::Unresolved)
                }
            };
        }

        let fallback = match spec_for(reference.target).fallback {
            Some(fallback) => fallback,
            None => return Ok(Resolution::Absent),
        };
        let value = match first_value(payload, reference.fallback_keys)
            .map(|raw| fallback.coercion.apply(raw))
            .filter(|value| !value.is_null())
        {
            Some(value) => value,
            None => return Ok(Resolution::Absent),
        };
        match self.store.find_by_fallback(reference.target, &fallback, &value)? {
            Some(id) => {
                debug!(
                    "Resolved {} via {} fallback {:?}",
                    reference.target, fallback.column, value
                );
                Ok(Resolution::Resolved(id))
            }
            None => {
                debug!("Unresolved {} reference by {:?}", reference.target, value);
                Ok(Resolution::Unresolved)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coerce::FieldValue;
    use crate::curated_store::test_support::seed;
    use crate::curated_store::{MockCuratedStore, SqliteCuratedStore};
    use crate::entity_kind::EntityKind;
    use serde_json::json;

    const SHOW_REF: ReferenceSpec = ReferenceSpec {
        column: "show_id",
        target: EntityKind::Show,
        id_keys: &["showid"],
        fallback_keys: &[],
        required: true,
    };

    const VENUE_REF: ReferenceSpec = ReferenceSpec {
        column: "venue_id",
        target: EntityKind::Venue,
        id_keys: &["venueid"],
        fallback_keys: &["venue"],
        required: false,
    };

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn external_id_wins_over_fallback() {
        let store = Arc::new(SqliteCuratedStore::in_memory().unwrap());
        let by_id = seed(&store, EntityKind::Venue, "77", &[("name", "Alpine Valley".into())]);
        seed(&store, EntityKind::Venue, "78", &[("name", "The Gorge".into())]);

        let resolver = EntityResolver::new(store);
        let payload = object(json!({ "venueid": 77, "venue": "The Gorge" }));
        assert_eq!(
            resolver.resolve(&VENUE_REF, &payload).unwrap(),
            Resolution::Resolved(by_id)
        );
    }

    #[test]
    fn falls_back_to_case_insensitive_name() {
        let store = Arc::new(SqliteCuratedStore::in_memory().unwrap());
        let gorge = seed(&store, EntityKind::Venue, "78", &[("name", "The Gorge".into())]);

        let resolver = EntityResolver::new(store);
        let payload = object(json!({ "venue": "the GORGE" }));
        assert_eq!(
            resolver.resolve(&VENUE_REF, &payload).unwrap(),
            Resolution::Resolved(gorge)
        );
    }

    #[test]
    fn dangling_id_does_not_fall_back_to_name() {
        let store = Arc::new(SqliteCuratedStore::in_memory().unwrap());
        seed(&store, EntityKind::Venue, "78", &[("name", "The Gorge".into())]);

        let resolver = EntityResolver::new(store);
        let payload = object(json!({ "venueid": "9999", "venue": "The Gorge" }));
        assert_eq!(
            resolver.resolve(&VENUE_REF, &payload).unwrap(),
            Resolution::Unresolved
        );
    }

    #[test]
    fn shows_never_resolve_by_date() {
        let mut mock = MockCuratedStore::new();
        mock.expect_find_by_external_id()
            .returning(|_, _| Ok(None));
        mock.expect_find_by_fallback().never();

        let resolver = EntityResolver::new(Arc::new(mock));
        let dangling = object(json!({ "showid": "9999", "showdate": "1997-11-17" }));
        assert_eq!(
            resolver.resolve(&SHOW_REF, &dangling).unwrap(),
            Resolution::Unresolved
        );
        let date_only = object(json!({ "showdate": "1997-11-17" }));
        assert_eq!(
            resolver.resolve(&SHOW_REF, &date_only).unwrap(),
            Resolution::Absent
        );
    }

    #[test]
    fn absent_versus_unresolved() {
        let store = Arc::new(SqliteCuratedStore::in_memory().unwrap());
        let resolver = EntityResolver::new(store.clone());

        let empty = object(json!({ "venueid": "", "venue": null }));
        assert_eq!(resolver.resolve(&VENUE_REF, &empty).unwrap(), Resolution::Absent);

        let dangling = object(json!({ "venueid": "404" }));
        assert_eq!(
            resolver.resolve(&VENUE_REF, &dangling).unwrap(),
            Resolution::Unresolved
        );
        assert_eq!(store.count_rows(EntityKind::Venue).unwrap(), 0);
    }

    #[test]
    fn fallback_is_skipped_when_id_matches() {
        let mut mock = MockCuratedStore::new();
        mock.expect_find_by_external_id()
            .withf(|kind, id| *kind == EntityKind::Show && id == "1252")
            .times(1)
            .returning(|_, _| Ok(Some(5)));
        mock.expect_find_by_fallback().never();

        let resolver = EntityResolver::new(Arc::new(mock));
        let payload = object(json!({ "showid": "1252", "showdate": "2024-08-04" }));
        assert_eq!(
            resolver.resolve(&SHOW_REF, &payload).unwrap(),
            Resolution::Resolved(5)
        );
    }

    #[test]
    fn store_errors_propagate() {
        let mut mock = MockCuratedStore::new();
        mock.expect_find_by_external_id()
            .returning(|_, _| Err(anyhow::anyhow!("database is locked")));

        let resolver = EntityResolver::new(Arc::new(mock));
        let payload = object(json!({ "showid": "1" }));
        assert!(resolver.resolve(&SHOW_REF, &payload).is_err());
    }

    #[test]
    fn fallback_value_uses_target_coercion() {
        let mut mock = MockCuratedStore::new();
        mock.expect_find_by_external_id().never();
        mock.expect_find_by_fallback()
            .withf(|kind, fallback, value| {
                *kind == EntityKind::Venue
                    && fallback.column == "name"
                    && *value == FieldValue::Text("Red Rocks".into())
            })
            .returning(|_, _, _| Ok(None));

        let resolver = EntityResolver::new(Arc::new(mock));
        let payload = object(json!({ "venue": "  Red Rocks " }));
        assert_eq!(
            resolver.resolve(&VENUE_REF, &payload).unwrap(),
            Resolution::Unresolved
        );
    }
}
