//! Field mappings for every curated entity kind.
//!
//! Each module declares one [`EntitySpec`]: upstream payload keys, their
//! coercions, references to other kinds and an optional row hook. The generic
//! [`crate::transform::EntityTransformer`] does the rest.

mod activity_feed;
mod appearances;
mod jamcharts;
mod links;
mod metadata;
mod people;
mod setlists;
mod shows;
mod songs;
mod uploads;
mod venues;

use crate::entity_kind::EntityKind;
use crate::mapping::{EntitySpec, ReferenceSpec};

pub use songs::slugify;

const fn venue_ref(required: bool) -> ReferenceSpec {
    ReferenceSpec {
        column: "venue_id",
        target: EntityKind::Venue,
        id_keys: &["venueid", "venue_id"],
        fallback_keys: &["venue", "venuename"],
        required,
    }
}

const fn show_ref(required: bool) -> ReferenceSpec {
    ReferenceSpec {
        column: "show_id",
        target: EntityKind::Show,
        id_keys: &["showid", "show_id"],
        fallback_keys: &[],
        required,
    }
}

const fn song_ref(required: bool) -> ReferenceSpec {
    ReferenceSpec {
        column: "song_id",
        target: EntityKind::Song,
        id_keys: &["songid", "song_id"],
        fallback_keys: &["song", "songname"],
        required,
    }
}

const fn person_ref(required: bool) -> ReferenceSpec {
    ReferenceSpec {
        column: "person_id",
        target: EntityKind::Person,
        id_keys: &["personid", "person_id"],
        fallback_keys: &["person", "person_name"],
        required,
    }
}

pub fn spec_for(kind: EntityKind) -> &'static EntitySpec {
    match kind {
        EntityKind::Venue => &venues::SPEC,
        EntityKind::Show => &shows::SPEC,
        EntityKind::Song => &songs::SPEC,
        EntityKind::SetlistEntry => &setlists::SPEC,
        EntityKind::JamAnnotation => &jamcharts::SPEC,
        EntityKind::Person => &people::SPEC,
        EntityKind::Appearance => &appearances::SPEC,
        EntityKind::Link => &links::SPEC,
        EntityKind::Upload => &uploads::SPEC,
        EntityKind::MetadataItem => &metadata::SPEC,
        EntityKind::ActivityFeedItem => &activity_feed::SPEC,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curated_store::CURATED_VERSIONED_SCHEMAS;

    #[test]
    fn every_spec_matches_its_kind() {
        for kind in EntityKind::DEPENDENCY_ORDER {
            assert_eq!(spec_for(kind).kind, kind);
        }
    }

    #[test]
    fn mapped_columns_exist_in_curated_tables() {
        let tables = CURATED_VERSIONED_SCHEMAS.last().unwrap().tables;
        for kind in EntityKind::DEPENDENCY_ORDER {
            let spec = spec_for(kind);
            let table = tables
                .iter()
                .find(|t| t.name == spec.table)
                .unwrap_or_else(|| panic!("no table {}", spec.table));
            let columns: Vec<_> = table.column_names().collect();
            for column in spec.value_columns() {
                assert!(
                    columns.contains(&column),
                    "{} has no column {}",
                    spec.table,
                    column
                );
            }
            if let Some(key) = spec.identity.natural_key() {
                assert!(key.iter().all(|c| spec.declares_column(c)));
                assert!(
                    table.partial_unique_indices.iter().any(|i| i.columns == key),
                    "{} has no unique index over its natural key",
                    spec.table
                );
            }
        }
    }

    #[test]
    fn references_point_at_earlier_kinds() {
        let order = EntityKind::DEPENDENCY_ORDER;
        let pos = |k: EntityKind| order.iter().position(|x| *x == k).unwrap();
        for kind in order {
            for reference in spec_for(kind).references {
                assert!(
                    pos(reference.target) < pos(kind),
                    "{} references {} which runs later",
                    kind,
                    reference.target
                );
                if !reference.fallback_keys.is_empty() {
                    assert!(spec_for(reference.target).fallback.is_some());
                }
            }
        }
    }
}
