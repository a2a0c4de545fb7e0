use super::venue_ref;
use crate::coerce::Coercion;
use crate::entity_kind::EntityKind;
use crate::mapping::{EntitySpec, FieldSpec, Identity, ReconcileDate};

// show_year and show_month are generated from show_date by the table itself.
pub static SPEC: EntitySpec = EntitySpec {
    kind: EntityKind::Show,
    table: "shows",
    description: "Shows, linked to their venue when it is known",
    identity: Identity::ExternalId {
        keys: &["showid", "show_id"],
    },
    fields: &[
        FieldSpec {
            column: "show_date",
            keys: &["showdate", "show_date"],
            coercion: Coercion::Date,
        },
        FieldSpec {
            column: "permalink",
            keys: &["permalink"],
            coercion: Coercion::Text,
        },
        FieldSpec {
            column: "tour",
            keys: &["tourname", "tour_name", "tour"],
            coercion: Coercion::Text,
        },
        FieldSpec {
            column: "artist",
            keys: &["artist_name", "artist"],
            coercion: Coercion::Text,
        },
        FieldSpec {
            column: "notes",
            keys: &["setlistnotes", "setlist_notes", "notes"],
            coercion: Coercion::Text,
        },
        FieldSpec {
            column: "exclude_from_stats",
            keys: &["exclude_from_stats", "exclude"],
            coercion: Coercion::Bool,
        },
    ],
    references: &[venue_ref(false)],
    // Several shows can share a date, so shows resolve by id only.
    fallback: None,
    hook: None,
    reconcile_date: Some(ReconcileDate {
        raw_key: "showdate",
        column: "show_date",
    }),
};
