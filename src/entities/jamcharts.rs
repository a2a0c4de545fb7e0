use super::{show_ref, song_ref};
use crate::coerce::Coercion;
use crate::entity_kind::EntityKind;
use crate::mapping::{EntitySpec, FieldSpec, Identity, ReconcileDate};

pub static SPEC: EntitySpec = EntitySpec {
    kind: EntityKind::JamAnnotation,
    table: "jam_annotations",
    description: "Jam chart annotations on notable performances",
    identity: Identity::ExternalIdOrNaturalKey {
        keys: &["jamchartid", "jamchart_id"],
        columns: &["show_id", "song_id"],
    },
    fields: &[
        FieldSpec {
            column: "description",
            keys: &["jamchart_description", "description", "jamchart"],
            coercion: Coercion::Text,
        },
        FieldSpec {
            column: "is_recommended",
            keys: &["recommended", "is_recommended", "isrecommended"],
            coercion: Coercion::Bool,
        },
        FieldSpec {
            column: "duration_secs",
            keys: &["tracktime", "duration"],
            coercion: Coercion::DurationSecs,
        },
        FieldSpec {
            column: "show_date",
            keys: &["showdate", "show_date"],
            coercion: Coercion::Date,
        },
    ],
    references: &[show_ref(true), song_ref(true)],
    fallback: None,
    hook: None,
    reconcile_date: Some(ReconcileDate {
        raw_key: "showdate",
        column: "show_date",
    }),
};
