use super::{person_ref, show_ref};
use crate::coerce::Coercion;
use crate::entity_kind::EntityKind;
use crate::mapping::{EntitySpec, FieldSpec, Identity};

pub static SPEC: EntitySpec = EntitySpec {
    kind: EntityKind::Appearance,
    table: "appearances",
    description: "A person appearing at a show",
    identity: Identity::ExternalIdOrNaturalKey {
        keys: &["appearanceid", "appearance_id"],
        columns: &["person_id", "show_id"],
    },
    fields: &[
        FieldSpec {
            column: "role",
            keys: &["role"],
            coercion: Coercion::Text,
        },
        FieldSpec {
            column: "instrument",
            keys: &["instrument", "instruments"],
            coercion: Coercion::Text,
        },
    ],
    references: &[person_ref(true), show_ref(true)],
    fallback: None,
    hook: None,
    reconcile_date: None,
};
