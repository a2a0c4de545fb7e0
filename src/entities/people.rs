use crate::coerce::{Coercion, FieldValue};
use crate::entity_kind::EntityKind;
use crate::mapping::{
    first_text, CuratedRecord, EntitySpec, FallbackSpec, FieldSpec, Identity,
};
use crate::transform::TransformError;
use serde_json::{Map, Value};

pub static SPEC: EntitySpec = EntitySpec {
    kind: EntityKind::Person,
    table: "people",
    description: "Band members, guests and crew",
    identity: Identity::ExternalId {
        keys: &["personid", "person_id"],
    },
    fields: &[
        FieldSpec {
            column: "name",
            keys: &["name", "person", "fullname"],
            coercion: Coercion::Text,
        },
        FieldSpec {
            column: "role",
            keys: &["role", "type"],
            coercion: Coercion::Text,
        },
        FieldSpec {
            column: "instrument",
            keys: &["instrument", "instruments"],
            coercion: Coercion::Text,
        },
    ],
    references: &[],
    fallback: Some(FallbackSpec {
        column: "name",
        coercion: Coercion::Text,
    }),
    hook: Some(compose_name),
    reconcile_date: None,
};

/// Builds `name` from first/last name parts when no full name is given.
fn compose_name(payload: &Map<String, Value>, record: &mut CuratedRecord) -> Result<(), TransformError> {
    if !record.get("name").is_null() {
        return Ok(());
    }
    let parts: Vec<String> = [
        first_text(payload, &["first_name", "firstname"]),
        first_text(payload, &["last_name", "lastname"]),
    ]
    .into_iter()
    .flatten()
    .collect();
    if !parts.is_empty() {
        record.set("name", FieldValue::Text(parts.join(" ")));
    }
    Ok(())
}
