use super::{show_ref, song_ref};
use crate::coerce::{Coercion, FieldValue};
use crate::entity_kind::EntityKind;
use crate::mapping::{CuratedRecord, EntitySpec, FieldSpec, Identity};
use crate::transform::TransformError;
use serde_json::{Map, Value};

pub static SPEC: EntitySpec = EntitySpec {
    kind: EntityKind::MetadataItem,
    table: "metadata_items",
    description: "Free-form key/value facts about songs",
    identity: Identity::ExternalIdOrNaturalKey {
        keys: &["metadataid", "metadata_id"],
        columns: &["song_id", "meta_key"],
    },
    fields: &[
        FieldSpec {
            column: "meta_key",
            keys: &["key", "meta_key", "field"],
            coercion: Coercion::Text,
        },
        FieldSpec {
            column: "meta_value",
            keys: &["value", "meta_value"],
            coercion: Coercion::Json,
        },
        FieldSpec {
            column: "source",
            keys: &["source"],
            coercion: Coercion::Text,
        },
    ],
    references: &[song_ref(true), show_ref(false)],
    fallback: None,
    hook: Some(flatten_value),
    reconcile_date: None,
};

/// Stores scalar strings as-is and everything else as compact JSON text.
fn flatten_value(_payload: &Map<String, Value>, record: &mut CuratedRecord) -> Result<(), TransformError> {
    let flattened = match record.get("meta_value") {
        FieldValue::Json(Value::String(s)) => FieldValue::Text(s.trim().to_string()),
        FieldValue::Json(other) => FieldValue::Text(other.to_string()),
        _ => return Ok(()),
    };
    record.set("meta_value", flattened);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn flatten(value: Value) -> FieldValue {
        let mut record = CuratedRecord::new(EntityKind::MetadataItem, 1, 1);
        record.set("meta_value", Coercion::Json.apply(&value));
        flatten_value(&Map::new(), &mut record).unwrap();
        record.get("meta_value").clone()
    }

    #[test]
    fn strings_stay_plain() {
        assert_eq!(flatten(json!(" Trey ")), FieldValue::Text("Trey".into()));
    }

    #[test]
    fn structured_values_become_json_text() {
        assert_eq!(flatten(json!(["a", 1])), FieldValue::Text("[\"a\",1]".into()));
        assert_eq!(flatten(json!(7)), FieldValue::Text("7".into()));
    }
}
