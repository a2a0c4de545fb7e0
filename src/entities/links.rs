use super::show_ref;
use crate::coerce::Coercion;
use crate::entity_kind::EntityKind;
use crate::mapping::{CuratedRecord, EntitySpec, FieldSpec, Identity};
use crate::transform::TransformError;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};

lazy_static! {
    static ref HTTP_URL: Regex = Regex::new(r"^(?i)https?://[^\s/$.?#][^\s]*$").unwrap();
}

pub static SPEC: EntitySpec = EntitySpec {
    kind: EntityKind::Link,
    table: "links",
    description: "External links such as reviews, recordings and articles",
    identity: Identity::ExternalId {
        keys: &["linkid", "link_id"],
    },
    fields: &[
        FieldSpec {
            column: "link_type",
            keys: &["type", "link_type"],
            coercion: Coercion::Text,
        },
        FieldSpec {
            column: "url",
            keys: &["url", "link"],
            coercion: Coercion::Text,
        },
        FieldSpec {
            column: "title",
            keys: &["title", "name"],
            coercion: Coercion::Text,
        },
        FieldSpec {
            column: "description",
            keys: &["description", "desc"],
            coercion: Coercion::Text,
        },
    ],
    references: &[show_ref(false)],
    fallback: None,
    hook: Some(require_http_url),
    reconcile_date: None,
};

fn require_http_url(_payload: &Map<String, Value>, record: &mut CuratedRecord) -> Result<(), TransformError> {
    match record.get("url").as_str() {
        Some(url) if HTTP_URL.is_match(url) => Ok(()),
        Some(url) => Err(TransformError::Rejected {
            column: "url",
            reason: format!("not an http(s) URL: {}", url),
        }),
        None => Err(TransformError::Rejected {
            column: "url",
            reason: "missing".to_string(),
        }),
    }
}
