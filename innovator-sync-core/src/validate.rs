//! Static allow-lists for payloads sent to Innovator.

use serde_json::{Map, Value};

use crate::error::ValidationError;

/// Expected JSON type for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Flag,
    Any,
}

impl FieldKind {
    fn accepts(self, value: &Value) -> bool {
        match self {
            FieldKind::Text => value.is_string(),
            FieldKind::Flag => value.is_boolean(),
            FieldKind::Any => true,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            FieldKind::Text => "a string",
            FieldKind::Flag => "a boolean",
            FieldKind::Any => "any value",
        }
    }
}

/// The fields an entity accepts, with their kinds.
#[derive(Debug, Clone, Copy)]
pub struct FieldSchema {
    pub entity: &'static str,
    pub fields: &'static [(&'static str, FieldKind)],
}

impl FieldSchema {
    pub fn names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|(name, _)| *name).collect()
    }

    fn kind_of(&self, field: &str) -> Option<FieldKind> {
        self.fields
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, kind)| *kind)
    }
}

pub const PART_CREATE: FieldSchema = FieldSchema {
    entity: "Part",
    fields: &[
        ("classification", FieldKind::Any),
        ("created_on", FieldKind::Any),
        ("description", FieldKind::Any),
        ("external_owner", FieldKind::Any),
        ("generation", FieldKind::Any),
        ("keyed_name", FieldKind::Any),
        ("name", FieldKind::Any),
        ("state", FieldKind::Any),
        ("unit", FieldKind::Any),
        ("item_number", FieldKind::Any),
        ("itemtype", FieldKind::Any),
        ("quantity", FieldKind::Any),
        ("related_id", FieldKind::Any),
    ],
};

/// Same as [`PART_CREATE`] minus `related_id`: relationships are not edited in place.
pub const PART_UPDATE: FieldSchema = FieldSchema {
    entity: "Part",
    fields: &[
        ("classification", FieldKind::Any),
        ("created_on", FieldKind::Any),
        ("description", FieldKind::Any),
        ("external_owner", FieldKind::Any),
        ("generation", FieldKind::Any),
        ("keyed_name", FieldKind::Any),
        ("name", FieldKind::Any),
        ("state", FieldKind::Any),
        ("unit", FieldKind::Any),
        ("item_number", FieldKind::Any),
        ("itemtype", FieldKind::Any),
        ("quantity", FieldKind::Any),
    ],
};

pub const AW_PARAMETER: FieldSchema = FieldSchema {
    entity: "Airworthiness Parameter",
    fields: &[
        ("parameter_number", FieldKind::Text),
        ("certification_criteria", FieldKind::Text),
        ("method_of_compliance", FieldKind::Text),
        ("standard", FieldKind::Text),
    ],
};

pub const AW_ASSESSMENT: FieldSchema = FieldSchema {
    entity: "Airworthiness Para Assessment",
    fields: &[
        ("aw_para", FieldKind::Text),
        ("na_rationale", FieldKind::Text),
        ("non_compliance_rationale", FieldKind::Text),
        ("oem", FieldKind::Text),
        ("oem_expected_compliance", FieldKind::Text),
        ("oem_method_of_compliance", FieldKind::Text),
        ("oem_responsible_engineer", FieldKind::Text),
        ("oem_standard", FieldKind::Text),
        ("friendly_name", FieldKind::Text),
        ("compliance", FieldKind::Flag),
    ],
};

/// Rejects unknown keys and values of the wrong JSON type.
pub fn validate_payload(
    schema: &FieldSchema,
    payload: &Map<String, Value>,
) -> Result<(), ValidationError> {
    for (field, value) in payload {
        let kind = schema
            .kind_of(field)
            .ok_or_else(|| ValidationError::UnknownField {
                entity: schema.entity,
                field: field.clone(),
                allowed: schema.names(),
            })?;
        if !kind.accepts(value) {
            return Err(ValidationError::WrongType {
                entity: schema.entity,
                field: field.clone(),
                expected: kind.describe(),
            });
        }
    }
    Ok(())
}
