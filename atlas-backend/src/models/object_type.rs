use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::defaults;

/// Kind of a dynamic field. Used as a UI/validation hint only; payloads are
/// never checked against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKind {
    Text,
    Number,
    Date,
    Boolean,
    Reference,
    MultiReference,
}

impl FieldKind {
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldKind::Number)
    }
}

/// One entry of an object type's field list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
}

/// Tenant-defined schema describing a category of record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectType {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub fields: Vec<FieldDef>,
    pub is_public: bool,
    pub measure_field: Option<String>,
    pub creator_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Body of create and update requests
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectTypeRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub fields: Option<Vec<FieldDef>>,
    pub icon: Option<String>,
    pub is_public: Option<bool>,
    pub measure_field: Option<String>,
}

/// A request with defaults applied, ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectTypeDef {
    pub name: String,
    pub description: String,
    pub icon: String,
    pub fields: Vec<FieldDef>,
    pub is_public: bool,
    pub measure_field: Option<String>,
}

impl ObjectTypeRequest {
    /// Validate and fill defaults. Create and update share these rules.
    pub fn normalize(self) -> Result<ObjectTypeDef, String> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err("Name is required".to_string());
        }

        let icon = self
            .icon
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty())
            .unwrap_or_else(|| defaults::OBJECT_TYPE_ICON.to_string());

        Ok(ObjectTypeDef {
            name,
            description: self.description,
            icon,
            fields: self.fields.unwrap_or_default(),
            is_public: self.is_public.unwrap_or(true),
            measure_field: self
                .measure_field
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty()),
        })
    }
}

impl ObjectTypeDef {
    /// Whether `measure_field` is unset or names a numeric field.
    pub fn measure_field_is_consistent(&self) -> bool {
        match &self.measure_field {
            None => true,
            Some(name) => self
                .fields
                .iter()
                .any(|f| &f.name == name && f.kind.is_numeric()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantAccessRequest {
    pub creator_id: Uuid,
    pub object_type_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let def = ObjectTypeRequest {
            name: "Company".to_string(),
            fields: Some(vec![]),
            ..Default::default()
        }
        .normalize()
        .unwrap();

        assert_eq!(def.icon, "file");
        assert!(def.is_public);
        assert!(def.fields.is_empty());
        assert_eq!(def.measure_field, None);
    }

    #[test]
    fn test_blank_name_rejected() {
        let err = ObjectTypeRequest {
            name: "   ".to_string(),
            ..Default::default()
        }
        .normalize()
        .unwrap_err();
        assert_eq!(err, "Name is required");
    }

    #[test]
    fn test_explicit_values_kept() {
        let def = ObjectTypeRequest {
            name: "Deal".to_string(),
            icon: Some("briefcase".to_string()),
            is_public: Some(false),
            measure_field: Some("".to_string()),
            ..Default::default()
        }
        .normalize()
        .unwrap();

        assert_eq!(def.icon, "briefcase");
        assert!(!def.is_public);
        assert_eq!(def.measure_field, None);
    }

    #[test]
    fn test_field_kind_wire_names() {
        let fields: Vec<FieldDef> = serde_json::from_str(
            r#"[{"name":"amount","kind":"number","required":true},{"name":"owners","kind":"multi-reference"}]"#,
        )
        .unwrap();
        assert_eq!(fields[0].kind, FieldKind::Number);
        assert!(fields[0].required);
        assert_eq!(fields[1].kind, FieldKind::MultiReference);
        assert!(!fields[1].required);
        assert_eq!(serde_json::to_value(FieldKind::MultiReference).unwrap(), "multi-reference");
    }

    #[test]
    fn test_unknown_field_kind_is_malformed() {
        let parsed: Result<Vec<FieldDef>, _> =
            serde_json::from_str(r#"[{"name":"x","kind":"currency"}]"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_measure_field_consistency() {
        let mut def = ObjectTypeRequest {
            name: "Deal".to_string(),
            fields: Some(vec![
                FieldDef { name: "amount".to_string(), kind: FieldKind::Number, required: false },
                FieldDef { name: "stage".to_string(), kind: FieldKind::Text, required: false },
            ]),
            measure_field: Some("amount".to_string()),
            ..Default::default()
        }
        .normalize()
        .unwrap();
        assert!(def.measure_field_is_consistent());

        def.measure_field = Some("stage".to_string());
        assert!(!def.measure_field_is_consistent());

        def.measure_field = Some("missing".to_string());
        assert!(!def.measure_field_is_consistent());
    }
}
