use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{FieldDef, Note, TypedValue};

/// Schema-agnostic entity that can carry zero or more typed values
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub creator_id: Uuid,
    pub name: String,
    pub description: String,
    pub business_key: String,
    pub aliases: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub business_key: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl RecordRequest {
    pub fn validate(mut self) -> Result<Self, String> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err("Name is required".to_string());
        }
        self.aliases = self
            .aliases
            .into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        Ok(self)
    }
}

/// Minimal pointer to another record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub content: String,
    pub deadline: Option<DateTime<Utc>>,
    pub status: String,
    pub assigned_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepAndFunnel {
    pub id: Uuid,
    pub step_id: Uuid,
    pub step_name: String,
    pub funnel_id: Uuid,
    pub funnel_name: String,
    pub sub_status: i64,
    pub created_at: DateTime<Utc>,
}

/// Typed value joined with the metadata of its object type
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedValueView {
    #[serde(flatten)]
    pub value: TypedValue,
    pub object_type_name: String,
    pub object_type_icon: String,
    pub object_type_fields: Vec<FieldDef>,
}

/// Everything needed to render one record, read in a single unit of work
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDetail {
    #[serde(flatten)]
    pub record: Record,
    pub tags: Vec<Tag>,
    pub type_values: Vec<TypedValueView>,
    pub tasks: Vec<Task>,
    pub steps_and_funnels: Vec<StepAndFunnel>,
    pub notes: Vec<Note>,
}

/// Read-only view of a record for unauthenticated callers
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicRecordDetail {
    #[serde(flatten)]
    pub record: Record,
    pub type_values: Vec<TypedValueView>,
    pub notes: Vec<Note>,
}
