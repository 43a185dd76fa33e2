use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Free-text note linked to one or more records
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub creator_id: Uuid,
    pub text: String,
    pub location: String,
    pub happened_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub location: String,
    pub happened_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub record_ids: Vec<Uuid>,
}

impl NoteRequest {
    pub fn validate(mut self) -> Result<Self, String> {
        if self.text.trim().is_empty() {
            return Err("Text is required".to_string());
        }
        self.record_ids.sort();
        self.record_ids.dedup();
        Ok(self)
    }
}
