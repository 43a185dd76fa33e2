use serde::Serialize;
use strum::{AsRefStr, EnumString};
use uuid::Uuid;

use super::Record;

/// Text channel that produced a search hit's rank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, AsRefStr, EnumString)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum MatchSource {
    Field,
    Note,
    TypedValue,
}

impl MatchSource {
    /// Tie-break priority for equal ranks: higher wins.
    pub fn priority(&self) -> u8 {
        match self {
            MatchSource::Field => 3,
            MatchSource::Note => 2,
            MatchSource::TypedValue => 1,
        }
    }
}

/// One source's match against one record, as read from the index
#[derive(Debug, Clone)]
pub struct SourceMatch {
    pub record_id: Uuid,
    pub source: MatchSource,
    pub rank: f64,
    pub headline: String,
}

/// Highlighted excerpts, one per source that matched
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Headlines {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typed_value: Option<String>,
}

impl Headlines {
    pub fn set(&mut self, source: MatchSource, headline: String) {
        let slot = match source {
            MatchSource::Field => &mut self.field,
            MatchSource::Note => &mut self.note,
            MatchSource::TypedValue => &mut self.typed_value,
        };
        *slot = Some(headline);
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub record: Record,
    /// Absent when no text query was given
    pub match_source: Option<MatchSource>,
    pub rank: f64,
    pub headlines: Headlines,
}
