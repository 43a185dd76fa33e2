//! Ranked multi-source record search and the record detail read.
//!
//! Each source (record fields, linked notes, typed-value payloads) is matched
//! against its full-text index. A record's rank is its best source rank and
//! that source becomes the reported match source.

use std::sync::Arc;
use uuid::Uuid;

use crate::caller::Caller;
use crate::db::tables::search::fts_query;
use crate::db::Database;
use crate::error::ApiError;
use crate::models::{Headlines, PageParams, Paginated, RecordDetail, SearchHit};

#[derive(Clone)]
pub struct SearchEngine {
    db: Arc<Database>,
}

impl SearchEngine {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Ranked search over the caller's organization. A blank query lists
    /// records newest first with rank 0 and no match source.
    pub fn search(
        &self,
        caller: &Caller,
        query: Option<&str>,
        page: PageParams,
    ) -> Result<Paginated<SearchHit>, ApiError> {
        let Some(fts) = query.and_then(fts_query) else {
            let (records, total) = self.db.recent_records(caller.organization_id, page)?;
            let hits = records
                .into_iter()
                .map(|record| SearchHit {
                    record,
                    match_source: None,
                    rank: 0.0,
                    headlines: Headlines::default(),
                })
                .collect();
            return Ok(Paginated::new(hits, total, page));
        };

        let (hits, total) = self.db.search_records(caller, &fts, page)?;
        Ok(Paginated::new(hits, total, page))
    }

    pub fn detail(&self, caller: &Caller, record_id: Uuid) -> Result<RecordDetail, ApiError> {
        self.db
            .record_detail(caller, record_id)?
            .ok_or(ApiError::NotFound("Object"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caller::Role;
    use crate::db::sqlite::testing::test_db;
    use crate::db::sqlite::timestamp;
    use crate::models::{MatchSource, NoteRequest, ObjectTypeRequest, Record, RecordRequest};
    use crate::services::{AccessControl, SchemaRegistry};
    use chrono::{Duration, Utc};
    use serde_json::json;

    struct Fixture {
        _dir: tempfile::TempDir,
        db: Arc<Database>,
        search: SearchEngine,
        admin: Caller,
    }

    fn fixture() -> Fixture {
        let (dir, db) = test_db();
        let db = Arc::new(db);
        Fixture {
            _dir: dir,
            search: SearchEngine::new(db.clone()),
            db,
            admin: Caller::new(Uuid::new_v4(), Uuid::new_v4(), Role::Admin),
        }
    }

    fn record(f: &Fixture, name: &str, days_ago: i64) -> Record {
        let record = f
            .db
            .create_record(
                &f.admin,
                RecordRequest {
                    name: name.to_string(),
                    ..Default::default()
                },
            )
            .unwrap();
        let created = timestamp(&(Utc::now() - Duration::days(days_ago)));
        f.db.conn()
            .unwrap()
            .execute(
                "UPDATE objects SET created_at = ?1 WHERE id = ?2",
                [created, record.id.to_string()],
            )
            .unwrap();
        record
    }

    #[test]
    fn test_empty_query_is_recency() {
        let f = fixture();
        let old = record(&f, "Old", 3);
        let new = record(&f, "New", 1);
        let mid = record(&f, "Mid", 2);

        for query in [None, Some(""), Some("   ")] {
            let page = f.search.search(&f.admin, query, PageParams::default()).unwrap();
            let order: Vec<Uuid> = page.items.iter().map(|h| h.record.id).collect();
            assert_eq!(order, vec![new.id, mid.id, old.id]);
            assert_eq!(page.total_count, 3);
            assert!(page.items.iter().all(|h| h.rank == 0.0 && h.match_source.is_none()));
        }
    }

    #[test]
    fn test_name_match_reports_field() {
        let f = fixture();
        let alpha = record(&f, "Alpha Partners", 1);
        record(&f, "Beta Holdings", 1);

        let page = f.search.search(&f.admin, Some("alpha"), PageParams::default()).unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.items[0].record.id, alpha.id);
        assert_eq!(page.items[0].match_source, Some(MatchSource::Field));
        assert!(page.items[0].headlines.field.as_deref().unwrap().contains("<b>Alpha</b>"));
    }

    #[test]
    fn test_note_and_payload_sources() {
        let f = fixture();
        let noted = record(&f, "Globex", 1);
        let valued = record(&f, "Initech", 1);

        f.db.create_note(
            &f.admin,
            NoteRequest {
                text: "Renewal negotiation stalled".to_string(),
                record_ids: vec![noted.id],
                ..Default::default()
            },
        )
        .unwrap();

        let company = SchemaRegistry::new(f.db.clone())
            .create(
                &f.admin,
                ObjectTypeRequest {
                    name: "Company".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();
        f.db.insert_typed_value(
            f.admin.organization_id,
            valued.id,
            company.id,
            json!({"revenue": 125000, "segment": "renewables"})
                .as_object()
                .cloned()
                .unwrap(),
        )
        .unwrap();

        let page = f.search.search(&f.admin, Some("negotiation"), PageParams::default()).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].match_source, Some(MatchSource::Note));
        assert!(page.items[0].headlines.note.as_deref().unwrap().contains("<b>"));

        let page = f.search.search(&f.admin, Some("125000"), PageParams::default()).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].record.id, valued.id);
        assert_eq!(page.items[0].match_source, Some(MatchSource::TypedValue));

        // member without a grant cannot reach the payload
        let member = Caller::new(Uuid::new_v4(), f.admin.organization_id, Role::Member);
        let page = f.search.search(&member, Some("125000"), PageParams::default()).unwrap();
        assert!(page.items.is_empty());

        AccessControl::new(f.db.clone())
            .grant(&f.admin, member.creator_id, company.id)
            .unwrap();
        let page = f.search.search(&member, Some("125000"), PageParams::default()).unwrap();
        assert_eq!(page.items.len(), 1);
    }

    #[test]
    fn test_deleted_records_never_match() {
        let f = fixture();
        let gone = record(&f, "Zenith Labs", 1);
        f.db.create_note(
            &f.admin,
            NoteRequest {
                text: "Zenith follow-up".to_string(),
                record_ids: vec![gone.id],
                ..Default::default()
            },
        )
        .unwrap();
        f.db.soft_delete_record(f.admin.organization_id, gone.id).unwrap();

        let page = f.search.search(&f.admin, Some("zenith"), PageParams::default()).unwrap();
        assert_eq!(page.total_count, 0);
        let page = f.search.search(&f.admin, None, PageParams::default()).unwrap();
        assert_eq!(page.total_count, 0);
    }

    #[test]
    fn test_search_pagination() {
        let f = fixture();
        let records: Vec<Record> = (0..5).map(|i| record(&f, &format!("Omega {}", i), i)).collect();

        // same text, same rank: newest first
        let page = f.search.search(&f.admin, Some("omega"), PageParams::new(1, 2)).unwrap();
        let order: Vec<Uuid> = page.items.iter().map(|h| h.record.id).collect();
        assert_eq!(order, vec![records[0].id, records[1].id]);

        let page = f.search.search(&f.admin, Some("omega"), PageParams::new(2, 2)).unwrap();
        assert_eq!(page.total_count, 5);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.page, 2);

        let page = f.search.search(&f.admin, Some("omega"), PageParams::new(3, 2)).unwrap();
        assert_eq!(page.items.len(), 1);
    }

    #[test]
    fn test_detail_unknown_is_not_found() {
        let f = fixture();
        assert!(matches!(
            f.search.detail(&f.admin, Uuid::new_v4()),
            Err(ApiError::NotFound("Object"))
        ));
    }
}
