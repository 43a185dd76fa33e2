//! Record lifecycle and cross-record references.

use std::sync::Arc;
use uuid::Uuid;

use crate::caller::Caller;
use crate::db::tables::ValueVisibility;
use crate::db::Database;
use crate::error::ApiError;
use crate::links::extract_references;
use crate::models::{Record, RecordRef, RecordRequest};

#[derive(Clone)]
pub struct RecordStore {
    db: Arc<Database>,
}

impl RecordStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn create(&self, caller: &Caller, req: RecordRequest) -> Result<Record, ApiError> {
        let req = req.validate().map_err(ApiError::Validation)?;
        let record = self.db.create_record(caller, req)?;
        log::info!("[RECORDS] Created record {} '{}'", record.id, record.name);
        Ok(record)
    }

    pub fn update(&self, caller: &Caller, id: Uuid, req: RecordRequest) -> Result<Record, ApiError> {
        let req = req.validate().map_err(ApiError::Validation)?;
        self.db
            .update_record(caller.organization_id, id, req)?
            .ok_or(ApiError::NotFound("Object"))
    }

    pub fn delete(&self, caller: &Caller, id: Uuid) -> Result<(), ApiError> {
        if !self.db.soft_delete_record(caller.organization_id, id)? {
            return Err(ApiError::NotFound("Object"));
        }
        log::info!("[RECORDS] Deleted record {}", id);
        Ok(())
    }

    /// Live records referenced from the caller-visible typed values of `id`,
    /// sorted by name. The record itself is never listed.
    pub fn references(&self, caller: &Caller, id: Uuid) -> Result<Vec<RecordRef>, ApiError> {
        if self.db.get_record(caller.organization_id, id)?.is_none() {
            return Err(ApiError::NotFound("Object"));
        }

        let values = self
            .db
            .typed_values_for_record(id, ValueVisibility::Caller(caller))?;
        let mut ids = extract_references(values.iter().map(|v| &v.value.payload));
        ids.remove(&id);

        let ids: Vec<Uuid> = ids.into_iter().collect();
        let mut refs: Vec<RecordRef> = self
            .db
            .get_records(caller.organization_id, &ids)?
            .into_iter()
            .map(|r| RecordRef { id: r.id, name: r.name })
            .collect();
        refs.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(refs)
    }
}
