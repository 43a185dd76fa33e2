use std::sync::Arc;
use uuid::Uuid;

use crate::caller::Caller;
use crate::db::Database;
use crate::error::ApiError;
use crate::models::{Note, NoteRequest};

#[derive(Clone)]
pub struct NoteStore {
    db: Arc<Database>,
}

impl NoteStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Every linked record must be a live record of the caller's organization.
    pub fn create(&self, caller: &Caller, req: NoteRequest) -> Result<Note, ApiError> {
        let req = req.validate().map_err(ApiError::Validation)?;
        let linked = req.record_ids.len();
        let note = self
            .db
            .create_note(caller, req)?
            .ok_or(ApiError::NotFound("Object"))?;
        log::info!("[NOTES] Created note {} linked to {} record(s)", note.id, linked);
        Ok(note)
    }

    pub fn delete(&self, caller: &Caller, id: Uuid) -> Result<(), ApiError> {
        if !self.db.delete_note(caller.organization_id, id)? {
            return Err(ApiError::NotFound("Note"));
        }
        Ok(())
    }
}
