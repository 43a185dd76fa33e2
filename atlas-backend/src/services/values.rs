//! Typed value writes. Payloads are free-form JSON objects; the type's field
//! list is never enforced against them.

use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use super::AccessControl;
use crate::caller::Caller;
use crate::db::Database;
use crate::error::ApiError;
use crate::hooks::{FeedEvent, FeedHook};
use crate::models::{payload_object, AttachValueRequest, TypedValue};

#[derive(Clone)]
pub struct ValueStore {
    db: Arc<Database>,
    access: AccessControl,
    feed: Arc<dyn FeedHook>,
}

impl ValueStore {
    pub fn new(db: Arc<Database>, access: AccessControl, feed: Arc<dyn FeedHook>) -> Self {
        Self { db, access, feed }
    }

    pub fn attach(
        &self,
        caller: &Caller,
        record_id: Uuid,
        req: AttachValueRequest,
    ) -> Result<TypedValue, ApiError> {
        let payload = payload_object(req.payload).map_err(ApiError::Validation)?;
        if !self.access.can_see_type(caller, req.type_id)? {
            return Err(ApiError::NotFound("Object type"));
        }

        let value = self
            .db
            .insert_typed_value(caller.organization_id, record_id, req.type_id, payload)?
            .ok_or(ApiError::NotFound("Object"))?;

        log::info!(
            "[VALUES] Attached {} of type {} to record {}",
            value.id,
            value.object_type_id,
            record_id
        );
        self.feed.notify(&FeedEvent::TypedValueAttached {
            value_id: value.id,
            record_id,
            object_type_id: value.object_type_id,
            creator_id: caller.creator_id,
        });
        Ok(value)
    }

    pub fn update(
        &self,
        caller: &Caller,
        record_id: Uuid,
        value_id: Uuid,
        payload: Value,
    ) -> Result<TypedValue, ApiError> {
        let payload = payload_object(payload).map_err(ApiError::Validation)?;
        let value = self
            .db
            .update_typed_value(caller.organization_id, record_id, value_id, payload)?
            .ok_or(ApiError::NotFound("Type value"))?;

        log::info!("[VALUES] Updated {}", value.id);
        self.feed.notify(&FeedEvent::TypedValueUpdated {
            value_id: value.id,
            record_id: value.record_id,
            object_type_id: value.object_type_id,
            creator_id: caller.creator_id,
        });
        Ok(value)
    }

    pub fn remove(&self, caller: &Caller, record_id: Uuid, value_id: Uuid) -> Result<(), ApiError> {
        if !self
            .db
            .delete_typed_value(caller.organization_id, record_id, value_id)?
        {
            return Err(ApiError::NotFound("Type value"));
        }
        log::info!("[VALUES] Removed {}", value_id);
        Ok(())
    }
}
