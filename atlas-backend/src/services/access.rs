//! Per-caller object type visibility and grant management.
//!
//! Nothing is cached: every check reads the grant table.

use std::sync::Arc;
use uuid::Uuid;

use crate::caller::Caller;
use crate::db::tables::TypeScope;
use crate::db::Database;
use crate::error::ApiError;
use crate::models::ObjectType;

#[derive(Clone)]
pub struct AccessControl {
    db: Arc<Database>,
}

/// Admin-only operations fail before touching storage.
fn require_admin(caller: &Caller) -> Result<(), ApiError> {
    if caller.is_admin() {
        Ok(())
    } else {
        log::debug!("[ACCESS] Member {} denied admin operation", caller.creator_id);
        Err(ApiError::Forbidden)
    }
}

impl AccessControl {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn visible_types(&self, caller: &Caller) -> Result<Vec<ObjectType>, ApiError> {
        Ok(self.db.object_types_in_scope(TypeScope::for_caller(caller))?)
    }

    pub fn can_see_type(&self, caller: &Caller, type_id: Uuid) -> Result<bool, ApiError> {
        Ok(self.db.object_type_visible_to(caller, type_id)?)
    }

    pub fn grant(&self, caller: &Caller, creator_id: Uuid, type_id: Uuid) -> Result<(), ApiError> {
        require_admin(caller)?;
        let added = self
            .db
            .grant_object_type_access(caller.organization_id, creator_id, type_id)?
            .ok_or(ApiError::NotFound("Object type"))?;
        if added {
            log::info!("[ACCESS] Granted type {} to {}", type_id, creator_id);
        }
        Ok(())
    }

    pub fn revoke(&self, caller: &Caller, creator_id: Uuid, type_id: Uuid) -> Result<(), ApiError> {
        require_admin(caller)?;
        if self
            .db
            .revoke_object_type_access(caller.organization_id, creator_id, type_id)?
        {
            log::info!("[ACCESS] Revoked type {} from {}", type_id, creator_id);
        }
        Ok(())
    }

    /// Types granted to `creator_id` within the caller's organization.
    pub fn list_grants_for_creator(
        &self,
        caller: &Caller,
        creator_id: Uuid,
    ) -> Result<Vec<ObjectType>, ApiError> {
        require_admin(caller)?;
        Ok(self.db.object_types_in_scope(TypeScope::GrantedTo {
            creator_id,
            organization_id: caller.organization_id,
        })?)
    }
}
