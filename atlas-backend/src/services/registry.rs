//! Object type registry: definitions and their lifecycle.

use std::sync::Arc;
use uuid::Uuid;

use crate::caller::Caller;
use crate::db::tables::{DeleteOutcome, TypeFilter, TypeScope};
use crate::db::Database;
use crate::error::ApiError;
use crate::models::{ObjectType, ObjectTypeDef, ObjectTypeRequest, PageParams, Paginated};

#[derive(Clone)]
pub struct SchemaRegistry {
    db: Arc<Database>,
}

impl SchemaRegistry {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create a type; the creator is granted access in the same transaction.
    pub fn create(&self, caller: &Caller, req: ObjectTypeRequest) -> Result<ObjectType, ApiError> {
        let def = normalize(req)?;
        let object_type = self.db.create_object_type(caller, def)?;
        log::info!(
            "[REGISTRY] Created object type {} '{}' in org {}",
            object_type.id,
            object_type.name,
            object_type.organization_id
        );
        Ok(object_type)
    }

    pub fn update(
        &self,
        caller: &Caller,
        id: Uuid,
        req: ObjectTypeRequest,
    ) -> Result<ObjectType, ApiError> {
        let def = normalize(req)?;
        let object_type = self
            .db
            .update_object_type(caller.organization_id, id, def)?
            .ok_or(ApiError::NotFound("Object type"))?;
        log::info!("[REGISTRY] Updated object type {}", id);
        Ok(object_type)
    }

    pub fn delete(&self, caller: &Caller, id: Uuid) -> Result<(), ApiError> {
        match self.db.delete_object_type(caller.organization_id, id)? {
            DeleteOutcome::Deleted => {
                log::info!("[REGISTRY] Deleted object type {}", id);
                Ok(())
            }
            DeleteOutcome::NotFound => Err(ApiError::NotFound("Object type")),
            DeleteOutcome::InUse => Err(ApiError::Conflict("Object type is in use".to_string())),
        }
    }

    /// Admins page through the whole organization, members through their grants.
    pub fn list(
        &self,
        caller: &Caller,
        query: Option<&str>,
        page: PageParams,
    ) -> Result<Paginated<ObjectType>, ApiError> {
        let filter = TypeFilter::new(TypeScope::for_caller(caller), query);
        let (items, total) = self.db.list_object_types(&filter, page)?;
        Ok(Paginated::new(items, total, page))
    }

    pub fn public_types(&self, organization_id: Uuid) -> Result<Vec<ObjectType>, ApiError> {
        Ok(self.db.object_types_in_scope(TypeScope::Public(organization_id))?)
    }

    /// A public type of the organization; private types read as missing.
    pub fn public_type(&self, organization_id: Uuid, id: Uuid) -> Result<ObjectType, ApiError> {
        self.db
            .get_object_type(organization_id, id)?
            .filter(|t| t.is_public)
            .ok_or(ApiError::NotFound("Object type"))
    }
}

fn normalize(req: ObjectTypeRequest) -> Result<ObjectTypeDef, ApiError> {
    let def = req.normalize().map_err(ApiError::Validation)?;
    if !def.measure_field_is_consistent() {
        log::warn!(
            "[REGISTRY] Measure field {:?} on '{}' does not name a number field",
            def.measure_field,
            def.name
        );
    }
    Ok(def)
}
