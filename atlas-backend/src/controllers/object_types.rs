//! Object type settings: schema definitions and per-member grants.

use actix_web::{web, HttpResponse};
use uuid::Uuid;

use super::ListQuery;
use crate::caller::Caller;
use crate::error::ApiError;
use crate::models::{GrantAccessRequest, ObjectTypeRequest};
use crate::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/setting/object-types")
            .route("", web::post().to(create_object_type))
            .route("", web::get().to(list_object_types))
            .route("/visible", web::get().to(list_visible_types))
            .route("/access", web::post().to(grant_access))
            .route("/access/{creator_id}", web::get().to(list_member_access))
            .route("/access/{creator_id}/{object_type_id}", web::delete().to(revoke_access))
            .route("/{id}", web::put().to(update_object_type))
            .route("/{id}", web::delete().to(delete_object_type)),
    );
}

async fn create_object_type(
    state: web::Data<AppState>,
    caller: Caller,
    body: web::Json<ObjectTypeRequest>,
) -> Result<HttpResponse, ApiError> {
    let object_type = state.registry.create(&caller, body.into_inner())?;
    Ok(HttpResponse::Created().json(object_type))
}

async fn list_object_types(
    state: web::Data<AppState>,
    caller: Caller,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, ApiError> {
    let page = query.page_params()?;
    let types = state.registry.list(&caller, query.q.as_deref(), page)?;
    Ok(HttpResponse::Ok().json(types))
}

/// Every type the caller can see, unpaginated.
async fn list_visible_types(
    state: web::Data<AppState>,
    caller: Caller,
) -> Result<HttpResponse, ApiError> {
    let types = state.access.visible_types(&caller)?;
    Ok(HttpResponse::Ok().json(types))
}

async fn update_object_type(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
    body: web::Json<ObjectTypeRequest>,
) -> Result<HttpResponse, ApiError> {
    let object_type = state
        .registry
        .update(&caller, path.into_inner(), body.into_inner())?;
    Ok(HttpResponse::Ok().json(object_type))
}

async fn delete_object_type(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    state.registry.delete(&caller, path.into_inner())?;
    Ok(HttpResponse::NoContent().finish())
}

async fn grant_access(
    state: web::Data<AppState>,
    caller: Caller,
    body: web::Json<GrantAccessRequest>,
) -> Result<HttpResponse, ApiError> {
    state
        .access
        .grant(&caller, body.creator_id, body.object_type_id)?;
    Ok(HttpResponse::NoContent().finish())
}

async fn revoke_access(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, ApiError> {
    let (creator_id, object_type_id) = path.into_inner();
    state.access.revoke(&caller, creator_id, object_type_id)?;
    Ok(HttpResponse::NoContent().finish())
}

async fn list_member_access(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let types = state
        .access
        .list_grants_for_creator(&caller, path.into_inner())?;
    Ok(HttpResponse::Ok().json(types))
}
