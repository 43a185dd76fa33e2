//! Unauthenticated read-only views over an organization's public types.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/public")
            .route("/object-types", web::get().to(list_public_types))
            .route("/objects-by-type", web::get().to(list_objects_by_type))
            .route("/objects/{id}", web::get().to(get_public_object)),
    );
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublicQuery {
    org_id: Option<String>,
    type_id: Option<String>,
}

fn required_uuid(value: Option<&str>, name: &str) -> Result<Uuid, ApiError> {
    let value = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Validation(format!("{} is required", name)))?;
    Uuid::parse_str(value).map_err(|_| ApiError::Validation(format!("Invalid {}", name)))
}

async fn list_public_types(
    state: web::Data<AppState>,
    query: web::Query<PublicQuery>,
) -> Result<HttpResponse, ApiError> {
    let org_id = required_uuid(query.org_id.as_deref(), "orgId")?;
    let types = state.registry.public_types(org_id)?;
    Ok(HttpResponse::Ok().json(types))
}

async fn list_objects_by_type(
    state: web::Data<AppState>,
    query: web::Query<PublicQuery>,
) -> Result<HttpResponse, ApiError> {
    let org_id = required_uuid(query.org_id.as_deref(), "orgId")?;
    let type_id = required_uuid(query.type_id.as_deref(), "typeId")?;

    let object_type = state.registry.public_type(org_id, type_id)?;
    let records = state.db.records_with_type(org_id, object_type.id)?;
    Ok(HttpResponse::Ok().json(records))
}

async fn get_public_object(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<PublicQuery>,
) -> Result<HttpResponse, ApiError> {
    let org_id = required_uuid(query.org_id.as_deref(), "orgId")?;
    let detail = state
        .db
        .public_record_detail(org_id, path.into_inner())?
        .ok_or(ApiError::NotFound("Object"))?;
    Ok(HttpResponse::Ok().json(detail))
}
