//! Records: ranked search, CRUD, detail view, references and typed values.

use actix_web::{web, HttpResponse};
use uuid::Uuid;

use super::ListQuery;
use crate::caller::Caller;
use crate::error::ApiError;
use crate::models::{AttachValueRequest, RecordRequest, UpdateValueRequest};
use crate::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/objects")
            .route("", web::post().to(create_object))
            .route("", web::get().to(search_objects))
            .route("/{id}", web::get().to(get_object))
            .route("/{id}", web::put().to(update_object))
            .route("/{id}", web::delete().to(delete_object))
            .route("/{id}/references", web::get().to(list_references))
            .route("/{id}/type-values", web::post().to(attach_type_value))
            .route("/{id}/type-values/{value_id}", web::put().to(update_type_value))
            .route("/{id}/type-values/{value_id}", web::delete().to(remove_type_value)),
    );
}

async fn create_object(
    state: web::Data<AppState>,
    caller: Caller,
    body: web::Json<RecordRequest>,
) -> Result<HttpResponse, ApiError> {
    let record = state.records.create(&caller, body.into_inner())?;
    Ok(HttpResponse::Created().json(record))
}

async fn search_objects(
    state: web::Data<AppState>,
    caller: Caller,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, ApiError> {
    let page = query.page_params()?;
    let hits = state.search.search(&caller, query.q.as_deref(), page)?;
    Ok(HttpResponse::Ok().json(hits))
}

async fn get_object(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let detail = state.search.detail(&caller, path.into_inner())?;
    Ok(HttpResponse::Ok().json(detail))
}

async fn update_object(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
    body: web::Json<RecordRequest>,
) -> Result<HttpResponse, ApiError> {
    let record = state
        .records
        .update(&caller, path.into_inner(), body.into_inner())?;
    Ok(HttpResponse::Ok().json(record))
}

async fn delete_object(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    state.records.delete(&caller, path.into_inner())?;
    Ok(HttpResponse::NoContent().finish())
}

async fn list_references(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let refs = state.records.references(&caller, path.into_inner())?;
    Ok(HttpResponse::Ok().json(refs))
}

async fn attach_type_value(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
    body: web::Json<AttachValueRequest>,
) -> Result<HttpResponse, ApiError> {
    let value = state
        .values
        .attach(&caller, path.into_inner(), body.into_inner())?;
    Ok(HttpResponse::Created().json(value))
}

async fn update_type_value(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<(Uuid, Uuid)>,
    body: web::Json<UpdateValueRequest>,
) -> Result<HttpResponse, ApiError> {
    let (record_id, value_id) = path.into_inner();
    let value = state
        .values
        .update(&caller, record_id, value_id, body.into_inner().payload)?;
    Ok(HttpResponse::Ok().json(value))
}

async fn remove_type_value(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, ApiError> {
    let (record_id, value_id) = path.into_inner();
    state.values.remove(&caller, record_id, value_id)?;
    Ok(HttpResponse::NoContent().finish())
}
