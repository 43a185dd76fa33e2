use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::caller::Caller;
use crate::error::ApiError;
use crate::models::NoteRequest;
use crate::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/notes")
            .route("", web::post().to(create_note))
            .route("/{id}", web::delete().to(delete_note)),
    );
}

async fn create_note(
    state: web::Data<AppState>,
    caller: Caller,
    body: web::Json<NoteRequest>,
) -> Result<HttpResponse, ApiError> {
    let note = state.notes.create(&caller, body.into_inner())?;
    Ok(HttpResponse::Created().json(note))
}

async fn delete_note(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    state.notes.delete(&caller, path.into_inner())?;
    Ok(HttpResponse::NoContent().finish())
}
