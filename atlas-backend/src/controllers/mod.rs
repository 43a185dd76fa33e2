pub mod health;
pub mod notes;
pub mod object_types;
pub mod objects;
pub mod public;

use actix_web::{error, web, HttpRequest};
use serde::Deserialize;

use crate::error::ApiError;
use crate::models::PageParams;

/// Malformed bodies, query strings and path segments become validation errors
/// with a plain-text reason.
pub fn extractor_config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req: &HttpRequest| {
        let reason = match &err {
            error::JsonPayloadError::ContentType => "Expected a JSON body".to_string(),
            other => format!("Invalid JSON body: {}", other),
        };
        error::Error::from(ApiError::Validation(reason))
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req: &HttpRequest| {
        error::Error::from(ApiError::Validation(format!("Invalid query string: {}", err)))
    }))
    .app_data(web::PathConfig::default().error_handler(|_err, req: &HttpRequest| {
        error::Error::from(ApiError::Validation(format!("Invalid id in {}", req.path())))
    }));
}

/// Query string of every paginated listing. Page values stay raw so
/// non-numeric input is reported by [`PageParams::parse`].
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl ListQuery {
    pub fn page_params(&self) -> Result<PageParams, ApiError> {
        PageParams::parse(self.page.as_deref(), self.page_size.as_deref())
            .map_err(ApiError::Validation)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use actix_web::web;
    use std::sync::Arc;
    use tempfile::TempDir;

    use crate::caller::headers;
    use crate::config::Config;
    use crate::db::sqlite::testing::test_db;
    use crate::hooks::LogFeedHook;
    use crate::AppState;

    pub fn test_state() -> (TempDir, web::Data<AppState>) {
        let (dir, db) = test_db();
        let state = AppState::new(Arc::new(db), Config::default(), Arc::new(LogFeedHook));
        (dir, web::Data::new(state))
    }

    /// Identity headers as the auth gateway would stamp them.
    pub fn identity(
        creator_id: uuid::Uuid,
        organization_id: uuid::Uuid,
        role: &str,
    ) -> Vec<(&'static str, String)> {
        vec![
            (headers::CREATOR_ID, creator_id.to_string()),
            (headers::ORG_ID, organization_id.to_string()),
            (headers::ROLE, role.to_string()),
        ]
    }
}
