//! Caller identity, as resolved by the upstream auth gateway.
//!
//! Session issuance happens elsewhere; by the time a request reaches this
//! service the gateway has stamped the creator, organization and role onto
//! request headers.

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use std::future::{ready, Ready};
use std::str::FromStr;
use strum::EnumString;
use uuid::Uuid;

use crate::error::ApiError;

pub mod headers {
    pub const CREATOR_ID: &str = "X-Creator-Id";
    pub const ORG_ID: &str = "X-Org-Id";
    pub const ROLE: &str = "X-Role";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    /// Anything other than `admin` is an ordinary member.
    pub fn from_header(value: &str) -> Self {
        Role::from_str(value.trim()).unwrap_or(Role::Member)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub creator_id: Uuid,
    pub organization_id: Uuid,
    pub role: Role,
}

impl Caller {
    pub fn new(creator_id: Uuid, organization_id: Uuid, role: Role) -> Self {
        Self {
            creator_id,
            organization_id,
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    fn from_request_headers(req: &HttpRequest) -> Result<Self, ApiError> {
        let creator_id = header_uuid(req, headers::CREATOR_ID)?;
        let organization_id = header_uuid(req, headers::ORG_ID)?;
        let role = req
            .headers()
            .get(headers::ROLE)
            .and_then(|h| h.to_str().ok())
            .map(Role::from_header)
            .unwrap_or(Role::Member);

        Ok(Self::new(creator_id, organization_id, role))
    }
}

fn header_uuid(req: &HttpRequest, name: &str) -> Result<Uuid, ApiError> {
    let value = req
        .headers()
        .get(name)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized(format!("Missing {} header", name)))?;

    Uuid::parse_str(value.trim())
        .map_err(|_| ApiError::Unauthorized(format!("Invalid {} header", name)))
}

impl FromRequest for Caller {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Caller::from_request_headers(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_role_parsing() {
        assert_eq!(Role::from_header("admin"), Role::Admin);
        assert_eq!(Role::from_header(" ADMIN "), Role::Admin);
        assert_eq!(Role::from_header("member"), Role::Member);
        assert_eq!(Role::from_header("owner"), Role::Member);
    }

    #[test]
    fn test_caller_from_headers() {
        let creator = Uuid::new_v4();
        let org = Uuid::new_v4();
        let req = TestRequest::default()
            .insert_header((headers::CREATOR_ID, creator.to_string()))
            .insert_header((headers::ORG_ID, org.to_string()))
            .insert_header((headers::ROLE, "admin"))
            .to_http_request();

        let caller = Caller::from_request_headers(&req).expect("caller should resolve");
        assert_eq!(caller.creator_id, creator);
        assert_eq!(caller.organization_id, org);
        assert!(caller.is_admin());
    }

    #[test]
    fn test_missing_role_defaults_to_member() {
        let req = TestRequest::default()
            .insert_header((headers::CREATOR_ID, Uuid::new_v4().to_string()))
            .insert_header((headers::ORG_ID, Uuid::new_v4().to_string()))
            .to_http_request();

        let caller = Caller::from_request_headers(&req).expect("caller should resolve");
        assert_eq!(caller.role, Role::Member);
    }

    #[test]
    fn test_invalid_identity_is_unauthorized() {
        let req = TestRequest::default()
            .insert_header((headers::CREATOR_ID, "not-a-uuid"))
            .insert_header((headers::ORG_ID, Uuid::new_v4().to_string()))
            .to_http_request();

        let err = Caller::from_request_headers(&req).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }
}
