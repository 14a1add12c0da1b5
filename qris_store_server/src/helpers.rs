use std::future::{ready, Ready};

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use log::*;

use crate::errors::ServerError;

pub const ADMIN_ID_HEADER: &str = "X-Admin-Id";

/// The ids allowed to use the admin routes
#[derive(Debug, Clone, Default)]
pub struct AdminIds(Vec<String>);

impl AdminIds {
    pub fn new(ids: Vec<String>) -> Self {
        Self(ids)
    }

    pub fn is_admin(&self, id: &str) -> bool {
        self.0.iter().any(|a| a == id)
    }
}

/// Extracts the caller's id from the `X-Admin-Id` header and checks it against the configured admins. Handlers that
/// take an `AdminUser` argument reject everyone else with a 403.
#[derive(Debug, Clone)]
pub struct AdminUser(pub String);

impl FromRequest for AdminUser {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authorize_admin(req).map(AdminUser))
    }
}

/// The admin id in the request headers, if there is one and it belongs to an admin.
pub fn admin_id(req: &HttpRequest) -> Option<String> {
    authorize_admin(req).ok()
}

fn authorize_admin(req: &HttpRequest) -> Result<String, ServerError> {
    let admins = req
        .app_data::<web::Data<AdminIds>>()
        .ok_or_else(|| ServerError::ConfigurationError("The admin list has not been registered".into()))?;
    let id = req
        .headers()
        .get(ADMIN_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ServerError::InsufficientPermissions(format!("The {ADMIN_ID_HEADER} header is missing")))?;
    if admins.is_admin(id) {
        trace!("💻️ Admin {id} authorised");
        Ok(id.to_string())
    } else {
        warn!("💻️ {id} tried to use an admin route");
        Err(ServerError::InsufficientPermissions(format!("{id} is not an admin")))
    }
}
