use crate::app::ADMIN_PAGE;
use crate::error::ProxyError;
use crate::AppState;
use axum::extract::State;
use axum::http::header::{HeaderMap, COOKIE, SET_COOKIE};
use axum::response::{Html, IntoResponse, Response};
use axum_extra::TypedHeader;
use headers::authorization::Basic;
use headers::Authorization;

pub(crate) const ADMIN_COOKIE: &str = "sparql-proxy-admin";

/// Credentials guarding `/admin`, and the per-process secret handed to
/// authenticated browsers as a cookie for the live channel handshake.
pub(crate) struct AdminAccess {
    user: String,
    password: String,
    secret: String,
}

impl AdminAccess {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            secret: uuid::Uuid::new_v4().simple().to_string(),
        }
    }

    fn credentials_match(&self, auth: &Authorization<Basic>) -> bool {
        auth.username() == self.user && auth.password() == self.password
    }

    /// Whether the request carries the admin cookie issued by this process.
    pub fn is_authorized(&self, headers: &HeaderMap) -> bool {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .any(|(name, value)| name == ADMIN_COOKIE && value == self.secret)
    }

    pub(crate) fn cookie(&self) -> String {
        format!("{ADMIN_COOKIE}={}; HttpOnly; Path=/", self.secret)
    }
}

/// `GET /admin`: basic auth, then hand out the live-channel cookie along
/// with the admin page.
pub(crate) async fn handle_admin(
    State(state): State<AppState>,
    auth: Option<TypedHeader<Authorization<Basic>>>,
) -> Result<Response, ProxyError> {
    let authorized = auth
        .as_ref()
        .map(|TypedHeader(auth)| state.admin.credentials_match(auth))
        .unwrap_or(false);
    if !authorized {
        return Err(ProxyError::Unauthorized);
    }

    Ok(([(SET_COOKIE, state.admin.cookie())], Html(ADMIN_PAGE)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn cookie_round_trips_through_the_header() {
        let access = AdminAccess::new("admin", "password");
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("other=1; {}", access.cookie().split(';').next().unwrap()))
                .unwrap(),
        );
        assert!(access.is_authorized(&headers));
    }

    #[test]
    fn foreign_cookies_are_refused() {
        let access = AdminAccess::new("admin", "password");
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("sparql-proxy-admin=forged"),
        );
        assert!(!access.is_authorized(&headers));
        assert!(!access.is_authorized(&HeaderMap::new()));
    }
}
