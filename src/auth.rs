use chrono::{DateTime, Utc};

use crate::api::ApiClient;
use crate::error::{ApiError, ApiResult};
use crate::fallback::DataSource;
use crate::models::{Role, Session, User};
use crate::session::{SessionStorage, SessionStore};

#[derive(Debug, Clone, PartialEq)]
pub struct LoginOutcome {
    pub session: Session,
    pub source: DataSource,
}

/// Builds an offline session: "admin" (any case) becomes admin, everyone else a counselor.
pub fn fallback_session(username: &str, now: DateTime<Utc>) -> Session {
    let role = if username.eq_ignore_ascii_case("admin") {
        Role::Admin
    } else {
        Role::Counselor
    };

    Session {
        user: User {
            username: username.to_string(),
            role,
        },
        token: format!("dummy-jwt-token-{}", now.timestamp_millis()),
    }
}

pub async fn login<S: SessionStorage>(
    api: &ApiClient,
    store: &mut SessionStore<S>,
    username: &str,
    password: &str,
    allow_offline: bool,
) -> ApiResult<LoginOutcome> {
    let outcome = match api.login(username, password).await {
        Ok(response) => LoginOutcome {
            session: Session {
                user: response.user,
                token: response.token,
            },
            source: DataSource::Remote,
        },
        Err(err) if allow_offline => {
            tracing::warn!(error = %err, username, "login endpoint failed, using offline session");
            LoginOutcome {
                session: fallback_session(username, Utc::now()),
                source: DataSource::Fallback {
                    reason: err.to_string(),
                },
            }
        }
        Err(ApiError::Status { status: 401 | 403, .. }) => return Err(ApiError::InvalidCredentials),
        Err(err) => return Err(err),
    };

    store.set(outcome.session.clone())?;
    tracing::info!(
        username = %outcome.session.user.username,
        role = %outcome.session.user.role,
        offline = outcome.source.is_fallback(),
        "logged in"
    );
    Ok(outcome)
}

pub fn logout<S: SessionStorage>(store: &mut SessionStore<S>) -> ApiResult<()> {
    store.clear()?;
    tracing::info!("logged out");
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::api::test_support::{config_for, serve_once, unreachable_config};
    use crate::gate::{self, Access, Route};
    use crate::session::MemoryStorage;

    #[test]
    fn fallback_role_follows_username() {
        let now = Utc.with_ymd_and_hms(2025, 1, 10, 9, 0, 0).unwrap();
        assert_eq!(fallback_session("ADMIN", now).user.role, Role::Admin);
        assert_eq!(fallback_session("admin", now).user.role, Role::Admin);
        assert_eq!(fallback_session("dr.mehta", now).user.role, Role::Counselor);
        assert_eq!(
            fallback_session("admin", now).token,
            format!("dummy-jwt-token-{}", now.timestamp_millis())
        );
    }

    #[tokio::test]
    async fn any_credentials_authenticate_when_service_is_down() {
        let api = ApiClient::new(&unreachable_config(), None).unwrap();
        for (username, password) in [("admin", "admin"), ("", ""), ("someone", "wrong")] {
            let mut store = SessionStore::new(MemoryStorage::default());
            let outcome = login(&api, &mut store, username, password, true).await.unwrap();
            assert!(store.is_authenticated());
            assert!(outcome.source.is_fallback());
        }
    }

    #[tokio::test]
    async fn rejected_credentials_also_fall_back() {
        let (url, _server) = serve_once(401, r#"{"detail":"bad password"}"#).await;
        let api = ApiClient::new(&config_for(&url), None).unwrap();
        let mut store = SessionStore::new(MemoryStorage::default());
        let outcome = login(&api, &mut store, "viewer1", "nope", true).await.unwrap();
        assert!(store.is_authenticated());
        assert_eq!(outcome.session.user.role, Role::Counselor);
    }

    #[tokio::test]
    async fn strict_login_surfaces_rejection() {
        let (url, _server) = serve_once(401, r#"{"detail":"bad password"}"#).await;
        let api = ApiClient::new(&config_for(&url), None).unwrap();
        let mut store = SessionStore::new(MemoryStorage::default());
        let err = login(&api, &mut store, "viewer1", "nope", false).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidCredentials));
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn remote_login_adopts_service_session() {
        let body = r#"{"token":"jwt-remote","user":{"username":"kiara","role":"viewer"}}"#;
        let (url, _server) = serve_once(200, body).await;
        let api = ApiClient::new(&config_for(&url), None).unwrap();
        let mut store = SessionStore::new(MemoryStorage::default());
        let outcome = login(&api, &mut store, "kiara", "pw", true).await.unwrap();
        assert_eq!(outcome.source, DataSource::Remote);
        assert_eq!(store.token(), Some("jwt-remote"));
        assert_eq!(store.user().unwrap().role, Role::Viewer);
    }

    #[tokio::test]
    async fn logout_sends_protected_routes_to_login() {
        let api = ApiClient::new(&unreachable_config(), None).unwrap();
        let mut store = SessionStore::new(MemoryStorage::default());
        login(&api, &mut store, "admin", "x", true).await.unwrap();
        assert_eq!(gate::guard(&Route::Upload, &store), Access::Allow);

        logout(&mut store).unwrap();
        assert!(store.token().is_none());
        assert!(store.user().is_none());
        assert_eq!(
            gate::guard(&Route::Dashboard, &store),
            Access::Redirect(Route::Login)
        );
    }
}
