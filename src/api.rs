use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    CounselingSession, DashboardStats, LoginRequest, LoginResponse, NewCounselingSession, Student,
    UploadResult,
};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Thin wrapper over the risk service's HTTP endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    http: reqwest::Client,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(config: &Config, token: Option<String>) -> ApiResult<Self> {
        let base_url = Url::parse(&config.api_url).map_err(|err| ApiError::InvalidBaseUrl {
            url: config.api_url.clone(),
            reason: err.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl {
                url: config.api_url.clone(),
                reason: "not a hierarchical URL".to_string(),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            base_url,
            http,
            token,
        })
    }

    /// Appends path segments to the base URL. Each segment is percent-encoded,
    /// so ids containing `/`, `?` or `#` stay inside their segment.
    fn url_for(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(
        &self,
        method: Method,
        segments: &[&str],
        authorized: bool,
    ) -> (Uuid, String, RequestBuilder) {
        let request_id = Uuid::new_v4();
        let url = self.url_for(segments);
        let path = url.path().to_string();
        let mut builder = self
            .http
            .request(method, url)
            .header(REQUEST_ID_HEADER, request_id.to_string());

        if authorized {
            if let Some(token) = &self.token {
                builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
            }
        }

        (request_id, path, builder)
    }

    async fn send(&self, request_id: Uuid, path: &str, builder: RequestBuilder) -> ApiResult<String> {
        tracing::debug!(%request_id, path, "sending request");
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        tracing::debug!(%request_id, path, status = status.as_u16(), "response received");

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request_id: Uuid,
        path: &str,
        builder: RequestBuilder,
    ) -> ApiResult<T> {
        let body = self.send(request_id, path, builder).await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn login(&self, username: &str, password: &str) -> ApiResult<LoginResponse> {
        let (request_id, path, builder) = self.request(Method::POST, &["auth", "login"], false);
        let builder = builder.json(&LoginRequest { username, password });
        self.send_json(request_id, &path, builder).await
    }

    pub async fn dashboard_stats(&self) -> ApiResult<DashboardStats> {
        let (request_id, path, builder) = self.request(Method::GET, &["dashboard", "stats"], true);
        self.send_json(request_id, &path, builder).await
    }

    pub async fn students(&self) -> ApiResult<Vec<Student>> {
        let (request_id, path, builder) = self.request(Method::GET, &["students"], true);
        self.send_json(request_id, &path, builder).await
    }

    pub async fn student(&self, id: &str) -> ApiResult<Student> {
        let (request_id, path, builder) = self.request(Method::GET, &["students", id], true);
        self.send_json(request_id, &path, builder).await
    }

    pub async fn predict(&self, id: &str) -> ApiResult<serde_json::Value> {
        let (request_id, path, builder) = self.request(Method::GET, &["predict", id], true);
        self.send_json(request_id, &path, builder).await
    }

    pub async fn upload_csv(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> ApiResult<UploadResult> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type)?;
        let form = reqwest::multipart::Form::new().part("file", part);
        let (request_id, path, builder) = self.request(Method::POST, &["students", "upload"], true);
        self.send_json(request_id, &path, builder.multipart(form)).await
    }

    pub async fn counseling_sessions(
        &self,
        student_id: Option<&str>,
    ) -> ApiResult<Vec<CounselingSession>> {
        let (request_id, path, mut builder) = self.request(Method::GET, &["counseling"], true);
        if let Some(student_id) = student_id {
            builder = builder.query(&[("student_id", student_id)]);
        }
        self.send_json(request_id, &path, builder).await
    }

    /// The created record is not inspected; only the status matters.
    pub async fn add_counseling_session(&self, session: &NewCounselingSession) -> ApiResult<()> {
        let (request_id, path, builder) = self.request(Method::POST, &["counseling"], true);
        self.send(request_id, &path, builder.json(session)).await?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{config_for, serve_once, unreachable_config};
    use super::*;

    #[tokio::test]
    async fn authorized_requests_carry_bearer_token() {
        let (url, server) = serve_once(200, "[]").await;
        let client = ApiClient::new(&config_for(&url), Some("jwt-abc".to_string())).unwrap();
        let students = client.students().await.unwrap();
        assert!(students.is_empty());

        let request = server.await.unwrap().to_ascii_lowercase();
        assert!(request.starts_with("get /students "));
        assert!(request.contains("authorization: bearer jwt-abc"));
        assert!(request.contains("x-request-id: "));
    }

    #[tokio::test]
    async fn login_omits_bearer_token() {
        let body = r#"{"token":"t1","user":{"username":"admin","role":"admin"}}"#;
        let (url, server) = serve_once(200, body).await;
        let client = ApiClient::new(&config_for(&url), Some("stale".to_string())).unwrap();
        let response = client.login("admin", "secret").await.unwrap();
        assert_eq!(response.token, "t1");

        let request = server.await.unwrap();
        assert!(!request.to_ascii_lowercase().contains("authorization:"));
        assert!(request.contains(r#""username":"admin""#));
    }

    #[tokio::test]
    async fn counseling_filter_is_sent_as_query() {
        let (url, server) = serve_once(200, "[]").await;
        let client = ApiClient::new(&config_for(&url), None).unwrap();
        client.counseling_sessions(Some("STU002")).await.unwrap();
        let request = server.await.unwrap();
        assert!(request.starts_with("GET /counseling?student_id=STU002 "));
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let (url, _server) = serve_once(404, r#"{"detail":"not found"}"#).await;
        let client = ApiClient::new(&config_for(&url), None).unwrap();
        let err = client.student("STU999").await.unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let (url, _server) = serve_once(200, r#"{"unexpected":true}"#).await;
        let client = ApiClient::new(&config_for(&url), None).unwrap();
        let err = client.dashboard_stats().await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[tokio::test]
    async fn student_id_is_encoded_as_one_path_segment() {
        let (url, server) = serve_once(404, "{}").await;
        let client = ApiClient::new(&config_for(&url), None).unwrap();
        client.student("x?y/z").await.unwrap_err();
        let request = server.await.unwrap();
        assert!(request.starts_with("GET /students/x%3Fy%2Fz "), "{request}");
    }

    #[tokio::test]
    async fn base_url_prefix_is_kept() {
        let (url, server) = serve_once(200, "[]").await;
        let client = ApiClient::new(&config_for(&format!("{url}/api/")), None).unwrap();
        client.students().await.unwrap();
        assert!(server.await.unwrap().starts_with("GET /api/students "));
    }

    #[test]
    fn unusable_base_url_is_rejected() {
        let err = ApiClient::new(&config_for("mailto:ops@example.edu"), None).unwrap_err();
        assert!(matches!(err, ApiError::InvalidBaseUrl { .. }));
        let err = ApiClient::new(&config_for("not a url"), None).unwrap_err();
        assert!(matches!(err, ApiError::InvalidBaseUrl { .. }));
    }

    #[tokio::test]
    async fn unscored_students_decode() {
        let body = r#"[{"id":"STU100","name":"Asha Rao","department":"Physics","attendance":88.0,"gpa":7.9,"risk_score":null,"risk_level":null,"dropout_probability":null}]"#;
        let (url, _server) = serve_once(200, body).await;
        let client = ApiClient::new(&config_for(&url), None).unwrap();
        let students = client.students().await.unwrap();
        assert_eq!(students.len(), 1);
        assert_eq!(students[0].risk_score, None);
        assert_eq!(students[0].risk_level, None);
        assert_eq!(students[0].semester, 0);
    }

    #[tokio::test]
    async fn unreachable_service_is_a_network_error() {
        let client = ApiClient::new(&unreachable_config(), None).unwrap();
        let err = client.students().await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
    }
}
