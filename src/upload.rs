use std::path::Path;

use crate::api::ApiClient;
use crate::error::{ApiError, ApiResult};
use crate::fallback::{self, fetch_with_fallback, Fetched};
use crate::models::UploadResult;

pub const CSV_MIME: &str = "text/csv";

#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn size_kb(&self) -> f64 {
        self.bytes.len() as f64 / 1024.0
    }
}

pub fn content_type_for(name: &str) -> &'static str {
    if name.ends_with(".csv") {
        CSV_MIME
    } else {
        "application/octet-stream"
    }
}

/// Accepts a file when either its name ends in `.csv` or its type is `text/csv`.
pub fn validate(name: &str, content_type: &str) -> ApiResult<()> {
    if content_type != CSV_MIME && !name.ends_with(".csv") {
        return Err(ApiError::InvalidUpload(format!(
            "{name} is not a CSV file. Please upload a CSV file."
        )));
    }
    Ok(())
}

/// Validates the name and type, then reads the file.
pub async fn prepare(path: &Path, content_type: Option<&str>) -> ApiResult<UploadFile> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let content_type = content_type
        .map(str::to_string)
        .unwrap_or_else(|| content_type_for(&name).to_string());

    validate(&name, &content_type)?;
    let bytes = tokio::fs::read(path).await?;

    Ok(UploadFile {
        name,
        content_type,
        bytes,
    })
}

pub async fn submit(api: &ApiClient, file: UploadFile) -> Fetched<UploadResult> {
    tracing::info!(file = %file.name, bytes = file.bytes.len(), "uploading student data");
    fetch_with_fallback(
        "csv upload",
        api.upload_csv(&file.name, file.bytes, &file.content_type),
        fallback::upload_result,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{config_for, serve_once, unreachable_config};

    #[test]
    fn accepts_csv_by_name_or_type() {
        assert!(validate("students.csv", "application/octet-stream").is_ok());
        assert!(validate("export.txt", CSV_MIME).is_ok());
        assert!(validate("students.csv", CSV_MIME).is_ok());
    }

    #[test]
    fn rejects_other_files() {
        let err = validate("grades.xlsx", "application/vnd.ms-excel").unwrap_err();
        assert!(matches!(err, ApiError::InvalidUpload(_)));
        assert!(validate("students.CSV", "application/octet-stream").is_err());
    }

    #[tokio::test]
    async fn rejection_happens_before_reading_or_sending() {
        let err = prepare(Path::new("/definitely/missing/grades.xlsx"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidUpload(_)));
    }

    #[tokio::test]
    async fn unreachable_service_reports_fallback_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cohort.csv");
        std::fs::write(&path, "name,attendance,gpa\nAvery,91,3.4\n").unwrap();

        let file = prepare(&path, None).await.unwrap();
        assert_eq!(file.content_type, CSV_MIME);

        let api = ApiClient::new(&unreachable_config(), None).unwrap();
        let fetched = submit(&api, file).await;
        assert!(fetched.source.is_fallback());
        assert_eq!(fetched.data, fallback::upload_result());
    }

    #[tokio::test]
    async fn upload_sends_multipart_file_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cohort.csv");
        std::fs::write(&path, "name\nAvery\n").unwrap();
        let body = r#"{"total":1,"success":1,"errors":0,"high_risk_detected":0}"#;
        let (url, server) = serve_once(200, body).await;

        let api = ApiClient::new(&config_for(&url), Some("jwt".to_string())).unwrap();
        let file = prepare(&path, None).await.unwrap();
        let fetched = submit(&api, file).await;
        assert!(!fetched.source.is_fallback());
        assert_eq!(fetched.data.total, 1);

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /students/upload "));
        assert!(raw.contains(r#"name="file"; filename="cohort.csv""#));
    }
}
