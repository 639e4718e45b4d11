use chrono::{DateTime, Utc};

use crate::api::ApiClient;
use crate::fallback::{self, fetch_with_fallback, DataSource, Fetched};
use crate::models::{CounselingSession, NewCounselingSession, SessionStatus};

pub async fn load(api: &ApiClient, student_id: Option<&str>) -> Fetched<Vec<CounselingSession>> {
    fetch_with_fallback("counseling sessions", api.counseling_sessions(student_id), || {
        fallback::counseling_sessions()
            .into_iter()
            .filter(|session| student_id.map_or(true, |id| session.student_id == id))
            .collect()
    })
    .await
}

/// Record kept locally when the service cannot store a new session.
pub fn local_entry(request: &NewCounselingSession, now: DateTime<Utc>) -> CounselingSession {
    CounselingSession {
        id: format!("CS{}", now.timestamp_millis()),
        student_id: request.student_id.clone(),
        student_name: "New Student".to_string(),
        date: now.date_naive().format("%Y-%m-%d").to_string(),
        notes: request.notes.clone(),
        counselor: "Current User".to_string(),
        follow_up_date: request.follow_up_date.clone().unwrap_or_default(),
        status: SessionStatus::Scheduled,
    }
}

/// Submits a session. On failure the entry is prepended to `timeline` so the
/// caller can keep showing it. Both paths count as success.
pub async fn add(
    api: &ApiClient,
    timeline: &mut Vec<CounselingSession>,
    request: &NewCounselingSession,
) -> DataSource {
    match api.add_counseling_session(request).await {
        Ok(()) => DataSource::Remote,
        Err(err) => {
            tracing::warn!(error = %err, student_id = %request.student_id, "counseling write failed, keeping session locally");
            timeline.insert(0, local_entry(request, Utc::now()));
            DataSource::Fallback {
                reason: err.to_string(),
            }
        }
    }
}

/// Scheduled session with the earliest follow-up date.
pub fn next_follow_up(sessions: &[CounselingSession]) -> Option<&CounselingSession> {
    sessions
        .iter()
        .filter(|session| session.status == SessionStatus::Scheduled)
        .min_by(|a, b| a.follow_up_date.cmp(&b.follow_up_date))
}
