use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Counselor,
    Viewer,
}

impl Role {
    /// Admin implicitly holds every other role.
    pub fn permits(self, required: Role) -> bool {
        self == Role::Admin || self == required
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Counselor => "counselor",
            Role::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Student record as listed by the service. Records that have not been
/// scored yet arrive with null risk fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub attendance: f64,
    #[serde(default)]
    pub gpa: f64,
    #[serde(default)]
    pub risk_score: Option<u32>,
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub enrollment_year: i32,
    #[serde(default)]
    pub semester: u32,
    #[serde(default)]
    pub dropout_probability: Option<f64>,
    #[serde(default)]
    pub risk_factors: Vec<String>,
    #[serde(default)]
    pub attendance_history: Vec<f64>,
    #[serde(default)]
    pub gpa_history: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentRisk {
    pub department: String,
    pub high: u64,
    pub medium: u64,
    pub low: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_students: u64,
    pub high_risk: u64,
    pub medium_risk: u64,
    pub low_risk: u64,
    pub average_attendance: f64,
    #[serde(default)]
    pub department_risk: Vec<DepartmentRisk>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Completed,
    Scheduled,
    Missed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionStatus::Completed => "Completed",
            SessionStatus::Scheduled => "Scheduled",
            SessionStatus::Missed => "Missed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounselingSession {
    pub id: String,
    pub student_id: String,
    pub student_name: String,
    pub date: String,
    pub notes: String,
    pub counselor: String,
    #[serde(default)]
    pub follow_up_date: String,
    pub status: SessionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewCounselingSession {
    pub student_id: String,
    pub notes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    pub total: u64,
    pub success: u64,
    pub errors: u64,
    pub high_risk_detected: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}
