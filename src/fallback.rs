use std::future::Future;

use crate::error::ApiResult;
use crate::models::{
    CounselingSession, DashboardStats, DepartmentRisk, RiskLevel, SessionStatus, Student,
    UploadResult,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Remote,
    Fallback { reason: String },
}

impl DataSource {
    pub fn is_fallback(&self) -> bool {
        matches!(self, DataSource::Fallback { .. })
    }
}

/// A value together with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub data: T,
    pub source: DataSource,
}

impl<T> Fetched<T> {
    pub fn remote(data: T) -> Self {
        Self {
            data,
            source: DataSource::Remote,
        }
    }

    pub fn fallback(data: T, reason: impl Into<String>) -> Self {
        Self {
            data,
            source: DataSource::Fallback {
                reason: reason.into(),
            },
        }
    }
}

/// Runs `op` once; any error swaps in `default` and marks the result as fallback.
pub async fn fetch_with_fallback<T, Fut>(what: &str, op: Fut, default: impl FnOnce() -> T) -> Fetched<T>
where
    Fut: Future<Output = ApiResult<T>>,
{
    match op.await {
        Ok(data) => Fetched::remote(data),
        Err(err) => {
            tracing::warn!(error = %err, what, "service call failed, using fallback data");
            Fetched::fallback(default(), err.to_string())
        }
    }
}

pub fn upload_result() -> UploadResult {
    UploadResult {
        total: 150,
        success: 142,
        errors: 8,
        high_risk_detected: 23,
    }
}

pub fn dashboard_stats() -> DashboardStats {
    let departments = vec![
        ("Computer Science", 24, 45, 120),
        ("Electrical Eng.", 38, 52, 95),
        ("Mechanical Eng.", 42, 60, 110),
        ("Civil Eng.", 35, 48, 85),
        ("Information Tech.", 22, 55, 140),
        ("Electronics", 25, 64, 187),
    ];

    DashboardStats {
        total_students: 1247,
        high_risk: 186,
        medium_risk: 324,
        low_risk: 737,
        average_attendance: 78.5,
        department_risk: departments
            .into_iter()
            .map(|(department, high, medium, low)| DepartmentRisk {
                department: department.to_string(),
                high,
                medium,
                low,
            })
            .collect(),
    }
}

#[allow(clippy::too_many_arguments)]
fn student(
    id: &str,
    name: &str,
    department: &str,
    attendance: f64,
    gpa: f64,
    risk_score: u32,
    risk_level: RiskLevel,
    email: &str,
    enrollment_year: i32,
    semester: u32,
    dropout_probability: f64,
    risk_factors: &[&str],
    attendance_history: [f64; 5],
    gpa_history: [f64; 5],
) -> Student {
    Student {
        id: id.to_string(),
        name: name.to_string(),
        department: department.to_string(),
        attendance,
        gpa,
        risk_score: Some(risk_score),
        risk_level: Some(risk_level),
        email: email.to_string(),
        enrollment_year,
        semester,
        dropout_probability: Some(dropout_probability),
        risk_factors: risk_factors.iter().map(|f| f.to_string()).collect(),
        attendance_history: attendance_history.to_vec(),
        gpa_history: gpa_history.to_vec(),
    }
}

pub fn students() -> Vec<Student> {
    use RiskLevel::{High, Low, Medium};

    vec![
        student(
            "STU001", "Aarav Sharma", "Computer Science", 92.0, 3.8, 15, Low,
            "aarav@university.edu", 2022, 5, 8.0, &["None significant"],
            [95.0, 92.0, 90.0, 93.0, 92.0], [3.6, 3.7, 3.8, 3.9, 3.8],
        ),
        student(
            "STU002", "Priya Patel", "Electrical Engineering", 68.0, 2.4, 72, High,
            "priya@university.edu", 2021, 7, 78.0,
            &["Low attendance", "Declining GPA", "Financial stress"],
            [85.0, 78.0, 72.0, 70.0, 68.0], [3.2, 2.9, 2.7, 2.5, 2.4],
        ),
        student(
            "STU003", "Rahul Verma", "Mechanical Engineering", 75.0, 2.9, 55, Medium,
            "rahul@university.edu", 2022, 5, 45.0,
            &["Irregular attendance", "Mid-range GPA"],
            [88.0, 82.0, 78.0, 76.0, 75.0], [3.4, 3.2, 3.0, 2.9, 2.9],
        ),
        student(
            "STU004", "Sneha Iyer", "Computer Science", 88.0, 3.5, 22, Low,
            "sneha@university.edu", 2023, 3, 12.0, &["None significant"],
            [90.0, 89.0, 87.0, 88.0, 88.0], [3.3, 3.4, 3.5, 3.5, 3.5],
        ),
        student(
            "STU005", "Amit Kumar", "Civil Engineering", 58.0, 2.0, 88, High,
            "amit@university.edu", 2021, 7, 91.0,
            &["Very low attendance", "Failing grades", "No extracurriculars"],
            [72.0, 68.0, 63.0, 60.0, 58.0], [2.8, 2.5, 2.3, 2.1, 2.0],
        ),
        student(
            "STU006", "Kavya Nair", "Information Technology", 80.0, 3.1, 42, Medium,
            "kavya@university.edu", 2022, 5, 35.0,
            &["Moderate attendance drop", "Average GPA trend"],
            [90.0, 86.0, 83.0, 81.0, 80.0], [3.5, 3.3, 3.2, 3.1, 3.1],
        ),
        student(
            "STU007", "Vikram Singh", "Electronics", 45.0, 1.8, 95, High,
            "vikram@university.edu", 2020, 9, 96.0,
            &["Critically low attendance", "Academic probation", "Mental health concerns"],
            [65.0, 58.0, 52.0, 48.0, 45.0], [2.4, 2.1, 1.9, 1.8, 1.8],
        ),
        student(
            "STU008", "Ananya Desai", "Computer Science", 95.0, 3.9, 8, Low,
            "ananya@university.edu", 2023, 3, 4.0, &["None significant"],
            [96.0, 95.0, 94.0, 95.0, 95.0], [3.7, 3.8, 3.9, 3.9, 3.9],
        ),
        student(
            "STU009", "Rohan Joshi", "Mechanical Engineering", 72.0, 2.6, 62, Medium,
            "rohan@university.edu", 2022, 5, 52.0,
            &["Declining attendance", "Below-average GPA"],
            [82.0, 80.0, 76.0, 74.0, 72.0], [3.0, 2.8, 2.7, 2.6, 2.6],
        ),
        student(
            "STU010", "Meera Reddy", "Electrical Engineering", 62.0, 2.2, 78, High,
            "meera@university.edu", 2021, 7, 82.0,
            &["Poor attendance", "Low GPA", "Lack of engagement"],
            [78.0, 72.0, 68.0, 65.0, 62.0], [2.9, 2.6, 2.4, 2.3, 2.2],
        ),
    ]
}

pub fn find_student(id: &str) -> Option<Student> {
    students().into_iter().find(|student| student.id == id)
}

pub fn counseling_sessions() -> Vec<CounselingSession> {
    use SessionStatus::{Completed, Scheduled};

    let sessions = vec![
        (
            "CS001", "STU002", "Priya Patel", "2024-12-15",
            "Discussed attendance issues. Student facing financial difficulties. Referred to financial aid office.",
            "Dr. Mehta", "2025-01-10", Completed,
        ),
        (
            "CS002", "STU005", "Amit Kumar", "2024-12-18",
            "Academic performance review. Created study plan for upcoming semester. Will monitor bi-weekly.",
            "Prof. Gupta", "2025-01-05", Completed,
        ),
        (
            "CS003", "STU007", "Vikram Singh", "2025-01-02",
            "Mental health screening conducted. Referred to campus counseling center. Requested reduced course load.",
            "Dr. Mehta", "2025-01-20", Scheduled,
        ),
        (
            "CS004", "STU003", "Rahul Verma", "2025-01-05",
            "Mid-semester check-in. Attendance improving slightly. Encouraged to join study groups.",
            "Prof. Sharma", "2025-02-01", Completed,
        ),
        (
            "CS005", "STU010", "Meera Reddy", "2025-01-08",
            "Initial dropout prevention session. Student considering leaving. Discussed career options and support available.",
            "Dr. Mehta", "2025-01-22", Scheduled,
        ),
        (
            "CS006", "STU002", "Priya Patel", "2025-01-10",
            "Follow-up: Financial aid application submitted. Attendance slightly improved. Continue monitoring.",
            "Dr. Mehta", "2025-02-10", Scheduled,
        ),
    ];

    sessions
        .into_iter()
        .map(
            |(id, student_id, student_name, date, notes, counselor, follow_up_date, status)| {
                CounselingSession {
                    id: id.to_string(),
                    student_id: student_id.to_string(),
                    student_name: student_name.to_string(),
                    date: date.to_string(),
                    notes: notes.to_string(),
                    counselor: counselor.to_string(),
                    follow_up_date: follow_up_date.to_string(),
                    status,
                }
            },
        )
        .collect()
}
