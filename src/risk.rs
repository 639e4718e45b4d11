use crate::models::RiskLevel;

impl RiskLevel {
    pub fn from_score(score: u32) -> RiskLevel {
        match score {
            0..=40 => RiskLevel::Low,
            41..=70 => RiskLevel::Medium,
            _ => RiskLevel::High,
        }
    }
}

/// Needle angle in degrees: 0 maps to -90, 100 maps to +90.
pub fn gauge_angle(score: u32) -> f64 {
    (score as f64 / 100.0) * 180.0 - 90.0
}

pub fn progress_width(score: u32) -> u32 {
    score.min(100)
}

pub fn percent_of_total(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SemesterPoint {
    pub label: String,
    pub attendance: f64,
    pub gpa: f64,
}

pub fn semester_series(attendance: &[f64], gpa: &[f64]) -> Vec<SemesterPoint> {
    attendance
        .iter()
        .zip(gpa.iter())
        .enumerate()
        .map(|(idx, (&attendance, &gpa))| SemesterPoint {
            label: format!("Sem {}", idx + 1),
            attendance,
            gpa,
        })
        .collect()
}
