use std::cmp::Reverse;
use std::io::Write;

use serde::Serialize;

use crate::fallback::Fetched;
use crate::models::{RiskLevel, Student};
use crate::report;

/// Search, level filter and sort direction for the student list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentQuery {
    pub search: String,
    pub risk: Option<RiskLevel>,
    pub ascending: bool,
}

impl StudentQuery {
    pub fn toggled(&self) -> StudentQuery {
        StudentQuery {
            ascending: !self.ascending,
            ..self.clone()
        }
    }

    pub fn apply(&self, students: &[Student]) -> Vec<Student> {
        let needle = self.search.to_lowercase();
        let mut list: Vec<Student> = students
            .iter()
            .filter(|s| needle.is_empty() || s.name.to_lowercase().contains(&needle))
            .filter(|s| self.risk.map_or(true, |level| s.risk_level == Some(level)))
            .cloned()
            .collect();

        // Unscored students trail the list in either direction.
        if self.ascending {
            list.sort_by_key(|s| (s.risk_score.is_none(), s.risk_score));
        } else {
            list.sort_by_key(|s| (s.risk_score.is_none(), Reverse(s.risk_score)));
        }
        list
    }
}

#[derive(Serialize)]
struct ExportRow<'a> {
    id: &'a str,
    name: &'a str,
    department: &'a str,
    email: &'a str,
    attendance: f64,
    gpa: f64,
    risk_score: Option<u32>,
    risk_level: Option<&'static str>,
    dropout_probability: Option<f64>,
    risk_factors: String,
}

pub fn write_csv<W: Write>(students: &[Student], out: W) -> anyhow::Result<usize> {
    let mut writer = csv::Writer::from_writer(out);
    for student in students {
        writer.serialize(ExportRow {
            id: &student.id,
            name: &student.name,
            department: &student.department,
            email: &student.email,
            attendance: student.attendance,
            gpa: student.gpa,
            risk_score: student.risk_score,
            risk_level: student.risk_level.map(RiskLevel::as_str),
            dropout_probability: student.dropout_probability,
            risk_factors: student.risk_factors.join("; "),
        })?;
    }
    writer.flush()?;
    Ok(students.len())
}

/// Writes the filtered list as CSV to `out`. The fallback banner, if any,
/// goes to `notices` so `out` holds nothing but CSV.
pub fn export<W: Write, N: Write>(
    list: &Fetched<Vec<Student>>,
    query: &StudentQuery,
    out: W,
    mut notices: N,
) -> anyhow::Result<usize> {
    if let Some(banner) = report::fallback_banner(&list.source) {
        writeln!(notices, "{banner}")?;
    }
    write_csv(&query.apply(&list.data), out)
}
