use std::fmt::Write;

use crate::counseling;
use crate::fallback::{DataSource, Fetched};
use crate::gate::NavItem;
use crate::models::{
    CounselingSession, DashboardStats, RiskLevel, SessionStatus, Student, UploadResult, User,
};
use crate::risk;
use crate::students::StudentQuery;

const BAR_WIDTH: usize = 20;

/// One-line notice for data that did not come from the service.
pub fn fallback_banner(source: &DataSource) -> Option<String> {
    match source {
        DataSource::Fallback { reason } => Some(format!(
            "! Using fallback data: the risk service is unavailable ({reason})"
        )),
        DataSource::Remote => None,
    }
}

fn write_banner(output: &mut String, source: &DataSource) {
    if let Some(banner) = fallback_banner(source) {
        let _ = writeln!(output, "{banner}");
        let _ = writeln!(output);
    }
}

fn bar(value: u64, max: u64, width: usize) -> String {
    let filled = if max == 0 {
        0
    } else {
        ((value as f64 / max as f64) * width as f64).round() as usize
    };
    let filled = filled.min(width);
    format!("{}{}", "#".repeat(filled), ".".repeat(width - filled))
}

fn risk_marker(level: Option<RiskLevel>) -> &'static str {
    match level {
        Some(RiskLevel::Low) => "[ LOW ]",
        Some(RiskLevel::Medium) => "[ MED ]",
        Some(RiskLevel::High) => "[HIGH!]",
        None => "[  ?  ]",
    }
}

/// Progress bar styled by the score's own tier, independent of the label.
pub fn risk_progress(score: u32) -> String {
    let width = risk::progress_width(score);
    let style = match RiskLevel::from_score(score) {
        RiskLevel::Low => 'o',
        RiskLevel::Medium => '=',
        RiskLevel::High => '#',
    };
    let filled = (width as usize * BAR_WIDTH) / 100;
    format!(
        "{}{} {:>3}",
        style.to_string().repeat(filled),
        " ".repeat(BAR_WIDTH - filled),
        score
    )
}

pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::new();
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

pub fn render_dashboard(fetched: &Fetched<DashboardStats>) -> String {
    let stats = &fetched.data;
    let mut output = String::new();
    write_banner(&mut output, &fetched.source);

    let _ = writeln!(output, "# Dashboard");
    let _ = writeln!(output, "Overview of student risk analytics");
    let _ = writeln!(output);
    let _ = writeln!(output, "Total Students   {}", group_thousands(stats.total_students));
    let _ = writeln!(
        output,
        "High Risk        {} ({:.1}% of total)",
        stats.high_risk,
        risk::percent_of_total(stats.high_risk, stats.total_students)
    );
    let _ = writeln!(
        output,
        "Medium Risk      {} ({:.1}% of total)",
        stats.medium_risk,
        risk::percent_of_total(stats.medium_risk, stats.total_students)
    );
    let _ = writeln!(output, "Avg Attendance   {}%", stats.average_attendance);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Risk Distribution");
    let largest = stats.low_risk.max(stats.medium_risk).max(stats.high_risk);
    for (label, count) in [
        ("Low Risk", stats.low_risk),
        ("Medium Risk", stats.medium_risk),
        ("High Risk", stats.high_risk),
    ] {
        let _ = writeln!(output, "{label:<12} {} {count}", bar(count, largest, BAR_WIDTH));
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Department Risk");
    if stats.department_risk.is_empty() {
        let _ = writeln!(output, "No department breakdown available.");
    } else {
        let largest = stats
            .department_risk
            .iter()
            .map(|d| d.high.max(d.medium).max(d.low))
            .max()
            .unwrap_or(0);
        for department in &stats.department_risk {
            let _ = writeln!(output, "{}", department.department);
            for (label, count) in [
                ("high", department.high),
                ("medium", department.medium),
                ("low", department.low),
            ] {
                let _ = writeln!(output, "  {label:<7}{} {count}", bar(count, largest, BAR_WIDTH));
            }
        }
    }

    output
}

pub fn render_students(fetched: &Fetched<Vec<Student>>, query: &StudentQuery) -> String {
    let filtered = query.apply(&fetched.data);
    let mut output = String::new();
    write_banner(&mut output, &fetched.source);

    let _ = writeln!(output, "# Student Management");
    let _ = writeln!(
        output,
        "Sort: {} | Filter: {} | Search: {}",
        if query.ascending { "Low -> High" } else { "High -> Low" },
        query.risk.map_or("All Levels", RiskLevel::as_str),
        if query.search.is_empty() { "-" } else { query.search.as_str() }
    );
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "{:<8} {:<16} {:<24} {:>6} {:>4}  {:<24} {}",
        "ID", "Name", "Department", "Att.", "GPA", "Risk Score", "Risk Level"
    );

    if filtered.is_empty() {
        let _ = writeln!(output, "No students found matching your criteria.");
        return output;
    }

    for student in &filtered {
        let _ = writeln!(
            output,
            "{:<8} {:<16} {:<24} {:>5}% {:>4.1}  {:<24} {}",
            student.id,
            student.name,
            student.department,
            student.attendance,
            student.gpa,
            student
                .risk_score
                .map_or_else(|| "unscored".to_string(), risk_progress),
            student.risk_level.map_or("-", RiskLevel::as_str)
        );
    }

    output
}

pub fn render_student(fetched: &Fetched<Option<Student>>) -> String {
    let mut output = String::new();
    write_banner(&mut output, &fetched.source);

    let Some(student) = &fetched.data else {
        let _ = writeln!(output, "Student not found.");
        return output;
    };

    let _ = writeln!(output, "# {} ({})", student.name, student.id);
    let _ = writeln!(
        output,
        "{} | {} | Enrolled {} | Semester {}",
        student.department, student.email, student.enrollment_year, student.semester
    );
    let _ = writeln!(output);
    match student.risk_score {
        Some(score) => {
            let _ = writeln!(
                output,
                "Risk Score       {} {}",
                risk_marker(student.risk_level),
                risk_progress(score)
            );
            let _ = writeln!(output, "Gauge needle     {:+.1} deg", risk::gauge_angle(score));
        }
        None => {
            let _ = writeln!(
                output,
                "Risk Score       {} not scored yet",
                risk_marker(student.risk_level)
            );
        }
    }
    match student.dropout_probability {
        Some(probability) => {
            let _ = writeln!(output, "Dropout chance   {probability}%");
        }
        None => {
            let _ = writeln!(output, "Dropout chance   -");
        }
    }
    let _ = writeln!(output, "Attendance       {}%", student.attendance);
    let _ = writeln!(output, "GPA              {:.1}", student.gpa);

    let _ = writeln!(output);
    let _ = writeln!(output, "## History");
    let series = risk::semester_series(&student.attendance_history, &student.gpa_history);
    if series.is_empty() {
        let _ = writeln!(output, "No semester history recorded.");
    }
    for point in series {
        let _ = writeln!(
            output,
            "{:<6} attendance {:>5.1}%  gpa {:.1}",
            point.label, point.attendance, point.gpa
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Risk Factors");
    for factor in &student.risk_factors {
        let _ = writeln!(output, "- {factor}");
    }

    output
}

fn status_marker(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Completed => "[x]",
        SessionStatus::Scheduled => "[ ]",
        SessionStatus::Missed => "[!]",
    }
}

pub fn render_counseling(fetched: &Fetched<Vec<CounselingSession>>) -> String {
    let mut output = String::new();
    write_banner(&mut output, &fetched.source);

    let _ = writeln!(output, "# Counseling");
    if let Some(next) = counseling::next_follow_up(&fetched.data) {
        let _ = writeln!(
            output,
            "Next follow-up: {} on {}",
            next.student_name, next.follow_up_date
        );
    }
    let _ = writeln!(output);

    if fetched.data.is_empty() {
        let _ = writeln!(output, "No counseling sessions recorded.");
    }

    for session in &fetched.data {
        let _ = writeln!(
            output,
            "{} {} ({}) {} - {}",
            status_marker(session.status),
            session.date,
            session.status,
            session.student_name,
            session.student_id
        );
        let _ = writeln!(output, "    {}", session.notes);
        let _ = writeln!(
            output,
            "    counselor: {} | follow-up: {}",
            session.counselor,
            if session.follow_up_date.is_empty() { "-" } else { session.follow_up_date.as_str() }
        );
    }

    output
}

pub fn render_upload(file: &str, size_kb: f64, fetched: &Fetched<UploadResult>) -> String {
    let result = &fetched.data;
    let mut output = String::new();
    write_banner(&mut output, &fetched.source);

    let _ = writeln!(output, "# CSV Upload");
    let _ = writeln!(output, "{file} ({size_kb:.1} KB)");
    let _ = writeln!(output);
    let _ = writeln!(output, "Total Uploaded      {}", result.total);
    let _ = writeln!(output, "Success Rows        {}", result.success);
    let _ = writeln!(output, "Error Rows          {}", result.errors);
    let _ = writeln!(output, "High Risk Detected  {}", result.high_risk_detected);
    output
}

pub fn render_nav(user: Option<&User>, items: &[NavItem]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "EduPredict - Dropout Prevention");
    let _ = writeln!(output);
    let _ = writeln!(output, "Main Menu");
    for item in items.iter().filter(|item| !item.admin_section) {
        let _ = writeln!(output, "  {:<12} {}", item.title, item.route);
    }
    if items.iter().any(|item| item.admin_section) {
        let _ = writeln!(output, "Admin");
        for item in items.iter().filter(|item| item.admin_section) {
            let _ = writeln!(output, "  {:<12} {}", item.title, item.route);
        }
    }
    let _ = writeln!(output);
    match user {
        Some(user) => {
            let _ = writeln!(output, "Signed in as {} ({})", user.username, user.role);
        }
        None => {
            let _ = writeln!(output, "Signed in as User (viewer)");
        }
    }
    output
}

pub fn render_not_found(path: &str) -> String {
    format!("404: {path} does not exist. Return to /dashboard.\n")
}
