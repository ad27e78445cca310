use axum::{
    Extension, Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use fieldlink_db::models::NewReport;
use fieldlink_types::api::{Claims, ReportSummaryResponse, SubmitReportRequest};
use fieldlink_types::error::ChatError;
use fieldlink_types::models::{Report, TIMESTAMP_FORMAT, timestamp_now};

use crate::auth::AppState;
use crate::backup::spawn_backup;
use crate::error::ApiError;
use crate::run_blocking;

pub async fn submit_report(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitReportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if claims.is_admin() {
        return Err(ChatError::Unauthorized("only technicians file reports".to_string()).into());
    }

    let report = NewReport {
        job_number: req.job_number.trim().to_string(),
        technician_id: claims.sub,
        technician_name: claims.name.clone(),
        progress: req.progress,
        challenges: req.challenges,
        comments: req.comments,
        observations: req.observations,
        start_time: req.start_time,
        end_time: req.end_time,
        duration: req.duration,
        team: req.team_members.map(|members| members.join(", ")),
        files: req.files,
        created_at: timestamp_now(),
        job_id: Uuid::new_v4().to_string(),
    };

    let db = state.db.clone();
    let stored = run_blocking(move || db.insert_report(&report)).await?;

    Ok((StatusCode::CREATED, Json(stored)))
}

/// Admin sees every report; a technician sees their own.
pub async fn list_reports(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Report>>, ApiError> {
    let db = state.db.clone();
    let reports = if claims.is_admin() {
        run_blocking(move || db.list_reports()).await?
    } else {
        let technician_id = claims.sub;
        run_blocking(move || db.reports_for_technician(technician_id)).await?
    };
    Ok(Json(reports))
}

/// The caller's last seven days of reports with derived suggestions.
pub async fn weekly_summary(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ReportSummaryResponse>, ApiError> {
    let reports = weekly_reports(&state, claims.sub).await?;
    let suggestions = suggestions_for(&reports);
    Ok(Json(ReportSummaryResponse {
        reports,
        suggestions,
    }))
}

/// Downloadable weekly summary document. When a backup URL is configured
/// the document is also posted there on a detached task.
pub async fn export_weekly_summary(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Response, ApiError> {
    let reports = weekly_reports(&state, claims.sub).await?;
    let suggestions = suggestions_for(&reports);
    let document = render_summary(&claims.name, &reports, &suggestions);

    let filename = "weekly_summary.txt".to_string();
    if let Some(url) = &state.backup_url {
        spawn_backup(url.clone(), filename.clone(), document.clone());
    }

    Ok(attachment(&filename, document))
}

/// Downloadable single-report document, addressed by its public job
/// handle.
pub async fn export_report(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Path(job_id): Path<String>,
) -> Result<Response, ApiError> {
    let db = state.db.clone();
    let report = run_blocking(move || db.report_by_job_id(&job_id))
        .await?
        .ok_or_else(|| ApiError::NotFound("no report with that job id".to_string()))?;

    let filename = format!("report_{}.txt", report.job_id);
    Ok(attachment(&filename, render_report(&report)))
}

async fn weekly_reports(state: &AppState, technician_id: i64) -> Result<Vec<Report>, ApiError> {
    let since = (chrono::Utc::now() - chrono::Duration::days(7))
        .format(TIMESTAMP_FORMAT)
        .to_string();
    let db = state.db.clone();
    Ok(run_blocking(move || db.reports_since(technician_id, &since)).await?)
}

/// Same heuristics the portal always surfaced: low average progress asks
/// for resources, frequent challenges ask for support, otherwise praise.
fn suggestions_for(reports: &[Report]) -> Vec<String> {
    if reports.is_empty() {
        return vec!["No reports found for this week.".to_string()];
    }

    let mut suggestions = Vec::new();

    let avg_progress =
        reports.iter().map(|r| r.progress).sum::<i64>() / reports.len() as i64;
    if avg_progress < 80 {
        suggestions.push("Consider allocating more resources to improve progress.".to_string());
    }

    let challenge_count = reports
        .iter()
        .filter(|r| r.challenges.as_deref().is_some_and(|c| !c.trim().is_empty()))
        .count();
    if challenge_count > 2 {
        suggestions.push(
            "Frequent challenges reported. Review site conditions or provide additional support."
                .to_string(),
        );
    }

    if suggestions.is_empty() {
        suggestions.push("Good progress and minimal challenges. Keep up the good work!".to_string());
    }

    suggestions
}

fn render_summary(name: &str, reports: &[Report], suggestions: &[String]) -> String {
    let mut doc = String::new();
    doc.push_str("FIELDLINK WEEKLY SUMMARY\n");
    doc.push_str(&format!("Technician: {name}\n"));
    doc.push_str(&format!("Generated: {}\n\n", timestamp_now()));

    if reports.is_empty() {
        doc.push_str("No reports filed this week.\n");
    } else {
        doc.push_str("Reports\n-------\n");
        for report in reports {
            doc.push_str(&format!(
                "Job: {}, Progress: {}%, Filed: {}\n",
                report.job_number, report.progress, report.created_at
            ));
            if let Some(challenges) = report.challenges.as_deref().filter(|c| !c.is_empty()) {
                doc.push_str(&format!("  Challenges: {challenges}\n"));
            }
            if let Some(comments) = report.comments.as_deref().filter(|c| !c.is_empty()) {
                doc.push_str(&format!("  Comments: {comments}\n"));
            }
        }
    }

    doc.push_str("\nSuggestions\n-----------\n");
    for suggestion in suggestions {
        doc.push_str(&format!("- {suggestion}\n"));
    }
    doc
}

fn render_report(report: &Report) -> String {
    let mut doc = String::new();
    doc.push_str("FIELDLINK JOB REPORT\n");
    doc.push_str(&format!("Job number: {}\n", report.job_number));
    doc.push_str(&format!("Technician: {}\n", report.technician_name));
    doc.push_str(&format!("Progress: {}%\n", report.progress));

    let optional = [
        ("Challenges", report.challenges.as_deref()),
        ("Comments", report.comments.as_deref()),
        ("Observations", report.observations.as_deref()),
        ("Start", report.start_time.as_deref()),
        ("End", report.end_time.as_deref()),
        ("Duration", report.duration.as_deref()),
        ("Team", report.team.as_deref()),
        ("Files", report.files.as_deref()),
    ];
    for (label, value) in optional {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            doc.push_str(&format!("{label}: {value}\n"));
        }
    }

    doc.push_str(&format!("Filed: {}\n", report.created_at));
    doc.push_str(&format!("Job id: {}\n", report.job_id));
    doc
}

fn attachment(filename: &str, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(progress: i64, challenges: Option<&str>) -> Report {
        Report {
            id: 1,
            job_number: "TC-JB-1001".to_string(),
            technician_id: Some(1),
            technician_name: "Alice Mwansa".to_string(),
            progress,
            challenges: challenges.map(str::to_string),
            comments: None,
            observations: None,
            start_time: None,
            end_time: None,
            duration: None,
            team: None,
            files: None,
            created_at: "2025-08-01 13:00:00".to_string(),
            job_id: "job-1".to_string(),
        }
    }

    #[test]
    fn no_reports_yields_the_empty_week_note() {
        assert_eq!(suggestions_for(&[]), vec!["No reports found for this week."]);
    }

    #[test]
    fn low_average_progress_asks_for_resources() {
        let reports = vec![report(50, None), report(60, None)];
        let suggestions = suggestions_for(&reports);
        assert!(suggestions[0].contains("allocating more resources"));
    }

    #[test]
    fn frequent_challenges_ask_for_support() {
        let reports = vec![
            report(95, Some("rain")),
            report(90, Some("access denied")),
            report(100, Some("parts missing")),
        ];
        let suggestions = suggestions_for(&reports);
        assert!(suggestions.iter().any(|s| s.contains("Frequent challenges")));
    }

    #[test]
    fn healthy_week_gets_praise() {
        let reports = vec![report(95, None), report(100, Some("  "))];
        assert_eq!(
            suggestions_for(&reports),
            vec!["Good progress and minimal challenges. Keep up the good work!"]
        );
    }
}
