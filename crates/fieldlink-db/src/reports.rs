use rusqlite::{OptionalExtension, params};

use fieldlink_types::error::ChatError;
use fieldlink_types::models::Report;

use crate::models::{NewReport, ReportStats};
use crate::{Database, StoreResultExt};

const REPORT_COLUMNS: &str =
    "id, job_number, technician_id, technician_name, progress, challenges, comments,
     observations, start_time, end_time, duration, team, files, created_at, job_id";

impl Database {
    pub fn insert_report(&self, report: &NewReport) -> Result<Report, ChatError> {
        if report.job_number.trim().is_empty() {
            return Err(ChatError::Validation("job number is required".to_string()));
        }
        if !(0..=100).contains(&report.progress) {
            return Err(ChatError::Validation(
                "progress must be between 0 and 100".to_string(),
            ));
        }

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO reports (
                    job_number, technician_id, technician_name, progress,
                    challenges, comments, observations, start_time, end_time,
                    duration, team, files, created_at, job_id
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    report.job_number,
                    report.technician_id,
                    report.technician_name,
                    report.progress,
                    report.challenges,
                    report.comments,
                    report.observations,
                    report.start_time,
                    report.end_time,
                    report.duration,
                    report.team,
                    report.files,
                    report.created_at,
                    report.job_id,
                ],
            )
            .store()?;

            Ok(Report {
                id: conn.last_insert_rowid(),
                job_number: report.job_number.clone(),
                technician_id: Some(report.technician_id),
                technician_name: report.technician_name.clone(),
                progress: report.progress,
                challenges: report.challenges.clone(),
                comments: report.comments.clone(),
                observations: report.observations.clone(),
                start_time: report.start_time.clone(),
                end_time: report.end_time.clone(),
                duration: report.duration.clone(),
                team: report.team.clone(),
                files: report.files.clone(),
                created_at: report.created_at.clone(),
                job_id: report.job_id.clone(),
            })
        })
    }

    pub fn list_reports(&self) -> Result<Vec<Report>, ChatError> {
        self.query_reports("ORDER BY created_at DESC, id DESC", params![])
    }

    pub fn reports_for_technician(&self, technician_id: i64) -> Result<Vec<Report>, ChatError> {
        self.query_reports(
            "WHERE technician_id = ?1 ORDER BY created_at DESC, id DESC",
            params![technician_id],
        )
    }

    /// Reports filed by a technician at or after the given timestamp
    /// (text comparison; the stored format sorts chronologically).
    pub fn reports_since(&self, technician_id: i64, since: &str) -> Result<Vec<Report>, ChatError> {
        self.query_reports(
            "WHERE technician_id = ?1 AND created_at >= ?2 ORDER BY created_at DESC, id DESC",
            params![technician_id, since],
        )
    }

    pub fn report_by_job_id(&self, job_id: &str) -> Result<Option<Report>, ChatError> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {REPORT_COLUMNS} FROM reports WHERE job_id = ?1");
            conn.query_row(&sql, params![job_id], map_report_row)
                .optional()
                .store()
        })
    }

    /// Dashboard counters: total, completed (100%), in progress (1..99%).
    pub fn report_stats(&self, technician_id: i64) -> Result<ReportStats, ChatError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT COUNT(*),
                        COUNT(*) FILTER (WHERE progress = 100),
                        COUNT(*) FILTER (WHERE progress > 0 AND progress < 100)
                 FROM reports WHERE technician_id = ?1",
                params![technician_id],
                |row| {
                    Ok(ReportStats {
                        total: row.get(0)?,
                        completed: row.get(1)?,
                        in_progress: row.get(2)?,
                    })
                },
            )
            .store()
        })
    }

    /// Profile card numbers: report count and average progress.
    pub fn profile_stats(&self, technician_id: i64) -> Result<(i64, f64), ChatError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT COUNT(*), COALESCE(AVG(progress), 0.0)
                 FROM reports WHERE technician_id = ?1",
                params![technician_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .store()
        })
    }

    /// Completed jobs per month, oldest first (dashboard chart).
    pub fn monthly_completed(&self, technician_id: i64) -> Result<Vec<(String, i64)>, ChatError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT substr(created_at, 1, 7) AS month, COUNT(*)
                     FROM reports
                     WHERE technician_id = ?1 AND progress = 100
                     GROUP BY month
                     ORDER BY month ASC",
                )
                .store()?;

            let rows = stmt
                .query_map(params![technician_id], |row| Ok((row.get(0)?, row.get(1)?)))
                .store()?
                .collect::<Result<Vec<_>, _>>()
                .store()?;
            Ok(rows)
        })
    }

    fn query_reports(
        &self,
        tail: &str,
        args: impl rusqlite::Params,
    ) -> Result<Vec<Report>, ChatError> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {REPORT_COLUMNS} FROM reports {tail}");
            let mut stmt = conn.prepare(&sql).store()?;
            let rows = stmt
                .query_map(args, map_report_row)
                .store()?
                .collect::<Result<Vec<_>, _>>()
                .store()?;
            Ok(rows)
        })
    }
}

fn map_report_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Report> {
    Ok(Report {
        id: row.get(0)?,
        job_number: row.get(1)?,
        technician_id: row.get(2)?,
        technician_name: row.get(3)?,
        progress: row.get(4)?,
        challenges: row.get(5)?,
        comments: row.get(6)?,
        observations: row.get(7)?,
        start_time: row.get(8)?,
        end_time: row.get(9)?,
        duration: row.get(10)?,
        team: row.get(11)?,
        files: row.get(12)?,
        created_at: row.get(13)?,
        job_id: row.get(14)?,
    })
}
