use fieldlink_types::models::Technician;

/// Technician row as stored, password hash included.
/// Distinct from the public `Technician` model so the hash never leaves
/// the store layer by accident.
#[derive(Debug, Clone)]
pub struct TechnicianRow {
    pub id: i64,
    pub name: String,
    pub role: Option<String>,
    pub contact: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub photo: Option<String>,
}

impl From<TechnicianRow> for Technician {
    fn from(row: TechnicianRow) -> Self {
        Technician {
            id: row.id,
            name: row.name,
            role: row.role,
            contact: row.contact,
            email: row.email,
            photo: row.photo,
        }
    }
}

/// Input to the report store's insert operation. `technician_name` is the
/// same write-time snapshot the message store keeps for senders.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub job_number: String,
    pub technician_id: i64,
    pub technician_name: String,
    pub progress: i64,
    pub challenges: Option<String>,
    pub comments: Option<String>,
    pub observations: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub duration: Option<String>,
    pub team: Option<String>,
    pub files: Option<String>,
    pub created_at: String,
    pub job_id: String,
}

/// Per-technician report counters for the dashboard.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportStats {
    pub total: i64,
    pub completed: i64,
    pub in_progress: i64,
}
