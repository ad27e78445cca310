use serde::{Deserialize, Serialize};

use crate::models::{ChatMessage, Group, Report, Technician};
use crate::room::Room;

// -- JWT Claims --

/// Claims shared between fieldlink-api (REST middleware) and
/// fieldlink-gateway (WebSocket identify). The canonical definition lives
/// here so both sides agree on the request-scoped identity: id, display
/// name, role and photo reference. The admin uses the synthetic id 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub name: String,
    pub role: String,
    pub photo: Option<String>,
    pub exp: usize,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == "Admin"
    }
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub technician_id: i64,
    pub name: String,
    pub role: String,
    pub photo: Option<String>,
    pub token: String,
}

// -- Technicians --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTechnicianRequest {
    pub name: String,
    pub role: String,
    pub contact: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct UpdateTechnicianRequest {
    pub email: Option<String>,
    pub contact: Option<String>,
    pub role: Option<String>,
    pub photo: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub technician: Technician,
    pub job_count: i64,
    pub avg_progress: f64,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub total_reports: i64,
    pub completed: i64,
    pub in_progress: i64,
    pub latest_message: Option<ChatMessage>,
    pub monthly_completed: Vec<MonthlyCount>,
}

#[derive(Debug, Serialize)]
pub struct MonthlyCount {
    pub month: String,
    pub count: i64,
}

// -- Groups --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateGroupRequest {
    pub name: String,
    pub member_ids: Vec<i64>,
}

// -- Chat --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub message: String,
    pub recipient_id: Option<i64>,
    pub group_id: Option<i64>,
    pub timestamp: Option<String>,
}

/// Everything the chat page needs in one fetch: the caller's rooms, the
/// technician roster, their groups and their message history.
#[derive(Debug, Serialize)]
pub struct ChatOverviewResponse {
    pub rooms: Vec<Room>,
    pub technicians: Vec<Technician>,
    pub groups: Vec<Group>,
    pub messages: Vec<ChatMessage>,
}

// -- Reports --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitReportRequest {
    pub job_number: String,
    pub progress: i64,
    pub challenges: Option<String>,
    pub comments: Option<String>,
    pub observations: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub duration: Option<String>,
    pub team_members: Option<Vec<String>>,
    pub files: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReportSummaryResponse {
    pub reports: Vec<Report>,
    pub suggestions: Vec<String>,
}

// -- Uploads --

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub filename: String,
}
