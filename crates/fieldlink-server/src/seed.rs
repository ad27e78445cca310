use tracing::info;
use uuid::Uuid;

use fieldlink_api::auth::hash_password;
use fieldlink_db::Database;
use fieldlink_db::models::NewReport;
use fieldlink_types::error::ChatError;
use fieldlink_types::models::{NewMessage, timestamp_now};

/// Seed the demo directory on first run (empty technicians table): four
/// technicians, two groups with their memberships, a welcome message per
/// group and a handful of reports. All demo accounts use "password123".
pub fn seed_demo_data(db: &Database) -> Result<(), ChatError> {
    if !db.list_technicians()?.is_empty() {
        return Ok(());
    }

    let demo_hash = hash_password("password123")?;

    let technicians = [
        ("Alice Mwansa", "Network Engineer", "0977001122", "alice@techcorp.com"),
        ("Brian Zulu", "Systems Analyst", "0977012233", "brian@techcorp.com"),
        ("Chipo Banda", "IoT Specialist", "0977023344", "chipo@techcorp.com"),
        ("Derrick Phiri", "Cybersecurity Expert", "0977034455", "derrick@techcorp.com"),
    ];
    let mut ids = Vec::with_capacity(technicians.len());
    for (name, role, contact, email) in technicians {
        ids.push(db.create_technician(name, role, contact, email, &demo_hash)?);
    }
    let (alice, brian, chipo, derrick) = (ids[0], ids[1], ids[2], ids[3]);

    let network = db.create_group("Network Team", alice, &[brian])?;
    let security = db.create_group("Security Group", derrick, &[chipo])?;

    db.append_message(&NewMessage {
        sender_id: alice,
        sender_name: "Alice Mwansa".to_string(),
        recipient_id: None,
        group_id: Some(network.id),
        message: "Network upgrade completed.".to_string(),
        timestamp: timestamp_now(),
    })?;
    db.append_message(&NewMessage {
        sender_id: derrick,
        sender_name: "Derrick Phiri".to_string(),
        recipient_id: None,
        group_id: Some(security.id),
        message: "Security audit in progress.".to_string(),
        timestamp: timestamp_now(),
    })?;

    let reports = [
        (alice, "Alice Mwansa", "TC-JB-1001", 100,
         "No issues", "Replaced old router and reconfigured firewall rules.",
         "System running optimally.", "2025-08-01 09:00:00", "2025-08-01 12:30:00",
         "3.5h", "Brian Zulu", "2025-08-01 13:00:00"),
        (brian, "Brian Zulu", "TC-JB-1002", 75,
         "Slow performance due to outdated patches", "Initiated patch upgrade.",
         "System upgrade partially complete.", "2025-08-02 10:00:00", "2025-08-02 13:00:00",
         "3h", "Alice Mwansa, Chipo Banda", "2025-08-02 13:15:00"),
        (chipo, "Chipo Banda", "TC-JB-1003", 60,
         "Sensor connectivity drops", "Deployed IoT base station extension.",
         "Awaiting test results.", "2025-08-03 08:30:00", "2025-08-03 11:00:00",
         "2.5h", "Brian Zulu", "2025-08-03 11:15:00"),
        (derrick, "Derrick Phiri", "TC-JB-1004", 90,
         "Firewall logs showing brute-force attempts", "Blocked IPs and updated access rules.",
         "Security status improved.", "2025-08-03 13:00:00", "2025-08-03 16:30:00",
         "3.5h", "Alice Mwansa", "2025-08-03 16:45:00"),
    ];
    for (tech_id, tech_name, job, progress, challenges, comments, observations,
         start, end, duration, team, created_at) in reports
    {
        db.insert_report(&NewReport {
            job_number: job.to_string(),
            technician_id: tech_id,
            technician_name: tech_name.to_string(),
            progress,
            challenges: Some(challenges.to_string()),
            comments: Some(comments.to_string()),
            observations: Some(observations.to_string()),
            start_time: Some(start.to_string()),
            end_time: Some(end.to_string()),
            duration: Some(duration.to_string()),
            team: Some(team.to_string()),
            files: None,
            created_at: created_at.to_string(),
            job_id: Uuid::new_v4().to_string(),
        })?;
    }

    info!(
        "Seeded demo directory: {} technicians, 2 groups, {} reports",
        ids.len(),
        reports.len()
    );
    Ok(())
}
