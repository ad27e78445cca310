use tracing::{info, warn};

/// Fire-and-forget delivery of a generated document to the configured
/// backup endpoint. Failures are logged and never surface to the caller;
/// backup is not part of the portal's correctness.
pub fn spawn_backup(url: String, filename: String, document: String) {
    tokio::spawn(async move {
        let result = reqwest::Client::new()
            .post(&url)
            .query(&[("filename", filename.as_str())])
            .header("content-type", "text/plain; charset=utf-8")
            .body(document)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => {
                info!("Backup of {} delivered", filename);
            }
            Ok(resp) => {
                warn!("Backup of {} rejected with status {}", filename, resp.status());
            }
            Err(e) => {
                warn!("Backup of {} failed: {}", filename, e);
            }
        }
    });
}
