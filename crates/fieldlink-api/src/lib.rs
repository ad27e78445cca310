pub mod auth;
pub mod backup;
pub mod chat;
pub mod error;
pub mod groups;
pub mod middleware;
pub mod reports;
pub mod technicians;
pub mod uploads;

use fieldlink_types::error::ChatError;

/// Run a blocking store operation off the async runtime.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, ChatError>
where
    F: FnOnce() -> Result<T, ChatError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(ChatError::persistence)?
}
