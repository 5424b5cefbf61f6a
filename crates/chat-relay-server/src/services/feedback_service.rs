use reqwest::Client;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::{FeedbackConfig, UpstreamConfig};
use crate::models::chat::FeedbackRequest;

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("failed to access feedback file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode feedback file: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Persists feedback to a local JSON array file and mirrors each entry to a
/// remote endpoint.
///
/// The file is the source of truth: entries are appended under an async
/// mutex so concurrent submissions never lose updates during the
/// read-modify-write cycle. The mirror runs as a detached task with a short
/// timeout; its outcome is logged and never surfaced to the submitter.
pub struct FeedbackService {
    file_path: PathBuf,
    file_lock: Mutex<()>,
    mirror_url: String,
    mirror_username: String,
    mirror_password: String,
    client: Client,
}

impl FeedbackService {
    /// The mirror endpoint shares credentials with the upstream API.
    pub fn new(config: FeedbackConfig, upstream: &UpstreamConfig) -> Self {
        Self {
            file_path: PathBuf::from(&config.file_path),
            file_lock: Mutex::new(()),
            mirror_url: config.mirror_url.clone(),
            mirror_username: upstream.username.clone(),
            mirror_password: upstream.password.clone(),
            client: Client::builder()
                .timeout(config.mirror_timeout())
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Append one entry to the local file, then kick off the mirror.
    ///
    /// Returns an error only when local persistence fails; the caller's
    /// request must not depend on the mirror.
    pub async fn record(&self, entry: FeedbackRequest) -> Result<(), FeedbackError> {
        self.append_to_file(&entry).await?;
        info!("Feedback recorded (rating: {})", entry.rating);
        self.spawn_mirror(entry);
        Ok(())
    }

    async fn append_to_file(&self, entry: &FeedbackRequest) -> Result<(), FeedbackError> {
        let _guard = self.file_lock.lock().await;

        let mut entries = match tokio::fs::read(&self.file_path).await {
            Ok(bytes) => match serde_json::from_slice::<Vec<FeedbackRequest>>(&bytes) {
                Ok(entries) => entries,
                Err(e) => {
                    // Corrupt file resets to an empty array rather than
                    // blocking all future submissions.
                    warn!(
                        "Feedback file {} is corrupt ({}), resetting",
                        self.file_path.display(),
                        e
                    );
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        entries.push(entry.clone());
        let encoded = serde_json::to_string_pretty(&entries)?;
        tokio::fs::write(&self.file_path, encoded).await?;
        Ok(())
    }

    fn spawn_mirror(&self, entry: FeedbackRequest) {
        let client = self.client.clone();
        let url = self.mirror_url.clone();
        let username = self.mirror_username.clone();
        let password = self.mirror_password.clone();

        tokio::spawn(async move {
            let result = client
                .post(&url)
                .basic_auth(&username, Some(&password))
                .json(&entry)
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    info!("Feedback mirrored to remote endpoint");
                }
                Ok(response) => {
                    warn!("Feedback mirror rejected entry: status {}", response.status());
                }
                Err(e) => {
                    warn!("Feedback mirror unreachable: {}", e);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn service_in(dir: &TempDir) -> FeedbackService {
        let config = FeedbackConfig {
            file_path: dir
                .path()
                .join("user_feedback.json")
                .to_string_lossy()
                .into_owned(),
            // Unroutable on purpose; mirror failures must stay invisible.
            mirror_url: "http://127.0.0.1:1/mirror".to_string(),
            mirror_timeout_secs: 1,
        };
        FeedbackService::new(config, &UpstreamConfig::default())
    }

    fn entry(comment: &str) -> FeedbackRequest {
        FeedbackRequest {
            question: "Where is part 7?".to_string(),
            response: "Aisle 3.".to_string(),
            rating: "positive".to_string(),
            comment: comment.to_string(),
        }
    }

    async fn read_entries(service: &FeedbackService) -> Vec<FeedbackRequest> {
        let bytes = tokio::fs::read(&service.file_path).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn creates_file_on_first_entry() {
        let dir = TempDir::new().unwrap();
        let service = service_in(&dir);

        service.record(entry("first")).await.unwrap();

        let stored = read_entries(&service).await;
        assert_eq!(stored, vec![entry("first")]);
    }

    #[tokio::test]
    async fn sequential_entries_round_trip_in_order() {
        let dir = TempDir::new().unwrap();
        let service = service_in(&dir);

        let submitted: Vec<FeedbackRequest> =
            (0..5).map(|i| entry(&format!("comment {}", i))).collect();
        for e in &submitted {
            service.record(e.clone()).await.unwrap();
        }

        assert_eq!(read_entries(&service).await, submitted);
    }

    #[tokio::test]
    async fn corrupt_file_is_reset_to_the_new_entry() {
        let dir = TempDir::new().unwrap();
        let service = service_in(&dir);

        tokio::fs::write(&service.file_path, b"{not valid json")
            .await
            .unwrap();
        service.record(entry("after corruption")).await.unwrap();

        assert_eq!(read_entries(&service).await, vec![entry("after corruption")]);
    }

    #[tokio::test]
    async fn concurrent_submissions_lose_nothing() {
        let dir = TempDir::new().unwrap();
        let service = Arc::new(service_in(&dir));

        let mut handles = Vec::new();
        for i in 0..8 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service.record(entry(&format!("c{}", i))).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(read_entries(&service).await.len(), 8);
    }
}
