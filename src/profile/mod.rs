//! Read-only user profile lookup.
//!
//! The profile is a small JSON document (`name`, `location`,
//! `medical_history`, `emergency_contact`) re-read on every escalation so
//! edits take effect without a restart. Anything unreadable yields the
//! placeholder profile; a lookup never fails.

use std::path::PathBuf;
use tracing::{debug, warn};

use crate::config::ProfileConfig;
use crate::types::UserMetadata;

#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
    location_override: Option<String>,
}

impl ProfileStore {
    pub fn new(config: &ProfileConfig) -> Self {
        Self {
            path: config.path.clone(),
            location_override: config.location_override.clone(),
        }
    }

    pub async fn load(&self) -> UserMetadata {
        let mut profile = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => match serde_json::from_str::<UserMetadata>(&contents) {
                Ok(p) => p,
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "Invalid user profile, using placeholders");
                    UserMetadata::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No user profile, using placeholders");
                UserMetadata::default()
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read user profile, using placeholders");
                UserMetadata::default()
            }
        };

        if let Some(location) = &self.location_override {
            profile.location.clone_from(location);
        }
        profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn store(path: PathBuf, location_override: Option<&str>) -> ProfileStore {
        ProfileStore::new(&ProfileConfig {
            path,
            location_override: location_override.map(str::to_string),
        })
    }

    #[tokio::test]
    async fn test_missing_file_yields_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let profile = store(dir.path().join("absent.json"), None).load().await;
        assert_eq!(profile, UserMetadata::default());
    }

    #[tokio::test]
    async fn test_reads_profile_and_applies_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"name":"Ada","location":"Home","medical_history":"Asthma","user_id":"u1"}}"#
        )
        .unwrap();

        let profile = store(file.path().to_path_buf(), None).load().await;
        assert_eq!(profile.name, "Ada");
        assert_eq!(profile.location, "Home");
        assert_eq!(profile.medical_history, "Asthma");
        assert_eq!(profile.emergency_contact, "None available");

        let profile = store(file.path().to_path_buf(), Some("37.7749, -122.4194")).load().await;
        assert_eq!(profile.location, "37.7749, -122.4194");
    }

    #[tokio::test]
    async fn test_invalid_json_yields_placeholders() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let profile = store(file.path().to_path_buf(), None).load().await;
        assert_eq!(profile.name, "Unknown");
    }
}
