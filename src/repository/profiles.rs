// src/repository/profiles.rs

use std::sync::Arc;

use sqlx::types::Json;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::user::{Profile, ProfileSettings, Role, UpdateProfileRequest},
    provider::{
        Provider, ProviderError,
        rows::{NewProfileRow, ProfileChanges, ProfileRow},
    },
};

fn profile_from_row(row: ProfileRow) -> Result<(Profile, String), ProviderError> {
    let role = match row.role.as_deref() {
        None => Role::default(),
        Some(raw) => raw
            .parse()
            .map_err(|e| ProviderError::Malformed(format!("profile {}: {}", row.id, e)))?,
    };
    let settings = match row.settings {
        None => ProfileSettings::default(),
        Some(Json(value)) => serde_json::from_value(value)
            .map_err(|e| ProviderError::Malformed(format!("profile {}: {}", row.id, e)))?,
    };

    let profile = Profile {
        id: row.id,
        email: row.email,
        full_name: row.full_name,
        last_name: row.last_name,
        role,
        settings,
        created_at: row.created_at,
        updated_at: row.updated_at,
    };
    Ok((profile, row.password_hash))
}

#[derive(Clone)]
pub struct ProfileRepository {
    provider: Arc<dyn Provider>,
}

impl ProfileRepository {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    /// Stores a new profile. A taken email surfaces as `Conflict`.
    pub async fn create(
        &self,
        email: &str,
        password_hash: String,
        full_name: Option<String>,
        role: Role,
    ) -> Result<Profile, AppError> {
        let row = self
            .provider
            .insert_profile(NewProfileRow {
                email: email.trim().to_lowercase(),
                password_hash,
                full_name: full_name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
                role: role.as_str().to_string(),
            })
            .await
            .map_err(|e| match e {
                ProviderError::Duplicate(_) => {
                    AppError::Conflict("Email already registered".to_string())
                }
                other => other.into(),
            })?;

        let (profile, _) = profile_from_row(row)?;
        Ok(profile)
    }

    /// The profile and its password hash, looked up case-insensitively.
    pub async fn credentials(&self, email: &str) -> Result<Option<(Profile, String)>, AppError> {
        match self.provider.select_profile_by_email(email.trim()).await? {
            Some(row) => Ok(Some(profile_from_row(row)?)),
            None => Ok(None),
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<Profile, AppError> {
        let row = self
            .provider
            .select_profile(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;
        let (profile, _) = profile_from_row(row)?;
        Ok(profile)
    }

    pub async fn update(&self, id: Uuid, req: UpdateProfileRequest) -> Result<Profile, AppError> {
        let changes = ProfileChanges {
            full_name: req.full_name.map(|n| n.trim().to_string()),
            last_name: req.last_name.map(|n| n.trim().to_string()),
            settings: req.settings.map(serde_json::to_value).transpose()?,
        };

        let row = self
            .provider
            .update_profile(id, changes)
            .await?
            .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;
        let (profile, _) = profile_from_row(row)?;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MemoryProvider;

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let repo = ProfileRepository::new(Arc::new(MemoryProvider::new()));
        repo.create("Student@Example.com", "hash".into(), None, Role::Student)
            .await
            .unwrap();

        let err = repo
            .create("student@example.com", "hash".into(), None, Role::Student)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_settings() {
        let repo = ProfileRepository::new(Arc::new(MemoryProvider::new()));
        let profile = repo
            .create("a@example.com", "hash".into(), Some("Amal".into()), Role::Student)
            .await
            .unwrap();

        let updated = repo
            .update(
                profile.id,
                UpdateProfileRequest {
                    full_name: None,
                    last_name: Some("Haddad".into()),
                    settings: Some(ProfileSettings {
                        phone: Some("+961 1 234 567".into()),
                        notification_email: None,
                    }),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.full_name.as_deref(), Some("Amal"));
        assert_eq!(updated.last_name.as_deref(), Some("Haddad"));
        assert_eq!(updated.settings.phone.as_deref(), Some("+961 1 234 567"));

        let (found, hash) = repo.credentials("A@EXAMPLE.COM").await.unwrap().unwrap();
        assert_eq!(found.id, profile.id);
        assert_eq!(hash, "hash");
    }
}
