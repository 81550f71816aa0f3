use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub is_verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<String>,
    pub verified_badge_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn verification(&self) -> Verification {
        Verification {
            is_verified: self.is_verified,
            verified_at: self.verified_at,
            verified_by: self.verified_by.clone(),
            verified_badge_image: self.verified_badge_image.clone(),
        }
    }

    #[cfg(test)]
    pub fn apply_verification(&mut self, verification: Verification) {
        self.is_verified = verification.is_verified;
        self.verified_at = verification.verified_at;
        self.verified_by = verification.verified_by;
        self.verified_badge_image = verification.verified_badge_image;
    }
}

/// The four verification columns of an event, always written together.
///
/// Only [`Verification::granted`] and [`Verification::cleared`] build values the
/// service persists, so the timestamp, actor and badge are either all set or all
/// empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub is_verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<String>,
    pub verified_badge_image: Option<String>,
}

impl Verification {
    pub fn granted(at: DateTime<Utc>, by: impl Into<String>, badge: impl Into<String>) -> Self {
        Self {
            is_verified: true,
            verified_at: Some(at),
            verified_by: Some(by.into()),
            verified_badge_image: Some(badge.into()),
        }
    }

    pub fn cleared() -> Self {
        Self {
            is_verified: false,
            verified_at: None,
            verified_by: None,
            verified_badge_image: None,
        }
    }

    pub fn is_consistent(&self) -> bool {
        let set = [
            self.verified_at.is_some(),
            self.verified_by.is_some(),
            self.verified_badge_image.is_some(),
        ];
        set.iter().all(|&field| field == self.is_verified)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventVerificationView {
    pub id: Uuid,
    pub title: String,
    pub is_verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<String>,
    pub verified_badge_image: Option<String>,
}

impl From<&Event> for EventVerificationView {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id,
            title: event.title.clone(),
            is_verified: event.is_verified,
            verified_at: event.verified_at,
            verified_by: event.verified_by.clone(),
            verified_badge_image: event.verified_badge_image.clone(),
        }
    }
}

/// Metadata edit. Absent fields stay as they are; an empty string clears an
/// optional text field.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl EventPatch {
    pub fn apply(self, event: &mut Event) -> Result<(), String> {
        if let Some(title) = self.title {
            let title = title.trim();
            if title.is_empty() {
                return Err("title must not be blank".into());
            }
            event.title = title.to_string();
        }
        if let Some(description) = self.description {
            event.description = non_empty(description);
        }
        if let Some(location) = self.location {
            event.location = non_empty(location);
        }
        if let Some(category) = self.category {
            event.category = non_empty(category);
        }
        if let Some(starts_at) = self.starts_at {
            event.starts_at = Some(starts_at);
        }
        if let Some(ends_at) = self.ends_at {
            event.ends_at = Some(ends_at);
        }

        if let (Some(starts_at), Some(ends_at)) = (event.starts_at, event.ends_at)
            && ends_at < starts_at
        {
            return Err("endsAt must not be before startsAt".into());
        }
        Ok(())
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub search: Option<String>,
    pub verified: Option<bool>,
    pub limit: i64,
    pub offset: i64,
}
