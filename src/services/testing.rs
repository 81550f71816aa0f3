//! In-memory collaborators for tests.

use crate::schema::{Actor, Event, EventFilter, Role, Verification};
use crate::services::badge::BadgeUpload;
use crate::services::{BadgeStore, EventRepository, SessionVerifier};
use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use uuid::Uuid;

pub fn sample_event() -> Event {
    let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    Event {
        id: Uuid::new_v4(),
        title: "Spring Meetup".into(),
        description: Some("Talks and snacks".into()),
        location: Some("Hall B".into()),
        category: None,
        starts_at: Some(start),
        ends_at: Some(start + chrono::Duration::hours(3)),
        is_verified: false,
        verified_at: None,
        verified_by: None,
        verified_badge_image: None,
        created_at: start,
        updated_at: start,
    }
}

pub fn admin() -> Actor {
    Actor {
        id: Uuid::new_v4(),
        email: "admin@example.com".into(),
        role: Role::Admin,
    }
}

pub fn member() -> Actor {
    Actor {
        id: Uuid::new_v4(),
        email: "member@example.com".into(),
        role: Role::Member,
    }
}

pub fn png_upload() -> BadgeUpload {
    BadgeUpload {
        bytes: b"\x89PNG\r\n\x1a\nbadge".to_vec(),
        content_type: "image/png".into(),
        file_name: Some("badge.png".into()),
    }
}

#[derive(Default)]
pub struct InMemoryEvents {
    events: Mutex<HashMap<Uuid, Event>>,
    fail_updates: AtomicBool,
}

impl InMemoryEvents {
    pub fn insert(&self, event: Event) -> Event {
        self.events
            .lock()
            .unwrap()
            .insert(event.id, event.clone());
        event
    }

    pub fn get(&self, id: Uuid) -> Option<Event> {
        self.events.lock().unwrap().get(&id).cloned()
    }

    pub fn fail_updates(&self) {
        self.fail_updates.store(true, Ordering::SeqCst);
    }

    fn check_writable(&self) -> anyhow::Result<()> {
        if self.fail_updates.load(Ordering::SeqCst) {
            anyhow::bail!("database unavailable");
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl EventRepository for InMemoryEvents {
    async fn list(&self, filter: &EventFilter) -> anyhow::Result<Vec<Event>> {
        let needle = filter.search.as_deref().map(str::to_lowercase);
        let mut events: Vec<Event> = self
            .events
            .lock()
            .unwrap()
            .values()
            .filter(|e| {
                needle
                    .as_deref()
                    .is_none_or(|n| e.title.to_lowercase().contains(n))
            })
            .filter(|e| filter.verified.is_none_or(|v| e.is_verified == v))
            .cloned()
            .collect();
        events.sort_by(|a, b| b.starts_at.cmp(&a.starts_at).then(b.id.cmp(&a.id)));

        Ok(events
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .collect())
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Event>> {
        Ok(self.get(id))
    }

    async fn update_details(&self, event: &Event) -> anyhow::Result<Option<Event>> {
        self.check_writable()?;
        let mut events = self.events.lock().unwrap();
        let Some(stored) = events.get_mut(&event.id) else {
            return Ok(None);
        };
        stored.title = event.title.clone();
        stored.description = event.description.clone();
        stored.location = event.location.clone();
        stored.category = event.category.clone();
        stored.starts_at = event.starts_at;
        stored.ends_at = event.ends_at;
        stored.updated_at = Utc::now();
        Ok(Some(stored.clone()))
    }

    async fn update_verification(
        &self,
        id: Uuid,
        verification: &Verification,
    ) -> anyhow::Result<Option<Event>> {
        self.check_writable()?;
        let mut events = self.events.lock().unwrap();
        let Some(stored) = events.get_mut(&id) else {
            return Ok(None);
        };
        stored.apply_verification(verification.clone());
        stored.updated_at = Utc::now();
        Ok(Some(stored.clone()))
    }
}

/// Hands out `mem://badge-N` references and records every call.
#[derive(Default)]
pub struct RecordingBadgeStore {
    next: AtomicUsize,
    stored: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
    fail_store: bool,
    fail_delete: bool,
}

impl RecordingBadgeStore {
    pub fn failing_store() -> Self {
        Self {
            fail_store: true,
            ..Default::default()
        }
    }

    pub fn failing_delete() -> Self {
        Self {
            fail_delete: true,
            ..Default::default()
        }
    }

    pub fn stored(&self) -> Vec<String> {
        self.stored.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl BadgeStore for RecordingBadgeStore {
    async fn store(&self, upload: &BadgeUpload) -> anyhow::Result<String> {
        if self.fail_store {
            anyhow::bail!("media host rejected {} bytes", upload.bytes.len());
        }
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        let reference = format!("mem://badge-{n}");
        self.stored.lock().unwrap().push(reference.clone());
        Ok(reference)
    }

    async fn delete(&self, reference: &str) -> anyhow::Result<()> {
        if self.fail_delete {
            anyhow::bail!("media host unreachable");
        }
        self.deleted.lock().unwrap().push(reference.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct StaticSessions {
    sessions: HashMap<String, Actor>,
}

impl StaticSessions {
    pub fn with(mut self, token: &str, actor: Actor) -> Self {
        self.sessions.insert(token.to_string(), actor);
        self
    }
}

#[async_trait::async_trait]
impl SessionVerifier for StaticSessions {
    async fn resolve(&self, token: &str) -> anyhow::Result<Option<Actor>> {
        Ok(self.sessions.get(token).cloned())
    }
}
