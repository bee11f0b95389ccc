// Entity types for the school-review directory.

use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type SchoolId = i64;
pub type ReviewId = i64;
pub type ProgramId = i64;
pub type SemesterId = i64;
pub type AnnouncementId = i64;
pub type NotificationId = i64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    // Capabilities are assigned at registration and never change afterwards.
    pub is_school_admin: bool,
    pub is_class_admin: bool,
    pub created: i64,
    pub updated: i64,
}

/// Point-in-time copy of the acting user, embedded in reviews and
/// announcements. Intentionally not kept in sync with later profile edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSnapshot {
    pub id: UserId,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct School {
    pub id: SchoolId,
    pub username: String,
    pub email: String,
    pub name: String,
    pub address_1: Option<String>,
    pub address_2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub phone_number: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    // Derived from the review set; always rewritten after a review mutation.
    pub rating: f64,
    pub created: i64,
    pub updated: i64,
}

/// Caller-supplied school fields. Identity (username, email) is minted by the
/// directory, never taken from input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchoolProfile {
    pub name: String,
    pub address_1: Option<String>,
    pub address_2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub phone_number: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub school_id: SchoolId,
    pub author: AuthorSnapshot,
    pub rating: f64,
    pub body: String,
    pub created: i64,
    pub updated: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub id: ProgramId,
    pub school_id: SchoolId,
    pub name: String,
    pub description: Option<String>,
    pub created: i64,
    pub updated: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Semester {
    pub id: SemesterId,
    pub program_id: ProgramId,
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
    pub created: i64,
    pub updated: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Announcement {
    pub id: AnnouncementId,
    pub name: String,
    pub description: Option<String>,
    pub author: AuthorSnapshot,
    pub created: i64,
    pub updated: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Announcement,
    NewSchool,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Announcement => "announcement",
            EventKind::NewSchool => "new_school",
        }
    }

    pub fn parse(s: &str) -> Option<EventKind> {
        match s {
            "announcement" => Some(EventKind::Announcement),
            "new_school" => Some(EventKind::NewSchool),
            _ => None,
        }
    }
}

/// A creation event propagated to followers. Carries denormalized id + name of
/// the triggering entity so the inbox entry survives later edits or deletes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanoutEvent {
    pub kind: EventKind,
    pub id: i64,
    pub name: String,
    pub actor_email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub event: FanoutEvent,
    pub is_read: bool,
    pub created: i64,
}
