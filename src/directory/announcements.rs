// Global announcements. Creation captures the author snapshot and fans the
// event out to the author's followers; the fanout report rides along with
// the created announcement.

use serde::Serialize;
use std::sync::Arc;

use crate::directory::fanout::{FanoutReport, NotificationFanout};
use crate::error::{AppError, AppResult};
use crate::models::{Announcement, AnnouncementId, EventKind, FanoutEvent};
use crate::store::DirectoryStore;
use crate::viewer::ViewerContext;

#[derive(Debug, Serialize)]
pub struct CreatedAnnouncement {
    pub announcement: Announcement,
    pub fanout: FanoutReport,
}

#[derive(Debug, Serialize)]
pub struct AnnouncementPage {
    pub announcements: Vec<Announcement>,
    pub page: u32,
    pub pages: u32,
    pub total: i64,
}

#[derive(Clone)]
pub struct Announcements {
    store: Arc<DirectoryStore>,
    fanout: NotificationFanout,
}

impl Announcements {
    pub fn new(store: Arc<DirectoryStore>) -> Self {
        Announcements {
            fanout: NotificationFanout::new(store.clone()),
            store,
        }
    }

    pub async fn create(
        &self,
        viewer: &ViewerContext,
        name: String,
        description: Option<String>,
    ) -> AppResult<CreatedAnnouncement> {
        if name.trim().is_empty() {
            return Err(AppError::Validation(
                "Announcement name must not be empty".to_string(),
            ));
        }

        let author = viewer.author_snapshot();
        let announcement = self
            .store
            .create_announcement(&name, description.as_deref(), &author)
            .await?;

        let followers = self.store.followers_of(viewer.user_id).await?;
        let event = FanoutEvent {
            kind: EventKind::Announcement,
            id: announcement.id,
            name: announcement.name.clone(),
            actor_email: viewer.email.clone(),
        };
        let report = self.fanout.fan_out(&event, &followers).await;

        Ok(CreatedAnnouncement {
            announcement,
            fanout: report,
        })
    }

    pub async fn get(&self, id: AnnouncementId) -> AppResult<Announcement> {
        self.store
            .get_announcement(id)
            .await?
            .ok_or_else(|| announcement_not_found(id))
    }

    pub async fn list(
        &self,
        search: Option<&str>,
        page: u32,
        per_page: u32,
    ) -> AppResult<AnnouncementPage> {
        let page = page.max(1);
        let (announcements, total) = self.store.list_announcements(search, page, per_page).await?;
        Ok(AnnouncementPage {
            announcements,
            page,
            pages: (total as u64).div_ceil(per_page.max(1) as u64) as u32,
            total,
        })
    }

    pub async fn update(
        &self,
        id: AnnouncementId,
        name: String,
        description: Option<String>,
    ) -> AppResult<Announcement> {
        if !self
            .store
            .update_announcement(id, &name, description.as_deref())
            .await?
        {
            return Err(announcement_not_found(id));
        }
        self.get(id).await
    }

    pub async fn delete(&self, id: AnnouncementId) -> AppResult<()> {
        if !self.store.delete_announcement(id).await? {
            return Err(announcement_not_found(id));
        }
        Ok(())
    }
}

fn announcement_not_found(id: AnnouncementId) -> AppError {
    AppError::NotFound(format!("Announcement {} not found", id))
}
