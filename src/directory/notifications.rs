// A user's notification inbox: newest first, mark-read by the owner only.
// Notifications are never deleted.

use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::{Notification, NotificationId};
use crate::store::DirectoryStore;
use crate::viewer::ViewerContext;

#[derive(Clone)]
pub struct Inbox {
    store: Arc<DirectoryStore>,
}

impl Inbox {
    pub fn new(store: Arc<DirectoryStore>) -> Self {
        Inbox { store }
    }

    pub async fn list(&self, viewer: &ViewerContext) -> AppResult<Vec<Notification>> {
        Ok(self.store.notifications_for_user(viewer.user_id).await?)
    }

    pub async fn mark_read(
        &self,
        viewer: &ViewerContext,
        id: NotificationId,
    ) -> AppResult<Notification> {
        let notification = self
            .store
            .get_notification(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Notification {} not found", id)))?;

        if notification.user_id != viewer.user_id {
            return Err(AppError::Forbidden(
                "You don't have permission to do that".to_string(),
            ));
        }

        self.store.mark_notification_read(id).await?;
        Ok(Notification {
            is_read: true,
            ..notification
        })
    }
}
