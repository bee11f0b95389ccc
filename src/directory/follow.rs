// The "follows" relation: who gets notified about a user's announcements and
// newly created schools.

use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::UserId;
use crate::store::DirectoryStore;

#[derive(Clone)]
pub struct FollowGraph {
    store: Arc<DirectoryStore>,
}

impl FollowGraph {
    pub fn new(store: Arc<DirectoryStore>) -> Self {
        FollowGraph { store }
    }

    /// Add `follower` to `followee`'s follower set. The membership check and
    /// the insert are not atomic with each other; the store's unique pair
    /// constraint catches the concurrent double-add and both paths report
    /// `AlreadyFollowing`.
    pub async fn follow(&self, follower: UserId, followee: UserId) -> AppResult<()> {
        if follower == followee {
            return Err(AppError::Validation(
                "You cannot follow yourself".to_string(),
            ));
        }
        if !self.store.user_exists(followee).await? {
            return Err(AppError::NotFound(format!("User {} not found", followee)));
        }

        if self.store.is_follower(followee, follower).await? {
            return Err(AppError::AlreadyFollowing(
                "You are already a follower of news and announcements".to_string(),
            ));
        }

        if !self.store.add_follower(followee, follower).await? {
            return Err(AppError::AlreadyFollowing(
                "You are already a follower of news and announcements".to_string(),
            ));
        }

        Ok(())
    }

    pub async fn followers_of(&self, followee: UserId) -> AppResult<Vec<UserId>> {
        Ok(self.store.followers_of(followee).await?)
    }
}
