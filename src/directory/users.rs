// Registration and lookup. Admin capabilities are granted when the supplied
// code matches the configured shared secret, and are immutable afterwards;
// there is no revocation lifecycle.

use std::sync::Arc;

use crate::config::AdminCodes;
use crate::error::{AppError, AppResult};
use crate::models::{User, UserId};
use crate::store::DirectoryStore;

#[derive(Clone)]
pub struct UserRegistry {
    store: Arc<DirectoryStore>,
    codes: AdminCodes,
}

impl UserRegistry {
    pub fn new(store: Arc<DirectoryStore>, codes: AdminCodes) -> Self {
        UserRegistry { store, codes }
    }

    pub async fn register(
        &self,
        email: String,
        name: String,
        admin_code: Option<String>,
    ) -> AppResult<User> {
        if email.trim().is_empty() || !email.contains('@') {
            return Err(AppError::Validation("A valid email is required".to_string()));
        }
        if name.trim().is_empty() {
            return Err(AppError::Validation("A name is required".to_string()));
        }

        let code = admin_code.as_deref().unwrap_or("");
        let is_school_admin = code == self.codes.school_code;
        let is_class_admin = code == self.codes.class_code;

        self.store
            .create_user(&email, &name, is_school_admin, is_class_admin)
            .await?
            .ok_or_else(|| {
                AppError::Validation(format!("Email '{}' is already registered", email))
            })
    }

    pub async fn get(&self, id: UserId) -> AppResult<User> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }
}
