// Acting-user context, supplied by the session layer in front of this service.
// The directory trusts it and performs no authentication of its own.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
};

use crate::error::AppError;
use crate::models::{AuthorSnapshot, UserId};

#[derive(Debug, Clone)]
pub struct ViewerContext {
    pub user_id: UserId,
    pub email: String,
    pub name: String,
    pub is_school_admin: bool,
    pub is_class_admin: bool,
}

impl ViewerContext {
    pub fn new(user_id: UserId, email: String, name: String) -> Self {
        ViewerContext {
            user_id,
            email,
            name,
            is_school_admin: false,
            is_class_admin: false,
        }
    }

    pub fn with_school_admin(mut self) -> Self {
        self.is_school_admin = true;
        self
    }

    pub fn with_class_admin(mut self) -> Self {
        self.is_class_admin = true;
        self
    }

    /// Capture the viewer as it is right now, for embedding in an entity.
    pub fn author_snapshot(&self) -> AuthorSnapshot {
        AuthorSnapshot {
            id: self.user_id,
            email: self.email.clone(),
            name: self.name.clone(),
        }
    }
}

fn header_str(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

fn header_flag(parts: &Parts, name: &str) -> bool {
    matches!(
        parts.headers.get(name).and_then(|v| v.to_str().ok()),
        Some("1") | Some("true")
    )
}

impl<S> FromRequestParts<S> for ViewerContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let viewer: Result<ViewerContext, AppError> = (|| {
            let user_id = header_str(parts, "x-viewer-id")
                .ok_or_else(|| AppError::Unauthorized("Please login first".to_string()))?
                .parse::<UserId>()
                .map_err(|_| AppError::Validation("Malformed viewer id".to_string()))?;
            let email = header_str(parts, "x-viewer-email")
                .ok_or_else(|| AppError::Unauthorized("Please login first".to_string()))?;
            let name = header_str(parts, "x-viewer-name").unwrap_or_default();

            let mut viewer = ViewerContext::new(user_id, email, name);
            viewer.is_school_admin = header_flag(parts, "x-viewer-school-admin");
            viewer.is_class_admin = header_flag(parts, "x-viewer-class-admin");
            Ok(viewer)
        })();

        async move { viewer }
    }
}
