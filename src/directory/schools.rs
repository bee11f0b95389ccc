// School creation and administration. Creation sequences: allocate identity,
// persist the school, then fan the event out to the creator's followers.
// Allocation failure aborts the whole thing; fanout failure never rolls the
// created school back.

use serde::Serialize;
use std::sync::Arc;

use crate::directory::fanout::{FanoutReport, NotificationFanout};
use crate::directory::sequence::SequenceAllocator;
use crate::error::{AppError, AppResult};
use crate::models::{
    EventKind, FanoutEvent, Program, Review, School, SchoolId, SchoolProfile,
};
use crate::store::DirectoryStore;
use crate::viewer::ViewerContext;

/// `<first-3-letters>ICE<seq>`, the login identifier minted for a new school.
fn mint_username(name: &str, seq: i64) -> String {
    let prefix: String = name.chars().take(3).collect();
    format!("{}ICE{}", prefix, seq)
}

#[derive(Debug, Serialize)]
pub struct CreatedSchool {
    pub school: School,
    pub fanout: FanoutReport,
}

#[derive(Debug, Serialize)]
pub struct SchoolDetails {
    pub school: School,
    pub reviews: Vec<Review>,
    pub programs: Vec<Program>,
}

#[derive(Debug, Serialize)]
pub struct SchoolPage {
    pub schools: Vec<School>,
    pub page: u32,
    pub pages: u32,
    pub total: i64,
}

#[derive(Clone)]
pub struct SchoolDirectory {
    store: Arc<DirectoryStore>,
    sequence: SequenceAllocator,
    fanout: NotificationFanout,
}

impl SchoolDirectory {
    pub fn new(store: Arc<DirectoryStore>) -> Self {
        SchoolDirectory {
            sequence: SequenceAllocator::new(store.clone()),
            fanout: NotificationFanout::new(store.clone()),
            store,
        }
    }

    pub async fn create(
        &self,
        viewer: &ViewerContext,
        profile: SchoolProfile,
    ) -> AppResult<CreatedSchool> {
        if profile.name.trim().is_empty() {
            return Err(AppError::Validation(
                "School name must not be empty".to_string(),
            ));
        }

        // Without a valid sequence number the username is not guaranteed
        // unique, so creation stops here.
        let seq = self.sequence.next().await?;
        let username = mint_username(&profile.name, seq);
        let email = format!("{}@ice.edu", username);

        let school = self.store.create_school(&username, &email, &profile).await?;

        let followers = self.store.followers_of(viewer.user_id).await?;
        let event = FanoutEvent {
            kind: EventKind::NewSchool,
            id: school.id,
            name: school.name.clone(),
            actor_email: viewer.email.clone(),
        };
        let report = self.fanout.fan_out(&event, &followers).await;

        Ok(CreatedSchool {
            school,
            fanout: report,
        })
    }

    pub async fn get(&self, id: SchoolId) -> AppResult<SchoolDetails> {
        let school = self.load(id).await?;
        let reviews = self.store.reviews_for_school(id).await?;
        let programs = self.store.programs_for_school(id).await?;
        Ok(SchoolDetails {
            school,
            reviews,
            programs,
        })
    }

    pub async fn list(
        &self,
        search: Option<&str>,
        page: u32,
        per_page: u32,
    ) -> AppResult<SchoolPage> {
        let page = page.max(1);
        let (schools, total) = self.store.list_schools(search, page, per_page).await?;
        Ok(SchoolPage {
            schools,
            page,
            pages: (total as u64).div_ceil(per_page.max(1) as u64) as u32,
            total,
        })
    }

    pub async fn update(
        &self,
        viewer: &ViewerContext,
        id: SchoolId,
        profile: SchoolProfile,
    ) -> AppResult<School> {
        self.ensure_school_admin(viewer)?;
        if profile.name.trim().is_empty() {
            return Err(AppError::Validation(
                "School name must not be empty".to_string(),
            ));
        }

        if !self.store.update_school(id, &profile).await? {
            return Err(school_not_found(id));
        }
        self.load(id).await
    }

    /// Admin-only. Removes the school's reviews, programs and semesters with
    /// it; the cached rating goes with the row, so no recompute is needed.
    pub async fn delete(&self, viewer: &ViewerContext, id: SchoolId) -> AppResult<()> {
        self.ensure_school_admin(viewer)?;
        if !self.store.delete_school(id).await? {
            return Err(school_not_found(id));
        }
        Ok(())
    }

    fn ensure_school_admin(&self, viewer: &ViewerContext) -> AppResult<()> {
        if !viewer.is_school_admin {
            return Err(AppError::Forbidden(
                "Your permission does not allow this operation".to_string(),
            ));
        }
        Ok(())
    }

    async fn load(&self, id: SchoolId) -> AppResult<School> {
        self.store
            .get_school(id)
            .await?
            .ok_or_else(|| school_not_found(id))
    }
}

fn school_not_found(id: SchoolId) -> AppError {
    AppError::NotFound(format!("School {} not found", id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_takes_first_three_letters() {
        assert_eq!(mint_username("Abcdef College", 7), "AbcICE7");
    }

    #[test]
    fn short_names_keep_what_they_have() {
        assert_eq!(mint_username("Xy", 12), "XyICE12");
    }
}
