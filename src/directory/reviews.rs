// Review lifecycle: one review per user per school, author-only edits, and
// the school's cached rating rewritten from the full review set after every
// mutation.

use std::sync::Arc;

use crate::directory::rating;
use crate::error::{AppError, AppResult};
use crate::models::{Review, ReviewId, School, SchoolId, UserId};
use crate::store::DirectoryStore;
use crate::viewer::ViewerContext;

/// Does `actor` own `review`? Compares against the author snapshot captured
/// at creation time, not the live user record.
pub fn owns(actor: UserId, review: &Review) -> bool {
    review.author.id == actor
}

#[derive(Clone)]
pub struct Reviews {
    store: Arc<DirectoryStore>,
}

impl Reviews {
    pub fn new(store: Arc<DirectoryStore>) -> Self {
        Reviews { store }
    }

    /// Checked before rendering a new-review form and again before accepting
    /// the submission, since a submission can race the form render.
    pub async fn has_reviewed(&self, school_id: SchoolId, actor: UserId) -> AppResult<bool> {
        Ok(self
            .store
            .find_review_by_author(school_id, actor)
            .await?
            .is_some())
    }

    pub async fn list(&self, school_id: SchoolId) -> AppResult<Vec<Review>> {
        self.load_school(school_id).await?;
        Ok(self.store.reviews_for_school(school_id).await?)
    }

    pub async fn create(
        &self,
        viewer: &ViewerContext,
        school_id: SchoolId,
        rating_value: f64,
        body: String,
    ) -> AppResult<Review> {
        validate_rating(rating_value)?;
        self.load_school(school_id).await?;

        if self.has_reviewed(school_id, viewer.user_id).await? {
            return Err(duplicate_review(school_id));
        }

        let author = viewer.author_snapshot();
        let review = self
            .store
            .create_review(school_id, &author, rating_value, &body)
            .await?
            // A submission that raced our check hits the unique constraint.
            .ok_or_else(|| duplicate_review(school_id))?;

        self.recompute_rating(school_id).await?;
        Ok(review)
    }

    pub async fn update(
        &self,
        viewer: &ViewerContext,
        school_id: SchoolId,
        review_id: ReviewId,
        rating_value: f64,
        body: String,
    ) -> AppResult<Review> {
        validate_rating(rating_value)?;
        let review = self.ensure_owner(viewer.user_id, review_id).await?;
        if review.school_id != school_id {
            return Err(review_not_found(review_id));
        }

        self.store
            .update_review(review_id, rating_value, &body)
            .await?;
        self.recompute_rating(school_id).await?;

        self.store
            .get_review(review_id)
            .await?
            .ok_or_else(|| review_not_found(review_id))
    }

    /// Authors may delete their own review; a school admin may delete any.
    pub async fn delete(
        &self,
        viewer: &ViewerContext,
        school_id: SchoolId,
        review_id: ReviewId,
    ) -> AppResult<()> {
        let review = self
            .store
            .get_review(review_id)
            .await?
            .ok_or_else(|| review_not_found(review_id))?;

        if review.school_id != school_id {
            return Err(review_not_found(review_id));
        }
        if !owns(viewer.user_id, &review) && !viewer.is_school_admin {
            return Err(AppError::Forbidden(
                "You don't have permission to do that".to_string(),
            ));
        }

        self.store.delete_review(review_id).await?;
        self.recompute_rating(school_id).await?;
        Ok(())
    }

    /// Load a review and check ownership. A missing review is `NotFound`;
    /// an existing review by someone else is `Forbidden`. The caller can
    /// tell the two apart even though both end in an "operation denied"
    /// outcome for the user.
    pub async fn ensure_owner(&self, actor: UserId, review_id: ReviewId) -> AppResult<Review> {
        let review = self
            .store
            .get_review(review_id)
            .await?
            .ok_or_else(|| review_not_found(review_id))?;

        if !owns(actor, &review) {
            return Err(AppError::Forbidden(
                "You don't have permission to do that".to_string(),
            ));
        }
        Ok(review)
    }

    /// Rewrite the cached rating from the full review set read back from the
    /// store, never from an in-memory delta.
    async fn recompute_rating(&self, school_id: SchoolId) -> AppResult<()> {
        let reviews = self.store.reviews_for_school(school_id).await?;
        self.store
            .set_school_rating(school_id, rating::average(&reviews))
            .await?;
        Ok(())
    }

    async fn load_school(&self, school_id: SchoolId) -> AppResult<School> {
        self.store
            .get_school(school_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("School {} not found", school_id)))
    }
}

fn validate_rating(rating_value: f64) -> AppResult<()> {
    if !(1.0..=5.0).contains(&rating_value) {
        return Err(AppError::Validation(
            "Rating must be between 1 and 5".to_string(),
        ));
    }
    Ok(())
}

fn duplicate_review(school_id: SchoolId) -> AppError {
    AppError::DuplicateReview(format!(
        "You have already written a review for school {}. Please edit your review instead.",
        school_id
    ))
}

fn review_not_found(review_id: ReviewId) -> AppError {
    AppError::NotFound(format!("Review {} not found", review_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AuthorSnapshot;

    #[test]
    fn ownership_compares_snapshot_author_id() {
        let review = Review {
            id: 7,
            school_id: 1,
            author: AuthorSnapshot {
                id: 10,
                email: "a@example.com".to_string(),
                name: "A".to_string(),
            },
            rating: 4.0,
            body: "Good".to_string(),
            created: 0,
            updated: 0,
        };

        assert!(owns(10, &review));
        assert!(!owns(11, &review));
    }
}
