use crate::models::Review;

/// Arithmetic mean of the review ratings; 0 for an empty set. The cached
/// school rating must always equal this function applied to the school's
/// current review set.
pub fn average(reviews: &[Review]) -> f64 {
    if reviews.is_empty() {
        return 0.0;
    }
    let sum: f64 = reviews.iter().map(|review| review.rating).sum();
    sum / reviews.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AuthorSnapshot;

    fn review(rating: f64) -> Review {
        Review {
            id: 0,
            school_id: 1,
            author: AuthorSnapshot {
                id: 1,
                email: "a@example.com".to_string(),
                name: "A".to_string(),
            },
            rating,
            body: String::new(),
            created: 0,
            updated: 0,
        }
    }

    #[test]
    fn empty_set_is_zero() {
        assert_eq!(average(&[]), 0.0);
    }

    #[test]
    fn mean_of_ratings() {
        let reviews = vec![review(5.0), review(3.0), review(4.0)];
        assert_eq!(average(&reviews), 4.0);
    }

    #[test]
    fn single_review_is_its_rating() {
        assert_eq!(average(&[review(2.0)]), 2.0);
    }
}
