use std::sync::Arc;

use thiserror::Error;

use crate::{
    BookingStatus, Database, DatabaseError, NewReview, PrimaryKey, ReviewData,
};

/// Accepts reviews for completed bookings and keeps each tutor's average
/// rating in sync with them.
pub struct Reviews<Db> {
    db: Arc<Db>,
}

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Rating must be between 1 and 5")]
    RatingOutOfRange,
    #[error("Only completed bookings can be reviewed")]
    NotCompleted,
    #[error("This booking has already been reviewed")]
    AlreadyReviewed,
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

#[derive(Debug)]
pub struct NewReviewRequest {
    pub booking_id: PrimaryKey,
    pub rating: i32,
    pub comment: String,
}

/// Mean of the given ratings, rounded to two decimal places
fn average(ratings: &[i32]) -> f64 {
    if ratings.is_empty() {
        return 0.;
    }

    let sum: i32 = ratings.iter().sum();
    let mean = sum as f64 / ratings.len() as f64;

    (mean * 100.).round() / 100.
}

impl<Db> Reviews<Db>
where
    Db: Database,
{
    pub fn new(db: &Arc<Db>) -> Self {
        Self { db: db.clone() }
    }

    /// Stores a review for a completed booking and recomputes the tutor's
    /// average rating from every review on record.
    pub async fn create(
        &self,
        student_user_id: PrimaryKey,
        request: NewReviewRequest,
    ) -> Result<ReviewData, ReviewError> {
        if !(1..=5).contains(&request.rating) {
            return Err(ReviewError::RatingOutOfRange);
        }

        let student = self.db.student_by_user_id(student_user_id).await?;
        let booking = self.db.booking_by_id(request.booking_id).await?;

        if booking.status != BookingStatus::Completed {
            return Err(ReviewError::NotCompleted);
        }

        let review = self
            .db
            .create_review(NewReview {
                booking_id: booking.id,
                student_id: student.id,
                tutor_id: booking.tutor_id,
                rating: request.rating,
                comment: request.comment,
            })
            .await
            .map_err(|e| match e {
                DatabaseError::Conflict { .. } => ReviewError::AlreadyReviewed,
                e => ReviewError::Db(e),
            })?;

        let ratings = self.db.tutor_ratings(booking.tutor_id).await?;

        self.db
            .set_tutor_rating(booking.tutor_id, average(&ratings))
            .await?;

        Ok(review)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        MemoryDatabase, NewBooking, NewStudentProfile, NewTutorProfile, NewUser, UserRole,
    };
    use chrono::Utc;

    struct Fixture {
        db: Arc<MemoryDatabase>,
        reviews: Reviews<MemoryDatabase>,
        student_user_id: PrimaryKey,
        student_id: PrimaryKey,
        tutor_id: PrimaryKey,
    }

    async fn fixture() -> Fixture {
        let db = Arc::new(MemoryDatabase::new());
        let reviews = Reviews::new(&db);

        let student_user = db
            .create_user(NewUser {
                email: "student@example.com".to_string(),
                password: "hash".to_string(),
                role: UserRole::Student,
                full_name: "Sari Dewi".to_string(),
                phone: None,
            })
            .await
            .expect("creates user");

        let tutor_user = db
            .create_user(NewUser {
                email: "tutor@example.com".to_string(),
                password: "hash".to_string(),
                role: UserRole::Tutor,
                full_name: "Budi Santoso".to_string(),
                phone: None,
            })
            .await
            .expect("creates user");

        let student = db
            .create_student(NewStudentProfile {
                user_id: student_user.id,
                education_level: None,
                interests: None,
            })
            .await
            .expect("creates profile");

        let tutor = db
            .create_tutor(NewTutorProfile {
                user_id: tutor_user.id,
                specialization: None,
                cv_file_path: None,
                certificate_file_paths: vec![],
            })
            .await
            .expect("creates profile");

        Fixture {
            db,
            reviews,
            student_user_id: student_user.id,
            student_id: student.id,
            tutor_id: tutor.id,
        }
    }

    async fn completed_booking(fixture: &Fixture) -> PrimaryKey {
        let booking = fixture
            .db
            .create_booking(NewBooking {
                student_id: fixture.student_id,
                tutor_id: fixture.tutor_id,
                subject: "Calculus".to_string(),
                session_date: Utc::now(),
                duration_minutes: 60,
                notes: None,
            })
            .await
            .expect("creates booking");

        let confirmed = fixture
            .db
            .update_booking_status(booking.id, BookingStatus::Confirmed, booking.version)
            .await
            .expect("confirms");

        fixture
            .db
            .update_booking_status(booking.id, BookingStatus::Completed, confirmed.version)
            .await
            .expect("completes");

        booking.id
    }

    #[test]
    fn averages_are_rounded_to_two_places() {
        assert_eq!(average(&[]), 0.);
        assert_eq!(average(&[5]), 5.);
        assert_eq!(average(&[5, 3, 4]), 4.);
        assert_eq!(average(&[5, 4]), 4.5);
        assert_eq!(average(&[5, 5, 4]), 4.67);
    }

    #[tokio::test]
    async fn reviewing_recomputes_the_tutor_average() {
        let fixture = fixture().await;

        for rating in [5, 3, 4] {
            let booking_id = completed_booking(&fixture).await;

            fixture
                .reviews
                .create(
                    fixture.student_user_id,
                    NewReviewRequest {
                        booking_id,
                        rating,
                        comment: "Great session".to_string(),
                    },
                )
                .await
                .expect("creates review");
        }

        let tutor = fixture
            .db
            .tutor_by_id(fixture.tutor_id)
            .await
            .expect("fetches");

        assert_eq!(tutor.average_rating, 4.);
    }

    #[tokio::test]
    async fn only_completed_bookings_can_be_reviewed() {
        let fixture = fixture().await;

        let booking = fixture
            .db
            .create_booking(NewBooking {
                student_id: fixture.student_id,
                tutor_id: fixture.tutor_id,
                subject: "Calculus".to_string(),
                session_date: Utc::now(),
                duration_minutes: 60,
                notes: None,
            })
            .await
            .expect("creates booking");

        let result = fixture
            .reviews
            .create(
                fixture.student_user_id,
                NewReviewRequest {
                    booking_id: booking.id,
                    rating: 5,
                    comment: "Too early".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(ReviewError::NotCompleted)));

        // Rejection must not leave a review behind
        let stored = fixture.db.review_by_booking_id(booking.id).await;
        assert!(matches!(stored, Err(DatabaseError::NotFound { .. })));

        let tutor = fixture
            .db
            .tutor_by_id(fixture.tutor_id)
            .await
            .expect("fetches");
        assert_eq!(tutor.average_rating, 0.);
    }

    #[tokio::test]
    async fn a_booking_can_only_be_reviewed_once() {
        let fixture = fixture().await;
        let booking_id = completed_booking(&fixture).await;

        let request = |rating| NewReviewRequest {
            booking_id,
            rating,
            comment: "Great session".to_string(),
        };

        fixture
            .reviews
            .create(fixture.student_user_id, request(5))
            .await
            .expect("creates review");

        let result = fixture
            .reviews
            .create(fixture.student_user_id, request(1))
            .await;

        assert!(matches!(result, Err(ReviewError::AlreadyReviewed)));

        // The first rating still stands
        let tutor = fixture
            .db
            .tutor_by_id(fixture.tutor_id)
            .await
            .expect("fetches");
        assert_eq!(tutor.average_rating, 5.);
    }

    #[tokio::test]
    async fn out_of_range_ratings_are_rejected() {
        let fixture = fixture().await;
        let booking_id = completed_booking(&fixture).await;

        for rating in [0, 6, -1] {
            let result = fixture
                .reviews
                .create(
                    fixture.student_user_id,
                    NewReviewRequest {
                        booking_id,
                        rating,
                        comment: "Out of range".to_string(),
                    },
                )
                .await;

            assert!(matches!(result, Err(ReviewError::RatingOutOfRange)));
        }
    }
}
