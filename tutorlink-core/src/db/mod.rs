use async_trait::async_trait;
use thiserror::Error;

mod data;
pub use data::*;

mod memory;
pub use memory::*;

mod pg;
pub use pg::*;

pub type Result<T> = std::result::Result<T, DatabaseError>;

/// How many notifications a recent-notifications query returns at most
pub const RECENT_NOTIFICATION_LIMIT: usize = 20;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An unknown or internal error happened with the database
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A resource already exists, or a conditional write lost a race
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        /// The resource in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A resource in the database doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
}

/// Helper trait to reduce boilerplate
pub trait IntoDatabaseError {
    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError;
    fn any(self) -> DatabaseError;
}

/// Helper trait to reduce boilerplate
pub trait DatabaseResult {
    /// Turns the Result into a conflict error if it's Ok()
    fn conflict_or_ok(self, resource: &'static str, field: &'static str, value: &str)
        -> Result<()>;
}

impl<T> DatabaseResult for Result<T> {
    fn conflict_or_ok(
        self,
        resource: &'static str,
        field: &'static str,
        value: &str,
    ) -> Result<()> {
        match self {
            Ok(_) => Err(DatabaseError::Conflict {
                resource,
                field,
                value: value.to_string(),
            }),
            Err(e) => match e {
                DatabaseError::NotFound {
                    resource: _,
                    identifier: _,
                } => Ok(()),
                e => Err(e),
            },
        }
    }
}

/// Represents a type that can persist and fetch tutorlink data
#[async_trait]
pub trait Database: Send + Sync + 'static {
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData>;
    async fn user_by_email(&self, email: &str) -> Result<UserData>;
    async fn create_user(&self, new_user: NewUser) -> Result<UserData>;
    /// Recipients of registration notifications
    async fn list_admin_user_ids(&self) -> Result<Vec<PrimaryKey>>;

    async fn session_by_token(&self, token: &str) -> Result<SessionData>;
    async fn create_session(&self, new_session: NewSession) -> Result<SessionData>;
    async fn delete_session_by_token(&self, token: &str) -> Result<()>;
    async fn clear_expired_sessions(&self) -> Result<()>;

    async fn tutor_by_id(&self, tutor_id: PrimaryKey) -> Result<TutorProfileData>;
    async fn tutor_by_user_id(&self, user_id: PrimaryKey) -> Result<TutorProfileData>;
    async fn create_tutor(&self, new_tutor: NewTutorProfile) -> Result<TutorProfileData>;
    async fn update_tutor(&self, updated_tutor: UpdatedTutorProfile) -> Result<TutorProfileData>;
    /// Approved tutors matching the filter
    async fn list_tutors(&self, filter: TutorFilter) -> Result<Vec<TutorProfileData>>;
    async fn list_tutors_by_verification(
        &self,
        status: VerificationStatus,
    ) -> Result<Vec<TutorProfileData>>;
    async fn set_tutor_verification(
        &self,
        tutor_id: PrimaryKey,
        status: VerificationStatus,
    ) -> Result<TutorProfileData>;
    async fn set_tutor_rating(&self, tutor_id: PrimaryKey, rating: f64) -> Result<()>;
    async fn increment_tutor_sessions(&self, tutor_id: PrimaryKey) -> Result<()>;

    async fn student_by_id(&self, student_id: PrimaryKey) -> Result<StudentProfileData>;
    async fn student_by_user_id(&self, user_id: PrimaryKey) -> Result<StudentProfileData>;
    async fn create_student(&self, new_student: NewStudentProfile) -> Result<StudentProfileData>;

    async fn booking_by_id(&self, booking_id: PrimaryKey) -> Result<BookingData>;
    async fn create_booking(&self, new_booking: NewBooking) -> Result<BookingData>;
    async fn list_bookings_for_student(&self, student_id: PrimaryKey) -> Result<Vec<BookingData>>;
    async fn list_bookings_for_tutor(&self, tutor_id: PrimaryKey) -> Result<Vec<BookingData>>;
    /// Conditional update: only applies if the stored version still matches
    /// `expected_version`, incrementing it. A stale version is a [DatabaseError::Conflict].
    async fn update_booking_status(
        &self,
        booking_id: PrimaryKey,
        status: BookingStatus,
        expected_version: i32,
    ) -> Result<BookingData>;

    async fn review_by_booking_id(&self, booking_id: PrimaryKey) -> Result<ReviewData>;
    async fn create_review(&self, new_review: NewReview) -> Result<ReviewData>;
    /// Every rating ever given to the tutor, for recomputing the average
    async fn tutor_ratings(&self, tutor_id: PrimaryKey) -> Result<Vec<i32>>;

    async fn create_notification(
        &self,
        new_notification: NewNotification,
    ) -> Result<NotificationData>;
    /// The 20 most recent notifications for the user, newest first
    async fn recent_notifications(&self, user_id: PrimaryKey) -> Result<Vec<NotificationData>>;
    async fn mark_notification_read(
        &self,
        notification_id: PrimaryKey,
        user_id: PrimaryKey,
    ) -> Result<NotificationData>;
    async fn mark_all_notifications_read(&self, user_id: PrimaryKey) -> Result<()>;
}
