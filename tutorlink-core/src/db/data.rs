use std::collections::HashMap;
use std::fmt::{self, Display};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The type used for primary keys in the database.
pub type PrimaryKey = i32;

/// Weekly availability, keyed by day name. Each entry is a list of
/// "start-end" time ranges, for example "14:00-16:00".
pub type Availability = HashMap<String, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Tutor,
    Student,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "verification_status", rename_all = "lowercase")]
pub enum VerificationStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "booking_status", rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Tutor => "tutor",
            Self::Student => "student",
        }
    }
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Completed and cancelled bookings admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tutorlink account
#[derive(Debug, Clone, FromRow)]
pub struct UserData {
    pub id: PrimaryKey,
    /// Unique, used as the login identifier
    pub email: String,
    /// The argon2 hash, never the plain password
    pub password: String,
    pub role: UserRole,
    pub full_name: String,
    pub phone: Option<String>,
    /// Banned users cannot log in
    pub banned: bool,
    pub profile_picture: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Login session data for authentication
#[derive(Debug, Clone)]
pub struct SessionData {
    pub id: PrimaryKey,
    /// The session token, or key if you will
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// The user that is logged in
    pub user: UserData,
}

/// Role-specific extension of a user with role=tutor, 1:1 with the user row
#[derive(Debug, Clone)]
pub struct TutorProfileData {
    pub id: PrimaryKey,
    pub user_id: PrimaryKey,
    pub specialization: Option<String>,
    pub bio: Option<String>,
    pub experience_years: Option<i32>,
    pub hourly_rate: Option<f64>,
    /// Only approved tutors are searchable and bookable
    pub verification: VerificationStatus,
    pub cv_file_path: Option<String>,
    pub certificate_file_paths: Vec<String>,
    /// Mean of all review ratings, rounded to two decimal places
    pub average_rating: f64,
    pub total_sessions: i32,
    pub availability: Availability,
}

/// Role-specific extension of a user with role=student, 1:1 with the user row
#[derive(Debug, Clone, FromRow)]
pub struct StudentProfileData {
    pub id: PrimaryKey,
    pub user_id: PrimaryKey,
    pub education_level: Option<String>,
    pub interests: Option<String>,
}

/// A requested or scheduled tutoring session
#[derive(Debug, Clone, FromRow)]
pub struct BookingData {
    pub id: PrimaryKey,
    pub student_id: PrimaryKey,
    pub tutor_id: PrimaryKey,
    pub subject: String,
    pub session_date: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: BookingStatus,
    pub notes: Option<String>,
    /// Incremented on every status change, used to reject stale updates
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A review of a completed booking. One per booking, immutable.
#[derive(Debug, Clone, FromRow)]
pub struct ReviewData {
    pub id: PrimaryKey,
    pub booking_id: PrimaryKey,
    pub student_id: PrimaryKey,
    pub tutor_id: PrimaryKey,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// A durably stored message directed at one user
#[derive(Debug, Clone, FromRow)]
pub struct NotificationData {
    pub id: PrimaryKey,
    pub user_id: PrimaryKey,
    /// Free-text category, for example "new_booking" or "booking_update"
    pub kind: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub role: UserRole,
    pub full_name: String,
    pub phone: Option<String>,
}

#[derive(Debug)]
pub struct NewSession {
    pub token: String,
    pub user_id: PrimaryKey,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewTutorProfile {
    pub user_id: PrimaryKey,
    pub specialization: Option<String>,
    pub cv_file_path: Option<String>,
    pub certificate_file_paths: Vec<String>,
}

#[derive(Debug, Default)]
pub struct UpdatedTutorProfile {
    pub id: PrimaryKey,
    pub specialization: Option<String>,
    pub bio: Option<String>,
    pub experience_years: Option<i32>,
    pub hourly_rate: Option<f64>,
    pub availability: Option<Availability>,
}

#[derive(Debug)]
pub struct NewStudentProfile {
    pub user_id: PrimaryKey,
    pub education_level: Option<String>,
    pub interests: Option<String>,
}

#[derive(Debug)]
pub struct NewBooking {
    pub student_id: PrimaryKey,
    pub tutor_id: PrimaryKey,
    pub subject: String,
    pub session_date: DateTime<Utc>,
    pub duration_minutes: i32,
    pub notes: Option<String>,
}

#[derive(Debug)]
pub struct NewReview {
    pub booking_id: PrimaryKey,
    pub student_id: PrimaryKey,
    pub tutor_id: PrimaryKey,
    pub rating: i32,
    pub comment: String,
}

#[derive(Debug)]
pub struct NewNotification {
    pub user_id: PrimaryKey,
    pub kind: String,
    pub message: String,
}

/// Filters for the public tutor search. Only approved tutors are returned.
#[derive(Debug, Default)]
pub struct TutorFilter {
    /// Substring match on the specialization
    pub specialization: Option<String>,
    pub min_rating: Option<f64>,
}
