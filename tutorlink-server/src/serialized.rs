//! All schemas that are exposed from endpoints are defined here
//! along with the conversions from the core data types

use chrono::{DateTime, Utc};
use serde::Serialize;
use tutorlink_core::{
    Availability, BookingData, BookingView, NotificationData, ReviewData, SessionData,
    TutorListing, UserData,
};
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    id: i32,
    email: String,
    #[schema(value_type = String)]
    role: tutorlink_core::UserRole,
    full_name: String,
    phone: Option<String>,
    profile_picture: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    token: String,
    user: User,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tutor {
    id: i32,
    user_id: i32,
    full_name: String,
    specialization: Option<String>,
    bio: Option<String>,
    experience_years: Option<i32>,
    hourly_rate: Option<f64>,
    #[schema(value_type = String)]
    verification: tutorlink_core::VerificationStatus,
    average_rating: f64,
    total_sessions: i32,
    #[schema(value_type = Object)]
    availability: Availability,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    id: i32,
    student_id: i32,
    tutor_id: i32,
    subject: String,
    #[schema(value_type = String)]
    session_date: DateTime<Utc>,
    duration_minutes: i32,
    #[schema(value_type = String)]
    status: tutorlink_core::BookingStatus,
    notes: Option<String>,
    #[schema(value_type = String)]
    created_at: DateTime<Utc>,
    #[schema(value_type = String)]
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingEntry {
    counterparty_name: String,
    #[serde(flatten)]
    booking: Booking,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    id: i32,
    booking_id: i32,
    student_id: i32,
    tutor_id: i32,
    rating: i32,
    comment: String,
    #[schema(value_type = String)]
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    id: i32,
    kind: String,
    message: String,
    is_read: bool,
    #[schema(value_type = String)]
    created_at: DateTime<Utc>,
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl ToSerialized<User> for UserData {
    fn to_serialized(&self) -> User {
        User {
            id: self.id,
            email: self.email.clone(),
            role: self.role,
            full_name: self.full_name.clone(),
            phone: self.phone.clone(),
            profile_picture: self.profile_picture.clone(),
        }
    }
}

impl ToSerialized<LoginResult> for SessionData {
    fn to_serialized(&self) -> LoginResult {
        LoginResult {
            token: self.token.clone(),
            user: self.user.to_serialized(),
        }
    }
}

impl ToSerialized<Tutor> for TutorListing {
    fn to_serialized(&self) -> Tutor {
        Tutor {
            id: self.profile.id,
            user_id: self.profile.user_id,
            full_name: self.full_name.clone(),
            specialization: self.profile.specialization.clone(),
            bio: self.profile.bio.clone(),
            experience_years: self.profile.experience_years,
            hourly_rate: self.profile.hourly_rate,
            verification: self.profile.verification,
            average_rating: self.profile.average_rating,
            total_sessions: self.profile.total_sessions,
            availability: self.profile.availability.clone(),
        }
    }
}

impl ToSerialized<Booking> for BookingData {
    fn to_serialized(&self) -> Booking {
        Booking {
            id: self.id,
            student_id: self.student_id,
            tutor_id: self.tutor_id,
            subject: self.subject.clone(),
            session_date: self.session_date,
            duration_minutes: self.duration_minutes,
            status: self.status,
            notes: self.notes.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl ToSerialized<BookingEntry> for BookingView {
    fn to_serialized(&self) -> BookingEntry {
        BookingEntry {
            counterparty_name: self.counterparty_name.clone(),
            booking: self.booking.to_serialized(),
        }
    }
}

impl ToSerialized<Review> for ReviewData {
    fn to_serialized(&self) -> Review {
        Review {
            id: self.id,
            booking_id: self.booking_id,
            student_id: self.student_id,
            tutor_id: self.tutor_id,
            rating: self.rating,
            comment: self.comment.clone(),
            created_at: self.created_at,
        }
    }
}

impl ToSerialized<Notification> for NotificationData {
    fn to_serialized(&self) -> Notification {
        Notification {
            id: self.id,
            kind: self.kind.clone(),
            message: self.message.clone(),
            is_read: self.is_read,
            created_at: self.created_at,
        }
    }
}
