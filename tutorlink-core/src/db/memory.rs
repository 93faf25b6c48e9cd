use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use super::RECENT_NOTIFICATION_LIMIT;
use crate::{
    BookingData, BookingStatus, Database, DatabaseError, DatabaseResult, NewBooking,
    NewNotification, NewReview, NewSession, NewStudentProfile, NewTutorProfile, NewUser,
    NotificationData, PrimaryKey, Result, ReviewData, SessionData, StudentProfileData, TutorFilter,
    TutorProfileData, UpdatedTutorProfile, UserData, VerificationStatus,
};

/// An in-memory database implementation, used by the test suites.
/// Every table is a mutex-guarded vec, ids come from one shared counter.
#[derive(Default)]
pub struct MemoryDatabase {
    users: Mutex<Vec<UserData>>,
    sessions: Mutex<Vec<StoredSession>>,
    tutors: Mutex<Vec<TutorProfileData>>,
    students: Mutex<Vec<StudentProfileData>>,
    bookings: Mutex<Vec<BookingData>>,
    reviews: Mutex<Vec<ReviewData>>,
    notifications: Mutex<Vec<NotificationData>>,
    next_id: AtomicI32,
}

#[derive(Debug, Clone)]
struct StoredSession {
    id: PrimaryKey,
    token: String,
    user_id: PrimaryKey,
    expires_at: chrono::DateTime<chrono::Utc>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> PrimaryKey {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn not_found(resource: &'static str, identifier: &'static str) -> DatabaseError {
        DatabaseError::NotFound {
            resource,
            identifier,
        }
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData> {
        self.users
            .lock()
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or(Self::not_found("user", "id"))
    }

    async fn user_by_email(&self, email: &str) -> Result<UserData> {
        self.users
            .lock()
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(Self::not_found("user", "email"))
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        self.user_by_email(&new_user.email)
            .await
            .conflict_or_ok("user", "email", &new_user.email)?;

        let now = Utc::now();
        let user = UserData {
            id: self.next_id(),
            email: new_user.email,
            password: new_user.password,
            role: new_user.role,
            full_name: new_user.full_name,
            phone: new_user.phone,
            banned: false,
            profile_picture: None,
            created_at: now,
            updated_at: now,
        };

        self.users.lock().push(user.clone());
        Ok(user)
    }

    async fn list_admin_user_ids(&self) -> Result<Vec<PrimaryKey>> {
        Ok(self
            .users
            .lock()
            .iter()
            .filter(|u| u.role == crate::UserRole::Admin)
            .map(|u| u.id)
            .collect())
    }

    async fn session_by_token(&self, token: &str) -> Result<SessionData> {
        let stored = self
            .sessions
            .lock()
            .iter()
            .find(|s| s.token == token)
            .cloned()
            .ok_or(Self::not_found("session", "token"))?;

        let user = self.user_by_id(stored.user_id).await?;

        Ok(SessionData {
            id: stored.id,
            token: stored.token,
            expires_at: stored.expires_at,
            user,
        })
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        self.session_by_token(&new_session.token)
            .await
            .conflict_or_ok("session", "token", &new_session.token)?;

        let stored = StoredSession {
            id: self.next_id(),
            token: new_session.token,
            user_id: new_session.user_id,
            expires_at: new_session.expires_at,
        };

        let token = stored.token.clone();
        self.sessions.lock().push(stored);

        self.session_by_token(&token).await
    }

    async fn delete_session_by_token(&self, token: &str) -> Result<()> {
        let _ = self.session_by_token(token).await?;
        self.sessions.lock().retain(|s| s.token != token);
        Ok(())
    }

    async fn clear_expired_sessions(&self) -> Result<()> {
        let now = Utc::now();
        self.sessions.lock().retain(|s| s.expires_at > now);
        Ok(())
    }

    async fn tutor_by_id(&self, tutor_id: PrimaryKey) -> Result<TutorProfileData> {
        self.tutors
            .lock()
            .iter()
            .find(|t| t.id == tutor_id)
            .cloned()
            .ok_or(Self::not_found("tutor", "id"))
    }

    async fn tutor_by_user_id(&self, user_id: PrimaryKey) -> Result<TutorProfileData> {
        self.tutors
            .lock()
            .iter()
            .find(|t| t.user_id == user_id)
            .cloned()
            .ok_or(Self::not_found("tutor", "user_id"))
    }

    async fn create_tutor(&self, new_tutor: NewTutorProfile) -> Result<TutorProfileData> {
        self.tutor_by_user_id(new_tutor.user_id)
            .await
            .conflict_or_ok("tutor", "user_id", &new_tutor.user_id.to_string())?;

        let tutor = TutorProfileData {
            id: self.next_id(),
            user_id: new_tutor.user_id,
            specialization: new_tutor.specialization,
            bio: None,
            experience_years: None,
            hourly_rate: None,
            verification: VerificationStatus::Pending,
            cv_file_path: new_tutor.cv_file_path,
            certificate_file_paths: new_tutor.certificate_file_paths,
            average_rating: 0.0,
            total_sessions: 0,
            availability: Default::default(),
        };

        self.tutors.lock().push(tutor.clone());
        Ok(tutor)
    }

    async fn update_tutor(&self, updated_tutor: UpdatedTutorProfile) -> Result<TutorProfileData> {
        let mut tutors = self.tutors.lock();
        let tutor = tutors
            .iter_mut()
            .find(|t| t.id == updated_tutor.id)
            .ok_or(Self::not_found("tutor", "id"))?;

        tutor.specialization = updated_tutor.specialization.or(tutor.specialization.take());
        tutor.bio = updated_tutor.bio.or(tutor.bio.take());
        tutor.experience_years = updated_tutor.experience_years.or(tutor.experience_years);
        tutor.hourly_rate = updated_tutor.hourly_rate.or(tutor.hourly_rate);

        if let Some(availability) = updated_tutor.availability {
            tutor.availability = availability;
        }

        Ok(tutor.clone())
    }

    async fn list_tutors(&self, filter: TutorFilter) -> Result<Vec<TutorProfileData>> {
        let needle = filter.specialization.map(|s| s.to_lowercase());

        let mut tutors: Vec<_> = self
            .tutors
            .lock()
            .iter()
            .filter(|t| t.verification == VerificationStatus::Approved)
            .filter(|t| match &needle {
                Some(needle) => t
                    .specialization
                    .as_ref()
                    .is_some_and(|s| s.to_lowercase().contains(needle)),
                None => true,
            })
            .filter(|t| match filter.min_rating {
                Some(min) => t.average_rating >= min,
                None => true,
            })
            .cloned()
            .collect();

        tutors.sort_by(|a, b| {
            b.average_rating
                .partial_cmp(&a.average_rating)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });

        Ok(tutors)
    }

    async fn list_tutors_by_verification(
        &self,
        status: VerificationStatus,
    ) -> Result<Vec<TutorProfileData>> {
        Ok(self
            .tutors
            .lock()
            .iter()
            .filter(|t| t.verification == status)
            .cloned()
            .collect())
    }

    async fn set_tutor_verification(
        &self,
        tutor_id: PrimaryKey,
        status: VerificationStatus,
    ) -> Result<TutorProfileData> {
        let mut tutors = self.tutors.lock();
        let tutor = tutors
            .iter_mut()
            .find(|t| t.id == tutor_id)
            .ok_or(Self::not_found("tutor", "id"))?;

        tutor.verification = status;
        Ok(tutor.clone())
    }

    async fn set_tutor_rating(&self, tutor_id: PrimaryKey, rating: f64) -> Result<()> {
        let mut tutors = self.tutors.lock();
        let tutor = tutors
            .iter_mut()
            .find(|t| t.id == tutor_id)
            .ok_or(Self::not_found("tutor", "id"))?;

        tutor.average_rating = rating;
        Ok(())
    }

    async fn increment_tutor_sessions(&self, tutor_id: PrimaryKey) -> Result<()> {
        let mut tutors = self.tutors.lock();
        let tutor = tutors
            .iter_mut()
            .find(|t| t.id == tutor_id)
            .ok_or(Self::not_found("tutor", "id"))?;

        tutor.total_sessions += 1;
        Ok(())
    }

    async fn student_by_id(&self, student_id: PrimaryKey) -> Result<StudentProfileData> {
        self.students
            .lock()
            .iter()
            .find(|s| s.id == student_id)
            .cloned()
            .ok_or(Self::not_found("student", "id"))
    }

    async fn student_by_user_id(&self, user_id: PrimaryKey) -> Result<StudentProfileData> {
        self.students
            .lock()
            .iter()
            .find(|s| s.user_id == user_id)
            .cloned()
            .ok_or(Self::not_found("student", "user_id"))
    }

    async fn create_student(&self, new_student: NewStudentProfile) -> Result<StudentProfileData> {
        self.student_by_user_id(new_student.user_id)
            .await
            .conflict_or_ok("student", "user_id", &new_student.user_id.to_string())?;

        let student = StudentProfileData {
            id: self.next_id(),
            user_id: new_student.user_id,
            education_level: new_student.education_level,
            interests: new_student.interests,
        };

        self.students.lock().push(student.clone());
        Ok(student)
    }

    async fn booking_by_id(&self, booking_id: PrimaryKey) -> Result<BookingData> {
        self.bookings
            .lock()
            .iter()
            .find(|b| b.id == booking_id)
            .cloned()
            .ok_or(Self::not_found("booking", "id"))
    }

    async fn create_booking(&self, new_booking: NewBooking) -> Result<BookingData> {
        let now = Utc::now();
        let booking = BookingData {
            id: self.next_id(),
            student_id: new_booking.student_id,
            tutor_id: new_booking.tutor_id,
            subject: new_booking.subject,
            session_date: new_booking.session_date,
            duration_minutes: new_booking.duration_minutes,
            status: BookingStatus::Pending,
            notes: new_booking.notes,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        self.bookings.lock().push(booking.clone());
        Ok(booking)
    }

    async fn list_bookings_for_student(&self, student_id: PrimaryKey) -> Result<Vec<BookingData>> {
        let mut bookings: Vec<_> = self
            .bookings
            .lock()
            .iter()
            .filter(|b| b.student_id == student_id)
            .cloned()
            .collect();

        bookings.sort_by(|a, b| b.session_date.cmp(&a.session_date));
        Ok(bookings)
    }

    async fn list_bookings_for_tutor(&self, tutor_id: PrimaryKey) -> Result<Vec<BookingData>> {
        let mut bookings: Vec<_> = self
            .bookings
            .lock()
            .iter()
            .filter(|b| b.tutor_id == tutor_id)
            .cloned()
            .collect();

        bookings.sort_by(|a, b| b.session_date.cmp(&a.session_date));
        Ok(bookings)
    }

    async fn update_booking_status(
        &self,
        booking_id: PrimaryKey,
        status: BookingStatus,
        expected_version: i32,
    ) -> Result<BookingData> {
        let mut bookings = self.bookings.lock();
        let booking = bookings
            .iter_mut()
            .find(|b| b.id == booking_id)
            .ok_or(Self::not_found("booking", "id"))?;

        if booking.version != expected_version {
            return Err(DatabaseError::Conflict {
                resource: "booking",
                field: "version",
                value: expected_version.to_string(),
            });
        }

        booking.status = status;
        booking.version += 1;
        booking.updated_at = Utc::now();

        Ok(booking.clone())
    }

    async fn review_by_booking_id(&self, booking_id: PrimaryKey) -> Result<ReviewData> {
        self.reviews
            .lock()
            .iter()
            .find(|r| r.booking_id == booking_id)
            .cloned()
            .ok_or(Self::not_found("review", "booking_id"))
    }

    async fn create_review(&self, new_review: NewReview) -> Result<ReviewData> {
        self.review_by_booking_id(new_review.booking_id)
            .await
            .conflict_or_ok("review", "booking_id", &new_review.booking_id.to_string())?;

        let review = ReviewData {
            id: self.next_id(),
            booking_id: new_review.booking_id,
            student_id: new_review.student_id,
            tutor_id: new_review.tutor_id,
            rating: new_review.rating,
            comment: new_review.comment,
            created_at: Utc::now(),
        };

        self.reviews.lock().push(review.clone());
        Ok(review)
    }

    async fn tutor_ratings(&self, tutor_id: PrimaryKey) -> Result<Vec<i32>> {
        Ok(self
            .reviews
            .lock()
            .iter()
            .filter(|r| r.tutor_id == tutor_id)
            .map(|r| r.rating)
            .collect())
    }

    async fn create_notification(
        &self,
        new_notification: NewNotification,
    ) -> Result<NotificationData> {
        let notification = NotificationData {
            id: self.next_id(),
            user_id: new_notification.user_id,
            kind: new_notification.kind,
            message: new_notification.message,
            is_read: false,
            created_at: Utc::now(),
        };

        self.notifications.lock().push(notification.clone());
        Ok(notification)
    }

    async fn recent_notifications(&self, user_id: PrimaryKey) -> Result<Vec<NotificationData>> {
        let mut notifications: Vec<_> = self
            .notifications
            .lock()
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();

        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        notifications.truncate(RECENT_NOTIFICATION_LIMIT);

        Ok(notifications)
    }

    async fn mark_notification_read(
        &self,
        notification_id: PrimaryKey,
        user_id: PrimaryKey,
    ) -> Result<NotificationData> {
        let mut notifications = self.notifications.lock();
        let notification = notifications
            .iter_mut()
            .find(|n| n.id == notification_id && n.user_id == user_id)
            .ok_or(Self::not_found("notification", "id"))?;

        notification.is_read = true;
        Ok(notification.clone())
    }

    async fn mark_all_notifications_read(&self, user_id: PrimaryKey) -> Result<()> {
        for notification in self
            .notifications
            .lock()
            .iter_mut()
            .filter(|n| n.user_id == user_id)
        {
            notification.is_read = true;
        }

        Ok(())
    }
}
