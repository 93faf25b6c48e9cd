use async_trait::async_trait;
use sqlx::{
    postgres::PgPoolOptions, query, query_as, query_scalar, types::Json, Error as SqlxError,
    FromRow, PgPool,
};

use super::RECENT_NOTIFICATION_LIMIT;
use crate::{
    Availability, BookingData, BookingStatus, Database, DatabaseError, DatabaseResult,
    IntoDatabaseError, NewBooking, NewNotification, NewReview, NewSession, NewStudentProfile,
    NewTutorProfile, NewUser, NotificationData, PrimaryKey, Result, ReviewData, SessionData,
    StudentProfileData, TutorFilter, TutorProfileData, UpdatedTutorProfile, UserData,
    VerificationStatus,
};

/// A postgres database implementation for tutorlink
pub struct PgDatabase {
    pool: PgPool,
}

/// Flattened sessions-join-users row
#[derive(FromRow)]
struct SessionRow {
    id: PrimaryKey,
    token: String,
    expires_at: chrono::DateTime<chrono::Utc>,
    user_id: PrimaryKey,
    email: String,
    password: String,
    role: crate::UserRole,
    full_name: String,
    phone: Option<String>,
    banned: bool,
    profile_picture: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<SessionRow> for SessionData {
    fn from(row: SessionRow) -> Self {
        SessionData {
            id: row.id,
            token: row.token,
            expires_at: row.expires_at,
            user: UserData {
                id: row.user_id,
                email: row.email,
                password: row.password,
                role: row.role,
                full_name: row.full_name,
                phone: row.phone,
                banned: row.banned,
                profile_picture: row.profile_picture,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        }
    }
}

/// Tutor row with the json columns still wrapped
#[derive(FromRow)]
struct TutorRow {
    id: PrimaryKey,
    user_id: PrimaryKey,
    specialization: Option<String>,
    bio: Option<String>,
    experience_years: Option<i32>,
    hourly_rate: Option<f64>,
    verification: VerificationStatus,
    cv_file_path: Option<String>,
    certificate_file_paths: Json<Vec<String>>,
    average_rating: f64,
    total_sessions: i32,
    availability: Json<Availability>,
}

impl From<TutorRow> for TutorProfileData {
    fn from(row: TutorRow) -> Self {
        TutorProfileData {
            id: row.id,
            user_id: row.user_id,
            specialization: row.specialization,
            bio: row.bio,
            experience_years: row.experience_years,
            hourly_rate: row.hourly_rate,
            verification: row.verification,
            cv_file_path: row.cv_file_path,
            certificate_file_paths: row.certificate_file_paths.0,
            average_rating: row.average_rating,
            total_sessions: row.total_sessions,
            availability: row.availability.0,
        }
    }
}

impl PgDatabase {
    pub async fn new(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| DatabaseError::Internal(Box::new(e)))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| DatabaseError::Internal(Box::new(e)))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData> {
        query_as::<_, UserData>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("user", "id"))
    }

    async fn user_by_email(&self, email: &str) -> Result<UserData> {
        query_as::<_, UserData>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("user", "email"))
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        self.user_by_email(&new_user.email)
            .await
            .conflict_or_ok("user", "email", &new_user.email)?;

        query_as::<_, UserData>(
            "INSERT INTO users (email, password, role, full_name, phone)
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(new_user.email)
        .bind(new_user.password)
        .bind(new_user.role)
        .bind(new_user.full_name)
        .bind(new_user.phone)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn list_admin_user_ids(&self) -> Result<Vec<PrimaryKey>> {
        query_scalar::<_, PrimaryKey>("SELECT id FROM users WHERE role = 'admin'")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())
    }

    async fn session_by_token(&self, token: &str) -> Result<SessionData> {
        query_as::<_, SessionRow>(
            "SELECT
                sessions.id, sessions.token, sessions.expires_at,
                users.id AS user_id, users.email, users.password, users.role,
                users.full_name, users.phone, users.banned, users.profile_picture,
                users.created_at, users.updated_at
            FROM sessions
                INNER JOIN users ON sessions.user_id = users.id
            WHERE token = $1",
        )
        .bind(token)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.not_found_or("session", "token"))
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        self.session_by_token(&new_session.token)
            .await
            .conflict_or_ok("session", "token", &new_session.token)?;

        let token = query_scalar::<_, String>(
            "INSERT INTO sessions (token, user_id, expires_at)
             VALUES ($1, $2, $3) RETURNING token",
        )
        .bind(new_session.token)
        .bind(new_session.user_id)
        .bind(new_session.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.session_by_token(&token).await
    }

    async fn delete_session_by_token(&self, token: &str) -> Result<()> {
        // Ensure session exists
        let _ = self.session_by_token(token).await?;

        query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn clear_expired_sessions(&self) -> Result<()> {
        query("DELETE FROM sessions WHERE now() > expires_at")
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn tutor_by_id(&self, tutor_id: PrimaryKey) -> Result<TutorProfileData> {
        query_as::<_, TutorRow>("SELECT * FROM tutors WHERE id = $1")
            .bind(tutor_id)
            .fetch_one(&self.pool)
            .await
            .map(Into::into)
            .map_err(|e| e.not_found_or("tutor", "id"))
    }

    async fn tutor_by_user_id(&self, user_id: PrimaryKey) -> Result<TutorProfileData> {
        query_as::<_, TutorRow>("SELECT * FROM tutors WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map(Into::into)
            .map_err(|e| e.not_found_or("tutor", "user_id"))
    }

    async fn create_tutor(&self, new_tutor: NewTutorProfile) -> Result<TutorProfileData> {
        self.tutor_by_user_id(new_tutor.user_id)
            .await
            .conflict_or_ok("tutor", "user_id", &new_tutor.user_id.to_string())?;

        query_as::<_, TutorRow>(
            "INSERT INTO tutors (user_id, specialization, cv_file_path, certificate_file_paths)
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(new_tutor.user_id)
        .bind(new_tutor.specialization)
        .bind(new_tutor.cv_file_path)
        .bind(Json(new_tutor.certificate_file_paths))
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.any())
    }

    async fn update_tutor(&self, updated_tutor: UpdatedTutorProfile) -> Result<TutorProfileData> {
        let tutor = self.tutor_by_id(updated_tutor.id).await?;

        query(
            "UPDATE tutors SET
                specialization = $1,
                bio = $2,
                experience_years = $3,
                hourly_rate = $4,
                availability = $5,
                updated_at = now()
            WHERE id = $6",
        )
        .bind(updated_tutor.specialization.or(tutor.specialization))
        .bind(updated_tutor.bio.or(tutor.bio))
        .bind(updated_tutor.experience_years.or(tutor.experience_years))
        .bind(updated_tutor.hourly_rate.or(tutor.hourly_rate))
        .bind(Json(updated_tutor.availability.unwrap_or(tutor.availability)))
        .bind(updated_tutor.id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.tutor_by_id(updated_tutor.id).await
    }

    async fn list_tutors(&self, filter: TutorFilter) -> Result<Vec<TutorProfileData>> {
        query_as::<_, TutorRow>(
            "SELECT * FROM tutors
            WHERE verification = 'approved'
                AND ($1::text IS NULL OR specialization ILIKE '%' || $1 || '%')
                AND ($2::float8 IS NULL OR average_rating >= $2)
            ORDER BY average_rating DESC, id",
        )
        .bind(filter.specialization)
        .bind(filter.min_rating)
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.into_iter().map(Into::into).collect())
        .map_err(|e| e.any())
    }

    async fn list_tutors_by_verification(
        &self,
        status: VerificationStatus,
    ) -> Result<Vec<TutorProfileData>> {
        query_as::<_, TutorRow>("SELECT * FROM tutors WHERE verification = $1 ORDER BY id")
            .bind(status)
            .fetch_all(&self.pool)
            .await
            .map(|rows| rows.into_iter().map(Into::into).collect())
            .map_err(|e| e.any())
    }

    async fn set_tutor_verification(
        &self,
        tutor_id: PrimaryKey,
        status: VerificationStatus,
    ) -> Result<TutorProfileData> {
        query_as::<_, TutorRow>(
            "UPDATE tutors SET verification = $2, updated_at = now()
             WHERE id = $1 RETURNING *",
        )
        .bind(tutor_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.not_found_or("tutor", "id"))
    }

    async fn set_tutor_rating(&self, tutor_id: PrimaryKey, rating: f64) -> Result<()> {
        query("UPDATE tutors SET average_rating = $2, updated_at = now() WHERE id = $1")
            .bind(tutor_id)
            .bind(rating)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn increment_tutor_sessions(&self, tutor_id: PrimaryKey) -> Result<()> {
        query("UPDATE tutors SET total_sessions = total_sessions + 1 WHERE id = $1")
            .bind(tutor_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn student_by_id(&self, student_id: PrimaryKey) -> Result<StudentProfileData> {
        query_as::<_, StudentProfileData>("SELECT * FROM students WHERE id = $1")
            .bind(student_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("student", "id"))
    }

    async fn student_by_user_id(&self, user_id: PrimaryKey) -> Result<StudentProfileData> {
        query_as::<_, StudentProfileData>("SELECT * FROM students WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("student", "user_id"))
    }

    async fn create_student(&self, new_student: NewStudentProfile) -> Result<StudentProfileData> {
        self.student_by_user_id(new_student.user_id)
            .await
            .conflict_or_ok("student", "user_id", &new_student.user_id.to_string())?;

        query_as::<_, StudentProfileData>(
            "INSERT INTO students (user_id, education_level, interests)
             VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(new_student.user_id)
        .bind(new_student.education_level)
        .bind(new_student.interests)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn booking_by_id(&self, booking_id: PrimaryKey) -> Result<BookingData> {
        query_as::<_, BookingData>("SELECT * FROM bookings WHERE id = $1")
            .bind(booking_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("booking", "id"))
    }

    async fn create_booking(&self, new_booking: NewBooking) -> Result<BookingData> {
        query_as::<_, BookingData>(
            "INSERT INTO bookings (student_id, tutor_id, subject, session_date, duration_minutes, notes)
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(new_booking.student_id)
        .bind(new_booking.tutor_id)
        .bind(new_booking.subject)
        .bind(new_booking.session_date)
        .bind(new_booking.duration_minutes)
        .bind(new_booking.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn list_bookings_for_student(&self, student_id: PrimaryKey) -> Result<Vec<BookingData>> {
        query_as::<_, BookingData>(
            "SELECT * FROM bookings WHERE student_id = $1 ORDER BY session_date DESC",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn list_bookings_for_tutor(&self, tutor_id: PrimaryKey) -> Result<Vec<BookingData>> {
        query_as::<_, BookingData>(
            "SELECT * FROM bookings WHERE tutor_id = $1 ORDER BY session_date DESC",
        )
        .bind(tutor_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn update_booking_status(
        &self,
        booking_id: PrimaryKey,
        status: BookingStatus,
        expected_version: i32,
    ) -> Result<BookingData> {
        query_as::<_, BookingData>(
            "UPDATE bookings SET status = $2, version = version + 1, updated_at = now()
             WHERE id = $1 AND version = $3 RETURNING *",
        )
        .bind(booking_id)
        .bind(status)
        .bind(expected_version)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            SqlxError::RowNotFound => DatabaseError::Conflict {
                resource: "booking",
                field: "version",
                value: expected_version.to_string(),
            },
            e => e.any(),
        })
    }

    async fn review_by_booking_id(&self, booking_id: PrimaryKey) -> Result<ReviewData> {
        query_as::<_, ReviewData>("SELECT * FROM reviews WHERE booking_id = $1")
            .bind(booking_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("review", "booking_id"))
    }

    async fn create_review(&self, new_review: NewReview) -> Result<ReviewData> {
        self.review_by_booking_id(new_review.booking_id)
            .await
            .conflict_or_ok("review", "booking_id", &new_review.booking_id.to_string())?;

        query_as::<_, ReviewData>(
            "INSERT INTO reviews (booking_id, student_id, tutor_id, rating, comment)
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(new_review.booking_id)
        .bind(new_review.student_id)
        .bind(new_review.tutor_id)
        .bind(new_review.rating)
        .bind(new_review.comment)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn tutor_ratings(&self, tutor_id: PrimaryKey) -> Result<Vec<i32>> {
        query_scalar::<_, i32>("SELECT rating FROM reviews WHERE tutor_id = $1")
            .bind(tutor_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())
    }

    async fn create_notification(
        &self,
        new_notification: NewNotification,
    ) -> Result<NotificationData> {
        query_as::<_, NotificationData>(
            "INSERT INTO notifications (user_id, kind, message)
             VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(new_notification.user_id)
        .bind(new_notification.kind)
        .bind(new_notification.message)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn recent_notifications(&self, user_id: PrimaryKey) -> Result<Vec<NotificationData>> {
        query_as::<_, NotificationData>(
            "SELECT * FROM notifications WHERE user_id = $1
             ORDER BY created_at DESC, id DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(RECENT_NOTIFICATION_LIMIT as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn mark_notification_read(
        &self,
        notification_id: PrimaryKey,
        user_id: PrimaryKey,
    ) -> Result<NotificationData> {
        query_as::<_, NotificationData>(
            "UPDATE notifications SET is_read = true
             WHERE id = $1 AND user_id = $2 RETURNING *",
        )
        .bind(notification_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("notification", "id"))
    }

    async fn mark_all_notifications_read(&self, user_id: PrimaryKey) -> Result<()> {
        query("UPDATE notifications SET is_read = true WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }
}

impl IntoDatabaseError for SqlxError {
    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }

    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError {
        match self {
            SqlxError::RowNotFound => DatabaseError::NotFound {
                resource,
                identifier,
            },
            e => Self::any(e),
        }
    }
}
