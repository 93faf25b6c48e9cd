use std::sync::Arc;

use log::warn;
use thiserror::Error;

use crate::{
    BookingData, BookingStatus, Database, DatabaseError, NewBooking, Notifications, PrimaryKey,
    UserData, UserRole,
};

/// The shortest session that can be booked
pub const MIN_DURATION_MINUTES: i32 = 30;
/// Used when no duration is supplied
pub const DEFAULT_DURATION_MINUTES: i32 = 60;

/// Drives the booking lifecycle: creation, role-scoped status transitions,
/// and the counterparty notifications each change fans out.
pub struct Bookings<Db> {
    db: Arc<Db>,
    notifications: Notifications<Db>,
}

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("Booking duration must be at least {MIN_DURATION_MINUTES} minutes")]
    DurationTooShort,
    #[error("Subject must not be empty")]
    EmptySubject,
    #[error("Booking does not belong to this {0}")]
    NotOwner(&'static str),
    #[error("A {current} booking cannot be changed to {requested} by this role")]
    TransitionNotAllowed {
        current: BookingStatus,
        requested: BookingStatus,
    },
    #[error("This role has no bookings")]
    InvalidRole,
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

/// A booking paired with the counterparty's display name, which is the
/// tutor's name when listed for a student and vice versa.
#[derive(Debug, Clone)]
pub struct BookingView {
    pub booking: BookingData,
    pub counterparty_name: String,
}

#[derive(Debug)]
pub struct NewBookingRequest {
    pub tutor_id: PrimaryKey,
    pub subject: String,
    pub session_date: chrono::DateTime<chrono::Utc>,
    pub duration_minutes: i32,
    pub notes: Option<String>,
}

/// The role-scoped transition table. Tutors move their own bookings through
/// confirmation and completion, students may only cancel, and the terminal
/// states admit nothing.
fn transition_allowed(current: BookingStatus, actor: UserRole, requested: BookingStatus) -> bool {
    use BookingStatus::*;

    match (current, actor, requested) {
        (Pending, UserRole::Tutor, Confirmed | Cancelled) => true,
        (Pending, UserRole::Student, Cancelled) => true,
        (Confirmed, UserRole::Tutor, Completed | Cancelled) => true,
        _ => false,
    }
}

impl<Db> Bookings<Db>
where
    Db: Database,
{
    pub fn new(db: &Arc<Db>, notifications: &Notifications<Db>) -> Self {
        Self {
            db: db.clone(),
            notifications: notifications.clone(),
        }
    }

    /// Creates a pending booking on behalf of the student user and puts the
    /// tutor on notice. The caller must already be role-gated to a student.
    pub async fn create(
        &self,
        student_user_id: PrimaryKey,
        request: NewBookingRequest,
    ) -> Result<BookingData, BookingError> {
        if request.duration_minutes < MIN_DURATION_MINUTES {
            return Err(BookingError::DurationTooShort);
        }

        if request.subject.trim().is_empty() {
            return Err(BookingError::EmptySubject);
        }

        let student = self.db.student_by_user_id(student_user_id).await?;
        let tutor = self.db.tutor_by_id(request.tutor_id).await?;

        let booking = self
            .db
            .create_booking(NewBooking {
                student_id: student.id,
                tutor_id: tutor.id,
                subject: request.subject,
                session_date: request.session_date,
                duration_minutes: request.duration_minutes,
                notes: request.notes,
            })
            .await?;

        let student_name = self
            .db
            .user_by_id(student_user_id)
            .await
            .map(|u| u.full_name)
            .unwrap_or_else(|_| "A student".to_string());

        self.notifications
            .notify(
                tutor.user_id,
                "new_booking",
                &format!(
                    "New booking request: {} from {}",
                    booking.subject, student_name
                ),
            )
            .await;

        Ok(booking)
    }

    /// Applies a status transition for the acting user, enforcing ownership
    /// and the transition table, then notifies the counterparty.
    ///
    /// The update is conditional on the version the booking was read at, so
    /// two racing updates cannot both win; the loser gets a conflict.
    pub async fn update_status(
        &self,
        actor: &UserData,
        booking_id: PrimaryKey,
        requested: BookingStatus,
    ) -> Result<BookingData, BookingError> {
        let booking = self.db.booking_by_id(booking_id).await?;

        match actor.role {
            UserRole::Tutor => {
                let profile = self
                    .db
                    .tutor_by_user_id(actor.id)
                    .await
                    .map_err(|_| BookingError::NotOwner("tutor"))?;

                if profile.id != booking.tutor_id {
                    return Err(BookingError::NotOwner("tutor"));
                }
            }
            UserRole::Student => {
                let profile = self
                    .db
                    .student_by_user_id(actor.id)
                    .await
                    .map_err(|_| BookingError::NotOwner("student"))?;

                if profile.id != booking.student_id {
                    return Err(BookingError::NotOwner("student"));
                }
            }
            UserRole::Admin => return Err(BookingError::NotOwner("participant")),
        }

        if !transition_allowed(booking.status, actor.role, requested) {
            return Err(BookingError::TransitionNotAllowed {
                current: booking.status,
                requested,
            });
        }

        let updated = self
            .db
            .update_booking_status(booking_id, requested, booking.version)
            .await?;

        if requested == BookingStatus::Completed {
            if let Err(e) = self.db.increment_tutor_sessions(booking.tutor_id).await {
                warn!(
                    "Failed to bump session count for tutor {}: {}",
                    booking.tutor_id, e
                );
            }
        }

        // A counterparty that cannot be resolved simply gets no notification
        match actor.role {
            UserRole::Tutor => {
                if let Ok(student) = self.db.student_by_id(booking.student_id).await {
                    self.notifications
                        .notify(
                            student.user_id,
                            "booking_update",
                            &format!(
                                "Your booking for {} was {}.",
                                booking.subject, requested
                            ),
                        )
                        .await;
                }
            }
            UserRole::Student => {
                if let Ok(tutor) = self.db.tutor_by_id(booking.tutor_id).await {
                    self.notifications
                        .notify(
                            tutor.user_id,
                            "booking_update",
                            &format!(
                                "Booking for {} was {} by student.",
                                booking.subject, requested
                            ),
                        )
                        .await;
                }
            }
            UserRole::Admin => {}
        }

        Ok(updated)
    }

    /// Lists the acting user's bookings with counterparty names attached.
    /// A user without the matching profile simply has no bookings.
    pub async fn list_for(&self, actor: &UserData) -> Result<Vec<BookingView>, BookingError> {
        let bookings = match actor.role {
            UserRole::Student => match self.db.student_by_user_id(actor.id).await {
                Ok(profile) => self.db.list_bookings_for_student(profile.id).await?,
                Err(DatabaseError::NotFound { .. }) => return Ok(vec![]),
                Err(e) => return Err(e.into()),
            },
            UserRole::Tutor => match self.db.tutor_by_user_id(actor.id).await {
                Ok(profile) => self.db.list_bookings_for_tutor(profile.id).await?,
                Err(DatabaseError::NotFound { .. }) => return Ok(vec![]),
                Err(e) => return Err(e.into()),
            },
            UserRole::Admin => return Err(BookingError::InvalidRole),
        };

        let mut views = Vec::with_capacity(bookings.len());

        for booking in bookings {
            let counterparty_user_id = match actor.role {
                UserRole::Student => self.db.tutor_by_id(booking.tutor_id).await?.user_id,
                _ => self.db.student_by_id(booking.student_id).await?.user_id,
            };

            let counterparty_name = self.db.user_by_id(counterparty_user_id).await?.full_name;

            views.push(BookingView {
                booking,
                counterparty_name,
            });
        }

        Ok(views)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryDatabase, NewStudentProfile, NewTutorProfile, NewUser};
    use chrono::Utc;

    struct Fixture {
        db: Arc<MemoryDatabase>,
        bookings: Bookings<MemoryDatabase>,
        student_user: UserData,
        tutor_user: UserData,
        tutor_id: PrimaryKey,
    }

    async fn fixture() -> Fixture {
        let db = Arc::new(MemoryDatabase::new());
        let notifications = Notifications::new(&db);
        let bookings = Bookings::new(&db, &notifications);

        let student_user = db
            .create_user(NewUser {
                email: "student@example.com".to_string(),
                password: "hash".to_string(),
                role: UserRole::Student,
                full_name: "Sari Dewi".to_string(),
                phone: None,
            })
            .await
            .expect("creates student user");

        let tutor_user = db
            .create_user(NewUser {
                email: "tutor@example.com".to_string(),
                password: "hash".to_string(),
                role: UserRole::Tutor,
                full_name: "Budi Santoso".to_string(),
                phone: None,
            })
            .await
            .expect("creates tutor user");

        db.create_student(NewStudentProfile {
            user_id: student_user.id,
            education_level: None,
            interests: None,
        })
        .await
        .expect("creates student profile");

        let tutor = db
            .create_tutor(NewTutorProfile {
                user_id: tutor_user.id,
                specialization: Some("Calculus".to_string()),
                cv_file_path: None,
                certificate_file_paths: vec![],
            })
            .await
            .expect("creates tutor profile");

        Fixture {
            db,
            bookings,
            student_user,
            tutor_user,
            tutor_id: tutor.id,
        }
    }

    fn request(fixture: &Fixture, subject: &str) -> NewBookingRequest {
        NewBookingRequest {
            tutor_id: fixture.tutor_id,
            subject: subject.to_string(),
            session_date: Utc::now(),
            duration_minutes: DEFAULT_DURATION_MINUTES,
            notes: None,
        }
    }

    #[tokio::test]
    async fn create_starts_pending_and_notifies_the_tutor() {
        let fixture = fixture().await;

        let booking = fixture
            .bookings
            .create(fixture.student_user.id, request(&fixture, "Calculus"))
            .await
            .expect("creates");

        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.duration_minutes, 60);

        let inbox = fixture
            .db
            .recent_notifications(fixture.tutor_user.id)
            .await
            .expect("fetches");

        assert_eq!(inbox.len(), 1);
        assert!(inbox[0]
            .message
            .contains("New booking request: Calculus from Sari Dewi"));
    }

    #[tokio::test]
    async fn create_rejects_short_durations_and_empty_subjects() {
        let fixture = fixture().await;

        let mut short = request(&fixture, "Calculus");
        short.duration_minutes = 15;

        assert!(matches!(
            fixture.bookings.create(fixture.student_user.id, short).await,
            Err(BookingError::DurationTooShort)
        ));

        assert!(matches!(
            fixture
                .bookings
                .create(fixture.student_user.id, request(&fixture, "  "))
                .await,
            Err(BookingError::EmptySubject)
        ));
    }

    #[tokio::test]
    async fn student_may_only_cancel() {
        let fixture = fixture().await;

        let booking = fixture
            .bookings
            .create(fixture.student_user.id, request(&fixture, "Calculus"))
            .await
            .expect("creates");

        let result = fixture
            .bookings
            .update_status(&fixture.student_user, booking.id, BookingStatus::Confirmed)
            .await;

        assert!(matches!(
            result,
            Err(BookingError::TransitionNotAllowed { .. })
        ));

        // The failed attempt must leave the booking untouched
        let unchanged = fixture.db.booking_by_id(booking.id).await.expect("fetches");
        assert_eq!(unchanged.status, BookingStatus::Pending);
        assert_eq!(unchanged.version, 0);

        fixture
            .bookings
            .update_status(&fixture.student_user, booking.id, BookingStatus::Cancelled)
            .await
            .expect("cancels");
    }

    #[tokio::test]
    async fn tutor_confirms_then_completes_with_notifications() {
        let fixture = fixture().await;

        let booking = fixture
            .bookings
            .create(fixture.student_user.id, request(&fixture, "Calculus"))
            .await
            .expect("creates");

        let confirmed = fixture
            .bookings
            .update_status(&fixture.tutor_user, booking.id, BookingStatus::Confirmed)
            .await
            .expect("confirms");

        assert_eq!(confirmed.status, BookingStatus::Confirmed);
        assert_eq!(confirmed.version, 1);

        let inbox = fixture
            .db
            .recent_notifications(fixture.student_user.id)
            .await
            .expect("fetches");

        assert_eq!(inbox.len(), 1);
        assert_eq!(
            inbox[0].message,
            "Your booking for Calculus was confirmed."
        );

        let completed = fixture
            .bookings
            .update_status(&fixture.tutor_user, booking.id, BookingStatus::Completed)
            .await
            .expect("completes");

        assert_eq!(completed.status, BookingStatus::Completed);

        let tutor = fixture
            .db
            .tutor_by_id(fixture.tutor_id)
            .await
            .expect("fetches");
        assert_eq!(tutor.total_sessions, 1);
    }

    #[tokio::test]
    async fn terminal_states_admit_no_transitions() {
        let fixture = fixture().await;

        let booking = fixture
            .bookings
            .create(fixture.student_user.id, request(&fixture, "Calculus"))
            .await
            .expect("creates");

        fixture
            .bookings
            .update_status(&fixture.tutor_user, booking.id, BookingStatus::Cancelled)
            .await
            .expect("cancels");

        for requested in [
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::Completed,
        ] {
            let result = fixture
                .bookings
                .update_status(&fixture.tutor_user, booking.id, requested)
                .await;

            assert!(matches!(
                result,
                Err(BookingError::TransitionNotAllowed { .. })
            ));
        }
    }

    #[tokio::test]
    async fn a_stranger_tutor_is_not_an_owner() {
        let fixture = fixture().await;

        let booking = fixture
            .bookings
            .create(fixture.student_user.id, request(&fixture, "Calculus"))
            .await
            .expect("creates");

        let other_user = fixture
            .db
            .create_user(NewUser {
                email: "other@example.com".to_string(),
                password: "hash".to_string(),
                role: UserRole::Tutor,
                full_name: "Other Tutor".to_string(),
                phone: None,
            })
            .await
            .expect("creates user");

        fixture
            .db
            .create_tutor(NewTutorProfile {
                user_id: other_user.id,
                specialization: None,
                cv_file_path: None,
                certificate_file_paths: vec![],
            })
            .await
            .expect("creates profile");

        let result = fixture
            .bookings
            .update_status(&other_user, booking.id, BookingStatus::Confirmed)
            .await;

        assert!(matches!(result, Err(BookingError::NotOwner(_))));
    }

    #[tokio::test]
    async fn stale_version_updates_are_conflicts() {
        let fixture = fixture().await;

        let booking = fixture
            .bookings
            .create(fixture.student_user.id, request(&fixture, "Calculus"))
            .await
            .expect("creates");

        // First writer wins and bumps the version
        fixture
            .db
            .update_booking_status(booking.id, BookingStatus::Confirmed, booking.version)
            .await
            .expect("updates");

        let result = fixture
            .db
            .update_booking_status(booking.id, BookingStatus::Cancelled, booking.version)
            .await;

        assert!(matches!(result, Err(DatabaseError::Conflict { .. })));
    }

    #[tokio::test]
    async fn listing_attaches_counterparty_names() {
        let fixture = fixture().await;

        fixture
            .bookings
            .create(fixture.student_user.id, request(&fixture, "Calculus"))
            .await
            .expect("creates");

        let student_view = fixture
            .bookings
            .list_for(&fixture.student_user)
            .await
            .expect("lists");

        assert_eq!(student_view.len(), 1);
        assert_eq!(student_view[0].counterparty_name, "Budi Santoso");

        let tutor_view = fixture
            .bookings
            .list_for(&fixture.tutor_user)
            .await
            .expect("lists");

        assert_eq!(tutor_view.len(), 1);
        assert_eq!(tutor_view[0].counterparty_name, "Sari Dewi");
    }
}
