use chrono::Utc;
use tutorlink_core::{
    BookingError, BookingStatus, Credentials, Marketplace, MemoryDatabase, NewBookingRequest,
    NewRegistration, NewReviewRequest, TutorFilter, UserData, UserRole, VerificationStatus,
};

fn registration(email: &str, role: UserRole, name: &str) -> NewRegistration {
    NewRegistration {
        email: email.to_string(),
        password: "hunter22".to_string(),
        full_name: name.to_string(),
        role,
        phone: "08123456789".to_string(),
        specialization: Some("Mathematics".to_string()),
        cv_file_path: Some("uploads/cv.pdf".to_string()),
        certificate_file_paths: vec!["uploads/cert.pdf".to_string()],
    }
}

async fn login(marketplace: &Marketplace<MemoryDatabase>, email: &str) -> UserData {
    let session = marketplace
        .auth
        .login(Credentials {
            email: email.to_string(),
            password: "hunter22".to_string(),
        })
        .await
        .expect("logs in");

    session.user
}

#[tokio::test]
async fn a_booking_runs_its_full_course() {
    let marketplace = Marketplace::new(MemoryDatabase::new());

    marketplace
        .auth
        .register(registration("admin@example.com", UserRole::Admin, "Admin"))
        .await
        .expect("registers admin");

    let tutor_user = marketplace
        .auth
        .register(registration("budi@example.com", UserRole::Tutor, "Budi"))
        .await
        .expect("registers tutor");

    let student_user = marketplace
        .auth
        .register(registration("sari@example.com", UserRole::Student, "Sari"))
        .await
        .expect("registers student");

    // The admin learns about the new tutor and approves them
    let admin = login(&marketplace, "admin@example.com").await;

    let admin_inbox = marketplace
        .notifications
        .recent(admin.id)
        .await
        .expect("fetches");

    assert_eq!(admin_inbox.len(), 1);
    assert!(admin_inbox[0].message.contains("Budi"));

    let pending = marketplace.tutors.list_pending().await.expect("lists");
    assert_eq!(pending.len(), 1);

    marketplace
        .tutors
        .decide_verification(pending[0].profile.id, VerificationStatus::Approved)
        .await
        .expect("approves");

    // The student finds the tutor and books a session
    let listings = marketplace
        .tutors
        .search(TutorFilter {
            specialization: Some("math".to_string()),
            min_rating: None,
        })
        .await
        .expect("searches");

    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].full_name, "Budi");

    let booking = marketplace
        .bookings
        .create(
            student_user.id,
            NewBookingRequest {
                tutor_id: listings[0].profile.id,
                subject: "Calculus".to_string(),
                session_date: Utc::now(),
                duration_minutes: 60,
                notes: None,
            },
        )
        .await
        .expect("creates booking");

    assert_eq!(booking.status, BookingStatus::Pending);

    let tutor_inbox = marketplace
        .notifications
        .recent(tutor_user.id)
        .await
        .expect("fetches");

    // Approval notification plus the booking request
    assert_eq!(tutor_inbox.len(), 2);
    assert!(tutor_inbox[0]
        .message
        .contains("New booking request: Calculus from Sari"));

    // The student cannot confirm their own booking
    let forbidden = marketplace
        .bookings
        .update_status(&student_user, booking.id, BookingStatus::Confirmed)
        .await;

    assert!(matches!(
        forbidden,
        Err(BookingError::TransitionNotAllowed { .. })
    ));

    // The tutor confirms and later completes the session
    marketplace
        .bookings
        .update_status(&tutor_user, booking.id, BookingStatus::Confirmed)
        .await
        .expect("confirms");

    let student_inbox = marketplace
        .notifications
        .recent(student_user.id)
        .await
        .expect("fetches");

    assert_eq!(
        student_inbox[0].message,
        "Your booking for Calculus was confirmed."
    );

    marketplace
        .bookings
        .update_status(&tutor_user, booking.id, BookingStatus::Completed)
        .await
        .expect("completes");

    // The student reviews the completed session
    marketplace
        .reviews
        .create(
            student_user.id,
            NewReviewRequest {
                booking_id: booking.id,
                rating: 5,
                comment: "Very clear explanations".to_string(),
            },
        )
        .await
        .expect("creates review");

    let tutor = marketplace
        .tutors
        .by_id(listings[0].profile.id)
        .await
        .expect("fetches");

    assert_eq!(tutor.profile.average_rating, 5.);
    assert_eq!(tutor.profile.total_sessions, 1);
}
