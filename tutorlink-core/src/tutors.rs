use std::sync::Arc;

use thiserror::Error;

use crate::{
    Database, DatabaseError, Notifications, PrimaryKey, TutorFilter, TutorProfileData,
    UpdatedTutorProfile, VerificationStatus,
};

/// The public tutor directory and the admin verification queue.
pub struct Tutors<Db> {
    db: Arc<Db>,
    notifications: Notifications<Db>,
}

#[derive(Debug, Error)]
pub enum TutorError {
    #[error("Verification decisions cannot be pending")]
    InvalidDecision,
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

/// A tutor profile paired with the account's display name
#[derive(Debug, Clone)]
pub struct TutorListing {
    pub profile: TutorProfileData,
    pub full_name: String,
}

impl<Db> Tutors<Db>
where
    Db: Database,
{
    pub fn new(db: &Arc<Db>, notifications: &Notifications<Db>) -> Self {
        Self {
            db: db.clone(),
            notifications: notifications.clone(),
        }
    }

    /// Approved tutors matching the filter, with names attached
    pub async fn search(&self, filter: TutorFilter) -> Result<Vec<TutorListing>, DatabaseError> {
        let profiles = self.db.list_tutors(filter).await?;

        self.with_names(profiles).await
    }

    pub async fn by_id(&self, tutor_id: PrimaryKey) -> Result<TutorListing, DatabaseError> {
        let profile = self.db.tutor_by_id(tutor_id).await?;
        let full_name = self.db.user_by_id(profile.user_id).await?.full_name;

        Ok(TutorListing { profile, full_name })
    }

    /// Tutors still waiting on a verification decision
    pub async fn list_pending(&self) -> Result<Vec<TutorListing>, DatabaseError> {
        let profiles = self
            .db
            .list_tutors_by_verification(VerificationStatus::Pending)
            .await?;

        self.with_names(profiles).await
    }

    /// Approves or rejects a tutor and tells them about it
    pub async fn decide_verification(
        &self,
        tutor_id: PrimaryKey,
        decision: VerificationStatus,
    ) -> Result<TutorProfileData, TutorError> {
        if decision == VerificationStatus::Pending {
            return Err(TutorError::InvalidDecision);
        }

        let profile = self.db.set_tutor_verification(tutor_id, decision).await?;

        self.notifications
            .notify(
                profile.user_id,
                "verification",
                &format!("Your tutor verification was {}.", decision),
            )
            .await;

        Ok(profile)
    }

    /// Updates the profile owned by the given user
    pub async fn update_own_profile(
        &self,
        user_id: PrimaryKey,
        mut update: UpdatedTutorProfile,
    ) -> Result<TutorProfileData, DatabaseError> {
        let profile = self.db.tutor_by_user_id(user_id).await?;

        update.id = profile.id;
        self.db.update_tutor(update).await
    }

    async fn with_names(
        &self,
        profiles: Vec<TutorProfileData>,
    ) -> Result<Vec<TutorListing>, DatabaseError> {
        let mut listings = Vec::with_capacity(profiles.len());

        for profile in profiles {
            let full_name = self.db.user_by_id(profile.user_id).await?.full_name;

            listings.push(TutorListing { profile, full_name });
        }

        Ok(listings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryDatabase, NewTutorProfile, NewUser, UserRole};

    struct Fixture {
        db: Arc<MemoryDatabase>,
        tutors: Tutors<MemoryDatabase>,
    }

    async fn fixture() -> Fixture {
        let db = Arc::new(MemoryDatabase::new());
        let notifications = Notifications::new(&db);
        let tutors = Tutors::new(&db, &notifications);

        Fixture { db, tutors }
    }

    async fn add_tutor(fixture: &Fixture, name: &str, specialization: &str) -> TutorProfileData {
        let user = fixture
            .db
            .create_user(NewUser {
                email: format!("{}@example.com", name.to_lowercase()),
                password: "hash".to_string(),
                role: UserRole::Tutor,
                full_name: name.to_string(),
                phone: None,
            })
            .await
            .expect("creates user");

        fixture
            .db
            .create_tutor(NewTutorProfile {
                user_id: user.id,
                specialization: Some(specialization.to_string()),
                cv_file_path: None,
                certificate_file_paths: vec![],
            })
            .await
            .expect("creates profile")
    }

    #[tokio::test]
    async fn search_only_returns_approved_tutors() {
        let fixture = fixture().await;

        let approved = add_tutor(&fixture, "Budi", "Mathematics").await;
        add_tutor(&fixture, "Wati", "Physics").await;

        fixture
            .tutors
            .decide_verification(approved.id, VerificationStatus::Approved)
            .await
            .expect("approves");

        let results = fixture
            .tutors
            .search(TutorFilter::default())
            .await
            .expect("searches");

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].full_name, "Budi");
    }

    #[tokio::test]
    async fn search_filters_by_specialization_and_rating() {
        let fixture = fixture().await;

        let math = add_tutor(&fixture, "Budi", "Mathematics").await;
        let physics = add_tutor(&fixture, "Wati", "Physics").await;

        for tutor in [&math, &physics] {
            fixture
                .tutors
                .decide_verification(tutor.id, VerificationStatus::Approved)
                .await
                .expect("approves");
        }

        fixture
            .db
            .set_tutor_rating(math.id, 4.5)
            .await
            .expect("sets rating");

        let by_subject = fixture
            .tutors
            .search(TutorFilter {
                specialization: Some("math".to_string()),
                min_rating: None,
            })
            .await
            .expect("searches");

        assert_eq!(by_subject.len(), 1);
        assert_eq!(by_subject[0].full_name, "Budi");

        let by_rating = fixture
            .tutors
            .search(TutorFilter {
                specialization: None,
                min_rating: Some(4.),
            })
            .await
            .expect("searches");

        assert_eq!(by_rating.len(), 1);
        assert_eq!(by_rating[0].profile.id, math.id);
    }

    #[tokio::test]
    async fn verification_decisions_leave_the_pending_queue_and_notify() {
        let fixture = fixture().await;

        let tutor = add_tutor(&fixture, "Budi", "Mathematics").await;

        assert_eq!(fixture.tutors.list_pending().await.expect("lists").len(), 1);

        let rejected = fixture
            .tutors
            .decide_verification(tutor.id, VerificationStatus::Rejected)
            .await
            .expect("rejects");

        assert_eq!(rejected.verification, VerificationStatus::Rejected);
        assert!(fixture.tutors.list_pending().await.expect("lists").is_empty());

        let inbox = fixture
            .db
            .recent_notifications(tutor.user_id)
            .await
            .expect("fetches");

        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].message, "Your tutor verification was rejected.");
        assert_eq!(inbox[0].kind, "verification");
    }

    #[tokio::test]
    async fn pending_is_not_a_decision() {
        let fixture = fixture().await;

        let tutor = add_tutor(&fixture, "Budi", "Mathematics").await;

        let result = fixture
            .tutors
            .decide_verification(tutor.id, VerificationStatus::Pending)
            .await;

        assert!(matches!(result, Err(TutorError::InvalidDecision)));
    }
}
