use argon2::{
    password_hash::{Encoding, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use chrono::{Duration, Utc};
use rand::rngs::OsRng;
use std::sync::Arc;
use thiserror::Error;

use crate::{
    util::random_string, Database, DatabaseError, NewSession, NewStudentProfile, NewTutorProfile,
    NewUser, Notifications, PrimaryKey, SessionData, UserData, UserRole,
};

pub struct Auth<Db> {
    db: Arc<Db>,
    notifications: Notifications<Db>,
    argon: Argon2<'static>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Email or password is incorrect
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("This account is banned")]
    Banned,
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(DatabaseError),
    #[error("HashError: {0}")]
    HashError(String),
}

impl<Db> Auth<Db>
where
    Db: Database,
{
    const SESSION_DURATION_IN_DAYS: usize = 7;

    pub fn new(db: &Arc<Db>, notifications: &Notifications<Db>) -> Self {
        Self {
            db: db.clone(),
            notifications: notifications.clone(),
            argon: Argon2::default(),
        }
    }

    /// Logs in a user, returning a new session
    pub async fn login(&self, credentials: Credentials) -> Result<SessionData, AuthError> {
        self.clear_expired().await;

        let user = self
            .db
            .user_by_email(&credentials.email)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound {
                    resource: _,
                    identifier: _,
                } => AuthError::InvalidCredentials,
                err => AuthError::Db(err),
            })?;

        let stored_password = PasswordHash::parse(&user.password, Encoding::default())
            .map_err(|e| AuthError::HashError(e.to_string()))?;

        self.argon
            .verify_password(credentials.password.as_bytes(), &stored_password)
            .map_err(|_| AuthError::InvalidCredentials)?;

        if user.banned {
            return Err(AuthError::Banned);
        }

        let expires_at = Utc::now() + Duration::days(Self::SESSION_DURATION_IN_DAYS as i64);

        let new_session = NewSession {
            token: random_string(32),
            user_id: user.id,
            expires_at,
        };

        let new_session = self
            .db
            .create_session(new_session)
            .await
            .map_err(AuthError::Db)?;

        Ok(new_session)
    }

    /// Deletes the associated session, if it exists
    pub async fn logout(&self, token: &str) -> Result<(), DatabaseError> {
        self.db.delete_session_by_token(token).await
    }

    /// Creates a user account along with its role profile. Registering a
    /// tutor puts every admin on notice so the verification queue is acted on.
    pub async fn register(&self, new_user: NewRegistration) -> Result<UserData, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hashed_password = self
            .argon
            .hash_password(new_user.password.as_bytes(), &salt)
            .map_err(|e| AuthError::HashError(e.to_string()))?
            .to_string();

        let user = self
            .db
            .create_user(NewUser {
                email: new_user.email,
                password: hashed_password,
                role: new_user.role,
                full_name: new_user.full_name,
                phone: Some(normalize_phone(&new_user.phone)),
            })
            .await
            .map_err(AuthError::Db)?;

        match new_user.role {
            UserRole::Student => {
                self.db
                    .create_student(NewStudentProfile {
                        user_id: user.id,
                        education_level: None,
                        interests: None,
                    })
                    .await
                    .map_err(AuthError::Db)?;
            }
            UserRole::Tutor => {
                self.db
                    .create_tutor(NewTutorProfile {
                        user_id: user.id,
                        specialization: new_user.specialization,
                        cv_file_path: new_user.cv_file_path,
                        certificate_file_paths: new_user.certificate_file_paths,
                    })
                    .await
                    .map_err(AuthError::Db)?;

                self.notifications
                    .notify_admins(
                        "tutor_registered",
                        &format!("New tutor registered: {}", user.full_name),
                    )
                    .await;
            }
            UserRole::Admin => {}
        }

        Ok(user)
    }

    /// Returns a session if it exists
    pub async fn session(&self, token: &str) -> Result<SessionData, DatabaseError> {
        self.db.session_by_token(token).await
    }

    pub async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData, DatabaseError> {
        self.db.user_by_id(user_id).await
    }

    async fn clear_expired(&self) {
        self.db
            .clear_expired_sessions()
            .await
            .expect("sessions are cleared")
    }
}

#[derive(Debug)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug)]
pub struct NewRegistration {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: UserRole,
    pub phone: String,
    pub specialization: Option<String>,
    pub cv_file_path: Option<String>,
    pub certificate_file_paths: Vec<String>,
}

/// Strips a leading international plus sign. A leading zero is assumed to be
/// an Indonesian number and is rewritten to the 62 country prefix.
fn normalize_phone(phone: &str) -> String {
    let trimmed = phone.trim();

    if let Some(rest) = trimmed.strip_prefix('+') {
        rest.to_string()
    } else if let Some(rest) = trimmed.strip_prefix('0') {
        format!("62{}", rest)
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryDatabase;

    fn auth() -> (Arc<MemoryDatabase>, Auth<MemoryDatabase>) {
        let db = Arc::new(MemoryDatabase::new());
        let notifications = Notifications::new(&db);
        (db.clone(), Auth::new(&db, &notifications))
    }

    fn registration(email: &str, role: UserRole, name: &str) -> NewRegistration {
        NewRegistration {
            email: email.to_string(),
            password: "hunter22".to_string(),
            full_name: name.to_string(),
            role,
            phone: "08123456789".to_string(),
            specialization: Some("Mathematics".to_string()),
            cv_file_path: None,
            certificate_file_paths: vec![],
        }
    }

    #[test]
    fn phone_normalization() {
        assert_eq!(normalize_phone("+4915112345"), "4915112345");
        assert_eq!(normalize_phone("08123456789"), "628123456789");
        assert_eq!(normalize_phone("628123456789"), "628123456789");
    }

    #[tokio::test]
    async fn register_and_login_round_trip() {
        let (_, auth) = auth();

        let user = auth
            .register(registration("student@example.com", UserRole::Student, "Sari"))
            .await
            .expect("registers");

        assert_eq!(user.role, UserRole::Student);
        assert_ne!(user.password, "hunter22");

        let session = auth
            .login(Credentials {
                email: "student@example.com".to_string(),
                password: "hunter22".to_string(),
            })
            .await
            .expect("logs in");

        assert_eq!(session.user.id, user.id);

        let wrong = auth
            .login(Credentials {
                email: "student@example.com".to_string(),
                password: "wrong".to_string(),
            })
            .await;

        assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn registering_a_tutor_notifies_each_admin() {
        let (db, auth) = auth();

        // No admins yet, so this one creates zero notifications
        auth.register(registration("first@example.com", UserRole::Tutor, "Budi"))
            .await
            .expect("registers");

        let admin = auth
            .register(registration("admin@example.com", UserRole::Admin, "Admin"))
            .await
            .expect("registers");

        assert!(db
            .recent_notifications(admin.id)
            .await
            .expect("fetches")
            .is_empty());

        auth.register(registration("second@example.com", UserRole::Tutor, "Wati"))
            .await
            .expect("registers");

        let inbox = db.recent_notifications(admin.id).await.expect("fetches");

        assert_eq!(inbox.len(), 1);
        assert!(inbox[0].message.contains("Wati"));
        assert_eq!(inbox[0].kind, "tutor_registered");
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let (_, auth) = auth();

        auth.register(registration("taken@example.com", UserRole::Student, "One"))
            .await
            .expect("registers");

        let result = auth
            .register(registration("taken@example.com", UserRole::Student, "Two"))
            .await;

        assert!(matches!(
            result,
            Err(AuthError::Db(DatabaseError::Conflict { .. }))
        ));
    }
}
