use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, State},
    http::{header, request::Parts},
    routing::{get, post},
    Json,
};
use tutorlink_core::{Credentials, NewRegistration, SessionData, UserData, UserRole};

use crate::{
    context::ServerContext,
    errors::{ServerError, ServerResult},
    schemas::{LoginSchema, RegisterSchema, ValidatedJson},
    serialized::{LoginResult, ToSerialized, User},
    Router,
};

/// Wraps [SessionData] so [FromRequestParts] can be implemented for it
pub struct Session(SessionData);

impl Session {
    /// Returns the user of the session
    pub fn user(&self) -> UserData {
        self.0.user.clone()
    }

    pub fn token(&self) -> &str {
        &self.0.token
    }

    /// Returns the user if it has the given role, refusing the request
    /// otherwise. A wrong role is treated the same as no session at all.
    pub fn require_role(&self, role: UserRole) -> ServerResult<UserData> {
        if self.0.user.role != role {
            return Err(ServerError::Unauthorized(
                "This route requires a different role",
            ));
        }

        Ok(self.user())
    }
}

#[async_trait]
impl FromRequestParts<ServerContext> for Session {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerContext,
    ) -> Result<Self, Self::Rejection> {
        let context = ServerContext::from_ref(state);

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|x| x.to_str().ok())
            .ok_or(ServerError::Unauthorized("Missing authorization"))?;

        let parts: Vec<_> = token.split_ascii_whitespace().collect();

        if parts.first() != Some(&"Bearer") {
            return Err(ServerError::Unauthorized("Authorization must be Bearer"));
        }

        let token = parts.last().cloned().unwrap_or_default();

        let session = context
            .marketplace
            .auth
            .session(token)
            .await
            .map_err(|_| ServerError::Unauthorized("Session does not exist"))?;

        Ok(Self(session))
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/register",
    tag = "auth",
    request_body = RegisterSchema,
    responses(
        (status = 201, body = User)
    )
)]
async fn register(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<RegisterSchema>,
) -> ServerResult<(axum::http::StatusCode, Json<User>)> {
    let user = context
        .marketplace
        .auth
        .register(NewRegistration {
            email: body.email,
            password: body.password,
            full_name: body.full_name,
            role: body.role,
            phone: body.phone,
            specialization: body.specialization,
            cv_file_path: body.cv_file_path,
            certificate_file_paths: body.certificate_file_paths,
        })
        .await?;

    Ok((axum::http::StatusCode::CREATED, Json(user.to_serialized())))
}

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    tag = "auth",
    request_body = LoginSchema,
    responses(
        (status = 200, body = LoginResult)
    )
)]
async fn login(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<LoginSchema>,
) -> ServerResult<Json<LoginResult>> {
    let session = context
        .marketplace
        .auth
        .login(Credentials {
            email: body.email,
            password: body.password,
        })
        .await?;

    Ok(Json(session.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    tag = "auth",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "Session was deleted")
    )
)]
async fn logout(session: Session, State(context): State<ServerContext>) -> ServerResult<()> {
    context.marketplace.auth.logout(session.token()).await?;

    Ok(())
}

#[utoipa::path(
    get,
    path = "/v1/auth/user",
    tag = "auth",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = User)
    )
)]
async fn user(session: Session) -> Json<User> {
    Json(session.user().to_serialized())
}

pub fn router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/user", get(user))
}
