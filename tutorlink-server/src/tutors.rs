use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json,
};
use serde::Deserialize;
use tutorlink_core::{TutorFilter, UpdatedTutorProfile, UserRole};
use utoipa::IntoParams;

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    schemas::{UpdateTutorSchema, ValidatedJson, VerifySchema},
    serialized::{ToSerialized, Tutor},
    Router,
};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct TutorSearchQuery {
    pub specialization: Option<String>,
    pub min_rating: Option<f64>,
}

#[utoipa::path(
    get,
    path = "/v1/tutors",
    tag = "tutors",
    params(TutorSearchQuery),
    responses(
        (status = 200, body = Vec<Tutor>)
    )
)]
async fn search_tutors(
    State(context): State<ServerContext>,
    Query(query): Query<TutorSearchQuery>,
) -> ServerResult<Json<Vec<Tutor>>> {
    let tutors = context
        .marketplace
        .tutors
        .search(TutorFilter {
            specialization: query.specialization,
            min_rating: query.min_rating,
        })
        .await?;

    Ok(Json(tutors.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/tutors/pending",
    tag = "tutors",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Tutor>)
    )
)]
async fn pending_tutors(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<Tutor>>> {
    session.require_role(UserRole::Admin)?;

    let tutors = context.marketplace.tutors.list_pending().await?;

    Ok(Json(tutors.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/tutors/{id}",
    tag = "tutors",
    responses(
        (status = 200, body = Tutor)
    )
)]
async fn tutor(
    State(context): State<ServerContext>,
    Path(tutor_id): Path<i32>,
) -> ServerResult<Json<Tutor>> {
    let tutor = context.marketplace.tutors.by_id(tutor_id).await?;

    Ok(Json(tutor.to_serialized()))
}

#[utoipa::path(
    put,
    path = "/v1/tutors/{id}/verify",
    tag = "tutors",
    request_body = VerifySchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "Verification decision was applied")
    )
)]
async fn verify_tutor(
    session: Session,
    State(context): State<ServerContext>,
    Path(tutor_id): Path<i32>,
    ValidatedJson(body): ValidatedJson<VerifySchema>,
) -> ServerResult<()> {
    session.require_role(UserRole::Admin)?;

    context
        .marketplace
        .tutors
        .decide_verification(tutor_id, body.status)
        .await?;

    Ok(())
}

#[utoipa::path(
    put,
    path = "/v1/tutors/{id}",
    tag = "tutors",
    request_body = UpdateTutorSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "Profile was updated")
    )
)]
async fn update_tutor(
    session: Session,
    State(context): State<ServerContext>,
    Path(_tutor_id): Path<i32>,
    ValidatedJson(body): ValidatedJson<UpdateTutorSchema>,
) -> ServerResult<()> {
    let user = session.require_role(UserRole::Tutor)?;

    context
        .marketplace
        .tutors
        .update_own_profile(
            user.id,
            UpdatedTutorProfile {
                specialization: body.specialization,
                bio: body.bio,
                experience_years: body.experience_years,
                hourly_rate: body.hourly_rate,
                availability: body.availability,
                ..Default::default()
            },
        )
        .await?;

    Ok(())
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(search_tutors))
        .route("/pending", get(pending_tutors))
        .route("/:id", get(tutor))
        .route("/:id/verify", put(verify_tutor))
        .route("/:id", put(update_tutor))
}
