use axum::{extract::State, http::StatusCode, routing::post, Json};
use tutorlink_core::{NewReviewRequest, UserRole};

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    schemas::{NewReviewSchema, ValidatedJson},
    serialized::{Review, ToSerialized},
    Router,
};

#[utoipa::path(
    post,
    path = "/v1/reviews",
    tag = "reviews",
    request_body = NewReviewSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 201, body = Review)
    )
)]
async fn create_review(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewReviewSchema>,
) -> ServerResult<(StatusCode, Json<Review>)> {
    let student = session.require_role(UserRole::Student)?;

    let review = context
        .marketplace
        .reviews
        .create(
            student.id,
            NewReviewRequest {
                booking_id: body.booking_id,
                rating: body.rating,
                comment: body.comment,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(review.to_serialized())))
}

pub fn router() -> Router {
    Router::new().route("/", post(create_review))
}
