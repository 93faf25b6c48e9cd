use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json,
};
use tutorlink_core::{NewBookingRequest, UserRole};

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    schemas::{NewBookingSchema, UpdateBookingSchema, ValidatedJson},
    serialized::{Booking, BookingEntry, ToSerialized},
    Router,
};

#[utoipa::path(
    post,
    path = "/v1/bookings",
    tag = "bookings",
    request_body = NewBookingSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 201, body = Booking)
    )
)]
async fn create_booking(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewBookingSchema>,
) -> ServerResult<(StatusCode, Json<Booking>)> {
    let student = session.require_role(UserRole::Student)?;

    let booking = context
        .marketplace
        .bookings
        .create(
            student.id,
            NewBookingRequest {
                tutor_id: body.tutor_id,
                subject: body.subject,
                session_date: body.session_date,
                duration_minutes: body.duration_minutes,
                notes: body.notes,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(booking.to_serialized())))
}

#[utoipa::path(
    get,
    path = "/v1/bookings",
    tag = "bookings",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<BookingEntry>)
    )
)]
async fn list_bookings(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<BookingEntry>>> {
    let bookings = context.marketplace.bookings.list_for(&session.user()).await?;

    Ok(Json(bookings.to_serialized()))
}

#[utoipa::path(
    put,
    path = "/v1/bookings/{id}",
    tag = "bookings",
    request_body = UpdateBookingSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Booking)
    )
)]
async fn update_booking(
    session: Session,
    State(context): State<ServerContext>,
    Path(booking_id): Path<i32>,
    ValidatedJson(body): ValidatedJson<UpdateBookingSchema>,
) -> ServerResult<Json<Booking>> {
    let booking = context
        .marketplace
        .bookings
        .update_status(&session.user(), booking_id, body.status)
        .await?;

    Ok(Json(booking.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_booking))
        .route("/", get(list_bookings))
        .route("/:id", put(update_booking))
}
