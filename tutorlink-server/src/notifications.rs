use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json,
};

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    serialized::{Notification, ToSerialized},
    sse::notification_stream,
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/notifications",
    tag = "notifications",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Notification>)
    )
)]
async fn list_notifications(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<Notification>>> {
    let notifications = context
        .marketplace
        .notifications
        .recent(session.user().id)
        .await?;

    Ok(Json(notifications.to_serialized()))
}

#[utoipa::path(
    put,
    path = "/v1/notifications/{id}/read",
    tag = "notifications",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Notification)
    )
)]
async fn mark_read(
    session: Session,
    State(context): State<ServerContext>,
    Path(notification_id): Path<i32>,
) -> ServerResult<Json<Notification>> {
    let notification = context
        .marketplace
        .notifications
        .mark_read(notification_id, session.user().id)
        .await?;

    Ok(Json(notification.to_serialized()))
}

#[utoipa::path(
    put,
    path = "/v1/notifications/read-all",
    tag = "notifications",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "All notifications were marked as read")
    )
)]
async fn mark_all_read(session: Session, State(context): State<ServerContext>) -> ServerResult<()> {
    context
        .marketplace
        .notifications
        .mark_all_read(session.user().id)
        .await?;

    Ok(())
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_notifications))
        .route("/stream", get(notification_stream))
        .route("/read-all", put(mark_all_read))
        .route("/:id/read", put(mark_read))
}
