use std::{convert::Infallible, time::Duration};

use axum::{
    extract::State,
    http::header,
    response::{
        sse::{Event, KeepAlive},
        IntoResponse, Sse,
    },
};
use futures_util::stream;
use log::warn;
use tokio::time::sleep;

use crate::{
    auth::Session,
    context::ServerContext,
    serialized::{Notification, ToSerialized},
};

/// How often the feed re-reads the notification table
const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Remembers the last payload pushed to a feed connection, so identical
/// consecutive polls collapse into a single push.
pub struct Snapshot {
    last: Option<String>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self { last: None }
    }

    /// Serializes the notifications and returns the payload only if it
    /// differs from what was pushed last.
    pub fn advance(&mut self, notifications: &[Notification]) -> Option<String> {
        let serialized = serde_json::to_string(notifications).expect("serializes properly");

        if self.last.as_deref() == Some(serialized.as_str()) {
            return None;
        }

        self.last = Some(serialized.clone());
        Some(serialized)
    }
}

#[utoipa::path(
    get,
    path = "/v1/notifications/stream",
    tag = "notifications",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (
            status = 200,
            content_type = "text/event-stream",
            description = "A live feed of the caller's recent notifications",
            body = Vec<Notification>
        )
    )
)]
pub async fn notification_stream(
    session: Session,
    State(context): State<ServerContext>,
) -> impl IntoResponse {
    let user_id = session.user().id;
    let marketplace = context.marketplace.clone();

    // First poll happens immediately, every following one after the interval.
    // The stream ends when the client disconnects and drops it.
    let stream = stream::unfold(
        (Snapshot::new(), true, marketplace),
        move |(mut snapshot, mut first, marketplace)| async move {
            loop {
                if !first {
                    sleep(POLL_INTERVAL).await;
                }

                first = false;

                let recent = match marketplace.notifications.recent(user_id).await {
                    Ok(recent) => recent,
                    Err(e) => {
                        warn!("Failed to poll notifications for user {}: {}", user_id, e);
                        continue;
                    }
                };

                if let Some(payload) = snapshot.advance(&recent.to_serialized()) {
                    return Some((
                        Ok::<_, Infallible>(Event::default().data(payload)),
                        (snapshot, first, marketplace),
                    ));
                }
            }
        },
    );

    (
        [(header::CACHE_CONTROL, "no-cache, no-transform")],
        Sse::new(stream).keep_alive(KeepAlive::default()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tutorlink_core::NotificationData;

    fn notification(id: i32, message: &str) -> Notification {
        NotificationData {
            id,
            user_id: 1,
            kind: "test".to_string(),
            message: message.to_string(),
            is_read: false,
            created_at: Utc::now(),
        }
        .to_serialized()
    }

    #[test]
    fn identical_polls_collapse_into_one_push() {
        let mut snapshot = Snapshot::new();
        let feed = vec![notification(1, "hello")];

        assert!(snapshot.advance(&feed).is_some());
        assert!(snapshot.advance(&feed).is_none());
        assert!(snapshot.advance(&feed).is_none());
    }

    #[test]
    fn a_changed_feed_pushes_again() {
        let mut snapshot = Snapshot::new();

        let first = vec![notification(1, "hello")];
        let second = vec![notification(2, "world"), notification(1, "hello")];

        assert!(snapshot.advance(&first).is_some());

        let payload = snapshot.advance(&second).expect("pushes the change");
        assert!(payload.contains("world"));

        assert!(snapshot.advance(&second).is_none());
    }

    #[test]
    fn the_empty_feed_is_pushed_once() {
        let mut snapshot = Snapshot::new();

        assert_eq!(snapshot.advance(&[]).as_deref(), Some("[]"));
        assert!(snapshot.advance(&[]).is_none());
    }
}
