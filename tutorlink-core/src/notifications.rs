use std::sync::Arc;

use log::warn;

use crate::{Database, DatabaseError, NewNotification, NotificationData, PrimaryKey};

/// Writes and reads the per-user notification feed.
///
/// Writes are best-effort by design: a notification is never essential to
/// the operation that triggered it, so a failed insert is logged and
/// swallowed instead of surfacing to the caller.
pub struct Notifications<Db> {
    db: Arc<Db>,
}

impl<Db> Notifications<Db>
where
    Db: Database,
{
    pub fn new(db: &Arc<Db>) -> Self {
        Self { db: db.clone() }
    }

    /// Appends one unread notification for the user
    pub async fn notify(&self, user_id: PrimaryKey, kind: &str, message: &str) {
        let result = self
            .db
            .create_notification(NewNotification {
                user_id,
                kind: kind.to_string(),
                message: message.to_string(),
            })
            .await;

        if let Err(e) = result {
            warn!(
                "Failed to write {} notification for user {}: {}",
                kind, user_id, e
            );
        }
    }

    /// Appends one unread notification for every admin account
    pub async fn notify_admins(&self, kind: &str, message: &str) {
        match self.db.list_admin_user_ids().await {
            Ok(admin_ids) => {
                for admin_id in admin_ids {
                    self.notify(admin_id, kind, message).await;
                }
            }
            Err(e) => warn!("Failed to resolve admin recipients: {}", e),
        }
    }

    /// The 20 most recent notifications for the user, newest first
    pub async fn recent(&self, user_id: PrimaryKey) -> Result<Vec<NotificationData>, DatabaseError> {
        self.db.recent_notifications(user_id).await
    }

    /// Marks one notification as read. The notification must belong to the
    /// caller, otherwise this is a not found error.
    pub async fn mark_read(
        &self,
        notification_id: PrimaryKey,
        user_id: PrimaryKey,
    ) -> Result<NotificationData, DatabaseError> {
        self.db
            .mark_notification_read(notification_id, user_id)
            .await
    }

    /// Marks every notification owned by the user as read. Idempotent.
    pub async fn mark_all_read(&self, user_id: PrimaryKey) -> Result<(), DatabaseError> {
        self.db.mark_all_notifications_read(user_id).await
    }
}

impl<Db> Clone for Notifications<Db> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryDatabase;

    fn notifications() -> Notifications<MemoryDatabase> {
        Notifications::new(&Arc::new(MemoryDatabase::new()))
    }

    #[tokio::test]
    async fn recent_is_capped_and_newest_first() {
        let notifications = notifications();

        for i in 0..25 {
            notifications
                .notify(1, "test", &format!("message {}", i))
                .await;
        }

        let recent = notifications.recent(1).await.expect("fetches");

        assert_eq!(recent.len(), 20);
        assert_eq!(recent.first().map(|n| n.message.as_str()), Some("message 24"));
        assert!(recent.iter().all(|n| !n.is_read));
    }

    #[tokio::test]
    async fn mark_all_read_is_idempotent() {
        let notifications = notifications();

        notifications.notify(1, "test", "one").await;
        notifications.notify(1, "test", "two").await;

        notifications.mark_all_read(1).await.expect("first pass");
        notifications.mark_all_read(1).await.expect("second pass");

        let recent = notifications.recent(1).await.expect("fetches");
        assert!(recent.iter().all(|n| n.is_read));
    }

    #[tokio::test]
    async fn mark_read_requires_ownership() {
        let notifications = notifications();

        notifications.notify(1, "test", "for user one").await;
        let id = notifications.recent(1).await.expect("fetches")[0].id;

        let result = notifications.mark_read(id, 2).await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));

        let updated = notifications.mark_read(id, 1).await.expect("marks");
        assert!(updated.is_read);
    }
}
