mod auth;
mod bookings;
mod db;
mod notifications;
mod reviews;
mod tutors;
mod util;

use std::sync::Arc;

pub use auth::*;
pub use bookings::*;
pub use db::*;
pub use notifications::*;
pub use reviews::*;
pub use tutors::*;

/// The tutorlink marketplace, facilitating authentication, bookings,
/// reviews, tutor verification, and notifications.
pub struct Marketplace<Db> {
    database: Arc<Db>,

    pub auth: Auth<Db>,
    pub bookings: Bookings<Db>,
    pub notifications: Notifications<Db>,
    pub reviews: Reviews<Db>,
    pub tutors: Tutors<Db>,
}

impl<Db> Marketplace<Db>
where
    Db: Database,
{
    pub fn new(database: Db) -> Self {
        let database = Arc::new(database);

        let notifications = Notifications::new(&database);
        let auth = Auth::new(&database, &notifications);
        let bookings = Bookings::new(&database, &notifications);
        let reviews = Reviews::new(&database);
        let tutors = Tutors::new(&database, &notifications);

        Self {
            database,
            auth,
            bookings,
            notifications,
            reviews,
            tutors,
        }
    }

    pub fn database(&self) -> &Arc<Db> {
        &self.database
    }
}
