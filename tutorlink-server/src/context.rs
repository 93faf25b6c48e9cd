use std::sync::Arc;

use axum::extract::FromRef;
use tutorlink_core::{Marketplace, PgDatabase};

#[derive(Clone, FromRef)]
pub struct ServerContext {
    pub marketplace: Arc<Marketplace<PgDatabase>>,
}
