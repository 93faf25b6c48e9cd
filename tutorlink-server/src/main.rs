use std::{env, sync::Arc};

use log::info;
use tutorlink_core::{Marketplace, PgDatabase};
use tutorlink_server::{run_server, ServerContext};

mod logging;

#[tokio::main]
async fn main() {
    logging::init_logger();

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL is set");

    info!("Connecting to database...");

    let database = PgDatabase::new(&database_url)
        .await
        .expect("database connects and migrates");

    let marketplace = Arc::new(Marketplace::new(database));

    info!("Initialized successfully.");

    run_server(ServerContext { marketplace }).await
}
