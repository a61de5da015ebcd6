use crate::config::AppConfig;
use crate::db::DbPool;
use crate::services::blog::{PostRepository, SqlitePostRepository};
use crate::services::booking::BookingProcessor;

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub bookings: BookingProcessor,
    pub posts: Box<dyn PostRepository>,
}

impl AppState {
    /// Wires every component to the one pool opened at startup.
    pub fn new(config: AppConfig, db: DbPool) -> Self {
        Self {
            bookings: BookingProcessor::new(db.clone(), config.default_session_minutes),
            posts: Box::new(SqlitePostRepository::new(db.clone())),
            db,
            config,
        }
    }
}
