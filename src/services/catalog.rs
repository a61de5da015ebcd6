use crate::db::{self, queries, DbPool};
use crate::errors::AppError;
use crate::models::Service;

/// All catalog services, ordered by id.
pub async fn list_services(pool: &DbPool) -> Result<Vec<Service>, AppError> {
    db::with_conn(pool, |conn| Ok(queries::list_services(conn)?))
        .await
        .map_err(|e| e.with_message("Failed to fetch services"))
}
