//! Uniqueness checks for `username` and `email`.
//!
//! The existence queries are generic over the connection so the same check
//! runs on the pool for plain reads and on the open transaction for writes.
//! The UNIQUE indexes stay authoritative: a violation reported by the store
//! after a passed pre-check is translated into the same conflict.

use common::{AppError, AppResult};
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, SqlErr};

use super::entities::user::{self, Entity as UserEntity};

pub(crate) const USERNAME: &str = "username";
pub(crate) const EMAIL: &str = "email";

/// Does any user other than `exclude_id` hold this username?
pub(crate) async fn exists_by_username<C>(
    db: &C,
    username: &str,
    exclude_id: Option<i32>,
) -> AppResult<bool>
where
    C: ConnectionTrait,
{
    exists(db, user::Column::Username, username, exclude_id).await
}

/// Does any user other than `exclude_id` hold this email?
pub(crate) async fn exists_by_email<C>(
    db: &C,
    email: &str,
    exclude_id: Option<i32>,
) -> AppResult<bool>
where
    C: ConnectionTrait,
{
    exists(db, user::Column::Email, email, exclude_id).await
}

async fn exists<C>(
    db: &C,
    column: user::Column,
    value: &str,
    exclude_id: Option<i32>,
) -> AppResult<bool>
where
    C: ConnectionTrait,
{
    let mut query = UserEntity::find().filter(column.eq(value));
    if let Some(id) = exclude_id {
        query = query.filter(user::Column::Id.ne(id));
    }

    let count = query.count(db).await.map_err(AppError::from)?;
    Ok(count > 0)
}

/// Translate an insert/update failure.
///
/// Unique violations become a conflict on the offending field; anything
/// else stays a store error.
pub(crate) fn map_write_error(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(message)) => {
            let field = conflicting_field(&message);
            tracing::warn!(field, "Unique constraint rejected a write that passed the pre-check");
            AppError::conflict(field)
        }
        _ => AppError::from(err),
    }
}

/// Works for both index names (`idx_users_email`) and column paths (`users.email`).
fn conflicting_field(message: &str) -> &'static str {
    if message.to_lowercase().contains(EMAIL) {
        EMAIL
    } else {
        USERNAME
    }
}
