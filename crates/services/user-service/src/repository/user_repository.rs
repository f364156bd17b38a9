//! User repository: read queries, transactional writes and uniqueness checks.

use std::collections::BTreeMap;

use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, FromQueryResult, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select,
};

use super::entities::user::{self, Entity as UserEntity};
use super::uniqueness;
use crate::infra::Persistence;
use crate::with_transaction;
use common::{AppError, AppResult, OptionExt, Outcome};
use domain::{CityCount, CountryCount, NameEmail, NewUser, PaginationParams, Password, User};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// User repository trait for dependency injection.
///
/// Reads return `Err` only on store failure. Writes never return `Err`:
/// a missing user, a uniqueness conflict or a store failure is reported in
/// the returned [`Outcome`], and the write is rolled back.
///
/// Lists are ordered by id ascending unless the method says otherwise.
/// Text comparisons follow the store's collation.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Every user
    async fn get_all(&self) -> AppResult<Vec<User>>;

    async fn get_by_id(&self, id: i32) -> AppResult<Option<User>>;

    async fn get_by_email(&self, email: &str) -> AppResult<Option<User>>;

    async fn get_by_city(&self, city: &str) -> AppResult<Vec<User>>;

    async fn get_by_country(&self, country: &str) -> AppResult<Vec<User>>;

    async fn get_by_gender(&self, gender: &str) -> AppResult<Vec<User>>;

    /// Users with a known age of at least `minimum_age`
    async fn get_by_minimum_age(&self, minimum_age: i32) -> AppResult<Vec<User>>;

    /// Display name and email of every user
    async fn get_names_and_emails(&self) -> AppResult<Vec<NameEmail>>;

    async fn count_all(&self) -> AppResult<u64>;

    /// Users per city, sorted by city. Unset and empty cities share the `""` entry.
    async fn count_by_city(&self) -> AppResult<Vec<CityCount>>;

    /// Users per country, sorted by country. Unset and empty countries share the `""` entry.
    async fn count_by_country(&self) -> AppResult<Vec<CountryCount>>;

    /// Users whose phone is unset or empty
    async fn without_phone(&self) -> AppResult<Vec<User>>;

    /// Users whose address is unset or empty
    async fn without_address(&self) -> AppResult<Vec<User>>;

    /// Most recently created users first, at most `limit` of them
    async fn latest_registered(&self, limit: u64) -> AppResult<Vec<User>>;

    /// Sorted by last name, then first name
    async fn ordered_by_last_name(&self) -> AppResult<Vec<User>>;

    /// One page of the id-ordered user list. `page` starts at 1.
    async fn get_paged(&self, page: u64, page_size: u64) -> AppResult<Vec<User>>;

    /// Insert a user. A supplied plain-text password is hashed first.
    async fn create(&self, user: NewUser) -> Outcome<User>;

    /// Overwrite every editable field of the user with `user.id`.
    ///
    /// `created_at` and the stored password are kept; `user.password` is ignored.
    async fn update(&self, user: User) -> Outcome<User>;

    async fn update_password(&self, user_id: i32, new_password: &str) -> Outcome;

    async fn delete_by_id(&self, id: i32) -> Outcome;

    async fn delete_by_email(&self, email: &str) -> Outcome;

    /// Does a user other than `exclude_id` hold this username?
    async fn exists_by_username(&self, username: &str, exclude_id: Option<i32>) -> AppResult<bool>;

    /// Does a user other than `exclude_id` hold this email?
    async fn exists_by_email(&self, email: &str, exclude_id: Option<i32>) -> AppResult<bool>;
}

const ACTION_CREATE: &str = "create user";
const ACTION_UPDATE: &str = "update user";
const ACTION_UPDATE_PASSWORD: &str = "update password";
const ACTION_DELETE: &str = "delete user";

/// Concrete implementation of UserRepository
#[derive(Clone)]
pub struct UserStore {
    persistence: Persistence,
}

impl UserStore {
    /// Create new repository instance
    pub fn new(persistence: Persistence) -> Self {
        Self { persistence }
    }

    fn db(&self) -> &DatabaseConnection {
        self.persistence.connection()
    }

    async fn fetch_all(&self, query: Select<UserEntity>) -> AppResult<Vec<User>> {
        let models = query.all(self.db()).await.map_err(AppError::from)?;
        Ok(models.into_iter().map(User::from).collect())
    }

    /// `(key, count)` per distinct value of `column`, NULL folded into `""`.
    async fn count_grouped(&self, column: user::Column) -> AppResult<Vec<(String, u64)>> {
        let rows = UserEntity::find()
            .select_only()
            .column_as(column, "key")
            .column_as(user::Column::Id.count(), "count")
            .group_by(column)
            .into_model::<GroupCount>()
            .all(self.db())
            .await
            .map_err(AppError::from)?;

        let mut merged: BTreeMap<String, u64> = BTreeMap::new();
        for row in rows {
            *merged.entry(row.key.unwrap_or_default()).or_default() += row.count.max(0) as u64;
        }
        Ok(merged.into_iter().collect())
    }
}

#[derive(Debug, FromQueryResult)]
struct GroupCount {
    key: Option<String>,
    count: i64,
}

#[derive(Debug, FromQueryResult)]
struct NameEmailRow {
    first_name: String,
    last_name: String,
    email: String,
}

fn by_id() -> Select<UserEntity> {
    UserEntity::find().order_by_asc(user::Column::Id)
}

fn unset_or_empty(column: user::Column) -> Condition {
    Condition::any().add(column.is_null()).add(column.eq(""))
}

/// Case-insensitive comparison used to decide whether a uniqueness re-check is needed.
fn changed(current: &str, requested: &str) -> bool {
    current.to_lowercase() != requested.to_lowercase()
}

fn hash_password(plain_text: &str) -> AppResult<String> {
    Ok(Password::new(plain_text)?.into_string())
}

#[async_trait]
impl UserRepository for UserStore {
    async fn get_all(&self) -> AppResult<Vec<User>> {
        self.fetch_all(by_id()).await
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Option<User>> {
        let result = UserEntity::find_by_id(id)
            .one(self.db())
            .await
            .map_err(AppError::from)?;

        Ok(result.map(User::from))
    }

    async fn get_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(self.db())
            .await
            .map_err(AppError::from)?;

        Ok(result.map(User::from))
    }

    async fn get_by_city(&self, city: &str) -> AppResult<Vec<User>> {
        self.fetch_all(by_id().filter(user::Column::City.eq(city))).await
    }

    async fn get_by_country(&self, country: &str) -> AppResult<Vec<User>> {
        self.fetch_all(by_id().filter(user::Column::Country.eq(country)))
            .await
    }

    async fn get_by_gender(&self, gender: &str) -> AppResult<Vec<User>> {
        self.fetch_all(by_id().filter(user::Column::Gender.eq(gender)))
            .await
    }

    async fn get_by_minimum_age(&self, minimum_age: i32) -> AppResult<Vec<User>> {
        let query = by_id()
            .filter(user::Column::Age.is_not_null())
            .filter(user::Column::Age.gte(minimum_age));
        self.fetch_all(query).await
    }

    async fn get_names_and_emails(&self) -> AppResult<Vec<NameEmail>> {
        let rows = by_id()
            .select_only()
            .column(user::Column::FirstName)
            .column(user::Column::LastName)
            .column(user::Column::Email)
            .into_model::<NameEmailRow>()
            .all(self.db())
            .await
            .map_err(AppError::from)?;

        Ok(rows
            .into_iter()
            .map(|row| NameEmail::new(&row.first_name, &row.last_name, row.email))
            .collect())
    }

    async fn count_all(&self) -> AppResult<u64> {
        UserEntity::find()
            .count(self.db())
            .await
            .map_err(AppError::from)
    }

    async fn count_by_city(&self) -> AppResult<Vec<CityCount>> {
        let groups = self.count_grouped(user::Column::City).await?;
        Ok(groups
            .into_iter()
            .map(|(city, count)| CityCount { city, count })
            .collect())
    }

    async fn count_by_country(&self) -> AppResult<Vec<CountryCount>> {
        let groups = self.count_grouped(user::Column::Country).await?;
        Ok(groups
            .into_iter()
            .map(|(country, count)| CountryCount { country, count })
            .collect())
    }

    async fn without_phone(&self) -> AppResult<Vec<User>> {
        self.fetch_all(by_id().filter(unset_or_empty(user::Column::Phone)))
            .await
    }

    async fn without_address(&self) -> AppResult<Vec<User>> {
        self.fetch_all(by_id().filter(unset_or_empty(user::Column::Address)))
            .await
    }

    async fn latest_registered(&self, limit: u64) -> AppResult<Vec<User>> {
        let query = UserEntity::find()
            .order_by_desc(user::Column::CreatedAt)
            .order_by_desc(user::Column::Id)
            .limit(limit);
        self.fetch_all(query).await
    }

    async fn ordered_by_last_name(&self) -> AppResult<Vec<User>> {
        let query = UserEntity::find()
            .order_by_asc(user::Column::LastName)
            .order_by_asc(user::Column::FirstName)
            .order_by_asc(user::Column::Id);
        self.fetch_all(query).await
    }

    async fn get_paged(&self, page: u64, page_size: u64) -> AppResult<Vec<User>> {
        let params = PaginationParams::new(page, page_size);
        let query = by_id().offset(params.offset()).limit(params.limit());
        self.fetch_all(query).await
    }

    async fn create(&self, user: NewUser) -> Outcome<User> {
        let password_hash = match user.password.as_deref().map(hash_password).transpose() {
            Ok(hash) => hash,
            Err(err) => return Outcome::from_error(err, ACTION_CREATE),
        };

        let result = with_transaction!(self.persistence, |ctx| {
            let users = ctx.users();
            users.ensure_unique(&user.username, &user.email, None).await?;
            users.insert(user, password_hash).await
        });

        if let Ok(created) = &result {
            tracing::info!(user_id = created.id, "User created");
        }
        Outcome::from_result(result, "user created", ACTION_CREATE)
    }

    async fn update(&self, user: User) -> Outcome<User> {
        let result = with_transaction!(self.persistence, |ctx| {
            let users = ctx.users();
            let current = users.find_by_id(user.id).await?.ok_or_not_found("user")?;

            if changed(&current.username, &user.username)
                && users.exists_by_username(&user.username, Some(user.id)).await?
            {
                return Err(AppError::conflict(uniqueness::USERNAME));
            }
            if changed(&current.email, &user.email)
                && users.exists_by_email(&user.email, Some(user.id)).await?
            {
                return Err(AppError::conflict(uniqueness::EMAIL));
            }

            users.overwrite(current, user).await
        });

        if let Ok(updated) = &result {
            tracing::info!(user_id = updated.id, "User updated");
        }
        Outcome::from_result(result, "user updated", ACTION_UPDATE)
    }

    async fn update_password(&self, user_id: i32, new_password: &str) -> Outcome {
        let password_hash = match hash_password(new_password) {
            Ok(hash) => hash,
            Err(err) => return Outcome::from_error(err, ACTION_UPDATE_PASSWORD),
        };

        let result = with_transaction!(self.persistence, |ctx| {
            let users = ctx.users();
            let current = users.find_by_id(user_id).await?.ok_or_not_found("user")?;
            users.set_password(current, password_hash).await
        });

        if result.is_ok() {
            tracing::info!(user_id, "Password updated");
        }
        Outcome::from_result(result, "password updated", ACTION_UPDATE_PASSWORD)
    }

    async fn delete_by_id(&self, id: i32) -> Outcome {
        let result = with_transaction!(self.persistence, |ctx| {
            let users = ctx.users();
            let current = users.find_by_id(id).await?.ok_or_not_found("user")?;
            users.delete(current.id).await
        });

        if result.is_ok() {
            tracing::info!(user_id = id, "User deleted");
        }
        Outcome::from_result(result, "user deleted", ACTION_DELETE)
    }

    async fn delete_by_email(&self, email: &str) -> Outcome {
        let email = email.to_string();
        let result = with_transaction!(self.persistence, |ctx| {
            let users = ctx.users();
            let current = users.find_by_email(&email).await?.ok_or_not_found("user")?;
            users.delete(current.id).await?;
            Ok(current.id)
        });

        if let Ok(user_id) = &result {
            tracing::info!(user_id = *user_id, "User deleted");
        }
        Outcome::from_result(result, "user deleted", ACTION_DELETE).discard()
    }

    async fn exists_by_username(&self, username: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        uniqueness::exists_by_username(self.db(), username, exclude_id).await
    }

    async fn exists_by_email(&self, email: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        uniqueness::exists_by_email(self.db(), email, exclude_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_changed_ignores_case() {
        assert!(!changed("Ada@Example.com", "ada@example.com"));
        assert!(changed("ada", "grace"));
    }

    #[test]
    fn test_short_password_is_rejected_before_hashing() {
        let err = hash_password("abc").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
