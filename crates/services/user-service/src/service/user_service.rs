//! User service - validated entry point in front of the repository.
//!
//! The repository trusts its input apart from the uniqueness checks it runs
//! itself. Everything else (field formats, password confirmation, paging
//! bounds, sparse patch merging) is done here before a repository call.

use async_trait::async_trait;
use std::sync::Arc;

use common::{AppError, AppResult, FailureKind, OptionExt, Outcome};
use domain::validation;
use domain::{
    NewUser, Paginated, PaginationParams, User, UserPatch, DEFAULT_LATEST_LIMIT,
    MAX_AGE, MAX_LATEST_LIMIT, MAX_PAGE_SIZE, MIN_AGE,
};

use crate::repository::UserRepository;

/// User service trait for dependency injection.
#[async_trait]
pub trait UserService: Send + Sync {
    async fn get_user(&self, id: i32) -> AppResult<User>;

    async fn user_by_email(&self, email: &str) -> AppResult<User>;

    /// Page of users plus totals. `page >= 1`, `1 <= page_size <= 50`.
    async fn users_page(&self, page: u64, page_size: u64) -> AppResult<Paginated<User>>;

    /// Most recent registrations; `None` means the default of 10.
    async fn latest_users(&self, limit: Option<u64>) -> AppResult<Vec<User>>;

    async fn users_by_minimum_age(&self, minimum_age: i32) -> AppResult<Vec<User>>;

    async fn users_by_gender(&self, gender: &str) -> AppResult<Vec<User>>;

    /// Create a user from the four required fields.
    async fn create_user(
        &self,
        first_name: &str,
        last_name: &str,
        username: &str,
        email: &str,
    ) -> Outcome<User>;

    /// Create a user from a full registration record.
    async fn register(&self, user: NewUser) -> Outcome<User>;

    /// Change only the supplied fields of a user.
    async fn patch_user(&self, id: i32, patch: UserPatch) -> Outcome<User>;

    async fn update_password(
        &self,
        user_id: i32,
        new_password: &str,
        confirm_password: &str,
    ) -> Outcome;

    async fn delete_user(&self, id: i32) -> Outcome;

    async fn delete_user_by_email(&self, email: &str) -> Outcome;
}

/// Concrete implementation of UserService using repository.
pub struct UserManager {
    repo: Arc<dyn UserRepository>,
}

impl UserManager {
    /// Create new user service instance with repository
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }
}

fn check_bounds(value: u64, field: &str, min: u64, max: u64) -> AppResult<u64> {
    let as_signed = i64::try_from(value).unwrap_or(i64::MAX);
    let min = i64::try_from(min).unwrap_or(i64::MAX);
    let max = i64::try_from(max).unwrap_or(i64::MAX);
    validation::validate_range(as_signed, field, min, max)?;
    Ok(value)
}

fn sanitize_new_user(mut user: NewUser) -> AppResult<NewUser> {
    user.first_name = validation::validate_required_text(&user.first_name, "first name")?;
    user.last_name = validation::validate_required_text(&user.last_name, "last name")?;
    user.username = validation::validate_required_text(&user.username, "username")?;
    user.email = validation::validate_email(&user.email)?;
    user.gender = user
        .gender
        .map(|g| validation::validate_gender(&g))
        .transpose()?;
    user.phone = user
        .phone
        .map(|p| validation::validate_phone(&p))
        .transpose()?;
    user.cellphone = user
        .cellphone
        .map(|p| validation::validate_phone(&p))
        .transpose()?;
    user.check()?;
    Ok(user)
}

#[async_trait]
impl UserService for UserManager {
    async fn get_user(&self, id: i32) -> AppResult<User> {
        self.repo.get_by_id(id).await?.ok_or_not_found("user")
    }

    async fn user_by_email(&self, email: &str) -> AppResult<User> {
        let email = validation::validate_email(email)?;
        self.repo.get_by_email(&email).await?.ok_or_not_found("user")
    }

    async fn users_page(&self, page: u64, page_size: u64) -> AppResult<Paginated<User>> {
        check_bounds(page, "page", 1, u64::MAX)?;
        check_bounds(page_size, "page size", 1, MAX_PAGE_SIZE)?;

        let params = PaginationParams::new(page, page_size);
        let data = self.repo.get_paged(page, page_size).await?;
        let total = self.repo.count_all().await?;

        Ok(Paginated::new(data, params, total))
    }

    async fn latest_users(&self, limit: Option<u64>) -> AppResult<Vec<User>> {
        let limit = check_bounds(
            limit.unwrap_or(DEFAULT_LATEST_LIMIT),
            "limit",
            1,
            MAX_LATEST_LIMIT,
        )?;
        self.repo.latest_registered(limit).await
    }

    async fn users_by_minimum_age(&self, minimum_age: i32) -> AppResult<Vec<User>> {
        validation::validate_range(minimum_age.into(), "minimum age", MIN_AGE.into(), MAX_AGE.into())?;
        self.repo.get_by_minimum_age(minimum_age).await
    }

    async fn users_by_gender(&self, gender: &str) -> AppResult<Vec<User>> {
        let gender = validation::validate_gender(gender)?;
        self.repo.get_by_gender(&gender).await
    }

    async fn create_user(
        &self,
        first_name: &str,
        last_name: &str,
        username: &str,
        email: &str,
    ) -> Outcome<User> {
        self.register(NewUser::new(first_name, last_name, username, email))
            .await
    }

    async fn register(&self, user: NewUser) -> Outcome<User> {
        match sanitize_new_user(user) {
            Ok(user) => self.repo.create(user).await,
            Err(err) => Outcome::from_error(err, "create user"),
        }
    }

    async fn patch_user(&self, id: i32, patch: UserPatch) -> Outcome<User> {
        if patch.is_empty() {
            return Outcome::failure(FailureKind::Validation, "no fields to update");
        }
        let patch = match patch.sanitized() {
            Ok(patch) => patch,
            Err(err) => return Outcome::from_error(err.into(), "update user"),
        };

        let mut user = match self.repo.get_by_id(id).await {
            Ok(Some(user)) => user,
            Ok(None) => return Outcome::from_error(AppError::not_found("user"), "update user"),
            Err(err) => return Outcome::from_error(err, "update user"),
        };

        patch.apply_to(&mut user);
        self.repo.update(user).await
    }

    async fn update_password(
        &self,
        user_id: i32,
        new_password: &str,
        confirm_password: &str,
    ) -> Outcome {
        if let Err(err) = validation::validate_password(new_password, confirm_password) {
            return Outcome::from_error(err.into(), "update password");
        }
        self.repo.update_password(user_id, new_password).await
    }

    async fn delete_user(&self, id: i32) -> Outcome {
        self.repo.delete_by_id(id).await
    }

    async fn delete_user_by_email(&self, email: &str) -> Outcome {
        match validation::validate_email(email) {
            Ok(email) => self.repo.delete_by_email(&email).await,
            Err(err) => Outcome::from_error(err.into(), "delete user"),
        }
    }
}
