//! Transaction boundary for write operations.
//!
//! Every write runs inside one transaction opened by [`Persistence::transaction`]:
//! the closure gets a [`TransactionContext`], and the transaction commits
//! when the closure returns `Ok` and rolls back when it returns `Err`.
//! Nothing a failed write did is left behind.

use chrono::Utc;
use common::{AppError, AppResult};
use sea_orm::{
    AccessMode, ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, IsolationLevel, QueryFilter, Set, TransactionTrait,
};

use domain::{NewUser, User};

use crate::repository::entities::user::{self, ActiveModel, Entity as UserEntity, Model};
use crate::repository::uniqueness;

/// Transaction context providing repository access within a transaction.
///
/// All repository operations performed through this context are part
/// of the same database transaction.
pub struct TransactionContext<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TransactionContext<'a> {
    fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    /// Get user repository for this transaction
    pub fn users(&self) -> TxUserRepository<'a> {
        TxUserRepository::new(self.txn)
    }
}

/// Owns the pool and opens transactions on it.
#[derive(Clone)]
pub struct Persistence {
    db: DatabaseConnection,
    isolation: Option<IsolationLevel>,
}

impl Persistence {
    /// `isolation` of `None` leaves the store's default level in place.
    pub fn new(db: DatabaseConnection, isolation: Option<IsolationLevel>) -> Self {
        Self { db, isolation }
    }

    /// Connection for reads outside a transaction
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Execute a closure within a transaction.
    ///
    /// The transaction is committed on success or rolled back on error.
    pub async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> std::pin::Pin<
                Box<dyn std::future::Future<Output = AppResult<T>> + Send + 'a>,
            > + Send,
        T: Send,
    {
        let access_mode = self.isolation.map(|_| AccessMode::ReadWrite);
        let txn = self
            .db
            .begin_with_config(self.isolation, access_mode)
            .await
            .map_err(AppError::from)?;

        let ctx = TransactionContext::new(&txn);

        match f(ctx).await {
            Ok(result) => {
                txn.commit().await.map_err(AppError::from)?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!("Transaction rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}

/// User operations bound to an open transaction.
///
/// Lookups return the raw row so a later write in the same transaction can
/// start from it.
pub struct TxUserRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TxUserRepository<'a> {
    fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<Model>> {
        UserEntity::find_by_id(id)
            .one(self.txn)
            .await
            .map_err(AppError::from)
    }

    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<Model>> {
        UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(self.txn)
            .await
            .map_err(AppError::from)
    }

    pub async fn exists_by_username(&self, username: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        uniqueness::exists_by_username(self.txn, username, exclude_id).await
    }

    pub async fn exists_by_email(&self, email: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        uniqueness::exists_by_email(self.txn, email, exclude_id).await
    }

    /// Fail with a conflict if another user holds either value.
    ///
    /// Username is checked first.
    pub async fn ensure_unique(
        &self,
        username: &str,
        email: &str,
        exclude_id: Option<i32>,
    ) -> AppResult<()> {
        if self.exists_by_username(username, exclude_id).await? {
            return Err(AppError::conflict(uniqueness::USERNAME));
        }
        if self.exists_by_email(email, exclude_id).await? {
            return Err(AppError::conflict(uniqueness::EMAIL));
        }
        Ok(())
    }

    /// Insert a new row. `password_hash` is stored as given.
    pub async fn insert(&self, new_user: NewUser, password_hash: Option<String>) -> AppResult<User> {
        let now = Utc::now();
        let active_model = ActiveModel {
            first_name: Set(new_user.first_name),
            last_name: Set(new_user.last_name),
            email: Set(new_user.email),
            username: Set(new_user.username),
            phone: Set(new_user.phone),
            cellphone: Set(new_user.cellphone),
            address: Set(new_user.address),
            city: Set(new_user.city),
            state: Set(new_user.state),
            zipcode: Set(new_user.zipcode),
            country: Set(new_user.country),
            gender: Set(new_user.gender),
            age: Set(new_user.age),
            password: Set(password_hash),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active_model
            .insert(self.txn)
            .await
            .map_err(uniqueness::map_write_error)?;

        Ok(User::from(model))
    }

    /// Replace every caller-editable column of `current` with the values in `user`.
    ///
    /// `id`, `created_at` and the stored password are never touched.
    pub async fn overwrite(&self, current: Model, user: User) -> AppResult<User> {
        let mut active: ActiveModel = current.into();
        active.first_name = Set(user.first_name);
        active.last_name = Set(user.last_name);
        active.email = Set(user.email);
        active.username = Set(user.username);
        active.phone = Set(user.phone);
        active.cellphone = Set(user.cellphone);
        active.address = Set(user.address);
        active.city = Set(user.city);
        active.state = Set(user.state);
        active.zipcode = Set(user.zipcode);
        active.country = Set(user.country);
        active.gender = Set(user.gender);
        active.age = Set(user.age);
        active.updated_at = Set(Utc::now());

        let model = active
            .update(self.txn)
            .await
            .map_err(uniqueness::map_write_error)?;

        Ok(User::from(model))
    }

    pub async fn set_password(&self, current: Model, password_hash: String) -> AppResult<()> {
        let mut active: ActiveModel = current.into();
        active.password = Set(Some(password_hash));
        active.updated_at = Set(Utc::now());

        active.update(self.txn).await.map_err(AppError::from)?;
        Ok(())
    }

    /// Permanently delete a user row
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = UserEntity::delete_by_id(id)
            .exec(self.txn)
            .await
            .map_err(AppError::from)?;

        if result.rows_affected == 0 {
            return Err(AppError::not_found("user"));
        }

        Ok(())
    }
}

/// Run `$body` inside a transaction on `$uow`, binding the context to `$ctx`.
///
/// The body is moved into the transaction future, so it may only capture
/// owned values.
#[macro_export]
macro_rules! with_transaction {
    ($uow:expr, |$ctx:ident| $body:expr) => {
        $uow.transaction(|$ctx| Box::pin(async move { $body })).await
    };
}
