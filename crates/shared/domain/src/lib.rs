//! Domain layer - Core business entities and value objects.
//!
//! This crate contains pure domain logic with no infrastructure dependencies:
//! the user entity and its projections, password hashing, pagination and
//! the field validation routines callers run before touching the repository.

pub mod constants;
pub mod error;
pub mod pagination;
pub mod password;
pub mod user;
pub mod validation;

pub use constants::*;
pub use error::{DomainError, DomainResult};
pub use pagination::{Paginated, PaginationMeta, PaginationParams};
pub use password::Password;
pub use user::{CityCount, CountryCount, NameEmail, NewUser, User, UserPatch};
