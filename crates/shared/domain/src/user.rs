//! User domain entity and related types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{DomainError, DomainResult};
use crate::validation;

/// User domain entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,
    pub phone: Option<String>,
    pub cellphone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zipcode: Option<String>,
    pub country: Option<String>,
    pub gender: Option<String>,
    pub age: Option<i32>,
    /// Argon2 PHC string, never the plain password
    #[serde(skip_serializing, default)]
    pub password: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// First and last name joined by a space, trimmed.
    pub fn display_name(&self) -> String {
        display_name(&self.first_name, &self.last_name)
    }
}

pub(crate) fn display_name(first_name: &str, last_name: &str) -> String {
    format!("{} {}", first_name, last_name).trim().to_string()
}

/// User creation data.
///
/// Timestamps and the id are assigned on insert. `password` is plain text
/// here and is hashed before it reaches the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Validate)]
pub struct NewUser {
    #[validate(length(min = 2, max = 50))]
    pub first_name: String,
    #[validate(length(min = 2, max = 50))]
    pub last_name: String,
    #[validate(email, length(max = 100))]
    pub email: String,
    #[validate(length(min = 3, max = 30))]
    pub username: String,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    #[validate(length(max = 20))]
    pub cellphone: Option<String>,
    #[validate(length(max = 200))]
    pub address: Option<String>,
    #[validate(length(max = 50))]
    pub city: Option<String>,
    #[validate(length(max = 50))]
    pub state: Option<String>,
    #[validate(length(max = 10))]
    pub zipcode: Option<String>,
    #[validate(length(max = 50))]
    pub country: Option<String>,
    pub gender: Option<String>,
    #[validate(range(min = 0, max = 120))]
    pub age: Option<i32>,
    #[validate(length(min = 6, max = 100))]
    pub password: Option<String>,
}

impl NewUser {
    /// Create with the four required fields, everything else unset.
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        username: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            username: username.into(),
            email: email.into(),
            ..Default::default()
        }
    }

    /// Run the data-model constraints, including the gender whitelist.
    ///
    /// Returns the first violation as a validation error.
    pub fn check(&self) -> DomainResult<()> {
        self.validate()
            .map_err(|errors| DomainError::validation(first_violation(&errors)))?;
        if let Some(gender) = self.gender.as_deref() {
            validation::validate_gender(gender)?;
        }
        Ok(())
    }
}

fn first_violation(errors: &validator::ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    match fields.first() {
        Some((field, violations)) => {
            let code = violations
                .first()
                .map(|v| v.code.to_string())
                .unwrap_or_else(|| "invalid".to_string());
            format!("{} is invalid ({})", field, code)
        }
        None => "invalid user data".to_string(),
    }
}

/// Sparse set of field changes.
///
/// `None` keeps the current value. This is the caller-side merge that runs
/// before the replace-semantics update. Supplied values obey the same
/// limits as [`NewUser`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Validate)]
pub struct UserPatch {
    #[validate(length(min = 2, max = 50))]
    pub first_name: Option<String>,
    #[validate(length(min = 2, max = 50))]
    pub last_name: Option<String>,
    #[validate(length(min = 3, max = 30))]
    pub username: Option<String>,
    #[validate(email, length(max = 100))]
    pub email: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    #[validate(length(max = 20))]
    pub cellphone: Option<String>,
    #[validate(length(max = 200))]
    pub address: Option<String>,
    #[validate(length(max = 50))]
    pub city: Option<String>,
    #[validate(length(max = 50))]
    pub state: Option<String>,
    #[validate(length(max = 10))]
    pub zipcode: Option<String>,
    #[validate(length(max = 50))]
    pub country: Option<String>,
    pub gender: Option<String>,
    #[validate(range(min = 0, max = 120))]
    pub age: Option<i32>,
}

impl UserPatch {
    /// Check if the patch changes nothing
    pub fn is_empty(&self) -> bool {
        *self == UserPatch::default()
    }

    /// Validate and sanitize every supplied field.
    ///
    /// Length and range limits are checked on the sanitized values.
    pub fn sanitized(self) -> DomainResult<Self> {
        let patch = Self {
            first_name: self
                .first_name
                .map(|v| validation::validate_required_text(&v, "first name"))
                .transpose()?,
            last_name: self
                .last_name
                .map(|v| validation::validate_required_text(&v, "last name"))
                .transpose()?,
            username: self
                .username
                .map(|v| validation::validate_required_text(&v, "username"))
                .transpose()?,
            email: self
                .email
                .map(|v| validation::validate_email(&v))
                .transpose()?,
            phone: self
                .phone
                .map(|v| validation::validate_phone(&v))
                .transpose()?,
            cellphone: self
                .cellphone
                .map(|v| validation::validate_phone(&v))
                .transpose()?,
            address: self.address.map(|v| v.trim().to_string()),
            city: self.city.map(|v| v.trim().to_string()),
            state: self.state.map(|v| v.trim().to_string()),
            zipcode: self.zipcode.map(|v| v.trim().to_string()),
            country: self.country.map(|v| v.trim().to_string()),
            gender: self
                .gender
                .map(|v| validation::validate_gender(&v))
                .transpose()?,
            age: self
                .age
                .map(|v| validation::validate_age(v))
                .transpose()?,
        };
        patch
            .validate()
            .map_err(|errors| DomainError::validation(first_violation(&errors)))?;
        Ok(patch)
    }

    /// Copy every supplied field onto `user`.
    pub fn apply_to(self, user: &mut User) {
        if let Some(v) = self.first_name {
            user.first_name = v;
        }
        if let Some(v) = self.last_name {
            user.last_name = v;
        }
        if let Some(v) = self.username {
            user.username = v;
        }
        if let Some(v) = self.email {
            user.email = v;
        }
        if self.phone.is_some() {
            user.phone = self.phone;
        }
        if self.cellphone.is_some() {
            user.cellphone = self.cellphone;
        }
        if self.address.is_some() {
            user.address = self.address;
        }
        if self.city.is_some() {
            user.city = self.city;
        }
        if self.state.is_some() {
            user.state = self.state;
        }
        if self.zipcode.is_some() {
            user.zipcode = self.zipcode;
        }
        if self.country.is_some() {
            user.country = self.country;
        }
        if self.gender.is_some() {
            user.gender = self.gender;
        }
        if self.age.is_some() {
            user.age = self.age;
        }
    }
}

/// Display name and email projection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameEmail {
    pub display_name: String,
    pub email: String,
}

impl NameEmail {
    pub fn new(first_name: &str, last_name: &str, email: impl Into<String>) -> Self {
        Self {
            display_name: display_name(first_name, last_name),
            email: email.into(),
        }
    }
}

impl From<&User> for NameEmail {
    fn from(user: &User) -> Self {
        Self {
            display_name: user.display_name(),
            email: user.email.clone(),
        }
    }
}

/// Number of users per city. Unset cities are grouped under `""`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityCount {
    pub city: String,
    pub count: u64,
}

/// Number of users per country. Unset countries are grouped under `""`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryCount {
    pub country: String,
    pub count: u64,
}
