// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request body validation.
//!
//! [`ValidJson`] parses the body and runs [`Validate`] on it. A malformed
//! body and a rule violation both answer `400 VALIDATION_ERROR` with a
//! `details` list. [`OptionalJson`] does the same but treats an empty body
//! as the type's default.

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::{ApiError, FieldError};
use crate::models::{
    CommentRequest, CreatePostRequest, CreateStoryRequest, ForgotPasswordRequest, LoginRequest,
    ModerationRequest, RegisterRequest, ResetPasswordRequest, UpdateProfileRequest,
};

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 30;
pub const PASSWORD_MIN: usize = 8;
pub const NAME_MAX: usize = 50;
pub const BIO_MAX: usize = 160;
pub const LOCATION_MAX: usize = 50;
pub const WEBSITE_MAX: usize = 100;
pub const POST_MAX: usize = 500;
pub const COMMENT_MAX: usize = 280;
pub const REASON_MAX: usize = 500;

/// Field rules for a request body.
pub trait Validate {
    fn validate(&self) -> Vec<FieldError>;
}

/// JSON body that passed [`Validate`].
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(rejection_to_error)?;
        let errors = value.validate();
        if !errors.is_empty() {
            return Err(ApiError::validation(errors));
        }
        Ok(ValidJson(value))
    }
}

/// Validated JSON body that may be absent altogether.
pub struct OptionalJson<T>(pub T);

impl<S, T> FromRequest<S> for OptionalJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Default + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::validation(vec![FieldError::new("body", e.body_text())]))?;
        let value = if bytes.iter().all(u8::is_ascii_whitespace) {
            T::default()
        } else {
            serde_json::from_slice(&bytes).map_err(|e| {
                ApiError::validation(vec![FieldError::new("body", e.to_string())])
            })?
        };
        let errors = value.validate();
        if !errors.is_empty() {
            return Err(ApiError::validation(errors));
        }
        Ok(OptionalJson(value))
    }
}

fn rejection_to_error(rejection: JsonRejection) -> ApiError {
    ApiError::validation(vec![FieldError::new("body", rejection.body_text())])
}

fn char_len(value: &str) -> usize {
    value.trim().chars().count()
}

pub fn is_valid_username(username: &str) -> bool {
    let len = username.chars().count();
    (USERNAME_MIN..=USERNAME_MAX).contains(&len)
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `local@domain.tld`, no whitespace, exactly one `@`.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty() && !host.ends_with('.'),
        None => false,
    }
}

fn check_email(email: &str, errors: &mut Vec<FieldError>) {
    if !is_valid_email(email.trim()) {
        errors.push(FieldError::new("email", "Please provide a valid email"));
    }
}

fn check_password(field: &str, password: &str, errors: &mut Vec<FieldError>) {
    if password.chars().count() < PASSWORD_MIN {
        errors.push(FieldError::new(
            field,
            format!("Password must be at least {PASSWORD_MIN} characters"),
        ));
    }
}

fn check_max(field: &str, value: &str, max: usize, errors: &mut Vec<FieldError>) {
    if char_len(value) > max {
        errors.push(FieldError::new(
            field,
            format!("Must not exceed {max} characters"),
        ));
    }
}

fn check_name(name: &str, errors: &mut Vec<FieldError>) {
    if name.trim().is_empty() {
        errors.push(FieldError::new("name", "Name is required"));
    } else {
        check_max("name", name, NAME_MAX, errors);
    }
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if !is_valid_username(self.username.trim()) {
            errors.push(FieldError::new(
                "username",
                format!(
                    "Username must be {USERNAME_MIN}-{USERNAME_MAX} characters of letters, numbers and underscores"
                ),
            ));
        }
        check_email(&self.email, &mut errors);
        check_password("password", &self.password, &mut errors);
        check_name(&self.name, &mut errors);
        errors
    }
}

impl Validate for LoginRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_email(&self.email, &mut errors);
        if self.password.is_empty() {
            errors.push(FieldError::new("password", "Password is required"));
        }
        errors
    }
}

impl Validate for ForgotPasswordRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_email(&self.email, &mut errors);
        errors
    }
}

impl Validate for ResetPasswordRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.token.trim().is_empty() {
            errors.push(FieldError::new("token", "Reset token is required"));
        }
        check_password("newPassword", &self.new_password, &mut errors);
        errors
    }
}

impl Validate for UpdateProfileRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if let Some(name) = &self.name {
            check_name(name, &mut errors);
        }
        if let Some(bio) = &self.bio {
            check_max("bio", bio, BIO_MAX, &mut errors);
        }
        if let Some(website) = &self.website {
            check_max("website", website, WEBSITE_MAX, &mut errors);
        }
        if let Some(location) = &self.location {
            check_max("location", location, LOCATION_MAX, &mut errors);
        }
        errors
    }
}

impl Validate for CreatePostRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.content.trim().is_empty() && self.images.is_empty() {
            errors.push(FieldError::new("content", "Post must have content or images"));
        }
        check_max("content", &self.content, POST_MAX, &mut errors);
        if self.images.iter().any(|url| url.trim().is_empty()) {
            errors.push(FieldError::new("images", "Image URLs must not be empty"));
        }
        errors
    }
}

impl Validate for CommentRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.content.trim().is_empty() {
            errors.push(FieldError::new("content", "Comment content is required"));
        }
        check_max("content", &self.content, COMMENT_MAX, &mut errors);
        errors
    }
}

impl Validate for CreateStoryRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.image.trim().is_empty() {
            errors.push(FieldError::new("image", "Image is required"));
        }
        errors
    }
}

impl Validate for ModerationRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if let Some(reason) = &self.reason {
            if char_len(reason) > REASON_MAX {
                errors.push(FieldError::new(
                    "reason",
                    format!("Reason must not exceed {REASON_MAX} characters"),
                ));
            }
        }
        errors
    }
}
