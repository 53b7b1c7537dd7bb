//! Account registration and profile management.

use sqlx::PgPool;
use tracing::info;

use crate::common::validation::{
    is_valid_email, is_valid_username, require_max_length, require_non_blank, require_present,
};
use crate::common::{ApiError, UserId, ValidationErrors};
use crate::domains::auth::password::hash_password_async;
use crate::domains::users::data::{RegisterUserInput, UpdateUserInput};
use crate::domains::users::models::{NewUser, User, UserChanges};

pub const MIN_PASSWORD_LENGTH: usize = 8;

fn validate_email(errors: &mut ValidationErrors, email: &str) {
    if email.trim().is_empty() {
        errors.add("email", "This field may not be blank.");
    } else if !is_valid_email(email) {
        errors.add("email", "Enter a valid email address.");
    }
}

fn validate_registration(input: &RegisterUserInput) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    for (field, value) in [
        ("email", &input.email),
        ("username", &input.username),
        ("password", &input.password),
        ("password_confirm", &input.password_confirm),
    ] {
        require_present(&mut errors, field, value);
    }

    if let Some(email) = &input.email {
        validate_email(&mut errors, email);
    }

    if let Some(username) = &input.username {
        require_non_blank(&mut errors, "username", username);
        require_max_length(&mut errors, "username", username, 150);
        if !username.is_empty() && !is_valid_username(username) {
            errors.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }
    }

    for (field, value) in [("first_name", &input.first_name), ("last_name", &input.last_name)] {
        if let Some(value) = value {
            require_max_length(&mut errors, field, value, 150);
        }
    }

    if let Some(phone) = &input.phone_number {
        require_max_length(&mut errors, "phone_number", phone, 20);
    }

    if let Some(password) = &input.password {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            errors.add(
                "password",
                format!(
                    "Ensure this field has at least {} characters.",
                    MIN_PASSWORD_LENGTH
                ),
            );
        }
    }

    if let (Some(password), Some(confirm)) = (&input.password, &input.password_confirm) {
        if password != confirm {
            errors.add(crate::common::NON_FIELD_ERRORS, "Passwords don't match");
        }
    }

    errors
}

fn normalize_phone(phone: Option<String>) -> Option<String> {
    phone
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
}

pub async fn register_user(input: RegisterUserInput, pool: &PgPool) -> Result<User, ApiError> {
    let mut errors = validate_registration(&input);

    if let Some(email) = input.email.as_deref().filter(|e| is_valid_email(e)) {
        if User::email_taken(email, None, pool).await? {
            errors.add("email", "user with this email already exists.");
        }
    }
    if let Some(username) = input.username.as_deref().filter(|u| !u.trim().is_empty()) {
        if User::username_taken(username, pool).await? {
            errors.add("username", "A user with that username already exists.");
        }
    }
    errors.into_result()?;

    let password = input.password.unwrap_or_default();
    let password_hash = hash_password_async(password).await?;

    let new_user = NewUser::builder()
        .username(input.username.unwrap_or_default())
        .email(input.email.unwrap_or_default().trim())
        .first_name(input.first_name.unwrap_or_default())
        .last_name(input.last_name.unwrap_or_default())
        .phone_number(normalize_phone(input.phone_number))
        .password_hash(password_hash)
        .build();

    let user = User::insert(new_user, pool).await?;
    info!(user_id = %user.user_id, "user registered");
    Ok(user)
}

pub async fn list_users(pool: &PgPool) -> Result<Vec<User>, ApiError> {
    Ok(User::find_all(pool).await?)
}

pub async fn get_user(user_id: UserId, pool: &PgPool) -> Result<User, ApiError> {
    User::find_by_id(user_id, pool)
        .await?
        .ok_or_else(ApiError::not_found)
}

/// Accounts can only be changed by their owner.
fn ensure_self(actor_id: UserId, user_id: UserId) -> Result<(), ApiError> {
    if actor_id == user_id {
        Ok(())
    } else {
        Err(ApiError::forbidden())
    }
}

pub async fn update_user(
    actor_id: UserId,
    user_id: UserId,
    input: UpdateUserInput,
    partial: bool,
    pool: &PgPool,
) -> Result<User, ApiError> {
    get_user(user_id, pool).await?;
    ensure_self(actor_id, user_id)?;

    let mut errors = ValidationErrors::new();
    if !partial {
        require_present(&mut errors, "email", &input.email);
    }
    if let Some(email) = &input.email {
        validate_email(&mut errors, email);
        if errors.field("email").is_none() && User::email_taken(email, Some(user_id), pool).await? {
            errors.add("email", "user with this email already exists.");
        }
    }
    for (field, value) in [("first_name", &input.first_name), ("last_name", &input.last_name)] {
        if let Some(value) = value {
            require_max_length(&mut errors, field, value, 150);
        }
    }
    if let Some(phone) = &input.phone_number {
        require_max_length(&mut errors, "phone_number", phone, 20);
    }
    errors.into_result()?;

    // PUT replaces the profile, so an omitted phone number is cleared
    let phone_number = match input.phone_number {
        Some(phone) => Some(normalize_phone(Some(phone))),
        None if !partial => Some(None),
        None => None,
    };

    let changes = UserChanges {
        first_name: input.first_name.or_else(|| (!partial).then(String::new)),
        last_name: input.last_name.or_else(|| (!partial).then(String::new)),
        email: input.email.map(|e| e.trim().to_string()),
        phone_number,
    };

    let user = User::update(user_id, changes, pool).await?;
    info!(user_id = %user.user_id, "user profile updated");
    Ok(user)
}

pub async fn delete_user(actor_id: UserId, user_id: UserId, pool: &PgPool) -> Result<(), ApiError> {
    get_user(user_id, pool).await?;
    ensure_self(actor_id, user_id)?;

    User::delete(user_id, pool).await?;
    info!(user_id = %user_id, "user deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_input() -> RegisterUserInput {
        RegisterUserInput {
            first_name: Some("Ada".into()),
            last_name: Some("Lovelace".into()),
            email: Some("ada@example.com".into()),
            username: Some("ada".into()),
            phone_number: None,
            password: Some("password123".into()),
            password_confirm: Some("password123".into()),
        }
    }

    #[test]
    fn test_valid_registration_has_no_errors() {
        assert!(validate_registration(&valid_input()).is_empty());
    }

    #[test]
    fn test_password_mismatch_is_non_field_error() {
        let input = RegisterUserInput {
            password_confirm: Some("password124".into()),
            ..valid_input()
        };
        let errors = validate_registration(&input);
        assert_eq!(
            errors.field(crate::common::NON_FIELD_ERRORS),
            Some(&["Passwords don't match".to_string()][..])
        );
    }

    #[test]
    fn test_short_password() {
        let input = RegisterUserInput {
            password: Some("short".into()),
            password_confirm: Some("short".into()),
            ..valid_input()
        };
        let errors = validate_registration(&input);
        assert_eq!(
            errors.field("password"),
            Some(&["Ensure this field has at least 8 characters.".to_string()][..])
        );
    }

    #[test]
    fn test_missing_fields_are_required() {
        let errors = validate_registration(&RegisterUserInput::default());
        for field in ["email", "username", "password", "password_confirm"] {
            assert!(errors.field(field).is_some(), "{} should be required", field);
        }
    }

    #[test]
    fn test_invalid_email_and_username() {
        let input = RegisterUserInput {
            email: Some("not-an-email".into()),
            username: Some("has space".into()),
            ..valid_input()
        };
        let errors = validate_registration(&input);
        assert_eq!(
            errors.field("email"),
            Some(&["Enter a valid email address.".to_string()][..])
        );
        assert!(errors.field("username").is_some());
    }

    #[test]
    fn test_only_owner_may_change_account() {
        let owner = UserId::new();
        assert!(ensure_self(owner, owner).is_ok());
        assert!(matches!(
            ensure_self(UserId::new(), owner),
            Err(ApiError::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone(Some("  ".into())), None);
        assert_eq!(normalize_phone(Some(" +2519 ".into())), Some("+2519".into()));
    }
}
