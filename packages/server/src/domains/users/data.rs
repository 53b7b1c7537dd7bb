use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::UserId;
use crate::domains::users::models::User;

/// Public representation of an account. Password material is never included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserData {
    #[schema(value_type = Uuid)]
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserData {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            phone_number: user.phone_number,
            created_at: user.created_at,
        }
    }
}

impl From<&User> for UserData {
    fn from(user: &User) -> Self {
        user.clone().into()
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RegisterUserInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub phone_number: Option<String>,
    #[schema(min_length = 8, format = Password)]
    pub password: Option<String>,
    #[schema(format = Password)]
    pub password_confirm: Option<String>,
}

/// Body of `PUT` (all of `email` required) and `PATCH` (everything optional).
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateUserInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}
