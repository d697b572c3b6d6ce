//! Staff accounts (office workers and field technicians)

use crate::config::AppConfig;
use crate::core::Resource;
use crate::core::error::{AppResult, EntityError};
use crate::core::field::validate_phone;
use crate::core::service::{DataService, search_live};
use crate::core::validation::filters;
use crate::storage::Stores;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

crate::string_enum!(UserStatus {
    Active => "active",
    Inactive => "inactive",
});

crate::string_enum!(UserRole {
    Admin => "admin",
    Office => "office",
    Technician => "technician",
});

crate::impl_data_entity!(User, "user", "users", UserStatus, ["name", "email", "role"], {
    email: String,
    role: UserRole,
    #[serde(default)]
    phone: Option<String>,
});

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUser {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub role: UserRole,
    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUser {
    #[validate(length(min = 1, max = 128))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub role: Option<UserRole>,
    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,
    pub status: Option<UserStatus>,
}

#[async_trait]
impl Resource for User {
    type Create = CreateUser;
    type Update = UpdateUser;

    fn store(stores: &Stores) -> Arc<dyn DataService<Self>> {
        stores.users.clone()
    }

    fn from_create(input: CreateUser, _config: &AppConfig) -> AppResult<Self> {
        Ok(User::new(
            filters::trim(&input.name),
            UserStatus::Active,
            filters::email(&input.email),
            input.role,
            input.phone.as_deref().map(filters::digits_only),
        ))
    }

    fn apply_update(&mut self, input: UpdateUser, _config: &AppConfig) -> AppResult<()> {
        if let Some(name) = input.name {
            self.name = filters::trim(&name);
        }
        if let Some(email) = input.email {
            self.email = filters::email(&email);
        }
        if let Some(role) = input.role {
            self.role = role;
        }
        if let Some(phone) = input.phone {
            self.phone = Some(filters::digits_only(&phone));
        }
        if let Some(status) = input.status {
            self.status = status;
        }
        self.touch();
        Ok(())
    }

    async fn check_references(&self, stores: &Stores) -> AppResult<()> {
        let duplicate = search_live(stores.users.as_ref(), "email", &self.email)
            .await?
            .into_iter()
            .find(|other| other.id != self.id);
        match duplicate {
            Some(other) => Err(EntityError::AlreadyExists {
                entity_type: "user".to_string(),
                id: other.id,
            }
            .into()),
            None => Ok(()),
        }
    }
}
