use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{
        password::{hash_password, verify_password},
        Role,
    },
    db::DbPool,
    entities::user::{self, Entity as UserEntity},
    errors::ServiceError,
    events::{Event, EventSender},
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, max = 120, message = "Name is required"))]
    pub name: String,
    pub role: Role,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<user::Model> for UserResponse {
    type Error = ServiceError;

    fn try_from(model: user::Model) -> Result<Self, Self::Error> {
        let role = Role::from_str(&model.role).map_err(|_| {
            ServiceError::InternalError(format!("user {} has unknown role '{}'", model.id, model.role))
        })?;
        Ok(Self {
            id: model.id,
            email: model.email,
            name: model.name,
            role,
            active: model.active,
            created_at: model.created_at,
        })
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Clone)]
pub struct UserService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl UserService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, request), fields(email = %request.email, role = %request.role))]
    pub async fn create_user(&self, request: CreateUserRequest) -> Result<UserResponse, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;
        let email = normalize_email(&request.email);

        let existing = UserEntity::find()
            .filter(user::Column::Email.eq(email.as_str()))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "A user with email {} already exists",
                email
            )));
        }

        let model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email),
            name: Set(request.name),
            role: Set(request.role.to_string()),
            password_hash: Set(hash_password(&request.password)?),
            active: Set(true),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await?;

        info!(user_id = %model.id, "user created");
        if let Some(sender) = &self.event_sender {
            sender.send_or_log(Event::UserCreated(model.id)).await;
        }
        model.try_into()
    }

    pub async fn get_user(&self, id: Uuid) -> Result<UserResponse, ServiceError> {
        UserEntity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", id)))?
            .try_into()
    }

    /// Checks credentials. Unknown emails, wrong passwords and inactive
    /// accounts all answer with the same `Unauthorized`.
    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserResponse, ServiceError> {
        let denied = || ServiceError::Unauthorized("Invalid email or password".to_string());

        let model = UserEntity::find()
            .filter(user::Column::Email.eq(normalize_email(email)))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(denied)?;

        if !model.active || !verify_password(password, &model.password_hash)? {
            warn!(user_id = %model.id, "login rejected");
            return Err(denied());
        }
        model.try_into()
    }

    /// Creates the configured admin account on first boot. Returns `None`
    /// when the account already exists.
    pub async fn ensure_bootstrap_admin(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<UserResponse>, ServiceError> {
        let exists = UserEntity::find()
            .filter(user::Column::Email.eq(normalize_email(email)))
            .one(&*self.db_pool)
            .await?
            .is_some();
        if exists {
            return Ok(None);
        }

        let admin = self
            .create_user(CreateUserRequest {
                email: email.to_string(),
                name: "Administrator".to_string(),
                role: Role::Admin,
                password: password.to_string(),
            })
            .await?;
        info!(user_id = %admin.id, "bootstrap admin created");
        Ok(Some(admin))
    }
}
