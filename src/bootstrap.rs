//! Run-once deployment initialization.
//!
//! The admin account is seeded here, explicitly, instead of as an
//! import-time side effect of application startup. The existence check
//! makes repeat runs a no-op, so the step can be wired into every deploy.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use tracing::info;

use crate::db::DbPool;
use crate::entities::user::{self, Entity as UserEntity};
use crate::errors::ServiceError;

/// Outcome of [`ensure_admin_user`].
#[derive(Debug, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Created,
    AlreadyExists,
}

/// Admin account settings, resolved from config/CLI by the caller.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Idempotently creates the administrative superuser.
pub async fn ensure_admin_user(
    db: &DbPool,
    seed: &AdminSeed,
) -> Result<BootstrapOutcome, ServiceError> {
    let existing = UserEntity::find()
        .filter(user::Column::Username.eq(seed.username.as_str()))
        .one(db)
        .await?;

    if existing.is_some() {
        info!(username = %seed.username, "superuser already exists");
        return Ok(BootstrapOutcome::AlreadyExists);
    }

    let model = user::ActiveModel {
        username: Set(seed.username.clone()),
        email: Set(seed.email.clone()),
        password_hash: Set(hash_password(&seed.password)?),
        is_superuser: Set(true),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    model.insert(db).await?;

    info!(username = %seed.username, "superuser created");
    Ok(BootstrapOutcome::Created)
}

fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::Internal(format!("password hashing failed: {e}")))
}

/// Checks a candidate password against a stored PHC hash string.
pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}
