use altshop_db::models::admin_user::AdminUser;
use altshop_db::models::audit::{AuditAction, AuditEntity, NewAuditLog};
use altshop_db::models::bot_admin::AdminRole;
use altshop_db::repositories::admin_user_repo::AdminUserRepository;
use altshop_db::repositories::audit_repo::AuditRepository;
use anyhow::Context;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

pub const BCRYPT_COST: u32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Admin user id.
    pub sub: String,
    pub username: String,
    pub role: AdminRole,
    pub exp: usize,
}

impl Claims {
    pub fn admin_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::Unauthorized("Invalid token".to_string()))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginUser {
    pub id: Uuid,
    pub username: String,
    pub role: AdminRole,
    pub telegram_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: LoginUser,
}

/// Where a login came from, for the audit trail.
#[derive(Debug, Clone, Default)]
pub struct LoginOrigin {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// HS256 signing and verification of admin session tokens.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_hours: i64,
}

impl JwtKeys {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_hours,
        }
    }

    pub fn issue(&self, admin: &AdminUser) -> anyhow::Result<String> {
        let exp = chrono::Utc::now()
            .checked_add_signed(chrono::Duration::hours(self.ttl_hours))
            .context("Token expiry out of range")?
            .timestamp() as usize;

        let claims = Claims {
            sub: admin.id.to_string(),
            username: admin.username.clone(),
            role: admin.role,
            exp,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).context("Failed to sign token")
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|_| AppError::Unauthorized("Invalid token".to_string()))
    }
}

/// bcrypt is CPU-bound; keep it off the async workers.
pub(crate) async fn hash_password(password: String) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST))
        .await
        .context("Password hashing task failed")?
        .context("Failed to hash password")
}

async fn verify_password(password: String, hash: String) -> bool {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
        .await
        .unwrap_or(false)
}

#[derive(Clone)]
pub struct AuthService {
    admins: AdminUserRepository,
    audit: AuditRepository,
    keys: JwtKeys,
}

impl AuthService {
    pub fn new(admins: AdminUserRepository, audit: AuditRepository, keys: JwtKeys) -> Self {
        Self { admins, audit, keys }
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    pub async fn login(&self, username: &str, password: &str, origin: LoginOrigin) -> Result<LoginResponse, AppError> {
        let invalid = || AppError::Unauthorized("Invalid credentials".to_string());

        let admin = self
            .admins
            .get_by_username(username)
            .await?
            .filter(|a| a.is_active)
            .ok_or_else(invalid)?;
        if !verify_password(password.to_string(), admin.password.clone()).await {
            tracing::warn!("Failed login attempt for {}", username);
            return Err(invalid());
        }

        self.admins.touch_last_login(admin.id).await?;
        let access_token = self.keys.issue(&admin)?;

        // admin_id is a bigint telegram id; the uuid goes into entity_id.
        let mut entry = NewAuditLog::new(AuditAction::Login, AuditEntity::Admin);
        entry.entity_id = Some(admin.id.to_string());
        entry.admin_id = admin.telegram_id;
        entry.admin_username = Some(admin.username.clone());
        entry.description = Some(format!("Admin {} logged in", admin.username));
        entry.ip_address = origin.ip_address;
        entry.user_agent = origin.user_agent;
        if let Err(e) = self.audit.insert(entry).await {
            tracing::warn!("Failed to record login audit entry: {:#}", e);
        }

        tracing::info!("Admin {} logged in", admin.username);
        Ok(LoginResponse {
            access_token,
            user: LoginUser {
                id: admin.id,
                username: admin.username,
                role: admin.role,
                telegram_id: admin.telegram_id,
            },
        })
    }

    pub async fn profile(&self, claims: &Claims) -> Result<AdminUser, AppError> {
        self.admins
            .get_by_id(claims.admin_id()?)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))
    }

    pub async fn change_password(&self, claims: &Claims, old: &str, new: &str) -> Result<(), AppError> {
        let admin = self.profile(claims).await?;
        if !verify_password(old.to_string(), admin.password.clone()).await {
            return Err(AppError::Unauthorized("Invalid old password".to_string()));
        }
        if new.is_empty() {
            return Err(AppError::Validation("newPassword must not be empty".to_string()));
        }

        let hash = hash_password(new.to_string()).await?;
        self.admins.set_password(admin.id, &hash).await?;
        tracing::info!("Admin {} changed password", admin.username);
        Ok(())
    }
}

/// Creates a super admin or resets an existing admin's password. Returns `true` when created.
pub async fn upsert_admin_password(
    admins: &AdminUserRepository,
    username: &str,
    password: &str,
    telegram_id: Option<i64>,
) -> anyhow::Result<bool> {
    let hash = hash_password(password.to_string()).await?;
    if admins.set_password_by_username(username, &hash).await? > 0 {
        return Ok(false);
    }
    admins.create(username, &hash, telegram_id, AdminRole::SuperAdmin).await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn admin() -> AdminUser {
        let now = NaiveDateTime::default();
        AdminUser {
            id: Uuid::new_v4(),
            username: "root".to_string(),
            password: String::new(),
            telegram_id: Some(42),
            role: AdminRole::SuperAdmin,
            is_active: true,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn token_round_trip() {
        let keys = JwtKeys::new("secret", 1);
        let admin = admin();
        let token = keys.issue(&admin).unwrap();
        let claims = keys.verify(&token).unwrap();

        assert_eq!(claims.sub, admin.id.to_string());
        assert_eq!(claims.username, "root");
        assert_eq!(claims.role, AdminRole::SuperAdmin);
        assert_eq!(claims.admin_id().unwrap(), admin.id);
    }

    #[test]
    fn foreign_or_expired_tokens_are_rejected() {
        let token = JwtKeys::new("secret", 1).issue(&admin()).unwrap();
        assert!(matches!(JwtKeys::new("other", 1).verify(&token), Err(AppError::Unauthorized(_))));

        let expired = JwtKeys::new("secret", -2).issue(&admin()).unwrap();
        assert!(JwtKeys::new("secret", 1).verify(&expired).is_err());
        assert!(JwtKeys::new("secret", 1).verify("not-a-jwt").is_err());
    }

    #[tokio::test]
    async fn password_hash_verifies() {
        let hash = hash_password("hunter2".to_string()).await.unwrap();
        assert!(verify_password("hunter2".to_string(), hash.clone()).await);
        assert!(!verify_password("hunter3".to_string(), hash).await);
    }
}
