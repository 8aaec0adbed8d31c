use altshop_db::repositories::admin_user_repo::AdminUserRepository;
use anyhow::Result;
use sqlx::PgPool;

use crate::config::AppConfig;
use crate::services::auth_service::upsert_admin_password;
use crate::services::backup_service::BackupService;

pub async fn reset_password(pool: &PgPool, username: &str, new_pass: &str) -> Result<()> {
    let admins = AdminUserRepository::new(pool.clone());
    admins.ensure_table().await?;

    if upsert_admin_password(&admins, username, new_pass, None).await? {
        println!("New admin user '{}' created successfully.", username);
    } else {
        println!("Password for user '{}' has been successfully reset.", username);
    }
    Ok(())
}

pub async fn backup_create(config: &AppConfig) -> Result<()> {
    let service = BackupService::new(&config.backup, &config.database);
    let result = service.create().await;

    if result.success {
        println!("{} ({})", result.message, result.filename.unwrap_or_default());
        Ok(())
    } else {
        anyhow::bail!("{}", result.message)
    }
}
