//! Manual database backups through the PostgreSQL client tools.
//!
//! Every tool runs as a child process with `PGPASSWORD` in its environment. Pipelines
//! (`pg_dump | gzip`, `gunzip | psql`) are wired between children by the parent and the
//! dump file is handed to the last child as its stdout, so no shell is involved. Failures
//! come back as `BackupResult { success: false, .. }` rather than as errors.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::SystemTime;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::process::Command;

use crate::config::{BackupConfig, DatabaseConfig};
use crate::utils::format_size;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupInfo {
    pub filename: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackupResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl BackupResult {
    fn ok(message: impl Into<String>, filename: Option<String>) -> Self {
        Self { success: true, message: message.into(), filename }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into(), filename: None }
    }
}

/// A plain file name: no separators, no parent references, no hidden files.
pub fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(|c: char| matches!(c, '/' | '\\' | '\0'))
        && !name.contains("..")
}

fn is_backup_file(name: &str) -> bool {
    name.ends_with(".sql") || name.ends_with(".sql.gz")
}

pub fn backup_filename(now: DateTime<Utc>, compressed: bool) -> String {
    let stamp = now.format("%Y-%m-%dT%H-%M-%S-%3fZ");
    if compressed {
        format!("backup_{}.sql.gz", stamp)
    } else {
        format!("backup_{}.sql", stamp)
    }
}

#[derive(Debug, Clone)]
pub struct BackupService {
    dir: PathBuf,
    max_keep: usize,
    compression: bool,
    db: DatabaseConfig,
}

impl BackupService {
    pub fn new(config: &BackupConfig, db: &DatabaseConfig) -> Self {
        if let Err(e) = std::fs::create_dir_all(&config.dir) {
            tracing::warn!("Failed to create backup directory {}: {}", config.dir.display(), e);
        }
        Self {
            dir: config.dir.clone(),
            max_keep: config.max_keep,
            compression: config.compression,
            db: db.clone(),
        }
    }

    fn resolve(&self, filename: &str) -> Option<PathBuf> {
        is_safe_filename(filename).then(|| self.dir.join(filename))
    }

    fn pg_command(&self, program: &str, database: &str) -> Command {
        let mut cmd = Command::new(program);
        cmd.arg("-h")
            .arg(&self.db.host)
            .arg("-p")
            .arg(self.db.port.to_string())
            .arg("-U")
            .arg(&self.db.user)
            .arg("-d")
            .arg(database)
            .env("PGPASSWORD", &self.db.password)
            .kill_on_drop(true);
        cmd
    }

    /// Backup files, newest first. An unreadable directory yields an empty list.
    pub async fn list(&self) -> Vec<BackupInfo> {
        match self.scan().await {
            Ok(list) => list,
            Err(e) => {
                tracing::error!("Error listing backups: {:#}", e);
                Vec::new()
            }
        }
    }

    async fn scan(&self) -> Result<Vec<BackupInfo>> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .with_context(|| format!("Failed to read {}", self.dir.display()))?;
        let mut backups = Vec::new();

        while let Some(entry) = entries.next_entry().await.context("Failed to read directory entry")? {
            let Ok(filename) = entry.file_name().into_string() else {
                continue;
            };
            if !is_backup_file(&filename) {
                continue;
            }
            let meta = entry.metadata().await.context("Failed to stat backup")?;
            if !meta.is_file() {
                continue;
            }
            let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            backups.push(BackupInfo {
                path: entry.path().display().to_string(),
                filename,
                size: meta.len(),
                created_at: DateTime::<Utc>::from(modified),
            });
        }

        backups.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.filename.cmp(&a.filename)));
        Ok(backups)
    }

    pub async fn create(&self) -> BackupResult {
        let filename = backup_filename(Utc::now(), self.compression);
        let path = self.dir.join(&filename);

        match self.dump_to(&path).await {
            Ok(size) => {
                tracing::info!("Backup {} created ({})", filename, format_size(size));
                self.prune().await;
                BackupResult::ok(
                    format!("Backup created successfully ({})", format_size(size)),
                    Some(filename),
                )
            }
            Err(e) => {
                tracing::error!("Error creating backup: {:#}", e);
                let _ = tokio::fs::remove_file(&path).await;
                BackupResult::failed(format!("Error creating backup: {:#}", e))
            }
        }
    }

    async fn dump_to(&self, path: &Path) -> Result<u64> {
        let file = tokio::fs::File::create(path)
            .await
            .with_context(|| format!("Failed to create {}", path.display()))?
            .into_std()
            .await;
        let sync = file.try_clone().context("Failed to clone backup file handle")?;

        let mut dump = self.pg_command("pg_dump", &self.db.name);
        if self.compression {
            let mut gzip = Command::new("gzip");
            gzip.arg("-c").stdout(Stdio::from(file));
            pipe(dump, gzip).await?;
        } else {
            dump.stdout(Stdio::from(file)).stderr(Stdio::piped());
            let child = dump.spawn().context("Failed to start pg_dump")?;
            check_output("pg_dump", child.wait_with_output().await)?;
        }

        sync.sync_all().context("Failed to flush backup file")?;
        let meta = tokio::fs::metadata(path).await.context("Backup file was not created")?;
        Ok(meta.len())
    }

    /// Restores a dump. With `clear_existing` the database is dropped and recreated first.
    pub async fn restore(&self, filename: &str, clear_existing: bool) -> BackupResult {
        let Some(path) = self.resolve(filename).filter(|p| p.is_file()) else {
            return BackupResult::failed("Backup file not found");
        };

        match self.restore_from(&path, filename.ends_with(".gz"), clear_existing).await {
            Ok(()) => {
                tracing::warn!("Database restored from {}", filename);
                BackupResult::ok("Backup restored successfully", None)
            }
            Err(e) => {
                tracing::error!("Error restoring backup: {:#}", e);
                BackupResult::failed(format!("Error restoring backup: {:#}", e))
            }
        }
    }

    async fn restore_from(&self, path: &Path, gzipped: bool, clear_existing: bool) -> Result<()> {
        if clear_existing {
            let name = self.db.name.replace('"', "\"\"");
            let output = self
                .pg_command("psql", "postgres")
                .arg("-c")
                .arg(format!("DROP DATABASE IF EXISTS \"{}\"", name))
                .arg("-c")
                .arg(format!("CREATE DATABASE \"{}\"", name))
                .output()
                .await;
            check_output("psql", output)?;
        }

        let mut psql = self.pg_command("psql", &self.db.name);
        psql.stdout(Stdio::null());

        if gzipped {
            let mut gunzip = Command::new("gunzip");
            gunzip.arg("-c").arg(path);
            return pipe(gunzip, psql).await;
        }

        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;
        psql.stdin(Stdio::from(file.into_std().await)).stderr(Stdio::piped());
        let child = psql.spawn().context("Failed to start psql")?;
        check_output("psql", child.wait_with_output().await)
    }

    pub async fn delete(&self, filename: &str) -> BackupResult {
        let Some(path) = self.resolve(filename).filter(|p| p.is_file()) else {
            return BackupResult::failed("Backup file not found");
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!("Backup {} deleted", filename);
                BackupResult::ok("Backup deleted successfully", None)
            }
            Err(e) => {
                tracing::error!("Error deleting backup {}: {}", filename, e);
                BackupResult::failed(format!("Error deleting backup: {}", e))
            }
        }
    }

    /// Opens a backup for streaming. `None` for unsafe names and missing files.
    pub async fn open(&self, filename: &str) -> Result<Option<tokio::fs::File>> {
        let Some(path) = self.resolve(filename).filter(|p| p.is_file()) else {
            return Ok(None);
        };
        let file = tokio::fs::File::open(&path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;
        Ok(Some(file))
    }

    /// Keeps the newest `max_keep` backups. `0` disables pruning.
    async fn prune(&self) {
        if self.max_keep == 0 {
            return;
        }
        for old in self.list().await.into_iter().skip(self.max_keep) {
            match tokio::fs::remove_file(&old.path).await {
                Ok(()) => tracing::info!("Pruned old backup {}", old.filename),
                Err(e) => tracing::warn!("Failed to prune backup {}: {}", old.filename, e),
            }
        }
    }
}

fn tool_name(cmd: &Command) -> String {
    cmd.as_std().get_program().to_string_lossy().into_owned()
}

/// Runs `upstream | downstream`. Both children are awaited together so neither stderr pipe can
/// fill up and stall the other, and a failure on either side fails the pipeline. The caller
/// decides where `downstream` writes.
async fn pipe(mut upstream: Command, mut downstream: Command) -> Result<()> {
    let producer_name = tool_name(&upstream);
    let consumer_name = tool_name(&downstream);

    let mut producer = upstream
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("Failed to start {}", producer_name))?;
    let out = producer
        .stdout
        .take()
        .with_context(|| format!("{} stdout unavailable", producer_name))?;
    let stdin: Stdio = out
        .try_into()
        .with_context(|| format!("Failed to wire {} into {}", producer_name, consumer_name))?;

    let consumer = downstream
        .stdin(stdin)
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("Failed to start {}", consumer_name))?;

    let (produced, consumed) = tokio::join!(producer.wait_with_output(), consumer.wait_with_output());
    check_output(&producer_name, produced)?;
    check_output(&consumer_name, consumed)
}

fn check_output(tool: &str, output: std::io::Result<std::process::Output>) -> Result<()> {
    let output = output.with_context(|| format!("Failed to run {}", tool))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("{} failed: {}", tool, stderr.trim());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn service(dir: &Path, max_keep: usize) -> BackupService {
        let backup = BackupConfig { dir: dir.to_path_buf(), max_keep, compression: true };
        let db = crate::config::AppConfig::for_tests().database;
        BackupService::new(&backup, &db)
    }

    fn touch(dir: &Path, name: &str, age_secs: u64) {
        let path = dir.join(name);
        std::fs::write(&path, b"-- dump").unwrap();
        let file = std::fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(age_secs)).unwrap();
    }

    #[test]
    fn filename_rules() {
        assert!(is_safe_filename("backup_2024-01-01T00-00-00-000Z.sql.gz"));
        assert!(!is_safe_filename(""));
        assert!(!is_safe_filename("../etc/passwd"));
        assert!(!is_safe_filename("a/b.sql"));
        assert!(!is_safe_filename("a\\b.sql"));
        assert!(!is_safe_filename(".hidden.sql"));
    }

    #[test]
    fn generated_names_replace_separators() {
        let ts = DateTime::parse_from_rfc3339("2024-03-01T10:20:30.456Z").unwrap().with_timezone(&Utc);
        assert_eq!(backup_filename(ts, true), "backup_2024-03-01T10-20-30-456Z.sql.gz");
        assert_eq!(backup_filename(ts, false), "backup_2024-03-01T10-20-30-456Z.sql");
    }

    #[tokio::test]
    async fn list_filters_and_sorts_newest_first() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "old.sql", 300);
        touch(tmp.path(), "new.sql.gz", 10);
        touch(tmp.path(), "notes.txt", 5);
        std::fs::create_dir(tmp.path().join("dir.sql")).unwrap();

        let names: Vec<String> = service(tmp.path(), 0).list().await.into_iter().map(|b| b.filename).collect();
        assert_eq!(names, vec!["new.sql.gz", "old.sql"]);
    }

    #[tokio::test]
    async fn prune_keeps_the_newest() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "a.sql", 30);
        touch(tmp.path(), "b.sql", 20);
        touch(tmp.path(), "c.sql", 10);

        let svc = service(tmp.path(), 2);
        svc.prune().await;
        let names: Vec<String> = svc.list().await.into_iter().map(|b| b.filename).collect();
        assert_eq!(names, vec!["c.sql", "b.sql"]);
    }

    #[tokio::test]
    async fn delete_and_open_respect_names() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "x.sql", 1);
        let svc = service(tmp.path(), 0);

        assert!(svc.open("x.sql").await.unwrap().is_some());
        assert!(svc.open("../x.sql").await.unwrap().is_none());
        assert!(svc.open("missing.sql").await.unwrap().is_none());

        assert_eq!(svc.delete("missing.sql").await, BackupResult::failed("Backup file not found"));
        assert!(svc.delete("x.sql").await.success);
        assert!(svc.list().await.is_empty());
    }

    fn sink(program: &str) -> Command {
        let mut cmd = Command::new(program);
        cmd.stdout(Stdio::null());
        cmd
    }

    #[tokio::test]
    async fn pipe_passes_a_clean_stream() {
        let mut echo = Command::new("echo");
        echo.arg("select 1;");
        pipe(echo, sink("cat")).await.unwrap();
    }

    #[tokio::test]
    async fn pipe_fails_when_the_producer_fails() {
        let tmp = tempfile::tempdir().unwrap();
        // A gzip header cut off before any deflate data.
        let truncated = tmp.path().join("truncated.sql.gz");
        std::fs::write(&truncated, [0x1f, 0x8b, 0x08, 0x00]).unwrap();

        let mut gunzip = Command::new("gunzip");
        gunzip.arg("-c").arg(&truncated);
        let err = pipe(gunzip, sink("cat")).await.unwrap_err();
        assert!(err.to_string().starts_with("gunzip failed"), "{err:#}");
    }

    #[tokio::test]
    async fn pipe_fails_when_the_consumer_fails() {
        let err = pipe(Command::new("true"), sink("false")).await.unwrap_err();
        assert!(err.to_string().starts_with("false failed"), "{err:#}");
    }

    #[tokio::test]
    async fn restore_rejects_unknown_files() {
        let tmp = tempfile::tempdir().unwrap();
        let result = service(tmp.path(), 0).restore("../../secret.sql", true).await;
        assert!(!result.success);
        assert_eq!(result.message, "Backup file not found");
    }
}
