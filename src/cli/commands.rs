//! CLI command implementations
//!
//! Each command opens the database, does one thing, and prints one JSON
//! object. Writes commit before returning.

use std::path::Path;

use serde_json::{json, Value};

use crate::codec;
use crate::db::{Database, DbConfig, OpenMode, PutMode};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::write_response;

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    let config = load_config(cli.config.as_deref())?;
    let data = run_command(cli.command, &config)?;
    write_response(data)
}

/// Runs one command and returns the JSON it prints
pub fn run_command(cmd: Command, config: &DbConfig) -> CliResult<Value> {
    match cmd {
        Command::Create { db } => create(&db, config),
        Command::Put {
            db,
            key,
            document,
            mode,
        } => put(&db, config, &key, &document, mode.into()),
        Command::Get { db, key, at } => get(&db, config, &key, at),
        Command::Remove { db, key } => remove(&db, config, &key),
        Command::List { db, at } => list(&db, config, at),
        Command::Info { db } => info(&db, config),
        Command::History { db } => history(&db, config),
        Command::Export { db, target } => export(&db, config, &target),
    }
}

fn load_config(path: Option<&Path>) -> CliResult<DbConfig> {
    match path {
        Some(path) => Ok(DbConfig::load(path)?),
        None => Ok(DbConfig::default()),
    }
}

/// Create a new database file
pub fn create(path: &Path, config: &DbConfig) -> CliResult<Value> {
    if path.exists() {
        return Err(CliError::invalid_input(format!(
            "{} already exists",
            path.display()
        )));
    }
    let db = Database::open_with_config(path, OpenMode::CreateAndWrite, config)?;
    Ok(json!({
        "path": path.display().to_string(),
        "page_size": db.page_size(),
        "checkpoint": db.checkpoint(),
    }))
}

/// Store one document and commit
pub fn put(
    path: &Path,
    config: &DbConfig,
    key: &str,
    document: &str,
    mode: PutMode,
) -> CliResult<Value> {
    let document: Value = serde_json::from_str(document)
        .map_err(|e| CliError::invalid_input(format!("document is not valid JSON: {}", e)))?;

    let mut db = Database::open_with_config(path, OpenMode::Write, config)?;
    let written = db.put_document(key.as_bytes(), &document, mode)?;
    let checkpoint = db.commit_changes()?;

    Ok(json!({
        "key": key,
        "written": written,
        "checkpoint": checkpoint,
    }))
}

/// Print one document
pub fn get(path: &Path, config: &DbConfig, key: &str, at: Option<u64>) -> CliResult<Value> {
    let db = open_view(path, config, at)?;
    let document = db.get_document(key.as_bytes())?;
    Ok(json!({
        "key": key,
        "checkpoint": db.checkpoint(),
        "document": document,
    }))
}

/// Remove one document and commit
pub fn remove(path: &Path, config: &DbConfig, key: &str) -> CliResult<Value> {
    let mut db = Database::open_with_config(path, OpenMode::Write, config)?;
    let removed = db.remove(key.as_bytes())?;
    let checkpoint = db.commit_changes()?;
    Ok(json!({
        "key": key,
        "removed": removed,
        "checkpoint": checkpoint,
    }))
}

/// Print every document in key order
pub fn list(path: &Path, config: &DbConfig, at: Option<u64>) -> CliResult<Value> {
    let db = open_view(path, config, at)?;
    let mut documents = Vec::with_capacity(db.len());
    for (key, value) in db.iter() {
        documents.push(json!({
            "key": String::from_utf8_lossy(key),
            "document": codec::decode(&value).map_err(crate::db::DbError::from)?,
        }));
    }
    Ok(json!({
        "checkpoint": db.checkpoint(),
        "documents": documents,
    }))
}

/// Print checkpoint, size and damage information
pub fn info(path: &Path, config: &DbConfig) -> CliResult<Value> {
    let db = Database::open_with_config(path, OpenMode::ReadOnly, config)?;
    let mut info = serde_json::to_value(db.stats())?;
    if let Some(obj) = info.as_object_mut() {
        obj.insert("damaged".to_string(), json!(db.is_damaged()));
    }
    Ok(info)
}

/// Print checkpoint ids, newest first
pub fn history(path: &Path, config: &DbConfig) -> CliResult<Value> {
    let db = Database::open_with_config(path, OpenMode::ReadOnly, config)?;
    Ok(json!({ "checkpoints": db.history() }))
}

/// Write a compacted copy
pub fn export(path: &Path, config: &DbConfig, target: &Path) -> CliResult<Value> {
    let db = Database::open_with_config(path, OpenMode::ReadOnly, config)?;
    db.write_to(target)?;
    Ok(json!({
        "target": target.display().to_string(),
        "documents": db.len(),
    }))
}

fn open_view(path: &Path, config: &DbConfig, at: Option<u64>) -> CliResult<Database> {
    let db = Database::open_with_config(path, OpenMode::ReadOnly, config)?;
    match at {
        Some(checkpoint) => Ok(db.open_at(checkpoint)?),
        None => Ok(db),
    }
}
