//! Init command implementation

use crate::config::Config;
use crate::db::Db;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub struct InitOptions {
    pub config_path: PathBuf,
    pub force: bool,
}

/// What `init` set up
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitSummary {
    pub config_path: String,
    pub db_path: String,
    pub scratch_dir: String,
    pub overwritten: bool,
}

/// Write the default configuration and create the database schema
pub async fn cmd_init(options: InitOptions) -> Result<InitSummary> {
    let InitOptions { config_path, force } = options;

    let existed = config_path.exists();
    if existed && !force {
        return Err(Error::Config(format!(
            "Config already exists at {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    let base_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let mut config = Config::with_base_dir(&base_dir);
    config.paths.config_file = config_path;

    config.save()?;
    std::fs::create_dir_all(&config.paths.scratch_dir)?;

    let db = Db::connect(&config).await?;
    db.init_schema().await?;
    info!("Initialized stockroom in {}", base_dir.display());

    Ok(InitSummary {
        config_path: config.paths.config_file.display().to_string(),
        db_path: config.paths.db_file.display().to_string(),
        scratch_dir: config.paths.scratch_dir.display().to_string(),
        overwritten: existed,
    })
}

pub fn print_init_summary(summary: &InitSummary) {
    if summary.overwritten {
        println!("\n✓ stockroom re-initialized (existing config overwritten)\n");
    } else {
        println!("\n✓ stockroom initialized\n");
    }
    println!("Config:   {}", summary.config_path);
    println!("Database: {}", summary.db_path);
    println!("Scratch:  {}", summary.scratch_dir);
    println!("\nNext: 'stockroom ingest <file.csv>' or 'stockroom serve'");
}
