//! Bootstrap helpers.
//!
//! Env files are loaded before configuration resolves. dotenvy never
//! overwrites existing vars, so the effective priority is:
//!
//!   explicit env vars > `./.env` > `~/.formo-sync/.env`

use std::path::PathBuf;

/// `~/.formo-sync`.
pub fn formo_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".formo-sync")
}

/// Path to the formo-sync specific `.env` file.
pub fn formo_env_path() -> PathBuf {
    formo_home().join(".env")
}

/// Load `./.env`, then `~/.formo-sync/.env`.
pub fn load_env_files() {
    let _ = dotenvy::dotenv();

    let path = formo_env_path();
    if path.exists()
        && let Err(e) = dotenvy::from_path(&path)
    {
        tracing::warn!("Failed to load {}: {}", path.display(), e);
    }
}
