//! Serve command implementation

use crate::config::Config;
use crate::db::Db;
use crate::error::Result;
use crate::http::{self, AppState};

/// Run the HTTP API until interrupted
pub async fn cmd_serve(config: Config, db: Db, bind: Option<String>) -> Result<()> {
    let addr = bind.unwrap_or_else(|| config.server.bind_addr.clone());
    if config.server.dev_mode {
        tracing::warn!("Development mode: internal error details are returned to clients");
    }
    let state = AppState::new(config, db)?;
    http::serve(state, &addr).await
}
