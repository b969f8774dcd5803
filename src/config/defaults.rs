//! Default values for configuration

/// Default HTTP bind address
pub fn default_bind_addr() -> String {
    std::env::var("STOCKROOM_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string())
}

/// Development mode exposes internal error details in responses
pub fn default_dev_mode() -> bool {
    false
}

/// Maximum upload size (10 MiB)
pub fn default_upload_max_bytes() -> usize {
    10 * 1024 * 1024
}

/// MIME types accepted for inventory uploads
pub fn default_upload_mime_types() -> Vec<String> {
    vec![
        "text/csv".to_string(),
        "application/vnd.ms-excel".to_string(),
        "text/plain".to_string(),
    ]
}

/// File extensions accepted for inventory uploads
pub fn default_upload_extensions() -> Vec<String> {
    vec![".csv".to_string()]
}

/// Logo fetch timeout in seconds
pub fn default_logo_timeout() -> u64 {
    10
}

/// User agent used when fetching store logos
pub fn default_report_user_agent() -> String {
    format!("stockroom/{}", env!("CARGO_PKG_VERSION"))
}

/// Number of rows in each report table
pub fn default_report_top_n() -> usize {
    5
}
