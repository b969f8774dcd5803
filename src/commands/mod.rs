//! CLI commands implementation

pub mod ingest;
pub mod init;
pub mod report;
pub mod runs;
pub mod serve;

pub use ingest::*;
pub use init::*;
pub use report::*;
pub use runs::*;
pub use serve::*;
