//! CLI command implementations

pub mod cache;
pub mod completions;
pub mod config;
pub mod init;
pub mod plan;
pub mod run;
pub mod schedule;
pub mod status;

pub use cache::execute as cache;
pub use completions::execute as completions;
pub use config::execute as config;
pub use init::execute as init;
pub use plan::execute as plan;
pub use run::execute as run;
pub use schedule::execute as schedule;
pub use status::execute as status;
