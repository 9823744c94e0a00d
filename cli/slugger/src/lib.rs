//! slugger - deploy a pre-built slug to a Heroku app.
//!
//! Reads a Procfile, registers the slug with the platform API, streams the
//! tarball to the returned blob URL and (optionally) releases it.

pub mod cli;
pub mod client;
pub mod config;
pub mod deploy;
pub mod error;
pub mod output;
pub mod procfile;
pub mod release;
pub mod slug;
pub mod source;

pub use cli::Cli;
pub use config::DeployConfig;
pub use deploy::Outcome;
pub use error::CliError;
