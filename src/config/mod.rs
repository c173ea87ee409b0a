#[cfg(feature = "cli")]
pub mod cli;
pub mod file;
#[cfg(feature = "lambda")]
pub mod lambda;
#[cfg(feature = "server")]
pub mod server;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
#[cfg(feature = "lambda")]
pub use lambda::LambdaConfig;
#[cfg(feature = "server")]
pub use server::ServerConfig;
