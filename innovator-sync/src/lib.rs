pub mod cli;
pub mod hyperthought;
pub mod load_config;

pub use cli::{run, Cli, Commands};
