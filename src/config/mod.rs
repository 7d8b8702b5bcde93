pub use self::parser::{
    CodeforcesConfig, Config, DatabaseConfig, DbType, GitHubConfig, LoggingConfig, ServerConfig,
};
pub use self::validator::ConfigError;

mod parser;
mod validator;
