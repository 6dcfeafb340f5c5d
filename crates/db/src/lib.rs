pub mod bootstrap;
pub mod connection;
pub mod migrations;
pub mod repositories;

pub use bootstrap::{
    bootstrap, bootstrap_with_config, BootstrapError, HostServices, QuoteRequestApplication,
};
pub use connection::{connect_with_config, connect_with_settings, DbPool};
pub use repositories::{
    InMemoryQuoteRequestStore, InMemorySequenceNumberGenerator, RepositoryError,
    SqlQuoteRequestStore, SqlSequenceNumberGenerator,
};
