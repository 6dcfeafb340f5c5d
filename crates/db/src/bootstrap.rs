use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use quote_request_core::audit::AuditSink;
use quote_request_core::checker::StatusQuoteRequestChecker;
use quote_request_core::config::{AppConfig, ConfigError, LoadOptions};
use quote_request_core::converter::QuoteRequestToQuoteConverter;
use quote_request_core::ports::{
    Calculation, CartClient, CartFacade, Clock, CompanyUserResolver, SystemClock,
};
use quote_request_core::reference::QuoteRequestReferenceGenerator;
use quote_request_core::sanitizer::QuoteRequestVersionSanitizer;
use quote_request_core::status_policy::StatusPolicy;
use quote_request_core::writer::{QuoteRequestWriter, UserQuoteRequestWriter, WriterCollaborators};

use crate::connection::connect_with_config;
use crate::repositories::{SqlQuoteRequestStore, SqlSequenceNumberGenerator};
use crate::{migrations, DbPool};

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

/// Services the host application supplies: cart, pricing, company-user
/// lookup and the audit destination.
#[derive(Clone)]
pub struct HostServices {
    pub cart: Arc<dyn CartFacade>,
    pub cart_client: Arc<dyn CartClient>,
    pub calculation: Arc<dyn Calculation>,
    pub company_user_resolver: Arc<dyn CompanyUserResolver>,
    pub audit: Arc<dyn AuditSink>,
    pub clock: Arc<dyn Clock>,
}

impl HostServices {
    pub fn new(
        cart: Arc<dyn CartFacade>,
        cart_client: Arc<dyn CartClient>,
        calculation: Arc<dyn Calculation>,
        company_user_resolver: Arc<dyn CompanyUserResolver>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            cart,
            cart_client,
            calculation,
            company_user_resolver,
            audit,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// Fully wired writers and converter over a migrated sqlite pool.
pub struct QuoteRequestApplication {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub store: Arc<SqlQuoteRequestStore>,
    pub customer_writer: QuoteRequestWriter,
    pub agent_writer: UserQuoteRequestWriter,
    pub converter: QuoteRequestToQuoteConverter,
}

pub async fn bootstrap(
    options: LoadOptions,
    services: HostServices,
) -> Result<QuoteRequestApplication, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting quote request bootstrap"
    );
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config, services).await
}

pub async fn bootstrap_with_config(
    config: AppConfig,
    services: HostServices,
) -> Result<QuoteRequestApplication, BootstrapError> {
    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let store = Arc::new(SqlQuoteRequestStore::new(db_pool.clone()));
    let references = QuoteRequestReferenceGenerator::new(
        Arc::new(SqlSequenceNumberGenerator::new(db_pool.clone())),
        &config.quote_request,
    );
    let collaborators = WriterCollaborators::new(
        store.clone(),
        store.clone(),
        services.company_user_resolver.clone(),
        QuoteRequestVersionSanitizer::new(services.cart.clone(), services.calculation.clone()),
        references,
    )
    .with_clock(services.clock.clone())
    .with_audit(services.audit.clone());
    let policy = StatusPolicy::from_config(&config.quote_request);

    let converter = QuoteRequestToQuoteConverter::new(
        services.cart_client.clone(),
        Arc::new(StatusQuoteRequestChecker::new(services.clock.clone())),
    )
    .with_audit(services.audit.clone());

    Ok(QuoteRequestApplication {
        customer_writer: QuoteRequestWriter::new(collaborators.clone(), policy.clone()),
        agent_writer: UserQuoteRequestWriter::new(
            collaborators,
            policy,
            config.quote_request.default_currency.clone(),
        ),
        converter,
        store,
        db_pool,
        config,
    })
}
