mod config;
pub mod metrics;
mod repos;
mod services;
mod system;

use std::sync::Arc;

pub use config::Config;
use repos::Repos;
pub use repos::{BookingWriteError, IAccountRepo, IBookingRepo, ICalendarRepo, IEventTypeRepo, IHostRepo};
pub use services::*;
pub use system::{FakeSys, ISys, RealSys};
use tracing::warn;

/// The context for the application
/// Contains the repositories, configuration, external service seams and
/// system clock
///
/// System and services are abstracted to allow for testing
#[derive(Clone)]
pub struct SlotbookContext {
    pub repos: Repos,
    pub config: Config,
    pub sys: Arc<dyn ISys>,
    pub calendar_gateway: Arc<dyn ICalendarGateway>,
    pub mailer: Arc<dyn IMailer>,
    pub token_vault: TokenVault,
}

/// Will setup the infrastructure context given the environment
pub async fn setup_context() -> anyhow::Result<SlotbookContext> {
    let app_config = &slotbook_utils::config::APP_CONFIG;

    let repos = Repos::create_postgres(&app_config.pg.database_url).await?;
    let token_vault = TokenVault::from_config(app_config.token_vault_key.as_deref())?;
    let sys: Arc<dyn ISys> = Arc::new(RealSys {});

    let calendar_gateway: Arc<dyn ICalendarGateway> = match &app_config.google {
        Some(google) => Arc::new(GoogleCalendarGateway::new(
            GoogleClientCredentials {
                client_id: google.client_id.clone(),
                client_secret: google.client_secret.clone(),
            },
            repos.accounts.clone(),
            token_vault.clone(),
            sys.clone(),
        )),
        None => {
            warn!(
                "No google client configured - external calendars are stubbed and \
                 availability only reflects the local booking ledger"
            );
            Arc::new(StubCalendarGateway::new())
        }
    };

    let mailer: Arc<dyn IMailer> = match &app_config.mail_gateway_url {
        Some(url) => Arc::new(HttpMailer::new(url.clone())),
        None => Arc::new(LoggingMailer {}),
    };

    Ok(SlotbookContext {
        repos,
        config: Config::new(),
        sys,
        calendar_gateway,
        mailer,
        token_vault,
    })
}

/// Context backed entirely by process memory: in-memory repositories, a
/// stub calendar gateway and a logging mailer. Used by tests; callers
/// usually replace `sys` with a pinned clock and `calendar_gateway` with a
/// seeded stub.
pub fn setup_inmemory_context() -> anyhow::Result<SlotbookContext> {
    Ok(SlotbookContext {
        repos: Repos::create_inmemory(),
        config: Config::new(),
        sys: Arc::new(RealSys {}),
        calendar_gateway: Arc::new(StubCalendarGateway::new()),
        mailer: Arc::new(LoggingMailer {}),
        token_vault: TokenVault::from_config(None)?,
    })
}
