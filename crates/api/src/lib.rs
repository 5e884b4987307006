mod account;
mod availability;
mod booking;
mod error;
mod event_type;
mod http_logger;
mod shared;
mod status;

use std::net::TcpListener;

use actix_cors::Cors;
use actix_web::{
    App,
    HttpServer,
    dev::Server,
    middleware::{self},
    web::{self, Data},
};
use http_logger::SlotbookTracingRootSpanBuilder;
use shared::rate_limit::RateLimiter;
use slotbook_infra::SlotbookContext;
use tracing::info;
use tracing_actix_web::TracingLogger;

/// Configure the Actix server API
/// Add all the routes to the server
pub fn configure_server_api(cfg: &mut web::ServiceConfig) {
    account::configure_routes(cfg);
    availability::configure_routes(cfg);
    booking::configure_routes(cfg);
    event_type::configure_routes(cfg);
    status::configure_routes(cfg);
}

/// Struct for storing the main application state
pub struct Application {
    /// The Actix server instance
    server: Server,
    /// The port the server is running on
    port: u16,
}

impl Application {
    pub async fn new(context: SlotbookContext) -> anyhow::Result<Self> {
        let (server, port) = Application::configure_server(context).await?;

        Ok(Self { server, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Configure the Actix server
    /// This function creates the server and adds all the routes to it
    ///
    /// This adds the following middleware:
    /// - CORS (permissive)
    /// - Compression
    /// - Tracing logger
    async fn configure_server(context: SlotbookContext) -> anyhow::Result<(Server, u16)> {
        let port = context.config.port;
        let address = slotbook_utils::config::APP_CONFIG.http_host.clone();
        let address_and_port = format!("{}:{}", address, port);
        info!("Starting server on: {}", address_and_port);
        let listener = TcpListener::bind(address_and_port)?;
        let port = listener.local_addr()?.port();

        // The only process-wide mutable state besides the token refresh locks
        let rate_limiter = Data::new(RateLimiter::new());

        let server = HttpServer::new(move || {
            let ctx = context.clone();

            App::new()
                .wrap(Cors::permissive())
                .wrap(middleware::Compress::default())
                .wrap(TracingLogger::<SlotbookTracingRootSpanBuilder>::new())
                .app_data(Data::new(ctx))
                .app_data(rate_limiter.clone())
                .service(web::scope("/api/v1").configure(configure_server_api))
        })
        .listen(listener)?
        .workers(4)
        .run();

        Ok((server, port))
    }

    /// Start the Actix server and block until it finishes
    pub async fn start(self) -> anyhow::Result<()> {
        self.server.await.map_err(|e| anyhow::anyhow!(e))
    }
}
