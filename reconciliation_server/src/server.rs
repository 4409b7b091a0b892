use actix_web::{middleware::Logger, web, App, HttpServer};
use actix_web::dev::Server;
use log::{error, info};
use reconciliation_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    ReconcileApi,
    SqliteDatabase,
};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    integrations::gateway::RestGatewayAdapter,
    routes::{health, GatewayWebhookRoute, VerifyPaymentRoute},
};

const POOL_SIZE: u32 = 25;
const EVENT_BUFFER_SIZE: usize = 64;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, POOL_SIZE)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, operator_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// The default event subscribers: approvals are announced, shortfalls are shouted. Operator
/// tooling that wants more than log lines can register its own hooks instead.
fn operator_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks.on_order_approved(|ev| {
        Box::pin(async move {
            info!("✅️ Order {} approved and released to fulfillment", ev.order.reference);
        })
    });
    hooks.on_stock_shortfall(|ev| {
        Box::pin(async move {
            error!(
                "🚨️ Order {} is paid but stock could not cover: {}. Manual reconciliation required.",
                ev.order.reference,
                ev.missing.join(", ")
            );
        })
    });
    hooks
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let adapter = RestGatewayAdapter::new(&config.gateway, config.signature_checks)
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let rec_api = ReconcileApi::new(db.clone(), producers.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("ors::access_log"))
            .app_data(web::Data::new(rec_api))
            .app_data(web::Data::new(adapter.clone()))
            .service(health)
            .service(
                web::scope("/gateway").service(GatewayWebhookRoute::<SqliteDatabase, RestGatewayAdapter>::new()),
            )
            .service(
                web::scope("/payments").service(VerifyPaymentRoute::<SqliteDatabase, RestGatewayAdapter>::new()),
            )
    })
    .bind((host.as_str(), port))?
    .run();
    info!("🚀️ Server is running on {host}:{port}");
    Ok(srv)
}
