use actix_web::{middleware, web, App, HttpServer};
use notification_relay::{
    handlers, logging, metrics, AppError, Config, RelayState, TracingAuditSink,
};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;
    logging::init_tracing(config.log_format);

    tracing::info!(env = %config.app.env, "Starting notification relay");

    let addr = config.bind_addr();
    let state = RelayState::new(
        config,
        Arc::new(TracingAuditSink),
        tokio::runtime::Handle::current(),
    );

    tracing::info!("Starting HTTP server on {}", addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(middleware::Logger::default())
            .wrap(metrics::MetricsMiddleware)
            .route("/health", web::get().to(|| async { "OK" }))
            .route("/metrics", web::get().to(metrics::serve_metrics))
            .configure(handlers::configure)
    })
    .bind(&addr)
    .map_err(|e| AppError::StartServer(format!("failed to bind {addr}: {e}")))?
    .run()
    .await
    .map_err(|e| AppError::StartServer(e.to_string()))
}
