use std::net::SocketAddr;
use std::sync::Arc;

use car_insurance::clock::{Clock, SystemClock};
use car_insurance::config::{get_config, LoggingConfig};
use car_insurance::errors::{InsuranceError, InsuranceResult};
use car_insurance::server::database::Database;
use car_insurance::server::logging::init_tracing;
use car_insurance::server::{build_router, AppState, CarService};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[cfg(feature = "background-jobs")]
use car_insurance::jobs::{JobConfig, PolicyExpirationJob};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Server exited with error: {e}");
        eprintln!("car_insurance_server: {e}");
        std::process::exit(1);
    }
}

async fn run() -> InsuranceResult<()> {
    let config = match get_config() {
        Ok(config) => config,
        Err(e) => {
            // No configured level yet; fall back to the default one.
            init_tracing(&LoggingConfig::default());
            return Err(e);
        }
    };
    init_tracing(&config.logging);

    let db = Database::new().await?;
    db.init_schema().await?;
    if config.database.seed_demo_data {
        db.seed_demo_data().await?;
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let shutdown = CancellationToken::new();

    #[cfg(feature = "background-jobs")]
    let expiration_job = PolicyExpirationJob::new(
        Arc::clone(&db),
        Arc::clone(&clock),
        &JobConfig::from_config(&config.jobs),
    )
    .map_err(|e| InsuranceError::ConfigError(e.to_string()))?
    .spawn(shutdown.child_token());

    let state = AppState {
        service: CarService::new(Arc::clone(&db), clock),
    };
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| InsuranceError::ConfigError(format!("invalid server address: {e}")))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| InsuranceError::ServerError(format!("failed to bind {addr}: {e}")))?;

    info!("Listening on http://{}", addr);

    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {e}");
            }
            info!("Shutdown signal received");
            signal.cancel();
        })
        .await
        .map_err(|e| InsuranceError::ServerError(e.to_string()))?;

    shutdown.cancel();

    #[cfg(feature = "background-jobs")]
    {
        // Iteration errors are logged by the job itself.
        if let Err(e) = expiration_job.await {
            error!("Policy expiration job panicked: {e}");
        }
    }

    info!("Server stopped");
    Ok(())
}
