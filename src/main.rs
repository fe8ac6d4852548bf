use barflow::{
    api::{self, AppState},
    config::{self, database, secrets},
    core::{events::EventBus, payment::MercadoPagoClient, product},
    errors::Result,
};
use dotenvy::dotenv;
use std::{sync::Arc, time::Duration};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the application configuration
    let app_config = config::settings::load_default_config()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;
    info!(
        "Loaded configuration with {} menu products.",
        app_config.products.len()
    );

    // 4. Connect to the database and make sure the schema exists
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Seed the menu
    product::seed_products(&db, &app_config.products)
        .await
        .inspect_err(|e| error!("Failed to seed products: {}", e))?;

    // 6. Payment gateway, only when credentials are present
    let gateway = match secrets::gateway_access_token() {
        Some(token) => Some(Arc::new(MercadoPagoClient::new(
            app_config.payments.gateway_base_url.clone(),
            token,
            Duration::from_secs(app_config.payments.gateway_timeout_secs),
        )?) as Arc<dyn barflow::core::payment::PaymentGateway>),
        None => {
            warn!(
                "{} is not set; payment webhooks will be rejected.",
                secrets::GATEWAY_TOKEN_VAR
            );
            None
        }
    };

    // 7. Serve the API
    let state = Arc::new(AppState {
        database: db,
        events: EventBus::default(),
        policy: app_config.ordering,
        payments: app_config.payments.clone(),
        gateway,
    });
    api::server::serve(Arc::clone(&state), &app_config.server).await?;

    // 8. Close the database once the server has released its state
    match Arc::try_unwrap(state) {
        Ok(state) => {
            state.database.close().await?;
            info!("Database connection closed.");
        }
        Err(_) => warn!("Application state still shared; leaving the database to drop."),
    }
    Ok(())
}
