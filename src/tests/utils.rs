use std::str::FromStr;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

use crate::{
    auth::{tests::TEST_SECRET, TokenVerifier},
    config::PinningConfig,
    db,
    pinning::PinningClient,
    structs::{Availability, HostelInput},
    AppState,
};

/// Fresh in-memory database with the production migrations applied.
pub async fn init_test_pool() -> SqlitePool {
    let opts = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    // One connection that never expires, or the in-memory database goes with it.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(opts)
        .await
        .unwrap_or_else(|e| panic!("Database initialization failed: {e}"));
    db::migrate(&pool).await.expect("Failed to run migrations");
    pool
}

/// State whose pinning service is unreachable, so every upload fails.
pub async fn init_test_state() -> AppState {
    let pinning = PinningClient::new(PinningConfig {
        api_url: "http://127.0.0.1:1".to_string(),
        api_key: "test-key".to_string(),
        secret_key: "test-secret".to_string(),
        gateway: "https://gateway.example.com".to_string(),
    })
    .expect("Failed to build pinning client");

    AppState {
        db_pool: init_test_pool().await,
        pinning,
        verifier: TokenVerifier::from_secret(TEST_SECRET, None),
        publishable_key: "pk_test_hostel_finder".to_string(),
    }
}

/// Builds the full application around `state` the way `main` does.
macro_rules! test_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(actix_identity::IdentityMiddleware::default())
                .wrap(actix_session::SessionMiddleware::new(
                    actix_session::storage::CookieSessionStore::default(),
                    actix_web::cookie::Key::generate(),
                ))
                .app_data(actix_web::web::Data::new($state))
                .configure(crate::routes::configure)
                .default_service(actix_web::web::to(crate::default_handler)),
        )
        .await
    };
}
pub(crate) use test_app;

pub fn sample_input(name: &str, price: f64) -> HostelInput {
    HostelInput {
        name: name.to_string(),
        location: "Accra, Ghana".to_string(),
        address: "12 Oxford Street, Osu".to_string(),
        postal_code: "GA-123-4567".to_string(),
        price_min: price,
        price_max: price + 50.0,
        currency: "GHS".to_string(),
        max_capacity: 24,
        description: "Bright dorms a short walk from the beach.".to_string(),
        amenities: vec!["Free WiFi".to_string(), "Kitchen".to_string()],
        availability: Availability::Available,
        phone: Some("+233545973939".to_string()),
        email: "contact@example.com".to_string(),
        website: None,
    }
}
