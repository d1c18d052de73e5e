use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware::Logger, web};
use dotenvy::dotenv;
use std::net::TcpListener;
use std::sync::Arc;

use fieldforce_auth::config::AppSettings;
use fieldforce_auth::directory::{EmployeeDirectory, InMemoryDirectory};
use fieldforce_auth::guard::{BoundaryGuard, GuardPolicy};
use fieldforce_auth::handlers::AuthServerState;
use fieldforce_auth::routes::configure_routes;
use fieldforce_auth::token::TokenService;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let settings = match AppSettings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("Failed to load application settings: {}", e);
            log::error!("Cannot start server without valid settings");
            std::process::exit(1);
        }
    };

    let tokens = Arc::new(TokenService::new(
        &settings.auth.token_secret,
        settings.auth.token_ttl_secs,
    ));

    let policy = if settings.guard.web_origins.is_empty() {
        GuardPolicy::with_defaults()
    } else {
        match GuardPolicy::with_origins(
            settings.guard.web_origins.clone(),
            settings.guard.client_token.clone(),
        ) {
            Ok(policy) => policy,
            Err(e) => {
                log::error!("Failed to build boundary guard policy: {}", e);
                std::process::exit(1);
            }
        }
    };
    let policy = Arc::new(policy);

    // Stand-in until a deployment wires its own data store behind
    // EmployeeDirectory.
    let directory: Arc<dyn EmployeeDirectory> = Arc::new(InMemoryDirectory::new());

    let host = settings.server.host.clone();
    let port = settings.server.port;
    log::info!("Starting server at http://{}:{}", host, port);

    let listener = TcpListener::bind(format!("{}:{}", host, port))?;

    HttpServer::new(move || {
        // Configure CORS: it answers pre-flight requests before the
        // boundary guard runs.
        let mut cors = Cors::default().supports_credentials();
        if settings.server.cors_origins.contains(&"*".to_string()) {
            cors = cors.allow_any_origin();
        } else {
            for origin in &settings.server.cors_origins {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors.allow_any_method().allow_any_header();

        App::new()
            .wrap(Logger::default())
            .wrap(BoundaryGuard::new(
                Arc::clone(&policy),
                Arc::clone(&tokens),
            ))
            .wrap(cors)
            .app_data(web::Data::new(AuthServerState {
                tokens: Arc::clone(&tokens),
                directory: Arc::clone(&directory),
            }))
            .configure(configure_routes)
    })
    .listen(listener)?
    .run()
    .await
}
