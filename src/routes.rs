use actix_web::web;

use crate::handlers;

/// Wires the auth surface. The boundary guard is applied app-wide by
/// the caller; `/health` bypasses it by path.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health_check))
        .service(
            web::scope("/auth")
                .route("/login", web::post().to(handlers::login))
                .route("/refresh", web::post().to(handlers::refresh))
                .route("/logout", web::post().to(handlers::logout))
                .route("/user", web::get().to(handlers::current_user)),
        );
}
