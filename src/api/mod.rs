pub mod monitoring;
pub mod routes;

use actix_web::web;
use std::sync::Arc;

use crate::middleware::{AuthMiddleware, IdentityResolver};

/// Mounts the authenticated `/api` scope.
pub fn configure_api(
    resolver: Arc<dyn IdentityResolver>,
    json_limit: usize,
) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.service(
            web::scope("/api")
                .wrap(AuthMiddleware::new(resolver))
                .app_data(routes::json_config(json_limit))
                .app_data(routes::query_config())
                .configure(routes::configure_routes),
        );
    }
}
