use axum::{
    extract::State,
    handler::HandlerWithoutStateExt,
    routing::get,
    Router,
};
use situational_data::{DataService, Domain};
use std::path::Path;
use std::time::Instant;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    services::ServeDir,
    trace::TraceLayer,
};

use crate::error::{not_found, panic_response};
use crate::logs_routes::log_routes;
use crate::realtime::ws_handler;
use crate::routes;

#[derive(Clone)]
pub struct AppState {
    pub data: DataService,
    pub started: Instant,
}

impl AppState {
    pub fn new(data: DataService) -> Self {
        Self {
            data,
            started: Instant::now(),
        }
    }
}

/// Full application router. Static files are served from `web_root` when it
/// exists; anything unmatched gets the JSON 404.
pub fn router(state: AppState, web_root: Option<&Path>) -> Router {
    let mut api = Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/v1", get(routes::api_root))
        .route("/ws", get(ws_handler));

    for domain in Domain::ALL {
        api = api.route(
            &format!("/api/v1{}", domain.route()),
            get(move |State(state): State<AppState>| routes::serve_domain(state, domain)),
        );
    }

    let api = api.merge(log_routes::<AppState>());

    let api = match web_root.filter(|root| root.is_dir()) {
        Some(root) => {
            tracing::info!("   Serving UI from {}", root.display());
            api.fallback_service(
                ServeDir::new(root)
                    .call_fallback_on_method_not_allowed(true)
                    .fallback(not_found.into_service()),
            )
        }
        None => api.fallback(not_found),
    };

    api.layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
