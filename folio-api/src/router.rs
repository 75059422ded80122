use axum::{http::Method, routing::get, Router};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::{app_state::AppState, config::Settings, routes};

pub fn create(app_state: AppState, config: &Settings) -> Router<()> {
    let app = Router::new()
        .route("/", get(|| async { "folio-api" }))
        .nest("/profiles", routes::profiles::router())
        .nest("/projects", routes::projects::router())
        .nest("/import", routes::import::router());

    let app_url = config.application.app_url.clone();
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(["content-type".parse().unwrap(), "authorization".parse().unwrap()])
        .allow_origin(AllowOrigin::predicate(move |origin, _| {
            origin.to_str().unwrap_or_default() == app_url
        }));

    app.with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
}
