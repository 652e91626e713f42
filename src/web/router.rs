//! Web application router and middleware setup.

use crate::metrics::{ReportView, SnapshotSource};
use crate::web::config::WebConfig;
use crate::web::handlers;
use crate::web::AppState;
use axum::{
    extract::{Query, Request, State},
    http::{header, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, MethodRouter},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::debug;

/// Create the axum application with all routes and middleware.
pub fn create_app<S>(config: &WebConfig, source: S) -> Router
where
    S: SnapshotSource + 'static,
{
    let state = AppState::new(source);
    let token: Option<Arc<str>> = config.token.as_deref().map(Arc::from);

    let protected = Router::new()
        .route("/metrics", get(handlers::metrics::<S>))
        .route("/json", get(handlers::json_report::<S>))
        .route("/summary", report_route(ReportView::Summary))
        .route("/daily", report_route(ReportView::Daily))
        .route("/hourly", report_route(ReportView::Hourly))
        .route("/weekly", report_route(ReportView::Weekly))
        .route("/yearly", report_route(ReportView::Yearly))
        .route("/top", report_route(ReportView::Top))
        .route("/oneline", report_route(ReportView::Oneline))
        .route("/", report_route(ReportView::Monthly))
        .fallback(handlers::monthly_fallback::<S>)
        .layer(middleware::from_fn_with_state(token, require_token));

    // Method filtering runs before the token check
    let mut app = Router::new()
        .route("/health", get(handlers::health_check))
        .merge(protected)
        .with_state(state)
        .layer(middleware::from_fn(allow_read_methods));

    // Add CORS if enabled
    if config.enable_cors {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE]),
        );
    }

    app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

fn report_route<S>(view: ReportView) -> MethodRouter<AppState<S>>
where
    S: SnapshotSource + 'static,
{
    get(move |State(state): State<AppState<S>>| async move {
        handlers::text_report(&state, view).await
    })
}

/// Answer OPTIONS directly and reject everything but GET and HEAD.
async fn allow_read_methods(request: Request, next: Next) -> Response {
    match *request.method() {
        Method::GET | Method::HEAD => next.run(request).await,
        Method::OPTIONS => StatusCode::OK.into_response(),
        _ => (
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            "Method not allowed\n",
        )
            .into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Reject requests whose `?token=` does not match the configured token.
async fn require_token(
    State(token): State<Option<Arc<str>>>,
    query: Option<Query<TokenQuery>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = token else {
        return next.run(request).await;
    };

    let provided = query.and_then(|Query(query)| query.token);
    if provided.as_deref() == Some(&*expected) {
        next.run(request).await
    } else {
        debug!("Rejected request to {} with missing or invalid token", request.uri().path());
        (
            StatusCode::UNAUTHORIZED,
            "Unauthorized: Invalid or missing token\n",
        )
            .into_response()
    }
}
