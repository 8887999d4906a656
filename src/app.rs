use std::net::SocketAddr;
use std::sync::Arc;

use axum::{middleware, Router};
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::middleware::{
    cors_layer,
    hosts::{enforce_allowed_hosts, HostAllowList},
    rate_limit::rate_limit,
    security_headers::security_headers,
};
use crate::state::AppState;
use crate::{auth, routes, tls};

/// Request pipeline, outermost first: tracing, security headers, host
/// allow-list, rate limit, CORS, route dispatch.
pub fn build_app(state: AppState) -> Router {
    let hosts = Arc::new(HostAllowList::new(&state.config.allowed_hosts));
    let limiter = state.limiter.clone();
    let cors = cors_layer(&state.config.allowed_origins);

    let mut api = Router::new()
        .merge(routes::system::system_routes())
        .merge(auth::router())
        .merge(routes::secure::secure_routes());
    if state.config.debug {
        api = api.merge(routes::docs::docs_routes());
    }

    api.method_not_allowed_fallback(routes::system::method_not_allowed)
        .fallback(routes::system::not_found)
        .with_state(state)
        .layer(cors)
        .layer(middleware::from_fn_with_state(limiter, rate_limit))
        .layer(middleware::from_fn_with_state(hosts, enforce_allowed_hosts))
        .layer(middleware::from_fn(security_headers))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    match &config.tls {
        Some(tls_config) => {
            tracing::info!("listening on https://{}", addr);
            tls::serve(listener, app, tls_config).await
        }
        None => {
            tracing::info!("listening on {}", addr);
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await?;
            Ok(())
        }
    }
}
