//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all proxy handler
//! - Wire up middleware (tracing, request ID)
//! - Bind server to listener
//! - Hand every request to the dispatcher
//! - Close admission gates and drain on shutdown

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::dispatcher::Dispatcher;
use crate::http::request::{MakeRequestUuid, X_REQUEST_ID};
use crate::lifecycle::ShutdownListener;
use crate::proxy::{Forward, HttpForwarder};
use crate::routing::{RouteError, RoutingTable};

/// HTTP server for the reverse proxy.
pub struct HttpServer<F = HttpForwarder> {
    router: Router,
    dispatcher: Arc<Dispatcher<F>>,
}

impl HttpServer<HttpForwarder> {
    /// Build the routing table and forwarding client from configuration.
    pub fn new(config: &ProxyConfig) -> Result<Self, RouteError> {
        let table = RoutingTable::from_config(&config.server.paths)?;
        let forwarder = HttpForwarder::new(&config.timeouts);
        Ok(Self::with_dispatcher(Dispatcher::new(table, forwarder)))
    }
}

impl<F: Forward> HttpServer<F> {
    pub fn with_dispatcher(dispatcher: Dispatcher<F>) -> Self {
        let dispatcher = Arc::new(dispatcher);
        let router = Self::build_router(dispatcher.clone());
        Self { router, dispatcher }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(dispatcher: Arc<Dispatcher<F>>) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler::<F>))
            .route("/", any(proxy_handler::<F>))
            .with_state(dispatcher)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID)),
            )
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher<F>> {
        &self.dispatcher
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: ShutdownListener,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.dispatcher.table().len(),
            "HTTP server starting"
        );

        let dispatcher = self.dispatcher.clone();
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let reason = shutdown.triggered().await;
                tracing::info!(reason = %reason, "Shutting down, closing admission gates");
                dispatcher.close();
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler.
async fn proxy_handler<F: Forward>(
    State(dispatcher): State<Arc<Dispatcher<F>>>,
    request: Request<Body>,
) -> Response {
    dispatcher.handle(request).await
}
