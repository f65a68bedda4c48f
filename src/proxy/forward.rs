//! Single-target request forwarding.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the route's target
//! - Send the request upstream and stream the response back
//! - Surface transport failures as `ForwardError`
//!
//! # Design Decisions
//! - One fixed target per route: no retries, no fallback
//! - Target path is joined with the request path using a single slash
//! - Target and request query strings are merged with `&`
//! - Outbound requests always use HTTP/1.1

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{uri::InvalidUri, Request, Response, Uri, Version},
};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use url::{Position, Url};

use crate::config::TimeoutConfig;
use crate::proxy::headers;

/// Error returned when a request could not be forwarded.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("failed to build upstream uri: {0}")]
    InvalidUri(#[from] InvalidUri),

    #[error("upstream request failed: {0}")]
    Request(#[from] hyper_util::client::legacy::Error),

    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),
}

/// Sends a request to an upstream target.
pub trait Forward: Send + Sync + 'static {
    fn forward(
        &self,
        target: &Url,
        request: Request<Body>,
    ) -> impl Future<Output = Result<Response<Body>, ForwardError>> + Send;
}

/// Forwards over a pooled hyper client.
#[derive(Clone)]
pub struct HttpForwarder {
    client: Client<HttpConnector, Body>,
    upstream_timeout: Option<Duration>,
}

impl HttpForwarder {
    pub fn new(timeouts: &TimeoutConfig) -> Self {
        let mut connector = HttpConnector::new();
        if timeouts.connect_secs > 0 {
            connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));
        }

        let client = Client::builder(TokioExecutor::new()).build(connector);
        let upstream_timeout =
            (timeouts.upstream_secs > 0).then(|| Duration::from_secs(timeouts.upstream_secs));

        Self {
            client,
            upstream_timeout,
        }
    }
}

impl Forward for HttpForwarder {
    async fn forward(
        &self,
        target: &Url,
        request: Request<Body>,
    ) -> Result<Response<Body>, ForwardError> {
        let (mut parts, body) = request.into_parts();

        parts.uri = upstream_uri(target, &parts.uri)?;
        parts.version = Version::HTTP_11;
        headers::strip_hop_by_hop(&mut parts.headers);
        if let Some(ConnectInfo(addr)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
            headers::append_forwarded_for(&mut parts.headers, addr.ip());
        }

        let pending = self.client.request(Request::from_parts(parts, body));
        let response: Response<Incoming> = match self.upstream_timeout {
            Some(limit) => tokio::time::timeout(limit, pending)
                .await
                .map_err(|_| ForwardError::Timeout(limit))??,
            None => pending.await?,
        };

        let (mut parts, body) = response.into_parts();
        headers::strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

/// Build the upstream URI for `original` against `target`.
pub fn upstream_uri(target: &Url, original: &Uri) -> Result<Uri, ForwardError> {
    let path = join_paths(target.path(), original.path());
    let query = match (
        target.query().filter(|q| !q.is_empty()),
        original.query().filter(|q| !q.is_empty()),
    ) {
        (Some(t), Some(r)) => Some(format!("{}&{}", t, r)),
        (Some(q), None) | (None, Some(q)) => Some(q.to_string()),
        (None, None) => None,
    };

    let mut uri = format!(
        "{}://{}{}",
        target.scheme(),
        &target[Position::BeforeHost..Position::AfterPort],
        path
    );
    if let Some(query) = query {
        uri.push('?');
        uri.push_str(&query);
    }

    Ok(uri.parse::<Uri>()?)
}

fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}
