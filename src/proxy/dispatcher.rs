use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, HeaderName},
    response::{IntoResponse, Response},
};
use tracing::{error, info, warn};
use url::Url;
use uuid::Uuid;

use crate::balancer::BalancerRegistry;
use crate::error::{GatewayError, Result};
use crate::routing::RouteTable;

/// Per-request dispatch pipeline: route lookup, target election, request
/// rewrite, and streaming forwarding.
pub struct Dispatcher {
    routes: RouteTable,
    balancers: BalancerRegistry,
    client: reqwest::Client,
    gateway_headers: bool,
}

/// Single axum handler for all inbound paths on the gateway port.
pub async fn dispatch_handler(
    State(dispatcher): State<Arc<Dispatcher>>,
    req: Request,
) -> Response {
    match dispatcher.dispatch(req).await {
        Ok(response) => response,
        Err(err) => {
            warn!(error = %err, status = err.status_code().as_u16(), "request failed");
            err.into_response()
        }
    }
}

impl Dispatcher {
    pub fn new(
        routes: RouteTable,
        balancers: BalancerRegistry,
        gateway_headers: bool,
    ) -> Result<Self> {
        // No request timeout: upstream responses may be long-lived streams,
        // bounded only by the transport.
        let client = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(20)
            .user_agent(concat!("api-gateway/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| GatewayError::Internal(format!("Failed to create HTTP client: {}", err)))?;

        Ok(Self {
            routes,
            balancers,
            client,
            gateway_headers,
        })
    }

    /// Resolve the route, elect a target, rewrite and forward the request.
    ///
    /// Exactly one forwarding attempt is made; upstream failures are not
    /// retried and never fail over to another target.
    pub async fn dispatch(&self, req: Request) -> Result<Response> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let request_id = Uuid::new_v4().to_string();

        info!(%method, %path, %request_id, "received request");

        let (prefix, service) = self
            .routes
            .longest_match(&path)
            .ok_or(GatewayError::RouteNotFound)?;

        if service.proxy.upstream.targets.is_empty() {
            return Err(GatewayError::NoUpstreamTargets {
                service: service.name.clone(),
            });
        }

        let balancer = self
            .balancers
            .get_or_create(&service.name, &service.proxy.upstream)?;
        let elected = balancer.elect(&service.proxy.upstream.targets)?;
        let elected = elected.trim_end_matches('/');

        let target = Url::parse(elected).map_err(|err| {
            error!(service = %service.name, target = elected, error = %err, "invalid target URL");
            GatewayError::InvalidTargetUrl {
                target: elected.to_string(),
                reason: err.to_string(),
            }
        })?;

        let outbound = rewrite_target(&target, &path, prefix, req.uri().query());

        info!(service = %service.name, target = %outbound, %request_id, "forwarding request");

        self.forward(req, outbound, &request_id).await
    }

    /// Stream the request to the target and the response back, without
    /// buffering either body.
    async fn forward(&self, req: Request, outbound: Url, request_id: &str) -> Result<Response> {
        let (parts, body) = req.into_parts();

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);

        let mut builder = self
            .client
            .request(parts.method, outbound)
            .headers(headers)
            .body(reqwest::Body::wrap_stream(body.into_data_stream()));

        if self.gateway_headers {
            builder = builder
                .header("X-Gateway", concat!("api-gateway/", env!("CARGO_PKG_VERSION")))
                .header("X-Gateway-Request-Id", request_id);
        }

        let upstream = builder
            .send()
            .await
            .map_err(|err| GatewayError::Upstream(err.to_string()))?;

        let mut response = Response::builder().status(upstream.status());
        for (name, value) in upstream.headers() {
            if !is_hop_by_hop(name) {
                response = response.header(name, value);
            }
        }

        response
            .body(Body::from_stream(upstream.bytes_stream()))
            .map_err(|err| GatewayError::Internal(format!("Failed to build response: {}", err)))
    }
}

/// Build the outbound URL: target scheme/host, route prefix stripped from the
/// path, and the target URL's own query (if any) merged ahead of the request
/// query.
fn rewrite_target(target: &Url, path: &str, prefix: &str, request_query: Option<&str>) -> Url {
    let mut remainder = path.strip_prefix(prefix).unwrap_or(path).to_string();
    if !remainder.is_empty() && !remainder.starts_with('/') {
        remainder.insert(0, '/');
    }

    let mut outbound = target.clone();
    outbound.set_path(&remainder);

    let query = match (target.query(), request_query) {
        (Some(target_query), Some(request_query)) => {
            Some(format!("{}&{}", target_query, request_query))
        }
        (Some(target_query), None) => Some(target_query.to_string()),
        (None, Some(request_query)) => Some(request_query.to_string()),
        (None, None) => None,
    };
    outbound.set_query(query.as_deref());

    outbound
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    const HOP_BY_HOP: [&str; 8] = [
        "connection",
        "keep-alive",
        "proxy-authenticate",
        "proxy-authorization",
        "te",
        "trailers",
        "transfer-encoding",
        "upgrade",
    ];
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailers"
            | "transfer-encoding"
            | "upgrade"
    )
}
