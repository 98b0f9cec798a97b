use crate::error::ErrorResponse;
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode},
    response::Response,
};
use ipnetwork::IpNetwork;
use std::{
    future::Future,
    net::{IpAddr, SocketAddr},
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};
use tower::{Layer, Service};
use tracing::warn;

/// Rejects requests from source addresses outside the configured
/// allow-list. An empty list rejects everything but the health endpoint
/// (which is mounted outside this layer).
#[derive(Clone)]
pub struct IpFilterLayer {
    allowed_networks: Arc<Vec<IpNetwork>>,
}

impl IpFilterLayer {
    pub fn new(allowed_networks: Vec<IpNetwork>) -> Self {
        Self {
            allowed_networks: Arc::new(allowed_networks),
        }
    }
}

impl<S> Layer<S> for IpFilterLayer {
    type Service = IpFilterService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        IpFilterService {
            inner,
            allowed_networks: self.allowed_networks.clone(),
        }
    }
}

#[derive(Clone)]
pub struct IpFilterService<S> {
    inner: S,
    allowed_networks: Arc<Vec<IpNetwork>>,
}

impl<S> Service<Request<Body>> for IpFilterService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let allowed_networks = self.allowed_networks.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let source_ip = client_ip(&req);

            match source_ip {
                Some(ip) if is_allowed(&allowed_networks, ip) => inner.call(req).await,
                other => {
                    warn!("Rejected request from unauthorized source: {:?}", other);
                    Ok(forbidden_response(other))
                }
            }
        })
    }
}

/// Prefer the first X-Forwarded-For hop for proxied requests, falling back
/// to the direct peer address.
fn client_ip(req: &Request<Body>) -> Option<IpAddr> {
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok());

    forwarded.or_else(|| {
        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0.ip())
    })
}

fn is_allowed(networks: &[IpNetwork], ip: IpAddr) -> bool {
    networks.iter().any(|network| network.contains(ip))
}

fn forbidden_response(ip: Option<IpAddr>) -> Response {
    let body = ErrorResponse {
        error: "forbidden_source".to_string(),
        message: match ip {
            Some(ip) => format!("Access denied for source address {}", ip),
            None => "Source address could not be determined".to_string(),
        },
        registry: None,
    };

    Response::builder()
        .status(StatusCode::FORBIDDEN)
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::to_string(&body).unwrap_or_else(|_| "{}".to_string()),
        ))
        .unwrap_or_else(|_| Response::new(Body::empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_is_allowed() {
        let networks = vec![
            IpNetwork::from_str("127.0.0.0/8").unwrap(),
            IpNetwork::from_str("10.1.0.0/16").unwrap(),
        ];

        assert!(is_allowed(&networks, "127.0.0.1".parse().unwrap()));
        assert!(is_allowed(&networks, "10.1.42.7".parse().unwrap()));
        assert!(!is_allowed(&networks, "10.2.0.1".parse().unwrap()));
        assert!(!is_allowed(&networks, "192.168.1.1".parse().unwrap()));
    }

    #[test]
    fn test_empty_allow_list_rejects_all() {
        assert!(!is_allowed(&[], "127.0.0.1".parse().unwrap()));
    }
}
