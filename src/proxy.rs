//! Reverse-proxy dispatch module
//!
//! Byte-level mechanics of forwarding one HTTP request to one backend and
//! relaying its response: rewriting the request line to the backend's host
//! and streaming the body back. A [`ProxyDispatcher`] is bound to a single
//! backend URL at construction and owns the `hyper` client used to reach it.

use std::convert::Infallible;

use bytes::Bytes;
use http::uri::{Authority, Scheme};
use http::{HeaderMap, Method, StatusCode, Uri, Version};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use url::Url;

use crate::error::ResultExt;

/// Request body shape accepted by a dispatcher.
///
/// Buffered into `Full<Bytes>` (rather than the raw streaming
/// `hyper::body::Incoming`) so a request can be replayed across retry
/// attempts against a different backend without re-reading a half-consumed
/// stream.
pub type ProxyRequest = http::Request<Full<Bytes>>;

/// Response body shape returned by a dispatcher, boxed to erase whether the
/// bytes came straight from the upstream body or were synthesized locally
/// (e.g. the `502` fallback built in `balancer.rs`).
pub type ProxyBody = BoxBody<Bytes, hyper::Error>;
pub type ProxyResponse = http::Response<ProxyBody>;

/// Failure returned when a dispatch attempt never reached (or never heard
/// back from) the backend. Distinguished from an ordinary upstream HTTP
/// error response, which is not an error from this module's point of view.
#[derive(Debug)]
pub enum DispatchError {
    Transport(anyhow::Error),
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchError::Transport(err) => write!(f, "transport error: {}", err),
        }
    }
}

impl std::error::Error for DispatchError {}

/// Forwards requests to one fixed backend URL.
#[derive(Debug, Clone)]
pub struct ProxyDispatcher {
    authority: Authority,
    scheme: Scheme,
    client: Client<HttpConnector, Full<Bytes>>,
}

impl ProxyDispatcher {
    pub fn new(backend_url: Url) -> Self {
        let authority = backend_url
            .host_str()
            .map(|h| match backend_url.port() {
                Some(p) => format!("{h}:{p}"),
                None => h.to_string(),
            })
            .unwrap_or_default()
            .parse::<Authority>()
            .expect("backend url carries a valid authority");

        let scheme = if backend_url.scheme() == "https" {
            Scheme::HTTPS
        } else {
            Scheme::HTTP
        };

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Self {
            authority,
            scheme,
            client,
        }
    }

    /// Forward `request` to the bound backend, rewriting only the URI's
    /// scheme/authority (path, query, method, headers and body pass
    /// through unchanged).
    ///
    /// Carries no timeout of its own beyond whatever the underlying
    /// `hyper-util` client imposes — a slow-but-alive backend is not
    /// penalized here; liveness is decided solely by whether the call
    /// returns an error.
    pub async fn dispatch(&self, mut request: ProxyRequest) -> Result<ProxyResponse, DispatchError> {
        let rewritten = self.rewrite_uri(request.uri());
        *request.uri_mut() = rewritten;

        let response = self
            .client
            .request(request)
            .await
            .map_err(anyhow::Error::new)
            .context_network("dispatching request to backend")
            .map_err(DispatchError::Transport)?;

        let (parts, body) = response.into_parts();
        let boxed = body.map_err(|err| err).boxed();
        Ok(http::Response::from_parts(parts, boxed))
    }

    fn rewrite_uri(&self, original: &Uri) -> Uri {
        let path_and_query = original
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
            .unwrap_or_else(|_| original.clone())
    }
}

/// An inbound request whose body has been read into memory once, up front.
///
/// The balancer's retry loop may dispatch the same logical request to
/// several backends in turn; replaying a streaming [`Incoming`] body a
/// second time would read nothing, so the body is buffered into [`Bytes`]
/// at the edge and cheaply cloned (an `Arc`-backed refcount bump, not a
/// copy) for each attempt.
#[derive(Debug, Clone)]
pub struct BufferedRequest {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
}

impl BufferedRequest {
    /// Drain `req`'s body into memory, retaining its method/URI/headers.
    pub async fn buffer(req: http::Request<Incoming>) -> Result<Self, hyper::Error> {
        let (parts, body) = req.into_parts();
        let body = body.collect().await?.to_bytes();
        Ok(Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            body,
        })
    }

    /// Build a fresh dispatchable request from the buffered state. Safe to
    /// call more than once — each call yields an independent request with
    /// the same method/URI/headers/body.
    pub fn to_request(&self) -> ProxyRequest {
        let mut builder = http::Request::builder()
            .method(self.method.clone())
            .uri(self.uri.clone())
            .version(self.version);
        if let Some(headers) = builder.headers_mut() {
            *headers = self.headers.clone();
        }
        builder
            .body(Full::new(self.body.clone()))
            .expect("buffered request rebuild is well-formed")
    }
}

#[cfg(test)]
impl BufferedRequest {
    /// Construct a buffered request directly, bypassing `Incoming`, which
    /// only hyper's server machinery can produce. Used by balancer tests
    /// that exercise the retry loop without a real connection.
    pub(crate) fn for_test(uri: &str, body: &'static [u8]) -> Self {
        Self {
            method: Method::GET,
            uri: uri.parse().expect("test uri parses"),
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: Bytes::from_static(body),
        }
    }
}

/// Build the `502 Bad Gateway` response the balancer returns once it has
/// exhausted its dispatch attempts (or found no live backend at all).
pub fn bad_gateway() -> ProxyResponse {
    let body = Full::new(Bytes::from_static(b"Bad gateway\n"))
        .map_err(|never: Infallible| match never {})
        .boxed();

    http::Response::builder()
        .status(StatusCode::BAD_GATEWAY)
        .body(body)
        .expect("bad gateway response is well-formed")
}
