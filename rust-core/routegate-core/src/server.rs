//! # HTTP Server
//!
//! HTTP front end built on Hyper and Tokio.
//! Implements graceful shutdown with signal handling.
//!
//! ## Key Features
//!
//! - `GET /route/v1/{profile}?{query}` and `GET /route/v1/{profile}/{coordinates}?{query}`
//!   dispatched to the profile's route service
//! - Engine calls on the blocking pool, so a slow route never stalls the accept loop
//! - Graceful shutdown on Ctrl-C: open connections are told to finish, with a bounded drain
//! - `test_request` for exercising the full pipeline without a socket

use crate::engine::Status;
use crate::error::{Error, Result};
use crate::json;
use crate::middleware::{Middleware, MiddlewareChain, MiddlewareResult};
use crate::request::GatewayRequest;
use crate::result::RouteResult;
use crate::router::{Endpoint, Method, Router};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// HTTP Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub address: SocketAddr,
    /// Enable keep-alive connections
    pub keep_alive: bool,
    /// Shutdown timeout for graceful shutdown (default: 30 seconds)
    pub shutdown_timeout: Duration,
    /// Longest query string accepted, in bytes
    pub max_query_length: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: ([127, 0, 0, 1], 5000).into(),
            keep_alive: true,
            shutdown_timeout: Duration::from_secs(30),
            max_query_length: 64 * 1024,
        }
    }
}

/// Finished HTTP response
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    /// HTTP status code
    pub status: u16,
    /// `code` of the result document, when there is one
    pub code: Option<String>,
    /// Content type
    pub content_type: String,
    /// Response body
    pub body: Bytes,
    /// Extra response headers, keyed by lowercase name
    headers: HashMap<String, String>,
}

impl GatewayResponse {
    /// Create a response with a body
    #[must_use]
    pub fn new(status: u16, content_type: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            code: None,
            content_type: content_type.into(),
            body: body.into(),
            headers: HashMap::new(),
        }
    }

    /// Create a JSON error response with `code` and `message`
    #[must_use]
    pub fn error(status: u16, code: &str, message: impl Into<String>) -> Self {
        Self::from_result(status, RouteResult::error(code, message))
    }

    /// Liveness probe response
    #[must_use]
    pub fn health() -> Self {
        let mut result = RouteResult::document();
        result.insert("status", "ok");
        Self::from_result(200, result)
    }

    /// Encode a route result
    ///
    /// Falls back to a bare 500 if the document cannot be serialized.
    #[must_use]
    pub fn from_result(status: u16, result: RouteResult) -> Self {
        let code = result.code().map(String::from);
        match json::encode_result(result) {
            Ok((content_type, body)) => {
                let mut response = Self::new(status, content_type, body);
                response.code = code;
                response
            }
            Err(e) => {
                error!("Failed to encode result: {}", e);
                Self::new(500, "text/plain", "Internal Server Error")
            }
        }
    }

    /// Get a header value (case-insensitive)
    #[must_use]
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Set or override a header
    pub fn set_header(&mut self, key: &str, value: &str) {
        if key.eq_ignore_ascii_case("content-type") {
            self.content_type = value.to_string();
        } else {
            self.headers
                .insert(key.to_ascii_lowercase(), value.to_string());
        }
    }

    /// Convert to hyper Response
    fn into_hyper(self) -> Response<Full<Bytes>> {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut builder = Response::builder()
            .status(status)
            .header("Content-Type", &self.content_type);
        for (k, v) in &self.headers {
            builder = builder.header(k.as_str(), v.as_str());
        }

        builder.body(Full::new(self.body)).unwrap_or_else(|e| {
            error!("Failed to build response: {}", e);
            let mut response = Response::new(Full::new(Bytes::from_static(b"Internal Server Error")));
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
        })
    }
}

/// HTTP status for a finished route query
///
/// Documents with a `code` are client-facing errors; anything else the
/// engine failed on is a server error.
fn http_status(status: Status, result: &RouteResult) -> u16 {
    match status {
        Status::Ok => 200,
        Status::Error if result.code().is_some() => 400,
        Status::Error => 500,
    }
}

/// HTTP front end for a set of route services
pub struct Server {
    config: ServerConfig,
    router: Arc<Router>,
    middleware: MiddlewareChain,
}

impl Server {
    /// Create a new Server instance
    pub fn new(router: Router) -> Self {
        Self::with_config(router, ServerConfig::default())
    }

    /// Create a server with an explicit configuration
    pub fn with_config(router: Router, config: ServerConfig) -> Self {
        Self {
            config,
            router: Arc::new(router),
            middleware: MiddlewareChain::new(),
        }
    }

    /// Bind the server to an address
    #[must_use]
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.config.address = addr;
        self
    }

    /// Active configuration
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Add a middleware to the chain
    pub fn add_middleware<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middleware.add(middleware);
    }

    /// Start the server with graceful shutdown on Ctrl-C
    ///
    /// # Errors
    ///
    /// Returns `Error::BindError` if the listener cannot be set up, or an
    /// IO error if accepting fails
    pub async fn serve(&self) -> Result<()> {
        self.serve_with_shutdown(shutdown_signal()).await
    }

    /// Start the server, stopping once `signal` completes
    ///
    /// On shutdown every open connection finishes its in-flight request and
    /// closes; idle keep-alive connections close right away. Connections
    /// still open after `shutdown_timeout` are abandoned.
    ///
    /// # Errors
    ///
    /// Returns `Error::BindError` if the listener cannot be set up, or an
    /// IO error if accepting fails
    pub async fn serve_with_shutdown<F>(&self, signal: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let addr = self.config.address;
        let listener = bind_listener(addr).map_err(|source| Error::BindError {
            address: addr.to_string(),
            source,
        })?;

        info!(address = %addr, profiles = ?self.router.profiles(), "Server listening");

        let router = self.router.clone();
        let middleware = Arc::new(self.middleware.clone());
        let graceful = GracefulShutdown::new();
        let keep_alive = self.config.keep_alive;
        let max_query_length = self.config.max_query_length;

        tokio::pin!(signal);
        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    let (stream, remote_addr) = accept_result?;
                    let io = TokioIo::new(stream);

                    let router = router.clone();
                    let middleware = middleware.clone();
                    let service = service_fn(move |req| {
                        let router = router.clone();
                        let middleware = middleware.clone();
                        async move {
                            handle_request(req, &router, &middleware, remote_addr, max_query_length).await
                        }
                    });

                    // watched before spawning, so a shutdown right after accept still sees it
                    let conn = graceful.watch(
                        http1::Builder::new()
                            .keep_alive(keep_alive)
                            .serve_connection(io, service),
                    );
                    tokio::task::spawn(async move {
                        if let Err(err) = conn.await {
                            warn!(remote = %remote_addr, "Error serving connection: {}", err);
                        }
                    });
                }
                () = &mut signal => {
                    info!("Shutdown signal received, stopping server...");
                    break;
                }
            }
        }
        drop(listener);

        tokio::select! {
            () = graceful.shutdown() => info!("All connections closed"),
            () = tokio::time::sleep(self.config.shutdown_timeout) => {
                warn!("Shutdown timeout reached with connections still open");
            }
        }
        Ok(())
    }

    /// Execute a test request directly without network stack
    pub async fn test_request(&self, method: Method, target: &str) -> GatewayResponse {
        let mut req = GatewayRequest::new(method, target);
        req.set_header("x-client-ip", "test");
        process_request(
            &mut req,
            &self.router,
            &self.middleware,
            self.config.max_query_length,
        )
        .await
    }
}

fn bind_listener(addr: SocketAddr) -> std::io::Result<tokio::net::TcpListener> {
    let socket = if addr.is_ipv4() {
        tokio::net::TcpSocket::new_v4()?
    } else {
        tokio::net::TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(1024)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Core request processing logic (network agnostic)
async fn process_request(
    req: &mut GatewayRequest,
    router: &Arc<Router>,
    middleware: &MiddlewareChain,
    max_query_length: usize,
) -> GatewayResponse {
    if req.header("x-request-id").is_none() {
        let request_id = generate_request_id();
        req.set_header("x-request-id", &request_id);
    }

    let mut response = match middleware.run_before(req) {
        MiddlewareResult::Continue => dispatch(req, router, max_query_length).await,
        MiddlewareResult::Respond(resp) => resp,
    };

    if let Some(request_id) = req.header("x-request-id") {
        response.set_header("x-request-id", request_id);
    }
    middleware.run_after(req, &mut response);
    response
}

async fn dispatch(
    req: &GatewayRequest,
    router: &Arc<Router>,
    max_query_length: usize,
) -> GatewayResponse {
    let matched = match router.match_path(&req.path) {
        Ok(m) => m,
        Err(_) => {
            return GatewayResponse::error(404, "InvalidUrl", format!("URL {} not found", req.path));
        }
    };

    if req.method != Method::Get {
        return GatewayResponse::error(
            405,
            "InvalidMethod",
            format!("Method {} not allowed", req.method),
        );
    }

    let profile = match (matched.endpoint, matched.profile()) {
        (Endpoint::Health, _) => return GatewayResponse::health(),
        (Endpoint::Route, Some(profile)) => profile,
        (Endpoint::Route, None) => {
            return GatewayResponse::error(404, "InvalidUrl", "Missing profile");
        }
    };

    let Some(service) = router.service(profile) else {
        return GatewayResponse::error(
            404,
            "InvalidService",
            format!("Profile {profile} not found!"),
        );
    };

    let (prefix_length, query) = match matched.coordinates() {
        Some(coordinates) => req.path_query(coordinates),
        None => (req.prefix_length(), req.query_text().to_string()),
    };
    if query.len() > max_query_length {
        return GatewayResponse::error(
            414,
            "TooBig",
            format!("Query string longer than {max_query_length} bytes"),
        );
    }

    let service = service.clone();
    let outcome =
        tokio::task::spawn_blocking(move || service.run_query(prefix_length, &query)).await;

    match outcome {
        Ok((status, result)) => GatewayResponse::from_result(http_status(status, &result), result),
        Err(e) => {
            let e = Error::from(e);
            error!("Route dispatch failed: {}", e);
            GatewayResponse::error(500, "InternalError", "Route dispatch failed")
        }
    }
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    router: &Arc<Router>,
    middleware: &MiddlewareChain,
    remote_addr: SocketAddr,
    max_query_length: usize,
) -> std::result::Result<Response<Full<Bytes>>, hyper::Error> {
    let Some(method) = Method::from_hyper(req.method()) else {
        return Ok(GatewayResponse::error(405, "InvalidMethod", "Unsupported method").into_hyper());
    };

    let mut gateway_request = GatewayRequest::from_hyper(method, &req);
    gateway_request.set_header("x-client-ip", &remote_addr.ip().to_string());
    let response = process_request(&mut gateway_request, router, middleware, max_query_length).await;
    Ok(response.into_hyper())
}

static REQUEST_COUNTER: AtomicUsize = AtomicUsize::new(1);

fn generate_request_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let counter = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{:x}-{:x}", now.as_nanos(), counter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{GreatCircleEngine, RoutingEngine};
    use crate::json::{FLATBUFFERS_CONTENT_TYPE, JSON_CONTENT_TYPE};
    use crate::middleware::CorsMiddleware;
    use crate::params::RouteParameters;
    use crate::service::RouteService;
    use serde_json::Value;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    /// Engine that fails without writing anything
    struct Broken;

    impl RoutingEngine for Broken {
        fn route(&self, _params: &RouteParameters, _result: &mut RouteResult) -> Status {
            Status::Error
        }
    }

    fn server() -> Server {
        let mut router = Router::new().unwrap();
        router
            .add_profile(
                "driving",
                RouteService::new(Arc::new(GreatCircleEngine::default())),
            )
            .unwrap();
        router
            .add_profile("broken", RouteService::new(Arc::new(Broken)))
            .unwrap();
        Server::new(router)
    }

    fn body(res: &GatewayResponse) -> serde_json::Map<String, Value> {
        serde_json::from_slice(&res.body).unwrap()
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.address.port(), 5000);
        assert!(config.keep_alive);
        assert_eq!(config.max_query_length, 65536);
    }

    #[test]
    fn test_gateway_response_headers() {
        let mut res = GatewayResponse::health();
        res.set_header("X-Request-Id", "1");
        assert_eq!(res.header("x-request-id"), Some("1"));
        res.set_header("content-type", "text/plain");
        assert_eq!(res.content_type, "text/plain");
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(http_status(Status::Ok, &RouteResult::document()), 200);
        assert_eq!(
            http_status(Status::Error, &RouteResult::error("NoRoute", "x")),
            400
        );
        assert_eq!(http_status(Status::Error, &RouteResult::buffer()), 500);
    }

    #[tokio::test]
    async fn test_route_success() {
        let res = server()
            .test_request(Method::Get, "/route/v1/driving?coordinates=1,1;2,2")
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.content_type, JSON_CONTENT_TYPE);
        assert_eq!(res.code.as_deref(), Some("Ok"));

        let doc = body(&res);
        assert!(doc.contains_key("routes"));
        assert!(doc.get("durationNanos").and_then(Value::as_u64).is_some());
        assert!(res.header("x-request-id").is_some());
    }

    #[tokio::test]
    async fn test_invalid_query_position_is_absolute() {
        let res = server()
            .test_request(Method::Get, "/route/v1/driving?coordinates=1,1;2,2&bogus=x")
            .await;
        assert_eq!(res.status, 400);

        let doc = body(&res);
        assert_eq!(doc["code"], "InvalidQuery");
        // 18 bytes of "/route/v1/driving?" plus the offset of '&'
        assert_eq!(
            doc["message"],
            "Query string malformed close to position 37"
        );
    }

    #[tokio::test]
    async fn test_coordinates_in_path() {
        let res = server()
            .test_request(
                Method::Get,
                "/route/v1/driving/9.974192,49.782036;9.936275,49.792492?steps=false&alternatives=false&overview=false&exclude=ferry",
            )
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.code.as_deref(), Some("Ok"));
        assert_eq!(body(&res)["routes"].as_array().map(Vec::len), Some(1));

        let res = server()
            .test_request(Method::Get, "/route/v1/driving/1,1;2,2")
            .await;
        assert_eq!(res.status, 200);
    }

    #[tokio::test]
    async fn test_coordinates_in_path_error_positions() {
        let server = server();

        // '?' after the 18 byte "/route/v1/driving/" and the 7 byte list
        let res = server
            .test_request(Method::Get, "/route/v1/driving/1,1;2,2?bogus=x")
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(
            body(&res)["message"],
            "Query string malformed close to position 25"
        );

        let res = server
            .test_request(Method::Get, "/route/v1/driving/1,1;x,2?steps=true")
            .await;
        assert_eq!(
            body(&res)["message"],
            "Query string malformed close to position 18"
        );

        let res = server
            .test_request(Method::Get, "/route/v1/driving/1,1?steps=true")
            .await;
        assert_eq!(body(&res)["code"], "InvalidOptions");
    }

    #[tokio::test]
    async fn test_missing_query_position_is_end_of_target() {
        let target = "/route/v1/driving";
        let res = server().test_request(Method::Get, target).await;
        assert_eq!(res.status, 400);
        assert_eq!(body(&res)["code"], "InvalidQuery");
        assert_eq!(
            body(&res)["message"],
            format!("Query string malformed close to position {}", target.len())
        );
    }

    #[tokio::test]
    async fn test_invalid_options() {
        let res = server()
            .test_request(Method::Get, "/route/v1/driving?coordinates=1,1;2,2&hints=abc")
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(body(&res)["code"], "InvalidOptions");
    }

    #[tokio::test]
    async fn test_flatbuffers_body() {
        let res = server()
            .test_request(
                Method::Get,
                "/route/v1/driving?coordinates=1,1;2,2&format=flatbuffers",
            )
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.content_type, FLATBUFFERS_CONTENT_TYPE);
        assert_eq!(res.code, None);
        assert_eq!(res.body.len(), 4 + 16);
    }

    #[tokio::test]
    async fn test_flatbuffers_engine_error_is_reported() {
        let res = server()
            .test_request(
                Method::Get,
                "/route/v1/driving?coordinates=1,1;2,2&exclude=motorway,toll,ferry&format=flatbuffers",
            )
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.content_type, JSON_CONTENT_TYPE);
        assert_eq!(res.code.as_deref(), Some("NoRoute"));
        assert!(body(&res).contains_key("message"));
    }

    #[tokio::test]
    async fn test_engine_error_mapping() {
        let server = server();

        let res = server
            .test_request(Method::Get, "/route/v1/driving?coordinates=1,1;2,2&exclude=tram")
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.code.as_deref(), Some("InvalidValue"));

        let res = server
            .test_request(Method::Get, "/route/v1/broken?coordinates=1,1;2,2")
            .await;
        assert_eq!(res.status, 500);
        assert!(body(&res).contains_key("durationNanos"));
    }

    #[tokio::test]
    async fn test_unknown_profile_and_path() {
        let server = server();

        let res = server
            .test_request(Method::Get, "/route/v1/cycling?coordinates=1,1;2,2")
            .await;
        assert_eq!(res.status, 404);
        assert_eq!(res.code.as_deref(), Some("InvalidService"));

        let res = server.test_request(Method::Get, "/table/v1/driving").await;
        assert_eq!(res.status, 404);
        assert_eq!(res.code.as_deref(), Some("InvalidUrl"));
    }

    #[tokio::test]
    async fn test_method_not_allowed() {
        let res = server()
            .test_request(Method::Post, "/route/v1/driving?coordinates=1,1;2,2")
            .await;
        assert_eq!(res.status, 405);
    }

    #[tokio::test]
    async fn test_query_too_long() {
        let mut router = Router::new().unwrap();
        router
            .add_profile(
                "driving",
                RouteService::new(Arc::new(GreatCircleEngine::default())),
            )
            .unwrap();
        let config = ServerConfig {
            max_query_length: 10,
            ..ServerConfig::default()
        };
        let server = Server::with_config(router, config);

        let res = server
            .test_request(Method::Get, "/route/v1/driving?coordinates=1,1;2,2")
            .await;
        assert_eq!(res.status, 414);
    }

    #[tokio::test]
    async fn test_health_and_middleware() {
        let mut server = server();
        server.add_middleware(CorsMiddleware::new());

        let res = server.test_request(Method::Get, "/health").await;
        assert_eq!(res.status, 200);
        assert_eq!(body(&res)["status"], "ok");
        assert_eq!(res.header("access-control-allow-origin"), Some("*"));
    }

    #[tokio::test]
    async fn test_shutdown_closes_idle_keep_alive_connections() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let config = ServerConfig {
            address: ([127, 0, 0, 1], port).into(),
            shutdown_timeout: Duration::from_secs(30),
            ..ServerConfig::default()
        };
        let server = Server::with_config(Router::new().unwrap(), config);

        let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            server
                .serve_with_shutdown(async {
                    let _ = stopped.await;
                })
                .await
        });

        let mut stream = None;
        for _ in 0..100 {
            if let Ok(s) = TcpStream::connect(("127.0.0.1", port)).await {
                stream = Some(s);
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        let mut stream = stream.unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        let mut buf = [0_u8; 1024];
        let n = stream.read(&mut buf).await.unwrap();
        assert!(buf[..n].starts_with(b"HTTP/1.1 200"));

        // connection is now idle but kept alive
        stop.send(()).unwrap();
        let outcome = tokio::time::timeout(Duration::from_secs(5), handle).await;
        assert!(matches!(outcome, Ok(Ok(Ok(())))));
    }
}
