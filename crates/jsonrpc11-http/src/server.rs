//! HTTP transport for a JSON-RPC 1.1 service

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{ALLOW, CONTENT_TYPE, HeaderValue};
use http::{Method, StatusCode};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use jsonrpc11_server::JsonRpcService;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::Result;

/// Configuration for the HTTP JSON-RPC server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_address: SocketAddr,
    /// Path the service answers on
    pub rpc_path: String,
    /// Maximum request body size
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8888)),
            rpc_path: "/".to_string(),
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

/// Per-call options handed to every method: who is calling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpContext {
    pub peer_addr: SocketAddr,
}

pub struct HttpJsonRpcServerBuilder {
    config: ServerConfig,
    service: Arc<JsonRpcService<HttpContext>>,
}

impl HttpJsonRpcServerBuilder {
    pub fn new(service: JsonRpcService<HttpContext>) -> Self {
        Self {
            config: ServerConfig::default(),
            service: Arc::new(service),
        }
    }

    /// Set the bind address
    pub fn bind_address(mut self, addr: SocketAddr) -> Self {
        self.config.bind_address = addr;
        self
    }

    /// Set the endpoint path
    pub fn rpc_path(mut self, path: impl Into<String>) -> Self {
        self.config.rpc_path = path.into();
        self
    }

    /// Set maximum request body size
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    pub fn build(self) -> HttpJsonRpcServer {
        HttpJsonRpcServer {
            config: Arc::new(self.config),
            service: self.service,
        }
    }
}

/// Serves one [`JsonRpcService`] on one path.
#[derive(Clone)]
pub struct HttpJsonRpcServer {
    config: Arc<ServerConfig>,
    service: Arc<JsonRpcService<HttpContext>>,
}

impl HttpJsonRpcServer {
    pub fn builder(service: JsonRpcService<HttpContext>) -> HttpJsonRpcServerBuilder {
        HttpJsonRpcServerBuilder::new(service)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind the configured address and serve until the listener fails.
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_address).await?;
        self.serve(listener).await
    }

    /// Serve connections accepted on an already bound listener.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        info!(
            "JSON-RPC service '{}' listening on {}",
            self.service.description().name,
            listener.local_addr()?
        );
        info!("Endpoint available at: {}", self.config.rpc_path);

        loop {
            let (stream, peer_addr) = listener.accept().await?;
            debug!("New connection from {}", peer_addr);

            let server = self.clone();
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| {
                    let server = server.clone();
                    async move { server.handle(req, peer_addr).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    if err.is_incomplete_message() {
                        debug!("Client disconnected (normal): {}", err);
                    } else {
                        error!("Error serving connection: {}", err);
                    }
                }
            });
        }
    }

    /// Route one HTTP request.
    pub async fn handle<B>(
        &self,
        req: Request<B>,
        peer_addr: SocketAddr,
    ) -> std::result::Result<Response<Full<Bytes>>, Infallible>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        debug!("Handling {} {} from {}", req.method(), req.uri().path(), peer_addr);

        if req.uri().path() != self.config.rpc_path {
            return Ok(plain(StatusCode::NOT_FOUND, "Not Found"));
        }
        if req.method() != Method::POST {
            let mut response = plain(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
            response
                .headers_mut()
                .insert(ALLOW, HeaderValue::from_static("POST"));
            return Ok(response);
        }

        let body = match Limited::new(req.into_body(), self.config.max_body_size)
            .collect()
            .await
        {
            Ok(collected) => collected.to_bytes(),
            Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
                warn!("Request body from {} exceeds {} bytes", peer_addr, self.config.max_body_size);
                return Ok(plain(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large"));
            }
            Err(err) => {
                error!("Failed to read request body: {}", err);
                return Ok(plain(StatusCode::BAD_REQUEST, "Failed to read request body"));
            }
        };

        let service = Arc::clone(&self.service);
        let context = HttpContext { peer_addr };
        match tokio::task::spawn_blocking(move || service.call(&body, &context)).await {
            Ok(Some(reply)) => {
                let mut response = Response::new(Full::new(Bytes::from(reply)));
                response
                    .headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                Ok(response)
            }
            Ok(None) => {
                let mut response = Response::new(Full::new(Bytes::new()));
                *response.status_mut() = StatusCode::NO_CONTENT;
                Ok(response)
            }
            Err(err) => {
                error!("JSON-RPC call task failed: {}", err);
                Ok(plain(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"))
            }
        }
    }
}

fn plain(status: StatusCode, text: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(text.as_bytes())));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonrpc11_server::prelude::*;
    use serde_json::{Value, json};
    use std::net::{IpAddr, Ipv4Addr};

    fn peer() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7)), 40000)
    }

    fn server() -> HttpJsonRpcServer {
        let service = JsonRpcService::builder()
            .method_fn(
                "whoami",
                |_params: Option<RequestParams>, ctx: &HttpContext| -> MethodResult<Value> {
                    Ok(json!(ctx.peer_addr.to_string()))
                },
            )
            .unwrap()
            .build();
        HttpJsonRpcServer::builder(service)
            .rpc_path("/rpc")
            .max_body_size(256)
            .build()
    }

    fn post(path: &str, body: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(Method::POST)
            .uri(path)
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap()
    }

    async fn body_text(response: Response<Full<Bytes>>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address, SocketAddr::from(([127, 0, 0, 1], 8888)));
        assert_eq!(config.rpc_path, "/");
        assert_eq!(config.max_body_size, 1024 * 1024);
    }

    #[test]
    fn test_builder() {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), 3000);
        let server = HttpJsonRpcServer::builder(JsonRpcService::builder().build())
            .bind_address(addr)
            .rpc_path("/api")
            .max_body_size(2048)
            .build();

        assert_eq!(server.config().bind_address, addr);
        assert_eq!(server.config().rpc_path, "/api");
        assert_eq!(server.config().max_body_size, 2048);
    }

    #[tokio::test]
    async fn test_call_receives_peer_address() {
        let response = server()
            .handle(
                post("/rpc", r#"{"version":"1.1","method":"whoami","id":1}"#),
                peer(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(
            body_text(response).await,
            r#"{"version":"1.1","result":"10.0.0.7:40000","id":1}"#
        );
    }

    #[tokio::test]
    async fn test_notification_has_no_content() {
        let response = server()
            .handle(post("/rpc", r#"{"version":"1.1","method":"whoami"}"#), peer())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(body_text(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_protocol_errors_are_http_ok() {
        let response = server()
            .handle(post("/rpc", "{not json"), peer())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["error"]["code"], json!(-32700));
        assert!(body.get("id").is_none());
    }

    #[tokio::test]
    async fn test_routing() {
        let server = server();

        let response = server.handle(post("/other", "{}"), peer()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let get = Request::builder()
            .method(Method::GET)
            .uri("/rpc")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let response = server.handle(get, peer()).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[ALLOW], "POST");
    }

    #[tokio::test]
    async fn test_oversized_body() {
        let body = format!(
            r#"{{"version":"1.1","method":"whoami","params":["{}"],"id":1}}"#,
            "x".repeat(512)
        );
        let response = server().handle(post("/rpc", &body), peer()).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
