use crate::config::ProxySettings;
use crate::proxy::state::ProxyState;
use crate::stats::StatsAggregator;
use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response};
use std::convert::Infallible;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// A backend on an ephemeral loopback port that counts what reaches it.
pub struct TestBackend {
    pub port: u16,
    requests: Arc<AtomicUsize>,
    connections: Arc<AtomicUsize>,
}

impl TestBackend {
    /// Answers 201, echoing the request body and reporting method, path and `X-Custom` in headers.
    pub async fn echo() -> Self {
        Self::with_service(|req: Request<Body>| async move { echo(req) }).await
    }

    /// A backend answering every request with `handler`.
    pub async fn with_service<F, Fut>(handler: F) -> Self
    where
        F: Fn(Request<Body>) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Response<Body>> + Send + 'static,
    {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let requests = Arc::new(AtomicUsize::new(0));
        let connections = Arc::new(AtomicUsize::new(0));

        let (req_count, conn_count) = (requests.clone(), connections.clone());
        let make_svc = make_service_fn(move |_conn: &AddrStream| {
            conn_count.fetch_add(1, Ordering::SeqCst);
            let req_count = req_count.clone();
            let handler = handler.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                    req_count.fetch_add(1, Ordering::SeqCst);
                    let response = handler(req);
                    async move { Ok::<_, Infallible>(response.await) }
                }))
            }
        });
        let server = hyper::Server::from_tcp(listener).unwrap().serve(make_svc);
        tokio::spawn(async move {
            let _ = server.await;
        });
        Self { port, requests, connections }
    }

    /// Accepts connections and never answers.
    pub async fn silent() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let connections = Arc::new(AtomicUsize::new(0));
        let conn_count = connections.clone();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                conn_count.fetch_add(1, Ordering::SeqCst);
                held.push(stream);
            }
        });
        Self { port, requests: Arc::new(AtomicUsize::new(0)), connections }
    }

    /// A port nothing is listening on.
    pub fn unused_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

fn echo(req: Request<Body>) -> Response<Body> {
    let path = req.uri().path_and_query().map(|pq| pq.to_string()).unwrap_or_default();
    let method = req.method().to_string();
    let custom = req.headers().get("x-custom").cloned();
    let mut builder = Response::builder().status(201).header("x-backend-method", method).header("x-backend-path", path);
    if let Some(value) = custom {
        builder = builder.header("x-backend-custom", value);
    }
    builder.body(req.into_body()).unwrap()
}

pub fn settings_for(backend_timeout: Option<Duration>) -> ProxySettings {
    ProxySettings { backend_host: "127.0.0.1".to_string(), backend_timeout, ..ProxySettings::default() }
}

pub fn state_for(sites_root: &Path) -> Arc<ProxyState> {
    let settings = ProxySettings { sites_root: sites_root.to_path_buf(), ..settings_for(Some(Duration::from_secs(5))) };
    Arc::new(ProxyState::new(settings, Arc::new(StatsAggregator::new())))
}

pub fn write_host(sites_root: &Path, hostname: &str, content: &str) {
    let dir = sites_root.join(hostname);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.yml"), content).unwrap();
}
