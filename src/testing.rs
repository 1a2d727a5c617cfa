//! Counting HTTP mock used by the adapter tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::Router;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }
}

/// Answers every request with the same status and JSON body.
pub struct MockServer {
    pub url: String,
    hits: Arc<AtomicUsize>,
    last: Arc<Mutex<Option<RecordedRequest>>>,
}

impl MockServer {
    pub async fn start(status: u16, body: String) -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let last = Arc::new(Mutex::new(None));
        let status = StatusCode::from_u16(status).unwrap();

        let app = {
            let hits = hits.clone();
            let last = last.clone();
            Router::new().fallback(move |uri: Uri, headers: HeaderMap, request_body: Bytes| {
                let hits = hits.clone();
                let last = last.clone();
                let body = body.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    *last.lock().unwrap() = Some(RecordedRequest {
                        path: uri.path().to_string(),
                        headers,
                        body: request_body.to_vec(),
                    });
                    (status, [(header::CONTENT_TYPE, "application/json")], body)
                }
            })
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        MockServer {
            url: format!("http://{addr}"),
            hits,
            last,
        }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.last.lock().unwrap().clone()
    }
}

/// Accepts connections and never answers; returns the base URL.
pub async fn start_stalled_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{addr}")
}
