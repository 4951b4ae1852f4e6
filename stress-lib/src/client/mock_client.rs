use std::{
    collections::{BTreeMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use parking_lot::Mutex;
use rama::{
    Service,
    error::BoxError,
    http::{
        Body, HeaderMap, HeaderValue, Method, Request, Response, StatusCode,
        body::util::BodyExt as _,
        header::CONTENT_TYPE,
        service::web::response::IntoResponse,
    },
    telemetry::tracing,
};
use tokio::time::Instant;

use super::WebClient;

/// A request as it was received by the [`MockInflux`] service.
#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) params: BTreeMap<String, String>,
    pub(crate) headers: HeaderMap,
    pub(crate) body: String,
    pub(crate) received_at: Instant,
}

impl RecordedRequest {
    /// Value of the node tag of the first line protocol point in the body.
    pub(crate) fn node_tag(&self) -> Option<&str> {
        node_tag(&self.body)
    }
}

/// In-process stand-in for the InfluxDB 1.x HTTP API.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockInflux {
    state: Arc<MockState>,
}

#[derive(Debug, Default)]
struct MockState {
    requests: Mutex<Vec<RecordedRequest>>,
    unreachable: bool,
    latency: Duration,
    failing_nodes: HashSet<String>,
    failing_queries: AtomicUsize,
}

impl MockInflux {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every request fails at the transport level, as if nothing listens.
    pub(crate) fn unreachable(self) -> Self {
        self.map_state(|state| state.unreachable = true)
    }

    /// Delay every response, so concurrent requests overlap.
    pub(crate) fn with_latency(self, latency: Duration) -> Self {
        self.map_state(|state| state.latency = latency)
    }

    /// Answer writes of the given node (tag value) with a 500.
    pub(crate) fn fail_writes_for_node(self, node: &str) -> Self {
        self.map_state(|state| {
            state.failing_nodes.insert(node.to_owned());
        })
    }

    /// Answer the next `count` requests to `/query` with a 500.
    pub(crate) fn fail_queries(self, count: usize) -> Self {
        self.map_state(|state| state.failing_queries = AtomicUsize::new(count))
    }

    fn map_state(self, f: impl FnOnce(&mut MockState)) -> Self {
        let mut state = Arc::try_unwrap(self.state).unwrap_or_else(|shared| MockState {
            requests: Mutex::new(shared.requests.lock().clone()),
            unreachable: shared.unreachable,
            latency: shared.latency,
            failing_nodes: shared.failing_nodes.clone(),
            failing_queries: AtomicUsize::new(shared.failing_queries.load(Ordering::SeqCst)),
        });
        f(&mut state);
        Self {
            state: Arc::new(state),
        }
    }

    pub(crate) fn client(&self) -> WebClient {
        self.clone().boxed()
    }

    pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().clone()
    }

    pub(crate) fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|req| req.path == path)
            .collect()
    }
}

impl MockInflux {
    fn take_query_failure(&self) -> bool {
        self.state
            .failing_queries
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Service<Request> for MockInflux {
    type Output = Response;
    type Error = BoxError;

    async fn serve(&self, req: Request) -> Result<Self::Output, Self::Error> {
        let received_at = Instant::now();

        if self.state.unreachable {
            return Err(BoxError::from("mock influx: connection refused"));
        }

        let (parts, body) = req.into_parts();
        let body = match body.collect().await {
            Ok(collected) => String::from_utf8_lossy(&collected.to_bytes()).into_owned(),
            Err(err) => {
                tracing::debug!("mock influx: failed to collect request body: {err}");
                String::new()
            }
        };
        let params: BTreeMap<String, String> =
            serde_html_form::from_str(parts.uri.query().unwrap_or_default()).unwrap_or_default();

        let recorded = RecordedRequest {
            method: parts.method,
            path: parts.uri.path().to_owned(),
            params,
            headers: parts.headers,
            body,
            received_at,
        };
        self.state.requests.lock().push(recorded.clone());

        if !self.state.latency.is_zero() {
            tokio::time::sleep(self.state.latency).await;
        }

        if recorded.path == "/query" && self.take_query_failure() {
            return Ok(StatusCode::INTERNAL_SERVER_ERROR.into_response());
        }

        Ok(match (recorded.method.clone(), recorded.path.as_str()) {
            (Method::GET, "/ping") => StatusCode::NO_CONTENT.into_response(),
            (Method::POST, "/write") => {
                let failing = recorded
                    .node_tag()
                    .is_some_and(|node| self.state.failing_nodes.contains(node));
                if failing {
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                } else {
                    StatusCode::NO_CONTENT.into_response()
                }
            }
            (Method::POST, "/query") => json_response(&serde_json::json!({
                "results": [{ "statement_id": 0 }]
            })),
            (Method::GET, "/query") => json_response(&serde_json::json!({
                "results": [{
                    "statement_id": 0,
                    "series": [{
                        "name": "stress_measurement",
                        "columns": ["time", "mean"],
                        "values": [[1_600_000_000_000u64, 499.5]],
                    }],
                }]
            })),
            _ => StatusCode::NOT_FOUND.into_response(),
        })
    }
}

fn json_response(value: &serde_json::Value) -> Response {
    let mut resp = Response::new(Body::from(value.to_string()));
    resp.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    resp
}

fn node_tag(body: &str) -> Option<&str> {
    let series = body.lines().next()?.split(' ').next()?;
    series
        .split(',')
        .find_map(|pair| pair.strip_prefix("node="))
}
