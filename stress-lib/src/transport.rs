//! Transport adapter: the only component talking HTTP to the store under test.

use std::{collections::BTreeMap, fmt};

use rama::{
    Service as _,
    error::{BoxError, ErrorContext as _},
    http::{
        Body, BodyExtractExt as _, HeaderMap, HeaderName, HeaderValue, Method, Request, Response,
        StatusCode, body::util::BodyExt as _,
    },
    telemetry::tracing,
};

use crate::{client::WebClient, config::Precision, error::BenchError};

/// InfluxDB 1.x HTTP API endpoints used by the benchmark.
#[derive(Clone)]
pub struct InfluxTransport {
    client: WebClient,
    base_url: String,
    database: String,
    precision: Precision,
    headers: HeaderMap,
}

impl fmt::Debug for InfluxTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfluxTransport")
            .field("base_url", &self.base_url)
            .field("database", &self.database)
            .field("precision", &self.precision)
            .finish()
    }
}

impl InfluxTransport {
    pub fn new(
        client: WebClient,
        base_url: String,
        database: String,
        precision: Precision,
        headers: HeaderMap,
    ) -> Self {
        Self {
            client,
            base_url,
            database,
            precision,
            headers,
        }
    }

    /// `GET /ping`
    pub async fn ping(&self) -> Result<(), TransportError> {
        self.send(Endpoint::Ping, Method::GET, "/ping", &[], Body::empty())
            .await
            .map(drop)
    }

    /// `POST /query?q=CREATE DATABASE "<db>"`
    pub async fn create_database(&self) -> Result<(), TransportError> {
        let statement = format!(r#"CREATE DATABASE "{}""#, self.database);
        self.send(
            Endpoint::Query,
            Method::POST,
            "/query",
            &[("q", statement.as_str())],
            Body::empty(),
        )
        .await
        .map(drop)
    }

    /// `POST /query?q=DROP DATABASE "<db>"`
    pub async fn drop_database(&self) -> Result<(), TransportError> {
        let statement = format!(r#"DROP DATABASE "{}""#, self.database);
        self.send(
            Endpoint::Query,
            Method::POST,
            "/query",
            &[("q", statement.as_str())],
            Body::empty(),
        )
        .await
        .map(drop)
    }

    /// `POST /write?db=<db>&precision=<precision>` with a line protocol body.
    pub async fn write(&self, payload: String) -> Result<(), TransportError> {
        self.send(
            Endpoint::Write,
            Method::POST,
            "/write",
            &[
                ("db", self.database.as_str()),
                ("precision", self.precision.as_str()),
            ],
            Body::from(payload),
        )
        .await
        .map(drop)
    }

    /// Issue a query and consume (then discard) its result payload.
    pub async fn query_discard(&self, influxql: &str) -> Result<usize, TransportError> {
        let resp = self.select(influxql).await?;
        let payload = resp
            .into_body()
            .collect()
            .await
            .context("collect query response payload")
            .map_err(|err| TransportError::Io(err.into()))?
            .to_bytes();
        Ok(payload.len())
    }

    /// Issue a query and decode its JSON result document.
    pub async fn query_json(&self, influxql: &str) -> Result<serde_json::Value, TransportError> {
        self.select(influxql)
            .await?
            .try_into_json()
            .await
            .context("collect and json-decode query response payload")
            .map_err(|err| TransportError::Io(err.into()))
    }

    async fn select(&self, influxql: &str) -> Result<Response, TransportError> {
        self.send(
            Endpoint::Query,
            Method::GET,
            "/query",
            &[
                ("db", self.database.as_str()),
                ("epoch", self.precision.as_str()),
                ("q", influxql),
            ],
            Body::empty(),
        )
        .await
    }

    async fn send(
        &self,
        endpoint: Endpoint,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        body: Body,
    ) -> Result<Response, TransportError> {
        let req = self
            .build_request(method, path, params, body)
            .map_err(TransportError::Io)?;

        tracing::trace!(uri = %req.uri(), method = %req.method(), "send influx request");

        let resp = self
            .client
            .serve(req)
            .await
            .context("serve influx http request")
            .map_err(|err| TransportError::Io(err.into()))?;

        let status = resp.status();
        if status.is_success() || status.is_redirection() {
            Ok(resp)
        } else {
            tracing::debug!(%status, ?endpoint, "influx request returned non-success status");
            Err(TransportError::Status { endpoint, status })
        }
    }

    fn build_request(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        body: Body,
    ) -> Result<Request, BoxError> {
        let uri = if params.is_empty() {
            format!("{}{path}", self.base_url)
        } else {
            let query = serde_html_form::to_string(params).context("encode query parameters")?;
            format!("{}{path}?{query}", self.base_url)
        };

        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(headers) = builder.headers_mut() {
            headers.extend(self.headers.clone());
        }

        Ok(builder.body(body).context("build influx http request")?)
    }
}

/// Validate user provided headers up front, so bad input fails at construction.
pub fn parse_headers(headers: &BTreeMap<String, String>) -> Result<HeaderMap, BenchError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|err| BenchError::unsupported(format!("header name '{name}': {err}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|err| BenchError::unsupported(format!("header value for '{name}': {err}")))?;
        map.append(name, value);
    }
    Ok(map)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Ping,
    Write,
    Query,
}

#[derive(Debug)]
pub enum TransportError {
    /// The store answered, but not with a 2xx/3xx status.
    Status {
        endpoint: Endpoint,
        status: StatusCode,
    },
    /// The request could not be built, sent, or its response not be read.
    Io(BoxError),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Status { endpoint, status } => {
                write!(f, "{endpoint:?} endpoint returned http status {status}")
            }
            TransportError::Io(err) => write!(f, "transport failure: {err}"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::Status { .. } => None,
            TransportError::Io(err) => Some(err.as_ref()),
        }
    }
}
