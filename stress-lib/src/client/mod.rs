//! centralized (web) client creation
//!
//! All traffic towards the store under test goes through the client
//! created here, which allows the test suite to swap it out for
//! an in-process mock of the InfluxDB HTTP API.

use rama::{
    Layer as _, Service as _,
    error::{BoxError, ErrorContext as _},
    http::{
        HeaderValue, Request, Response,
        client::EasyHttpWebClient,
        layer::{
            map_request_body::MapRequestBodyLayer, map_response_body::MapResponseBodyLayer,
            required_header::AddRequiredRequestHeadersLayer,
        },
    },
    layer::MapErrLayer,
    rt::Executor,
    service::BoxService,
};

#[cfg(test)]
pub(crate) mod mock_client;

/// Boxed client all benchmark requests are served by.
pub type WebClient = BoxService<Request, Response, BoxError>;

pub const fn user_agent() -> &'static str {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"))
}

/// Create a new web client that can be cloned and shared between nodes.
///
/// No retry or timeout layers are installed: every node issues exactly one
/// attempt, timeouts are applied per node by the benchmark itself.
pub fn new_web_client() -> Result<WebClient, BoxError> {
    let inner = EasyHttpWebClient::connector_builder()
        .with_default_transport_connector()
        .without_tls_proxy_support()
        .without_proxy_support()
        .with_tls_support_using_boringssl(None)
        .with_default_http_connector(Executor::default())
        .try_with_default_connection_pool()
        .context("create connection pool for influx web client")?
        .build_client();

    let client = (
        MapResponseBodyLayer::new_boxed_streaming_body(),
        MapErrLayer::new(into_box_error),
        AddRequiredRequestHeadersLayer::new()
            .with_user_agent_header_value(HeaderValue::from_static(user_agent())),
        MapRequestBodyLayer::new_boxed_streaming_body(),
    )
        .into_layer(inner);

    Ok(client.boxed())
}

fn into_box_error<E: Into<BoxError>>(err: E) -> BoxError {
    err.into()
}
