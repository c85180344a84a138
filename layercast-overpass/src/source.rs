//! HTTP access to the Overpass API.
//!
//! The [`OverpassSource`] trait hides the transport so tests can substitute
//! canned outcomes. The contract is deliberately infallible: whatever goes
//! wrong on the wire, [`OverpassSource::fetch`] returns a [`FetchOutcome`]
//! rather than an error, so the pipeline's never-throws boundary holds.

use async_trait::async_trait;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Client;
use reqwest::header::USER_AGENT;

/// The public Overpass API endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://overpass-api.de/api/interpreter";

/// Default user agent for Overpass requests.
pub const DEFAULT_USER_AGENT: &str = "layercast-fetch/0.1";

/// Sentinel HTTP-like status for network-level failures.
///
/// 520 is the unofficial "unknown error" code popularised by CDN edges; the
/// fetch log uses it so transport faults are distinguishable from statuses
/// the server actually sent.
pub const NETWORK_ERROR_STATUS: u16 = 520;

/// Characters left verbatim in the `data` query parameter.
///
/// Everything outside the unreserved set is escaped except the Overpass QL
/// punctuation `.:;/()`, which keeps queries readable in server logs.
const DATA_PARAM: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b':')
    .remove(b';')
    .remove(b'/')
    .remove(b'(')
    .remove(b')');

/// Outcome of one fetch attempt.
///
/// A tagged result rather than a `Result`: the fetcher never raises, and
/// callers need the cause taxonomy for the log record. Note that
/// `Ok { status: 200 }` is necessary but not sufficient for success; the
/// upstream service has been observed returning 200 with an empty body, so
/// callers must still parse the body and check for elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The server answered; `status` may still be an HTTP error code.
    Ok {
        /// Raw response body.
        body: Vec<u8>,
        /// HTTP status code as sent by the server.
        status: u16,
    },
    /// The request failed below the HTTP layer (DNS, refused, reset, or a
    /// connect timeout). Only an elapsed caller deadline is a [`Timeout`].
    ///
    /// [`Timeout`]: Self::Timeout
    TransportError {
        /// The request URL.
        url: String,
        /// Human-readable cause.
        message: String,
    },
    /// The wall-clock deadline elapsed before a response arrived.
    Timeout,
}

impl FetchOutcome {
    /// HTTP-like status code for the log record.
    ///
    /// Transport errors map to the sentinel [`NETWORK_ERROR_STATUS`];
    /// a timeout carries no status at all.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Ok { status, .. } => Some(*status),
            Self::TransportError { .. } => Some(NETWORK_ERROR_STATUS),
            Self::Timeout => None,
        }
    }

    /// Whether the server answered with a 2xx status.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Ok { status, .. } if (200..300).contains(status))
    }
}

/// A source of Overpass query results.
#[async_trait(?Send)]
pub trait OverpassSource {
    /// Endpoint the source talks to, for diagnostics.
    fn endpoint(&self) -> &str;

    /// Issue `query` and report the outcome. Never fails.
    async fn fetch(&self, query: &str) -> FetchOutcome;
}

#[async_trait(?Send)]
impl<S: OverpassSource + ?Sized> OverpassSource for &S {
    fn endpoint(&self) -> &str {
        (**self).endpoint()
    }

    async fn fetch(&self, query: &str) -> FetchOutcome {
        (**self).fetch(query).await
    }
}

/// HTTP implementation of [`OverpassSource`].
#[derive(Debug)]
pub struct HttpOverpassSource {
    client: Client,
    endpoint: String,
    user_agent: String,
}

impl HttpOverpassSource {
    /// Construct an HTTP-backed source for `endpoint`.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("client builder only fails with invalid configuration");
        Self {
            client,
            endpoint: endpoint.into(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }

    /// Override the default user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Percent-encode `query` into the request URL.
    fn request_url(&self, query: &str) -> String {
        format!(
            "{}?data={}",
            self.endpoint,
            utf8_percent_encode(query, DATA_PARAM)
        )
    }
}

#[async_trait(?Send)]
impl OverpassSource for HttpOverpassSource {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn fetch(&self, query: &str) -> FetchOutcome {
        let url = self.request_url(query);
        let response = match self
            .client
            .get(&url)
            .header(USER_AGENT, self.user_agent.as_str())
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => return convert_reqwest_error(&err, url),
        };
        let status = response.status().as_u16();
        match response.bytes().await {
            Ok(body) => FetchOutcome::Ok {
                body: body.to_vec(),
                status,
            },
            Err(err) => convert_reqwest_error(&err, url),
        }
    }
}

fn convert_reqwest_error(error: &reqwest::Error, url: String) -> FetchOutcome {
    // Connect timeouts included: everything below HTTP is a transport
    // error, and only the caller's wall-clock deadline yields a Timeout.
    FetchOutcome::TransportError {
        url,
        message: error.to_string(),
    }
}
