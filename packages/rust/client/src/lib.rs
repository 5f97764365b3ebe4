//! HTTP client for the IDT biophysics melt calculator.
//!
//! Each calculation is a single form `POST` to the calculator's CGI handler.
//! The returned HTML page is handed to [`extract`] which reads the four
//! result values by element id.

mod extract;

use std::future::Future;
use std::time::Duration;

use oligocalc_shared::{
    ConcentrationParameters, OligoCalcError, Result, ServiceConfig, ThermodynamicResult,
};
use reqwest::{Client, StatusCode};
use tracing::{debug, info, instrument, warn};
use url::Url;

pub use extract::extract;

/// User-Agent string for calculator requests.
const USER_AGENT: &str = concat!("oligocalc/", env!("CARGO_PKG_VERSION"));

/// The form handler rejects posts without this submit value.
const SUBMIT_VALUE: &str = "CALCULATE";

// ---------------------------------------------------------------------------
// Calculator trait
// ---------------------------------------------------------------------------

/// Anything that turns a sequence and solution conditions into thermodynamics.
///
/// [`MeltClient`] is the production implementation; the batch driver is
/// generic over this trait so it can run against an in-process stub.
pub trait Calculator {
    fn compute(
        &self,
        sequence: &str,
        params: &ConcentrationParameters,
    ) -> impl Future<Output = Result<ThermodynamicResult>> + Send;
}

// ---------------------------------------------------------------------------
// Client options
// ---------------------------------------------------------------------------

/// Configuration for [`MeltClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Calculator form endpoint.
    pub endpoint: Url,
    /// Per-request timeout; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Extra attempts after a transport failure.
    pub max_retries: u32,
    /// Delay before the first retry, doubled per attempt.
    pub retry_delay: Duration,
}

impl ClientOptions {
    /// Build options from the `[service]` config section.
    pub fn from_config(service: &ServiceConfig) -> Result<Self> {
        Ok(Self {
            endpoint: service.endpoint_url()?,
            timeout: service.timeout_secs.map(Duration::from_secs),
            max_retries: service.max_retries,
            retry_delay: Duration::from_millis(service.retry_delay_ms),
        })
    }
}

// ---------------------------------------------------------------------------
// MeltClient
// ---------------------------------------------------------------------------

/// Client for the remote melt calculator.
pub struct MeltClient {
    client: Client,
    options: ClientOptions,
}

impl MeltClient {
    /// Create a client with the given options.
    pub fn new(options: ClientOptions) -> Result<Self> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(|e| {
            OligoCalcError::RemoteService(format!("failed to build HTTP client: {e}"))
        })?;

        Ok(Self { client, options })
    }

    /// Endpoint this client posts to.
    pub fn endpoint(&self) -> &Url {
        &self.options.endpoint
    }

    /// Post one calculation and return the raw result page.
    ///
    /// Connection failures, 5xx and 429 responses are retried up to
    /// `max_retries` times with a doubling delay. Other statuses fail at once.
    #[instrument(skip_all, fields(sequence = %sequence))]
    pub async fn fetch(&self, sequence: &str, params: &ConcentrationParameters) -> Result<String> {
        if sequence.trim().is_empty() {
            return Err(OligoCalcError::validation("sequence must not be empty"));
        }

        info!(sequence = %sequence.to_uppercase(), "analyzing sequence");
        debug!(
            oligo = params.oligo,
            target = params.target,
            na = params.na,
            mg = params.mg,
            dntp = params.dntp,
            "calculating melting parameters"
        );

        let form = form_fields(sequence, params);
        let mut attempt: u32 = 0;

        loop {
            match self.post_form(&form).await {
                Ok(body) => {
                    debug!(bytes = body.len(), "received result page");
                    return Ok(body);
                }
                Err(PostError::Transient(e)) if attempt < self.options.max_retries => {
                    let delay = self
                        .options
                        .retry_delay
                        .saturating_mul(1 << attempt.min(16));
                    attempt += 1;
                    warn!(
                        attempt,
                        max_retries = self.options.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(PostError::Transient(e) | PostError::Permanent(e)) => return Err(e),
            }
        }
    }

    /// Post the form once.
    async fn post_form(
        &self,
        form: &[(&'static str, String)],
    ) -> std::result::Result<String, PostError> {
        let url = &self.options.endpoint;

        let response = self
            .client
            .post(url.clone())
            .form(form)
            .send()
            .await
            .map_err(|e| {
                PostError::Transient(OligoCalcError::RemoteService(format!("{url}: {e}")))
            })?;

        let status = response.status();
        if !status.is_success() {
            let err = OligoCalcError::RemoteService(format!("{url}: HTTP {status}"));
            return Err(if is_transient_status(status) {
                PostError::Transient(err)
            } else {
                PostError::Permanent(err)
            });
        }

        response.text().await.map_err(|e| {
            PostError::Transient(OligoCalcError::RemoteService(format!(
                "{url}: failed to read body: {e}"
            )))
        })
    }
}

/// A failed post, split by whether sending it again could help.
enum PostError {
    Transient(OligoCalcError),
    Permanent(OligoCalcError),
}

/// Server errors and rate limiting may clear up; other statuses will not.
fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

impl Calculator for MeltClient {
    async fn compute(
        &self,
        sequence: &str,
        params: &ConcentrationParameters,
    ) -> Result<ThermodynamicResult> {
        let body = self.fetch(sequence, params).await?;
        let result = extract(&body)?;
        info!(tm = result.tm, dg = result.dg, "got oligonucleotide parameters");
        Ok(result)
    }
}

/// Form fields in the order the calculator's own page submits them.
pub fn form_fields(
    sequence: &str,
    params: &ConcentrationParameters,
) -> Vec<(&'static str, String)> {
    vec![
        ("OligoConc", params.oligo.to_string()),
        ("TargetConc", params.target.to_string()),
        ("NaConc", params.na.to_string()),
        ("MgConc", params.mg.to_string()),
        ("dNTPsConc", params.dntp.to_string()),
        ("SubmitButton", SUBMIT_VALUE.to_string()),
        ("sequence", sequence.to_string()),
    ]
}
