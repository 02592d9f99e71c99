use reqwest::{
    StatusCode,
    header::{HeaderMap, HeaderName, HeaderValue},
};
use url::Url;

use crate::verifier::{
    LookupResponse, VerificationRecord, Verifier, VerifyOutcome, VerifyRequest, VerifyResponse,
};

/// A remote verifier client that communicates over HTTP.
///
/// `verify_url` is the full `POST /verify` endpoint, exactly as advertised in
/// a requirement's `facilitator` field. Lookups go to the sibling
/// `verifications/{token}` path.
#[derive(Debug, Clone)]
pub struct RemoteVerifierClient {
    pub verify_url: Url,
    pub client: reqwest::Client,
    pub headers: HeaderMap,
}

#[derive(Debug, thiserror::Error)]
pub enum RemoteVerifierClientError {
    #[error("URL {0} cannot carry a path")]
    UrlCannotBeABase(Url),
    #[error("HTTP request error: {0}")]
    HttpRequestError(#[from] reqwest::Error),
    #[error("Unexpected status {status} from verifier at {url}")]
    UnexpectedStatus { status: StatusCode, url: Url },
}

impl RemoteVerifierClient {
    pub fn from_url(verify_url: Url) -> Self {
        RemoteVerifierClient {
            verify_url,
            client: reqwest::Client::new(),
            headers: HeaderMap::new(),
        }
    }

    /// Reuse an existing connection pool.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn header(mut self, key: &HeaderName, value: &HeaderValue) -> Self {
        self.headers.insert(key, value.to_owned());
        self
    }

    /// `…/verify` becomes `…/verifications/{token}`, with the token percent-encoded as one segment.
    pub fn lookup_url(&self, token: &str) -> Result<Url, RemoteVerifierClientError> {
        let mut url = self.verify_url.clone();
        url.set_query(None);
        url.path_segments_mut()
            .map_err(|_| RemoteVerifierClientError::UrlCannotBeABase(self.verify_url.clone()))?
            .pop_if_empty()
            .pop()
            .push("verifications")
            .push(token);
        Ok(url)
    }
}

impl Verifier for RemoteVerifierClient {
    type Error = RemoteVerifierClientError;

    async fn verify(&self, request: VerifyRequest) -> Result<VerifyOutcome, Self::Error> {
        // Rejections arrive as 400 with a structured body, so the status is not checked here.
        let response = self
            .client
            .post(self.verify_url.clone())
            .headers(self.headers.clone())
            .json(&request)
            .send()
            .await?
            .json::<VerifyResponse>()
            .await?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Verifier at {} answered ok={}",
            self.verify_url,
            response.ok
        );

        Ok(response.into_outcome())
    }

    async fn lookup(&self, token: &str) -> Result<Option<VerificationRecord>, Self::Error> {
        let url = self.lookup_url(token)?;
        let response = self
            .client
            .get(url.clone())
            .headers(self.headers.clone())
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                Ok(response.json::<LookupResponse>().await?.record)
            }
            status => Err(RemoteVerifierClientError::UnexpectedStatus { status, url }),
        }
    }
}
