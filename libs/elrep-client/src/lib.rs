//! HTTP client for the election results reporting API.
//!
//! Used by admin tooling and tests to talk to `elrep-server`. Requests
//! carry no timeouts and are never retried; callers decide how to
//! surface failures.

use elrep_types::election::ElectionDefinition;
use elrep_types::file::FileInfo;
use elrep_types::results::{
    CreateElectionRequest, ElectionDataResponse, ElectionDataRow, ElectionResultSubmission,
    ResultsStatus, SubmittedFile,
};
use reqwest::{Response, StatusCode, Url};
use serde::Deserialize;
use uuid::Uuid;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("url error: {0}")]
    Url(#[from] url::ParseError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("server error: {0}")]
    Server(String),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    errors: Option<Vec<ApiError>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiError {
    #[allow(dead_code)]
    error_type: String,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateElectionResponse {
    election_id: Uuid,
}

/// A client for the election results reporting server.
#[derive(Debug)]
pub struct Client {
    base_url: Url,
}

impl Client {
    /// Create a new client with the given base URL.
    ///
    /// # Example
    ///
    /// ```
    /// # use elrep_client::Client;
    /// let base_url = "http://localhost:8000".parse().unwrap();
    /// let client = Client::new(base_url);
    /// ```
    pub const fn new(base_url: Url) -> Self {
        Self { base_url }
    }

    /// Create a new client to connect to the server running on localhost.
    pub fn localhost() -> Self {
        Self::new(
            "http://localhost:8000"
                .parse()
                .expect("hardcoded URL is valid"),
        )
    }

    /// Check that the server is responding.
    pub async fn check_status(&self) -> Result<()> {
        let response = self.get("/api/status").await?;
        response.error_for_status()?;
        Ok(())
    }

    /// Create an election from its configuration files, returning the
    /// new election's id.
    pub async fn create_election(&self, request: &CreateElectionRequest) -> Result<Uuid> {
        let response = self.post_json("/api/election", request).await?;
        let response: CreateElectionResponse = Self::decode(response).await?;
        Ok(response.election_id)
    }

    /// Soft-delete an election.
    pub async fn delete_election(&self, election_id: Uuid) -> Result<()> {
        let url = self.base_url.join(&format!("/api/election/{election_id}"))?;
        let response = reqwest::Client::new().delete(url).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Get the per-jurisdiction submitted-results summary for an
    /// election. An election with no submissions yields an empty list.
    pub async fn get_election_data(&self, election_id: Uuid) -> Result<Vec<ElectionDataRow>> {
        let response = self
            .get(&format!("/api/election/{election_id}/data"))
            .await?;
        let response: ElectionDataResponse = Self::decode(response).await?;
        Ok(response.data.unwrap_or_default())
    }

    /// Get the jurisdictions file and its processing record.
    pub async fn get_jurisdictions_file(&self, election_id: Uuid) -> Result<FileInfo> {
        let response = self
            .get(&format!("/api/election/{election_id}/jurisdiction/file"))
            .await?;
        Self::decode(response).await
    }

    /// Replace the jurisdictions file.
    pub async fn put_jurisdictions_file(
        &self,
        election_id: Uuid,
        file: &SubmittedFile,
    ) -> Result<()> {
        let url = self
            .base_url
            .join(&format!("/api/election/{election_id}/jurisdiction/file"))?;
        let response = reqwest::Client::new().put(url).json(file).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Get the election definition scoped to a jurisdiction for
    /// results entry.
    pub async fn get_definitions(
        &self,
        election_id: Uuid,
        jurisdiction_id: Uuid,
    ) -> Result<ElectionDefinition> {
        let response = self
            .get(&format!(
                "/api/election/{election_id}/jurisdiction/{jurisdiction_id}/definitions"
            ))
            .await?;
        Self::decode(response).await
    }

    /// Get a jurisdiction's per-precinct upload progress.
    pub async fn get_results_status(
        &self,
        election_id: Uuid,
        jurisdiction_id: Uuid,
    ) -> Result<ResultsStatus> {
        let response = self
            .get(&format!(
                "/api/election/{election_id}/jurisdiction/{jurisdiction_id}/results"
            ))
            .await?;
        Self::decode(response).await
    }

    /// Submit precinct-level results for a jurisdiction.
    pub async fn upload_results(
        &self,
        election_id: Uuid,
        jurisdiction_id: Uuid,
        submission: &ElectionResultSubmission,
    ) -> Result<()> {
        let response = self
            .post_json(
                &format!("/api/election/{election_id}/jurisdiction/{jurisdiction_id}/results"),
                submission,
            )
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Response> {
        let url = self.base_url.join(path)?;
        Ok(reqwest::get(url).await?)
    }

    async fn post_json(&self, path: &str, body: &impl serde::Serialize) -> Result<Response> {
        let url = self.base_url.join(path)?;
        Ok(reqwest::Client::new().post(url).json(body).send().await?)
    }

    /// Maps error statuses onto [`Error`], extracting the server's
    /// error message where one is present.
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body
                .errors
                .and_then(|errors| errors.into_iter().next())
                .map(|error| error.message)
                .unwrap_or_else(|| status.to_string()),
            Err(_) => status.to_string(),
        };
        match status {
            StatusCode::NOT_FOUND => Err(Error::NotFound),
            StatusCode::CONFLICT => Err(Error::Conflict(message)),
            _ => Err(Error::Server(message)),
        }
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }
}
