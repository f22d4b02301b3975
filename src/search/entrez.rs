//! NCBI Entrez E-utilities client
//!
//! Endpoints used:
//!   esearch: {base}/esearch.fcgi  (JSON, identifiers only)
//!   efetch:  {base}/efetch.fcgi   (plain identifier list or PubMed XML,
//!            POSTed as a form so long identifier lists stay out of the URL)

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{FetchFormat, LiteratureSource, SearchError};
use crate::config::SearchConfig;
use crate::models::RecordId;

#[derive(Debug, Deserialize)]
struct ESearchResponse {
    esearchresult: Option<ESearchResult>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
    #[serde(rename = "ERROR", default)]
    error: Option<String>,
}

/// Client for the PubMed database
pub struct EntrezClient {
    client: Client,
    base_url: String,
    tool: String,
    email: Option<String>,
    api_key: Option<String>,
}

impl EntrezClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tool: "oxidized-dx".to_string(),
            email: None,
            api_key: None,
        }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        let mut client = Self::new(config.base_url.clone()).with_tool(config.tool.clone());
        if let Some(email) = &config.email {
            client = client.with_email(email.clone());
        }
        if let Some(api_key) = &config.api_key {
            client = client.with_api_key(api_key.clone());
        }
        client
    }

    /// Contact address NCBI can use if the tool misbehaves
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = tool.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// `db`, `tool` and the optional `email` / `api_key` sent on every call
    fn base_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("db", "pubmed".to_string()), ("tool", self.tool.clone())];
        if let Some(email) = &self.email {
            params.push(("email", email.clone()));
        }
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
        params
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name)
    }

    async fn send_text(&self, request: RequestBuilder) -> Result<String, SearchError> {
        let response = request
            .send()
            .await
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?;

        if !status.is_success() {
            return Err(SearchError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl LiteratureSource for EntrezClient {
    #[instrument(skip(self))]
    async fn search_ids(&self, query: &str, max_results: usize) -> Result<Vec<RecordId>, SearchError> {
        let mut params = self.base_params();
        params.push(("term", query.to_string()));
        params.push(("retmax", max_results.to_string()));
        params.push(("retmode", "json".to_string()));

        let request = self.client.get(self.endpoint("esearch.fcgi")).query(&params);
        let body = self.send_text(request).await?;
        let parsed: ESearchResponse =
            serde_json::from_str(&body).map_err(|e| SearchError::ParseError(e.to_string()))?;

        if let Some(error) = parsed.error {
            return Err(SearchError::RequestFailed(error));
        }
        let result = parsed
            .esearchresult
            .ok_or_else(|| SearchError::ParseError("missing esearchresult".to_string()))?;
        if let Some(error) = result.error {
            return Err(SearchError::RequestFailed(error));
        }

        debug!(ids = ?result.idlist, "esearch returned PMIDs");
        Ok(result.idlist)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn fetch(&self, ids: &[RecordId], format: FetchFormat) -> Result<String, SearchError> {
        let (rettype, retmode) = format.entrez_params();
        let mut params = self.base_params();
        params.push(("id", ids.join(",")));
        params.push(("rettype", rettype.to_string()));
        params.push(("retmode", retmode.to_string()));

        let request = self.client.post(self.endpoint("efetch.fcgi")).form(&params);
        self.send_text(request).await
    }
}
