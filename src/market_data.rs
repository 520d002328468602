//! Alpha Vantage economic indicator client
//!
//! The two series the assistant needs (treasury yield, retail sales) are
//! fetched with one GET each and handed back exactly as the provider sent
//! them. HTTP goes through the `HttpTransport` seam so tests can swap the
//! network out.

use crate::config::AlphaVantageConfig;
use crate::error::AssistantError;
use crate::Result;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// Keys Alpha Vantage uses to report problems inside a 200 response
const PROVIDER_NOTICE_KEYS: &[&str] = &["Error Message", "Note", "Information"];

/// Minimal GET-and-decode transport
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value>;
}

/// Production transport backed by a pooled reqwest client
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(4)
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value> {
        // The query string carries the API key, so errors are stripped of their URL.
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                AssistantError::ToolError(format!("Market data request failed: {}", e.without_url()))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::ToolError(format!(
                "Market data provider returned {}: {}",
                status, body
            )));
        }

        response.json::<Value>().await.map_err(|e| {
            AssistantError::ToolError(format!("Invalid JSON response: {}", e.without_url()))
        })
    }
}

/// Economic series exposed to the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EconomicSeries {
    /// Monthly 1-year treasury constant maturity rate
    TreasuryYield,
    /// Monthly advance retail sales
    RetailSales,
}

impl EconomicSeries {
    pub fn function(&self) -> &'static str {
        match self {
            EconomicSeries::TreasuryYield => "TREASURY_YIELD",
            EconomicSeries::RetailSales => "RETAIL_SALES",
        }
    }

    fn extra_params(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            EconomicSeries::TreasuryYield => &[("interval", "monthly"), ("maturity", "1year")],
            EconomicSeries::RetailSales => &[],
        }
    }
}

/// Alpha Vantage client with explicit key and endpoint
#[derive(Clone)]
pub struct AlphaVantageClient {
    transport: Arc<dyn HttpTransport>,
    api_key: String,
    base_url: String,
}

impl AlphaVantageClient {
    pub fn new(config: &AlphaVantageConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config.timeout_secs)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: &AlphaVantageConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
        }
    }

    /// Fetch one series and return the provider body untouched.
    ///
    /// `country_code` is recorded but not sent: these series are US-only and
    /// the provider has no country parameter for them.
    pub async fn fetch_series(&self, series: EconomicSeries, country_code: &str) -> Result<Value> {
        debug!(
            function = series.function(),
            country_code = %country_code,
            "Fetching economic series"
        );

        let mut query: Vec<(&str, &str)> = vec![("function", series.function())];
        query.extend_from_slice(series.extra_params());
        query.push(("apikey", self.api_key.as_str()));

        let body = self.transport.get_json(&self.base_url, &query).await?;

        if let Some(notice) = PROVIDER_NOTICE_KEYS.iter().find_map(|key| body.get(*key)) {
            warn!(
                function = series.function(),
                notice = %notice,
                "Market data provider returned a notice instead of data"
            );
        }

        Ok(body)
    }

    pub async fn treasury_yield(&self, country_code: &str) -> Result<Value> {
        self.fetch_series(EconomicSeries::TreasuryYield, country_code)
            .await
    }

    pub async fn retail_sales(&self, country_code: &str) -> Result<Value> {
        self.fetch_series(EconomicSeries::RetailSales, country_code)
            .await
    }
}

/// One request seen by `StaticTransport`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
}

impl RecordedRequest {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
enum CannedResponse {
    Body(Value),
    Failure(String),
}

/// In-process transport for development & testing
///
/// Serves canned bodies keyed by the `function` query parameter and records
/// every request. Functions with nothing configured fail like a dead host.
#[derive(Default)]
pub struct StaticTransport {
    responses: HashMap<String, CannedResponse>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl StaticTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, series: EconomicSeries, body: Value) -> Self {
        self.responses
            .insert(series.function().to_string(), CannedResponse::Body(body));
        self
    }

    pub fn with_failure(mut self, series: EconomicSeries, message: impl Into<String>) -> Self {
        self.responses.insert(
            series.function().to_string(),
            CannedResponse::Failure(message.into()),
        );
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl HttpTransport for StaticTransport {
    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value> {
        let recorded = RecordedRequest {
            url: url.to_string(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        };
        let function = recorded.param("function").unwrap_or_default().to_string();

        if let Ok(mut requests) = self.requests.lock() {
            requests.push(recorded);
        }

        match self.responses.get(&function) {
            Some(CannedResponse::Body(body)) => Ok(body.clone()),
            Some(CannedResponse::Failure(message)) => {
                Err(AssistantError::ToolError(message.clone()))
            }
            None => Err(AssistantError::ToolError(format!(
                "No canned response for function '{}'",
                function
            ))),
        }
    }
}
