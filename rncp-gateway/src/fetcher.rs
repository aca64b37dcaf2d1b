//! Fetcher - paginated and single-record GETs through the dispatcher
//!
//! Every HTTP request, including each page of a paginated listing, is a
//! separate dispatcher task, so pages of one listing interleave fairly with
//! other callers' requests.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use crate::dispatch::Dispatcher;
use crate::error::GatewayError;
use crate::transport::Transport;

/// Fetcher configuration
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Records requested per page; a shorter page ends the listing
    pub page_size: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self { page_size: 100 }
    }
}

pub struct Fetcher {
    transport: Arc<dyn Transport>,
    dispatcher: Dispatcher,
    config: FetcherConfig,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn Transport>, dispatcher: Dispatcher, config: FetcherConfig) -> Self {
        Self {
            transport,
            dispatcher,
            config,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Fetch every page of a listing, concatenated in arrival order.
    ///
    /// Stops on an empty page or on a page shorter than the page size.
    pub async fn fetch_paged<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        token: &str,
    ) -> Result<Vec<T>, GatewayError> {
        let page_size = self.config.page_size.max(1);
        let mut records = Vec::new();
        let mut page = 1usize;

        loop {
            let query = vec![
                ("page[number]".to_string(), page.to_string()),
                ("page[size]".to_string(), page_size.to_string()),
            ];
            let body = self.dispatch(endpoint, query, token).await?;

            let Value::Array(items) = body else {
                return Err(GatewayError::Decode(format!(
                    "{endpoint} page {page}: expected a JSON array"
                )));
            };

            let count = items.len();
            if count == 0 {
                break;
            }
            debug!(endpoint, page, count, "Fetched page");

            for item in items {
                records.push(serde_json::from_value(item)?);
            }
            if count < page_size {
                break;
            }
            page += 1;
        }

        info!(endpoint, pages = page, records = records.len(), "Listing fetched");
        Ok(records)
    }

    /// Fetch a single, non-paginated resource.
    pub async fn fetch_one<T: DeserializeOwned>(&self, endpoint: &str, token: &str) -> Result<T, GatewayError> {
        let body = self.dispatch(endpoint, Vec::new(), token).await?;
        debug!(endpoint, "Fetched record");
        Ok(serde_json::from_value(body)?)
    }

    async fn dispatch(
        &self,
        endpoint: &str,
        query: Vec<(String, String)>,
        token: &str,
    ) -> Result<Value, GatewayError> {
        let transport = Arc::clone(&self.transport);
        let endpoint = endpoint.to_string();
        let token = token.to_string();

        self.dispatcher
            .enqueue(async move { transport.get(&endpoint, &query, &token).await })
            .await
    }
}
