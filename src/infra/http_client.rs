use crate::app::ports::HttpAdapter;
use crate::constants::{HTTP_TIMEOUT_SECONDS, HTTP_USER_AGENT};
use crate::error::{Result, ScraperError};
use crate::types::HtmlPage;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// `HttpAdapter` over a shared reqwest client
pub struct ReqwestHttp {
    client: Client,
}

impl ReqwestHttp {
    /// Falls back to reqwest's stock client if the configured one cannot be built
    pub fn new() -> Self {
        let built = Client::builder()
            .user_agent(HTTP_USER_AGENT)
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECONDS))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build();
        let client = match built {
            Ok(client) => client,
            Err(e) => {
                warn!(
                    "⚠️ Failed to build HTTP client ({}); using reqwest defaults without user agent or timeout",
                    e
                );
                Client::new()
            }
        };
        Self { client }
    }
}

impl Default for ReqwestHttp {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpAdapter for ReqwestHttp {
    async fn fetch_data(&self, url: &str) -> Result<HtmlPage> {
        debug!("GET {}", url);
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ScraperError::Fetch {
                url: url.to_string(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }
        // Relative links resolve against the post-redirect URL
        let final_url = resp.url().to_string();
        let html = resp.text().await?;
        debug!("Fetched {} bytes from {}", html.len(), final_url);
        Ok(HtmlPage::new(html, final_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_host_is_an_error() {
        let http = ReqwestHttp::new();
        let result = http.fetch_data("http://127.0.0.1:1/events").await;
        assert!(result.is_err());
    }
}
