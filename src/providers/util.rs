use crate::core::config::HttpConfig;
use anyhow::{Context, Result};
use reqwest::Client;
use tracing::warn;

/// Builds the HTTP client shared by all rate sources.
///
/// Certificate verification is only relaxed when `accept_invalid_certs` is set.
pub fn build_client(http: &HttpConfig) -> Result<Client> {
    if http.accept_invalid_certs {
        warn!("TLS certificate verification is disabled for rate sources");
    }
    Client::builder()
        .user_agent(&http.user_agent)
        .timeout(http.timeout())
        .danger_accept_invalid_certs(http.accept_invalid_certs)
        .build()
        .context("Failed to build HTTP client")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_clones_share_the_configured_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("user-agent", "ratewatch-test"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let http = HttpConfig {
            user_agent: "ratewatch-test".to_string(),
            ..HttpConfig::default()
        };
        let client = build_client(&http).unwrap();
        let shared = client.clone();

        for c in [client, shared] {
            let status = c.get(server.uri()).send().await.unwrap().status();
            assert_eq!(status, 200);
        }
    }
}
