//! HTTP GET with redirect limit, timeout, and an origin-keyed client
//! pool — one `reqwest::Client` per server origin, kept alive for
//! connection reuse instead of building a client per call.

use reqwest::redirect::Policy;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

const MAX_REDIRECTS: usize = 5;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A small pool of `reqwest::Client`s, one per origin, each configured
/// with a bounded redirect policy and a per-call timeout. The source
/// system's per-call client construction is dropped per the "HTTP
/// client reuse" design note; this keeps one pooled client per origin
/// for the lifetime of the process.
#[derive(Debug, Default)]
pub struct Fetcher {
    clients: Mutex<HashMap<String, Client>>,
    timeout: Duration,
}

impl Fetcher {
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    fn client_for(&self, url: &str) -> Client {
        let origin = origin_of(url);
        let mut clients = self.clients.lock().unwrap();
        clients
            .entry(origin)
            .or_insert_with(|| {
                Client::builder()
                    .redirect(Policy::limited(MAX_REDIRECTS))
                    .timeout(self.timeout)
                    .build()
                    .expect("reqwest client configuration is valid")
            })
            .clone()
    }

    pub async fn get(&self, url: &str, accept: Option<&str>) -> reqwest::Result<reqwest::Response> {
        let client = self.client_for(url);
        let mut req = client.get(url);
        if let Some(accept) = accept {
            req = req.header(reqwest::header::ACCEPT, accept);
        }
        req.send().await
    }

    pub async fn get_json(&self, url: &str) -> reqwest::Result<serde_json::Value> {
        self.get(url, Some("application/json"))
            .await?
            .error_for_status()?
            .json()
            .await
    }

    pub async fn get_bytes(&self, url: &str, accept: &str) -> reqwest::Result<bytes_compat::Bytes> {
        let resp = self.get(url, Some(accept)).await?.error_for_status()?;
        resp.bytes().await.map(bytes_compat::Bytes)
    }
}

fn origin_of(url: &str) -> String {
    reqwest::Url::parse(url)
        .map(|u| format!("{}://{}", u.scheme(), u.host_str().unwrap_or_default()))
        .unwrap_or_else(|_| url.to_string())
}

/// Thin wrapper so callers don't need a direct `bytes` crate dependency
/// just to hold the downloaded archive.
pub mod bytes_compat {
    #[derive(Debug, Clone)]
    pub struct Bytes(pub reqwest::Bytes);

    impl std::ops::Deref for Bytes {
        type Target = [u8];
        fn deref(&self) -> &[u8] {
            &self.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_of_strips_path() {
        assert_eq!(
            origin_of("https://packages.simplifier.net/hl7.fhir.r4.core/4.0.1"),
            "https://packages.simplifier.net"
        );
    }

    #[tokio::test]
    async fn reuses_client_for_same_origin() {
        let fetcher = Fetcher::new();
        let _ = fetcher.client_for("https://a.example.com/x");
        let _ = fetcher.client_for("https://a.example.com/y");
        assert_eq!(fetcher.clients.lock().unwrap().len(), 1);
    }
}
