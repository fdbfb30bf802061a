use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use tracing::debug;

use crate::error::{FetchError, ReportError};
use crate::ident::ReportId;

/// The transport seam. Retries, pooling and timeouts belong to the
/// implementation; callers see one attempt per call.
pub trait Fetch: Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::new("<client>", e))?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let start = Instant::now();
        let resp = self
            .client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| FetchError::new(url, e))?;
        let body = resp.bytes().map_err(|e| FetchError::new(url, e))?;
        debug!(url, bytes = body.len(), ms = start.elapsed().as_millis() as u64, "fetched");
        Ok(body.to_vec())
    }
}

/// Non-UTF-8 bytes only turn up in free-text fields, so decode lossily.
pub fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Raw markup for one report, fetched from its permalink.
pub fn fetch_report(fetch: &impl Fetch, base_url: &str, id: &ReportId) -> Result<String, ReportError> {
    let url = id.permalink(base_url);
    let bytes = fetch.fetch(&url).map_err(|source| ReportError::Fetch {
        id: id.clone(),
        source,
    })?;
    Ok(decode(&bytes))
}

#[cfg(test)]
pub(crate) mod mock {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// Serves canned pages by URL and records every request.
    #[derive(Default)]
    pub struct MockFetcher {
        pages: HashMap<String, String>,
        pub calls: Mutex<Vec<String>>,
    }

    impl MockFetcher {
        pub fn with(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
            self.pages.insert(url.into(), body.into());
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn called(&self, url: &str) -> bool {
            self.calls.lock().unwrap().iter().any(|u| u == url)
        }
    }

    impl Fetch for MockFetcher {
        fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            self.calls.lock().unwrap().push(url.to_string());
            self.pages
                .get(url)
                .map(|b| b.clone().into_bytes())
                .ok_or_else(|| FetchError::new(url, "404 Not Found"))
        }
    }
}
