//! Retrieval of shared workbook links.
//!
//! Shared links open a preview page unless they ask for the raw file, so every
//! link is normalised with [`normalize_link`] before the request. Responses are
//! memoised per exact input link for the lifetime of the process.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::{debug, info, instrument};

use crate::lagrandt::equivalences::error::{Result, ToolError};

/// Query parameter that forces a direct download.
pub const DOWNLOAD_PARAM: &str = "download=1";
/// Fixed timeout applied to every request.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_REDIRECTS: usize = 10;

/// Appends `download=1` unless the link already carries it.
pub fn normalize_link(link: &str) -> String {
    if link.contains(DOWNLOAD_PARAM) {
        return link.to_string();
    }
    let separator = if link.contains('?') { '&' } else { '?' };
    format!("{link}{separator}{DOWNLOAD_PARAM}")
}

/// Something able to GET a URL and return the response body.
pub trait Transport {
    fn get(&self, url: &str) -> Result<Vec<u8>>;
}

/// Blocking HTTP transport that follows redirects.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(ToolError::HttpClient)?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        let fetch_error = |source| ToolError::Fetch {
            url: url.to_string(),
            source,
        };
        let response = self.client.get(url).send().map_err(fetch_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.bytes().map_err(fetch_error)?;
        Ok(body.to_vec())
    }
}

/// Link fetcher with a per-link cache.
pub struct Fetcher<T> {
    transport: T,
    cache: Mutex<HashMap<String, Arc<[u8]>>>,
}

impl<T: Transport> Fetcher<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the workbook bytes behind `link`, fetching at most once per
    /// distinct link.
    ///
    /// The cache lock is held while fetching, so concurrent callers asking for
    /// the same link wait for the first request instead of repeating it.
    #[instrument(level = "info", skip(self))]
    pub fn fetch(&self, link: &str) -> Result<Arc<[u8]>> {
        let mut cache = self.cache.lock();
        if let Some(bytes) = cache.get(link) {
            debug!(bytes = bytes.len(), "cache hit");
            return Ok(Arc::clone(bytes));
        }

        let url = normalize_link(link);
        let bytes: Arc<[u8]> = self.transport.get(&url)?.into();
        info!(bytes = bytes.len(), "workbook downloaded");
        cache.insert(link.to_string(), Arc::clone(&bytes));
        Ok(bytes)
    }
}

static SHARED: OnceCell<Fetcher<HttpTransport>> = OnceCell::new();

/// Fetches `link` through the process-wide HTTP fetcher.
pub fn fetch(link: &str) -> Result<Arc<[u8]>> {
    SHARED
        .get_or_try_init(|| HttpTransport::new().map(Fetcher::new))?
        .fetch(link)
}
