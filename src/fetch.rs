// 🌐 Source Fetcher - raw HTML for the extractor
//
// DocumentSource is the seam: HttpSource for real runs, FileSource for
// offline snapshots and tests.

use crate::error::{EtlError, EtlResult};
use reqwest::blocking::Client;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

pub trait DocumentSource {
    /// Return the HTML body for `url`
    fn fetch(&self, url: &str) -> EtlResult<String>;

    /// Short label for logs
    fn describe(&self) -> String;
}

/// One blocking GET per fetch; no retries.
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new() -> EtlResult<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|source| EtlError::Fetch {
                url: String::new(),
                source,
            })?;

        Ok(HttpSource { client })
    }
}

impl DocumentSource for HttpSource {
    fn fetch(&self, url: &str) -> EtlResult<String> {
        let to_fetch_error = |source| EtlError::Fetch {
            url: url.to_string(),
            source,
        };

        info!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(to_fetch_error)?;

        debug!("{} responded {}", url, response.status());
        response.text().map_err(to_fetch_error)
    }

    fn describe(&self) -> String {
        "http".to_string()
    }
}

/// Reads a saved copy of the page; the url is ignored.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        FileSource {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl DocumentSource for FileSource {
    fn fetch(&self, url: &str) -> EtlResult<String> {
        debug!("Serving {} from snapshot {:?}", url, self.path);
        fs::read_to_string(&self.path).map_err(|source| EtlError::Snapshot {
            path: self.path.clone(),
            source,
        })
    }

    fn describe(&self) -> String {
        format!("file {:?}", self.path)
    }
}
