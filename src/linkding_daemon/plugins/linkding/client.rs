use std::time::Duration;

use reqwest::{
    blocking::{Client, RequestBuilder, Response},
    header::AUTHORIZATION,
    StatusCode,
};
use thiserror::Error;
use tracing::{debug, warn};

use super::bookmark::{Bookmark, Page};

pub const PAGE_LIMIT: usize = 250;
pub const USER_AGENT: &str = concat!("linkding-launcher/", env!("CARGO_PKG_VERSION"));
const READ_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub instance_url: String,
    pub api_key: String,
}

#[derive(Debug, Error)]
pub enum LinkdingError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        source: reqwest::Error,
    },
    #[error("got response {status} from {url}")]
    Status { url: String, status: StatusCode },
    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        source: reqwest::Error,
    },
}

/// Blocking client for the linkding REST API.
#[derive(Debug)]
pub struct LinkdingClient {
    http: Client,
    settings: Settings,
}

impl LinkdingClient {
    pub fn new(settings: Settings) -> Self {
        // Only list reads get a timeout, see `get_page`.
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(None)
            .build()
            .unwrap_or_else(|err| {
                warn!("Falling back to the default HTTP client: {err}");
                Client::new()
            });
        Self { http, settings }
    }

    fn api_url(&self, path: &str) -> String {
        format!(
            "{}/api/bookmarks/{path}",
            self.settings.instance_url.trim_end_matches('/')
        )
    }

    /// Follows `next` until it is null. A failing page ends the walk with a
    /// warning and whatever was read so far is returned.
    pub fn fetch_bookmarks(&self) -> Vec<Bookmark> {
        let mut bookmarks = Vec::new();
        let mut next = Some(self.api_url(&format!("?limit={PAGE_LIMIT}")));

        while let Some(url) = next.take() {
            match self.get_page(&url) {
                Ok(page) => {
                    debug!("Got {} bookmarks from {url}", page.results.len());
                    bookmarks.extend(page.results);
                    next = page.next;
                }
                Err(err) => warn!("{err}"),
            }
        }

        bookmarks
    }

    fn get_page(&self, url: &str) -> Result<Page, LinkdingError> {
        let response = self.send(self.http.get(url).timeout(READ_TIMEOUT), url)?;
        response.json().map_err(|source| LinkdingError::Decode {
            url: url.into(),
            source,
        })
    }

    pub fn archive(&self, id: u64) -> Result<(), LinkdingError> {
        let url = self.api_url(&format!("{id}/archive/"));
        debug!("About to POST {url}");
        self.send(self.http.post(&url), &url)?;
        Ok(())
    }

    pub fn delete(&self, id: u64) -> Result<(), LinkdingError> {
        let url = self.api_url(&id.to_string());
        debug!("About to DELETE {url}");
        self.send(self.http.delete(&url), &url)?;
        Ok(())
    }

    fn send(&self, request: RequestBuilder, url: &str) -> Result<Response, LinkdingError> {
        let response = request
            .header(AUTHORIZATION, format!("Token {}", self.settings.api_key))
            .send()
            .map_err(|source| LinkdingError::Request {
                url: url.into(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LinkdingError::Status {
                url: url.into(),
                status,
            });
        }
        Ok(response)
    }
}
