//! Where location and photo payloads come from
//!
//! [`LocationDataSource`] only has to provide `fetch_text`; parsing into
//! records and photos is shared. Futures are not `Send`: sources are driven on
//! the single-threaded local executor, next to the view that owns them.

use crate::{
    data::location::{LocationBatch, Photo, PhotoBatch},
    prelude::HashMap,
    MapError, Result,
};
use async_trait::async_trait;
use futures::channel::oneshot;
use std::cell::RefCell;

#[async_trait(?Send)]
pub trait LocationDataSource {
    /// GET `url` and return the response body
    async fn fetch_text(&self, url: &str) -> Result<String>;

    async fn fetch_locations(&self, url: &str) -> Result<LocationBatch> {
        let body = self.fetch_text(url).await?;
        LocationBatch::parse(&body)
    }

    async fn fetch_photos(&self, url: &str) -> Result<Vec<Photo>> {
        let body = self.fetch_text(url).await?;
        Ok(PhotoBatch::parse(&body)?.photos)
    }
}

/// Data source talking HTTP through `reqwest`
///
/// Relative URLs are resolved against the base URL, as a browser resolves them
/// against the page.
pub struct HttpDataSource {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl HttpDataSource {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            base_url: None,
        })
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let mut source = Self::new()?;
        source.base_url = Some(base_url.trim_end_matches('/').to_string());
        Ok(source)
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Absolute URL for `url`
    pub fn resolve(&self, url: &str) -> Result<String> {
        if url.starts_with("http://") || url.starts_with("https://") {
            return Ok(url.to_string());
        }
        match &self.base_url {
            Some(base) => Ok(format!("{}/{}", base, url.trim_start_matches('/'))),
            None => Err(MapError::Config(format!(
                "relative url '{}' without a base url",
                url
            ))),
        }
    }
}

#[async_trait(?Send)]
impl LocationDataSource for HttpDataSource {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let url = self.resolve(url)?;
        log::debug!("GET {}", url);
        let response = self.client.get(&url).send().await?.error_for_status()?;
        let body = response.text().await?;
        log::debug!("{} bytes from {}", body.len(), url);
        Ok(body)
    }
}

#[derive(Debug, Clone)]
enum StaticResponse {
    Body(String),
    Failure(String),
}

/// Releases a request held back by [`StaticDataSource::hold`]
pub struct Gate(oneshot::Sender<()>);

impl Gate {
    pub fn open(self) {
        let _ = self.0.send(());
    }
}

/// Fixed responses keyed by URL, for tests and offline demos
///
/// Unknown URLs fail with a network error, like a 404 would.
#[derive(Default)]
pub struct StaticDataSource {
    responses: RefCell<HashMap<String, StaticResponse>>,
    gates: RefCell<HashMap<String, oneshot::Receiver<()>>>,
    requests: RefCell<Vec<String>>,
}

impl StaticDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, url: &str, body: impl Into<String>) -> Self {
        self.set_response(url, body);
        self
    }

    pub fn with_failure(self, url: &str, message: &str) -> Self {
        self.responses
            .borrow_mut()
            .insert(url.to_string(), StaticResponse::Failure(message.to_string()));
        self
    }

    pub fn set_response(&self, url: &str, body: impl Into<String>) {
        self.responses
            .borrow_mut()
            .insert(url.to_string(), StaticResponse::Body(body.into()));
    }

    /// Make the next request for `url` wait until the returned gate is opened
    pub fn hold(&self, url: &str) -> Gate {
        let (sender, receiver) = oneshot::channel();
        self.gates.borrow_mut().insert(url.to_string(), receiver);
        Gate(sender)
    }

    /// URLs requested so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

#[async_trait(?Send)]
impl LocationDataSource for StaticDataSource {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        self.requests.borrow_mut().push(url.to_string());

        let gate = self.gates.borrow_mut().remove(url);
        if let Some(gate) = gate {
            // A dropped gate releases the request as well
            let _ = gate.await;
        }

        let response = self.responses.borrow().get(url).cloned();
        match response {
            Some(StaticResponse::Body(body)) => Ok(body),
            Some(StaticResponse::Failure(message)) => Err(MapError::Network(message)),
            None => Err(MapError::Network(format!("no response for {}", url))),
        }
    }
}
