// ============================================================================
// REMOTE IMAGES - dropped-URL resolution and background fetch
// ============================================================================

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use tracing::{debug, warn};
use url::Url;

use crate::canvas::PixelBuffer;
use crate::error::{EditorError, Result};
use crate::io;

/// Query parameter that image-search result pages use for the real image.
const IMAGE_URL_PARAM: &str = "imgurl";

/// What a drag-and-drop URL points at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropTarget {
    LocalFile(PathBuf),
    Remote(Url),
}

/// Turn a dropped URL into the direct image location.
///
/// Search-result links carry the actual image in an `imgurl` query
/// parameter; anything else is taken as-is.
pub fn resolve_drop_url(raw: &str) -> Result<DropTarget> {
    let url = Url::parse(raw.trim()).map_err(|e| EditorError::InvalidUrl(format!("{raw}: {e}")))?;

    if url.scheme() == "file" {
        let path = url
            .to_file_path()
            .map_err(|_| EditorError::InvalidUrl(raw.to_string()))?;
        return Ok(DropTarget::LocalFile(path));
    }

    if let Some((_, inner)) = url.query_pairs().find(|(k, _)| k == IMAGE_URL_PARAM) {
        let direct = Url::parse(&inner).map_err(|e| EditorError::InvalidUrl(format!("{inner}: {e}")))?;
        debug!(from = %url, to = %direct, "unwrapped image-search link");
        return Ok(DropTarget::Remote(direct));
    }

    Ok(DropTarget::Remote(url))
}

/// Transport for remote images. Returns the encoded bytes at `url`.
pub trait ImageFetcher: Send + 'static {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>>;
}

impl<F> ImageFetcher for F
where
    F: Fn(&Url) -> Result<Vec<u8>> + Send + 'static,
{
    fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        self(url)
    }
}

/// Result of one background fetch.
#[derive(Debug)]
pub enum FetchOutcome {
    Loaded(PixelBuffer),
    Failed(String),
}

/// A single fetch-and-decode running on its own thread.
///
/// Delivers exactly one [`FetchOutcome`]; after that `poll` returns `None`.
pub struct FetchWorker {
    url: Url,
    receiver: Receiver<FetchOutcome>,
    finished: bool,
}

impl FetchWorker {
    pub fn spawn<F: ImageFetcher>(fetcher: F, url: Url) -> Self {
        let (tx, rx) = mpsc::channel();
        let task_url = url.clone();
        thread::spawn(move || {
            let outcome = match fetcher.fetch(&task_url).and_then(|bytes| io::decode_image_bytes(&bytes)) {
                Ok(image) => FetchOutcome::Loaded(image),
                Err(e) => FetchOutcome::Failed(e.to_string()),
            };
            let _ = tx.send(outcome);
        });
        debug!(%url, "fetch started");
        Self {
            url,
            receiver: rx,
            finished: false,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Non-blocking check for the outcome.
    pub fn poll(&mut self) -> Option<FetchOutcome> {
        if self.finished {
            return None;
        }
        match self.receiver.try_recv() {
            Ok(outcome) => self.finish(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => self.finish(FetchOutcome::Failed("fetch worker exited".to_string())),
        }
    }

    /// Block until the outcome arrives.
    pub fn wait(&mut self) -> Option<FetchOutcome> {
        if self.finished {
            return None;
        }
        let outcome = self
            .receiver
            .recv()
            .unwrap_or_else(|_| FetchOutcome::Failed("fetch worker exited".to_string()));
        self.finish(outcome)
    }

    fn finish(&mut self, outcome: FetchOutcome) -> Option<FetchOutcome> {
        self.finished = true;
        if let FetchOutcome::Failed(msg) = &outcome {
            warn!(url = %self.url, error = %msg, "remote image fetch failed");
        }
        Some(outcome)
    }
}
