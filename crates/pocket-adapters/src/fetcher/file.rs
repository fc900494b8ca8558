//! Serves sources from a local directory.

use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use pocket_core::application::error::{ApplicationError, ApplicationResult};
use pocket_core::application::ports::Fetcher;
use pocket_core::domain::{FetchRequest, FetchResponse};

/// Maps the path part of a source onto files under `root`.
///
/// Missing files answer 404, paths escaping the root answer 403. Any
/// method reads the file.
#[derive(Debug, Clone)]
pub struct FileFetcher {
    root: PathBuf,
}

impl FileFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File for `source`, or `None` when it would escape the root.
    fn locate(&self, source: &str) -> Option<PathBuf> {
        let path = match source.find("://") {
            Some(scheme_end) => {
                let after = &source[scheme_end + 3..];
                after.find('/').map_or("", |i| &after[i..])
            }
            None => source,
        };
        let path = path.split(['?', '#']).next().unwrap_or_default();

        let mut resolved = self.root.clone();
        for component in Path::new(path.trim_start_matches('/')).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(resolved)
    }
}

#[async_trait]
impl Fetcher for FileFetcher {
    async fn fetch(&self, request: &FetchRequest) -> ApplicationResult<FetchResponse> {
        let Some(path) = self.locate(&request.url) else {
            return Ok(FetchResponse::new(403, ""));
        };
        debug!(path = %path.display(), "serving local source");
        match std::fs::read_to_string(&path) {
            Ok(body) => Ok(FetchResponse::ok(body)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(FetchResponse::new(404, "")),
            Err(e) if path.is_dir() => {
                debug!(error = %e, "source is a directory");
                Ok(FetchResponse::new(404, ""))
            }
            Err(e) => Err(ApplicationError::Transport {
                url: request.url.clone(),
                reason: e.to_string(),
            }),
        }
    }
}
