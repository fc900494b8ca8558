//! Directory-based template preloading.
//!
//! Every `*.html` file under the directory becomes a template named after
//! its path relative to the root, without the extension, with `/` turned
//! into `-`:
//!
//! ```text
//! templates/
//! ├── HEADER.html        → HEADER
//! └── users/
//!     └── ROW.html       → users-ROW
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

const TEMPLATE_EXTENSION: &str = "html";

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("Templates directory not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read templates under {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },
}

impl LoaderError {
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::NotFound(path) => vec![
                format!("Create the directory: mkdir -p {}", path.display()),
                "Or point --templates at an existing directory".into(),
            ],
            Self::Unreadable { .. } => vec!["Check the directory permissions".into()],
        }
    }
}

#[derive(Debug, Clone)]
pub struct TemplateLoader {
    root: PathBuf,
}

impl TemplateLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `(name, html)` pairs sorted by name.
    ///
    /// Unreadable files are skipped with a warning; one bad file does not
    /// block the rest.
    #[instrument(skip(self), fields(dir = %self.root.display()))]
    pub fn load_all(&self) -> Result<Vec<(String, String)>, LoaderError> {
        if !self.root.is_dir() {
            return Err(LoaderError::NotFound(self.root.clone()));
        }

        let mut templates = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(true) {
            let entry = entry.map_err(|e| LoaderError::Unreadable {
                path: self.root.clone(),
                reason: e.to_string(),
            })?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(TEMPLATE_EXTENSION)
            {
                continue;
            }
            let Some(name) = self.template_name(path) else {
                continue;
            };
            match fs::read_to_string(path) {
                Ok(html) => {
                    debug!(template = %name, "loaded template file");
                    templates.push((name, html));
                }
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable template"),
            }
        }

        templates.sort_by(|a, b| a.0.cmp(&b.0));
        debug!(count = templates.len(), "finished loading templates");
        Ok(templates)
    }

    fn template_name(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?.with_extension("");
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        (!parts.is_empty()).then(|| parts.join("-"))
    }
}
