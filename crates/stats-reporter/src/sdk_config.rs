//! Backend SDK configuration file discovery.
//!
//! The backend SDK reads its own configuration file. This module only finds
//! it. Candidates, in order:
//!
//! 1. `<base>/config/<file>`
//! 2. `<base>/<file>`
//! 3. the same two under `<home_location>/<home_name>`, when both are set,
//!    non-empty, and that directory exists
//!
//! where `<base>` is the working directory. The first existing candidate
//! wins and is returned as an absolute path.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// SDK configuration file name looked for during discovery.
pub const DEFAULT_SDK_CONFIG_FILE: &str = "stats-sdk.properties";

/// Inputs to discovery.
#[derive(Debug, Clone)]
pub struct SdkConfigSearch {
    pub base_dir: PathBuf,
    pub file_name: String,
    pub home_location: Option<PathBuf>,
    pub home_name: Option<String>,
}

impl SdkConfigSearch {
    /// Search relative to the current working directory for the default
    /// file name.
    ///
    /// # Errors
    ///
    /// Returns an error if the working directory cannot be determined.
    pub fn from_current_dir(
        home_location: Option<PathBuf>,
        home_name: Option<String>,
    ) -> std::io::Result<Self> {
        Ok(Self {
            base_dir: std::env::current_dir()?,
            file_name: DEFAULT_SDK_CONFIG_FILE.to_string(),
            home_location,
            home_name,
        })
    }

    /// Candidate paths in search order.
    #[must_use]
    pub fn candidates(&self) -> Vec<PathBuf> {
        let mut candidates = relative_candidates(&self.base_dir, &self.file_name);

        let location = self
            .home_location
            .as_ref()
            .filter(|location| !location.as_os_str().is_empty());
        let name = self.home_name.as_deref().filter(|name| !name.is_empty());
        if let (Some(location), Some(name)) = (location, name) {
            let home = location.join(name);
            if home.is_dir() {
                candidates.extend(relative_candidates(&home, &self.file_name));
            }
        }

        candidates
    }

    /// First existing candidate, made absolute.
    #[must_use]
    pub fn discover(&self) -> Option<PathBuf> {
        let found = self
            .candidates()
            .into_iter()
            .find(|candidate| {
                let exists = candidate.is_file();
                debug!(target: "sr.config", path = %candidate.display(), exists, "SDK config candidate");
                exists
            })
            .map(|path| std::path::absolute(&path).unwrap_or(path));

        match &found {
            Some(path) => info!(target: "sr.config", path = %path.display(), "Found SDK config file"),
            None => info!(target: "sr.config", file = %self.file_name, "No SDK config file found"),
        }

        found
    }
}

fn relative_candidates(dir: &Path, file_name: &str) -> Vec<PathBuf> {
    vec![dir.join("config").join(file_name), dir.join(file_name)]
}

/// Resolve the SDK config file: an explicit path wins over discovery.
#[must_use]
pub fn resolve_sdk_config(explicit: Option<&Path>, search: &SdkConfigSearch) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())),
        None => search.discover(),
    }
}
