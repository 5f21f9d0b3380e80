use std::path::PathBuf;

use async_trait::async_trait;
use log::debug;

use crate::core::{error::FetchFailure, traits::Fetch};

/// Fetches scripts by reading them from a local directory.
///
/// Query strings are ignored. Absolute and protocol-relative URLs fail.
#[derive(Debug, Clone)]
pub struct FsFetcher {
    root: PathBuf,
}

impl FsFetcher {
    /// Create a fetcher reading below `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn local_path(&self, url: &str) -> Option<PathBuf> {
        if url.contains("://") || url.starts_with("//") {
            return None;
        }
        let path = url.split('?').next().unwrap_or_default();
        Some(self.root.join(path.trim_start_matches('/')))
    }
}

#[async_trait]
impl Fetch for FsFetcher {
    async fn fetch(&self, url: &str) -> Result<(), FetchFailure> {
        let path = self
            .local_path(url)
            .ok_or_else(|| FetchFailure::new(url, "remote URLs are not supported"))?;

        let script = tokio::fs::read(&path)
            .await
            .map_err(|e| FetchFailure::new(url, format!("{}: {e}", path.display())))?;
        debug!("Read {} bytes from {}", script.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_path() {
        let fetcher = FsFetcher::new("/srv/www");
        let test_cases = [
            ("js/a.js", Some("/srv/www/js/a.js")),
            ("./js/a.js?v=2", Some("/srv/www/./js/a.js")),
            ("/js/a.js", Some("/srv/www/js/a.js")),
            ("https://cdn.example.com/a.js", None),
            ("//cdn.example.com/a.js", None),
        ];

        for (input, expected) in test_cases {
            assert_eq!(
                fetcher.local_path(input),
                expected.map(PathBuf::from),
                "input {input:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_fetch_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("js")).unwrap();
        std::fs::write(dir.path().join("js/load1.js"), "var load1 = true;").unwrap();

        let fetcher = FsFetcher::new(dir.path());
        assert!(fetcher.fetch("js/load1.js?v=1").await.is_ok());

        let err = fetcher.fetch("js/error.js").await.unwrap_err();
        assert_eq!(err.url, "js/error.js");
        assert!(fetcher.fetch("https://example.com/a.js").await.is_err());
    }
}
