//! Lookup of rendered pages.
//!
//! The site builder writes the page for slug `s` either as `s.html` or as
//! `s/index.html` under the pages directory; the site root is `index.html`.

use std::{
    fs,
    path::{Component, Path, PathBuf},
};

use tracing::trace;

use crate::error::DocumentError;

/// Finds the rendered HTML of a document under the pages directory.
#[derive(Debug, Clone)]
pub struct ArtifactLocator {
    pages_dir: PathBuf,
}

impl ArtifactLocator {
    /// Create a locator rooted at `pages_dir`.
    #[must_use]
    pub fn new(pages_dir: impl Into<PathBuf>) -> Self {
        Self {
            pages_dir: pages_dir.into(),
        }
    }

    /// The pages directory.
    pub fn pages_dir(&self) -> &Path {
        &self.pages_dir
    }

    /// Paths tried for `slug`, in lookup order.
    ///
    /// Slugs that would escape the pages directory have no candidates.
    pub fn candidates(&self, slug: &str) -> Vec<PathBuf> {
        let slug = slug.trim_end_matches('/');
        if slug.starts_with('/') || escapes_root(Path::new(slug)) {
            return Vec::new();
        }

        if slug.is_empty() || slug == "index" {
            return vec![self.pages_dir.join("index.html")];
        }

        vec![
            self.pages_dir.join(format!("{slug}.html")),
            self.pages_dir.join(slug).join("index.html"),
        ]
    }

    /// The first existing candidate for `slug`.
    pub fn locate(&self, slug: &str) -> Result<PathBuf, DocumentError> {
        let tried = self.candidates(slug);
        match tried.iter().find(|path| path.is_file()) {
            Some(path) => {
                trace!(slug, path = %path.display(), "found page artifact");
                Ok(path.clone())
            }
            None => Err(DocumentError::MissingArtifact {
                slug: slug.to_string(),
                tried,
            }),
        }
    }

    /// Locate and read the rendered HTML of `slug`.
    pub fn read(&self, slug: &str) -> Result<String, DocumentError> {
        let path = self.locate(slug)?;
        fs::read_to_string(&path).map_err(|source| DocumentError::Io { path, source })
    }
}

fn escapes_root(path: &Path) -> bool {
    path.components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn site() -> (TempDir, ArtifactLocator) {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("guides/install")).unwrap();
        fs::write(dir.path().join("index.html"), "<p>home</p>").unwrap();
        fs::write(dir.path().join("faq.html"), "<p>faq</p>").unwrap();
        fs::write(dir.path().join("guides/install/index.html"), "<p>install</p>").unwrap();
        let locator = ArtifactLocator::new(dir.path());
        (dir, locator)
    }

    #[test]
    fn test_lookup_order() {
        let locator = ArtifactLocator::new("out");
        assert_eq!(
            locator.candidates("guides/install"),
            vec![
                PathBuf::from("out/guides/install.html"),
                PathBuf::from("out/guides/install/index.html"),
            ]
        );
    }

    #[test]
    fn test_root_slugs() {
        let locator = ArtifactLocator::new("out");
        assert_eq!(locator.candidates(""), vec![PathBuf::from("out/index.html")]);
        assert_eq!(locator.candidates("index"), vec![PathBuf::from("out/index.html")]);
    }

    #[test]
    fn test_escaping_slugs_rejected() {
        let locator = ArtifactLocator::new("out");
        assert!(locator.candidates("../secrets").is_empty());
        assert!(locator.candidates("guides/../../etc/passwd").is_empty());
        assert!(locator.candidates("/etc/passwd").is_empty());
        assert!(matches!(
            locator.locate("../secrets"),
            Err(DocumentError::MissingArtifact { tried, .. }) if tried.is_empty()
        ));
    }

    #[test]
    fn test_locate_and_read() {
        let (_dir, locator) = site();
        assert_eq!(locator.read("faq").unwrap(), "<p>faq</p>");
        assert_eq!(locator.read("guides/install").unwrap(), "<p>install</p>");
        assert_eq!(locator.read("").unwrap(), "<p>home</p>");
    }

    #[test]
    fn test_flat_file_wins() {
        let (dir, locator) = site();
        fs::write(dir.path().join("guides/install.html"), "<p>flat</p>").unwrap();
        assert_eq!(locator.read("guides/install").unwrap(), "<p>flat</p>");
    }

    #[test]
    fn test_missing() {
        let (_dir, locator) = site();
        let err = locator.locate("missing").unwrap_err();
        assert!(matches!(
            err,
            DocumentError::MissingArtifact { ref slug, ref tried } if slug == "missing" && tried.len() == 2
        ));
    }
}
