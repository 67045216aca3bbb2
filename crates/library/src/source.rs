use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use std::collections::HashSet;
use std::path::Path;

/// Where the names of still-downloading objects come from.
///
/// A staged object whose name is in the returned set is never touched.
#[async_trait]
pub trait ActiveDownloads: Send + Sync {
    /// Short name for logging.
    fn name(&self) -> &str;

    /// Fetches the current set of active names.
    ///
    /// # Errors
    /// Any failure is fatal for the run: disposing of objects without knowing
    /// which are still being written is unsafe.
    async fn fetch(&self) -> Result<HashSet<String>>;
}

/// A fixed set of active names, given on the command line or read from a file.
#[derive(Clone, Debug, Default)]
pub struct StaticSource {
    names: HashSet<String>,
}
impl StaticSource {
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        let names = names.into_iter().map(Into::into).filter(|n: &String| !n.trim().is_empty()).collect();
        Self { names }
    }

    /// Reads one name per line. Blank lines and lines starting with `#` are
    /// ignored; surrounding whitespace is kept out of the names.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path.as_ref()).await.or_raise(|| ErrorKind::Fetch)?;
        let names = contents.lines().map(str::trim).filter(|line| !line.is_empty() && !line.starts_with('#'));
        Ok(Self::new(names))
    }

    pub fn extend<S: Into<String>>(&mut self, names: impl IntoIterator<Item = S>) {
        self.names.extend(Self::new(names).names);
    }
}

#[async_trait]
impl ActiveDownloads for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch(&self) -> Result<HashSet<String>> {
        Ok(self.names.clone())
    }
}
