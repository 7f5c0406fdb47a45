/*!
 * Container export and page merge.
 *
 * An exported page holds several top-level `[fusion_builder_container]`
 * blocks. Export cuts each page into numbered `container_N.txt` files so
 * every block is parsed and translated on its own; merge joins the applied
 * containers of a page back into a single file.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

static CONTAINER_NUMBER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"container_(\d+)\.[a-z]+$").expect("Invalid container number regex"));

/// One line of `containers/index.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Source page, relative to the source folder
    pub source: String,
    /// Page folder under `containers/`
    pub output: String,
    /// Number of containers written
    pub containers: usize,
}

/// Splits pages into containers
#[derive(Debug, Clone)]
pub struct ContainerSplitter {
    pattern: Regex,
}

impl ContainerSplitter {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    /// Every container of `page`, in order. Text outside containers is dropped.
    pub fn split<'a>(&self, page: &'a str) -> Vec<&'a str> {
        self.pattern.find_iter(page).map(|m| m.as_str()).collect()
    }
}

/// File name of the `number`-th container (1-based)
pub fn container_file_name(number: usize, extension: &str) -> String {
    format!("container_{}.{}", number, extension)
}

/// Number in a `container_N.ext` file name; unnumbered files sort last
pub fn container_number(path: &Path) -> usize {
    path.file_name()
        .and_then(|name| CONTAINER_NUMBER_REGEX.captures(&name.to_string_lossy()).map(|c| c[1].to_string()))
        .and_then(|n| n.parse().ok())
        .unwrap_or(usize::MAX)
}

/// Join container texts into a page: blank line between, trimmed, newline at the end
pub fn merge_containers<S: AsRef<str>>(parts: &[S]) -> String {
    let joined = parts.iter().map(|p| p.as_ref()).collect::<Vec<_>>().join("\n\n");
    format!("{}\n", joined.trim())
}
