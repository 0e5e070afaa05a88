//! In-memory clip catalog.
//!
//! Clips are discovered by file name (`<collection>_<clip>.<ext>`), decoded
//! once into Opus frames and shared read-only by every playback. A reload
//! builds a fresh catalog and swaps it in whole.

pub mod dca;
pub mod resolver;

pub use resolver::{resolve, resolve_command, ResolveError, MAX_CHAIN};

use bytes::Bytes;
use regex::Regex;
use std::collections::HashMap;
use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Duration of a single Opus frame as produced by the DCA tooling.
pub const FRAME_DURATION: Duration = Duration::from_millis(20);

/// Catalog loading errors.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read audio directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read clip file {path}: {source}")]
    ReadClip {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid clip file extension: {0}")]
    InvalidExtension(String),
}

/// A single pre-encoded clip.
#[derive(Clone)]
pub struct Clip {
    collection: String,
    name: String,
    frames: Vec<Bytes>,
}

/// Shared handle to a clip.
pub type ClipRef = Arc<Clip>;

impl Clip {
    pub fn new(collection: impl Into<String>, name: impl Into<String>, frames: Vec<Bytes>) -> Self {
        Self {
            collection: collection.into(),
            name: name.into(),
            frames,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Encoded Opus frames, in playback order.
    pub fn frames(&self) -> &[Bytes] {
        &self.frames
    }

    /// Approximate playing time.
    pub fn duration(&self) -> Duration {
        FRAME_DURATION * self.frames.len() as u32
    }
}

impl fmt::Debug for Clip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clip")
            .field("collection", &self.collection)
            .field("name", &self.name)
            .field("frames", &self.frames.len())
            .finish()
    }
}

impl fmt::Display for Clip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.collection, self.name)
    }
}

/// A named group of clips selectable as one command token.
#[derive(Debug, Clone)]
pub struct Collection {
    name: String,
    clips: Vec<ClipRef>,
}

impl Collection {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Clips in display order.
    pub fn clips(&self) -> &[ClipRef] {
        &self.clips
    }

    /// Find a clip by name.
    pub fn find(&self, name: &str) -> Option<&ClipRef> {
        self.clips.iter().find(|clip| clip.name == name)
    }
}

/// Read-only lookup of every loaded collection.
#[derive(Debug, Clone, Default)]
pub struct ClipCatalog {
    collections: Vec<Collection>,
    index: HashMap<String, usize>,
}

impl ClipCatalog {
    /// Build a catalog from clips, grouping them by collection.
    ///
    /// Collections keep the order in which they are first seen; a clip whose
    /// name repeats within its collection replaces the earlier one.
    pub fn from_clips<I>(clips: I) -> Self
    where
        I: IntoIterator<Item = Clip>,
    {
        let mut catalog = Self::default();

        for clip in clips {
            let idx = match catalog.index.get(&clip.collection) {
                Some(&idx) => idx,
                None => {
                    catalog.collections.push(Collection {
                        name: clip.collection.clone(),
                        clips: Vec::new(),
                    });
                    let idx = catalog.collections.len() - 1;
                    catalog.index.insert(clip.collection.clone(), idx);
                    idx
                }
            };

            let collection = &mut catalog.collections[idx];
            match collection.clips.iter_mut().find(|c| c.name == clip.name) {
                Some(existing) => *existing = Arc::new(clip),
                None => collection.clips.push(Arc::new(clip)),
            }
        }

        catalog
    }

    /// Load every clip file in `dir` whose name matches
    /// `<collection>_<clip>.<extension>`.
    ///
    /// Any I/O failure aborts the whole load; a partially read catalog is
    /// never returned.
    pub fn load(dir: impl AsRef<Path>, extension: &str) -> Result<Self, CatalogError> {
        let dir = dir.as_ref();
        let pattern = clip_file_pattern(extension)?;

        info!(dir = %dir.display(), "Loading files and building collections");

        let entries = std::fs::read_dir(dir).map_err(|source| CatalogError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| CatalogError::ReadDir {
                path: dir.to_path_buf(),
                source,
            })?;
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();

        let mut clips = Vec::new();
        for file_name in names {
            let Some(caps) = pattern.captures(&file_name) else {
                debug!(file = %file_name, "Ignoring file");
                continue;
            };

            let path = dir.join(&file_name);
            let data = std::fs::read(&path).map_err(|source| CatalogError::ReadClip {
                path: path.clone(),
                source,
            })?;

            let frames = dca::decode_frames(Bytes::from(data));
            if frames.is_empty() {
                warn!(file = %file_name, "Clip file contains no frames");
            }

            clips.push(Clip::new(&caps[1], &caps[2], frames));
        }

        let catalog = Self::from_clips(clips);
        if catalog.is_empty() {
            warn!(dir = %dir.display(), "No clips found");
        }
        info!(
            collections = catalog.collections.len(),
            clips = catalog.clip_count(),
            "Clip catalog loaded"
        );

        Ok(catalog)
    }

    /// Look up a collection by name.
    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.index.get(name).map(|&idx| &self.collections[idx])
    }

    /// Collections in display order.
    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    pub fn clip_count(&self) -> usize {
        self.collections.iter().map(|c| c.clips.len()).sum()
    }

    /// Render the help listing: every collection as a markdown heading
    /// followed by its clip names, inside a code block.
    pub fn help_text(&self, prefix: &str) -> String {
        let mut out = String::from("```md\n");
        for collection in &self.collections {
            let command = format!("{}{}", prefix, collection.name);
            let _ = writeln!(out, "{}\n{}", command, "=".repeat(command.len()));
            for clip in &collection.clips {
                let _ = writeln!(out, "{}", clip.name);
            }
            out.push('\n');
        }
        out.push_str("```");
        out
    }
}

fn clip_file_pattern(extension: &str) -> Result<Regex, CatalogError> {
    let extension = extension.trim_start_matches('.');
    if extension.is_empty() {
        return Err(CatalogError::InvalidExtension(extension.to_string()));
    }
    Regex::new(&format!(r"^([a-z]+)_([a-z]+)\.{}$", regex::escape(extension)))
        .map_err(|_| CatalogError::InvalidExtension(extension.to_string()))
}
