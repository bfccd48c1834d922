//! The download unit: everything collected in one run, in acceptance order.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::filename::{encode_extension, encode_file_name, post_dir_name};

const FALLBACK_FILE_EXTENSION: &str = "bin";
const FALLBACK_COVER_EXTENSION: &str = "jpeg";

/// Serialization used for each post's information file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataFormat {
    #[default]
    Json,
    KeyValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    pub url: String,
    /// Display name before encoding.
    pub name: String,
    pub extension: String,
    /// Name of the entry inside the post's directory.
    pub encoded_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Information {
    pub format: MetadataFormat,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostEntry {
    pub id: String,
    pub title: String,
    pub encoded_name: String,
    pub tags: Vec<String>,
    pub html: String,
    pub transcript: String,
    pub information: Information,
    pub cover: Option<FileDescriptor>,
    pub files: Vec<FileDescriptor>,
}

impl PostEntry {
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            encoded_name: post_dir_name(title, id),
            tags: Vec::new(),
            html: String::new(),
            transcript: String::new(),
            information: Information::default(),
            cover: None,
            files: Vec::new(),
        }
    }

    /// Registers a content file and returns its descriptor.
    ///
    /// Files are numbered from 1 so several files sharing a display name stay
    /// distinct inside the post directory.
    pub fn add_file(&mut self, name: &str, extension: &str, url: &str) -> FileDescriptor {
        let index = self.files.len() + 1;
        let extension = encode_extension(extension, FALLBACK_FILE_EXTENSION);
        let file = FileDescriptor {
            url: url.to_string(),
            name: name.to_string(),
            extension: extension.clone(),
            encoded_name: format!("{index}_{}.{}", encode_file_name(name), extension),
        };
        self.files.push(file.clone());
        file
    }

    pub fn set_cover(&mut self, extension: &str, url: &str) -> FileDescriptor {
        let extension = encode_extension(extension, FALLBACK_COVER_EXTENSION);
        let cover = FileDescriptor {
            url: url.to_string(),
            name: "cover".to_string(),
            extension: extension.clone(),
            encoded_name: format!("cover.{extension}"),
        };
        self.cover = Some(cover.clone());
        cover
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UnitError {
    #[error("download unit has no creator id")]
    MissingId,
    #[error("postCount {declared} does not match {actual} posts")]
    PostCountMismatch { declared: usize, actual: usize },
    #[error("fileCount {declared} does not match {actual} files")]
    FileCountMismatch { declared: usize, actual: usize },
}

/// Aggregate root of one collection run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadUnit {
    pub id: String,
    pub url: String,
    pub posts: Vec<PostEntry>,
    #[serde(default)]
    pub fees: IndexSet<u32>,
    #[serde(default)]
    pub discovered_tags: IndexSet<String>,
    /// Final tag list, filled in by `Aggregator::apply_tags`.
    #[serde(default)]
    pub tags: Vec<String>,
    pub post_count: usize,
    pub file_count: usize,
}

impl DownloadUnit {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            url: String::new(),
            posts: Vec::new(),
            fees: IndexSet::new(),
            discovered_tags: IndexSet::new(),
            tags: Vec::new(),
            post_count: 0,
            file_count: 0,
        }
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    pub(crate) fn push_post(&mut self, entry: PostEntry) {
        self.file_count += entry.files.len();
        self.post_count += 1;
        self.posts.push(entry);
    }

    /// Checks the counters against the actual contents, e.g. after receiving
    /// the unit as a serialized payload.
    pub fn validate(&self) -> Result<(), UnitError> {
        if self.id.trim().is_empty() {
            return Err(UnitError::MissingId);
        }
        if self.post_count != self.posts.len() {
            return Err(UnitError::PostCountMismatch {
                declared: self.post_count,
                actual: self.posts.len(),
            });
        }
        let files: usize = self.posts.iter().map(|post| post.files.len()).sum();
        if self.file_count != files {
            return Err(UnitError::FileCountMismatch {
                declared: self.file_count,
                actual: files,
            });
        }
        Ok(())
    }
}
