//! Screen-level view models: routes, the shared-prompt viewer, the gallery.

use std::fmt;

use serde::Serialize;

use crate::diff::{self, DiffSegment};
use crate::model::PromptRecord;

/// Navigable locations of the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Editor.
    Home,
    /// Viewer for one shared record.
    Prompt(String),
    Gallery,
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Prompt(id) => format!("/prompt/{id}"),
            Route::Gallery => "/gallery".to_string(),
        }
    }

    /// Absolute URL under `origin` (trailing slashes on `origin` are ignored).
    pub fn url(&self, origin: &str) -> String {
        format!("{}{}", origin.trim_end_matches('/'), self.path())
    }

    /// Parse a path (or a full URL's path part). Unknown paths yield `None`.
    pub fn parse(path: &str) -> Option<Self> {
        let path = match path.find("://") {
            Some(scheme_end) => {
                let rest = &path[scheme_end + 3..];
                rest.find('/').map_or("/", |i| &rest[i..])
            }
            None => path,
        };
        let path = path.split(['?', '#']).next().unwrap_or("");
        let trimmed = path.trim_end_matches('/');

        match trimmed {
            "" => Some(Route::Home),
            "/gallery" => Some(Route::Gallery),
            _ => {
                let id = trimmed.strip_prefix("/prompt/")?;
                if id.is_empty() || id.contains('/') {
                    None
                } else {
                    Some(Route::Prompt(id.to_string()))
                }
            }
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// What the shared-prompt viewer shows for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SharedView {
    pub id: String,
    pub original_prompt: String,
    pub improved_prompt: String,
    pub segments: Vec<DiffSegment>,
}

impl SharedView {
    pub fn from_record(record: PromptRecord) -> Self {
        let segments = diff::render(&record.original_prompt, &record.improved_prompt);
        Self {
            id: record.id,
            original_prompt: record.original_prompt,
            improved_prompt: record.improved_prompt,
            segments,
        }
    }
}

/// One card in the gallery listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GalleryEntry {
    pub id: String,
    pub original_prompt: String,
    /// Absolute link into the shared-prompt viewer.
    pub link: String,
}

/// One entry per record, in backend order.
pub fn gallery_entries(records: &[PromptRecord], origin: &str) -> Vec<GalleryEntry> {
    records
        .iter()
        .map(|r| GalleryEntry {
            id: r.id.clone(),
            original_prompt: r.original_prompt.clone(),
            link: Route::Prompt(r.id.clone()).url(origin),
        })
        .collect()
}
