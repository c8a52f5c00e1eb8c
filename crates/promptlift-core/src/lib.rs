//! Core of promptlift: prompt types, the character diff renderer, and the
//! improve → share → publish workflow.

mod cleanup;
pub mod diff;
pub mod markup;
pub mod model;
pub mod view;
pub mod workflow;

pub use diff::{Aligner, DiffSegment, DiffStats, SegmentKind, SimilarAligner, render, render_with};
pub use model::{PromptRecord, TextPair};
pub use view::{GalleryEntry, Route, SharedView, gallery_entries};
pub use workflow::{
    Action, ImproveRequest, NOTICE_TTL, Notice, PublishRequest, ShareLink, ShareRequest, Stage,
    Workflow, WorkflowError,
};
