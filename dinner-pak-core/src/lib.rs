//! Read-only, memory-mapped asset containers for a visual-novel engine.
//!
//! Two container kinds share one layout: [`resource::ResourcePack`] holds
//! named binary resources, [`story::StoryPack`] holds a story's media,
//! dialogue and action log.

pub mod data;
pub mod error;
pub mod layout;
pub mod mapped;
pub mod resource;
pub mod story;
pub mod write;

pub use error::{PakError, Result};
pub use resource::{ResourcePack, ResourcePackBuilder};
pub use story::{StoryPack, StoryPackBuilder};
