use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FileError, Result};
use crate::resource::{self, Source};

/// One unpacked script step, as written by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptAction {
    /// A missing or empty `character` is narration.
    Text {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        character: Option<String>,
        text: String,
    },
    Image {
        index: u32,
    },
    Music {
        index: u32,
    },
}

/// A story before packing.
///
/// ```json
/// {
///   "images": [ { "name": "room", "path": "img/room.png" } ],
///   "music": [],
///   "actions": [
///     { "type": "image", "index": 0 },
///     { "type": "text", "character": "Cat", "text": "Where am I?" },
///     { "type": "text", "text": "Nobody answers." }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryScript {
    #[serde(default)]
    pub images: Vec<Source>,
    #[serde(default)]
    pub music: Vec<Source>,
    pub actions: Vec<ScriptAction>,
}

/// Media file contents, in script order.
#[derive(Debug, Clone, Default)]
pub struct StoryMedia {
    pub images: Vec<Vec<u8>>,
    pub music: Vec<Vec<u8>>,
}

impl StoryScript {
    /// Load a JSON script. Relative media paths resolve against the script's directory.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| FileError::io(path, e))?;
        let mut script: Self = serde_json::from_str(&text)?;

        let base = path.parent().unwrap_or(Path::new(""));
        resource::resolve_relative(&mut script.images, base);
        resource::resolve_relative(&mut script.music, base);
        Ok(script)
    }

    pub fn load_media(&self) -> Result<StoryMedia> {
        Ok(StoryMedia {
            images: resource::read_sources(&self.images)?,
            music: resource::read_sources(&self.music)?,
        })
    }
}
