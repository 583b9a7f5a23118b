//! Visual-novel story container.
//!
//! Sections, in order: image names, image data, music names, music data,
//! character names, phrases, the text side-table and the action log.

mod action;
mod builder;
mod script;

use std::path::Path;

pub use action::*;
pub use builder::*;
pub use script::*;

use crate::data::{NamedDataStorage, NamedSpan, RecordTable, StringTable, Table, read_string_span};
use crate::error::{FormatError, Result};
use crate::layout::{self, ActionRecord, ActionTag, FixedSpan, RecordSpan, STORY_PACK_MAGIC, TextActionRecord};
use crate::mapped::MappedBytes;

const SECTION_COUNT: usize = 8;

/// A story pack opened from disk (or memory).
///
/// Actions are stored as `(tag, index)` pairs and resolved on access.
pub struct StoryPack {
    bytes: MappedBytes,
    images: NamedSpan,
    music: NamedSpan,
    character_names: RecordSpan,
    phrases: RecordSpan,
    text_actions: FixedSpan,
    actions: FixedSpan,
}

impl StoryPack {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let pack = Self::from_mapped(MappedBytes::open(path)?)?;
        tracing::info!(
            path = ?pack.bytes.path(),
            actions = pack.len(),
            images = pack.images().len(),
            music = pack.music().len(),
            "opened story pack"
        );
        Ok(pack)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::from_mapped(MappedBytes::from_vec(bytes))
    }

    fn from_mapped(bytes: MappedBytes) -> Result<Self> {
        let sections = layout::read_sections(&bytes, STORY_PACK_MAGIC, SECTION_COUNT)?;
        let images = NamedSpan::read(&bytes, sections[0].clone(), sections[1].clone(), "image")?;
        let music = NamedSpan::read(&bytes, sections[2].clone(), sections[3].clone(), "music")?;
        let character_names = read_string_span(&bytes, sections[4].clone(), "character names")?;
        let phrases = read_string_span(&bytes, sections[5].clone(), "phrases")?;
        let text_actions = layout::read_fixed_span(
            &bytes,
            sections[6].clone(),
            std::mem::size_of::<TextActionRecord>(),
            "text actions",
        )?;
        let actions = layout::read_fixed_span(
            &bytes,
            sections[7].clone(),
            std::mem::size_of::<ActionRecord>(),
            "actions",
        )?;

        Ok(Self {
            bytes,
            images,
            music,
            character_names,
            phrases,
            text_actions,
            actions,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.bytes.path()
    }

    pub fn images(&self) -> NamedDataStorage<'_> {
        self.images.view(&self.bytes)
    }

    pub fn music(&self) -> NamedDataStorage<'_> {
        self.music.view(&self.bytes)
    }

    pub fn character_names(&self) -> StringTable<'_> {
        StringTable::from_checked(RecordTable::from_span(&self.bytes, &self.character_names))
    }

    pub fn phrases(&self) -> StringTable<'_> {
        StringTable::from_checked(RecordTable::from_span(&self.bytes, &self.phrases))
    }

    pub fn image_data(&self, index: usize) -> Result<&[u8]> {
        Ok(self.images().data().at(index)?)
    }

    pub fn music_data(&self, index: usize) -> Result<&[u8]> {
        Ok(self.music().data().at(index)?)
    }

    /// Number of actions in the log.
    pub fn len(&self) -> usize {
        self.actions.count
    }

    pub fn is_empty(&self) -> bool {
        self.actions.count == 0
    }

    /// Resolve action `index` against the pack's tables.
    pub fn action(&self, index: usize) -> Result<Action<'_>> {
        let record: ActionRecord = self.actions.item(&self.bytes, index)?;
        let target = record.index.get();
        let action = match record.tag()? {
            ActionTag::Image => {
                check_index(target, self.images().len())?;
                Action::show_image(target)
            }
            ActionTag::Music => {
                check_index(target, self.music().len())?;
                Action::play_music(target)
            }
            ActionTag::Text => {
                let entry: TextActionRecord = self.text_actions.item(&self.bytes, target as usize)?;
                let character = match entry.character() {
                    Some(character) => Some(self.character_names().at(character as usize)?),
                    None => None,
                };
                let text = self.phrases().at(entry.phrase() as usize)?;
                Action::show_text(character, text)
            }
        };
        Ok(action)
    }

    pub fn actions(&self) -> Actions<'_> {
        Actions {
            pack: self,
            front: 0,
            back: self.len(),
        }
    }

    pub fn cursor(&self) -> StoryCursor<'_> {
        StoryCursor { pack: self, index: 0 }
    }

    /// Resolve every action once; reports the first corrupt one.
    pub fn verify(&self) -> Result<()> {
        for index in 0..self.len() {
            self.action(index).inspect_err(|e| {
                tracing::warn!(index, error = %e, "corrupt action");
            })?;
        }
        Ok(())
    }
}

fn check_index(index: u32, len: usize) -> std::result::Result<(), FormatError> {
    if (index as usize) < len {
        Ok(())
    } else {
        Err(FormatError::IndexOutOfRange {
            index: index as usize,
            len,
        })
    }
}

impl std::fmt::Debug for StoryPack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoryPack")
            .field("bytes", &self.bytes)
            .field("actions", &self.actions.count)
            .field("text_actions", &self.text_actions.count)
            .finish()
    }
}

/// Lazily resolved actions, in log order.
#[derive(Debug, Clone)]
pub struct Actions<'a> {
    pack: &'a StoryPack,
    front: usize,
    back: usize,
}

impl<'a> Iterator for Actions<'a> {
    type Item = Result<Action<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let action = self.pack.action(self.front);
        self.front += 1;
        Some(action)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl DoubleEndedIterator for Actions<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        Some(self.pack.action(self.back))
    }
}

impl ExactSizeIterator for Actions<'_> {}

/// Playback position in a story.
#[derive(Debug, Clone)]
pub struct StoryCursor<'a> {
    pack: &'a StoryPack,
    index: usize,
}

impl<'a> StoryCursor<'a> {
    pub fn position(&self) -> usize {
        self.index
    }

    pub fn is_finished(&self) -> bool {
        self.index >= self.pack.len()
    }

    /// The action under the cursor; `IndexOutOfRange` once the story is finished.
    pub fn current(&self) -> Result<Action<'a>> {
        self.pack.action(self.index)
    }

    /// Step forward; `false` when there is no next action.
    pub fn advance(&mut self) -> bool {
        if self.is_finished() {
            return false;
        }
        self.index += 1;
        !self.is_finished()
    }

    /// Jump to action `index`.
    pub fn seek(&mut self, index: usize) -> Result<()> {
        if index >= self.pack.len() {
            return Err(FormatError::IndexOutOfRange {
                index,
                len: self.pack.len(),
            }
            .into());
        }
        self.index = index;
        Ok(())
    }
}
