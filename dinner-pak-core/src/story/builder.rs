use std::path::Path;

use indexmap::IndexMap;

use crate::error::{FormatError, PakError, Result};
use crate::layout::{ActionRecord, ActionTag, NO_SPEAKER, STORY_PACK_MAGIC, TextActionRecord};
use crate::write::{self, ContainerWriter, PackOptions, RecordTableBuilder};

use super::script::{ScriptAction, StoryMedia, StoryScript};

#[derive(Debug, Default)]
struct NamedTableBuilder {
    names: RecordTableBuilder,
    data: RecordTableBuilder,
}

impl NamedTableBuilder {
    fn add(&mut self, name: &str, data: &[u8]) -> Result<u32> {
        self.names.check_room(name.len())?;
        self.data.check_room(data.len())?;
        let index = self.names.push(name)?;
        self.data.push(data)?;
        Ok(index)
    }

    fn len(&self) -> usize {
        self.names.len()
    }
}

/// Packs a story: media tables, deduplicated speakers, phrases and the action log.
///
/// Speakers get indices in first-seen order. Phrases are never deduplicated;
/// every text action owns one phrase record and one side-table entry.
#[derive(Debug, Default)]
pub struct StoryPackBuilder {
    images: NamedTableBuilder,
    music: NamedTableBuilder,
    characters: IndexMap<String, u32>,
    phrases: RecordTableBuilder,
    text_actions: Vec<TextActionRecord>,
    actions: Vec<ActionRecord>,
}

impl StoryPackBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the script's media and append all of its actions.
    pub fn from_script(script: &StoryScript) -> Result<Self> {
        let media = script.load_media()?;
        Self::from_script_with_media(script, &media)
    }

    /// `media` must hold one entry per script image and music source.
    pub fn from_script_with_media(script: &StoryScript, media: &StoryMedia) -> Result<Self> {
        for (sources, contents) in [(&script.images, &media.images), (&script.music, &media.music)] {
            if sources.len() != contents.len() {
                return Err(FormatError::CardinalityMismatch {
                    names: sources.len(),
                    data: contents.len(),
                }
                .into());
            }
        }

        let mut builder = Self::new();
        for (source, data) in script.images.iter().zip(&media.images) {
            builder.add_image(&source.name, data)?;
        }
        for (source, data) in script.music.iter().zip(&media.music) {
            builder.add_music(&source.name, data)?;
        }
        for action in &script.actions {
            builder.push_action(action)?;
        }
        Ok(builder)
    }

    pub fn add_image(&mut self, name: &str, data: impl AsRef<[u8]>) -> Result<u32> {
        self.images.add(name, data.as_ref())
    }

    pub fn add_music(&mut self, name: &str, data: impl AsRef<[u8]>) -> Result<u32> {
        self.music.add(name, data.as_ref())
    }

    pub fn push_action(&mut self, action: &ScriptAction) -> Result<()> {
        match action {
            ScriptAction::Text { character, text } => self.add_text(character.as_deref(), text),
            ScriptAction::Image { index } => self.show_image(*index),
            ScriptAction::Music { index } => self.play_music(*index),
        }
    }

    /// A line spoken by `character`; `None` or an empty name is narration.
    pub fn add_text(&mut self, character: Option<&str>, text: &str) -> Result<()> {
        // every check runs before the first table is touched
        let entry_index = u32::try_from(self.text_actions.len()).map_err(|_| FormatError::TooLarge)?;
        self.phrases.check_room(text.len())?;
        let character_index = match character {
            Some(name) if !name.is_empty() => self.character_index_or_insert(name)?,
            _ => NO_SPEAKER,
        };

        let phrase_index = self.phrases.push(text)?;
        self.text_actions
            .push(TextActionRecord::new(character_index, phrase_index));
        self.actions.push(ActionRecord::new(ActionTag::Text, entry_index));
        Ok(())
    }

    pub fn add_narration(&mut self, text: &str) -> Result<()> {
        self.add_text(None, text)
    }

    pub fn show_image(&mut self, image_index: u32) -> Result<()> {
        self.actions.push(ActionRecord::new(ActionTag::Image, image_index));
        Ok(())
    }

    pub fn play_music(&mut self, music_index: u32) -> Result<()> {
        self.actions.push(ActionRecord::new(ActionTag::Music, music_index));
        Ok(())
    }

    fn character_index_or_insert(&mut self, name: &str) -> Result<u32> {
        if let Some(index) = self.characters.get(name) {
            return Ok(*index);
        }
        let index = u32::try_from(self.characters.len())
            .ok()
            .filter(|index| *index != NO_SPEAKER)
            .ok_or(FormatError::TooLarge)?;
        self.characters.insert(name.to_string(), index);
        tracing::debug!(index, name, "new character");
        Ok(index)
    }

    /// Index assigned to a speaker so far.
    pub fn character_index(&self, name: &str) -> Option<u32> {
        self.characters.get(name).copied()
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    /// Every image and music action must reference an added media record.
    fn check_media_indices(&self) -> std::result::Result<(), FormatError> {
        for action in &self.actions {
            let len = match action.tag()? {
                ActionTag::Image => self.images.len(),
                ActionTag::Music => self.music.len(),
                ActionTag::Text => continue,
            };
            let index = action.index.get() as usize;
            if index >= len {
                return Err(FormatError::IndexOutOfRange { index, len });
            }
        }
        Ok(())
    }

    pub fn build(self) -> Result<Vec<u8>> {
        self.check_media_indices()?;

        let character_names = write::pack_records(self.characters.keys())?;
        tracing::debug!(
            actions = self.actions.len(),
            characters = character_names.len(),
            phrases = self.phrases.len(),
            "packing story"
        );

        let mut writer = ContainerWriter::new(STORY_PACK_MAGIC);
        writer
            .add_records(&self.images.names.finish())
            .add_records(&self.images.data.finish())
            .add_records(&self.music.names.finish())
            .add_records(&self.music.data.finish())
            .add_records(&character_names)
            .add_records(&self.phrases.finish())
            .add_fixed(&self.text_actions)
            .add_fixed(&self.actions);
        writer.finish().map_err(PakError::from)
    }

    pub fn write(self, path: impl AsRef<Path>, options: &PackOptions) -> Result<()> {
        let actions = self.actions.len();
        let bytes = self.build()?;
        write::write_file(path.as_ref(), &bytes, options)?;
        tracing::info!(path = %path.as_ref().display(), actions, "story pack written");
        Ok(())
    }
}
