/// Show image `image_index` of the story's image storage.
///
/// Stored directly in the action log: the log entry's index is the image index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShowImage {
    pub image_index: u32,
}

/// Start music track `music_index` of the story's music storage.
///
/// Stored directly in the action log: the log entry's index is the track index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayMusic {
    pub music_index: u32,
}

/// A dialogue or narration line.
///
/// Stored indirectly: the log entry's index addresses the text side-table,
/// whose entry holds the speaker and phrase indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShowText<'a> {
    /// `None` for narration.
    pub character: Option<&'a str>,
    pub text: &'a str,
}

/// A resolved story action; strings alias the container bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action<'a> {
    ShowImage(ShowImage),
    PlayMusic(PlayMusic),
    ShowText(ShowText<'a>),
}

impl<'a> Action<'a> {
    pub fn show_image(image_index: u32) -> Self {
        Action::ShowImage(ShowImage { image_index })
    }

    pub fn play_music(music_index: u32) -> Self {
        Action::PlayMusic(PlayMusic { music_index })
    }

    pub fn show_text(character: Option<&'a str>, text: &'a str) -> Self {
        Action::ShowText(ShowText { character, text })
    }
}

impl std::fmt::Display for Action<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::ShowImage(action) => write!(f, "[image {}]", action.image_index),
            Action::PlayMusic(action) => write!(f, "[music {}]", action.music_index),
            Action::ShowText(ShowText {
                character: Some(character),
                text,
            }) => write!(f, "{character}: {text}"),
            Action::ShowText(ShowText { character: None, text }) => f.write_str(text),
        }
    }
}
