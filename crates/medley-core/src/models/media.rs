use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// What a stored artifact is, inferred from the input rather than supplied by a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Audio,
    Video,
    Caption,
    AudioDescription,
}

impl Display for MediaKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let s = match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
            MediaKind::Caption => "caption",
            MediaKind::AudioDescription => "audio_description",
        };
        write!(f, "{}", s)
    }
}

/// Extension table: (extension, kind, container).
const MEDIA_EXTENSIONS: &[(&str, MediaKind, &str)] = &[
    ("mp4", MediaKind::Video, "mp4"),
    ("m4v", MediaKind::Video, "mp4"),
    ("mov", MediaKind::Video, "mov"),
    ("flv", MediaKind::Video, "flv"),
    ("f4v", MediaKind::Video, "f4v"),
    ("webm", MediaKind::Video, "webm"),
    ("ogv", MediaKind::Video, "ogg"),
    ("mkv", MediaKind::Video, "mkv"),
    ("avi", MediaKind::Video, "avi"),
    ("3gp", MediaKind::Video, "3gp"),
    ("wmv", MediaKind::Video, "wmv"),
    ("mpg", MediaKind::Video, "mpeg"),
    ("mpeg", MediaKind::Video, "mpeg"),
    ("mp3", MediaKind::Audio, "mp3"),
    ("m4a", MediaKind::Audio, "m4a"),
    ("aac", MediaKind::Audio, "aac"),
    ("oga", MediaKind::Audio, "ogg"),
    ("ogg", MediaKind::Audio, "ogg"),
    ("flac", MediaKind::Audio, "flac"),
    ("wav", MediaKind::Audio, "wav"),
    ("wma", MediaKind::Audio, "wma"),
    ("srt", MediaKind::Caption, "srt"),
    ("vtt", MediaKind::Caption, "vtt"),
    ("dfxp", MediaKind::Caption, "dfxp"),
    ("sami", MediaKind::Caption, "sami"),
];

/// Lower-cased extension of a file name or URL path, ignoring query and fragment.
pub fn file_extension(name: &str) -> Option<String> {
    let path = name.split(['?', '#']).next().unwrap_or(name);
    let last = path.rsplit('/').next().unwrap_or(path);
    let (stem, ext) = last.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

/// Infer the media kind and container from a file name or URL.
///
/// Returns `None` when the extension is missing or not a known media type.
pub fn guess_media_type(name: &str) -> Option<(MediaKind, String)> {
    let ext = file_extension(name)?;
    MEDIA_EXTENSIONS
        .iter()
        .find(|(candidate, _, _)| *candidate == ext)
        .map(|(_, kind, container)| (*kind, container.to_string()))
}
