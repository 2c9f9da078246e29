use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Storage backend kinds
///
/// The closed set of backend implementations. A persisted backend record is
/// tagged with one of these; ordering hints refer to kinds, never to
/// individual instances.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Local,
    Ftp,
    RemoteUrl,
    Youtube,
    Vimeo,
    Dailymotion,
}

impl BackendKind {
    pub const ALL: [BackendKind; 6] = [
        BackendKind::Local,
        BackendKind::Ftp,
        BackendKind::RemoteUrl,
        BackendKind::Youtube,
        BackendKind::Vimeo,
        BackendKind::Dailymotion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Local => "local",
            BackendKind::Ftp => "ftp",
            BackendKind::RemoteUrl => "remote_url",
            BackendKind::Youtube => "youtube",
            BackendKind::Vimeo => "vimeo",
            BackendKind::Dailymotion => "dailymotion",
        }
    }

    /// Embed backends never copy bytes; they only reference a third-party host.
    pub fn is_embed(&self) -> bool {
        matches!(
            self,
            BackendKind::Youtube | BackendKind::Vimeo | BackendKind::Dailymotion
        )
    }
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "local" => Ok(BackendKind::Local),
            "ftp" => Ok(BackendKind::Ftp),
            "remote_url" | "remoteurl" => Ok(BackendKind::RemoteUrl),
            "youtube" => Ok(BackendKind::Youtube),
            "vimeo" => Ok(BackendKind::Vimeo),
            "dailymotion" => Ok(BackendKind::Dailymotion),
            _ => Err(anyhow::anyhow!("Invalid backend kind: {}", s)),
        }
    }
}

impl Display for BackendKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}
