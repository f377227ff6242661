use serde::{Deserialize, Serialize};

/// A single unit of practice content. The engine only ever looks at `id`
/// and `challenge_type`; the payload shape belongs to the renderer for
/// that type and stays opaque here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    pub id: String,
    pub challenge_type: ChallengeType,
    pub language: String,
    pub cefr_level: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeType {
    ErrorSpotting,
    MicroQuiz,
    SmartFlashcard,
    NativeCheck,
    BrainTickler,
    StoryBuilder,
    SwipeFix,
}

impl ChallengeType {
    /// Stable identifier used in storage keys and metrics labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeType::ErrorSpotting => "error_spotting",
            ChallengeType::MicroQuiz => "micro_quiz",
            ChallengeType::SmartFlashcard => "smart_flashcard",
            ChallengeType::NativeCheck => "native_check",
            ChallengeType::BrainTickler => "brain_tickler",
            ChallengeType::StoryBuilder => "story_builder",
            ChallengeType::SwipeFix => "swipe_fix",
        }
    }
}

impl std::fmt::Display for ChallengeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
