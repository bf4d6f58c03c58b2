use serde::{Deserialize, Serialize};

/// A metered feature. Each one has its own daily counter and its own limits.
///
/// The identifier doubles as the column name in `feature_usage`, so it must
/// stay a plain snake_case word.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    AiChat,
    AiDetector,
    Translator,
    TextToSpeech,
    SeoAnalyzer,
    CodeRunner,
    UrlShortener,
}

impl Feature {
    pub const ALL: [Feature; 7] = [
        Feature::AiChat,
        Feature::AiDetector,
        Feature::Translator,
        Feature::TextToSpeech,
        Feature::SeoAnalyzer,
        Feature::CodeRunner,
        Feature::UrlShortener,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::AiChat => "ai_chat",
            Feature::AiDetector => "ai_detector",
            Feature::Translator => "translator",
            Feature::TextToSpeech => "text_to_speech",
            Feature::SeoAnalyzer => "seo_analyzer",
            Feature::CodeRunner => "code_runner",
            Feature::UrlShortener => "url_shortener",
        }
    }

    /// Column holding this feature's daily count.
    pub fn column(&self) -> &'static str {
        self.as_str()
    }

    /// Human-readable name used in user-facing messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Feature::AiChat => "AI chat",
            Feature::AiDetector => "AI content detector",
            Feature::Translator => "translator",
            Feature::TextToSpeech => "text to speech",
            Feature::SeoAnalyzer => "SEO analyzer",
            Feature::CodeRunner => "code runner",
            Feature::UrlShortener => "URL shortener",
        }
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Feature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.to_lowercase().replace('-', "_");
        Feature::ALL
            .into_iter()
            .find(|f| f.as_str() == key)
            .ok_or_else(|| format!("unknown feature: {}", s))
    }
}
