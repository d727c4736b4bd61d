//! Supported video link detection.
//!
//! Matches raw message text against a fixed set of platform URL shapes.
//! First match wins; malformed or partial URLs simply fail to match.

use std::sync::OnceLock;

use regex::RegexSet;

/// Platforms the downloader is known to handle. Used for logging only; the
/// URL is handed to the downloader as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    YouTube,
    Instagram,
    TikTok,
    Reddit,
    Twitter,
    Facebook,
    Twitch,
    Vimeo,
    Dailymotion,
}

impl Platform {
    pub fn name(&self) -> &'static str {
        match self {
            Self::YouTube => "youtube",
            Self::Instagram => "instagram",
            Self::TikTok => "tiktok",
            Self::Reddit => "reddit",
            Self::Twitter => "twitter",
            Self::Facebook => "facebook",
            Self::Twitch => "twitch",
            Self::Vimeo => "vimeo",
            Self::Dailymotion => "dailymotion",
        }
    }
}

const PATTERNS: &[(&str, Platform)] = &[
    (r"youtube\.com/watch", Platform::YouTube),
    (r"youtu\.be/", Platform::YouTube),
    (r"youtube\.com/embed/", Platform::YouTube),
    (r"youtube\.com/v/", Platform::YouTube),
    (r"youtube\.com/shorts/", Platform::YouTube),
    (r"instagram\.com/p/", Platform::Instagram),
    (r"instagram\.com/reel/", Platform::Instagram),
    (r"instagram\.com/tv/", Platform::Instagram),
    (r"instagram\.com/stories/", Platform::Instagram),
    (r"tiktok\.com/", Platform::TikTok),
    (r"vm\.tiktok\.com/", Platform::TikTok),
    (r"reddit\.com/r/.*/comments/", Platform::Reddit),
    (r"v\.redd\.it/", Platform::Reddit),
    (r"twitter\.com/.*/status/", Platform::Twitter),
    (r"x\.com/.*/status/", Platform::Twitter),
    (r"facebook\.com/.*/videos/", Platform::Facebook),
    (r"fb\.watch/", Platform::Facebook),
    (r"twitch\.tv/", Platform::Twitch),
    (r"clips\.twitch\.tv/", Platform::Twitch),
    (r"vimeo\.com/", Platform::Vimeo),
    (r"dailymotion\.com/video/", Platform::Dailymotion),
];

fn pattern_set() -> &'static RegexSet {
    static SET: OnceLock<RegexSet> = OnceLock::new();
    SET.get_or_init(|| {
        RegexSet::new(PATTERNS.iter().map(|(pattern, _)| *pattern))
            .expect("platform URL patterns are valid regexes")
    })
}

/// Classify message text. Returns the first matching platform, or `None` for
/// anything that is not a supported video link.
pub fn classify(text: &str) -> Option<Platform> {
    pattern_set()
        .matches(text)
        .iter()
        .next()
        .map(|index| PATTERNS[index].1)
}

/// Whether the text contains a supported video link.
pub fn is_supported(text: &str) -> bool {
    classify(text).is_some()
}
