//! Domain profiles and keyword-based query classification.

use serde::{Deserialize, Serialize};

use crate::error::{DowserError, Result};

/// Name of the designated fallback profile.
pub const GENERAL_DOMAIN: &str = "general";

/// A logical sub-area of backend functionality, inferred from query keywords.
///
/// The profile set is static configuration: loaded once, immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainProfile {
    /// Domain name, also the endpoint-memory partition key.
    pub name: String,
    /// Keywords matched case-insensitively as substrings of the query.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Domain-specific endpoint path tried ahead of discovery.
    #[serde(default)]
    pub default_path: Option<String>,
}

impl DomainProfile {
    /// Create a profile from a name and keyword list.
    pub fn new<I, S>(name: impl Into<String>, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            keywords: keywords.into_iter().map(Into::into).collect(),
            default_path: None,
        }
    }

    /// Set the domain's default endpoint path.
    pub fn with_default_path(mut self, path: impl Into<String>) -> Self {
        self.default_path = Some(path.into());
        self
    }
}

/// The built-in profile set. The trailing `general` profile has no keywords
/// and is the classifier fallback.
pub fn default_profiles() -> Vec<DomainProfile> {
    vec![
        DomainProfile::new(
            "movie",
            ["movie", "film", "actor", "actress", "director", "cinema", "oscar"],
        )
        .with_default_path("/movie/get_movie_info"),
        DomainProfile::new(
            "finance",
            ["stock", "price", "market", "finance", "invest", "share", "earnings"],
        )
        .with_default_path("/finance/get_finance_info"),
        DomainProfile::new(
            "music",
            ["music", "song", "album", "band", "singer", "artist", "lyrics"],
        )
        .with_default_path("/music/get_music_info"),
        DomainProfile::new(
            "sports",
            ["sports", "game", "score", "team", "player", "match", "league"],
        )
        .with_default_path("/sports/get_sports_info"),
        DomainProfile::new(GENERAL_DOMAIN, Vec::<String>::new()),
    ]
}

/// Keyword classifier over a fixed profile set.
///
/// Scoring is a case-insensitive substring count per profile; the strictly
/// highest count wins, ties resolve to the earliest profile in configuration
/// order, and a maximum score of zero returns the fallback profile. Total:
/// every input string classifies to exactly one profile.
#[derive(Debug)]
pub struct DomainClassifier {
    profiles: Vec<DomainProfile>,
    lowered: Vec<Vec<String>>,
    fallback: usize,
}

impl DomainClassifier {
    /// Build a classifier. Fails with a configuration error if the profile
    /// set is empty or carries no fallback (a profile named `general`, or
    /// any profile with an empty keyword set).
    pub fn new(profiles: Vec<DomainProfile>) -> Result<Self> {
        if profiles.is_empty() {
            return Err(DowserError::Config(
                "at least one domain profile is required".to_string(),
            ));
        }

        let fallback = profiles
            .iter()
            .position(|p| p.name == GENERAL_DOMAIN)
            .or_else(|| profiles.iter().position(|p| p.keywords.is_empty()))
            .ok_or_else(|| {
                DowserError::Config(
                    "no fallback domain profile configured (add one with an empty keyword set)"
                        .to_string(),
                )
            })?;

        let lowered = profiles
            .iter()
            .map(|p| p.keywords.iter().map(|k| k.to_lowercase()).collect())
            .collect();

        Ok(Self {
            profiles,
            lowered,
            fallback,
        })
    }

    /// Classify a query into a domain profile. Never fails.
    pub fn classify(&self, query: &str) -> &DomainProfile {
        let query = query.to_lowercase();
        let mut best = self.fallback;
        let mut best_score = 0usize;

        for (i, keywords) in self.lowered.iter().enumerate() {
            let score = keywords
                .iter()
                .filter(|keyword| query.contains(keyword.as_str()))
                .count();
            if score > best_score {
                best = i;
                best_score = score;
            }
        }

        &self.profiles[best]
    }

    /// The configured profiles.
    pub fn profiles(&self) -> &[DomainProfile] {
        &self.profiles
    }

    /// The fallback profile.
    pub fn fallback(&self) -> &DomainProfile {
        &self.profiles[self.fallback]
    }
}
