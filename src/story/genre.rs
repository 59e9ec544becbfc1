/*!
 * Story genres.
 */

use std::fmt;
use std::str::FromStr;

use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

/// Genre of a generated story
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Genre {
    BedtimeStory,
    Horror,
    Fantasy,
    Comedy,
}

impl Genre {
    /// Every genre, in display order
    pub const ALL: [Genre; 4] = [Genre::BedtimeStory, Genre::Horror, Genre::Fantasy, Genre::Comedy];

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::BedtimeStory => "bedtime story",
            Self::Horror => "horror",
            Self::Fantasy => "fantasy",
            Self::Comedy => "comedy",
        }
    }

    /// Phrase used in prompts ("Please write a horror story")
    pub fn story_phrase(&self) -> &'static str {
        match self {
            Self::BedtimeStory => "bedtime story",
            Self::Horror => "horror story",
            Self::Fantasy => "fantasy story",
            Self::Comedy => "comedy story",
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Genre {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "bedtime story" | "bedtime" => Ok(Self::BedtimeStory),
            "horror" => Ok(Self::Horror),
            "fantasy" => Ok(Self::Fantasy),
            "comedy" => Ok(Self::Comedy),
            _ => Err(format!("Unknown genre: {}", s)),
        }
    }
}

/// Pick a genre uniformly at random
pub fn random_genre() -> Genre {
    *Genre::ALL.choose(&mut rand::rng()).unwrap_or(&Genre::BedtimeStory)
}
