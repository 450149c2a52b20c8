//! Recommendation types a caller can ask for

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    UserCf,
    ItemCf,
    Content,
    Popular,
    Hybrid,
    /// Hybrid when the user has CF neighbors, then content, then popular
    Personalized,
    #[serde(rename = "new")]
    Newest,
}

impl Strategy {
    pub const ALL: [Strategy; 7] = [
        Strategy::UserCf,
        Strategy::ItemCf,
        Strategy::Content,
        Strategy::Popular,
        Strategy::Hybrid,
        Strategy::Personalized,
        Strategy::Newest,
    ];

    /// Name written to the recommendation log
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::UserCf => "usercf",
            Strategy::ItemCf => "itemcf",
            Strategy::Content => "content",
            Strategy::Popular => "popular",
            Strategy::Hybrid => "hybrid",
            Strategy::Personalized => "personalized",
            Strategy::Newest => "new",
        }
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::Personalized
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == lowered)
            .ok_or_else(|| EngineError::UnknownStrategy(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.as_str().parse::<Strategy>().unwrap(), strategy);
        }
        assert_eq!("UserCF".parse::<Strategy>().unwrap(), Strategy::UserCf);
        assert_eq!(" new ".parse::<Strategy>().unwrap(), Strategy::Newest);
    }

    #[test]
    fn test_unknown_name() {
        let err = "trending".parse::<Strategy>().unwrap_err();
        assert!(matches!(err, EngineError::UnknownStrategy(name) if name == "trending"));
    }

    #[test]
    fn test_default_is_personalized() {
        assert_eq!(Strategy::default(), Strategy::Personalized);
    }
}
