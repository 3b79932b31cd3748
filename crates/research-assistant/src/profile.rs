//! User Profiles
//!
//! Persisted research preferences per anonymous user, injected into the
//! report prompt so repeat visitors get answers shaped to their coins,
//! horizon, and risk stance.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use agent_core::message::truncate_chars;
use agent_core::Result;

const SUMMARY_MAX_CHARS: usize = 400;
const MAX_COINS: usize = 10;

/// A user's research preferences
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,

    /// Coins the user keeps coming back to, e.g. ["BTC", "ETH"]
    #[serde(default)]
    pub coins: Vec<String>,

    /// Preferred horizon: "short-term" | "swing" | "long-term"
    #[serde(default)]
    pub timeframe: String,

    /// Risk stance: "conservative" | "neutral" | "aggressive"
    #[serde(default)]
    pub risk_preference: String,

    /// Freeform notes
    #[serde(default)]
    pub notes: String,
}

impl UserProfile {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    /// Render a prompt-injectable summary; empty string when nothing is known
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if !self.coins.is_empty() {
            parts.push(format!("Coins followed: {}", self.coins.join(", ")));
        }
        if !self.timeframe.is_empty() {
            parts.push(format!("Preferred horizon: {}", self.timeframe));
        }
        if !self.risk_preference.is_empty() {
            parts.push(format!("Risk stance: {}", self.risk_preference));
        }
        if !self.notes.is_empty() {
            parts.push(format!("Notes: {}", self.notes));
        }

        truncate_chars(&parts.join("; "), SUMMARY_MAX_CHARS)
    }
}

/// File-backed profile store: one JSON document per user id
pub struct UserProfileStore {
    base_dir: PathBuf,
}

impl UserProfileStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    fn path_for(&self, user_id: &str) -> PathBuf {
        let safe: String = user_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.base_dir.join(format!("{}.json", safe))
    }

    pub fn get(&self, user_id: &str) -> Result<Option<UserProfile>> {
        match std::fs::read_to_string(self.path_for(user_id)) {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set(&self, profile: &UserProfile) -> Result<()> {
        let json = serde_json::to_string_pretty(profile)?;
        std::fs::write(self.path_for(&profile.user_id), json)?;
        Ok(())
    }

    /// Heuristically extract preferences from a stored memory note and merge
    /// them into the profile. Returns whether anything was learned.
    pub fn absorb_note(&self, user_id: &str, text: &str) -> Result<bool> {
        if text.trim().len() < 2 {
            return Ok(false);
        }

        let lower = text.to_lowercase();

        let mut new_coins = Vec::new();
        for (needle, symbol) in [
            ("btc", "BTC"),
            ("bitcoin", "BTC"),
            ("eth", "ETH"),
            ("ethereum", "ETH"),
            ("sol", "SOL"),
            ("solana", "SOL"),
            ("sui", "SUI"),
            ("bnb", "BNB"),
            ("xrp", "XRP"),
            ("doge", "DOGE"),
        ] {
            if lower.contains(needle) && !new_coins.contains(&symbol.to_string()) {
                new_coins.push(symbol.to_string());
            }
        }

        let timeframe = if lower.contains("short-term")
            || lower.contains("short term")
            || lower.contains("intraday")
            || lower.contains("scalp")
        {
            "short-term"
        } else if lower.contains("swing") || lower.contains("medium") {
            "swing"
        } else if lower.contains("long-term") || lower.contains("long term") || lower.contains("hodl")
        {
            "long-term"
        } else {
            ""
        };

        let risk = if lower.contains("conservative") || lower.contains("cautious") {
            "conservative"
        } else if lower.contains("aggressive") {
            "aggressive"
        } else if lower.contains("neutral") || lower.contains("balanced") || lower.contains("moderate")
        {
            "neutral"
        } else {
            ""
        };

        if new_coins.is_empty() && timeframe.is_empty() && risk.is_empty() {
            return Ok(false);
        }

        let mut profile = self
            .get(user_id)?
            .unwrap_or_else(|| UserProfile::new(user_id));

        for coin in new_coins {
            if !profile.coins.contains(&coin) {
                profile.coins.push(coin);
            }
        }
        profile.coins.truncate(MAX_COINS);

        if !timeframe.is_empty() {
            profile.timeframe = timeframe.into();
        }
        if !risk.is_empty() {
            profile.risk_preference = risk.into();
        }

        self.set(&profile)?;
        Ok(true)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = UserProfileStore::new(dir.path()).unwrap();

        let mut profile = UserProfile::new("anon_user1");
        profile.coins = vec!["BTC".into()];
        profile.timeframe = "swing".into();
        store.set(&profile).unwrap();

        let loaded = store.get("anon_user1").unwrap().unwrap();
        assert_eq!(loaded.coins, vec!["BTC"]);
        assert_eq!(loaded.timeframe, "swing");
        assert!(store.get("anon_other").unwrap().is_none());
    }

    #[test]
    fn test_absorb_note_extracts_preferences() {
        let dir = tempfile::tempdir().unwrap();
        let store = UserProfileStore::new(dir.path()).unwrap();

        let learned = store
            .absorb_note("anon_user1", "I mostly trade BTC and ETH short-term, conservative sizing")
            .unwrap();
        assert!(learned);

        let profile = store.get("anon_user1").unwrap().unwrap();
        assert_eq!(profile.coins, vec!["BTC", "ETH"]);
        assert_eq!(profile.timeframe, "short-term");
        assert_eq!(profile.risk_preference, "conservative");
    }

    #[test]
    fn test_absorb_note_merges_without_clobbering() {
        let dir = tempfile::tempdir().unwrap();
        let store = UserProfileStore::new(dir.path()).unwrap();

        store.absorb_note("anon_u", "watching SOL, aggressive").unwrap();
        store.absorb_note("anon_u", "also adding SUI").unwrap();

        let profile = store.get("anon_u").unwrap().unwrap();
        assert_eq!(profile.coins, vec!["SOL", "SUI"]);
        // Risk stance from the first note survives the second
        assert_eq!(profile.risk_preference, "aggressive");
    }

    #[test]
    fn test_absorb_note_ignores_noise() {
        let dir = tempfile::tempdir().unwrap();
        let store = UserProfileStore::new(dir.path()).unwrap();

        assert!(!store.absorb_note("anon_u", "remember to drink water").unwrap());
        assert!(store.get("anon_u").unwrap().is_none());
    }

    #[test]
    fn test_summary_rendering() {
        let mut profile = UserProfile::new("anon_u");
        assert_eq!(profile.summary(), "");

        profile.coins = vec!["BTC".into(), "ETH".into()];
        profile.risk_preference = "neutral".into();
        let summary = profile.summary();
        assert!(summary.contains("BTC, ETH"));
        assert!(summary.contains("neutral"));
    }
}
