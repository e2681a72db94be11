use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use engine::UpgradeTrack;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const PREFS_VERSION: u32 = 1;
const PREFS_FILE: &str = ".lanesiege_prefs.json";

/// Serialized twin of [`UpgradeTrack`], so the file format stays decoupled
/// from the engine's runtime enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum AutoBuyChoice {
    Speed,
    Damage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Preferences {
    pub(crate) prefs_version: u32,
    pub(crate) auto_buy: Option<AutoBuyChoice>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            prefs_version: PREFS_VERSION,
            auto_buy: None,
        }
    }
}

impl Preferences {
    pub(crate) fn auto_buy_track(&self) -> Option<UpgradeTrack> {
        self.auto_buy.map(|choice| match choice {
            AutoBuyChoice::Speed => UpgradeTrack::Speed,
            AutoBuyChoice::Damage => UpgradeTrack::Damage,
        })
    }

    pub(crate) fn remember_auto_buy(&mut self, track: Option<UpgradeTrack>) {
        self.auto_buy = track.map(|track| match track {
            UpgradeTrack::Speed => AutoBuyChoice::Speed,
            UpgradeTrack::Damage => AutoBuyChoice::Damage,
        });
    }
}

/// Preferences are strictly optional: any read or parse failure falls back
/// to defaults with a warning, never an error.
pub(crate) fn load() -> Preferences {
    load_from(&prefs_path())
}

pub(crate) fn store(prefs: &Preferences) {
    store_to(&prefs_path(), prefs);
}

fn load_from(path: &Path) -> Preferences {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Preferences::default(),
        Err(error) => {
            warn!(error = %error, path = %path.display(), "prefs_read_failed");
            return Preferences::default();
        }
    };
    match parse(&raw) {
        Ok(prefs) => prefs,
        Err(reason) => {
            warn!(reason, path = %path.display(), "prefs_rejected");
            Preferences::default()
        }
    }
}

fn store_to(path: &Path, prefs: &Preferences) {
    let json = match serde_json::to_string_pretty(prefs) {
        Ok(json) => json,
        Err(error) => {
            warn!(error = %error, "prefs_encode_failed");
            return;
        }
    };
    match write_text_atomic(path, &json) {
        Ok(()) => debug!(path = %path.display(), "prefs_stored"),
        Err(error) => warn!(error = %error, path = %path.display(), "prefs_write_failed"),
    }
}

fn parse(raw: &str) -> Result<Preferences, String> {
    let prefs: Preferences =
        serde_json::from_str(raw).map_err(|error| format!("parse prefs json: {error}"))?;
    if prefs.prefs_version != PREFS_VERSION {
        return Err(format!(
            "expected prefs_version {PREFS_VERSION}, got {}",
            prefs.prefs_version
        ));
    }
    Ok(prefs)
}

fn prefs_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(PREFS_FILE)
}

/// A half-written prefs file must never clobber a good one, so writes land
/// in a sibling temp file first and are renamed into place.
fn write_text_atomic(path: &Path, text: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = temp_path_for(path);
    fs::write(&tmp_path, text)?;
    replace_file(&tmp_path, path)
}

fn replace_file(tmp_path: &Path, final_path: &Path) -> io::Result<()> {
    match fs::remove_file(final_path) {
        Ok(_) => {}
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => {
            let _ = fs::remove_file(tmp_path);
            return Err(error);
        }
    }

    if let Err(error) = fs::rename(tmp_path, final_path) {
        let _ = fs::remove_file(tmp_path);
        return Err(error);
    }
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("prefs.tmp");
    let tmp_name = format!("{file_name}.tmp");
    match path.parent() {
        Some(parent) => parent.join(tmp_name),
        None => PathBuf::from(tmp_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_the_current_version() {
        let prefs = parse(r#"{"prefs_version":1,"auto_buy":"speed"}"#).expect("valid prefs");
        assert_eq!(prefs.auto_buy, Some(AutoBuyChoice::Speed));
        assert_eq!(prefs.auto_buy_track(), Some(UpgradeTrack::Speed));
    }

    #[test]
    fn parse_rejects_a_version_mismatch() {
        let error = parse(r#"{"prefs_version":2,"auto_buy":null}"#).expect_err("wrong version");
        assert!(error.contains("prefs_version"));
    }

    #[test]
    fn parse_rejects_malformed_json() {
        assert!(parse("{not json").is_err());
    }

    #[test]
    fn remember_and_recall_round_trip() {
        let mut prefs = Preferences::default();
        assert_eq!(prefs.auto_buy_track(), None);

        prefs.remember_auto_buy(Some(UpgradeTrack::Damage));
        let json = serde_json::to_string(&prefs).expect("serialize");
        let decoded = parse(&json).expect("round trip");
        assert_eq!(decoded.auto_buy_track(), Some(UpgradeTrack::Damage));

        prefs.remember_auto_buy(None);
        assert_eq!(prefs.auto_buy, None);
    }

    #[test]
    fn load_from_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let prefs = load_from(&dir.path().join("absent.json"));
        assert_eq!(prefs, Preferences::default());
    }

    #[test]
    fn store_then_load_round_trips_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("prefs.json");
        let mut prefs = Preferences::default();
        prefs.remember_auto_buy(Some(UpgradeTrack::Speed));

        store_to(&path, &prefs);
        assert_eq!(load_from(&path), prefs);
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("prefs.json");
        fs::write(&path, "??").expect("write");
        assert_eq!(load_from(&path), Preferences::default());
    }
}
