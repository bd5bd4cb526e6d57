//! 抑制音節モジュール
//!
//! 単独の1音節語として分割ブロックになってはいけない音節（軽声など）の集合。
//! 内容はバージョン付きのJSON設定として外部化している。

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::errors::{CheckError, Result};

/// 組み込みの抑制音節リスト
const BUILTIN_CONFIG: &str = include_str!("../data/suppressed_syllables.json");

/// 設定ファイルの形式
#[derive(Debug, Deserialize)]
struct SuppressedConfig {
    version: u32,
    #[serde(default)]
    description: Option<String>,
    syllables: Vec<String>,
}

/// 抑制音節の集合（読み取り専用）
#[derive(Debug, Clone, Default)]
pub struct SuppressedSyllableSet {
    version: u32,
    description: Option<String>,
    syllables: HashSet<String>,
}

impl SuppressedSyllableSet {
    /// 組み込みリストを読み込む
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_CONFIG)
    }

    /// JSONファイルから読み込む
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CheckError::io(path, e))?;
        Self::from_json(&content)
    }

    /// JSON文字列から読み込む
    ///
    /// 形式: `{"version": 3, "description": "...", "syllables": ["ㄕㄨ˙", ...]}`
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SuppressedConfig =
            serde_json::from_str(json).map_err(|e| CheckError::InvalidConfig(e.to_string()))?;

        if config.syllables.iter().any(|s| s.trim().is_empty()) {
            return Err(CheckError::InvalidConfig("empty syllable in list".to_string()));
        }

        Ok(Self {
            version: config.version,
            description: config.description,
            syllables: config.syllables.into_iter().collect(),
        })
    }

    /// 任意の音節リストから作る（バージョン0）
    pub fn from_syllables<I, S>(syllables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            version: 0,
            description: None,
            syllables: syllables.into_iter().map(Into::into).collect(),
        }
    }

    /// 空の集合
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains(&self, syllable: &str) -> bool {
        self.syllables.contains(syllable)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn len(&self) -> usize {
        self.syllables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.syllables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin() {
        let set = SuppressedSyllableSet::builtin().unwrap();
        assert_eq!(set.version(), 3);
        assert_eq!(set.len(), 14);
        assert!(set.contains("ㄕㄨ˙"));
        assert!(set.contains("ㄌㄠ˙"));
        assert!(!set.contains("ㄕㄨ"));
    }

    #[test]
    fn test_duplicates_collapse() {
        let set = SuppressedSyllableSet::from_json(r#"{"version": 1, "syllables": ["A", "A", "B"]}"#)
            .unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.description(), None);
    }

    #[test]
    fn test_invalid_config() {
        for json in [
            r#"{"syllables": ["A"]}"#,
            r#"{"version": 1, "syllables": ["A", ""]}"#,
            "not json",
        ] {
            assert!(matches!(
                SuppressedSyllableSet::from_json(json),
                Err(CheckError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("suppressed.json");
        std::fs::write(&path, r#"{"version": 7, "syllables": ["ㄉㄜ˙"]}"#).unwrap();

        let set = SuppressedSyllableSet::load(&path).unwrap();
        assert_eq!(set.version(), 7);
        assert!(set.contains("ㄉㄜ˙"));
    }
}
