//! 読みモジュール
//!
//! 注音の音節列（読み）を表す型と、その分解・結合を扱う。

use std::borrow::Borrow;

/// 音節区切りのデフォルト文字
pub const DEFAULT_DELIMITER: char = '-';

/// 音節（注音記号の文字列、これ以上分解しない）
pub type Syllable = String;

/// 読み（1つ以上の音節の並び）
///
/// `[String]` として借用できるため、`HashMap<Reading, _>` を
/// 部分スライスのまま引くことができる。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reading(Vec<Syllable>);

impl Reading {
    /// 区切り文字で分割して読みを作る
    ///
    /// 空文字列や空の音節（`ㄅ--ㄆ` など）を含む場合は `None`。
    pub fn parse(text: &str, delimiter: char) -> Option<Self> {
        if text.is_empty() {
            return None;
        }
        let syllables: Vec<Syllable> = text.split(delimiter).map(str::to_string).collect();
        if syllables.iter().any(|s| s.is_empty()) {
            return None;
        }
        Some(Self(syllables))
    }

    pub fn syllables(&self) -> &[Syllable] {
        &self.0
    }

    /// 音節数
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 区切り文字で結合したキー文字列
    pub fn key(&self, delimiter: char) -> String {
        join(&self.0, delimiter)
    }
}

impl Borrow<[Syllable]> for Reading {
    fn borrow(&self) -> &[Syllable] {
        &self.0
    }
}

/// 音節スライスを区切り文字で結合
pub fn join(syllables: &[Syllable], delimiter: char) -> String {
    let mut buf = [0u8; 4];
    syllables.join(&*delimiter.encode_utf8(&mut buf))
}
