//! 辞書モジュール
//!
//! コンパイル済み辞書（`読み 値 スコア` の3列テキスト）を読み込み、
//! 読み → 候補列 の読み取り専用インデックスを構築する。

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Serialize;

use crate::errors::{CheckError, Result};
use crate::reading::{self, Reading, Syllable, DEFAULT_DELIMITER};

/// 句読点・記号プレースホルダーの予約文字
pub const DEFAULT_MARKER: char = '_';

/// ヘッダー行（フォーマット宣言）の接頭辞
const PRAGMA_PREFIX: &str = "# format ";

/// スコアの固定小数点倍率（小数6桁）
pub const SCORE_SCALE: f64 = 1_000_000.0;

/// 受け付けるスコアの絶対値の上限（長い読みの合計でも i64 に収まる）
const SCORE_LIMIT: f64 = 1.0e9;

/// スコアを固定小数点の整数に変換
pub fn to_units(score: f64) -> i64 {
    (score * SCORE_SCALE).round() as i64
}

/// 固定小数点の整数をスコアに戻す
pub fn from_units(units: i64) -> f64 {
    units as f64 / SCORE_SCALE
}

/// 候補（表層文字列とスコア）
///
/// 比較と合計は `units`（スコアの 10⁶ 倍の整数）で行い、
/// `score` は出力にだけ使う。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub value: String,
    pub score: f64,
    #[serde(skip)]
    pub units: i64,
}

/// 読み込み設定
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// 音節区切り文字
    pub delimiter: char,
    /// この文字を含む行は記号エントリとして読み飛ばす
    pub marker: char,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            marker: DEFAULT_MARKER,
        }
    }
}

/// 読み込み時の統計
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadStats {
    /// データ行数
    pub data_lines: usize,
    /// コメント行数（ヘッダーを除く）
    pub comment_lines: usize,
    /// 予約文字により読み飛ばした行数
    pub marker_lines: usize,
    /// 最長の読みの音節数
    pub max_syllables: usize,
}

/// 辞書インデックス
///
/// 構築後は変更しない。候補はスコア降順に安定ソート済みで、
/// 先頭が作者の意図した最上位候補になる。
#[derive(Debug, Clone)]
pub struct LexiconIndex {
    entries: HashMap<Reading, Vec<Candidate>>,
    format: Option<String>,
    delimiter: char,
    stats: LoadStats,
}

impl LexiconIndex {
    /// ファイルから辞書を読み込む
    pub fn load(path: &Path, options: &LoadOptions) -> Result<Self> {
        let file = File::open(path).map_err(|e| CheckError::io(path, e))?;
        Self::from_reader(BufReader::new(file), options).map_err(|e| match e {
            CheckError::Io { source, .. } => CheckError::io(path, source),
            other => other,
        })
    }

    /// テキストから辞書を構築（主にテスト用）
    pub fn from_text(text: &str, options: &LoadOptions) -> Result<Self> {
        Self::from_reader(text.as_bytes(), options)
    }

    /// 任意のリーダーから辞書を構築
    pub fn from_reader<R: BufRead>(reader: R, options: &LoadOptions) -> Result<Self> {
        let mut entries: HashMap<Reading, Vec<Candidate>> = HashMap::new();
        let mut format = None;
        let mut stats = LoadStats::default();

        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| CheckError::io("<reader>", e))?;
            let line_no = idx + 1;

            // 1行目のフォーマット宣言
            if line_no == 1 {
                if let Some(name) = line.strip_prefix(PRAGMA_PREFIX) {
                    format = Some(name.trim().to_string());
                    continue;
                }
                tracing::debug!("no format pragma on first line, parsing it as data");
            }

            if line.trim().is_empty() {
                continue;
            }
            if line.starts_with('#') {
                stats.comment_lines += 1;
                continue;
            }
            if line.contains(options.marker) {
                stats.marker_lines += 1;
                tracing::trace!(line_no, "skipping marker line");
                continue;
            }

            let (reading, candidate) = Self::parse_line(&line, line_no, options.delimiter)?;
            stats.data_lines += 1;
            stats.max_syllables = stats.max_syllables.max(reading.len());
            entries.entry(reading).or_default().push(candidate);
        }

        // スコア降順の安定ソート（同点はファイル順を保つ）
        for candidates in entries.values_mut() {
            candidates.sort_by(|a, b| b.units.cmp(&a.units));
        }

        tracing::debug!(
            keys = entries.len(),
            lines = stats.data_lines,
            skipped = stats.marker_lines,
            "lexicon loaded"
        );

        Ok(Self {
            entries,
            format,
            delimiter: options.delimiter,
            stats,
        })
    }

    /// データ行をパース
    /// 形式: `読み 値 スコア`
    fn parse_line(line: &str, line_no: usize, delimiter: char) -> Result<(Reading, Candidate)> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 3 {
            return Err(CheckError::malformed(
                line_no,
                line,
                format!("expected 3 fields, found {}", fields.len()),
            ));
        }

        let reading = Reading::parse(fields[0], delimiter)
            .ok_or_else(|| CheckError::malformed(line_no, line, "empty syllable in reading"))?;
        let score: f64 = fields[2]
            .parse()
            .map_err(|_| CheckError::malformed(line_no, line, "score is not a number"))?;
        if !score.is_finite() {
            return Err(CheckError::malformed(line_no, line, "score is not finite"));
        }
        if score.abs() > SCORE_LIMIT {
            return Err(CheckError::malformed(line_no, line, "score is out of range"));
        }

        Ok((
            reading,
            Candidate {
                value: fields[1].to_string(),
                score,
                units: to_units(score),
            },
        ))
    }

    pub fn contains(&self, reading: &[Syllable]) -> bool {
        self.entries.contains_key(reading)
    }

    /// 最上位候補を返す
    ///
    /// 探索中は必ず `contains` を確認してから呼ぶため、
    /// `LookupMiss` は実装のバグを意味する。
    pub fn best(&self, reading: &[Syllable]) -> Result<&Candidate> {
        self.entries
            .get(reading)
            .and_then(|candidates| candidates.first())
            .ok_or_else(|| CheckError::LookupMiss(reading::join(reading, self.delimiter)))
    }

    /// 読みに対応する全候補（スコア降順）
    pub fn candidates(&self, reading: &[Syllable]) -> Option<&[Candidate]> {
        self.entries.get(reading).map(Vec::as_slice)
    }

    /// キー文字列のバイト順に並べた読み
    pub fn sorted_readings(&self) -> Vec<&Reading> {
        let mut keyed: Vec<(String, &Reading)> = self
            .entries
            .keys()
            .map(|r| (r.key(self.delimiter), r))
            .collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        keyed.into_iter().map(|(_, r)| r).collect()
    }

    /// 読みの種類数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 候補の総数
    pub fn total_candidates(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// ヘッダーで宣言されたフォーマット名
    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    pub fn stats(&self) -> &LoadStats {
        &self.stats
    }

    /// 統計情報のサマリー
    pub fn summary(&self) -> String {
        format!(
            "Lexicon Stats:\n  Format: {}\n  Readings: {}\n  Candidates: {}\n  Skipped marker lines: {}\n  Longest reading: {} syllables",
            self.format.as_deref().unwrap_or("(none)"),
            self.len(),
            self.total_candidates(),
            self.stats.marker_lines,
            self.stats.max_syllables
        )
    }
}
