//! 整合性チェックモジュール
//!
//! 辞書の複数音節エントリそれぞれについて最良分割を求め、
//! 作者が付けた最上位候補と食い違うものを報告する。

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::Serialize;

use crate::errors::Result;
use crate::lexicon::LexiconIndex;
use crate::reading::Reading;
use crate::segmentation::{SearchStrategy, Segment, Segmenter};
use crate::suppressed::SuppressedSyllableSet;

/// チェック設定
#[derive(Debug, Clone, Default)]
pub struct CheckConfig {
    /// この音節数を超える読みはチェックしない（`None` で無制限）
    pub max_syllables: Option<usize>,
    /// 探索方法
    pub strategy: SearchStrategy,
}

/// 作者の最上位候補と計算上の最良分割の食い違い
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mismatch {
    pub reading: String,
    pub authored_surface: String,
    pub authored_score: f64,
    pub computed_surface: String,
    pub computed_score: f64,
    /// 計算上の最良分割のブロック
    pub segments: Vec<Segment>,
}

/// データ異常（分割が1つも作れない読み）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    pub reading: String,
    pub reason: String,
}

impl Anomaly {
    /// 合法な分割が1つもない読み
    pub(crate) fn no_segmentation(reading: String) -> Self {
        Self {
            reading,
            reason: "no legal segmentation".to_string(),
        }
    }
}

/// 1つの読みに対するチェック結果
#[derive(Debug, Clone, PartialEq)]
pub enum Finding {
    Mismatch(Mismatch),
    Anomaly(Anomaly),
}

/// 音節数ごとの集計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LengthStats {
    pub checked: usize,
    pub mismatches: usize,
    pub anomalies: usize,
}

/// チェック全体の結果（読みのキー順）
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CheckReport {
    pub checked: usize,
    pub by_length: BTreeMap<usize, LengthStats>,
    pub mismatches: Vec<Mismatch>,
    pub anomalies: Vec<Anomaly>,
}

impl CheckReport {
    /// 1件分の結果を記録
    pub fn record(&mut self, syllables: usize, finding: Option<Finding>) {
        let stats = self.by_length.entry(syllables).or_default();
        stats.checked += 1;
        self.checked += 1;

        match finding {
            Some(Finding::Mismatch(m)) => {
                stats.mismatches += 1;
                self.mismatches.push(m);
            }
            Some(Finding::Anomaly(a)) => {
                stats.anomalies += 1;
                self.anomalies.push(a);
            }
            None => {}
        }
    }

    /// 食い違いも異常もない
    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty() && self.anomalies.is_empty()
    }
}

/// 整合性チェッカー
///
/// 辞書と抑制音節集合を借用するだけで、読みごとのチェックは互いに独立。
pub struct ConsistencyChecker<'a> {
    lexicon: &'a LexiconIndex,
    segmenter: Segmenter<'a>,
    config: CheckConfig,
}

impl<'a> ConsistencyChecker<'a> {
    pub fn new(
        lexicon: &'a LexiconIndex,
        suppressed: &'a SuppressedSyllableSet,
        config: CheckConfig,
    ) -> Self {
        Self {
            lexicon,
            segmenter: Segmenter::new(lexicon, suppressed).with_strategy(config.strategy),
            config,
        }
    }

    /// チェック対象の読み（2音節以上、キーのバイト順）
    pub fn targets(&self) -> Vec<&'a Reading> {
        let max = self.config.max_syllables.unwrap_or(usize::MAX);
        self.lexicon
            .sorted_readings()
            .into_iter()
            .filter(|r| r.len() >= 2 && r.len() <= max)
            .collect()
    }

    /// 1つの読みをチェック
    ///
    /// 一致すれば `None`。`NoSegmentation` は異常として返し、
    /// それ以外のエラーは致命的なのでそのまま返す。
    pub fn check(&self, reading: &Reading) -> Result<Option<Finding>> {
        let key = reading.key(self.lexicon.delimiter());
        let authored = self.lexicon.best(reading.syllables())?;

        let computed = match self.segmenter.segment(reading.syllables()) {
            Ok(segmentation) => segmentation,
            Err(e) if e.is_anomaly() => {
                tracing::warn!(reading = %key, "no legal segmentation");
                return Ok(Some(Finding::Anomaly(Anomaly::no_segmentation(key))));
            }
            Err(e) => return Err(e),
        };

        if computed.surface == authored.value && computed.units == authored.units {
            return Ok(None);
        }

        tracing::debug!(reading = %key, computed = %computed.surface, "mismatch");
        Ok(Some(Finding::Mismatch(Mismatch {
            reading: key,
            authored_surface: authored.value.clone(),
            authored_score: authored.score,
            computed_surface: computed.surface,
            computed_score: computed.score,
            segments: computed.segments,
        })))
    }

    /// 逐次実行（遅延評価、何度でもやり直せる）
    pub fn run(&self) -> Box<dyn Iterator<Item = Result<Finding>> + '_> {
        let targets: Vec<&Reading> = self.targets();
        Box::new(
            targets
                .into_iter()
                .filter_map(move |reading| self.check(reading).transpose()),
        )
    }

    /// 並列実行
    ///
    /// 読みを `jobs` 個のワーカーに分配し、キー順で集計する。
    /// `on_progress` は読み1件ごとに呼ばれる。
    pub fn check_all<F>(&self, jobs: usize, on_progress: F) -> Result<CheckReport>
    where
        F: Fn() + Sync,
    {
        let targets = self.targets();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs.max(1))
            .build()?;

        let findings: Vec<Option<Finding>> = pool.install(|| {
            targets
                .par_iter()
                .map(|reading| {
                    let result = self.check(reading);
                    on_progress();
                    result
                })
                .collect::<Result<Vec<_>>>()
        })?;

        let mut report = CheckReport::default();
        for (reading, finding) in targets.iter().zip(findings) {
            report.record(reading.len(), finding);
        }
        Ok(report)
    }
}
