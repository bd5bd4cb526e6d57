//! 分割探索モジュール
//!
//! 読みを辞書に存在する連続ブロックへ分割する全ての方法のうち、
//! 各ブロックの最上位候補スコアの合計が最大になるものを求める。
//!
//! 選択の順序（全順序）:
//! 1. スコア合計が大きい
//! 2. ブロック数が少ない
//! 3. 切れ目の位置列が辞書順で小さい（左の切れ目が優先）
//!
//! スコアは辞書読み込み時に固定小数点の整数へ変換済みで、
//! 合計と比較は整数で行う（小数6桁で等しいスコアは常に同点）。

use std::cmp::Ordering;

use serde::Serialize;

use crate::errors::{CheckError, Result};
use crate::lexicon::{self, LexiconIndex};
use crate::reading::{self, Syllable};
use crate::suppressed::SuppressedSyllableSet;

/// 探索方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStrategy {
    /// 区間テーブルによる動的計画法（O(n²) 区間）
    #[default]
    Table,
    /// 全分割の列挙（照合用）
    Exhaustive,
}

/// 分割結果の1ブロック
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    /// ブロックの読み（区切り文字で結合済み）
    pub reading: String,
    /// 最上位候補の表層
    pub value: String,
    pub score: f64,
    /// 音節位置 `start..end`
    pub start: usize,
    pub end: usize,
}

impl Segment {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// 最良分割
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segmentation {
    /// 各ブロックの表層を左から連結したもの
    pub surface: String,
    pub score: f64,
    /// スコア合計の固定小数点値
    #[serde(skip)]
    pub units: i64,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, Copy)]
struct Block {
    start: usize,
    end: usize,
    units: i64,
}

#[derive(Debug, Clone)]
struct Composition {
    blocks: Vec<Block>,
    units: i64,
}

impl Composition {
    fn new(blocks: Vec<Block>) -> Self {
        let units = blocks.iter().map(|b| b.units).sum();
        Self { blocks, units }
    }

    fn concat(&self, rhs: &Self) -> Self {
        Self::new(self.blocks.iter().chain(&rhs.blocks).copied().collect())
    }

    fn cuts(&self) -> impl Iterator<Item = usize> + '_ {
        let last = self.blocks.len().saturating_sub(1);
        self.blocks[..last].iter().map(|b| b.end)
    }

    /// `other` より優先されるか
    fn outranks(&self, other: &Self) -> bool {
        match self.units.cmp(&other.units) {
            Ordering::Greater => return true,
            Ordering::Less => return false,
            Ordering::Equal => {}
        }
        match self.blocks.len().cmp(&other.blocks.len()) {
            Ordering::Less => return true,
            Ordering::Greater => return false,
            Ordering::Equal => {}
        }
        self.cuts().lt(other.cuts())
    }
}

fn keep_better(slot: &mut Option<Composition>, candidate: Composition) {
    if slot.as_ref().map_or(true, |current| candidate.outranks(current)) {
        *slot = Some(candidate);
    }
}

/// 分割探索器
///
/// 辞書と抑制音節集合を借用するだけで状態を持たないため、
/// 複数スレッドから同時に使える。
#[derive(Debug, Clone, Copy)]
pub struct Segmenter<'a> {
    lexicon: &'a LexiconIndex,
    suppressed: &'a SuppressedSyllableSet,
    strategy: SearchStrategy,
}

impl<'a> Segmenter<'a> {
    pub fn new(lexicon: &'a LexiconIndex, suppressed: &'a SuppressedSyllableSet) -> Self {
        Self {
            lexicon,
            suppressed,
            strategy: SearchStrategy::Table,
        }
    }

    pub fn with_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// 最良分割を求める
    ///
    /// 合法な分割が1つもなければ `NoSegmentation`。
    pub fn segment(&self, syllables: &[Syllable]) -> Result<Segmentation> {
        let best = match syllables.len() {
            0 => None,
            _ => match self.strategy {
                SearchStrategy::Table => self.search_table(syllables)?,
                SearchStrategy::Exhaustive => self.search_exhaustive(syllables)?,
            },
        };

        match best {
            Some(composition) => self.materialize(syllables, composition),
            None => Err(CheckError::NoSegmentation(reading::join(
                syllables,
                self.lexicon.delimiter(),
            ))),
        }
    }

    /// `start..end` を1ブロックとして使えるなら、そのブロックを返す
    ///
    /// 1音節ブロックは読み全体が1音節の場合を除き、抑制音節なら不可。
    fn block(&self, syllables: &[Syllable], start: usize, end: usize) -> Result<Option<Block>> {
        let span = &syllables[start..end];
        if !self.lexicon.contains(span) {
            return Ok(None);
        }
        if span.len() == 1 && syllables.len() > 1 && self.suppressed.contains(&span[0]) {
            return Ok(None);
        }
        let best = self.lexicon.best(span)?;
        Ok(Some(Block {
            start,
            end,
            units: best.units,
        }))
    }

    /// 区間テーブル `table[i][j]`（i..=j の最良分割）を区間長の昇順に埋める
    fn search_table(&self, syllables: &[Syllable]) -> Result<Option<Composition>> {
        let n = syllables.len();
        let mut table: Vec<Vec<Option<Composition>>> = vec![vec![None; n]; n];

        for len in 1..=n {
            for i in 0..=(n - len) {
                let j = i + len - 1;
                let mut best = self.block(syllables, i, j + 1)?.map(|b| Composition::new(vec![b]));

                for k in i..j {
                    if let (Some(left), Some(right)) = (&table[i][k], &table[k + 1][j]) {
                        keep_better(&mut best, left.concat(right));
                    }
                }
                table[i][j] = best;
            }
        }

        Ok(table[0][n - 1].take())
    }

    /// 合法な分割を全て列挙して最良を選ぶ
    fn search_exhaustive(&self, syllables: &[Syllable]) -> Result<Option<Composition>> {
        let mut best = None;
        let mut prefix = Vec::with_capacity(syllables.len());
        self.enumerate(syllables, 0, &mut prefix, &mut best)?;
        Ok(best)
    }

    fn enumerate(
        &self,
        syllables: &[Syllable],
        start: usize,
        prefix: &mut Vec<Block>,
        best: &mut Option<Composition>,
    ) -> Result<()> {
        if start == syllables.len() {
            keep_better(best, Composition::new(prefix.clone()));
            return Ok(());
        }
        for end in (start + 1)..=syllables.len() {
            if let Some(block) = self.block(syllables, start, end)? {
                prefix.push(block);
                self.enumerate(syllables, end, prefix, best)?;
                prefix.pop();
            }
        }
        Ok(())
    }

    fn materialize(&self, syllables: &[Syllable], composition: Composition) -> Result<Segmentation> {
        let delimiter = self.lexicon.delimiter();
        let mut surface = String::new();
        let mut segments = Vec::with_capacity(composition.blocks.len());

        for block in &composition.blocks {
            let span = &syllables[block.start..block.end];
            let best = self.lexicon.best(span)?;
            surface.push_str(&best.value);
            segments.push(Segment {
                reading: reading::join(span, delimiter),
                value: best.value.clone(),
                score: best.score,
                start: block.start,
                end: block.end,
            });
        }

        Ok(Segmentation {
            surface,
            score: lexicon::from_units(composition.units),
            units: composition.units,
            segments,
        })
    }
}

#[cfg(test)]
mod tests {
    use rand::prelude::*;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::lexicon::LoadOptions;

    fn lexicon(text: &str) -> LexiconIndex {
        LexiconIndex::from_text(text, &LoadOptions::default()).unwrap()
    }

    fn syl(text: &str) -> Vec<String> {
        text.split('-').map(str::to_string).collect()
    }

    fn spans(seg: &Segmentation) -> Vec<&str> {
        seg.segments.iter().map(|s| s.reading.as_str()).collect()
    }

    const AB: &str = "A-B X -5.0\nA p -2.0\nB q -2.0\n";

    #[test]
    fn test_suppressed_head_blocks_split() {
        let lex = lexicon(AB);
        let suppressed = SuppressedSyllableSet::from_syllables(["A"]);
        let seg = Segmenter::new(&lex, &suppressed).segment(&syl("A-B")).unwrap();

        assert_eq!(seg.surface, "X");
        assert_eq!(seg.score, -5.0);
        assert_eq!(spans(&seg), vec!["A-B"]);
    }

    #[test]
    fn test_split_beats_whole_block() {
        let lex = lexicon(AB);
        let suppressed = SuppressedSyllableSet::empty();
        let seg = Segmenter::new(&lex, &suppressed).segment(&syl("A-B")).unwrap();

        assert_eq!(seg.surface, "pq");
        assert_eq!(seg.score, -4.0);
        assert_eq!(spans(&seg), vec!["A", "B"]);
    }

    #[test]
    fn test_three_syllables_partial_suppression() {
        let lex = lexicon("A-B-C Y -7.0\nA-B m -3.0\nC n -1.0\nA a -0.5\nB b -0.5\n");
        let suppressed = SuppressedSyllableSet::from_syllables(["A"]);
        let seg = Segmenter::new(&lex, &suppressed).segment(&syl("A-B-C")).unwrap();

        assert_eq!(seg.surface, "mn");
        assert_eq!(seg.score, -4.0);
        assert_eq!(spans(&seg), vec!["A-B", "C"]);
    }

    #[test]
    fn test_single_syllable_ignores_suppression() {
        let lex = lexicon(AB);
        let suppressed = SuppressedSyllableSet::from_syllables(["A"]);
        let seg = Segmenter::new(&lex, &suppressed).segment(&syl("A")).unwrap();

        assert_eq!(seg.surface, "p");
        assert_eq!(seg.score, -2.0);
    }

    #[test]
    fn test_no_segmentation() {
        let lex = lexicon(AB);
        let suppressed = SuppressedSyllableSet::from_syllables(["A"]);
        let segmenter = Segmenter::new(&lex, &suppressed);

        match segmenter.segment(&syl("A-Z")) {
            Err(CheckError::NoSegmentation(key)) => assert_eq!(key, "A-Z"),
            other => panic!("unexpected: {:?}", other),
        }
        // A は抑制、B-A は辞書にない
        assert!(matches!(
            segmenter.segment(&syl("B-A")),
            Err(CheckError::NoSegmentation(_))
        ));
        assert!(matches!(segmenter.segment(&[]), Err(CheckError::NoSegmentation(_))));
    }

    #[test]
    fn test_tie_prefers_fewer_blocks() {
        let lex = lexicon("A-B-C W -6.0\nA-B u -3.0\nC v -3.0\n");
        let suppressed = SuppressedSyllableSet::empty();

        for strategy in [SearchStrategy::Table, SearchStrategy::Exhaustive] {
            let seg = Segmenter::new(&lex, &suppressed)
                .with_strategy(strategy)
                .segment(&syl("A-B-C"))
                .unwrap();
            assert_eq!(seg.surface, "W");
            assert_eq!(seg.segments.len(), 1);
        }
    }

    #[test]
    fn test_tie_prefers_leftmost_cut() {
        let lex = lexicon("A-B u -2.0\nC v -2.0\nA s -2.0\nB-C t -2.0\n");
        let suppressed = SuppressedSyllableSet::empty();

        for strategy in [SearchStrategy::Table, SearchStrategy::Exhaustive] {
            let seg = Segmenter::new(&lex, &suppressed)
                .with_strategy(strategy)
                .segment(&syl("A-B-C"))
                .unwrap();
            assert_eq!(spans(&seg), vec!["A", "B-C"]);
            assert_eq!(seg.surface, "st");
        }
    }

    #[test]
    fn test_long_reading_without_ceiling() {
        // 8音節、2音節語の連続が最良
        let text = "A-B x -1.0\nA a -1.0\nB b -1.0\nA-B-A-B-A-B-A-B z -10.0\n";
        let lex = lexicon(text);
        let suppressed = SuppressedSyllableSet::empty();
        let seg = Segmenter::new(&lex, &suppressed)
            .segment(&syl("A-B-A-B-A-B-A-B"))
            .unwrap();

        assert_eq!(seg.surface, "xxxx");
        assert_eq!(seg.score, -4.0);
        assert_eq!(seg.segments.len(), 4);
    }

    #[test]
    fn test_segments_cover_reading() {
        let lex = lexicon("A-B-C Y -9.0\nA-B m -3.0\nC n -1.0\nB-C o -1.0\nA a -1.0\nB b -2.0\n");
        let suppressed = SuppressedSyllableSet::empty();
        let seg = Segmenter::new(&lex, &suppressed).segment(&syl("A-B-C")).unwrap();

        let mut pos = 0;
        for s in &seg.segments {
            assert_eq!(s.start, pos);
            assert!(!s.is_empty());
            pos = s.end;
        }
        assert_eq!(pos, 3);
        assert_eq!(seg.surface, "ao");
        assert_eq!(seg.score, -2.0);
    }

    /// ランダムな辞書で区間テーブルと全列挙の結果が一致することを確認
    ///
    /// `score` は 1..=40 の整数からスコア文字列を作る。
    fn cross_check(seed: u64, rounds: usize, score: fn(u32) -> String) {
        let alphabet = ["A", "B", "C"];
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        for _ in 0..rounds {
            let mut text = String::new();
            for len in 1..=4 {
                let mut readings = vec![Vec::<&str>::new()];
                for _ in 0..len {
                    readings = readings
                        .into_iter()
                        .flat_map(|r| {
                            alphabet.iter().map(move |s| {
                                let mut next = r.clone();
                                next.push(*s);
                                next
                            })
                        })
                        .collect();
                }
                for r in readings {
                    if !rng.gen_bool(0.5) {
                        continue;
                    }
                    for c in 0..rng.gen_range(1..=2) {
                        let n = rng.gen_range(1..=40);
                        text.push_str(&format!("{} {}{} {}\n", r.join("-"), r.concat(), c, score(n)));
                    }
                }
            }
            let lex = lexicon(&text);
            let suppressed = if rng.gen_bool(0.5) {
                SuppressedSyllableSet::from_syllables([alphabet[rng.gen_range(0..3)]])
            } else {
                SuppressedSyllableSet::empty()
            };

            let table = Segmenter::new(&lex, &suppressed);
            let exhaustive = table.with_strategy(SearchStrategy::Exhaustive);

            for _ in 0..10 {
                let len = rng.gen_range(1..=6);
                let target: Vec<String> = (0..len)
                    .map(|_| alphabet[rng.gen_range(0..3)].to_string())
                    .collect();

                match (table.segment(&target), exhaustive.segment(&target)) {
                    (Ok(a), Ok(b)) => {
                        assert_eq!(a, b, "target {:?}", target);
                        for s in &a.segments {
                            if s.len() == 1 && len > 1 {
                                assert!(!suppressed.contains(&s.reading));
                            }
                        }
                    }
                    (Err(CheckError::NoSegmentation(_)), Err(CheckError::NoSegmentation(_))) => {}
                    (a, b) => panic!("diverged on {:?}: {:?} vs {:?}", target, a, b),
                }
            }
        }
    }

    #[test]
    fn test_table_matches_exhaustive() {
        cross_check(42, 200, |n| format!("{:.2}", -(n as f64) * 0.25));
    }

    /// 小数1桁のスコアは浮動小数点の和では同点にならないことが多い
    #[test]
    fn test_table_matches_exhaustive_decimal_scores() {
        cross_check(7, 500, |n| format!("-{}.{}", n / 10, n % 10));
    }

    #[test]
    fn test_decimal_tie_prefers_fewer_blocks() {
        let lex = lexicon("A-B X -0.8\nA p -0.7\nB q -0.1\nA-B-C W -0.9\nC r -0.1\n");
        let suppressed = SuppressedSyllableSet::empty();

        for strategy in [SearchStrategy::Table, SearchStrategy::Exhaustive] {
            let segmenter = Segmenter::new(&lex, &suppressed).with_strategy(strategy);

            let seg = segmenter.segment(&syl("A-B")).unwrap();
            assert_eq!(seg.surface, "X");
            assert_eq!(seg.units, -800_000);
            assert_eq!(seg.score, -0.8);

            // W = X + r = p + q + r
            let seg = segmenter.segment(&syl("A-B-C")).unwrap();
            assert_eq!(spans(&seg), vec!["A-B-C"]);
            let seg = segmenter.segment(&syl("A-B-C-C")).unwrap();
            assert_eq!(spans(&seg), vec!["A-B-C", "C"]);
            assert_eq!(seg.units, -1_000_000);
        }
    }
}
