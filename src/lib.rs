//! 注音辞書の分割スコア整合性チェック
//!
//! コンパイル済み辞書の複数音節エントリについて、辞書内の短い読みへの
//! 分割がより高いスコアを得てしまうもの（デコーダーが作者の候補を
//! 出せないもの）を検出する。

pub mod checker;
pub mod errors;
pub mod lexicon;
pub mod reading;
pub mod report;
pub mod segmentation;
pub mod suppressed;

pub use checker::{CheckConfig, CheckReport, ConsistencyChecker, Finding, Mismatch};
pub use errors::{CheckError, Result};
pub use lexicon::{Candidate, LexiconIndex, LoadOptions};
pub use reading::Reading;
pub use segmentation::{SearchStrategy, Segmentation, Segmenter};
pub use suppressed::SuppressedSyllableSet;
