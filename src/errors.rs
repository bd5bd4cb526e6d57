//! エラー型の定義
//!
//! 辞書の読み込みから整合性チェックまでに発生するエラーをまとめる。

use std::path::PathBuf;

/// このクレート専用のResult型
pub type Result<T, E = CheckError> = std::result::Result<T, E>;

/// 整合性チェックのエラー型
///
/// `NoSegmentation` だけはデータ異常として報告対象になり、
/// それ以外はすべて致命的なエラーとして扱う。
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    /// ファイルの読み書きに失敗
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 辞書の行形式が不正
    #[error("malformed line {line_no}: {reason}: {line:?}")]
    MalformedLine {
        line_no: usize,
        line: String,
        reason: String,
    },

    /// 辞書に存在しない読みを引いた（内部不変条件違反）
    #[error("lookup miss for reading '{0}'")]
    LookupMiss(String),

    /// 読み全体も細かい分割も辞書で構成できない
    #[error("no segmentation for reading '{0}'")]
    NoSegmentation(String),

    /// 抑制音節の設定ファイルが不正
    #[error("invalid suppressed syllable config: {0}")]
    InvalidConfig(String),

    /// JSONレポートの生成に失敗
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// 並列ワーカーの構築に失敗
    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl CheckError {
    pub(crate) fn io<P>(path: P, source: std::io::Error) -> Self
    where
        P: Into<PathBuf>,
    {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed<S>(line_no: usize, line: &str, reason: S) -> Self
    where
        S: Into<String>,
    {
        Self::MalformedLine {
            line_no,
            line: line.to_string(),
            reason: reason.into(),
        }
    }

    /// データ異常として報告すべきエラーかどうか
    pub fn is_anomaly(&self) -> bool {
        matches!(self, Self::NoSegmentation(_))
    }
}
