//! レポートモジュール
//!
//! チェック結果を行形式・サマリー・JSONで出力する。

use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;

use crate::checker::{Anomaly, CheckReport, Mismatch};
use crate::errors::{CheckError, Result};
use crate::segmentation::SearchStrategy;

/// 食い違い1件の出力行
///
/// 形式: `<作者の表層> <作者のスコア> <計算上の表層> <計算上のスコア>`
pub fn format_mismatch(m: &Mismatch) -> String {
    format!(
        "{} {:.6} {} {:.6}",
        m.authored_surface, m.authored_score, m.computed_surface, m.computed_score
    )
}

/// 異常1件の出力行
pub fn format_anomaly(a: &Anomaly) -> String {
    format!("! {} {}", a.reading, a.reason)
}

/// 食い違いを1行ずつ書き出す
pub fn write_mismatches<W: Write>(out: &mut W, mismatches: &[Mismatch]) -> io::Result<()> {
    for m in mismatches {
        writeln!(out, "{}", format_mismatch(m))?;
    }
    Ok(())
}

/// 異常を1行ずつ書き出す
pub fn write_anomalies<W: Write>(out: &mut W, anomalies: &[Anomaly]) -> io::Result<()> {
    for a in anomalies {
        writeln!(out, "{}", format_anomaly(a))?;
    }
    Ok(())
}

/// 集計のサマリー
pub fn summary(report: &CheckReport) -> String {
    let mut result = String::from("=== チェック結果 ===\n");
    result.push_str(&format!("  チェック数: {}\n", report.checked));
    result.push_str(&format!("  食い違い:   {}\n", report.mismatches.len()));
    result.push_str(&format!("  異常:       {}\n", report.anomalies.len()));

    if !report.by_length.is_empty() {
        result.push_str("\n音節数別:\n");
        for (len, stats) in &report.by_length {
            result.push_str(&format!(
                "  {:>2} 音節: {:>7} 件 / 食い違い {:>5} / 異常 {:>3}\n",
                len, stats.checked, stats.mismatches, stats.anomalies
            ));
        }
    }
    result
}

/// JSONレポートの実行情報
#[derive(Debug, Clone, Serialize)]
pub struct RunInfo<'a> {
    pub lexicon: &'a Path,
    pub format: Option<&'a str>,
    pub suppressed_version: u32,
    pub strategy: SearchStrategy,
    pub max_syllables: Option<usize>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    info: &'a RunInfo<'a>,
    #[serde(flatten)]
    report: &'a CheckReport,
}

/// JSON文字列を生成
pub fn to_json(info: &RunInfo, report: &CheckReport) -> Result<String> {
    let json = JsonReport { info, report };
    Ok(serde_json::to_string_pretty(&json)?)
}

/// JSONレポートをファイルに保存
pub fn export_json(info: &RunInfo, report: &CheckReport, path: &Path) -> Result<()> {
    let json = to_json(info, report)?;
    std::fs::write(path, json).map_err(|e| CheckError::io(path, e))
}
