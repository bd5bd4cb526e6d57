//! 注音辞書スコア整合性チェックツール
//!
//! 複数音節エントリの最上位候補が、辞書内の短い読みへの分割に
//! スコアで負けていないかを検査する。

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use bpmf_score_checker::checker::{CheckConfig, CheckReport, ConsistencyChecker};
use bpmf_score_checker::lexicon::{LexiconIndex, LoadOptions};
use bpmf_score_checker::report::{self, RunInfo};
use bpmf_score_checker::segmentation::SearchStrategy;
use bpmf_score_checker::suppressed::SuppressedSyllableSet;

/// 探索方法
#[derive(ValueEnum, Debug, Clone, Copy)]
enum Strategy {
    /// 区間テーブル
    Table,
    /// 全分割の列挙（照合用、遅い）
    Exhaustive,
}

impl From<Strategy> for SearchStrategy {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Table => SearchStrategy::Table,
            Strategy::Exhaustive => SearchStrategy::Exhaustive,
        }
    }
}

/// 注音辞書スコア整合性チェックツール
#[derive(Parser, Debug, Clone)]
#[command(name = "bpmf_score_checker")]
#[command(about = "複数音節エントリが短い読みへの分割に負けていないか検査")]
struct Args {
    /// コンパイル済み辞書ファイルパス
    #[arg(default_value = "data.txt")]
    lexicon: PathBuf,

    /// 抑制音節リスト（JSON、未指定時は組み込みリスト）
    #[arg(long)]
    suppressed: Option<PathBuf>,

    /// チェックする最大音節数（未指定時は無制限）
    #[arg(long)]
    max_syllables: Option<usize>,

    /// 音節区切り文字
    #[arg(long, default_value_t = '-')]
    delimiter: char,

    /// 記号エントリの予約文字（この文字を含む行は読み飛ばす）
    #[arg(long, default_value_t = '_')]
    marker: char,

    /// 並列実行数（0=CPUコア数）
    #[arg(short, long, default_value_t = 0)]
    jobs: usize,

    /// 探索方法
    #[arg(long, value_enum, default_value_t = Strategy::Table)]
    search: Strategy,

    /// JSONレポート出力パス
    #[arg(long)]
    json: Option<PathBuf>,

    /// プログレスバーを表示しない
    #[arg(long, default_value_t = false)]
    no_progress: bool,

    /// デバッグログを出す
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

impl From<&Args> for LoadOptions {
    fn from(args: &Args) -> Self {
        Self {
            delimiter: args.delimiter,
            marker: args.marker,
        }
    }
}

impl From<&Args> for CheckConfig {
    fn from(args: &Args) -> Self {
        Self {
            max_syllables: args.max_syllables,
            strategy: args.search.into(),
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(&args) {
        Ok(report) if report.is_clean() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(1),
        Err(e) => {
            eprintln!("エラー: {:#}", e);
            ExitCode::from(2)
        }
    }
}

/// ログ出力を初期化（stderr、`RUST_LOG` で上書き可能）
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "bpmf_score_checker=debug"
    } else {
        "bpmf_score_checker=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(io::stderr)
        .init();
}

fn run(args: &Args) -> anyhow::Result<CheckReport> {
    // 辞書読み込み
    let lexicon = LexiconIndex::load(&args.lexicon, &LoadOptions::from(args))
        .with_context(|| format!("辞書の読み込みに失敗: {:?}", args.lexicon))?;
    eprintln!("{}\n", lexicon.summary());

    let suppressed = load_suppressed(args)?;
    tracing::info!(
        version = suppressed.version(),
        syllables = suppressed.len(),
        description = suppressed.description().unwrap_or("-"),
        "suppressed syllable set loaded"
    );

    let config = CheckConfig::from(args);
    let checker = ConsistencyChecker::new(&lexicon, &suppressed, config);
    let jobs = resolve_jobs(args.jobs);
    let show_progress = !args.no_progress && atty::is(atty::Stream::Stderr);

    let report = run_check(&checker, jobs, show_progress)?;

    // 食い違いは stdout、それ以外は stderr
    let mut out = io::stdout().lock();
    report::write_mismatches(&mut out, &report.mismatches).context("stdout への書き込みに失敗")?;
    out.flush()?;
    report::write_anomalies(&mut io::stderr().lock(), &report.anomalies)?;

    eprintln!("\n{}", report::summary(&report));

    if let Some(path) = &args.json {
        let info = RunInfo {
            lexicon: &args.lexicon,
            format: lexicon.format(),
            suppressed_version: suppressed.version(),
            strategy: args.search.into(),
            max_syllables: args.max_syllables,
        };
        report::export_json(&info, &report, path)?;
        eprintln!("レポートを保存: {:?}", path);
    }

    Ok(report)
}

/// 抑制音節リストを読み込む
fn load_suppressed(args: &Args) -> anyhow::Result<SuppressedSyllableSet> {
    match &args.suppressed {
        Some(path) => SuppressedSyllableSet::load(path)
            .with_context(|| format!("抑制音節リストの読み込みに失敗: {:?}", path)),
        None => Ok(SuppressedSyllableSet::builtin()?),
    }
}

/// 並列実行数を決める（CPUコア数が上限）
fn resolve_jobs(requested: usize) -> usize {
    let cpus = num_cpus::get();
    if requested == 0 {
        cpus
    } else {
        requested.min(cpus)
    }
}

/// チェック実行（プログレスバー）
fn run_check(
    checker: &ConsistencyChecker,
    jobs: usize,
    show_progress: bool,
) -> anyhow::Result<CheckReport> {
    let total = checker.targets().len();
    tracing::info!(readings = total, jobs, "checking readings");

    if !show_progress {
        return Ok(checker.check_all(jobs, || {})?);
    }

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} (Readings)")?
            .progress_chars("#>-"),
    );

    let report = checker.check_all(jobs, || pb.inc(1))?;
    pb.finish_and_clear();

    Ok(report)
}
