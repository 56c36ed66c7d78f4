//! Tree Digest CLI
//!
//! Prints the structure and text content of a file or directory.

use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::{error, info};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tree_digest::{
    OutcomeKind, PreferencesStore, ProgressReporter, ScanErrorKind, ScanEvent, ScanOutcome,
    ScanRequest, ScanSession, ScanSummary, Theme, Transcript,
};

const ABOUT: &str = r#"
Tree Digest - 目录结构与文本内容汇总工具

使用示例:
  tree_digest scan -r /path/to/project              输出结构与文件内容
  tree_digest scan -r /project --no-content         只输出文件结构
  tree_digest scan -r /project --max-depth 2        最多进入2层子目录
  tree_digest scan -r /project --default-ignores    忽略 .git、node_modules 等目录
  tree_digest scan -r /project -o digest.txt        保存到文件
  tree_digest theme toggle                          切换深色/浅色主题
"#;

/// Directory structure and content digester
#[derive(Parser)]
#[command(name = "tree_digest")]
#[command(author, version, about = ABOUT, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// 扫描文件或目录
    Scan {
        /// 扫描的文件或目录
        #[arg(short = 'r', long, help = "扫描的文件或目录")]
        root: PathBuf,

        /// 不读取文件内容
        #[arg(long, help = "只显示文件结构与文件名，不读取内容")]
        no_content: bool,

        /// 最大文件数
        #[arg(long, default_value_t = tree_digest::config::DEFAULT_MAX_FILES, help = "最多处理的文件数")]
        max_files: u64,

        /// 最大扫描深度
        #[arg(long, default_value_t = tree_digest::config::DEFAULT_MAX_DEPTH, help = "递归扫描的最大深度")]
        max_depth: usize,

        /// 忽略的目录名
        #[arg(long = "ignore", help = "忽略的目录名，可多次指定")]
        ignore: Vec<String>,

        /// 使用默认忽略目录
        #[arg(long, help = "忽略 .git、node_modules、target 等常见目录")]
        default_ignores: bool,

        /// 输出文件
        #[arg(short = 'o', long, help = "将结果保存到文本文件")]
        output: Option<PathBuf>,

        /// 以 JSON 格式输出结果
        #[arg(long, help = "输出JSON格式的扫描结果")]
        json: bool,

        /// 输出进度
        #[arg(long, help = "向标准错误输出JSON进度信息")]
        progress: bool,
    },
    /// 查看或切换主题
    Theme {
        #[arg(value_enum, default_value_t = ThemeAction::Show)]
        action: ThemeAction,

        /// 偏好设置数据库路径
        #[arg(short = 'd', long, default_value = "tree_digest.db", help = "SQLite偏好设置文件路径")]
        db: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ThemeAction {
    Show,
    Light,
    Dark,
    Toggle,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    outcomes: &'a [ScanOutcome],
    summary: Option<&'a ScanSummary>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Scan {
            root,
            no_content,
            max_files,
            max_depth,
            ignore,
            default_ignores,
            output,
            json,
            progress,
        }) => {
            let mut builder = ScanRequest::builder()
                .root(root)
                .extract_content(!no_content)
                .max_files(max_files)
                .max_depth(max_depth);
            if default_ignores {
                builder = builder.ignore_dirs(ScanRequest::default_ignore_dirs());
            }
            for dir in ignore {
                builder = builder.add_ignore_dir(dir);
            }
            run_scan(builder.build(), output, json, progress)
        }
        Some(Commands::Theme { action, db }) => run_theme(action, &db),
        None => {
            println!("{}", ABOUT);
            println!("使用 'tree_digest scan -h' 查看扫描命令的详细帮助");
            ExitCode::SUCCESS
        }
    }
}

fn run_scan(request: ScanRequest, output: Option<PathBuf>, json: bool, progress: bool) -> ExitCode {
    info!("Root: {:?}", request.root);
    info!("Extract content: {}", request.extract_content);
    info!("Max files: {}, max depth: {}", request.max_files, request.max_depth);

    let reporter = ProgressReporter::new(progress, 200);
    let mut session = ScanSession::new(request.clone());
    let started = match session.start_request(request.clone()) {
        Ok(started) => started,
        Err(e) if e.kind == ScanErrorKind::NothingToScan => {
            println!("{}", e.message);
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            error!("{}", e);
            reporter.report_error(&e);
            return ExitCode::FAILURE;
        }
    };
    reporter.report_start(&request, started.expected);

    let mut transcript = Transcript::begin(String::new(), request.extract_content);
    let mut outcomes = Vec::new();
    let mut summary = None;
    let mut last_name = String::new();

    for event in started.events.iter() {
        match event {
            ScanEvent::Outcome(outcome) => {
                if outcome.kind != OutcomeKind::Structure {
                    last_name.clone_from(&outcome.name);
                }
                transcript.apply(&outcome);
                if json {
                    outcomes.push(outcome);
                }
            }
            ScanEvent::Progress(count) => {
                reporter.report_progress(count, started.expected, &last_name);
            }
            ScanEvent::Finished(done) => {
                for err in &done.errors {
                    reporter.report_error(err);
                }
                reporter.report_done(&done);
                summary = Some(done);
                break;
            }
        }
    }
    session.join();

    if json {
        let report = JsonReport {
            outcomes: &outcomes,
            summary: summary.as_ref(),
        };
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                error!("Failed to serialize report: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else if let Some(path) = &output {
        if let Err(e) = transcript.save(path) {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
        println!("内容已保存到 {}", path.display());
    } else {
        print!("{}", transcript.as_str());
    }

    if let Some(summary) = &summary {
        let stats = transcript.stats();
        eprintln!("扫描完成 ({}):", summary.phase.as_str());
        eprintln!("  已处理文件: {}", summary.visited_files);
        eprintln!("  已提取: {}", summary.extracted);
        eprintln!("  已跳过: {}", summary.skipped);
        eprintln!("  读取失败: {}", summary.read_errors);
        eprintln!("  行数: {}  字符数: {}", stats.lines, stats.chars);
        eprintln!("  耗时: {}ms", summary.duration_ms);
    }
    ExitCode::SUCCESS
}

fn run_theme(action: ThemeAction, db: &Path) -> ExitCode {
    let store = match PreferencesStore::open(db) {
        Ok(store) => store,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let result = match action {
        ThemeAction::Show => store.theme(),
        ThemeAction::Light => store.set_theme(Theme::Light).map(|_| Theme::Light),
        ThemeAction::Dark => store.set_theme(Theme::Dark).map(|_| Theme::Dark),
        ThemeAction::Toggle => store.toggle_theme(),
    };
    match result {
        Ok(theme) => {
            println!("{}", theme);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
