// パス: src/repl/config.rs
// 役割: コマンドライン引数と環境変数から REPL の設定を組み立てる
// 意図: プロンプト・履歴・シェル実行の有無を起動時に切り替えられるようにする
// 関連ファイル: src/bin/gorepl.rs, src/repl/cmd.rs, src/repl/line_editor.rs
use std::path::PathBuf;

use clap::Parser as ClapParser;

/// 履歴ファイルの場所を上書きする環境変数。
pub const HISTORY_ENV: &str = "GOREPL_HISTORY_FILE";
/// 既定の履歴ファイル（カレントディレクトリ）。
pub const DEFAULT_HISTORY_FILE: &str = ".replhistory";

#[derive(Debug, Clone, ClapParser)]
#[command(
    name = "gorepl",
    about = "Evaluates Go expressions one line at a time.",
    version
)]
pub struct ReplConfig {
    /// Prompt shown before each input line.
    #[arg(long, default_value = "go> ")]
    pub prompt: String,

    /// History file (overrides GOREPL_HISTORY_FILE and ./.replhistory).
    #[arg(long, value_name = "PATH")]
    pub history_file: Option<PathBuf>,

    /// Do not read or write a history file.
    #[arg(long, conflicts_with = "history_file")]
    pub no_history: bool,

    /// Disable the `!CMD` shell escape.
    #[arg(long)]
    pub no_shell: bool,

    /// Skip the intro message.
    #[arg(short, long)]
    pub quiet: bool,

    /// Evaluate EXPR and exit instead of starting the prompt (repeatable).
    #[arg(short, long = "eval", value_name = "EXPR")]
    pub eval: Vec<String>,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self {
            prompt: "go> ".into(),
            history_file: None,
            no_history: false,
            no_shell: false,
            quiet: false,
            eval: Vec::new(),
            verbose: 0,
        }
    }
}

impl ReplConfig {
    /// 使う履歴ファイル。`--history-file`、環境変数、既定値の順に決める。
    pub fn history_path(&self) -> Option<PathBuf> {
        self.history_path_with(std::env::var_os(HISTORY_ENV).map(PathBuf::from))
    }

    fn history_path_with(&self, from_env: Option<PathBuf>) -> Option<PathBuf> {
        if self.no_history {
            return None;
        }
        self.history_file
            .clone()
            .or(from_env.filter(|p| !p.as_os_str().is_empty()))
            .or_else(|| Some(PathBuf::from(DEFAULT_HISTORY_FILE)))
    }
}
