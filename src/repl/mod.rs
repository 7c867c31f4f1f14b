// パス: src/repl/mod.rs
// 役割: REPL モジュールのファサードと再公開
// 意図: 対話ループ・ディスパッチャ・設定だけを外へ見せ、内部の部品は隠す
// 関連ファイル: src/repl/cmd.rs, src/repl/dispatch.rs, src/bin/gorepl.rs
//! 対話環境を構成するモジュール群をまとめたファサード。
//!
//! - `cmd`: メインループとコマンド解釈
//! - `dispatch`: 1 行ごとの 構文解析 → 検査 → 評価 → 表示
//! - `config`: コマンドライン設定
//! - `printer`: 案内表示

use std::io;

use thiserror::Error;

pub mod cmd;
pub mod config;
pub mod dispatch;
mod line_editor;
mod printer;

pub use cmd::{run_batch, run_repl};
pub use config::ReplConfig;
pub use dispatch::{eval_line, Outcome};

/// プロセス全体を止める失敗。1 行ごとのエラーはディスパッチャが報告して回復する。
#[derive(Debug, Error)]
pub enum ReplError {
    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("{0} expression(s) failed")]
    Failed(usize),
}
