// パス: src/lib.rs
// 役割: クレートのルート。各段階のモジュールを束ねて公開する
// 意図: 構文解析・検査・評価・REPL を独立に使えるようにする
// 関連ファイル: src/ast.rs, src/parser/mod.rs, src/checker/mod.rs, src/evaluator.rs, src/repl/mod.rs
//! gorepl ルートモジュール
//!
//! 目的:
//! - Go の式を 1 行ずつ評価する対話環境を提供する。
//! - 字句解析から表示までの各段階を、個別に呼べる関数として公開する。
//!
//! 方針:
//! - コメント/ドキュメントは日本語、識別子は英語。
//! - 各段階は専用のエラー型を返し、REPL は段階ごとに報告して回復する。
//! - 環境は呼び出し側が所有し、引数で明示的に渡す。
#![allow(unexpected_cfgs)]
#![cfg_attr(coverage, feature(coverage_attribute))]

pub mod ast;
pub mod checker;
pub mod constant;
pub mod env;
pub mod errors;
pub mod evaluator;
pub mod lexer;
pub mod logging;
pub mod ops;
pub mod parser;
pub mod repl;
pub mod stdlib;
pub mod types;
pub mod universe;
pub mod value;

// 便利な再エクスポート（利用側から各段階の入口を直接参照できるようにする）
pub use crate::checker::check_expr;
pub use crate::env::make_env;
pub use crate::errors::*;
pub use crate::evaluator::eval_expr;
pub use crate::parser::parse_expr;
