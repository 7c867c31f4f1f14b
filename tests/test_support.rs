// パス: tests/test_support.rs
// 役割: 統合テスト共通の補助関数とアサーションを提供する
// 意図: 構文解析・検査・評価・ディスパッチの繰り返し操作を一元化しテストを簡潔に保つ
// 関連ファイル: tests/lexer_parser.rs, tests/checker.rs, tests/evaluator.rs, tests/dispatcher.rs
#![allow(dead_code)]
use gorepl::{
    ast,
    env::{make_env, Env},
    errors::{CheckError, EvalError},
    lexer,
    repl::{eval_line, Outcome},
    value::{inspect, CallCtx},
};

/// テストで使うプロセス引数。
pub const ARGS: [&str; 2] = ["prog", "x"];

pub fn test_env() -> Env {
    make_env(ARGS.iter().map(|s| s.to_string()).collect())
}

pub fn parse_expr(src: &str) -> ast::Expr {
    gorepl::parse_expr(src).expect("parse expr")
}

pub fn lex_kinds(src: &str) -> Vec<lexer::TokenKind> {
    lexer::lex(src)
        .expect("lex")
        .into_iter()
        .map(|t| t.kind)
        .collect()
}

/// 検査して結果の型を文字列で返す。
pub fn check_type(src: &str) -> String {
    let env = test_env();
    gorepl::check_expr(&parse_expr(src), &env)
        .unwrap_or_else(|errs| panic!("{src}: {:?}", errs))
        .ty
        .to_string()
}

pub fn check_errors(src: &str) -> Vec<CheckError> {
    let env = test_env();
    match gorepl::check_expr(&parse_expr(src), &env) {
        Ok(_) => Vec::new(),
        Err(errs) => errs,
    }
}

pub fn check_codes(src: &str) -> Vec<&'static str> {
    check_errors(src).iter().map(|e| e.code()).collect()
}

/// 検査と評価を通し、各値の表示形と標準出力を返す。
pub fn eval_with_output(src: &str) -> (Result<Vec<String>, EvalError>, String) {
    let env = test_env();
    let checked = gorepl::check_expr(&parse_expr(src), &env)
        .unwrap_or_else(|errs| panic!("{src}: {:?}", errs));
    let (mut out, mut err) = (Vec::new(), Vec::new());
    let result = {
        let mut ctx = CallCtx::new(&mut out, &mut err);
        gorepl::eval_expr(&checked, &env, &mut ctx)
    };
    (
        result.map(|vals| vals.iter().map(inspect).collect()),
        String::from_utf8(out).expect("utf8 output"),
    )
}

pub fn eval_strings(src: &str) -> Vec<String> {
    eval_with_output(src).0.expect("eval")
}

pub fn eval_one(src: &str) -> String {
    let mut vals = eval_strings(src);
    assert_eq!(vals.len(), 1, "{src}: expected one value, got {:?}", vals);
    vals.remove(0)
}

pub fn eval_error_code(src: &str) -> &'static str {
    eval_with_output(src).0.expect_err("eval error").code()
}

/// ディスパッチャを通した 1 行分の結果。
pub struct Transcript {
    pub outcome: Outcome,
    pub out: String,
    pub err: String,
}

/// 行をまたいで環境を持ち回るテスト用セッション。
pub struct Session {
    pub env: Env,
}

impl Session {
    pub fn new() -> Self {
        Self { env: test_env() }
    }

    pub fn run(&mut self, line: &str) -> Transcript {
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let outcome = eval_line(line, &mut self.env, &mut out, &mut err).expect("write to buffer");
        Transcript {
            outcome,
            out: String::from_utf8(out).expect("utf8 output"),
            err: String::from_utf8(err).expect("utf8 output"),
        }
    }

    /// `_` の表示形。
    pub fn underscore(&self) -> String {
        inspect(self.env.var("_").expect("_ is bound"))
    }
}
