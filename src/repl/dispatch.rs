// パス: src/repl/dispatch.rs
// 役割: 1 行の入力を 構文解析 → 静的検査 → 評価 → 表示 の順に処理し、`_` を更新する
// 意図: 各段階の失敗をその場で報告し、REPL のループを決して止めない
// 関連ファイル: src/parser/mod.rs, src/checker/mod.rs, src/evaluator.rs, src/repl/cmd.rs
//! 評価ディスパッチャ
//!
//! 失敗の報告はすべて `out` へ書き、`err` は組み込みの `print` / `println` の出力先にだけ使う。
//! `_` を書き換えるのは評価が 1 つ以上の値を返したときだけ。

use std::io::{self, Write};

use crate::checker::check_expr;
use crate::env::Env;
use crate::errors::format_error_pos;
use crate::evaluator::eval_expr;
use crate::parser::parse_expr;
use crate::types::Type;
use crate::value::{inspect, CallCtx, TypedValue, Value};

/// 1 行の処理がどの状態で終わったか。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    ParseError,
    /// 報告した検査エラーの件数。
    CheckError(usize),
    EvalError,
    /// 評価は成功したが値がなかった（`<nil>` を表示し `_` は変えない）。
    NoValue,
    /// 表示して `_` へ格納した値の個数。
    Values(usize),
}

/// 1 行を評価して結果を `out` に書く。
///
/// 戻り値の `Err` は出力先への書き込み失敗だけを表す。
pub fn eval_line(
    line: &str,
    env: &mut Env,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> io::Result<Outcome> {
    let expr = match parse_expr(line) {
        Ok(expr) => expr,
        Err(e) => {
            tracing::debug!(code = e.code(), "parse failed");
            if let Some((text, caret)) = format_error_pos(line, &e.0) {
                writeln!(out, "{}", text)?;
                writeln!(out, "{}", caret)?;
            }
            writeln!(out, "parse error: {}", e)?;
            return Ok(Outcome::ParseError);
        }
    };

    let checked = match check_expr(&expr, env) {
        Ok(checked) => checked,
        Err(errors) => {
            tracing::debug!(count = errors.len(), "check failed");
            for e in &errors {
                writeln!(out, "{}", e)?;
            }
            return Ok(Outcome::CheckError(errors.len()));
        }
    };

    let result = {
        let mut ctx = CallCtx::new(out, err);
        eval_expr(&checked, env, &mut ctx)
    };
    let values = match result {
        Ok(values) => values,
        Err(e) => {
            tracing::debug!(code = e.code(), "eval failed");
            writeln!(out, "eval error: {}", e)?;
            return Ok(Outcome::EvalError);
        }
    };

    if values.is_empty() {
        writeln!(out, "<nil>")?;
        return Ok(Outcome::NoValue);
    }
    let rendered: Vec<String> = values.iter().map(inspect).collect();
    writeln!(out, "{}", rendered.join(", "))?;
    let count = values.len();
    env.set_var("_", last_result(values));
    tracing::debug!(count, "stored result in _");
    Ok(Outcome::Values(count))
}

/// `_` に格納する値。複数の値は `[]interface {}` 1 つにまとめる。
fn last_result(mut values: Vec<TypedValue>) -> TypedValue {
    if values.len() == 1 {
        if let Some(single) = values.pop() {
            return single;
        }
    }
    let items = values.into_iter().map(TypedValue::into_interface).collect();
    TypedValue::new(Type::slice_of(Type::Interface), Value::Slice(items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::make_env;

    fn run(env: &mut Env, line: &str) -> (Outcome, String, String) {
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let outcome = eval_line(line, env, &mut out, &mut err).unwrap();
        (
            outcome,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    /// 単一の値は表示して `_` に入る。
    fn single_value_updates_underscore() {
        let mut env = make_env(vec!["prog".into()]);
        let (outcome, out, _) = run(&mut env, "1+2");
        assert_eq!(outcome, Outcome::Values(1));
        assert_eq!(out, "3\n");
        assert_eq!(
            env.var("_"),
            Some(&TypedValue::new(Type::INT, Value::Int(3)))
        );
        let (_, out, _) = run(&mut env, "_ * 2");
        assert_eq!(out, "6\n");
    }

    #[test]
    /// 構文エラーは問題の行とキャレットを出し、`_` を変えない。
    fn parse_error_reports_position() {
        let mut env = make_env(vec![]);
        run(&mut env, "7");
        let (outcome, out, _) = run(&mut env, "1 + )");
        assert_eq!(outcome, Outcome::ParseError);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "1 + )");
        assert_eq!(lines[1], "    ^");
        assert!(lines[2].starts_with("parse error: [PAR"));
        assert_eq!(env.var("_").map(|tv| tv.value.clone()), Some(Value::Int(7)));
    }

    #[test]
    /// 検査エラーは 1 行に 1 件ずつ並ぶ。
    fn check_errors_are_listed() {
        let mut env = make_env(vec![]);
        let (outcome, out, _) = run(&mut env, "undefinedName + alsoMissing");
        assert_eq!(outcome, Outcome::CheckError(2));
        assert_eq!(out.lines().count(), 2);
        assert!(out.lines().all(|l| l.starts_with("[CHK001]")));
        assert_eq!(env.var("_"), Some(&TypedValue::nil()));
    }

    #[test]
    /// 実行時エラーは `eval error:` を付けて報告する。
    fn eval_error_leaves_underscore() {
        let mut env = make_env(vec![]);
        run(&mut env, "0");
        let (outcome, out, _) = run(&mut env, "1 / _");
        assert_eq!(outcome, Outcome::EvalError);
        assert!(out.starts_with("eval error: [EVAL010]"));
        assert_eq!(env.var("_").map(|tv| tv.value.clone()), Some(Value::Int(0)));
    }

    #[test]
    /// 複数の値はカンマ区切りで表示し、`_` にはまとめて入る。
    fn multiple_values_are_aggregated() {
        let mut env = make_env(vec![]);
        let (outcome, out, _) = run(&mut env, "fmt.Println(\"hi\")");
        assert_eq!(outcome, Outcome::Values(2));
        assert_eq!(out, "hi\n3, <nil>\n");
        let underscore = env.var("_").cloned().unwrap();
        assert_eq!(underscore.ty.to_string(), "[]interface {}");
        assert_eq!(
            underscore.value,
            Value::Slice(vec![
                Value::Boxed(Box::new(TypedValue::new(Type::INT, Value::Int(3)))),
                Value::Nil,
            ])
        );
        let (_, out, _) = run(&mut env, "len(_)");
        assert_eq!(out, "2\n");
    }

    #[test]
    /// 値を返さない呼び出しは `<nil>` を表示し、`_` を変えない。
    fn no_value_call_prints_nil() {
        let mut env = make_env(vec![]);
        run(&mut env, "\"keep\"");
        let (outcome, out, err) = run(&mut env, "print(\"x\")");
        assert_eq!(outcome, Outcome::NoValue);
        assert_eq!(out, "<nil>\n");
        assert_eq!(err, "x");
        let (_, out, _) = run(&mut env, "_");
        assert_eq!(out, "\"keep\"\n");
    }
}
