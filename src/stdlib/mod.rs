// パス: src/stdlib/mod.rs
// 役割: 式から呼べるネイティブ関数（fmt / os パッケージ、組み込みの print）をまとめる
// 意図: 環境構築と評価器が同じ関数表を参照し、メソッドの実体を型名から引けるようにする
// 関連ファイル: src/stdlib/fmt.rs, src/stdlib/os.rs, src/env.rs, src/evaluator.rs

pub mod fmt;
pub mod os;

use crate::value::{format_float_e, lossy, NativeFn, TypedValue, Value};

/// 名前付き型 `type_name` のメソッド `name` の実体。
pub fn method(type_name: &str, name: &str) -> Option<NativeFn> {
    match (type_name, name) {
        ("os.File", "Name") => Some(os::name),
        ("os.File", "WriteString") => Some(os::write_string),
        _ => None,
    }
}

/// 組み込みの `print` / `println` の出力文字列。
///
/// `println` は被演算子を空白で区切って改行を付け、`print` は区切らない。
pub fn print_builtin(values: &[TypedValue], newline: bool) -> String {
    let parts: Vec<String> = values.iter().map(|tv| runtime_repr(&tv.value)).collect();
    if newline {
        format!("{}\n", parts.join(" "))
    } else {
        parts.concat()
    }
}

/// ランタイムの素朴な表現。浮動小数は `+1.500000e+000` 形式、参照型はアドレス風に書く。
fn runtime_repr(v: &Value) -> String {
    match v {
        Value::Nil => "nil".into(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => runtime_float(*f),
        Value::String(s) => lossy(s).into_owned(),
        Value::Slice(items) => format!("[{}/{}]{:p}", items.len(), items.len(), items.as_ptr()),
        Value::Boxed(inner) => format!("({:p},{:p})", &inner.ty, &inner.value),
        Value::Func(f) => format!("{:p}", f.f as *const ()),
        other => format!("{:p}", other),
    }
}

fn runtime_float(f: f64) -> String {
    if f.is_nan() {
        return "NaN".into();
    }
    if f.is_infinite() {
        return if f > 0.0 { "+Inf" } else { "-Inf" }.into();
    }
    let s = format_float_e(f, 6, false);
    let (mant, exp) = s.split_once('e').unwrap_or((s.as_str(), "+00"));
    let (sign, digits) = exp.split_at(1);
    let mant = if mant.starts_with('-') {
        mant.to_string()
    } else {
        format!("+{mant}")
    };
    format!("{}e{}{:0>3}", mant, sign, digits)
}
