// パス: src/value.rs
// 役割: 実行時の値表現と、REPL 表示用のインスペクタを定義する
// 意図: 評価器・標準ライブラリ・ディスパッチャが同じ値モデルを共有できるようにする
// 関連ファイル: src/evaluator.rs, src/stdlib/fmt.rs, src/repl/dispatch.rs
//! 値モデルと `inspect`
//!
//! 設計ノート:
//! - 整数はすべて `Int(i64)` で持ち、幅は静的型側で管理する（評価器が折り返す）。
//! - インタフェースに格納された値は動的型と一緒に `Boxed` へ包む。`nil` インタフェースは `Nil`。
//! - `nil` スライスも `Nil` で表し、空のスライスリテラル（`Slice(vec![])`）と区別する。

use std::fmt;
use std::io::Write;
use std::rc::Rc;

use crate::errors::EvalError;
use crate::types::Type;

/// ネイティブ関数の実体。メソッドの場合は受け手が先頭引数になる。
pub type NativeFn = fn(&mut CallCtx<'_>, &[Value]) -> Result<Vec<Value>, EvalError>;

/// ネイティブ関数に渡す出力先。
pub struct CallCtx<'a> {
    pub out: &'a mut dyn Write,
    pub err: &'a mut dyn Write,
}

impl<'a> CallCtx<'a> {
    pub fn new(out: &'a mut dyn Write, err: &'a mut dyn Write) -> Self {
        Self { out, err }
    }
}

/// 関数値（パッケージ関数またはメソッド値）。
#[derive(Clone)]
pub struct FuncValue {
    /// 表示用の修飾名（`fmt.Println`、`(*os.File).Name`）。
    pub name: String,
    pub f: NativeFn,
    pub recv: Option<Box<Value>>,
}

impl FuncValue {
    pub fn native(name: impl Into<String>, f: NativeFn) -> Self {
        Self {
            name: name.into(),
            f,
            recv: None,
        }
    }

    pub fn call(&self, ctx: &mut CallCtx<'_>, args: Vec<Value>) -> Result<Vec<Value>, EvalError> {
        match &self.recv {
            Some(recv) => {
                let mut full = Vec::with_capacity(args.len() + 1);
                full.push(recv.as_ref().clone());
                full.extend(args);
                (self.f)(ctx, &full)
            }
            None => (self.f)(ctx, &args),
        }
    }
}

impl fmt::Debug for FuncValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FuncValue({})", self.name)
    }
}

impl PartialEq for FuncValue {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.recv == other.recv
    }
}

/// `*os.File` が指すファイル。標準出力だけを扱う。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileHandle {
    Stdout,
}

impl FileHandle {
    pub fn name(self) -> &'static str {
        match self {
            FileHandle::Stdout => "/dev/stdout",
        }
    }
}

/// `env` を読んだ時点の環境の写し。
#[derive(Clone, Debug, PartialEq, Default)]
pub struct EnvSnapshot {
    pub name: String,
    pub path: String,
    pub vars: Vec<String>,
    pub consts: Vec<String>,
    pub funcs: Vec<String>,
    pub types: Vec<String>,
    pub pkgs: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Go の文字列はバイト列。UTF-8 として正しいとは限らない。
    String(Vec<u8>),
    Slice(Vec<Value>),
    Func(FuncValue),
    File(FileHandle),
    Env(Rc<EnvSnapshot>),
    /// 環境変数 `env` の格納値。読み出し時に `Env` へ実体化する。
    EnvSelf,
    /// `nil` でないエラー値。
    Error(String),
    Boxed(Box<TypedValue>),
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// スライスの要素列。`nil` スライスは空とみなす。
    pub fn as_slice(&self) -> Option<&[Value]> {
        match self {
            Value::Slice(items) => Some(items),
            Value::Nil => Some(&[]),
            _ => None,
        }
    }
}

/// 静的型付きの値。
#[derive(Clone, Debug, PartialEq)]
pub struct TypedValue {
    pub ty: Type,
    pub value: Value,
}

impl TypedValue {
    pub fn new(ty: Type, value: Value) -> Self {
        Self { ty, value }
    }

    pub fn nil() -> Self {
        Self::new(Type::NIL, Value::Nil)
    }

    /// インタフェース型の格納値へ変換する。インタフェース同士なら中身をそのまま渡す。
    pub fn into_interface(self) -> Value {
        match self.value {
            v @ (Value::Boxed(_) | Value::Nil) if self.ty.is_interface() => v,
            Value::Nil if self.ty == Type::NIL => Value::Nil,
            v => Value::Boxed(Box::new(TypedValue::new(self.ty, v))),
        }
    }

    /// インタフェースに包まれていれば中身（動的型と値）を取り出す。
    pub fn unboxed(&self) -> &TypedValue {
        match &self.value {
            Value::Boxed(inner) => inner.unboxed(),
            _ => self,
        }
    }
}

/// REPL が結果表示に使う人間向けの表現。
pub fn inspect(tv: &TypedValue) -> String {
    let tv = tv.unboxed();
    match &tv.value {
        Value::Nil => match &tv.ty {
            Type::Slice(_) => "[]".into(),
            _ => "<nil>".into(),
        },
        Value::Bool(b) => b.to_string(),
        Value::Int(v) => v.to_string(),
        Value::Float(f) => format_float_v(*f),
        Value::String(s) => quote_go(s),
        Value::Slice(items) => {
            let elem = tv.ty.elem().cloned().unwrap_or(Type::Interface);
            let parts: Vec<String> = items
                .iter()
                .map(|v| inspect(&TypedValue::new(elem.clone(), v.clone())))
                .collect();
            format!("[{}]", parts.join(" "))
        }
        Value::Func(_) => tv.ty.to_string(),
        Value::File(h) => format!("&os.File{{name: {}}}", quote_go(h.name())),
        Value::Env(snap) => inspect_env(snap),
        Value::EnvSelf => "&eval.Env{}".into(),
        Value::Error(msg) => msg.clone(),
        Value::Boxed(inner) => inspect(inner),
    }
}

fn inspect_env(snap: &EnvSnapshot) -> String {
    format!(
        "&eval.Env{{Name: {}, Path: {}, Vars: [{}], Consts: [{}], Funcs: [{}], Types: [{}], Pkgs: [{}]}}",
        quote_go(&snap.name),
        quote_go(&snap.path),
        snap.vars.join(" "),
        snap.consts.join(" "),
        snap.funcs.join(" "),
        snap.types.join(" "),
        snap.pkgs.join(" "),
    )
}

/// `%v` と同じ規則で浮動小数を文字列化する（最短表現、指数 < -4 か >= 6 で指数形式）。
pub fn format_float_v(f: f64) -> String {
    format_float_g(f, None, false)
}

/// `%e` 形式（小数部 `prec` 桁）。
pub fn format_float_e(f: f64, prec: usize, upper: bool) -> String {
    if let Some(s) = special_float(f) {
        return s;
    }
    let sci = format!("{:.*e}", prec, f);
    let (mant, exp) = split_exponent(&sci);
    let e = if upper { 'E' } else { 'e' };
    format!("{}{}{}", mant, e, exponent_suffix(exp))
}

/// `%g` 形式（有効桁 `prec` 桁、末尾の 0 は削る）。`prec` が `None` なら最短表現。
pub fn format_float_g(f: f64, prec: Option<usize>, upper: bool) -> String {
    if let Some(s) = special_float(f) {
        return s;
    }
    let Some(p) = prec else {
        let s = format_float_shortest_g(f);
        return if upper { s.to_uppercase() } else { s };
    };
    let p = p.max(1);
    let sci = format!("{:.*e}", p - 1, f);
    let (mant, exp) = split_exponent(&sci);
    let e = if upper { 'E' } else { 'e' };
    if exp < -4 || exp >= p as i32 {
        format!("{}{}{}", trim_fraction(mant), e, exponent_suffix(exp))
    } else {
        let decimals = (p as i32 - 1 - exp).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, f)).to_string()
    }
}

fn format_float_shortest_g(f: f64) -> String {
    if f == 0.0 {
        return if f.is_sign_negative() { "-0" } else { "0" }.into();
    }
    let sci = format!("{:e}", f);
    let (mant, exp) = split_exponent(&sci);
    if !(-4..6).contains(&exp) {
        format!("{}e{}", mant, exponent_suffix(exp))
    } else {
        format!("{}", f)
    }
}

fn special_float(f: f64) -> Option<String> {
    if f.is_nan() {
        Some("NaN".into())
    } else if f.is_infinite() {
        Some(if f > 0.0 { "+Inf" } else { "-Inf" }.into())
    } else {
        None
    }
}

fn split_exponent(sci: &str) -> (&str, i32) {
    match sci.split_once('e') {
        Some((m, e)) => (m, e.parse().unwrap_or(0)),
        None => (sci, 0),
    }
}

/// 指数部を Go と同じ符号付き 2 桁以上で書く。
fn exponent_suffix(exp: i32) -> String {
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{}{:02}", sign, exp.abs())
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Go の `strconv.Quote` 相当。UTF-8 として不正なバイトは `\xNN` で書く。
pub fn quote_go(s: impl AsRef<[u8]>) -> String {
    let mut rest = s.as_ref();
    let mut out = String::with_capacity(rest.len() + 2);
    out.push('"');
    while !rest.is_empty() {
        let (valid, bad) = match std::str::from_utf8(rest) {
            Ok(all) => (all, None),
            Err(e) => {
                let (head, tail) = rest.split_at(e.valid_up_to());
                (std::str::from_utf8(head).unwrap_or_default(), tail.first().copied())
            }
        };
        for c in valid.chars() {
            push_escaped(&mut out, c, '"');
        }
        rest = &rest[valid.len()..];
        if let Some(b) = bad {
            out.push_str(&format!("\\x{:02x}", b));
            rest = &rest[1..];
        }
    }
    out.push('"');
    out
}

/// 表示用に UTF-8 へ寄せる。不正なバイトは U+FFFD になる。
pub fn lossy(bytes: &[u8]) -> std::borrow::Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

/// Go の `strconv.QuoteRune` 相当。
pub fn quote_rune(c: char) -> String {
    let mut out = String::from("'");
    push_escaped(&mut out, c, '\'');
    out.push('\'');
    out
}

fn push_escaped(out: &mut String, c: char, quote: char) {
    match c {
        '\u{07}' => out.push_str("\\a"),
        '\u{08}' => out.push_str("\\b"),
        '\u{0c}' => out.push_str("\\f"),
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        '\u{0b}' => out.push_str("\\v"),
        '\\' => out.push_str("\\\\"),
        c if c == quote => {
            out.push('\\');
            out.push(c);
        }
        c if (c as u32) < 0x20 || c as u32 == 0x7f => {
            out.push_str(&format!("\\x{:02x}", c as u32));
        }
        c if c.is_control() => {
            if (c as u32) < 0x10000 {
                out.push_str(&format!("\\u{:04x}", c as u32));
            } else {
                out.push_str(&format!("\\U{:08x}", c as u32));
            }
        }
        c => out.push(c),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// 浮動小数の `%v` 表現が指数の閾値で切り替わる。
    fn float_v_formatting() {
        assert_eq!(format_float_v(1.5), "1.5");
        assert_eq!(format_float_v(100000.0), "100000");
        assert_eq!(format_float_v(1e6), "1e+06");
        assert_eq!(format_float_v(1234567.0), "1.234567e+06");
        assert_eq!(format_float_v(123456.0), "123456");
        assert_eq!(format_float_v(0.0001), "0.0001");
        assert_eq!(format_float_v(0.00001), "1e-05");
        assert_eq!(format_float_v(f64::INFINITY), "+Inf");
        assert_eq!(format_float_v(-0.0), "-0");
    }

    #[test]
    /// `%e` と `%g` の精度付き表現。
    fn float_e_and_g() {
        assert_eq!(format_float_e(1234.5678, 2, false), "1.23e+03");
        assert_eq!(format_float_e(0.0, 6, true), "0.000000E+00");
        assert_eq!(format_float_g(1234.5678, Some(3), false), "1.23e+03");
        assert_eq!(format_float_g(3.14159, Some(3), false), "3.14");
        assert_eq!(format_float_g(100.0, Some(6), false), "100");
        assert_eq!(format_float_g(1e6, None, false), "1e+06");
        assert_eq!(format_float_g(123456.0, None, false), "123456");
    }

    #[test]
    /// 文字列と rune の Go 風クォート。
    fn quoting() {
        assert_eq!(quote_go("a\"b\n"), "\"a\\\"b\\n\"");
        assert_eq!(quote_go("é"), "\"é\"");
        assert_eq!(quote_go("\u{1}"), "\"\\x01\"");
        assert_eq!(quote_go([b'a', 0xff, 0xc3]), "\"a\\xff\\xc3\"");
        assert_eq!(quote_go("é".as_bytes()), "\"é\"");
        assert_eq!(quote_rune('\''), "'\\''");
        assert_eq!(quote_rune('x'), "'x'");
    }

    #[test]
    /// 代表的な値の `inspect` 表現。
    fn inspect_values() {
        let s = TypedValue::new(Type::STRING, Value::String("hi".into()));
        assert_eq!(inspect(&s), "\"hi\"");
        let xs = TypedValue::new(
            Type::slice_of(Type::STRING),
            Value::Slice(vec![Value::String("a".into()), Value::String("b".into())]),
        );
        assert_eq!(inspect(&xs), "[\"a\" \"b\"]");
        let file = TypedValue::new(Type::Interface, Value::File(FileHandle::Stdout));
        assert_eq!(inspect(&file), "&os.File{name: \"/dev/stdout\"}");
        assert_eq!(inspect(&TypedValue::nil()), "<nil>");
        let boxed = TypedValue::new(
            Type::Interface,
            Value::Boxed(Box::new(TypedValue::new(Type::INT, Value::Int(3)))),
        );
        assert_eq!(inspect(&boxed), "3");
    }
}
