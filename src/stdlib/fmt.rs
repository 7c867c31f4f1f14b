// パス: src/stdlib/fmt.rs
// 役割: `fmt.Println` / `fmt.Printf` と、その土台となる書式化（%v ほか各動詞）を実装する
// 意図: Go の fmt と同じ見た目（不一致の表示 `%!d(string=x)` を含む）で値を文字列化する
// 関連ファイル: src/stdlib/mod.rs, src/value.rs, src/env.rs
//! 書式化の実装メモ
//!
//! - 引数はインタフェースに格納された値（`Value::Boxed`）として届く。`nil` インタフェースは `Value::Nil`。
//! - 動詞は値の動的型に対して解釈する。スライスは `%v` `%T` 以外なら要素ごとに同じ動詞を適用する。
//! - 明示的な引数番号（`%[1]d`）は扱わない。

use crate::errors::EvalError;
use crate::types::{BasicKind, Type};
use crate::value::{
    format_float_e, format_float_g, format_float_v, lossy, quote_go, quote_rune, CallCtx, TypedValue,
    Value,
};

/// `fmt.Println(a ...interface{}) (n int, err error)`
pub fn println(ctx: &mut CallCtx<'_>, args: &[Value]) -> Result<Vec<Value>, EvalError> {
    let operands = operands(args.first());
    let parts: Vec<String> = operands.iter().map(format_v).collect();
    let text = format!("{}\n", parts.join(" "));
    write_out(ctx, "fmt.Println", &text)
}

/// `fmt.Printf(format string, a ...interface{}) (n int, err error)`
pub fn printf(ctx: &mut CallCtx<'_>, args: &[Value]) -> Result<Vec<Value>, EvalError> {
    let format = lossy(args.first().and_then(Value::as_bytes).unwrap_or_default());
    let operands = operands(args.get(1));
    let text = sprintf(&format, &operands);
    write_out(ctx, "fmt.Printf", &text)
}

fn write_out(ctx: &mut CallCtx<'_>, who: &str, text: &str) -> Result<Vec<Value>, EvalError> {
    ctx.out
        .write_all(text.as_bytes())
        .map_err(|e| EvalError::new("EVAL040", format!("{}: {}", who, e), None))?;
    Ok(vec![Value::Int(text.len() as i64), Value::Nil])
}

/// 可変長引数のスライスを、動的型付きの値の列へほどく。
fn operands(slice: Option<&Value>) -> Vec<TypedValue> {
    slice
        .and_then(Value::as_slice)
        .unwrap_or(&[])
        .iter()
        .map(|v| match v {
            Value::Boxed(inner) => inner.unboxed().clone(),
            _ => TypedValue::nil(),
        })
        .collect()
}

/// `%v` の表現。
pub fn format_v(tv: &TypedValue) -> String {
    let tv = tv.unboxed();
    match &tv.value {
        Value::Nil => match &tv.ty {
            Type::Slice(_) => "[]".into(),
            _ => "<nil>".into(),
        },
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => format_float_v(*f),
        Value::String(s) => lossy(s).into_owned(),
        Value::Slice(items) => {
            let elem = tv.ty.elem().cloned().unwrap_or(Type::Interface);
            let parts: Vec<String> = items
                .iter()
                .map(|v| format_v(&TypedValue::new(elem.clone(), v.clone())))
                .collect();
            format!("[{}]", parts.join(" "))
        }
        Value::Func(f) => format!("{:p}", f.f as *const ()),
        Value::File(h) => format!("&{{{}}}", h.name()),
        Value::Env(snap) => format!(
            "&{{{} {} [{}] [{}] [{}] [{}] [{}]}}",
            snap.name,
            snap.path,
            snap.vars.join(" "),
            snap.consts.join(" "),
            snap.funcs.join(" "),
            snap.types.join(" "),
            snap.pkgs.join(" "),
        ),
        Value::EnvSelf => "&{}".into(),
        Value::Error(msg) => msg.clone(),
        Value::Boxed(inner) => format_v(inner),
    }
}

/// `%#v` の表現（Go の構文に近い形）。
fn format_go_syntax(tv: &TypedValue) -> String {
    let tv = tv.unboxed();
    match &tv.value {
        Value::Nil => match &tv.ty {
            Type::Slice(_) | Type::Pointer(_) | Type::Func(_) => format!("{}(nil)", tv.ty),
            _ => "<nil>".into(),
        },
        Value::String(s) => quote_go(s),
        Value::Slice(items) => {
            let elem = tv.ty.elem().cloned().unwrap_or(Type::Interface);
            let parts: Vec<String> = items
                .iter()
                .map(|v| format_go_syntax(&TypedValue::new(elem.clone(), v.clone())))
                .collect();
            format!("{}{{{}}}", tv.ty, parts.join(", "))
        }
        Value::Int(i) if tv.ty.basic().is_some_and(BasicKind::is_unsigned) => format!("0x{:x}", i),
        Value::File(h) => format!("&os.File{{name:{}}}", quote_go(h.name())),
        _ => format_v(tv),
    }
}

/// 動詞の前に書かれるフラグ・幅・精度。
#[derive(Clone, Copy, Debug, Default)]
struct Spec {
    minus: bool,
    plus: bool,
    sharp: bool,
    zero: bool,
    space: bool,
    width: Option<usize>,
    prec: Option<usize>,
}

/// 幅と精度の上限。これを超える数は書式の誤りとして扱う。
const MAX_FIELD: usize = 1_000_000;

/// Go の `fmt.Sprintf` 相当。
pub fn sprintf(format: &str, args: &[TypedValue]) -> String {
    let mut out = String::with_capacity(format.len() + 16);
    let mut next = 0usize;
    let mut chars = format.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let mut spec = Spec::default();
        while let Some(&f) = chars.peek() {
            match f {
                '-' => spec.minus = true,
                '+' => spec.plus = true,
                '#' => spec.sharp = true,
                '0' => spec.zero = true,
                ' ' => spec.space = true,
                _ => break,
            }
            chars.next();
        }
        if chars.peek() == Some(&'*') {
            chars.next();
            match args
                .get(next)
                .and_then(|tv| tv.unboxed().value.as_int())
                .filter(|w| w.unsigned_abs() <= MAX_FIELD as u64)
            {
                Some(w) => {
                    if w < 0 {
                        spec.minus = true;
                    }
                    spec.width = Some(w.unsigned_abs() as usize);
                }
                None => out.push_str("%!(BADWIDTH)"),
            }
            next += 1;
        } else {
            spec.width = take_number(&mut chars);
        }
        if chars.peek() == Some(&'.') {
            chars.next();
            if chars.peek() == Some(&'*') {
                chars.next();
                match args.get(next).and_then(|tv| tv.unboxed().value.as_int()) {
                    Some(p) if p >= 0 && p as u64 <= MAX_FIELD as u64 => {
                        spec.prec = Some(p as usize)
                    }
                    _ => out.push_str("%!(BADPREC)"),
                }
                next += 1;
            } else {
                spec.prec = Some(take_number(&mut chars).unwrap_or(0));
            }
        }
        let Some(verb) = chars.next() else {
            out.push_str("%!(NOVERB)");
            break;
        };
        if verb == '%' {
            out.push('%');
            continue;
        }
        match args.get(next) {
            Some(arg) => {
                out.push_str(&format_arg(verb, spec, arg));
                next += 1;
            }
            None => out.push_str(&format!("%!{}(MISSING)", verb)),
        }
    }
    if next < args.len() {
        let extra: Vec<String> = args[next..]
            .iter()
            .map(|tv| {
                let tv = tv.unboxed();
                match tv.value {
                    Value::Nil if tv.ty.is_interface() || tv.ty == Type::NIL => "<nil>".into(),
                    _ => format!("{}={}", tv.ty, format_v(tv)),
                }
            })
            .collect();
        out.push_str(&format!("%!(EXTRA {})", extra.join(", ")));
    }
    out
}

/// 10 進の数を読む。大きすぎる数なら残りの書式を読み捨て、動詞なしとして扱わせる。
fn take_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<usize> {
    let mut n: Option<usize> = None;
    while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
        let acc = n.unwrap_or(0);
        if acc > MAX_FIELD {
            chars.for_each(drop);
            return None;
        }
        n = Some(acc * 10 + d as usize);
        chars.next();
    }
    n
}

/// 1 つの引数を動詞 `verb` で書式化し、幅に合わせて埋める。
fn format_arg(verb: char, spec: Spec, arg: &TypedValue) -> String {
    let tv = arg.unboxed();
    if verb == 'T' {
        let s = match (&tv.value, &tv.ty) {
            (Value::Nil, t) if t.is_interface() || *t == Type::NIL => "<nil>".to_string(),
            (_, t) => t.to_string(),
        };
        return pad(s, spec);
    }
    if verb == 'v' {
        let s = if spec.sharp {
            format_go_syntax(tv)
        } else {
            match tv.value {
                Value::Int(i) => return format_int(i, 10, false, spec),
                Value::Float(f) => return format_float('g', f, spec),
                _ => format_v(tv),
            }
        };
        return pad(s, spec);
    }
    let is_bytes = tv.ty == Type::slice_of(Type::BYTE);
    match (&tv.value, verb) {
        (Value::Slice(_) | Value::Nil, 's' | 'q' | 'x' | 'X') if is_bytes => {
            let bytes: Vec<u8> = tv
                .value
                .as_slice()
                .unwrap_or(&[])
                .iter()
                .filter_map(Value::as_int)
                .map(|b| b as u8)
                .collect();
            format_arg(verb, spec, &TypedValue::new(Type::STRING, Value::String(bytes)))
        }
        (Value::Nil, _) if matches!(tv.ty, Type::Slice(_)) => "[]".into(),
        (Value::Slice(items), _) => {
            let elem = tv.ty.elem().cloned().unwrap_or(Type::Interface);
            let parts: Vec<String> = items
                .iter()
                .map(|v| format_arg(verb, spec, &TypedValue::new(elem.clone(), v.clone())))
                .collect();
            format!("[{}]", parts.join(" "))
        }
        (Value::Int(i), 'd') => format_int(*i, 10, false, spec),
        (Value::Int(i), 'b') => format_int(*i, 2, false, spec),
        (Value::Int(i), 'o') => format_int(*i, 8, false, spec),
        (Value::Int(i), 'x') => format_int(*i, 16, false, spec),
        (Value::Int(i), 'X') => format_int(*i, 16, true, spec),
        (Value::Int(i), 'c') => pad(rune_of(*i).to_string(), spec),
        (Value::Int(i), 'q') => pad(quote_rune(rune_of(*i)), spec),
        (Value::Int(i), 'U') => {
            let mut s = format!("U+{:04X}", i);
            if spec.sharp {
                s.push_str(&format!(" '{}'", rune_of(*i)));
            }
            pad(s, spec)
        }
        (Value::Float(f), 'e' | 'E' | 'f' | 'F' | 'g' | 'G') => format_float(verb, *f, spec),
        (Value::String(s), 's') => {
            let text = lossy(s);
            let s = match spec.prec {
                Some(p) => text.chars().take(p).collect(),
                None => text.into_owned(),
            };
            pad(s, spec)
        }
        (Value::String(s), 'q') => {
            let quoted = match std::str::from_utf8(s) {
                Ok(text) if spec.sharp && !text.contains('`') && !text.chars().any(char::is_control) => {
                    format!("`{}`", text)
                }
                _ => quote_go(s),
            };
            pad(quoted, spec)
        }
        (Value::String(s), 'x' | 'X') => {
            let mut hex: String = s
                .iter()
                .map(|b| {
                    if verb == 'x' {
                        format!("{:02x}", b)
                    } else {
                        format!("{:02X}", b)
                    }
                })
                .collect();
            if spec.sharp && !hex.is_empty() {
                hex.insert_str(0, if verb == 'x' { "0x" } else { "0X" });
            }
            pad(hex, spec)
        }
        (Value::Error(msg), 's' | 'q') => {
            let s = if verb == 'q' { quote_go(msg) } else { msg.clone() };
            pad(s, spec)
        }
        (Value::Bool(b), 't') => pad(b.to_string(), spec),
        _ => bad_verb(verb, tv),
    }
}

fn bad_verb(verb: char, tv: &TypedValue) -> String {
    match (&tv.value, &tv.ty) {
        (Value::Nil, t) if t.is_interface() || *t == Type::NIL => format!("%!{}(<nil>)", verb),
        _ => format!("%!{}({}={})", verb, tv.ty, format_v(tv)),
    }
}

fn rune_of(i: i64) -> char {
    u32::try_from(i)
        .ok()
        .and_then(char::from_u32)
        .unwrap_or(char::REPLACEMENT_CHARACTER)
}

fn sign_prefix(negative: bool, spec: Spec) -> &'static str {
    if negative {
        "-"
    } else if spec.plus {
        "+"
    } else if spec.space {
        " "
    } else {
        ""
    }
}

fn format_int(i: i64, base: u32, upper: bool, spec: Spec) -> String {
    let abs = i.unsigned_abs();
    let mut digits = match (base, upper) {
        (2, _) => format!("{:b}", abs),
        (8, _) => format!("{:o}", abs),
        (16, false) => format!("{:x}", abs),
        (16, true) => format!("{:X}", abs),
        _ => abs.to_string(),
    };
    if let Some(p) = spec.prec {
        if digits.len() < p {
            digits.insert_str(0, &"0".repeat(p - digits.len()));
        }
        if p == 0 && i == 0 {
            digits.clear();
        }
    }
    let radix = match (spec.sharp, base, upper) {
        (true, 2, _) => "0b",
        (true, 8, _) if !digits.starts_with('0') => "0",
        (true, 16, false) => "0x",
        (true, 16, true) => "0X",
        _ => "",
    };
    let prefix = format!("{}{}", sign_prefix(i < 0, spec), radix);
    pad_number(prefix, digits, Spec {
        // 精度があるときは 0 埋めしない
        zero: spec.zero && spec.prec.is_none(),
        ..spec
    })
}

fn format_float(verb: char, f: f64, spec: Spec) -> String {
    let body = match verb {
        'e' | 'E' => format_float_e(f, spec.prec.unwrap_or(6), verb == 'E'),
        'f' | 'F' if f.is_finite() => format!("{:.*}", spec.prec.unwrap_or(6), f),
        'f' | 'F' => format_float_g(f, None, false),
        _ => format_float_g(f, spec.prec, verb == 'G'),
    };
    if !f.is_finite() {
        return pad(body, spec);
    }
    let (negative, digits) = match body.strip_prefix('-') {
        Some(rest) => (true, rest.to_string()),
        None => (false, body),
    };
    pad_number(sign_prefix(negative, spec).to_string(), digits, spec)
}

/// 符号・接頭辞と数字の間を 0 で埋めるか、全体を空白で埋める。
fn pad_number(prefix: String, digits: String, spec: Spec) -> String {
    if let (Some(w), true, false) = (spec.width, spec.zero, spec.minus) {
        let len = prefix.chars().count() + digits.chars().count();
        if len < w {
            return format!("{}{}{}", prefix, "0".repeat(w - len), digits);
        }
    }
    pad(format!("{}{}", prefix, digits), spec)
}

fn pad(s: String, spec: Spec) -> String {
    let Some(w) = spec.width else {
        return s;
    };
    let len = s.chars().count();
    if len >= w {
        return s;
    }
    let fill = " ".repeat(w - len);
    if spec.minus {
        format!("{}{}", s, fill)
    } else {
        format!("{}{}", fill, s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn int(i: i64) -> TypedValue {
        TypedValue::new(Type::INT, Value::Int(i))
    }

    fn string(s: &str) -> TypedValue {
        TypedValue::new(Type::STRING, Value::String(s.into()))
    }

    fn float(f: f64) -> TypedValue {
        TypedValue::new(Type::FLOAT64, Value::Float(f))
    }

    #[test]
    /// 基本的な動詞と幅・精度。
    fn verbs_and_widths() {
        assert_eq!(sprintf("%d|%5d|%-5d|%05d", &[int(42), int(42), int(42), int(-42)]), "42|   42|42   |-0042");
        assert_eq!(sprintf("%x %X %o %b %#x %#o", &[int(255), int(255), int(8), int(5), int(255), int(8)]), "ff FF 10 101 0xff 010");
        assert_eq!(sprintf("%+d % d", &[int(3), int(3)]), "+3  3");
        assert_eq!(sprintf("%s|%10s|%-4s|%.2s", &[string("go"), string("go"), string("go"), string("gopher")]), "go|        go|go  |go");
        assert_eq!(sprintf("%q %c %U %#U", &[string("a\"b"), int(65), int(0x1F600), int(65)]), "\"a\\\"b\" A U+1F600 U+0041 'A'");
        assert_eq!(sprintf("%t %v %%", &[TypedValue::new(Type::BOOL, Value::Bool(true)), int(7)]), "true 7 %");
    }

    #[test]
    /// 浮動小数の書式。
    fn float_verbs() {
        assert_eq!(sprintf("%f %.2f %e %g %v", &[float(3.14159), float(3.14159), float(1234.5678), float(1e21), float(0.5)]), "3.141590 3.14 1.234568e+03 1e+21 0.5");
        assert_eq!(sprintf("%8.3f|%-8.3f|%08.3f", &[float(-3.14159), float(3.14159), float(-3.14159)]), "  -3.142|3.142   |-003.142");
        assert_eq!(sprintf("%+.1e", &[float(12345.0)]), "+1.2e+04");
    }

    #[test]
    /// 型の不一致・引数不足・余分な引数の表示。
    fn mismatches() {
        assert_eq!(sprintf("%d", &[string("x")]), "%!d(string=x)");
        assert_eq!(sprintf("%d %d", &[int(1)]), "1 %!d(MISSING)");
        assert_eq!(sprintf("hi", &[int(1), string("a")]), "hi%!(EXTRA int=1, string=a)");
        assert_eq!(sprintf("%d", &[TypedValue::nil()]), "%!d(<nil>)");
        assert_eq!(sprintf("%", &[]), "%!(NOVERB)");
        assert_eq!(sprintf("%f", &[int(1)]), "%!f(int=1)");
    }

    #[test]
    /// %v と %T、スライスの要素ごとの書式。
    fn values_types_and_slices() {
        let strs = TypedValue::new(
            Type::slice_of(Type::STRING),
            Value::Slice(vec![Value::String("a".into()), Value::String("b".into())]),
        );
        assert_eq!(sprintf("%v %T %q", &[strs.clone(), strs.clone(), strs.clone()]), "[a b] []string [\"a\" \"b\"]");
        assert_eq!(sprintf("%#v", &[strs]), "[]string{\"a\", \"b\"}");
        assert_eq!(sprintf("%T %v", &[TypedValue::nil(), TypedValue::nil()]), "<nil> <nil>");
        let bytes = TypedValue::new(
            Type::slice_of(Type::BYTE),
            Value::Slice(vec![Value::Int(104), Value::Int(105)]),
        );
        assert_eq!(sprintf("%s %x %v", &[bytes.clone(), bytes.clone(), bytes]), "hi 6869 [104 105]");
        let nil_slice = TypedValue::new(Type::slice_of(Type::INT), Value::Nil);
        assert_eq!(sprintf("%v %d", &[nil_slice.clone(), nil_slice]), "[] []");
        assert_eq!(sprintf("%*d|%-*d", &[int(4), int(7), int(3), int(7)]), "   7|7  ");
    }

    #[test]
    /// 大きすぎる幅と精度は書式の誤りとして表示し、埋め草を作らない。
    fn oversized_width_and_precision() {
        assert_eq!(sprintf("%99999999d", &[int(1)]), "%!(NOVERB)%!(EXTRA int=1)");
        assert_eq!(sprintf("%.99999999f", &[float(1.0)]), "%!(NOVERB)%!(EXTRA float64=1)");
        assert_eq!(sprintf("%*d", &[int(5_000_000), int(1)]), "%!(BADWIDTH)1");
        assert_eq!(sprintf("%*d", &[int(-5_000_000), int(1)]), "%!(BADWIDTH)1");
        assert_eq!(sprintf("%.*d", &[int(2_000_000), int(1)]), "%!(BADPREC)1");
        assert_eq!(sprintf("%*d", &[int(3), int(1)]), "  1");
    }

    #[test]
    /// UTF-8 でないバイトを含む文字列の %q と %x。
    fn invalid_utf8_strings() {
        let raw = TypedValue::new(Type::STRING, Value::String(vec![b'a', 0xff]));
        assert_eq!(sprintf("%q %x", &[raw.clone(), raw.clone()]), "\"a\\xff\" 61ff");
        assert_eq!(sprintf("%#q", &[raw]), "\"a\\xff\"");
    }

    #[test]
    /// Println は空白区切りで改行し、書いたバイト数を返す。
    fn println_writes_operands() {
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let mut ctx = CallCtx::new(&mut out, &mut err);
        let boxed = |tv: TypedValue| Value::Boxed(Box::new(tv));
        let args = [Value::Slice(vec![boxed(int(1)), boxed(string("a")), Value::Nil, boxed(float(2.0))])];
        let r = println(&mut ctx, &args).unwrap();
        assert_eq!(r, vec![Value::Int(12), Value::Nil]);
        assert_eq!(String::from_utf8(out).unwrap(), "1 a <nil> 2\n");
    }
}
