// パス: src/evaluator.rs
// 役割: 検査済みの式木を環境のもとで評価し、型付きの結果値を返す
// 意図: 型判定は検査器に任せ、ここでは値の計算と実行時エラー（ゼロ除算・範囲外）だけを扱う
// 関連ファイル: src/checker/tree.rs, src/value.rs, src/ops.rs, src/stdlib/mod.rs
//! 評価器（evaluator）
//!
//! 設計ノート:
//! - 入力は `check_expr` を通過した木なので、型の不一致は起こらない前提で値だけを見る。
//!   前提が崩れた場合は `EVAL060`（内部エラー）として報告する。
//! - 整数は `i64` で計算し、静的型の幅（int32, uint8 など）へ折り返す。
//! - 関数呼び出しは全結果を返し、単一値の文脈では先頭だけを使う。

use std::rc::Rc;

use crate::ast::{BinaryOp, UnaryOp};
use crate::checker::{CheckedExpr, Node};
use crate::constant::Const;
use crate::env::Env;
use crate::errors::EvalError;
use crate::ops::{self as arith, ArithError};
use crate::stdlib;
use crate::types::{BasicKind, Type};
use crate::universe::Builtin;
use crate::value::{lossy, CallCtx, FuncValue, TypedValue, Value};

/// 式を評価し、結果を静的型付きで返す。
///
/// - 関数呼び出しは戻り値の個数だけ要素を返す（`fmt.Println` なら 2 つ）。
/// - `print` / `println` のように値を返さない呼び出しは空の列を返す。
pub fn eval_expr(
    e: &CheckedExpr,
    env: &Env,
    ctx: &mut CallCtx<'_>,
) -> Result<Vec<TypedValue>, EvalError> {
    match (&e.node, &e.ty) {
        (Node::Call { .. }, Type::Tuple(types)) => {
            let values = eval_call(e, env, ctx)?;
            Ok(types
                .iter()
                .cloned()
                .zip(values)
                .map(|(ty, v)| TypedValue::new(ty, v))
                .collect())
        }
        (Node::Builtin { .. }, Type::Tuple(_)) => {
            eval(e, env, ctx)?;
            Ok(Vec::new())
        }
        _ => Ok(vec![TypedValue::new(e.ty.clone(), eval(e, env, ctx)?)]),
    }
}

fn internal(msg: impl Into<String>) -> EvalError {
    EvalError::new("EVAL060", msg, None)
}

fn const_value(c: &Const) -> Value {
    match c {
        Const::Bool(b) => Value::Bool(*b),
        Const::Int(v) => Value::Int(*v as i64),
        Const::Float(f) => Value::Float(*f),
        Const::String(s) => Value::String(s.clone()),
        Const::Nil => Value::Nil,
    }
}

fn scope<'a>(env: &'a Env, pkg: &Option<String>) -> Result<&'a Env, EvalError> {
    match pkg {
        Some(p) => env
            .pkgs
            .get(p)
            .ok_or_else(|| internal(format!("パッケージ {} が見つかりません", p))),
        None => Ok(env),
    }
}

/// 単一の値として評価する。
fn eval(e: &CheckedExpr, env: &Env, ctx: &mut CallCtx<'_>) -> Result<Value, EvalError> {
    if let Some(c) = &e.konst {
        return Ok(const_value(c));
    }
    match &e.node {
        Node::Const => Err(internal("値のない定数ノードです")),
        Node::Var { pkg, name } => {
            let tv = scope(env, pkg)?
                .var(name)
                .ok_or_else(|| internal(format!("変数 {} が見つかりません", name)))?;
            Ok(match &tv.value {
                Value::EnvSelf => Value::Env(Rc::new(env.snapshot())),
                v => v.clone(),
            })
        }
        Node::Func { pkg, name } => scope(env, pkg)?
            .funcs
            .get(name)
            .map(|tv| tv.value.clone())
            .ok_or_else(|| internal(format!("関数 {} が見つかりません", name))),
        Node::Field { x, name } => {
            let recv = eval(x, env, ctx)?;
            field(&recv, name)
        }
        Node::Method { x, name } => {
            let recv = eval(x, env, ctx)?;
            let type_name = x
                .ty
                .named()
                .map(|n| n.name.clone())
                .ok_or_else(|| internal(format!("{} にメソッドはありません", x.ty)))?;
            let f = stdlib::method(&type_name, name)
                .ok_or_else(|| internal(format!("メソッド {}.{} がありません", type_name, name)))?;
            Ok(Value::Func(FuncValue {
                name: format!("({}).{}", x.ty, name),
                f,
                recv: Some(Box::new(recv)),
            }))
        }
        Node::Index { x, index } => {
            let xv = eval(x, env, ctx)?;
            let i = eval(index, env, ctx)?
                .as_int()
                .ok_or_else(|| internal("添字が整数ではありません"))?;
            index_value(&xv, i)
        }
        Node::Slice { x, lo, hi } => {
            let xv = eval(x, env, ctx)?;
            let lo = match lo {
                Some(b) => Some(eval(b, env, ctx)?.as_int().unwrap_or(0)),
                None => None,
            };
            let hi = match hi {
                Some(b) => Some(eval(b, env, ctx)?.as_int().unwrap_or(0)),
                None => None,
            };
            slice_value(xv, lo, hi)
        }
        Node::Call { .. } => eval_call(e, env, ctx)?
            .into_iter()
            .next()
            .ok_or_else(|| internal("呼び出しが値を返しませんでした")),
        Node::Builtin {
            builtin,
            args,
            spread,
        } => eval_builtin(*builtin, args, *spread, env, ctx),
        Node::Convert { x } => {
            let v = eval(x, env, ctx)?;
            convert(v, &x.ty, &e.ty)
        }
        Node::Unary { op, x } => {
            let v = eval(x, env, ctx)?;
            unary(*op, v, &e.ty)
        }
        Node::Binary { op, x, y } => binary(*op, x, y, env, ctx),
        Node::SliceLit { elems } => elems
            .iter()
            .map(|el| eval(el, env, ctx))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Slice),
    }
}

fn eval_call(e: &CheckedExpr, env: &Env, ctx: &mut CallCtx<'_>) -> Result<Vec<Value>, EvalError> {
    let Node::Call { func, args } = &e.node else {
        return Err(internal("呼び出しノードではありません"));
    };
    let f = match eval(func, env, ctx)? {
        Value::Func(f) => f,
        other => return Err(internal(format!("関数ではない値を呼び出しました: {:?}", other))),
    };
    let args = args
        .iter()
        .map(|a| eval(a, env, ctx))
        .collect::<Result<Vec<_>, _>>()?;
    tracing::trace!(func = %f.name, argc = args.len(), "native call");
    f.call(ctx, args)
}

fn field(recv: &Value, name: &str) -> Result<Value, EvalError> {
    let Value::Env(snap) = recv else {
        return Err(internal(format!("フィールド {} を持たない値です", name)));
    };
    let names = |items: &[String]| Value::Slice(items.iter().map(|n| Value::String(n.clone().into_bytes())).collect());
    Ok(match name {
        "Name" => Value::String(snap.name.clone().into_bytes()),
        "Path" => Value::String(snap.path.clone().into_bytes()),
        "Vars" => names(&snap.vars),
        "Consts" => names(&snap.consts),
        "Funcs" => names(&snap.funcs),
        "Types" => names(&snap.types),
        "Pkgs" => names(&snap.pkgs),
        other => return Err(internal(format!("未知のフィールド {}", other))),
    })
}

fn index_value(x: &Value, i: i64) -> Result<Value, EvalError> {
    let out_of_range = |len: usize| {
        EvalError::new(
            "EVAL020",
            format!("index out of range [{}] with length {}", i, len),
            None,
        )
    };
    match x {
        Value::String(bytes) => usize::try_from(i)
            .ok()
            .and_then(|i| bytes.get(i))
            .map(|b| Value::Int(*b as i64))
            .ok_or_else(|| out_of_range(bytes.len())),
        other => {
            let items = other
                .as_slice()
                .ok_or_else(|| internal("添字を取れない値です"))?;
            usize::try_from(i)
                .ok()
                .and_then(|i| items.get(i))
                .cloned()
                .ok_or_else(|| out_of_range(items.len()))
        }
    }
}

fn slice_value(x: Value, lo: Option<i64>, hi: Option<i64>) -> Result<Value, EvalError> {
    let len = match &x {
        Value::String(s) => s.len(),
        other => other
            .as_slice()
            .map(<[Value]>::len)
            .ok_or_else(|| internal("スライス式にできない値です"))?,
    };
    let lo_i = lo.unwrap_or(0);
    let hi_i = hi.unwrap_or(len as i64);
    if lo_i < 0 || hi_i < lo_i || hi_i > len as i64 {
        let shown = |b: Option<i64>| b.map(|v| v.to_string()).unwrap_or_default();
        return Err(EvalError::new(
            "EVAL021",
            format!(
                "slice bounds out of range [{}:{}] with length {}",
                shown(lo),
                shown(hi),
                len
            ),
            None,
        ));
    }
    let (lo, hi) = (lo_i as usize, hi_i as usize);
    Ok(match x {
        Value::String(s) => Value::String(s[lo..hi].to_vec()),
        Value::Slice(items) => Value::Slice(items[lo..hi].to_vec()),
        // nil スライスを [0:0] で切っても nil のまま
        other => other,
    })
}

fn eval_builtin(
    b: Builtin,
    args: &[CheckedExpr],
    spread: bool,
    env: &Env,
    ctx: &mut CallCtx<'_>,
) -> Result<Value, EvalError> {
    let mut values = Vec::with_capacity(args.len());
    for a in args {
        values.push(TypedValue::new(a.ty.clone(), eval(a, env, ctx)?));
    }
    match b {
        Builtin::Len => {
            let v = values.first().map(|tv| &tv.value).unwrap_or(&Value::Nil);
            let n = match v {
                Value::String(s) => s.len(),
                other => other.as_slice().map(<[Value]>::len).unwrap_or(0),
            };
            Ok(Value::Int(n as i64))
        }
        Builtin::Append => {
            let mut it = values.into_iter();
            let base = it
                .next()
                .ok_or_else(|| internal("append の引数がありません"))?
                .value;
            let mut items = base.as_slice().map(<[Value]>::to_vec).unwrap_or_default();
            let before = items.len();
            if spread {
                for tail in it {
                    match tail.value {
                        Value::String(s) => items.extend(s.iter().map(|b| Value::Int(*b as i64))),
                        other => items.extend(other.as_slice().unwrap_or(&[]).iter().cloned()),
                    }
                }
            } else {
                items.extend(it.map(|tv| tv.value));
            }
            if items.len() == before && base == Value::Nil {
                return Ok(Value::Nil);
            }
            Ok(Value::Slice(items))
        }
        Builtin::Print | Builtin::Println => {
            let text = stdlib::print_builtin(&values, b == Builtin::Println);
            ctx.err
                .write_all(text.as_bytes())
                .map_err(|e| EvalError::new("EVAL040", format!("{}: {}", b.name(), e), None))?;
            Ok(Value::Nil)
        }
    }
}

/// `from` 型の値 `v` を `to` 型へ変換する。
fn convert(v: Value, from: &Type, to: &Type) -> Result<Value, EvalError> {
    if to.is_interface() {
        return Ok(TypedValue::new(from.clone(), v).into_interface());
    }
    match (to, v) {
        (Type::Basic(BasicKind::Float64), Value::Int(i)) => Ok(Value::Float(i as f64)),
        (Type::Basic(BasicKind::Float64), Value::Float(f)) => Ok(Value::Float(f)),
        (Type::Basic(k), Value::Int(i)) if k.is_integer() => Ok(Value::Int(arith::wrap_int(*k, i as i128))),
        (Type::Basic(k), Value::Float(f)) if k.is_integer() => {
            // 範囲外の浮動小数は飽和させてから幅へ折り返す
            Ok(Value::Int(arith::wrap_int(*k, f.trunc() as i128)))
        }
        (Type::Basic(BasicKind::String), Value::Int(i)) => {
            let ch = u32::try_from(i)
                .ok()
                .and_then(char::from_u32)
                .unwrap_or(char::REPLACEMENT_CHARACTER);
            Ok(Value::String(ch.to_string().into_bytes()))
        }
        (Type::Basic(BasicKind::String), Value::String(s)) => Ok(Value::String(s)),
        (Type::Basic(BasicKind::String), v) => {
            let items = v.as_slice().ok_or_else(|| internal("文字列へ変換できない値です"))?;
            let s = if *from == Type::slice_of(Type::BYTE) {
                items.iter().filter_map(Value::as_int).map(|b| b as u8).collect()
            } else {
                items
                    .iter()
                    .filter_map(Value::as_int)
                    .map(|r| {
                        u32::try_from(r)
                            .ok()
                            .and_then(char::from_u32)
                            .unwrap_or(char::REPLACEMENT_CHARACTER)
                    })
                    .collect::<String>()
                    .into_bytes()
            };
            Ok(Value::String(s))
        }
        (Type::Slice(elem), Value::String(s)) => Ok(Value::Slice(if **elem == Type::BYTE {
            s.iter().map(|b| Value::Int(*b as i64)).collect()
        } else {
            lossy(&s).chars().map(|c| Value::Int(c as i64)).collect()
        })),
        (_, v) => Ok(v),
    }
}

fn unary(op: UnaryOp, v: Value, ty: &Type) -> Result<Value, EvalError> {
    let kind = ty.basic().unwrap_or(BasicKind::Int);
    match (op, v) {
        (UnaryOp::Pos, v) => Ok(v),
        (UnaryOp::Neg, Value::Int(i)) => Ok(Value::Int(arith::wrap_int(kind, -(i as i128)))),
        (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Complement, Value::Int(i)) => Ok(Value::Int(arith::wrap_int(kind, !(i as i128)))),
        (op, v) => Err(internal(format!("単項演算 {} を {:?} に適用できません", op.symbol(), v))),
    }
}

fn arith_error(err: ArithError) -> EvalError {
    match err {
        ArithError::DivByZero => EvalError::new("EVAL010", "integer divide by zero", None),
        ArithError::NegativeShift => EvalError::new("EVAL030", "negative shift amount", None),
        ArithError::Overflow => internal("整数演算があふれました"),
    }
}

fn binary(
    op: BinaryOp,
    x: &CheckedExpr,
    y: &CheckedExpr,
    env: &Env,
    ctx: &mut CallCtx<'_>,
) -> Result<Value, EvalError> {
    let a = eval(x, env, ctx)?;
    if op.is_logical() {
        let short = match (op, &a) {
            (BinaryOp::LAnd, Value::Bool(false)) => Some(false),
            (BinaryOp::LOr, Value::Bool(true)) => Some(true),
            _ => None,
        };
        if let Some(r) = short {
            return Ok(Value::Bool(r));
        }
        return eval(y, env, ctx);
    }
    let b = eval(y, env, ctx)?;
    if op.is_comparison() {
        return compare(op, &a, &b).map(Value::Bool);
    }
    let kind = x.ty.basic().unwrap_or(BasicKind::Int);
    match (a, b) {
        (Value::Int(p), Value::Int(q)) => arith::int_runtime(op, kind, p, q)
            .map(Value::Int)
            .map_err(arith_error),
        (Value::Float(p), Value::Float(q)) => arith::float_binop(op, p, q)
            .map(Value::Float)
            .ok_or_else(|| internal(format!("演算子 {} は浮動小数に使えません", op.symbol()))),
        (Value::String(mut p), Value::String(q)) if op == BinaryOp::Add => {
            p.extend_from_slice(&q);
            Ok(Value::String(p))
        }
        (a, b) => Err(internal(format!(
            "演算 {:?} {} {:?} を評価できません",
            a,
            op.symbol(),
            b
        ))),
    }
}

fn compare(op: BinaryOp, a: &Value, b: &Value) -> Result<bool, EvalError> {
    match op {
        BinaryOp::Eq => values_equal(a, b),
        BinaryOp::Ne => values_equal(a, b).map(|r| !r),
        _ => match (a, b) {
            (Value::Int(p), Value::Int(q)) => Ok(arith::compare(op, p, q)),
            (Value::Float(p), Value::Float(q)) => Ok(arith::compare(op, p, q)),
            (Value::String(p), Value::String(q)) => Ok(arith::compare(op, p.as_slice(), q.as_slice())),
            _ => Err(internal("順序比較できない値です")),
        },
    }
}

/// `==` の意味での等価性。インタフェースは動的型と値の両方を比べる。
fn values_equal(a: &Value, b: &Value) -> Result<bool, EvalError> {
    match (a, b) {
        (Value::Boxed(p), Value::Boxed(q)) => {
            if p.ty != q.ty {
                return Ok(false);
            }
            if !p.ty.is_comparable() {
                return Err(EvalError::new(
                    "EVAL050",
                    format!("comparing uncomparable type {}", p.ty),
                    None,
                ));
            }
            values_equal(&p.value, &q.value)
        }
        (Value::Nil, Value::Nil) => Ok(true),
        (Value::Nil, _) | (_, Value::Nil) => Ok(false),
        (Value::Slice(_), _) | (Value::Func(_), _) => Ok(false),
        (Value::Env(p), Value::Env(q)) => Ok(p == q),
        (p, q) => Ok(p == q),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::check_expr;
    use crate::env::make_env;
    use crate::parser::parse_expr;
    use crate::value::inspect;

    fn run(src: &str) -> Result<Vec<String>, EvalError> {
        let env = make_env(vec!["prog".into(), "x".into()]);
        let checked = check_expr(&parse_expr(src).unwrap(), &env).unwrap();
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let mut ctx = CallCtx::new(&mut out, &mut err);
        let vals = eval_expr(&checked, &env, &mut ctx)?;
        Ok(vals.iter().map(inspect).collect())
    }

    fn one(src: &str) -> String {
        run(src).unwrap().join(", ")
    }

    #[test]
    /// 非定数の整数演算は型の幅で折り返す。
    fn runtime_integer_wrapping() {
        assert_eq!(one("byte(len(os.Args)) - 3"), "255");
        assert_eq!(one("int32(len(os.Args)) << 31"), "0");
        assert_eq!(one("^byte(len(os.Args))"), "253");
        assert_eq!(one("-len(os.Args) / 2"), "-1");
    }

    #[test]
    /// 実行時のゼロ除算と範囲外アクセス。
    fn runtime_errors() {
        assert_eq!(run("1 / (len(os.Args) - 2)").unwrap_err().code(), "EVAL010");
        assert_eq!(run("os.Args[len(os.Args)]").unwrap_err().code(), "EVAL020");
        assert_eq!(run("os.Args[1:len(os.Args)+1]").unwrap_err().code(), "EVAL021");
        assert_eq!(run("1 << (len(os.Args) - 3)").unwrap_err().code(), "EVAL030");
        assert_eq!(
            run("interface{}(os.Args) == interface{}(os.Args)")
                .unwrap_err()
                .code(),
            "EVAL050"
        );
    }

    #[test]
    /// 文字列・スライスの添字と変換。
    fn strings_and_slices() {
        assert_eq!(one("os.Args[1]"), "\"x\"");
        assert_eq!(one("os.Args[0][1:3]"), "\"ro\"");
        assert_eq!(one("[]byte(os.Args[1])"), "[120]");
        assert_eq!(one("string([]rune(\"héllo\")[1:3])"), "\"él\"");
        assert_eq!(one("append(os.Args[:1], \"y\", \"z\")"), "[\"prog\" \"y\" \"z\"]");
        assert_eq!(one("append([]byte(\"a\"), \"bc\"...)"), "[97 98 99]");
        assert_eq!(one("len(append([]int(nil)))"), "0");
    }

    #[test]
    /// 文字列はバイト列として切り出し、UTF-8 の途中で切っても元に戻せる。
    fn strings_are_byte_sequences() {
        assert_eq!(one("\"héllo\"[1:2] + \"héllo\"[2:3] == \"é\""), "true");
        assert_eq!(one("\"héllo\"[1:2]"), "\"\\xc3\"");
        assert_eq!(one("len(\"héllo\"[1:2])"), "1");
        assert_eq!(one("len(string([]byte{255}))"), "1");
        assert_eq!(one("[]byte(string([]byte{255, 97}))"), "[255 97]");
        assert_eq!(one("\"\\xff\" < \"a\""), "false");
    }

    #[test]
    /// インタフェース比較は動的型と値で決まる。
    fn interface_equality() {
        assert_eq!(one("interface{}(1) == interface{}(1)"), "true");
        assert_eq!(one("interface{}(1) == interface{}(1.0)"), "false");
        assert_eq!(one("interface{}(nil) == nil"), "true");
        assert_eq!(one("os.Args != nil"), "true");
    }

    #[test]
    /// 呼び出しは全ての戻り値を返し、println は値を返さない。
    fn call_results() {
        assert_eq!(run("fmt.Println(\"hi\")").unwrap(), vec!["3", "<nil>"]);
        assert_eq!(run("println(1)").unwrap(), Vec::<String>::new());
        assert_eq!(one("os.Stdout.Name()"), "\"/dev/stdout\"");
        assert_eq!(one("env.Pkgs"), "[\"fmt\" \"os\"]");
    }

    #[test]
    /// && と || は右辺を評価しない場合がある。
    fn short_circuit() {
        assert_eq!(one("len(os.Args) > 5 && os.Args[9] == \"\""), "false");
        assert_eq!(one("len(os.Args) < 5 || os.Args[9] == \"\""), "true");
    }
}
