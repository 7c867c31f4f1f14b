// パス: src/ops.rs
// 役割: 整数・浮動小数の二項演算と比較を、定数畳み込みと実行時評価で共有する
// 意図: 検査器と評価器で演算の意味がずれないよう一箇所に集約する
// 関連ファイル: src/constant.rs, src/evaluator.rs, src/checker/ops.rs
//! 算術演算の共通実装。
//!
//! 定数は i128 で厳密に計算し（あふれはエラー）、実行時の値は静的型の幅へ折り返す。

use crate::ast::BinaryOp;
use crate::types::BasicKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArithError {
    DivByZero,
    Overflow,
    NegativeShift,
}

/// 定数向けの厳密な整数演算。
pub fn int_binop(op: BinaryOp, x: i128, y: i128) -> Result<i128, ArithError> {
    use BinaryOp::*;
    let r = match op {
        Add => x.checked_add(y),
        Sub => x.checked_sub(y),
        Mul => x.checked_mul(y),
        Div | Rem if y == 0 => return Err(ArithError::DivByZero),
        Div => x.checked_div(y),
        Rem => x.checked_rem(y),
        And => Some(x & y),
        Or => Some(x | y),
        Xor => Some(x ^ y),
        AndNot => Some(x & !y),
        Shl => return shl_exact(x, y),
        Shr => {
            if y < 0 {
                return Err(ArithError::NegativeShift);
            }
            Some(if y >= 127 { x >> 127 } else { x >> y })
        }
        _ => None,
    };
    r.ok_or(ArithError::Overflow)
}

fn shl_exact(x: i128, y: i128) -> Result<i128, ArithError> {
    if y < 0 {
        return Err(ArithError::NegativeShift);
    }
    if x == 0 {
        return Ok(0);
    }
    if y >= 127 {
        return Err(ArithError::Overflow);
    }
    let r = x << y;
    if r >> y != x {
        return Err(ArithError::Overflow);
    }
    Ok(r)
}

/// 値を整数型の幅へ折り返す（2 の補数）。
pub fn wrap_int(kind: BasicKind, v: i128) -> i64 {
    match kind {
        BasicKind::Int8 => v as i8 as i64,
        BasicKind::Int16 => v as i16 as i64,
        BasicKind::Int32 => v as i32 as i64,
        BasicKind::Uint8 => v as u8 as i64,
        BasicKind::Uint16 => v as u16 as i64,
        BasicKind::Uint32 => v as u32 as i64,
        _ => v as i64,
    }
}

/// 実行時の整数演算。結果は `kind` の幅で折り返す。
pub fn int_runtime(op: BinaryOp, kind: BasicKind, x: i64, y: i64) -> Result<i64, ArithError> {
    let (x, y) = (x as i128, y as i128);
    let r = match op {
        BinaryOp::Shl => {
            if y < 0 {
                return Err(ArithError::NegativeShift);
            }
            if y >= 64 {
                0
            } else {
                x << y
            }
        }
        BinaryOp::Shr => {
            if y < 0 {
                return Err(ArithError::NegativeShift);
            }
            x >> y.min(127)
        }
        BinaryOp::Div | BinaryOp::Rem if y == 0 => return Err(ArithError::DivByZero),
        BinaryOp::Div => x / y,
        BinaryOp::Rem => x % y,
        // 64 ビット同士の加減乗算は i128 に収まる
        other => int_binop(other, x, y)?,
    };
    Ok(wrap_int(kind, r))
}

/// 浮動小数の算術演算。対象外の演算子なら `None`。
pub fn float_binop(op: BinaryOp, x: f64, y: f64) -> Option<f64> {
    match op {
        BinaryOp::Add => Some(x + y),
        BinaryOp::Sub => Some(x - y),
        BinaryOp::Mul => Some(x * y),
        BinaryOp::Div => Some(x / y),
        _ => None,
    }
}

/// 比較演算子を順序付け可能な値へ適用する。
pub fn compare<T: PartialOrd + ?Sized>(op: BinaryOp, x: &T, y: &T) -> bool {
    match op {
        BinaryOp::Eq => x == y,
        BinaryOp::Ne => x != y,
        BinaryOp::Lt => x < y,
        BinaryOp::Le => x <= y,
        BinaryOp::Gt => x > y,
        BinaryOp::Ge => x >= y,
        _ => false,
    }
}
