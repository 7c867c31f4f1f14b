// パス: src/constant.rs
// 役割: コンパイル時定数の値表現と、型への表現可能性の判定を提供する
// 意図: 型なし定数の畳み込み結果を、あふれや切り捨てを検出しつつ型付きの値へ落とし込む
// 関連ファイル: src/checker/ops.rs, src/ops.rs, src/types.rs

use std::fmt;

use crate::types::{BasicKind, Type};

#[derive(Clone, Debug, PartialEq)]
pub enum Const {
    Bool(bool),
    Int(i128),
    Float(f64),
    /// 文字列定数のバイト列。
    String(Vec<u8>),
    Nil,
}

/// 表現可能性の判定に失敗した理由。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RepresentError {
    Overflow,
    Truncated,
    Mismatch,
}

impl Const {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Const::Int(v) => Some(*v as f64),
            Const::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// 整数値として扱える場合にその値を返す（小数部のない浮動小数を含む）。
    pub fn as_int(&self) -> Option<i128> {
        match self {
            Const::Int(v) => Some(*v),
            Const::Float(f) if f.fract() == 0.0 && f.is_finite() && f.abs() < 1.7e38 => {
                Some(*f as i128)
            }
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Const::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Const::String(s) => Some(s),
            _ => None,
        }
    }

    /// 定数を型 `ty` の値として表現し直す。
    ///
    /// インタフェース型への変換は呼び出し側で既定型へ落としてから行う。
    pub fn represent(&self, ty: &Type) -> Result<Const, RepresentError> {
        match ty {
            Type::Basic(kind) if kind.is_integer() => {
                let v = match self {
                    Const::Int(v) => *v,
                    Const::Float(_) => self.as_int().ok_or(RepresentError::Truncated)?,
                    _ => return Err(RepresentError::Mismatch),
                };
                let (lo, hi) = kind.int_range().ok_or(RepresentError::Mismatch)?;
                if v < lo || v > hi {
                    return Err(RepresentError::Overflow);
                }
                Ok(Const::Int(v))
            }
            Type::Basic(BasicKind::Float64) => {
                let f = self.as_f64().ok_or(RepresentError::Mismatch)?;
                if !f.is_finite() {
                    return Err(RepresentError::Overflow);
                }
                Ok(Const::Float(f))
            }
            Type::Basic(BasicKind::String) => match self {
                Const::String(_) => Ok(self.clone()),
                _ => Err(RepresentError::Mismatch),
            },
            Type::Basic(BasicKind::Bool) => match self {
                Const::Bool(_) => Ok(self.clone()),
                _ => Err(RepresentError::Mismatch),
            },
            Type::Untyped(_) => Ok(self.clone()),
            t if t.is_nillable() && *self == Const::Nil => Ok(Const::Nil),
            _ => Err(RepresentError::Mismatch),
        }
    }
}

impl fmt::Display for Const {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Const::Bool(b) => write!(f, "{b}"),
            Const::Int(v) => write!(f, "{v}"),
            Const::Float(x) => write!(f, "{}", crate::value::format_float_v(*x)),
            Const::String(s) => write!(f, "{}", crate::value::quote_go(s)),
            Const::Nil => write!(f, "nil"),
        }
    }
}
