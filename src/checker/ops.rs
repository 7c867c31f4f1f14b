// パス: src/checker/ops.rs
// 役割: 単項・二項演算の型付けと定数畳み込みを担当する
// 意図: 被演算子の型合わせ、演算子の適用可否、ゼロ除算やあふれの検出を 1 か所で行う
// 関連ファイル: src/checker/mod.rs, src/ops.rs, src/constant.rs

use super::{CheckedExpr, Checker, Context, Node};
use crate::ast::{BinaryOp, Expr, Span, UnaryOp};
use crate::constant::{Const, RepresentError};
use crate::ops::{self as arith, ArithError};
use crate::types::{BasicKind, Type, UntypedKind};

impl<'e> Checker<'e> {
    pub(super) fn unary(&mut self, op: UnaryOp, x_expr: &Expr, span: Span) -> Option<CheckedExpr> {
        let x = self.value(x_expr)?;
        let defined = match op {
            UnaryOp::Pos | UnaryOp::Neg => x.ty.is_numeric(),
            UnaryOp::Not => x.ty.is_bool(),
            UnaryOp::Complement => x.ty.is_integer(),
            UnaryOp::Addr | UnaryOp::Deref => false,
        };
        if !defined {
            self.error(
                "CHK011",
                span,
                format!(
                    "演算子 {} は {} (型 {}) に定義されていません",
                    op.symbol(),
                    x_expr,
                    x.ty
                ),
            );
            return None;
        }
        if let Some(c) = &x.konst {
            let folded = match (op, c) {
                (UnaryOp::Pos, c) => Some(c.clone()),
                (UnaryOp::Neg, Const::Int(v)) => v.checked_neg().map(Const::Int),
                (UnaryOp::Neg, Const::Float(f)) => Some(Const::Float(-f)),
                (UnaryOp::Not, Const::Bool(b)) => Some(Const::Bool(!b)),
                (UnaryOp::Complement, Const::Int(v)) => {
                    // 符号なし型の補数はその幅の最大値との排他的論理和
                    match x.ty.basic().filter(|k| k.is_unsigned()).and_then(BasicKind::int_range) {
                        Some((_, max)) => Some(Const::Int(!v & max)),
                        None => Some(Const::Int(!v)),
                    }
                }
                _ => None,
            };
            let Some(folded) = folded else {
                self.error("CHK013", span, "定数演算があふれました");
                return None;
            };
            return self.typed_const(x.ty.clone(), folded, span);
        }
        let ty = x.ty.clone();
        Some(CheckedExpr::new(
            Node::Unary {
                op,
                x: Box::new(x),
            },
            ty,
            span,
        ))
    }

    pub(super) fn binary(
        &mut self,
        op: BinaryOp,
        x_expr: &Expr,
        y_expr: &Expr,
        span: Span,
    ) -> Option<CheckedExpr> {
        let x = self.value(x_expr);
        let y = self.value(y_expr);
        let (x, y) = (x?, y?);
        if op.is_shift() {
            return self.shift(op, x, y, x_expr, y_expr, span);
        }
        let (x, y) = self.match_operands(op, x, y, x_expr, y_expr, span)?;
        if op.is_comparison() {
            return self.comparison(op, x, y, x_expr, y_expr, span);
        }
        let ty = x.ty.clone();
        let defined = match op {
            BinaryOp::Add => ty.is_numeric() || ty.is_string(),
            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => ty.is_numeric(),
            BinaryOp::LAnd | BinaryOp::LOr => ty.is_bool(),
            _ => ty.is_integer(),
        };
        if !defined {
            self.error(
                "CHK011",
                span,
                format!(
                    "{} {} {} は不正です（演算子 {} は {} に定義されていません）",
                    x_expr,
                    op.symbol(),
                    y_expr,
                    op.symbol(),
                    ty
                ),
            );
            return None;
        }
        // 浮動小数の変数を定数 0 で割るのは実行時の ±Inf
        if matches!(op, BinaryOp::Div | BinaryOp::Rem)
            && y.konst.as_ref().and_then(Const::as_f64) == Some(0.0)
            && (x.konst.is_some() || ty.is_integer())
        {
            self.error("CHK012", y_expr.span(), "ゼロ除算です");
            return None;
        }
        if let (Some(a), Some(b)) = (&x.konst, &y.konst) {
            let folded = match fold_arith(op, a, b, &ty) {
                Ok(c) => c,
                Err(_) => {
                    self.error("CHK013", span, "定数演算があふれました");
                    return None;
                }
            };
            return self.typed_const(ty, folded, span);
        }
        Some(CheckedExpr::new(
            Node::Binary {
                op,
                x: Box::new(x),
                y: Box::new(y),
            },
            ty,
            span,
        ))
    }

    /// 畳み込んだ定数が型付きなら、その型で表現できるかを確かめる。
    fn typed_const(&mut self, ty: Type, c: Const, span: Span) -> Option<CheckedExpr> {
        if ty.is_untyped() {
            return Some(CheckedExpr::constant(ty, c, span));
        }
        match c.represent(&ty) {
            Ok(c) => Some(CheckedExpr::constant(ty, c, span)),
            Err(RepresentError::Overflow) => {
                self.error("CHK013", span, format!("定数 {} は {} に収まりません", c, ty));
                None
            }
            Err(_) => {
                self.error("CHK013", span, format!("定数 {} を {} で表現できません", c, ty));
                None
            }
        }
    }

    /// 二項演算の両辺を同じ型にそろえる。
    fn match_operands(
        &mut self,
        op: BinaryOp,
        x: CheckedExpr,
        y: CheckedExpr,
        x_expr: &Expr,
        y_expr: &Expr,
        span: Span,
    ) -> Option<(CheckedExpr, CheckedExpr)> {
        match (x.ty.untyped(), y.ty.untyped()) {
            (Some(kx), Some(ky)) if kx == ky => Some((x, y)),
            (Some(kx), Some(ky)) if kx.is_numeric() && ky.is_numeric() => {
                let k = kx.max(ky);
                Some((promote(x, k), promote(y, k)))
            }
            (Some(_), None) => {
                let x = self.assign(x, &y.ty, x_expr, Context::Operand)?;
                Some((x, y))
            }
            (None, Some(_)) => {
                let y = self.assign(y, &x.ty, y_expr, Context::Operand)?;
                Some((x, y))
            }
            (None, None) if x.ty == y.ty => Some((x, y)),
            (None, None) if op.is_comparison() && x.ty.is_interface() && y.ty.assignable_to(&x.ty) => {
                let ty = x.ty.clone();
                Some((x, y.convert_to(ty)))
            }
            (None, None) if op.is_comparison() && y.ty.is_interface() && x.ty.assignable_to(&y.ty) => {
                let ty = y.ty.clone();
                Some((x.convert_to(ty), y))
            }
            _ => {
                self.error(
                    "CHK010",
                    span,
                    format!(
                        "{} {} {} は不正です（型が一致しません: {} と {}）",
                        x_expr,
                        op.symbol(),
                        y_expr,
                        x.ty,
                        y.ty
                    ),
                );
                None
            }
        }
    }

    fn comparison(
        &mut self,
        op: BinaryOp,
        x: CheckedExpr,
        y: CheckedExpr,
        x_expr: &Expr,
        y_expr: &Expr,
        span: Span,
    ) -> Option<CheckedExpr> {
        let ty = x.ty.clone();
        let with_nil = x.is_nil() || y.is_nil();
        let allowed = match op {
            BinaryOp::Eq | BinaryOp::Ne => {
                if x.ty == Type::NIL && y.ty == Type::NIL {
                    false
                } else {
                    with_nil || ty.is_comparable()
                }
            }
            _ => ty.is_ordered(),
        };
        if !allowed {
            let reason = if matches!(ty, Type::Slice(_) | Type::Func(_)) {
                format!("{} は nil とだけ比較できます", ty)
            } else {
                format!("演算子 {} は {} に定義されていません", op.symbol(), ty)
            };
            self.error(
                "CHK011",
                span,
                format!("{} {} {} は不正です（{}）", x_expr, op.symbol(), y_expr, reason),
            );
            return None;
        }
        if let (Some(a), Some(b), false) = (&x.konst, &y.konst, with_nil) {
            if let Some(r) = fold_compare(op, a, b) {
                return Some(CheckedExpr::constant(
                    Type::Untyped(UntypedKind::Bool),
                    Const::Bool(r),
                    span,
                ));
            }
        }
        Some(CheckedExpr::new(
            Node::Binary {
                op,
                x: Box::new(x),
                y: Box::new(y),
            },
            Type::BOOL,
            span,
        ))
    }

    fn shift(
        &mut self,
        op: BinaryOp,
        x: CheckedExpr,
        y: CheckedExpr,
        x_expr: &Expr,
        y_expr: &Expr,
        span: Span,
    ) -> Option<CheckedExpr> {
        let y_int = y.konst.as_ref().map(Const::as_int);
        let y = match y_int {
            Some(Some(n)) if n < 0 => {
                self.error("CHK016", y_expr.span(), format!("負のシフト量です: {}", y_expr));
                return None;
            }
            Some(Some(n)) if y.ty.is_untyped() => CheckedExpr::constant(Type::INT, Const::Int(n), y.span),
            Some(Some(_)) | None if y.ty.is_integer() => y,
            _ => {
                self.error(
                    "CHK016",
                    y_expr.span(),
                    format!("シフト量 {} (型 {}) は整数でなければなりません", y_expr, y.ty),
                );
                return None;
            }
        };
        let x = match x.ty.untyped().filter(|_| x.is_const()) {
            Some(k) => {
                let Some(n) = x.konst.as_ref().and_then(Const::as_int) else {
                    self.error(
                        "CHK016",
                        x_expr.span(),
                        format!("シフトされる {} は整数でなければなりません", x_expr),
                    );
                    return None;
                };
                let kind = if k == UntypedKind::Rune {
                    UntypedKind::Rune
                } else {
                    UntypedKind::Int
                };
                let v = CheckedExpr::constant(Type::Untyped(kind), Const::Int(n), x.span);
                if y.is_const() {
                    v
                } else {
                    // シフト量が定数でなければ、左辺は既定型で評価する
                    let default = Type::Untyped(kind).defaulted();
                    self.assign(v, &default, x_expr, Context::Operand)?
                }
            }
            None if x.ty.is_integer() => x,
            None => {
                self.error(
                    "CHK011",
                    span,
                    format!(
                        "シフト {} {} {} は不正です（{} は整数ではありません）",
                        x_expr,
                        op.symbol(),
                        y_expr,
                        x.ty
                    ),
                );
                return None;
            }
        };
        let ty = x.ty.clone();
        if let (Some(a), Some(b)) = (
            x.konst.as_ref().and_then(Const::as_int),
            y.konst.as_ref().and_then(Const::as_int),
        ) {
            return match arith::int_binop(op, a, b) {
                Ok(v) => self.typed_const(ty, Const::Int(v), span),
                Err(_) => {
                    self.error("CHK013", span, "シフト結果の定数があふれました");
                    None
                }
            };
        }
        Some(CheckedExpr::new(
            Node::Binary {
                op,
                x: Box::new(x),
                y: Box::new(y),
            },
            ty,
            span,
        ))
    }
}

/// 型なし数値定数を種別 `k` へ引き上げる。
fn promote(mut v: CheckedExpr, k: UntypedKind) -> CheckedExpr {
    if k == UntypedKind::Float {
        if let Some(f) = v.konst.as_ref().and_then(Const::as_f64) {
            v.konst = Some(Const::Float(f));
        }
    }
    v.ty = Type::Untyped(k);
    v
}

fn fold_arith(op: BinaryOp, a: &Const, b: &Const, ty: &Type) -> Result<Const, ArithError> {
    match (a, b) {
        (Const::String(x), Const::String(y)) if op == BinaryOp::Add => {
            Ok(Const::String([x.as_slice(), y.as_slice()].concat()))
        }
        (Const::Bool(x), Const::Bool(y)) => match op {
            BinaryOp::LAnd => Ok(Const::Bool(*x && *y)),
            BinaryOp::LOr => Ok(Const::Bool(*x || *y)),
            _ => Err(ArithError::Overflow),
        },
        _ if ty.is_integer() => {
            let (x, y) = a
                .as_int()
                .zip(b.as_int())
                .ok_or(ArithError::Overflow)?;
            arith::int_binop(op, x, y).map(Const::Int)
        }
        _ => {
            let (x, y) = a
                .as_f64()
                .zip(b.as_f64())
                .ok_or(ArithError::Overflow)?;
            match arith::float_binop(op, x, y) {
                Some(r) if r.is_finite() => Ok(Const::Float(r)),
                _ => Err(ArithError::Overflow),
            }
        }
    }
}

fn fold_compare(op: BinaryOp, a: &Const, b: &Const) -> Option<bool> {
    match (a, b) {
        (Const::Int(x), Const::Int(y)) => Some(arith::compare(op, x, y)),
        (Const::String(x), Const::String(y)) => Some(arith::compare(op, x.as_slice(), y.as_slice())),
        (Const::Bool(x), Const::Bool(y)) => Some(arith::compare(op, x, y)),
        _ => {
            let (x, y) = a.as_f64().zip(b.as_f64())?;
            Some(arith::compare(op, &x, &y))
        }
    }
}
