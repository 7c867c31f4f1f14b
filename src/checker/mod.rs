// パス: src/checker/mod.rs
// 役割: AST を環境に照らして静的検査し、型注釈付きの式木を作る
// 意図: 名前解決・型付け・定数畳み込みを評価前に済ませ、エラーはまとめて報告する
// 関連ファイル: src/checker/ops.rs, src/checker/call.rs, src/checker/tree.rs, src/env.rs
//! 静的検査モジュール
//!
//! 設計ノート:
//! - 検査関数は失敗時に `None` を返し、理由は `Checker::errors` に積む。
//!   二項演算などは両辺を検査してから判断するので、1 行で複数のエラーが出る。
//! - 型なし定数は i128 / f64 で厳密に畳み込み、型付きの文脈に入るところで表現可能性を調べる。
//! - 最上位の式が型なしのまま残った場合は既定型（int, rune, float64, string, bool）へ落とす。

use crate::ast::{Expr, Span, TypeExpr, UnaryOp};
use crate::constant::{Const, RepresentError};
use crate::env::{Binding, Env};
use crate::errors::CheckError;
use crate::types::{Type, UntypedKind};
use crate::universe::{self, Builtin, UniverseEntry};

mod call;
mod ops;
mod tree;

pub use tree::{CheckedExpr, Node};

/// 式を検査する。エラーが 1 つでもあれば全件を返す。
pub fn check_expr(expr: &Expr, env: &Env) -> Result<CheckedExpr, Vec<CheckError>> {
    let mut c = Checker::new(env);
    let checked = match c.expr(expr) {
        Some(Operand::Value(v)) => c.default_top(v, expr),
        Some(other) => {
            c.not_a_value(&other, expr);
            None
        }
        None => None,
    };
    match checked {
        Some(v) if c.errors.is_empty() => {
            tracing::debug!(ty = %v.ty, "checked expression");
            Ok(v)
        }
        _ => {
            if c.errors.is_empty() {
                c.error("CHK099", expr.span(), "式を検査できませんでした");
            }
            Err(c.errors)
        }
    }
}

/// 検査途中の式の分類。値以外（型・パッケージ・組み込み関数）も一時的に扱う。
#[derive(Clone, Debug)]
pub(crate) enum Operand {
    Value(CheckedExpr),
    Type(Type),
    Package(String),
    Builtin(Builtin),
}

/// 暗黙の変換が起きる文脈。エラーメッセージの言い回しに使う。
#[derive(Clone, Copy, Debug)]
pub(crate) enum Context<'a> {
    Argument(&'a str),
    Element,
    Operand,
}

pub(crate) struct Checker<'e> {
    env: &'e Env,
    errors: Vec<CheckError>,
}

impl<'e> Checker<'e> {
    fn new(env: &'e Env) -> Self {
        Self {
            env,
            errors: Vec::new(),
        }
    }

    pub(crate) fn error(&mut self, code: &'static str, span: Span, msg: impl Into<String>) {
        self.errors.push(CheckError::at(
            code,
            msg,
            Some(span.pos),
            Some(span.line),
            Some(span.col),
        ));
    }

    pub(crate) fn expr(&mut self, e: &Expr) -> Option<Operand> {
        match e {
            Expr::Ident { name, span } => self.ident(name, *span),
            Expr::IntLit { value, span, .. } => Some(Operand::Value(CheckedExpr::constant(
                Type::Untyped(UntypedKind::Int),
                Const::Int(*value),
                *span,
            ))),
            Expr::FloatLit { value, span, .. } => Some(Operand::Value(CheckedExpr::constant(
                Type::Untyped(UntypedKind::Float),
                Const::Float(*value),
                *span,
            ))),
            Expr::RuneLit { value, span, .. } => Some(Operand::Value(CheckedExpr::constant(
                Type::Untyped(UntypedKind::Rune),
                Const::Int(*value as i128),
                *span,
            ))),
            Expr::StringLit { value, span, .. } => Some(Operand::Value(CheckedExpr::constant(
                Type::Untyped(UntypedKind::String),
                Const::String(value.clone()),
                *span,
            ))),
            Expr::Paren { inner, .. } => self.expr(inner),
            Expr::Selector { x, sel, span } => self.selector(x, sel, *span),
            Expr::Index { x, index, span } => self.index(x, index, *span).map(Operand::Value),
            Expr::Slice { x, lo, hi, span } => self
                .slice_expr(x, lo.as_deref(), hi.as_deref(), *span)
                .map(Operand::Value),
            Expr::Call {
                func,
                args,
                spread,
                span,
            } => self.call(func, args, *spread, *span),
            Expr::Unary { op, x, span } => self.unary_operand(*op, x, *span),
            Expr::Binary { op, x, y, span } => {
                self.binary(*op, x, y, *span).map(Operand::Value)
            }
            Expr::CompositeLit { ty, elems, span } => {
                self.composite(ty, elems, *span).map(Operand::Value)
            }
            Expr::Type { ty, span } => self.resolve_type(ty, *span).map(Operand::Type),
        }
    }

    /// 単一の値を要求する文脈で式を検査する。
    pub(crate) fn value(&mut self, e: &Expr) -> Option<CheckedExpr> {
        match self.expr(e)? {
            Operand::Value(v) => match &v.ty {
                Type::Tuple(items) if items.is_empty() => {
                    self.error(
                        "CHK031",
                        e.span(),
                        format!("{} (値を返さない) を値として使うことはできません", e),
                    );
                    None
                }
                Type::Tuple(_) => {
                    self.error(
                        "CHK030",
                        e.span(),
                        format!("複数の値を返す {} を単一値の文脈で使うことはできません", e),
                    );
                    None
                }
                _ => Some(v),
            },
            other => {
                self.not_a_value(&other, e);
                None
            }
        }
    }

    fn not_a_value(&mut self, operand: &Operand, e: &Expr) {
        match operand {
            Operand::Type(t) => self.error(
                "CHK060",
                e.span(),
                format!("{} (型 {}) は式ではありません", e, t),
            ),
            Operand::Package(p) => self.error(
                "CHK061",
                e.span(),
                format!("パッケージ {} をセレクタなしで使うことはできません", p),
            ),
            Operand::Builtin(b) => self.error(
                "CHK062",
                e.span(),
                format!("組み込み関数 {} は呼び出す必要があります", b.name()),
            ),
            Operand::Value(_) => {}
        }
    }

    fn ident(&mut self, name: &str, span: Span) -> Option<Operand> {
        let env = self.env;
        if let Some(b) = env.lookup(name) {
            return Some(binding_operand(b, None, name, span));
        }
        match universe::lookup(name) {
            Some(UniverseEntry::Const(t, c)) => Some(Operand::Value(CheckedExpr::constant(
                t.clone(),
                c.clone(),
                span,
            ))),
            Some(UniverseEntry::Type(t)) => Some(Operand::Type(t.clone())),
            Some(UniverseEntry::Builtin(b)) => Some(Operand::Builtin(*b)),
            None => {
                self.error("CHK001", span, format!("未定義の識別子です: {}", name));
                None
            }
        }
    }

    fn qualified(&mut self, pkg: &str, sel: &str, span: Span) -> Option<Operand> {
        if !sel.chars().next().is_some_and(|c| c.is_uppercase()) {
            self.error(
                "CHK002",
                span,
                format!("エクスポートされていない名前は参照できません: {}.{}", pkg, sel),
            );
            return None;
        }
        let env = self.env;
        match env.lookup_qualified(pkg, sel) {
            Some(Binding::Pkg(_)) | None => {
                self.error("CHK002", span, format!("未定義です: {}.{}", pkg, sel));
                None
            }
            Some(b) => Some(binding_operand(b, Some(pkg), sel, span)),
        }
    }

    fn selector(&mut self, x: &Expr, sel: &str, span: Span) -> Option<Operand> {
        if let Expr::Ident { name, .. } = x {
            let env = self.env;
            if let Some(Binding::Pkg(_)) = env.lookup(name) {
                return self.qualified(name, sel, span);
            }
        }
        let v = self.value(x)?;
        if let Some(ft) = v.ty.field(sel).cloned() {
            return Some(Operand::Value(CheckedExpr::new(
                Node::Field {
                    x: Box::new(v),
                    name: sel.to_string(),
                },
                ft,
                span,
            )));
        }
        if let Some(sig) = v.ty.method(sel).cloned() {
            return Some(Operand::Value(CheckedExpr::new(
                Node::Method {
                    x: Box::new(v),
                    name: sel.to_string(),
                },
                Type::Func(std::sync::Arc::new(sig)),
                span,
            )));
        }
        self.error(
            "CHK003",
            span,
            format!(
                "{}.{} は未定義です（型 {} にフィールドまたはメソッド {} はありません）",
                x, sel, v.ty, sel
            ),
        );
        None
    }

    fn unary_operand(&mut self, op: UnaryOp, x: &Expr, span: Span) -> Option<Operand> {
        match op {
            UnaryOp::Deref => match self.expr(x)? {
                Operand::Type(t) => Some(Operand::Type(Type::pointer_to(t))),
                Operand::Value(v) => {
                    self.error(
                        "CHK070",
                        span,
                        format!("ポインタの間接参照 *{} には対応していません（型 {}）", x, v.ty),
                    );
                    None
                }
                other => {
                    self.not_a_value(&other, x);
                    None
                }
            },
            UnaryOp::Addr => {
                self.value(x)?;
                self.error(
                    "CHK070",
                    span,
                    format!("アドレス演算 &{} には対応していません", x),
                );
                None
            }
            _ => self.unary(op, x, span).map(Operand::Value),
        }
    }

    /// 添字には整数が必要。型なし定数は `int` へ落とし、負なら拒否する。
    fn index_value(&mut self, v: CheckedExpr, e: &Expr) -> Option<CheckedExpr> {
        let integral_const = v.ty.is_untyped() && v.konst.as_ref().and_then(Const::as_int).is_some();
        if !v.ty.is_integer() && !integral_const {
            self.error(
                "CHK041",
                e.span(),
                format!("添字 {} は整数でなければなりません（型 {}）", e, v.ty),
            );
            return None;
        }
        let v = if v.ty.is_untyped() {
            self.assign(v, &Type::INT, e, Context::Operand)?
        } else {
            v
        };
        if let Some(n) = v.konst.as_ref().and_then(Const::as_int) {
            if n < 0 {
                self.error(
                    "CHK042",
                    e.span(),
                    format!("添字 {} は負であってはなりません", e),
                );
                return None;
            }
        }
        Some(v)
    }

    fn index(&mut self, x: &Expr, index: &Expr, span: Span) -> Option<CheckedExpr> {
        let xv = self.value(x);
        let iv = self.value(index);
        let (xv, iv) = (xv?, iv?);
        let elem = match &xv.ty {
            Type::Slice(elem) => elem.as_ref().clone(),
            t if t.is_string() => Type::BYTE,
            t => {
                self.error(
                    "CHK040",
                    span,
                    format!("{}[{}] は不正です（型 {} は添字を取れません）", x, index, t),
                );
                return None;
            }
        };
        let iv = self.index_value(iv, index)?;
        if let (Some(s), Some(n)) = (
            xv.konst.as_ref().and_then(Const::as_bytes),
            iv.konst.as_ref().and_then(Const::as_int),
        ) {
            if n as usize >= s.len() {
                self.error(
                    "CHK043",
                    index.span(),
                    format!("添字 {} は範囲外です（長さ {}）", n, s.len()),
                );
                return None;
            }
        }
        Some(CheckedExpr::new(
            Node::Index {
                x: Box::new(xv),
                index: Box::new(iv),
            },
            elem,
            span,
        ))
    }

    fn slice_expr(
        &mut self,
        x: &Expr,
        lo: Option<&Expr>,
        hi: Option<&Expr>,
        span: Span,
    ) -> Option<CheckedExpr> {
        let xv = self.value(x);
        let lo_v = lo.map(|e| self.value(e).and_then(|v| self.index_value(v, e)));
        let hi_v = hi.map(|e| self.value(e).and_then(|v| self.index_value(v, e)));
        let xv = xv?;
        let lo_v = match lo_v {
            Some(v) => Some(Box::new(v?)),
            None => None,
        };
        let hi_v = match hi_v {
            Some(v) => Some(Box::new(v?)),
            None => None,
        };
        let ty = match &xv.ty {
            Type::Slice(_) => xv.ty.clone(),
            t if t.is_string() => Type::STRING,
            t => {
                self.error(
                    "CHK040",
                    span,
                    format!("{} はスライス式にできません（型 {}）", x, t),
                );
                return None;
            }
        };
        let bound = |v: &Option<Box<CheckedExpr>>| {
            v.as_ref()
                .and_then(|b| b.konst.as_ref())
                .and_then(Const::as_int)
        };
        if let (Some(l), Some(h)) = (bound(&lo_v), bound(&hi_v)) {
            if l > h {
                self.error(
                    "CHK044",
                    span,
                    format!("スライスの添字が逆転しています: {} > {}", l, h),
                );
                return None;
            }
        }
        Some(CheckedExpr::new(
            Node::Slice {
                x: Box::new(xv),
                lo: lo_v,
                hi: hi_v,
            },
            ty,
            span,
        ))
    }

    fn composite(&mut self, ty: &TypeExpr, elems: &[Expr], span: Span) -> Option<CheckedExpr> {
        let lit_ty = self.resolve_type(ty, span)?;
        let Type::Slice(elem) = &lit_ty else {
            self.error(
                "CHK065",
                span,
                format!("複合リテラルの型が不正です: {}", lit_ty),
            );
            return None;
        };
        let mut out = Vec::with_capacity(elems.len());
        let mut ok = true;
        for e in elems {
            match self
                .value(e)
                .and_then(|v| self.assign(v, elem, e, Context::Element))
            {
                Some(v) => out.push(v),
                None => ok = false,
            }
        }
        if !ok {
            return None;
        }
        Some(CheckedExpr::new(Node::SliceLit { elems: out }, lit_ty, span))
    }

    pub(crate) fn resolve_type(&mut self, te: &TypeExpr, span: Span) -> Option<Type> {
        match te {
            TypeExpr::Name { pkg: None, name } => {
                let env = self.env;
                match env.lookup(name) {
                    Some(Binding::Type(t)) => return Some(t.clone()),
                    Some(_) => {
                        self.error("CHK064", span, format!("{} は型ではありません", name));
                        return None;
                    }
                    None => {}
                }
                match universe::lookup(name) {
                    Some(UniverseEntry::Type(t)) => Some(t.clone()),
                    Some(_) => {
                        self.error("CHK064", span, format!("{} は型ではありません", name));
                        None
                    }
                    None => {
                        self.error("CHK001", span, format!("未定義の識別子です: {}", name));
                        None
                    }
                }
            }
            TypeExpr::Name {
                pkg: Some(pkg),
                name,
            } => match self.qualified(pkg, name, span)? {
                Operand::Type(t) => Some(t),
                _ => {
                    self.error(
                        "CHK064",
                        span,
                        format!("{}.{} は型ではありません", pkg, name),
                    );
                    None
                }
            },
            TypeExpr::Slice(elem) => self.resolve_type(elem, span).map(Type::slice_of),
            TypeExpr::Pointer(elem) => self.resolve_type(elem, span).map(Type::pointer_to),
            TypeExpr::Interface => Some(Type::Interface),
        }
    }

    /// 値 `v` を `target` 型の位置に置く。型なし定数は表現可能性を調べ、インタフェースへは包む。
    pub(crate) fn assign(
        &mut self,
        v: CheckedExpr,
        target: &Type,
        e: &Expr,
        ctx: Context<'_>,
    ) -> Option<CheckedExpr> {
        if v.ty == *target {
            return Some(v);
        }
        if v.is_nil() && target.is_nillable() {
            return Some(CheckedExpr::constant(target.clone(), Const::Nil, v.span));
        }
        if target.is_interface() && v.ty.assignable_to(target) {
            let v = if v.ty.is_untyped() {
                self.default_value(v, e)?
            } else {
                v
            };
            return Some(v.convert_to(target.clone()));
        }
        if let (Some(c), true) = (&v.konst, v.ty.is_untyped()) {
            return match c.represent(target) {
                Ok(c) => Some(CheckedExpr::constant(target.clone(), c, v.span)),
                Err(err) => {
                    self.representation_error(err, &v, target, e, ctx);
                    None
                }
            };
        }
        if v.ty.assignable_to(target) {
            return Some(v.convert_to(target.clone()));
        }
        self.representation_error(RepresentError::Mismatch, &v, target, e, ctx);
        None
    }

    fn representation_error(
        &mut self,
        err: RepresentError,
        v: &CheckedExpr,
        target: &Type,
        e: &Expr,
        ctx: Context<'_>,
    ) {
        let described = match &v.konst {
            Some(c) if v.ty.is_untyped() => format!("{} ({} 定数 {})", e, v.ty, c),
            _ => format!("{} (型 {})", e, v.ty),
        };
        match err {
            RepresentError::Overflow => self.error(
                "CHK013",
                e.span(),
                format!("{} は {} に収まりません", described, target),
            ),
            RepresentError::Truncated => self.error(
                "CHK015",
                e.span(),
                format!("{} は {} へ変換すると切り捨てられます", described, target),
            ),
            RepresentError::Mismatch => {
                let place = match ctx {
                    Context::Argument(name) => format!("{} の引数", name),
                    Context::Element => "スライスリテラルの要素".to_string(),
                    Context::Operand => "演算".to_string(),
                };
                self.error(
                    "CHK022",
                    e.span(),
                    format!("{} を {} の値として{}に使うことはできません", described, target, place),
                )
            }
        }
    }

    /// 型なし定数を既定型へ落とす。`nil` など既定型のないものはそのまま。
    pub(crate) fn default_value(&mut self, v: CheckedExpr, e: &Expr) -> Option<CheckedExpr> {
        let Some(target) = v.ty.untyped().and_then(|k| k.default_type()) else {
            return Some(v);
        };
        match &v.konst {
            Some(c) => match c.represent(&target) {
                Ok(c) => Some(CheckedExpr::constant(target, c, v.span)),
                Err(err) => {
                    self.representation_error(err, &v, &target, e, Context::Operand);
                    None
                }
            },
            None => Some(CheckedExpr { ty: target, ..v }),
        }
    }

    fn default_top(&mut self, v: CheckedExpr, e: &Expr) -> Option<CheckedExpr> {
        self.default_value(v, e)
    }
}

fn binding_operand(b: Binding<'_>, pkg: Option<&str>, name: &str, span: Span) -> Operand {
    let pkg = pkg.map(str::to_string);
    match b {
        Binding::Var(tv) => Operand::Value(CheckedExpr::new(
            Node::Var {
                pkg,
                name: name.to_string(),
            },
            tv.ty.clone(),
            span,
        )),
        Binding::Const(t, c) => Operand::Value(CheckedExpr::constant(t.clone(), c.clone(), span)),
        Binding::Func(tv) => Operand::Value(CheckedExpr::new(
            Node::Func {
                pkg,
                name: name.to_string(),
            },
            tv.ty.clone(),
            span,
        )),
        Binding::Type(t) => Operand::Type(t.clone()),
        Binding::Pkg(_) => Operand::Package(name.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::make_env;
    use crate::parser::parse_expr;

    fn check(src: &str) -> Result<CheckedExpr, Vec<CheckError>> {
        let env = make_env(vec!["prog".into()]);
        check_expr(&parse_expr(src).unwrap(), &env)
    }

    fn codes(src: &str) -> Vec<&'static str> {
        check(src).unwrap_err().iter().map(|e| e.code()).collect()
    }

    #[test]
    /// 型なし定数は最上位で既定型になる。
    fn top_level_defaults() {
        assert_eq!(check("1").unwrap().ty, Type::INT);
        assert_eq!(check("'a'").unwrap().ty, Type::RUNE);
        assert_eq!(check("1.5").unwrap().ty, Type::FLOAT64);
        assert_eq!(check("\"s\"").unwrap().ty, Type::STRING);
        assert_eq!(check("true").unwrap().ty, Type::BOOL);
        assert_eq!(check("nil").unwrap().ty, Type::NIL);
    }

    #[test]
    /// 未定義の名前と非公開の名前。
    fn undefined_and_unexported() {
        assert_eq!(codes("foo"), vec!["CHK001"]);
        assert_eq!(codes("os.args"), vec!["CHK002"]);
        assert_eq!(codes("fmt.Sprintf"), vec!["CHK002"]);
        assert_eq!(codes("os.Stdout.Close"), vec!["CHK003"]);
    }

    #[test]
    /// 1 行で複数のエラーを報告する。
    fn errors_accumulate() {
        assert_eq!(codes("a + b"), vec!["CHK001", "CHK001"]);
        assert_eq!(codes("[]int{x, \"s\"}"), vec!["CHK001", "CHK022"]);
    }

    #[test]
    /// 型・パッケージ・組み込み関数は単独では値にならない。
    fn non_values_rejected() {
        assert_eq!(codes("int"), vec!["CHK060"]);
        assert_eq!(codes("fmt"), vec!["CHK061"]);
        assert_eq!(codes("len"), vec!["CHK062"]);
    }

    #[test]
    /// フィールドとメソッドの選択。
    fn fields_and_methods() {
        assert_eq!(check("env.Name").unwrap().ty, Type::STRING);
        assert_eq!(check("env.Pkgs").unwrap().ty.to_string(), "[]string");
        assert_eq!(
            check("os.Stdout.WriteString").unwrap().ty.to_string(),
            "func(string) (int, error)"
        );
    }

    #[test]
    /// 添字とスライス式の型。
    fn index_and_slice_types() {
        assert_eq!(check("os.Args[0]").unwrap().ty, Type::STRING);
        assert_eq!(check("\"abc\"[1]").unwrap().ty, Type::BYTE);
        assert_eq!(check("\"abc\"[1:]").unwrap().ty, Type::STRING);
        assert_eq!(codes("os.Args[-1]"), vec!["CHK042"]);
        assert_eq!(codes("os.Args[1.5]"), vec!["CHK041"]);
        assert_eq!(codes("\"abc\"[5]"), vec!["CHK043"]);
        assert_eq!(codes("1[0]"), vec!["CHK040"]);
        assert_eq!(codes("os.Args[2:1]"), vec!["CHK044"]);
    }

    #[test]
    /// `*T` は型として、`&x` は非対応として扱う。
    fn pointer_forms() {
        assert_eq!(codes("&os.Args"), vec!["CHK070"]);
        assert_eq!(codes("*os.Stdout"), vec!["CHK070"]);
        assert_eq!(
            check("[]*os.File{nil}").unwrap().ty.to_string(),
            "[]*os.File"
        );
    }
}
