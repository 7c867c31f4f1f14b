// パス: src/checker/call.rs
// 役割: 呼び出し式（関数呼び出し・型変換・組み込み関数）の検査を担当する
// 意図: 引数の個数と型、可変長引数の詰め直し、変換可能性を 1 か所で判定する
// 関連ファイル: src/checker/mod.rs, src/universe.rs, src/checker/tree.rs

use std::sync::Arc;

use super::{CheckedExpr, Checker, Context, Node, Operand};
use crate::ast::{Expr, Span};
use crate::constant::{Const, RepresentError};
use crate::types::{BasicKind, Signature, Type, UntypedKind};
use crate::universe::Builtin;

impl<'e> Checker<'e> {
    pub(super) fn call(
        &mut self,
        func: &Expr,
        args: &[Expr],
        spread: bool,
        span: Span,
    ) -> Option<Operand> {
        let Some(callee) = self.expr(func) else {
            // 呼び出し先が解決できなくても引数側のエラーは報告する
            for a in args {
                self.value(a);
            }
            return None;
        };
        match callee {
            Operand::Type(t) => self.conversion(t, args, spread, span).map(Operand::Value),
            Operand::Builtin(b) => self.builtin(b, args, spread, span).map(Operand::Value),
            Operand::Value(f) => match f.ty.clone() {
                Type::Func(sig) => self
                    .call_func(f, &sig, func, args, spread, span)
                    .map(Operand::Value),
                other => {
                    self.error(
                        "CHK020",
                        span,
                        format!("{} (型 {}) は関数ではないので呼び出せません", func, other),
                    );
                    None
                }
            },
            Operand::Package(p) => {
                self.error(
                    "CHK061",
                    func.span(),
                    format!("パッケージ {} をセレクタなしで使うことはできません", p),
                );
                None
            }
        }
    }

    fn call_func(
        &mut self,
        f: CheckedExpr,
        sig: &Arc<Signature>,
        func: &Expr,
        args: &[Expr],
        spread: bool,
        span: Span,
    ) -> Option<CheckedExpr> {
        let name = func.to_string();
        let n = sig.params.len();
        if spread && !sig.variadic {
            self.error(
                "CHK023",
                span,
                format!("可変長でない関数 {} の呼び出しに ... は使えません", name),
            );
            return None;
        }
        let fixed = if sig.variadic && !spread { n - 1 } else { n };
        let count_ok = if sig.variadic && !spread {
            args.len() >= fixed
        } else {
            args.len() == n
        };
        if !count_ok {
            let which = if args.len() < fixed {
                "足りません"
            } else {
                "多すぎます"
            };
            self.error(
                "CHK021",
                span,
                format!(
                    "{} の呼び出しの引数が{}（{} 個を渡し、型は {}）",
                    name,
                    which,
                    args.len(),
                    Type::Func(sig.clone())
                ),
            );
            return None;
        }

        let mut checked = Vec::with_capacity(n);
        let mut ok = true;
        for (a, param) in args.iter().zip(&sig.params).take(fixed) {
            match self
                .value(a)
                .and_then(|v| self.assign(v, param, a, Context::Argument(&name)))
            {
                Some(v) => checked.push(v),
                None => ok = false,
            }
        }
        if sig.variadic && !spread {
            let slice_ty = sig.params[n - 1].clone();
            let elem = slice_ty.elem().cloned().unwrap_or(Type::Interface);
            let mut extras = Vec::new();
            for a in &args[fixed..] {
                match self
                    .value(a)
                    .and_then(|v| self.assign(v, &elem, a, Context::Argument(&name)))
                {
                    Some(v) => extras.push(v),
                    None => ok = false,
                }
            }
            let packed = if extras.is_empty() {
                CheckedExpr::constant(slice_ty, Const::Nil, span)
            } else {
                CheckedExpr::new(Node::SliceLit { elems: extras }, slice_ty, span)
            };
            checked.push(packed);
        }
        if !ok {
            return None;
        }
        Some(CheckedExpr::new(
            Node::Call {
                func: Box::new(f),
                args: checked,
            },
            sig.result_type(),
            span,
        ))
    }

    /// `T(x)` 形式の型変換。定数は定数のまま変換する。
    fn conversion(
        &mut self,
        target: Type,
        args: &[Expr],
        spread: bool,
        span: Span,
    ) -> Option<CheckedExpr> {
        if spread {
            self.error("CHK023", span, format!("{} への変換に ... は使えません", target));
            return None;
        }
        let [arg] = args else {
            self.error(
                "CHK021",
                span,
                format!("{} への変換には引数がちょうど 1 つ必要です（{} 個）", target, args.len()),
            );
            return None;
        };
        let x = self.value(arg)?;
        if x.ty == target {
            return Some(CheckedExpr { span, ..x });
        }
        if x.is_nil() {
            if target.is_nillable() {
                return Some(CheckedExpr::constant(target, Const::Nil, span));
            }
            self.invalid_conversion(&x, arg, &target);
            return None;
        }
        if let Some(c) = x.konst.clone() {
            if let Some(folded) = self.const_conversion(&c, &x, arg, &target)? {
                return Some(CheckedExpr::constant(target, folded, span));
            }
        }
        if !convertible(&x.ty, &target) {
            self.invalid_conversion(&x, arg, &target);
            return None;
        }
        // 型なし定数は既定型を経由して変換する（[]byte("s") や interface{}(1) など）
        let x = if x.ty.is_untyped() {
            self.default_value(x, arg)?
        } else {
            x
        };
        if x.ty == target {
            return Some(CheckedExpr { span, ..x });
        }
        Some(CheckedExpr {
            span,
            ..x.convert_to(target)
        })
    }

    /// 定数同士の変換。結果が定数にならない組み合わせなら `Some(None)`。
    fn const_conversion(
        &mut self,
        c: &Const,
        x: &CheckedExpr,
        arg: &Expr,
        target: &Type,
    ) -> Option<Option<Const>> {
        let Type::Basic(kind) = target else {
            return Some(None);
        };
        if x.ty.is_numeric() && kind.is_numeric() {
            return match c.represent(target) {
                Ok(c) => Some(Some(c)),
                Err(RepresentError::Truncated) => {
                    self.error(
                        "CHK015",
                        arg.span(),
                        format!("{} を {} へ変換すると切り捨てられます", arg, target),
                    );
                    None
                }
                Err(_) => {
                    self.error(
                        "CHK013",
                        arg.span(),
                        format!("{} は {} に収まりません", arg, target),
                    );
                    None
                }
            };
        }
        match (kind, c) {
            (BasicKind::String, Const::Int(n)) if x.ty.is_integer() => {
                let ch = u32::try_from(*n)
                    .ok()
                    .and_then(char::from_u32)
                    .unwrap_or(char::REPLACEMENT_CHARACTER);
                Some(Some(Const::String(ch.to_string().into_bytes())))
            }
            (BasicKind::String, Const::String(_)) | (BasicKind::Bool, Const::Bool(_)) => {
                Some(Some(c.clone()))
            }
            _ => Some(None),
        }
    }

    fn invalid_conversion(&mut self, x: &CheckedExpr, arg: &Expr, target: &Type) {
        self.error(
            "CHK050",
            arg.span(),
            format!("{} (型 {}) を {} へ変換できません", arg, x.ty, target),
        );
    }

    fn builtin(
        &mut self,
        b: Builtin,
        args: &[Expr],
        spread: bool,
        span: Span,
    ) -> Option<CheckedExpr> {
        match b {
            Builtin::Len => self.builtin_len(args, spread, span),
            Builtin::Append => self.builtin_append(args, spread, span),
            Builtin::Print | Builtin::Println => self.builtin_print(b, args, spread, span),
        }
    }

    fn builtin_len(&mut self, args: &[Expr], spread: bool, span: Span) -> Option<CheckedExpr> {
        if spread {
            self.error("CHK023", span, "len の呼び出しに ... は使えません");
            return None;
        }
        let [arg] = args else {
            self.error(
                "CHK021",
                span,
                format!("len には引数がちょうど 1 つ必要です（{} 個）", args.len()),
            );
            return None;
        };
        let x = self.value(arg)?;
        if let Some(s) = x.konst.as_ref().and_then(Const::as_bytes) {
            return Some(CheckedExpr::constant(
                Type::INT,
                Const::Int(s.len() as i128),
                span,
            ));
        }
        if !x.ty.is_string() && !matches!(x.ty, Type::Slice(_)) {
            self.error(
                "CHK024",
                arg.span(),
                format!("len の引数 {} (型 {}) が不正です", arg, x.ty),
            );
            return None;
        }
        Some(CheckedExpr::new(
            Node::Builtin {
                builtin: Builtin::Len,
                args: vec![x],
                spread: false,
            },
            Type::INT,
            span,
        ))
    }

    fn builtin_append(&mut self, args: &[Expr], spread: bool, span: Span) -> Option<CheckedExpr> {
        let Some((first, rest)) = args.split_first() else {
            self.error("CHK021", span, "append には引数が 1 つ以上必要です");
            return None;
        };
        let s = self.value(first)?;
        let slice_ty = s.ty.clone();
        let Some(elem) = (match &slice_ty {
            Type::Slice(elem) => Some(elem.as_ref().clone()),
            _ => None,
        }) else {
            self.error(
                "CHK024",
                first.span(),
                format!(
                    "append の第 1 引数は型付きのスライスでなければなりません（{} は {}）",
                    first, slice_ty
                ),
            );
            return None;
        };
        let mut checked = vec![s];
        if spread {
            let [tail] = rest else {
                self.error(
                    "CHK021",
                    span,
                    "... 付きの append には引数がちょうど 2 つ必要です",
                );
                return None;
            };
            let t = self.value(tail)?;
            let t = if elem == Type::BYTE && t.ty.is_string() {
                self.default_value(t, tail)?
            } else {
                self.assign(t, &slice_ty, tail, Context::Argument("append"))?
            };
            checked.push(t);
        } else {
            let mut ok = true;
            for a in rest {
                match self
                    .value(a)
                    .and_then(|v| self.assign(v, &elem, a, Context::Argument("append")))
                {
                    Some(v) => checked.push(v),
                    None => ok = false,
                }
            }
            if !ok {
                return None;
            }
        }
        Some(CheckedExpr::new(
            Node::Builtin {
                builtin: Builtin::Append,
                args: checked,
                spread,
            },
            slice_ty,
            span,
        ))
    }

    fn builtin_print(
        &mut self,
        b: Builtin,
        args: &[Expr],
        spread: bool,
        span: Span,
    ) -> Option<CheckedExpr> {
        if spread {
            self.error(
                "CHK023",
                span,
                format!("{} の呼び出しに ... は使えません", b.name()),
            );
            return None;
        }
        let mut checked = Vec::with_capacity(args.len());
        let mut ok = true;
        for a in args {
            let Some(v) = self.value(a) else {
                ok = false;
                continue;
            };
            if v.ty == Type::Untyped(UntypedKind::Nil) {
                self.error(
                    "CHK024",
                    a.span(),
                    format!("{} に型なしの nil は渡せません", b.name()),
                );
                ok = false;
                continue;
            }
            match self.default_value(v, a) {
                Some(v) => checked.push(v),
                None => ok = false,
            }
        }
        if !ok {
            return None;
        }
        Some(CheckedExpr::new(
            Node::Builtin {
                builtin: b,
                args: checked,
                spread: false,
            },
            Type::Tuple(Vec::new()),
            span,
        ))
    }
}

/// 非定数の値を `to` へ変換できるか。
fn convertible(from: &Type, to: &Type) -> bool {
    let from = from.defaulted();
    if from.assignable_to(to) || (from.is_numeric() && to.is_numeric()) {
        return true;
    }
    let bytes_or_runes = |t: &Type| *t == Type::slice_of(Type::BYTE) || *t == Type::slice_of(Type::RUNE);
    (from.is_integer() && to.is_string())
        || (from.is_string() && bytes_or_runes(to))
        || (bytes_or_runes(&from) && to.is_string())
}

#[cfg(test)]
mod tests {
    use crate::checker::{check_expr, CheckedExpr, Node};
    use crate::constant::Const;
    use crate::env::make_env;
    use crate::errors::CheckError;
    use crate::parser::parse_expr;
    use crate::types::Type;

    fn check(src: &str) -> Result<CheckedExpr, Vec<CheckError>> {
        let env = make_env(vec!["prog".into()]);
        check_expr(&parse_expr(src).unwrap(), &env)
    }

    fn codes(src: &str) -> Vec<&'static str> {
        check(src).unwrap_err().iter().map(|e| e.code()).collect()
    }

    #[test]
    /// 可変長引数はスライスリテラルへ詰め直される。
    fn variadic_arguments_are_packed() {
        let c = check("fmt.Println(1, \"a\")").unwrap();
        assert_eq!(c.ty.to_string(), "(int, error)");
        let Node::Call { args, .. } = &c.node else {
            panic!("not a call: {:?}", c.node);
        };
        assert_eq!(args.len(), 1);
        assert!(matches!(&args[0].node, Node::SliceLit { elems } if elems.len() == 2));

        let c = check("fmt.Println()").unwrap();
        let Node::Call { args, .. } = &c.node else {
            panic!("not a call");
        };
        assert_eq!(args[0].konst, Some(Const::Nil));
        assert!(check("fmt.Printf(\"%d\\n\", 1)").is_ok());
    }

    #[test]
    /// 引数の個数と ... の誤用。
    fn argument_count_and_spread() {
        assert_eq!(codes("fmt.Printf()"), vec!["CHK021"]);
        assert_eq!(codes("os.Stdout.Name(1)"), vec!["CHK021"]);
        assert_eq!(codes("os.Stdout.WriteString(os.Args...)"), vec!["CHK023"]);
        assert_eq!(codes("fmt.Printf(1)"), vec!["CHK022"]);
        assert!(check("fmt.Println([]interface{}{1, 2}...)").is_ok());
        assert_eq!(codes("fmt.Println(os.Args...)"), vec!["CHK022"]);
        assert_eq!(codes("os.Args(1)"), vec!["CHK020"]);
    }

    #[test]
    /// 定数の変換は定数のまま畳み込まれる。
    fn constant_conversions() {
        let c = check("float64(3)").unwrap();
        assert_eq!((c.ty, c.konst), (Type::FLOAT64, Some(Const::Float(3.0))));
        let c = check("string(65)").unwrap();
        assert_eq!(c.konst, Some(Const::String("A".into())));
        assert_eq!(codes("int(1.5)"), vec!["CHK015"]);
        assert_eq!(codes("byte(300)"), vec!["CHK013"]);
        assert_eq!(codes("int(\"a\")"), vec!["CHK050"]);
        assert_eq!(codes("int(1, 2)"), vec!["CHK021"]);
    }

    #[test]
    /// 非定数の変換の可否。
    fn runtime_conversions() {
        assert_eq!(check("[]byte(\"hi\")").unwrap().ty.to_string(), "[]uint8");
        assert_eq!(check("string([]rune(os.Args[0]))").unwrap().ty, Type::STRING);
        assert_eq!(check("float64(len(os.Args))").unwrap().ty, Type::FLOAT64);
        assert_eq!(check("interface{}(1)").unwrap().ty, Type::Interface);
        assert_eq!(check("[]int(nil)").unwrap().konst, Some(Const::Nil));
        assert_eq!(codes("[]int(os.Args)"), vec!["CHK050"]);
    }

    #[test]
    /// 組み込み関数 len / append / println の検査。
    fn builtins() {
        let c = check("len(\"héllo\")").unwrap();
        assert_eq!(c.konst, Some(Const::Int(6)));
        assert_eq!(check("len(os.Args)").unwrap().ty, Type::INT);
        assert_eq!(codes("len(1)"), vec!["CHK024"]);
        assert_eq!(check("append(os.Args, \"x\")").unwrap().ty.to_string(), "[]string");
        assert_eq!(check("append([]byte(\"a\"), \"bc\"...)").unwrap().ty.to_string(), "[]uint8");
        assert_eq!(codes("append(nil, 1)"), vec!["CHK024"]);
        assert_eq!(codes("append(os.Args, 1)"), vec!["CHK022"]);
        assert_eq!(check("println(1, \"a\")").unwrap().ty, Type::Tuple(vec![]));
        assert_eq!(codes("println(nil)"), vec!["CHK024"]);
    }

    #[test]
    /// 値を返さない呼び出しは値の文脈に置けない。
    fn void_calls_in_value_context() {
        assert_eq!(codes("println() + 1"), vec!["CHK031"]);
        assert_eq!(codes("fmt.Println() + 1"), vec!["CHK030"]);
    }
}
