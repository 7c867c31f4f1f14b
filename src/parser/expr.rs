// パス: src/parser/expr.rs
// 役割: 式解析に関する `Parser` 実装をまとめる
// 意図: 二項演算の優先順位処理と一次式（呼び出し・添字・セレクタ）を専用モジュールに切り分ける
// 関連ファイル: src/parser/mod.rs, src/parser/types.rs, src/ast.rs

use super::*;

impl Parser {
    pub(super) fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary(0)
    }

    /// `INFIX_LEVELS[level]` 以上の優先順位を持つ二項式を読む（左結合）。
    fn parse_binary(&mut self, level: usize) -> Result<Expr, ParseError> {
        let Some(spec) = INFIX_LEVELS.get(level) else {
            return self.parse_unary();
        };
        let mut lhs = self.parse_binary(level + 1)?;
        while let Some(op) = spec.lookup(self.peek().kind) {
            let op_tok = self.pop_any();
            let rhs = self.parse_binary(level + 1)?;
            lhs = Expr::Binary {
                op,
                x: Box::new(lhs),
                y: Box::new(rhs),
                span: span_from_token(&op_tok),
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let t = self.peek().clone();
        if t.kind == TokenKind::ARROW {
            return Err(error_at("PAR003", "チャネル受信 '<-' は扱えません", &t));
        }
        if let Some((_, op)) = UNARY_OPS.iter().find(|(k, _)| *k == t.kind) {
            self.pop_any();
            let x = self.parse_unary()?;
            return Ok(Expr::Unary {
                op: *op,
                x: Box::new(x),
                span: span_from_token(&t),
            });
        }
        self.parse_primary()
    }

    /// オペランドに続くセレクタ・添字・スライス・呼び出しを繰り返し読む。
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let mut x = self.parse_operand()?;
        loop {
            match self.peek().kind {
                TokenKind::PERIOD => {
                    let dot = self.pop_any();
                    if self.peek().kind == TokenKind::LPAREN {
                        return Err(error_at("PAR004", "型アサーションは扱えません", &dot));
                    }
                    let sel = self.pop(TokenKind::IDENT)?;
                    x = Expr::Selector {
                        x: Box::new(x),
                        sel: sel.value,
                        span: span_from_token(&dot),
                    };
                }
                TokenKind::LBRACK => {
                    let lb = self.pop_any();
                    x = self.parse_index_or_slice(x, &lb)?;
                }
                TokenKind::LPAREN => {
                    let lp = self.pop_any();
                    x = self.parse_call(x, &lp)?;
                }
                _ => return Ok(x),
            }
        }
    }

    fn parse_index_or_slice(&mut self, x: Expr, lb: &Token) -> Result<Expr, ParseError> {
        let lo = if self.peek().kind == TokenKind::COLON {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };
        if self.accept(TokenKind::COLON).is_none() {
            self.pop(TokenKind::RBRACK)?;
            let Some(index) = lo else {
                return Err(error_at("PAR005", "添字式がありません", lb));
            };
            return Ok(Expr::Index {
                x: Box::new(x),
                index,
                span: span_from_token(lb),
            });
        }
        let hi = match self.peek().kind {
            TokenKind::RBRACK => None,
            TokenKind::COLON => {
                let t = self.peek().clone();
                return Err(error_at("PAR006", "3 インデックスのスライスは扱えません", &t));
            }
            _ => Some(Box::new(self.parse_expr()?)),
        };
        self.pop(TokenKind::RBRACK)?;
        Ok(Expr::Slice {
            x: Box::new(x),
            lo,
            hi,
            span: span_from_token(lb),
        })
    }

    fn parse_call(&mut self, func: Expr, lp: &Token) -> Result<Expr, ParseError> {
        let mut args = Vec::new();
        let mut spread = false;
        while self.peek().kind != TokenKind::RPAREN {
            args.push(self.parse_expr()?);
            if let Some(dots) = self.accept(TokenKind::ELLIPSIS) {
                if spread {
                    return Err(error_at("PAR007", "'...' は最後の引数にだけ書けます", &dots));
                }
                spread = true;
            }
            if self.accept(TokenKind::COMMA).is_none() {
                break;
            }
            if spread && self.peek().kind != TokenKind::RPAREN {
                let t = self.peek().clone();
                return Err(error_at("PAR007", "'...' は最後の引数にだけ書けます", &t));
            }
        }
        self.pop(TokenKind::RPAREN)?;
        Ok(Expr::Call {
            func: Box::new(func),
            args,
            spread,
            span: span_from_token(lp),
        })
    }

    fn parse_operand(&mut self) -> Result<Expr, ParseError> {
        let t = self.peek().clone();
        let span = span_from_token(&t);
        match t.kind {
            TokenKind::INT => {
                self.pop_any();
                let value = decode_int(&t.value).map_err(|m| error_at("PAR010", m, &t))?;
                Ok(Expr::IntLit {
                    value,
                    raw: t.value,
                    span,
                })
            }
            TokenKind::FLOAT => {
                self.pop_any();
                let value = decode_float(&t.value).map_err(|m| error_at("PAR011", m, &t))?;
                Ok(Expr::FloatLit {
                    value,
                    raw: t.value,
                    span,
                })
            }
            TokenKind::CHAR => {
                self.pop_any();
                let value = decode_rune(&t.value).map_err(|m| error_at("PAR012", m, &t))?;
                Ok(Expr::RuneLit {
                    value,
                    raw: t.value,
                    span,
                })
            }
            TokenKind::STRING => {
                self.pop_any();
                let value = decode_string(&t.value).map_err(|m| error_at("PAR013", m, &t))?;
                Ok(Expr::StringLit {
                    value,
                    raw: t.value,
                    span,
                })
            }
            TokenKind::IMAG => Err(error_at("PAR014", "虚数リテラルは扱えません", &t)),
            TokenKind::IDENT => {
                self.pop_any();
                Ok(Expr::Ident {
                    name: t.value,
                    span,
                })
            }
            TokenKind::LPAREN => {
                self.pop_any();
                let inner = self.parse_expr()?;
                self.pop(TokenKind::RPAREN)?;
                Ok(Expr::Paren {
                    inner: Box::new(inner),
                    span,
                })
            }
            TokenKind::LBRACK => {
                let ty = self.parse_type()?;
                if self.peek().kind == TokenKind::LBRACE {
                    self.parse_composite(ty, span)
                } else {
                    Ok(Expr::Type { ty, span })
                }
            }
            TokenKind::INTERFACE => {
                let ty = self.parse_type()?;
                Ok(Expr::Type { ty, span })
            }
            TokenKind::FUNC => Err(error_at("PAR015", "関数リテラルは扱えません", &t)),
            TokenKind::MAP | TokenKind::STRUCT | TokenKind::CHAN => Err(error_at(
                "PAR016",
                format!("{} 型は扱えません", t.value),
                &t,
            )),
            _ => Err(error_at(
                "PAR002",
                format!("オペランドを期待しましたが {} が見つかりました", describe(t.kind, &t.value)),
                &t,
            )),
        }
    }

    /// `[]T{a, b, ...}` の要素列を読む。キー付き要素は受け付けない。
    fn parse_composite(&mut self, ty: TypeExpr, span: Span) -> Result<Expr, ParseError> {
        self.pop(TokenKind::LBRACE)?;
        let mut elems = Vec::new();
        while self.peek().kind != TokenKind::RBRACE {
            elems.push(self.parse_expr()?);
            if self.peek().kind == TokenKind::COLON {
                let t = self.peek().clone();
                return Err(error_at("PAR017", "キー付きの要素は扱えません", &t));
            }
            if self.accept(TokenKind::COMMA).is_none() {
                break;
            }
        }
        self.pop(TokenKind::RBRACE)?;
        Ok(Expr::CompositeLit { ty, elems, span })
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{BinaryOp, Expr, UnaryOp};
    use crate::parser::parse_expr;

    #[test]
    /// 乗算が加算より強く結合することを確認する。
    fn precedence_mul_over_add() {
        let e = parse_expr("1 + 2 * 3").unwrap();
        match e {
            Expr::Binary { op, y, .. } => {
                assert_eq!(op, BinaryOp::Add);
                assert!(matches!(*y, Expr::Binary { op: BinaryOp::Mul, .. }));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    /// 同じ優先順位は左結合になる。
    fn same_level_is_left_assoc() {
        let e = parse_expr("8 - 2 - 1").unwrap();
        assert_eq!(e.to_string(), "8 - 2 - 1");
        match e {
            Expr::Binary { x, .. } => {
                assert!(matches!(*x, Expr::Binary { op: BinaryOp::Sub, .. }))
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    /// 単項演算子は入れ子にできる。
    fn nested_unary() {
        let e = parse_expr("-^x").unwrap();
        match e {
            Expr::Unary { op, x, .. } => {
                assert_eq!(op, UnaryOp::Neg);
                assert!(matches!(*x, Expr::Unary { op: UnaryOp::Complement, .. }));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    /// セレクタ・呼び出し・スプレッドを連結して読む。
    fn selector_call_spread() {
        let e = parse_expr("fmt.Println(os.Args...)").unwrap();
        match e {
            Expr::Call { args, spread, .. } => {
                assert_eq!(args.len(), 1);
                assert!(spread);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    /// 添字とスライスを区別する。
    fn index_and_slice() {
        assert!(matches!(parse_expr("a[1]").unwrap(), Expr::Index { .. }));
        match parse_expr("a[:2]").unwrap() {
            Expr::Slice { lo, hi, .. } => {
                assert!(lo.is_none());
                assert!(hi.is_some());
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(parse_expr("a[1:2:3]").is_err());
    }

    #[test]
    /// スライスの複合リテラルと変換を読む。
    fn composite_and_conversion() {
        let e = parse_expr("[]int{1, 2,}").unwrap();
        assert_eq!(e.to_string(), "[]int{1, 2}");
        let e = parse_expr("[]byte(\"hi\")").unwrap();
        match e {
            Expr::Call { func, .. } => assert!(matches!(*func, Expr::Type { .. })),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(parse_expr("interface{}(1)").is_ok());
    }

    #[test]
    /// 対応していない構文は構文エラーになる。
    fn unsupported_forms_are_rejected() {
        assert_eq!(parse_expr("func() {}").unwrap_err().code(), "PAR015");
        assert_eq!(parse_expr("x.(int)").unwrap_err().code(), "PAR004");
        assert_eq!(parse_expr("1i").unwrap_err().code(), "PAR014");
        assert_eq!(parse_expr("<-ch").unwrap_err().code(), "PAR003");
        assert_eq!(parse_expr("x := 1").unwrap_err().code(), "PAR091");
        assert_eq!(parse_expr("1 2").unwrap_err().code(), "PAR090");
        assert_eq!(parse_expr("1 +").unwrap_err().code(), "PAR002");
    }
}
