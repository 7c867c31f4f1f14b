// パス: src/parser/types.rs
// 役割: 型式の構文解析ロジックを担当する
// 意図: 複合リテラルと変換に現れる型表記を式解析から分離する
// 関連ファイル: src/parser/expr.rs, src/parser/mod.rs, src/ast.rs

use super::*;

impl Parser {
    /// `[]T`、`*T`、`interface{}`、`name`、`pkg.Name`、`(T)` を読む。
    pub(super) fn parse_type(&mut self) -> Result<TypeExpr, ParseError> {
        let t = self.peek().clone();
        match t.kind {
            TokenKind::LBRACK => {
                self.pop_any();
                if self.peek().kind != TokenKind::RBRACK {
                    return Err(error_at("PAR020", "配列型は扱えません", &t));
                }
                self.pop_any();
                let elem = self.parse_type()?;
                Ok(TypeExpr::Slice(Box::new(elem)))
            }
            TokenKind::MUL => {
                self.pop_any();
                let elem = self.parse_type()?;
                Ok(TypeExpr::Pointer(Box::new(elem)))
            }
            TokenKind::INTERFACE => {
                self.pop_any();
                self.pop(TokenKind::LBRACE)?;
                if self.peek().kind != TokenKind::RBRACE {
                    let m = self.peek().clone();
                    return Err(error_at("PAR021", "空でないインタフェース型は扱えません", &m));
                }
                self.pop_any();
                Ok(TypeExpr::Interface)
            }
            TokenKind::IDENT => {
                self.pop_any();
                if self.accept(TokenKind::PERIOD).is_some() {
                    let name = self.pop(TokenKind::IDENT)?;
                    Ok(TypeExpr::Name {
                        pkg: Some(t.value),
                        name: name.value,
                    })
                } else {
                    Ok(TypeExpr::Name {
                        pkg: None,
                        name: t.value,
                    })
                }
            }
            TokenKind::LPAREN => {
                self.pop_any();
                let inner = self.parse_type()?;
                self.pop(TokenKind::RPAREN)?;
                Ok(inner)
            }
            TokenKind::MAP | TokenKind::STRUCT | TokenKind::CHAN | TokenKind::FUNC => Err(
                error_at("PAR016", format!("{} 型は扱えません", t.value), &t),
            ),
            _ => Err(error_at(
                "PAR022",
                format!("型を期待しましたが {} が見つかりました", describe(t.kind, &t.value)),
                &t,
            )),
        }
    }
}
