// パス: src/checker/tree.rs
// 役割: 検査済みの式木（型と定数値の注釈付き）を定義する
// 意図: 評価器が名前解決や型判定をやり直さずに済むよう、検査結果をすべて木に載せる
// 関連ファイル: src/checker/mod.rs, src/evaluator.rs

use crate::ast::{BinaryOp, Span, UnaryOp};
use crate::constant::Const;
use crate::types::Type;
use crate::universe::Builtin;

/// 型注釈付きの式。`konst` があればその値で畳み込み済み。
#[derive(Clone, Debug, PartialEq)]
pub struct CheckedExpr {
    pub node: Node,
    pub ty: Type,
    pub konst: Option<Const>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    /// 定数（値は `konst`）。
    Const,
    Var {
        pkg: Option<String>,
        name: String,
    },
    Func {
        pkg: Option<String>,
        name: String,
    },
    Field {
        x: Box<CheckedExpr>,
        name: String,
    },
    /// 受け手を束縛したメソッド値。
    Method {
        x: Box<CheckedExpr>,
        name: String,
    },
    Index {
        x: Box<CheckedExpr>,
        index: Box<CheckedExpr>,
    },
    Slice {
        x: Box<CheckedExpr>,
        lo: Option<Box<CheckedExpr>>,
        hi: Option<Box<CheckedExpr>>,
    },
    /// 引数は仮引数と同じ個数にそろえてある（可変長部分は `SliceLit` に詰め済み）。
    Call {
        func: Box<CheckedExpr>,
        args: Vec<CheckedExpr>,
    },
    Builtin {
        builtin: Builtin,
        args: Vec<CheckedExpr>,
        spread: bool,
    },
    /// `x` を `ty` へ変換する（明示的な変換とインタフェースへの暗黙の格納の両方）。
    Convert {
        x: Box<CheckedExpr>,
    },
    Unary {
        op: UnaryOp,
        x: Box<CheckedExpr>,
    },
    Binary {
        op: BinaryOp,
        x: Box<CheckedExpr>,
        y: Box<CheckedExpr>,
    },
    SliceLit {
        elems: Vec<CheckedExpr>,
    },
}

impl CheckedExpr {
    pub fn new(node: Node, ty: Type, span: Span) -> Self {
        Self {
            node,
            ty,
            konst: None,
            span,
        }
    }

    pub fn constant(ty: Type, value: Const, span: Span) -> Self {
        Self {
            node: Node::Const,
            ty,
            konst: Some(value),
            span,
        }
    }

    pub fn is_const(&self) -> bool {
        self.konst.is_some()
    }

    /// 定数 `nil`（型付けの前後を問わない）。
    pub fn is_nil(&self) -> bool {
        matches!(self.konst, Some(Const::Nil))
    }

    /// `ty` への変換ノードで包む。
    pub fn convert_to(self, ty: Type) -> Self {
        let span = self.span;
        Self::new(
            Node::Convert {
                x: Box::new(self),
            },
            ty,
            span,
        )
    }
}
