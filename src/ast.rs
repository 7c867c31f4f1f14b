// パス: src/ast.rs
// 役割: Go 式の抽象構文木と演算子の定義
// 意図: 構文解析結果を検査器へ渡す中立的な表現を提供する
// 関連ファイル: src/parser/expr.rs, src/checker/mod.rs
//! 抽象構文木（AST）
//!
//! 設計ノート:
//! - 位置情報（`Span`）は各ノードの先頭トークンを指し、検査エラーの列表示に使う。
//! - 型式（`TypeExpr`）は複合リテラルと変換のためだけに持ち、`types::Type` とは分離する。
//! - `Display` は Go のソースに近い形へ戻す（括弧は最小限）。

use std::fmt;

/// ソース中の位置（バイトオフセットと 1-origin の行・列）。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Span {
    pub pos: usize,
    pub line: usize,
    pub col: usize,
}

impl Span {
    pub fn new(pos: usize, line: usize, col: usize) -> Self {
        Self { pos, line, col }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Ident {
        name: String,
        span: Span,
    },
    IntLit {
        value: i128,
        raw: String,
        span: Span,
    },
    FloatLit {
        value: f64,
        raw: String,
        span: Span,
    },
    RuneLit {
        value: char,
        raw: String,
        span: Span,
    },
    StringLit {
        value: Vec<u8>,
        raw: String,
        span: Span,
    },
    Paren {
        inner: Box<Expr>,
        span: Span,
    },
    Selector {
        x: Box<Expr>,
        sel: String,
        span: Span,
    },
    Index {
        x: Box<Expr>,
        index: Box<Expr>,
        span: Span,
    },
    Slice {
        x: Box<Expr>,
        lo: Option<Box<Expr>>,
        hi: Option<Box<Expr>>,
        span: Span,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        spread: bool,
        span: Span,
    },
    Unary {
        op: UnaryOp,
        x: Box<Expr>,
        span: Span,
    },
    Binary {
        op: BinaryOp,
        x: Box<Expr>,
        y: Box<Expr>,
        span: Span,
    },
    CompositeLit {
        ty: TypeExpr,
        elems: Vec<Expr>,
        span: Span,
    },
    /// 式の位置に現れた型（`[]int(x)` の `[]int` など）。
    Type {
        ty: TypeExpr,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Ident { span, .. }
            | Expr::IntLit { span, .. }
            | Expr::FloatLit { span, .. }
            | Expr::RuneLit { span, .. }
            | Expr::StringLit { span, .. }
            | Expr::Paren { span, .. }
            | Expr::Selector { span, .. }
            | Expr::Index { span, .. }
            | Expr::Slice { span, .. }
            | Expr::Call { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Binary { span, .. }
            | Expr::CompositeLit { span, .. }
            | Expr::Type { span, .. } => *span,
        }
    }
}

/// 型式（パーサ用）。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeExpr {
    /// `int` や `os.File` のような（修飾付き）型名。
    Name { pkg: Option<String>, name: String },
    Slice(Box<TypeExpr>),
    Pointer(Box<TypeExpr>),
    /// 空インタフェース `interface{}` のみを扱う。
    Interface,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Pos,
    Neg,
    Not,
    Complement,
    Addr,
    Deref,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    AndNot,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LAnd,
    LOr,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        use BinaryOp::*;
        match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Rem => "%",
            And => "&",
            Or => "|",
            Xor => "^",
            AndNot => "&^",
            Shl => "<<",
            Shr => ">>",
            Eq => "==",
            Ne => "!=",
            Lt => "<",
            Le => "<=",
            Gt => ">",
            Ge => ">=",
            LAnd => "&&",
            LOr => "||",
        }
    }

    pub fn is_comparison(self) -> bool {
        use BinaryOp::*;
        matches!(self, Eq | Ne | Lt | Le | Gt | Ge)
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOp::Shl | BinaryOp::Shr)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::LAnd | BinaryOp::LOr)
    }
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Pos => "+",
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::Complement => "^",
            UnaryOp::Addr => "&",
            UnaryOp::Deref => "*",
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Name { pkg: Some(p), name } => write!(f, "{p}.{name}"),
            TypeExpr::Name { pkg: None, name } => write!(f, "{name}"),
            TypeExpr::Slice(elem) => write!(f, "[]{elem}"),
            TypeExpr::Pointer(elem) => write!(f, "*{elem}"),
            TypeExpr::Interface => write!(f, "interface {{}}"),
        }
    }
}

fn join(items: &[Expr]) -> String {
    items
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Ident { name, .. } => write!(f, "{name}"),
            Expr::IntLit { raw, .. }
            | Expr::FloatLit { raw, .. }
            | Expr::RuneLit { raw, .. }
            | Expr::StringLit { raw, .. } => write!(f, "{raw}"),
            Expr::Paren { inner, .. } => write!(f, "({inner})"),
            Expr::Selector { x, sel, .. } => write!(f, "{x}.{sel}"),
            Expr::Index { x, index, .. } => write!(f, "{x}[{index}]"),
            Expr::Slice { x, lo, hi, .. } => {
                write!(f, "{x}[")?;
                if let Some(lo) = lo {
                    write!(f, "{lo}")?;
                }
                write!(f, ":")?;
                if let Some(hi) = hi {
                    write!(f, "{hi}")?;
                }
                write!(f, "]")
            }
            Expr::Call {
                func, args, spread, ..
            } => {
                write!(f, "{func}({}", join(args))?;
                if *spread {
                    write!(f, "...")?;
                }
                write!(f, ")")
            }
            Expr::Unary { op, x, .. } => write!(f, "{}{x}", op.symbol()),
            Expr::Binary { op, x, y, .. } => write!(f, "{x} {} {y}", op.symbol()),
            Expr::CompositeLit { ty, elems, .. } => write!(f, "{ty}{{{}}}", join(elems)),
            Expr::Type { ty, .. } => write!(f, "{ty}"),
        }
    }
}
