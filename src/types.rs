// パス: src/types.rs
// 役割: Go の静的型（基本型・型なし定数・スライス・関数・名前付き型）を表現する
// 意図: 検査器・評価器・表示処理が同じ型表現を共有できるようにする
// 関連ファイル: src/checker/mod.rs, src/constant.rs, src/value.rs
//! 型表現モジュール
//!
//! - `Display` は Go の型文字列（`interface {}`、`func(...interface {}) (int, error)` など）に揃える。
//! - 名前付き型は `Arc` で共有し、同一性は修飾名で判定する。
//! - 宇宙スコープの表を `Lazy` の静的領域に置くため、共有には `Rc` ではなく `Arc` を使う。

use std::fmt;
use std::sync::Arc;

/// 組み込みの基本型。`byte` と `rune` は別名として `Uint8` / `Int32` に写す。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BasicKind {
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Float64,
    String,
}

impl BasicKind {
    pub fn name(self) -> &'static str {
        match self {
            BasicKind::Bool => "bool",
            BasicKind::Int => "int",
            BasicKind::Int8 => "int8",
            BasicKind::Int16 => "int16",
            BasicKind::Int32 => "int32",
            BasicKind::Int64 => "int64",
            BasicKind::Uint8 => "uint8",
            BasicKind::Uint16 => "uint16",
            BasicKind::Uint32 => "uint32",
            BasicKind::Float64 => "float64",
            BasicKind::String => "string",
        }
    }

    pub fn is_integer(self) -> bool {
        self.int_range().is_some()
    }

    pub fn is_unsigned(self) -> bool {
        matches!(self, BasicKind::Uint8 | BasicKind::Uint16 | BasicKind::Uint32)
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || self == BasicKind::Float64
    }

    /// 整数型が表現できる値の範囲（両端含む）。
    pub fn int_range(self) -> Option<(i128, i128)> {
        match self {
            BasicKind::Int | BasicKind::Int64 => Some((i64::MIN as i128, i64::MAX as i128)),
            BasicKind::Int8 => Some((i8::MIN as i128, i8::MAX as i128)),
            BasicKind::Int16 => Some((i16::MIN as i128, i16::MAX as i128)),
            BasicKind::Int32 => Some((i32::MIN as i128, i32::MAX as i128)),
            BasicKind::Uint8 => Some((0, u8::MAX as i128)),
            BasicKind::Uint16 => Some((0, u16::MAX as i128)),
            BasicKind::Uint32 => Some((0, u32::MAX as i128)),
            _ => None,
        }
    }
}

/// 型なし定数の種別。数値系は `Int < Rune < Float` の順に強い。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UntypedKind {
    Bool,
    Int,
    Rune,
    Float,
    String,
    Nil,
}

impl UntypedKind {
    pub fn name(self) -> &'static str {
        match self {
            UntypedKind::Bool => "untyped bool",
            UntypedKind::Int => "untyped int",
            UntypedKind::Rune => "untyped rune",
            UntypedKind::Float => "untyped float",
            UntypedKind::String => "untyped string",
            UntypedKind::Nil => "untyped nil",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            UntypedKind::Int | UntypedKind::Rune | UntypedKind::Float
        )
    }

    /// 既定型。`nil` には既定型がない。
    pub fn default_type(self) -> Option<Type> {
        match self {
            UntypedKind::Bool => Some(Type::BOOL),
            UntypedKind::Int => Some(Type::INT),
            UntypedKind::Rune => Some(Type::Basic(BasicKind::Int32)),
            UntypedKind::Float => Some(Type::FLOAT64),
            UntypedKind::String => Some(Type::STRING),
            UntypedKind::Nil => None,
        }
    }
}

/// 関数シグネチャ。可変長の場合、最後の引数型は `[]T` で保持する。
#[derive(Clone, Debug, PartialEq)]
pub struct Signature {
    pub params: Vec<Type>,
    pub results: Vec<Type>,
    pub variadic: bool,
}

impl Signature {
    pub fn new(params: Vec<Type>, results: Vec<Type>, variadic: bool) -> Self {
        Self {
            params,
            results,
            variadic,
        }
    }

    /// 結果型を 1 つの型にまとめる（0 個や複数個は `Tuple`）。
    pub fn result_type(&self) -> Type {
        if self.results.len() == 1 {
            self.results[0].clone()
        } else {
            Type::Tuple(self.results.clone())
        }
    }
}

/// `os.File` や `eval.Env` のような名前付き構造体型。
#[derive(Debug)]
pub struct NamedType {
    /// 修飾名（`os.File`）。
    pub name: String,
    pub fields: Vec<(String, Type)>,
    pub methods: Vec<(String, Signature)>,
}

impl PartialEq for NamedType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Type {
    Basic(BasicKind),
    Untyped(UntypedKind),
    Slice(Box<Type>),
    Pointer(Box<Type>),
    Func(Arc<Signature>),
    /// 空インタフェース `interface {}`。
    Interface,
    /// 事前宣言された `error` インタフェース。
    Error,
    Named(Arc<NamedType>),
    /// 複数（または 0 個）の結果を返す呼び出しの型。
    Tuple(Vec<Type>),
}

impl Type {
    pub const BOOL: Type = Type::Basic(BasicKind::Bool);
    pub const INT: Type = Type::Basic(BasicKind::Int);
    pub const FLOAT64: Type = Type::Basic(BasicKind::Float64);
    pub const STRING: Type = Type::Basic(BasicKind::String);
    pub const BYTE: Type = Type::Basic(BasicKind::Uint8);
    pub const RUNE: Type = Type::Basic(BasicKind::Int32);
    pub const NIL: Type = Type::Untyped(UntypedKind::Nil);

    pub fn slice_of(elem: Type) -> Type {
        Type::Slice(Box::new(elem))
    }

    pub fn pointer_to(elem: Type) -> Type {
        Type::Pointer(Box::new(elem))
    }

    pub fn func(params: Vec<Type>, results: Vec<Type>, variadic: bool) -> Type {
        Type::Func(Arc::new(Signature::new(params, results, variadic)))
    }

    pub fn basic(&self) -> Option<BasicKind> {
        match self {
            Type::Basic(k) => Some(*k),
            _ => None,
        }
    }

    pub fn untyped(&self) -> Option<UntypedKind> {
        match self {
            Type::Untyped(k) => Some(*k),
            _ => None,
        }
    }

    pub fn is_untyped(&self) -> bool {
        matches!(self, Type::Untyped(_))
    }

    pub fn is_integer(&self) -> bool {
        match self {
            Type::Basic(k) => k.is_integer(),
            Type::Untyped(k) => matches!(k, UntypedKind::Int | UntypedKind::Rune),
            _ => false,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(
            self,
            Type::Basic(BasicKind::Float64) | Type::Untyped(UntypedKind::Float)
        )
    }

    pub fn is_numeric(&self) -> bool {
        match self {
            Type::Basic(k) => k.is_numeric(),
            Type::Untyped(k) => k.is_numeric(),
            _ => false,
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(
            self,
            Type::Basic(BasicKind::String) | Type::Untyped(UntypedKind::String)
        )
    }

    pub fn is_bool(&self) -> bool {
        matches!(
            self,
            Type::Basic(BasicKind::Bool) | Type::Untyped(UntypedKind::Bool)
        )
    }

    pub fn is_interface(&self) -> bool {
        matches!(self, Type::Interface | Type::Error)
    }

    /// `nil` を代入・比較できる型か。
    pub fn is_nillable(&self) -> bool {
        matches!(
            self,
            Type::Slice(_) | Type::Pointer(_) | Type::Func(_) | Type::Interface | Type::Error
        )
    }

    /// `==` / `!=` で比較できるか（スライスと関数は `nil` とだけ比較できる）。
    pub fn is_comparable(&self) -> bool {
        match self {
            Type::Basic(_) | Type::Untyped(_) | Type::Pointer(_) => true,
            Type::Interface | Type::Error => true,
            Type::Named(n) => n.fields.iter().all(|(_, t)| t.is_comparable()),
            _ => false,
        }
    }

    /// `<` などの順序比較ができるか。
    pub fn is_ordered(&self) -> bool {
        self.is_numeric() || self.is_string()
    }

    pub fn elem(&self) -> Option<&Type> {
        match self {
            Type::Slice(e) | Type::Pointer(e) => Some(e),
            _ => None,
        }
    }

    /// 値またはポインタ経由で到達できる名前付き型。
    pub fn named(&self) -> Option<&Arc<NamedType>> {
        match self {
            Type::Named(n) => Some(n),
            Type::Pointer(inner) => match inner.as_ref() {
                Type::Named(n) => Some(n),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Type> {
        self.named()?
            .fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }

    pub fn method(&self, name: &str) -> Option<&Signature> {
        self.named()?
            .methods
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s)
    }

    /// 型なしの型を既定型へ置き換える。既定型がなければそのまま返す。
    pub fn defaulted(&self) -> Type {
        match self {
            Type::Untyped(k) => k.default_type().unwrap_or_else(|| self.clone()),
            other => other.clone(),
        }
    }

    /// 非定数の値が `target` へ代入可能か（定数の表現可能性は別途検査する）。
    pub fn assignable_to(&self, target: &Type) -> bool {
        if self == target {
            return true;
        }
        match (self, target) {
            (Type::Untyped(UntypedKind::Nil), t) => t.is_nillable(),
            (Type::Untyped(k), t) => match k.default_type() {
                Some(d) => d == *t || matches!(t, Type::Interface),
                None => false,
            },
            (_, Type::Interface) => !matches!(self, Type::Tuple(_)),
            _ => false,
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Type]) -> fmt::Result {
    for (i, t) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{t}")?;
    }
    Ok(())
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "func(")?;
        let last = self.params.len().saturating_sub(1);
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match (self.variadic && i == last, p) {
                (true, Type::Slice(elem)) => write!(f, "...{elem}")?,
                _ => write!(f, "{p}")?,
            }
        }
        write!(f, ")")?;
        match self.results.len() {
            0 => Ok(()),
            1 => write!(f, " {}", self.results[0]),
            _ => {
                write!(f, " (")?;
                write_list(f, &self.results)?;
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Basic(k) => write!(f, "{}", k.name()),
            Type::Untyped(k) => write!(f, "{}", k.name()),
            Type::Slice(e) => write!(f, "[]{e}"),
            Type::Pointer(e) => write!(f, "*{e}"),
            Type::Func(sig) => write!(f, "{sig}"),
            Type::Interface => write!(f, "interface {{}}"),
            Type::Error => write!(f, "error"),
            Type::Named(n) => write!(f, "{}", n.name),
            Type::Tuple(items) => {
                write!(f, "(")?;
                write_list(f, items)?;
                write!(f, ")")
            }
        }
    }
}
