// パス: src/universe.rs
// 役割: 事前宣言された識別子（true/false/nil、基本型、組み込み関数）の表を提供する
// 意図: 環境に無い名前を最後に解決する外側のスコープを静的に用意する
// 関連ファイル: src/checker/mod.rs, src/checker/call.rs, src/types.rs

use std::collections::BTreeMap;

use once_cell::sync::Lazy;

use crate::constant::Const;
use crate::types::{BasicKind, Type, UntypedKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Builtin {
    Len,
    Append,
    Print,
    Println,
}

impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Len => "len",
            Builtin::Append => "append",
            Builtin::Print => "print",
            Builtin::Println => "println",
        }
    }
}

#[derive(Clone, Debug)]
pub enum UniverseEntry {
    Const(Type, Const),
    Type(Type),
    Builtin(Builtin),
}

static UNIVERSE: Lazy<BTreeMap<&'static str, UniverseEntry>> = Lazy::new(|| {
    use UniverseEntry as U;
    let mut m = BTreeMap::new();
    let untyped_bool = Type::Untyped(UntypedKind::Bool);
    m.insert("true", U::Const(untyped_bool.clone(), Const::Bool(true)));
    m.insert("false", U::Const(untyped_bool, Const::Bool(false)));
    m.insert("nil", U::Const(Type::NIL, Const::Nil));
    for kind in [
        BasicKind::Bool,
        BasicKind::Int,
        BasicKind::Int8,
        BasicKind::Int16,
        BasicKind::Int32,
        BasicKind::Int64,
        BasicKind::Uint8,
        BasicKind::Uint16,
        BasicKind::Uint32,
        BasicKind::Float64,
        BasicKind::String,
    ] {
        m.insert(kind.name(), U::Type(Type::Basic(kind)));
    }
    m.insert("byte", U::Type(Type::BYTE));
    m.insert("rune", U::Type(Type::RUNE));
    m.insert("error", U::Type(Type::Error));
    for b in [
        Builtin::Len,
        Builtin::Append,
        Builtin::Print,
        Builtin::Println,
    ] {
        m.insert(b.name(), U::Builtin(b));
    }
    m
});

pub fn lookup(name: &str) -> Option<&'static UniverseEntry> {
    UNIVERSE.get(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// 別名の型は同じ基本型に解決される。
    fn aliases_share_basic_kinds() {
        match (lookup("byte"), lookup("uint8")) {
            (Some(UniverseEntry::Type(a)), Some(UniverseEntry::Type(b))) => assert_eq!(a, b),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(matches!(
            lookup("append"),
            Some(UniverseEntry::Builtin(Builtin::Append))
        ));
        assert!(matches!(lookup("nil"), Some(UniverseEntry::Const(_, Const::Nil))));
        assert!(lookup("map").is_none());
    }
}
