// パス: src/env.rs
// 役割: 式から参照できる識別子・関数・パッケージの記号表を構築する
// 意図: ルート環境と `fmt` / `os` パッケージを 1 か所で組み立て、検査器と評価器へ渡す
// 関連ファイル: src/stdlib/mod.rs, src/checker/mod.rs, src/repl/dispatch.rs
//! 環境（スコープ）と記号表
//!
//! - 各スコープは変数・定数・関数・型の 4 つの表と、名前付きの子スコープ（パッケージ）を持つ。
//! - 表はすべて `BTreeMap` なので、同じ表の中で名前は一意になり、一覧は名前順に並ぶ。
//! - 構築後に書き換わるのは、ディスパッチャが評価成功後に書き込む `_` だけ。

use std::collections::BTreeMap;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::constant::Const;
use crate::stdlib;
use crate::types::{NamedType, Type};
use crate::value::{EnvSnapshot, FileHandle, FuncValue, TypedValue, Value};

/// `env` 変数の型 `*eval.Env` が指す構造体。
pub static ENV_TYPE: Lazy<Arc<NamedType>> = Lazy::new(|| {
    let names = Type::slice_of(Type::STRING);
    Arc::new(NamedType {
        name: "eval.Env".into(),
        fields: vec![
            ("Name".into(), Type::STRING),
            ("Path".into(), Type::STRING),
            ("Vars".into(), names.clone()),
            ("Consts".into(), names.clone()),
            ("Funcs".into(), names.clone()),
            ("Types".into(), names.clone()),
            ("Pkgs".into(), names),
        ],
        methods: Vec::new(),
    })
});

#[derive(Clone, Debug, Default)]
pub struct Env {
    pub name: String,
    pub path: String,
    pub vars: BTreeMap<String, TypedValue>,
    pub consts: BTreeMap<String, (Type, Const)>,
    pub funcs: BTreeMap<String, TypedValue>,
    pub types: BTreeMap<String, Type>,
    pub pkgs: BTreeMap<String, Env>,
}

/// 名前解決の結果。
#[derive(Clone, Copy, Debug)]
pub enum Binding<'a> {
    Var(&'a TypedValue),
    Const(&'a Type, &'a Const),
    Func(&'a TypedValue),
    Type(&'a Type),
    Pkg(&'a Env),
}

impl Env {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    /// 現在のスコープの表を順に引き、見つからなければパッケージ名として引く。
    pub fn lookup(&self, name: &str) -> Option<Binding<'_>> {
        if let Some(v) = self.vars.get(name) {
            return Some(Binding::Var(v));
        }
        if let Some((t, c)) = self.consts.get(name) {
            return Some(Binding::Const(t, c));
        }
        if let Some(f) = self.funcs.get(name) {
            return Some(Binding::Func(f));
        }
        if let Some(t) = self.types.get(name) {
            return Some(Binding::Type(t));
        }
        self.pkgs.get(name).map(Binding::Pkg)
    }

    /// `pkg.name` を解決する。
    pub fn lookup_qualified(&self, pkg: &str, name: &str) -> Option<Binding<'_>> {
        self.pkgs.get(pkg)?.lookup(name)
    }

    pub fn var(&self, name: &str) -> Option<&TypedValue> {
        self.vars.get(name)
    }

    pub fn set_var(&mut self, name: impl Into<String>, value: TypedValue) {
        self.vars.insert(name.into(), value);
    }

    /// このスコープの名前一覧を写し取る。
    pub fn snapshot(&self) -> EnvSnapshot {
        fn keys<V>(m: &BTreeMap<String, V>) -> Vec<String> {
            m.keys().cloned().collect()
        }
        EnvSnapshot {
            name: self.name.clone(),
            path: self.path.clone(),
            vars: keys(&self.vars),
            consts: keys(&self.consts),
            funcs: keys(&self.funcs),
            types: keys(&self.types),
            pkgs: keys(&self.pkgs),
        }
    }
}

fn native(pkg: &str, name: &str, ty: Type, f: crate::value::NativeFn) -> (String, TypedValue) {
    let value = Value::Func(FuncValue::native(format!("{pkg}.{name}"), f));
    (name.to_string(), TypedValue::new(ty, value))
}

fn fmt_package() -> Env {
    let mut pkg = Env::new("fmt", "fmt");
    let any = Type::slice_of(Type::Interface);
    let (name, f) = native(
        "fmt",
        "Println",
        Type::func(vec![any.clone()], vec![Type::INT, Type::Error], true),
        stdlib::fmt::println,
    );
    pkg.funcs.insert(name, f);
    let (name, f) = native(
        "fmt",
        "Printf",
        Type::func(vec![Type::STRING, any], vec![Type::INT, Type::Error], true),
        stdlib::fmt::printf,
    );
    pkg.funcs.insert(name, f);
    pkg
}

fn os_package(args: Vec<String>) -> Env {
    let mut pkg = Env::new("os", "os");
    let file = Type::Named(stdlib::os::FILE_TYPE.clone());
    let argv = args.into_iter().map(|a| Value::String(a.into_bytes())).collect();
    pkg.set_var(
        "Args",
        TypedValue::new(Type::slice_of(Type::STRING), Value::Slice(argv)),
    );
    pkg.set_var(
        "Stdout",
        TypedValue::new(Type::pointer_to(file.clone()), Value::File(FileHandle::Stdout)),
    );
    pkg.types.insert("File".into(), file);
    pkg
}

/// プロセス引数からルート環境を組み立てる。
pub fn make_env(args: Vec<String>) -> Env {
    let mut root = Env::new(".", "");
    root.pkgs.insert("fmt".into(), fmt_package());
    root.pkgs.insert("os".into(), os_package(args));
    root.set_var(
        "env",
        TypedValue::new(
            Type::pointer_to(Type::Named(ENV_TYPE.clone())),
            Value::EnvSelf,
        ),
    );
    root.set_var("_", TypedValue::nil());
    tracing::debug!(pkgs = root.pkgs.len(), "environment built");
    root
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// ルートに `env` と `_`、パッケージに `fmt` と `os` がある。
    fn root_bindings() {
        let env = make_env(vec!["prog".into(), "a".into()]);
        assert_eq!(env.name, ".");
        assert_eq!(env.path, "");
        assert!(matches!(env.lookup("env"), Some(Binding::Var(_))));
        assert_eq!(env.var("_"), Some(&TypedValue::nil()));
        assert!(matches!(env.lookup("fmt"), Some(Binding::Pkg(p)) if p.path == "fmt"));
        assert!(env.lookup("missing").is_none());
    }

    #[test]
    /// パッケージ内の修飾名を解決できる。
    fn qualified_lookup() {
        let env = make_env(vec!["prog".into()]);
        match env.lookup_qualified("os", "Args") {
            Some(Binding::Var(tv)) => {
                assert_eq!(tv.ty.to_string(), "[]string");
                assert_eq!(tv.value, Value::Slice(vec![Value::String("prog".into())]));
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(matches!(
            env.lookup_qualified("fmt", "Println"),
            Some(Binding::Func(_))
        ));
        assert!(matches!(
            env.lookup_qualified("os", "File"),
            Some(Binding::Type(_))
        ));
        assert!(env.lookup_qualified("fmt", "Sprintf").is_none());
    }

    #[test]
    /// 写しは名前順に並ぶ。
    fn snapshot_lists_sorted_names() {
        let env = make_env(vec![]);
        let snap = env.snapshot();
        assert_eq!(snap.vars, vec!["_".to_string(), "env".to_string()]);
        assert_eq!(snap.pkgs, vec!["fmt".to_string(), "os".to_string()]);
    }
}
