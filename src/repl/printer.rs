// パス: src/repl/printer.rs
// 役割: 起動メッセージ・ヘルプ・束縛一覧など、REPL 自身の表示をまとめる
// 意図: 評価結果以外の対話メッセージの文面を一箇所で管理する
// 関連ファイル: src/repl/cmd.rs, src/env.rs
//! REPL の案内表示。評価結果の整形は `value::inspect` が担う。

use std::io::{self, Write};

use crate::env::Env;

pub(crate) const INTRO_TEXT: &str = concat!(
    "=== A simple Go eval REPL ===\n",
    "\n",
    "The environment is stored in global variable \"env\".\n",
    "The last result is stored in a global variable \"_\".\n",
    "\n",
    "Enter expressions to be evaluated at the \"go>\" prompt.\n",
    "\n",
    "To quit, enter: \"quit\" or Ctrl-D (EOF).\n",
);

const HELP_TEXT: &str = concat!(
    "Commands:\n",
    "  help [CMD]       show this message, or help for one command\n",
    "  browse [PREFIX]  list bindings whose name starts with PREFIX\n",
    "  !CMD             run CMD in the system shell\n",
    "  quit             leave the REPL\n",
    "\n",
    "Anything else is evaluated as a Go expression, e.g.\n",
    "  go> 1 + 2\n",
    "  go> _ * 10\n",
    "  go> fmt.Printf(\"%d args\\n\", len(os.Args))\n",
    "\n",
    "Basic types: bool string float64 int int8 int16 int32 int64 uint8 uint16 uint32,\n",
    "byte and rune. uint, uint64 and float32 are not available.\n",
);

/// コマンドごとの詳しい説明。
const TOPICS: &[(&str, &str)] = &[
    ("help", "help [CMD]\n  Show the command list, or the help for CMD.\n"),
    (
        "browse",
        "browse [PREFIX]\n  List variables, functions, types and packages with their types.\n  Package members are listed as pkg.Name; PREFIX filters on that name.\n",
    ),
    (
        "!",
        "!CMD\n  Run CMD with the system shell and copy its output.\n  Disabled with --no-shell.\n",
    ),
    ("quit", "quit\n  Leave the REPL. Ctrl-D on an empty line does the same.\n"),
];

/// 起動メッセージを書き出す。
pub(crate) fn render_intro<W: Write + ?Sized>(out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", INTRO_TEXT)
}

/// ヘルプを書き出す。未知のトピックなら `false` を返し、一覧を添える。
pub(crate) fn render_help<W: Write + ?Sized>(out: &mut W, topic: Option<&str>) -> io::Result<bool> {
    let Some(topic) = topic else {
        out.write_all(HELP_TEXT.as_bytes())?;
        return Ok(true);
    };
    match TOPICS.iter().find(|(name, _)| *name == topic) {
        Some((_, text)) => {
            out.write_all(text.as_bytes())?;
            Ok(true)
        }
        None => {
            writeln!(out, "no help for {:?}", topic)?;
            out.write_all(HELP_TEXT.as_bytes())?;
            Ok(false)
        }
    }
}

/// `browse` の 1 行分。
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BindingLine {
    pub kind: &'static str,
    pub name: String,
    pub ty: String,
}

/// 環境の束縛を名前付きで列挙する。パッケージの中身は `pkg.Name` で並べる。
pub(crate) fn collect_bindings(env: &Env, prefix: &str) -> Vec<BindingLine> {
    let mut lines = Vec::new();
    push_scope(&mut lines, env, "");
    lines.retain(|l| l.name.starts_with(prefix));
    lines
}

fn push_scope(lines: &mut Vec<BindingLine>, env: &Env, qual: &str) {
    let name = |n: &str| format!("{}{}", qual, n);
    for (n, tv) in &env.vars {
        lines.push(BindingLine {
            kind: "var",
            name: name(n),
            ty: tv.ty.to_string(),
        });
    }
    for (n, (ty, c)) in &env.consts {
        lines.push(BindingLine {
            kind: "const",
            name: name(n),
            ty: format!("{} = {}", ty, c),
        });
    }
    for (n, tv) in &env.funcs {
        lines.push(BindingLine {
            kind: "func",
            name: name(n),
            ty: tv.ty.to_string(),
        });
    }
    for (n, ty) in &env.types {
        let underlying = match ty.named() {
            Some(_) => "struct".into(),
            None => ty.to_string(),
        };
        lines.push(BindingLine {
            kind: "type",
            name: name(n),
            ty: underlying,
        });
    }
    for (n, pkg) in &env.pkgs {
        lines.push(BindingLine {
            kind: "package",
            name: name(n),
            ty: format!("{:?}", pkg.path),
        });
        push_scope(lines, pkg, &format!("{}{}.", qual, n));
    }
}

/// `browse` の結果を書き出す。
pub(crate) fn render_bindings<W: Write + ?Sized>(out: &mut W, lines: &[BindingLine]) -> io::Result<()> {
    let width = lines.iter().map(|l| l.name.len()).max().unwrap_or(0);
    for l in lines {
        writeln!(out, "{:<8}{:<width$}  {}", l.kind, l.name, l.ty, width = width)?;
    }
    Ok(())
}
