// パス: src/parser/mod.rs
// 役割: トークン列から AST を生成する再帰下降パーサのエントリポイント
// 意図: 字句解析結果を検査器に渡すためのモジュール構成を整理する
// 関連ファイル: src/parser/expr.rs, src/parser/types.rs, src/lexer.rs
//! 構文解析モジュール
//!
//! - Go の式文法（`go/parser.ParseExpr` 相当の範囲）を解析する。
//! - 二項演算子の優先順位は `INFIX_LEVELS` の表で低い順に並べ、すべて左結合とする。
//! - リテラルのデコード（エスケープ・基数）はここで済ませ、AST には値を持たせる。

use crate::ast::{BinaryOp, Expr, Span, TypeExpr, UnaryOp};
use crate::errors::ParseError;
use crate::lexer::{lex, Token, TokenKind};

mod expr;
mod types;

pub struct Parser {
    ts: Vec<Token>,
    i: usize,
}

pub(super) struct InfixSpec {
    pub ops: &'static [(TokenKind, BinaryOp)],
}

impl InfixSpec {
    pub(super) fn lookup(&self, kind: TokenKind) -> Option<BinaryOp> {
        self.ops.iter().find(|(tk, _)| *tk == kind).map(|(_, op)| *op)
    }
}

pub(super) const INFIX_LEVELS: &[InfixSpec] = &[
    InfixSpec {
        ops: &[(TokenKind::LOR, BinaryOp::LOr)],
    },
    InfixSpec {
        ops: &[(TokenKind::LAND, BinaryOp::LAnd)],
    },
    InfixSpec {
        ops: &[
            (TokenKind::EQL, BinaryOp::Eq),
            (TokenKind::NEQ, BinaryOp::Ne),
            (TokenKind::LSS, BinaryOp::Lt),
            (TokenKind::LEQ, BinaryOp::Le),
            (TokenKind::GTR, BinaryOp::Gt),
            (TokenKind::GEQ, BinaryOp::Ge),
        ],
    },
    InfixSpec {
        ops: &[
            (TokenKind::ADD, BinaryOp::Add),
            (TokenKind::SUB, BinaryOp::Sub),
            (TokenKind::OR, BinaryOp::Or),
            (TokenKind::XOR, BinaryOp::Xor),
        ],
    },
    InfixSpec {
        ops: &[
            (TokenKind::MUL, BinaryOp::Mul),
            (TokenKind::QUO, BinaryOp::Div),
            (TokenKind::REM, BinaryOp::Rem),
            (TokenKind::SHL, BinaryOp::Shl),
            (TokenKind::SHR, BinaryOp::Shr),
            (TokenKind::AND, BinaryOp::And),
            (TokenKind::ANDNOT, BinaryOp::AndNot),
        ],
    },
];

pub(super) const UNARY_OPS: &[(TokenKind, UnaryOp)] = &[
    (TokenKind::ADD, UnaryOp::Pos),
    (TokenKind::SUB, UnaryOp::Neg),
    (TokenKind::NOT, UnaryOp::Not),
    (TokenKind::XOR, UnaryOp::Complement),
    (TokenKind::AND, UnaryOp::Addr),
    (TokenKind::MUL, UnaryOp::Deref),
];

impl Parser {
    /// トークン列から新しいパーサインスタンスを構築する。
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { ts: tokens, i: 0 }
    }

    pub(super) fn peek(&self) -> &Token {
        // 末尾の EOF を越えて読み進めない
        &self.ts[self.i.min(self.ts.len() - 1)]
    }

    pub(super) fn pop_any(&mut self) -> Token {
        let t = self.peek().clone();
        if self.i < self.ts.len() - 1 {
            self.i += 1;
        }
        t
    }

    pub(super) fn pop(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        let t = self.peek().clone();
        if t.kind != kind {
            let msg = format!(
                "{} を期待しましたが {} が見つかりました",
                describe(kind, ""),
                describe(t.kind, &t.value)
            );
            return Err(error_at("PAR001", msg, &t));
        }
        Ok(self.pop_any())
    }

    pub(super) fn accept(&mut self, kind: TokenKind) -> Option<Token> {
        if self.peek().kind == kind {
            Some(self.pop_any())
        } else {
            None
        }
    }
}

/// トークン位置を指す構文エラーを作る。
pub(super) fn error_at(code: &'static str, msg: impl Into<String>, t: &Token) -> ParseError {
    ParseError::at(code, msg, Some(t.pos), Some(t.line), Some(t.col))
}

/// 診断用にトークンを人間向けの表記へ直す。
pub(super) fn describe(kind: TokenKind, value: &str) -> String {
    match kind {
        TokenKind::EOF => "入力の終わり".into(),
        TokenKind::IDENT => {
            if value.is_empty() {
                "識別子".into()
            } else {
                format!("識別子 {}", value)
            }
        }
        TokenKind::RPAREN => "')'".into(),
        TokenKind::RBRACK => "']'".into(),
        TokenKind::RBRACE => "'}'".into(),
        _ if !value.is_empty() => format!("'{}'", value),
        other => format!("{:?}", other),
    }
}

pub(super) fn span_from_token(token: &Token) -> Span {
    Span::new(token.pos, token.line, token.col)
}

/// 整数リテラルを値へ変換する（`_` 区切り・基数接頭辞・旧式 8 進に対応）。
pub(super) fn decode_int(raw: &str) -> Result<i128, String> {
    let s: String = raw.chars().filter(|c| *c != '_').collect();
    let lower = s.to_ascii_lowercase();
    let (digits, base) = if let Some(rest) = lower.strip_prefix("0x") {
        (rest.to_string(), 16)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (rest.to_string(), 8)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (rest.to_string(), 2)
    } else if lower.len() > 1 && lower.starts_with('0') {
        if let Some(bad) = lower.chars().find(|c| !c.is_digit(8)) {
            return Err(format!("8 進数リテラルに不正な桁 '{}' があります", bad));
        }
        (lower[1..].to_string(), 8)
    } else {
        (lower, 10)
    };
    i128::from_str_radix(&digits, base).map_err(|_| "整数リテラルが大きすぎます".to_string())
}

/// 浮動小数リテラルを値へ変換する。
pub(super) fn decode_float(raw: &str) -> Result<f64, String> {
    let s: String = raw.chars().filter(|c| *c != '_').collect();
    s.parse::<f64>()
        .map_err(|_| format!("浮動小数リテラルが不正です: {}", raw))
}

fn take_hex(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, n: usize) -> Result<u32, String> {
    let mut v = 0u32;
    for _ in 0..n {
        let d = chars
            .next()
            .and_then(|c| c.to_digit(16))
            .ok_or_else(|| "16 進エスケープの桁が不足しています".to_string())?;
        v = v * 16 + d;
    }
    Ok(v)
}

/// エスケープ列を 1 つ読み、バイト列へ書き出す。
fn decode_escape(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    quote: char,
    out: &mut Vec<u8>,
) -> Result<(), String> {
    let Some(e) = chars.next() else {
        return Err("末尾のバックスラッシュ".into());
    };
    let simple = match e {
        'a' => Some(0x07),
        'b' => Some(0x08),
        'f' => Some(0x0c),
        'n' => Some(b'\n'),
        'r' => Some(b'\r'),
        't' => Some(b'\t'),
        'v' => Some(0x0b),
        '\\' => Some(b'\\'),
        c if c == quote => Some(c as u8),
        _ => None,
    };
    if let Some(b) = simple {
        out.push(b);
        return Ok(());
    }
    match e {
        'x' => {
            let v = take_hex(chars, 2)?;
            out.push(v as u8);
        }
        'u' | 'U' => {
            let v = take_hex(chars, if e == 'u' { 4 } else { 8 })?;
            let ch = char::from_u32(v)
                .ok_or_else(|| "不正な Unicode コードポイントです".to_string())?;
            let mut buf = [0u8; 4];
            out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
        }
        '0'..='7' => {
            let mut v = e.to_digit(8).unwrap_or(0);
            for _ in 0..2 {
                let d = chars
                    .next()
                    .and_then(|c| c.to_digit(8))
                    .ok_or_else(|| "8 進エスケープの桁が不足しています".to_string())?;
                v = v * 8 + d;
            }
            if v > 255 {
                return Err("8 進エスケープの値が大きすぎます".into());
            }
            out.push(v as u8);
        }
        other => return Err(format!("不明なエスケープシーケンス \\{}", other)),
    }
    Ok(())
}

/// 文字列リテラル（解釈付き `"..."` と生文字列 `` `...` ``）をデコードする。
pub(super) fn decode_string(quoted: &str) -> Result<Vec<u8>, String> {
    if let Some(raw) = quoted.strip_prefix('`').and_then(|s| s.strip_suffix('`')) {
        return Ok(raw.replace('\r', "").into_bytes());
    }
    let inner = quoted
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(|| "文字列リテラルが不正です".to_string())?;
    let mut out = Vec::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            decode_escape(&mut chars, '"', &mut out)?;
        } else {
            let mut buf = [0u8; 4];
            out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
        }
    }
    Ok(out)
}

/// rune リテラルを 1 文字へデコードする。
pub(super) fn decode_rune(quoted: &str) -> Result<char, String> {
    let inner = quoted
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .ok_or_else(|| "rune リテラルが不正です".to_string())?;
    let mut chars = inner.chars().peekable();
    let ch = match chars.next() {
        Some('\\') => {
            let mut out = Vec::new();
            decode_escape(&mut chars, '\'', &mut out)?;
            match std::str::from_utf8(&out) {
                Ok(s) if s.chars().count() == 1 => s.chars().next(),
                // \xff のような 1 バイトは Latin-1 の符号位置として扱う
                _ if out.len() == 1 => Some(out[0] as char),
                _ => None,
            }
        }
        other => other,
    };
    match (ch, chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err("rune リテラルには 1 文字だけを書けます".into()),
    }
}

/// 1 行の Go 式を解析する。末尾に余分なトークンがあればエラー。
pub fn parse_expr(src: &str) -> Result<Expr, ParseError> {
    let ts = lex(src)?;
    let mut p = Parser::new(ts);
    let e = p.parse_expr()?;
    // 行末の `;` は Go の自動セミコロンと同様に読み飛ばす
    p.accept(TokenKind::SEMICOLON);
    let t = p.peek().clone();
    match t.kind {
        TokenKind::EOF => Ok(e),
        TokenKind::ASSIGN | TokenKind::DEFINE | TokenKind::INC | TokenKind::DEC => Err(error_at(
            "PAR091",
            "文は評価できません（式のみ入力できます）",
            &t,
        )),
        _ => Err(error_at(
            "PAR090",
            format!("余分なトークンが残っています: {}", describe(t.kind, &t.value)),
            &t,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_int, decode_rune, decode_string};

    #[test]
    /// 文字列リテラルの基本的なエスケープをテストする。
    fn decode_string_basic_escapes() {
        assert_eq!(decode_string("\"a\\n\"").unwrap(), b"a\n");
        assert_eq!(decode_string("\"\\t\\\"\"").unwrap(), b"\t\"");
        assert_eq!(decode_string("\"\\x41\\u00e9\\101\"").unwrap(), "AéA".as_bytes());
        assert_eq!(decode_string("`a\\n`").unwrap(), b"a\\n");
        assert!(decode_string("\"\\q\"").is_err());
        // \x エスケープは UTF-8 でないバイトもそのまま持つ
        assert_eq!(decode_string("\"\\xff\"").unwrap(), vec![0xff]);
    }

    #[test]
    /// rune リテラルのエスケープをテストする。
    fn decode_rune_escapes_and_plain() {
        assert_eq!(decode_rune("'a'").unwrap(), 'a');
        assert_eq!(decode_rune("'\\n'").unwrap(), '\n');
        assert_eq!(decode_rune("'\\''").unwrap(), '\'');
        assert_eq!(decode_rune("'é'").unwrap(), 'é');
        assert_eq!(decode_rune("'\\xff'").unwrap(), 'ÿ');
        assert!(decode_rune("'ab'").is_err());
        assert!(decode_rune("'\\\"'").is_err());
    }

    #[test]
    /// 基数接頭辞と旧式 8 進表記を解釈する。
    fn decode_int_bases() {
        assert_eq!(decode_int("42").unwrap(), 42);
        assert_eq!(decode_int("0x_FF").unwrap(), 255);
        assert_eq!(decode_int("0o17").unwrap(), 15);
        assert_eq!(decode_int("017").unwrap(), 15);
        assert_eq!(decode_int("0b101").unwrap(), 5);
        assert_eq!(decode_int("1_000").unwrap(), 1000);
        assert!(decode_int("09").is_err());
    }
}
