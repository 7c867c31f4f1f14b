// パス: src/lexer.rs
// 役割: Go 式構文の字句解析器とトークン定義を提供する
// 意図: 構文解析に必要な位置付きトークンを生成する
// 関連ファイル: src/parser/mod.rs, src/errors.rs, tests/lexer_parser.rs
//! 字句解析モジュール
//!
//! - Go の字句規則のうち、式の解析に必要な範囲をトークン列へ変換する。
//! - 正規表現ライブラリを使わず、標準ライブラリのみで実装する。
//! - すべてのトークンに行・列・バイト位置を記録し、診断情報と連携させる。
//! - `true` / `false` / `nil` は Go と同じく予約語ではなく識別子として扱う。

use crate::errors::LexerError;

#[derive(Debug, Clone, PartialEq, Eq)]
/// 生成されたトークンとその位置情報を保持するレコード。
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub pos: usize,
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// 字句解析で識別されるトークンの分類。
pub enum TokenKind {
    EOF,
    // 算術・ビット演算子
    ADD,     // +
    SUB,     // -
    MUL,     // *
    QUO,     // /
    REM,     // %
    AND,     // &
    OR,      // |
    XOR,     // ^
    SHL,     // <<
    SHR,     // >>
    ANDNOT,  // &^
    // 論理・比較演算子
    LAND, // &&
    LOR,  // ||
    NOT,  // !
    EQL,  // ==
    NEQ,  // !=
    LSS,  // <
    LEQ,  // <=
    GTR,  // >
    GEQ,  // >=
    // 代入系（式としては不正だが診断のために認識する）
    ASSIGN, // =
    DEFINE, // :=
    ARROW,  // <-
    INC,    // ++
    DEC,    // --
    // 区切り記号
    LPAREN,
    RPAREN,
    LBRACK,
    RBRACK,
    LBRACE,
    RBRACE,
    COMMA,
    PERIOD,
    ELLIPSIS,
    SEMICOLON,
    COLON,
    // リテラル分類
    INT,
    FLOAT,
    IMAG,
    CHAR,
    STRING,
    // 識別子とキーワード
    IDENT,
    FUNC,
    INTERFACE,
    MAP,
    STRUCT,
    CHAN,
    KEYWORD, // 式中に現れえないその他のキーワード
}

const OTHER_KEYWORDS: &[&str] = &[
    "break",
    "case",
    "const",
    "continue",
    "default",
    "defer",
    "else",
    "fallthrough",
    "for",
    "go",
    "goto",
    "if",
    "import",
    "package",
    "range",
    "return",
    "select",
    "switch",
    "type",
    "var",
];

#[derive(Debug)]
/// 行頭オフセットを事前計算し、行・列情報を素早く算出するヘルパ。
struct LineMap {
    starts: Vec<usize>,
}

impl LineMap {
    /// 入力全体を 1 度だけ走査して行頭インデックスを収集する。
    fn new(src: &str) -> Self {
        let mut starts = vec![0];
        for (idx, ch) in src.char_indices() {
            if ch == '\n' {
                starts.push(idx + 1);
            }
        }
        Self { starts }
    }

    /// 指定バイト位置の行番号と桁位置を返す。
    fn locate(&self, src: &str, pos: usize) -> (usize, usize) {
        let idx = match self.starts.binary_search(&pos) {
            Ok(i) => i,
            Err(0) => 0,
            Err(i) => i - 1,
        };
        let start = self.starts[idx];
        let col = src[start..pos].chars().count() + 1;
        (idx + 1, col)
    }
}

fn is_letter(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_rest(c: char) -> bool {
    is_letter(c) || c.is_numeric()
}

fn is_digit_in(c: char, base: u32) -> bool {
    c == '_' || c.is_digit(base)
}

struct Lexer<'a> {
    src: &'a str,
    cursor: usize,
    line_map: LineMap,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            cursor: 0,
            line_map: LineMap::new(src),
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, LexerError> {
        loop {
            self.consume_trivia()?;
            if self.cursor >= self.src.len() {
                break;
            }
            self.lex_token()?;
        }
        let end = self.src.len();
        self.push(TokenKind::EOF, end, end);
        Ok(self.tokens)
    }

    fn consume_trivia(&mut self) -> Result<(), LexerError> {
        loop {
            match self.peek_char() {
                Some(c) if c.is_whitespace() => {
                    self.advance_char();
                }
                Some('/') if self.starts_with("//") => {
                    while let Some(c) = self.advance_char() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                Some('/') if self.starts_with("/*") => {
                    let start = self.cursor;
                    match self.src[self.cursor + 2..].find("*/") {
                        Some(off) => self.cursor += 2 + off + 2,
                        None => {
                            return Err(self.err("LEX001", "コメントが閉じていません", start));
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn lex_token(&mut self) -> Result<(), LexerError> {
        let start = self.cursor;
        let Some(ch) = self.peek_char() else {
            return Ok(());
        };
        if is_letter(ch) {
            return self.lex_identifier_or_keyword();
        }
        let leading_dot = ch == '.' && self.peek_second_char().is_some_and(|c| c.is_ascii_digit());
        if ch.is_ascii_digit() || leading_dot {
            return self.lex_number();
        }
        match ch {
            '\'' => return self.lex_rune(),
            '"' => return self.lex_string(),
            '`' => return self.lex_raw_string(),
            _ => {}
        }
        if self.try_operator() {
            return Ok(());
        }
        Err(self.err("LEX090", format!("不正な文字です: {:?}", ch), start))
    }

    fn try_operator(&mut self) -> bool {
        // 長い記号から順に照合する
        const OPERATORS: &[(&str, TokenKind)] = &[
            ("...", TokenKind::ELLIPSIS),
            ("&^", TokenKind::ANDNOT),
            ("<<", TokenKind::SHL),
            (">>", TokenKind::SHR),
            ("&&", TokenKind::LAND),
            ("||", TokenKind::LOR),
            ("==", TokenKind::EQL),
            ("!=", TokenKind::NEQ),
            ("<=", TokenKind::LEQ),
            (">=", TokenKind::GEQ),
            (":=", TokenKind::DEFINE),
            ("<-", TokenKind::ARROW),
            ("++", TokenKind::INC),
            ("--", TokenKind::DEC),
            ("+", TokenKind::ADD),
            ("-", TokenKind::SUB),
            ("*", TokenKind::MUL),
            ("/", TokenKind::QUO),
            ("%", TokenKind::REM),
            ("&", TokenKind::AND),
            ("|", TokenKind::OR),
            ("^", TokenKind::XOR),
            ("!", TokenKind::NOT),
            ("<", TokenKind::LSS),
            (">", TokenKind::GTR),
            ("=", TokenKind::ASSIGN),
            ("(", TokenKind::LPAREN),
            (")", TokenKind::RPAREN),
            ("[", TokenKind::LBRACK),
            ("]", TokenKind::RBRACK),
            ("{", TokenKind::LBRACE),
            ("}", TokenKind::RBRACE),
            (",", TokenKind::COMMA),
            (".", TokenKind::PERIOD),
            (";", TokenKind::SEMICOLON),
            (":", TokenKind::COLON),
        ];
        for (text, kind) in OPERATORS {
            if self.starts_with(text) {
                let start = self.cursor;
                self.cursor += text.len();
                self.push(*kind, start, self.cursor);
                return true;
            }
        }
        false
    }

    fn lex_identifier_or_keyword(&mut self) -> Result<(), LexerError> {
        let start = self.cursor;
        while let Some(ch) = self.peek_char() {
            if is_ident_rest(ch) {
                self.advance_char();
            } else {
                break;
            }
        }
        let kind = match &self.src[start..self.cursor] {
            "func" => TokenKind::FUNC,
            "interface" => TokenKind::INTERFACE,
            "map" => TokenKind::MAP,
            "struct" => TokenKind::STRUCT,
            "chan" => TokenKind::CHAN,
            w if OTHER_KEYWORDS.contains(&w) => TokenKind::KEYWORD,
            _ => TokenKind::IDENT,
        };
        self.push(kind, start, self.cursor);
        Ok(())
    }

    fn lex_number(&mut self) -> Result<(), LexerError> {
        let start = self.cursor;
        let prefixed = [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)]
            .iter()
            .find(|(p, _)| self.starts_with(p))
            .map(|(_, base)| *base);
        if let Some(base) = prefixed {
            self.cursor += 2;
            let digits = self.eat_digits(base);
            if digits == 0 {
                return Err(self.err("LEX010", "数値リテラルに桁がありません", start));
            }
            return self.finish_number(start, TokenKind::INT);
        }

        let mut kind = TokenKind::INT;
        self.eat_digits(10);
        if self.peek_char() == Some('.') {
            kind = TokenKind::FLOAT;
            self.advance_char();
            self.eat_digits(10);
        }
        if let Some('e') | Some('E') = self.peek_char() {
            let save = self.cursor;
            self.advance_char();
            if let Some('+') | Some('-') = self.peek_char() {
                self.advance_char();
            }
            if self.eat_digits(10) == 0 {
                self.cursor = save;
                return Err(self.err("LEX011", "指数部に桁がありません", start));
            }
            kind = TokenKind::FLOAT;
        }
        self.finish_number(start, kind)
    }

    fn finish_number(&mut self, start: usize, kind: TokenKind) -> Result<(), LexerError> {
        if self.peek_char() == Some('i') {
            self.advance_char();
            self.push(TokenKind::IMAG, start, self.cursor);
            return Ok(());
        }
        if let Some(c) = self.peek_char() {
            if is_letter(c) {
                return Err(self.err(
                    "LEX012",
                    format!("数値リテラルの直後に不正な文字 {:?}", c),
                    self.cursor,
                ));
            }
        }
        self.push(kind, start, self.cursor);
        Ok(())
    }

    fn eat_digits(&mut self, base: u32) -> usize {
        let mut count = 0;
        while let Some(c) = self.peek_char() {
            if is_digit_in(c, base) {
                self.advance_char();
                count += 1;
            } else {
                break;
            }
        }
        count
    }

    fn lex_rune(&mut self) -> Result<(), LexerError> {
        let start = self.cursor;
        self.advance_char(); // 開始クォート
        let mut n = 0;
        loop {
            match self.advance_char() {
                Some('\'') => break,
                Some('\\') => {
                    self.advance_char();
                    n += 1;
                }
                Some('\n') | None => {
                    return Err(self.err("LEX002", "rune リテラルが閉じていません", start));
                }
                Some(_) => n += 1,
            }
        }
        if n == 0 {
            return Err(self.err("LEX004", "空の rune リテラルです", start));
        }
        self.push(TokenKind::CHAR, start, self.cursor);
        Ok(())
    }

    fn lex_string(&mut self) -> Result<(), LexerError> {
        let start = self.cursor;
        self.advance_char(); // 開始ダブルクォート
        loop {
            match self.advance_char() {
                Some('"') => break,
                Some('\\') => {
                    self.advance_char();
                }
                Some('\n') | None => {
                    return Err(self.err("LEX003", "文字列リテラルが閉じていません", start));
                }
                Some(_) => {}
            }
        }
        self.push(TokenKind::STRING, start, self.cursor);
        Ok(())
    }

    fn lex_raw_string(&mut self) -> Result<(), LexerError> {
        let start = self.cursor;
        match self.src[start + 1..].find('`') {
            Some(off) => {
                self.cursor = start + 1 + off + 1;
                self.push(TokenKind::STRING, start, self.cursor);
                Ok(())
            }
            None => Err(self.err("LEX003", "文字列リテラルが閉じていません", start)),
        }
    }

    fn push(&mut self, kind: TokenKind, start: usize, end: usize) {
        let (line, col) = self.line_map.locate(self.src, start);
        self.tokens.push(Token {
            kind,
            value: self.src[start..end].to_string(),
            pos: start,
            line,
            col,
        });
    }

    fn peek_char(&self) -> Option<char> {
        self.src[self.cursor..].chars().next()
    }

    fn peek_second_char(&self) -> Option<char> {
        let mut iter = self.src[self.cursor..].chars();
        iter.next()?;
        iter.next()
    }

    fn advance_char(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.cursor += ch.len_utf8();
        Some(ch)
    }

    fn starts_with(&self, pattern: &str) -> bool {
        self.src[self.cursor..].starts_with(pattern)
    }

    fn err(&self, code: &'static str, message: impl Into<String>, pos: usize) -> LexerError {
        let (line, col) = self.line_map.locate(self.src, pos);
        LexerError::at(code, message, Some(pos), Some(line), Some(col))
    }
}

/// ソース文字列をトークン列へ変換する。末尾には必ず `EOF` が付く。
pub fn lex(src: &str) -> Result<Vec<Token>, LexerError> {
    Lexer::new(src).run()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    /// 複数文字の演算子が最長一致で切り出される。
    fn longest_operator_match() {
        assert_eq!(
            kinds("a &^ b << 2 ... &&"),
            vec![
                TokenKind::IDENT,
                TokenKind::ANDNOT,
                TokenKind::IDENT,
                TokenKind::SHL,
                TokenKind::INT,
                TokenKind::ELLIPSIS,
                TokenKind::LAND,
                TokenKind::EOF
            ]
        );
    }

    #[test]
    /// 数値リテラルの各形式を判別する。
    fn number_forms() {
        assert_eq!(kinds("0x1F")[0], TokenKind::INT);
        assert_eq!(kinds("1_000")[0], TokenKind::INT);
        assert_eq!(kinds("1.5")[0], TokenKind::FLOAT);
        assert_eq!(kinds(".5")[0], TokenKind::FLOAT);
        assert_eq!(kinds("1e9")[0], TokenKind::FLOAT);
        assert_eq!(kinds("1.")[0], TokenKind::FLOAT);
        assert_eq!(kinds("2i")[0], TokenKind::IMAG);
    }

    #[test]
    /// コメントは読み飛ばされ、閉じていないブロックコメントはエラーになる。
    fn comments() {
        assert_eq!(kinds("1 /* x */ + // y\n 2").len(), 4);
        let err = lex("1 /* open").unwrap_err();
        assert_eq!(err.code(), "LEX001");
    }

    #[test]
    /// 閉じていない文字列・rune を位置付きで報告する。
    fn unterminated_literals() {
        let err = lex("x + \"abc").unwrap_err();
        assert_eq!(err.code(), "LEX003");
        assert_eq!(err.0.col, Some(5));
        assert_eq!(lex("'a").unwrap_err().code(), "LEX002");
        assert_eq!(lex("''").unwrap_err().code(), "LEX004");
    }

    #[test]
    /// 多バイト文字を含む行でも列番号は文字単位で数える。
    fn columns_count_chars() {
        let ts = lex("\"é\" + x").unwrap();
        assert_eq!(ts[2].value, "x");
        assert_eq!(ts[2].col, 7);
    }

    #[test]
    /// `true` や `nil` は識別子、`func` はキーワードとして扱う。
    fn predeclared_names_are_identifiers() {
        assert_eq!(
            kinds("true nil func"),
            vec![
                TokenKind::IDENT,
                TokenKind::IDENT,
                TokenKind::FUNC,
                TokenKind::EOF
            ]
        );
    }
}
