// パス: src/errors.rs
// 役割: 各段階（字句・構文・検査・評価）のエラー型と共通フォーマットを定義する
// 意図: REPL がどの段階で失敗したかを一貫した形式で利用者へ伝える
// 関連ファイル: src/lexer.rs, src/parser/mod.rs, src/checker/mod.rs, src/repl/dispatch.rs
//! エラー型の定義（共通フォーマット: \[CODE\] メッセージ @line:col / @pos）。

use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub code: &'static str,
    pub msg: String,
    pub pos: Option<usize>,  // バイトオフセット（任意）
    pub line: Option<usize>, // 1-origin（任意）
    pub col: Option<usize>,  // 1-origin（任意）
}

impl ErrorInfo {
    pub fn new(code: &'static str, msg: impl Into<String>, pos: Option<usize>) -> Self {
        Self {
            code,
            msg: msg.into(),
            pos,
            line: None,
            col: None,
        }
    }
    pub fn at(
        code: &'static str,
        msg: impl Into<String>,
        pos: Option<usize>,
        line: Option<usize>,
        col: Option<usize>,
    ) -> Self {
        Self {
            code,
            msg: msg.into(),
            pos,
            line,
            col,
        }
    }
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match (self.line, self.col, self.pos) {
            (Some(l), Some(c), Some(p)) => write!(
                f,
                "[{}] {} @line={},col={} @pos={}",
                self.code, self.msg, l, c, p
            ),
            (Some(l), Some(c), None) => {
                write!(f, "[{}] {} @line={},col={}", self.code, self.msg, l, c)
            }
            (_, _, Some(p)) => write!(f, "[{}] {} @pos={}", self.code, self.msg, p),
            _ => write!(f, "[{}] {}", self.code, self.msg),
        }
    }
}

/// エラー構造体ごとに同じコンストラクタと Display 実装を生やすマクロ。
macro_rules! stage_error {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name(pub ErrorInfo);

        impl $name {
            pub fn new(code: &'static str, msg: impl Into<String>, pos: Option<usize>) -> Self {
                Self(ErrorInfo::new(code, msg, pos))
            }
            pub fn at(
                code: &'static str,
                msg: impl Into<String>,
                pos: Option<usize>,
                line: Option<usize>,
                col: Option<usize>,
            ) -> Self {
                Self(ErrorInfo::at(code, msg, pos, line, col))
            }
            /// エラーコード（`PAR001` など）を返す。
            pub fn code(&self) -> &'static str {
                self.0.code
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                Display::fmt(&self.0, f)
            }
        }
        impl StdError for $name {}
    };
}

stage_error!(
    /// 字句解析の失敗。
    LexerError
);
stage_error!(
    /// 構文解析の失敗。字句エラーもこの型に畳み込まれる。
    ParseError
);
stage_error!(
    /// 静的検査（型検査）の失敗。1 行で複数報告されうる。
    CheckError
);
stage_error!(
    /// 評価時（実行時）の失敗。
    EvalError
);

impl From<LexerError> for ParseError {
    fn from(e: LexerError) -> Self {
        let info = e.0;
        ParseError(ErrorInfo {
            msg: format!("lex error: {}", info.msg),
            ..info
        })
    }
}

/// 位置情報付きエラーから「問題の行」と「キャレット行」の 2 行を組み立てる。
///
/// 位置を持たないエラー、または範囲外の行番号では `None` を返す。
pub fn format_error_pos(src: &str, err: &ErrorInfo) -> Option<(String, String)> {
    let line_no = err.line?;
    let col = err.col?;
    let text = src.lines().nth(line_no.checked_sub(1)?)?;
    // タブはそのまま残し、キャレット位置の揃えを崩さない
    let pad: String = text
        .chars()
        .take(col.saturating_sub(1))
        .map(|c| if c == '\t' { '\t' } else { ' ' })
        .collect();
    Some((text.to_string(), format!("{}^", pad)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// 位置情報の有無に応じてヘッダ形式が切り替わるかを確認する。
    fn display_variants() {
        let e = ErrorInfo::at("PAR001", "x", Some(3), Some(1), Some(4));
        assert_eq!(e.to_string(), "[PAR001] x @line=1,col=4 @pos=3");
        let e = ErrorInfo::new("EVAL010", "y", None);
        assert_eq!(e.to_string(), "[EVAL010] y");
        let e = ErrorInfo::new("CHK001", "z", Some(2));
        assert_eq!(e.to_string(), "[CHK001] z @pos=2");
    }

    #[test]
    /// キャレットが列位置に揃うことを確認する。
    fn format_error_pos_points_at_column() {
        let e = ErrorInfo::at("PAR002", "bad", Some(2), Some(1), Some(3));
        let (line, caret) = format_error_pos("1 + )", &e).unwrap();
        assert_eq!(line, "1 + )");
        assert_eq!(caret, "  ^");
    }

    #[test]
    /// 位置情報の無いエラーではペアを生成しない。
    fn format_error_pos_without_position() {
        let e = ErrorInfo::new("PAR002", "bad", None);
        assert!(format_error_pos("1 +", &e).is_none());
    }

    #[test]
    /// 字句エラーが位置を保ったまま構文エラーへ変換される。
    fn lexer_error_converts_with_position() {
        let lex = LexerError::at("LEX003", "unterminated", Some(0), Some(1), Some(1));
        let parse: ParseError = lex.into();
        assert_eq!(parse.code(), "LEX003");
        assert!(parse.0.msg.starts_with("lex error:"));
        assert_eq!(parse.0.col, Some(1));
    }
}
