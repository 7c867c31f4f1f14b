// パス: src/stdlib/os.rs
// 役割: `os` パッケージの型 File とそのメソッドを提供する
// 意図: 標準出力ハンドル `os.Stdout` を式から扱えるようにする
// 関連ファイル: src/env.rs, src/stdlib/mod.rs, src/value.rs

use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::errors::EvalError;
use crate::types::{NamedType, Signature, Type};
use crate::value::{CallCtx, Value};

/// `os.File`（フィールドは公開しない）。
pub static FILE_TYPE: Lazy<Arc<NamedType>> = Lazy::new(|| {
    Arc::new(NamedType {
        name: "os.File".into(),
        fields: Vec::new(),
        methods: vec![
            ("Name".into(), Signature::new(vec![], vec![Type::STRING], false)),
            (
                "WriteString".into(),
                Signature::new(vec![Type::STRING], vec![Type::INT, Type::Error], false),
            ),
        ],
    })
});

fn receiver(args: &[Value]) -> Result<crate::value::FileHandle, EvalError> {
    match args.first() {
        Some(Value::File(h)) => Ok(*h),
        Some(Value::Nil) | None => Err(EvalError::new(
            "EVAL040",
            "invalid argument: *os.File is nil",
            None,
        )),
        Some(other) => Err(EvalError::new(
            "EVAL060",
            format!("os.File の受け手ではありません: {:?}", other),
            None,
        )),
    }
}

/// `(*os.File).Name`
pub fn name(_ctx: &mut CallCtx<'_>, args: &[Value]) -> Result<Vec<Value>, EvalError> {
    let h = receiver(args)?;
    Ok(vec![Value::String(h.name().into())])
}

/// `(*os.File).WriteString`
pub fn write_string(ctx: &mut CallCtx<'_>, args: &[Value]) -> Result<Vec<Value>, EvalError> {
    let h = receiver(args)?;
    let s = args.get(1).and_then(Value::as_bytes).unwrap_or_default();
    ctx.out
        .write_all(s)
        .map_err(|e| EvalError::new("EVAL040", format!("write {}: {}", h.name(), e), None))?;
    Ok(vec![Value::Int(s.len() as i64), Value::Nil])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FileHandle;

    #[test]
    /// WriteString は出力先に書き、書いたバイト数を返す。
    fn write_string_reports_length() {
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let mut ctx = CallCtx::new(&mut out, &mut err);
        let args = [Value::File(FileHandle::Stdout), Value::String("héllo".into())];
        let r = write_string(&mut ctx, &args).unwrap();
        assert_eq!(r, vec![Value::Int(6), Value::Nil]);
        assert_eq!(String::from_utf8(out).unwrap(), "héllo");
    }

    #[test]
    /// UTF-8 でないバイトも置き換えずにそのまま書く。
    fn write_string_keeps_raw_bytes() {
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let mut ctx = CallCtx::new(&mut out, &mut err);
        let args = [Value::File(FileHandle::Stdout), Value::String(vec![0xff, b'\n'])];
        let r = write_string(&mut ctx, &args).unwrap();
        assert_eq!(r, vec![Value::Int(2), Value::Nil]);
        assert_eq!(out, vec![0xff, b'\n']);
    }

    #[test]
    /// nil の受け手は実行時エラー。
    fn nil_receiver_is_an_error() {
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let mut ctx = CallCtx::new(&mut out, &mut err);
        assert_eq!(name(&mut ctx, &[Value::Nil]).unwrap_err().code(), "EVAL040");
        assert_eq!(
            name(&mut ctx, &[Value::File(FileHandle::Stdout)]).unwrap(),
            vec![Value::String("/dev/stdout".into())]
        );
    }
}
