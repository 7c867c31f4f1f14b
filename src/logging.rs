// パス: src/logging.rs
// 役割: tracing の購読者を標準エラーへ設定する
// 意図: 各段階の debug ログを `-v` と GOREPL_LOG で必要なときだけ表示する
// 関連ファイル: src/bin/gorepl.rs, src/repl/config.rs
use tracing_subscriber::EnvFilter;

/// ログ絞り込みの指定を読む環境変数。
pub const LOG_ENV: &str = "GOREPL_LOG";

/// `-v` の回数に応じた既定の絞り込み。
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// 購読者を登録する。すでに登録済みなら何もしない。
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}
