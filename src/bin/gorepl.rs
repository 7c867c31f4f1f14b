// パス: src/bin/gorepl.rs
// 役割: コマンドライン引数を読み、式の一括評価か対話ループを起動する
// 意図: 端末 I/O の失敗などプロセス全体の失敗だけを終了コード 1 で伝える
// 関連ファイル: src/repl/mod.rs, src/repl/config.rs, src/logging.rs
use clap::Parser as ClapParser;

use gorepl::repl::{self, ReplConfig};
use gorepl::{logging, make_env};

fn main() {
    let config = ReplConfig::parse();
    logging::init(config.verbose);
    let mut env = make_env(std::env::args().collect());

    let result = if config.eval.is_empty() {
        repl::run_repl(&config, env)
    } else {
        repl::run_batch(&config.eval, &mut env)
    };
    if let Err(e) = result {
        eprintln!("gorepl: {}", e);
        std::process::exit(1);
    }
}
