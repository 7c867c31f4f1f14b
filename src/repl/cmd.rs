// パス: src/repl/cmd.rs
// 役割: REPL のメインループ、コマンド語の解釈、シェル実行、式評価への橋渡し
// 意図: 入力源と出力先を差し替え可能にして、対話ループ全体をテストできるようにする
// 関連ファイル: src/repl/dispatch.rs, src/repl/line_editor.rs, src/repl/printer.rs, src/repl/config.rs
//! 対話ループとコマンド処理
//!
//! 行の先頭語が `quit` / `help` / `browse` ならコマンド、`!` で始まればシェル実行、
//! それ以外はすべて式としてディスパッチャへ渡す。

use std::io::{self, Write};
use std::process::Command;

use crate::env::Env;

use super::config::ReplConfig;
use super::dispatch::{eval_line, Outcome};
use super::line_editor::{LineEditor, ReadResult};
use super::printer::{collect_bindings, render_bindings, render_help, render_intro};
use super::ReplError;

/// 対話セッションを開始し、`quit` か EOF まで入力を処理し続ける。
///
/// # Examples
/// ```no_run
/// use gorepl::repl::{run_repl, ReplConfig};
/// let env = gorepl::env::make_env(std::env::args().collect());
/// run_repl(&ReplConfig::default(), env).unwrap();
/// ```
pub fn run_repl(config: &ReplConfig, env: Env) -> Result<(), ReplError> {
    let mut editor = LineEditor::new(config.history_path());
    let mut session = ReplSession::new(env, config);
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    run_repl_with(&mut editor, &mut session, &SystemShell, &mut stdout, &mut stderr)
}

/// `-e` で渡された式を順に評価する。失敗した式があれば件数をエラーで返す。
pub fn run_batch(exprs: &[String], env: &mut Env) -> Result<(), ReplError> {
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    run_batch_with(exprs, env, &mut stdout, &mut stderr)
}

fn run_batch_with(
    exprs: &[String],
    env: &mut Env,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<(), ReplError> {
    let mut failed = 0;
    for src in exprs {
        match eval_line(src, env, out, err)? {
            Outcome::ParseError | Outcome::CheckError(_) | Outcome::EvalError => failed += 1,
            Outcome::NoValue | Outcome::Values(_) => {}
        }
    }
    out.flush()?;
    if failed > 0 {
        return Err(ReplError::Failed(failed));
    }
    Ok(())
}

pub(crate) trait ReplLineSource {
    fn read_line(&mut self, prompt: &str) -> io::Result<ReadResult>;
    fn add_history(&mut self, entry: &str);
    fn save_history(&mut self) -> io::Result<()>;
}

impl ReplLineSource for LineEditor {
    fn read_line(&mut self, prompt: &str) -> io::Result<ReadResult> {
        LineEditor::read_line(self, prompt)
    }

    fn add_history(&mut self, entry: &str) {
        LineEditor::add_history(self, entry);
    }

    fn save_history(&mut self) -> io::Result<()> {
        LineEditor::save_history(self)
    }
}

/// シェル実行の結果。
#[derive(Debug, Default)]
pub(crate) struct ShellOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// 終了コード。シグナルで終わった場合は `None`。
    pub code: Option<i32>,
}

/// `!CMD` の実行方法。テストでは差し替える。
pub(crate) trait ShellRunner {
    fn run(&self, command: &str) -> io::Result<ShellOutput>;
}

/// OS のシェル（`sh -c` / `cmd /C`）で実行する。
pub(crate) struct SystemShell;

impl ShellRunner for SystemShell {
    fn run(&self, command: &str) -> io::Result<ShellOutput> {
        let output = if cfg!(windows) {
            Command::new("cmd").args(["/C", command]).output()?
        } else {
            Command::new("sh").args(["-c", command]).output()?
        };
        Ok(ShellOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            code: output.status.code(),
        })
    }
}

fn run_repl_with<S, R, W, E>(
    editor: &mut S,
    session: &mut ReplSession,
    shell: &R,
    out: &mut W,
    err: &mut E,
) -> Result<(), ReplError>
where
    S: ReplLineSource,
    R: ShellRunner,
    W: Write,
    E: Write,
{
    if !session.quiet {
        render_intro(out)?;
    }
    tracing::info!("session started");
    let mut lines = 0usize;

    loop {
        out.flush()?;
        let input = match editor.read_line(&session.prompt) {
            Ok(ReadResult::Line(line)) => line,
            Ok(ReadResult::Eof) => {
                writeln!(out)?;
                break;
            }
            Ok(ReadResult::Interrupted) => continue,
            Err(e) => {
                writeln!(err, "input error: {}", e)?;
                break;
            }
        };

        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        editor.add_history(input);
        lines += 1;

        match parse_repl_command(input) {
            ReplCommand::Quit => break,
            cmd => session.execute(cmd, shell, out, err)?,
        }
    }

    if let Err(e) = editor.save_history() {
        tracing::warn!(error = %e, "failed to save history");
        writeln!(err, "could not save history: {}", e)?;
    }
    tracing::info!(lines, "session ended");
    out.flush()?;
    Ok(())
}

/// 対話セッションの状態。環境はここが所有し、ディスパッチャへ明示的に渡す。
pub(crate) struct ReplSession {
    pub env: Env,
    pub prompt: String,
    pub shell_enabled: bool,
    pub quiet: bool,
}

impl ReplSession {
    pub(crate) fn new(env: Env, config: &ReplConfig) -> Self {
        Self {
            env,
            prompt: config.prompt.clone(),
            shell_enabled: !config.no_shell,
            quiet: config.quiet,
        }
    }

    /// 解釈済みコマンドを実行する。`Quit` はループ側で処理する。
    pub(crate) fn execute<R: ShellRunner, W: Write, E: Write>(
        &mut self,
        cmd: ReplCommand,
        shell: &R,
        out: &mut W,
        err: &mut E,
    ) -> io::Result<()> {
        match cmd {
            ReplCommand::Help(topic) => {
                render_help(out, topic.as_deref())?;
            }
            ReplCommand::Browse(prefix) => {
                let lines = collect_bindings(&self.env, prefix.as_deref().unwrap_or(""));
                if lines.is_empty() {
                    writeln!(out, "(no bindings)")?;
                } else {
                    render_bindings(out, &lines)?;
                }
            }
            ReplCommand::Shell(command) => self.exec_shell(&command, shell, out, err)?,
            ReplCommand::Eval(src) => {
                let outcome = eval_line(&src, &mut self.env, out, err)?;
                tracing::debug!(?outcome, "line evaluated");
            }
            ReplCommand::Quit => {}
        }
        Ok(())
    }

    fn exec_shell<R: ShellRunner, W: Write, E: Write>(
        &self,
        command: &str,
        shell: &R,
        out: &mut W,
        err: &mut E,
    ) -> io::Result<()> {
        if !self.shell_enabled {
            return writeln!(err, "shell escape is disabled");
        }
        if command.is_empty() {
            return writeln!(err, "usage: !CMD");
        }
        tracing::debug!(command, "running shell command");
        match shell.run(command) {
            Ok(result) => {
                out.write_all(&result.stdout)?;
                err.write_all(&result.stderr)?;
                match result.code {
                    Some(0) => Ok(()),
                    Some(code) => writeln!(err, "exit status {}", code),
                    None => writeln!(err, "terminated by signal"),
                }
            }
            Err(e) => writeln!(err, "shell error: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// REPL が受け付けるコマンド種別。
pub(crate) enum ReplCommand {
    /// 一覧または 1 コマンドのヘルプを表示する。
    Help(Option<String>),
    /// セッションを終了する。
    Quit,
    /// 束縛を接頭辞で絞り込んで一覧する。
    Browse(Option<String>),
    /// OS のシェルでコマンドを実行する。
    Shell(String),
    /// 式として評価する。
    Eval(String),
}

/// 1 行をコマンドか式に分類する。
pub(crate) fn parse_repl_command(input: &str) -> ReplCommand {
    let input = input.trim();
    if let Some(rest) = input.strip_prefix('!') {
        return ReplCommand::Shell(rest.trim().to_string());
    }
    let (word, rest) = match input.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (input, ""),
    };
    let arg = || (!rest.is_empty()).then(|| rest.to_string());
    match word {
        "quit" if rest.is_empty() => ReplCommand::Quit,
        "help" if !rest.contains(char::is_whitespace) => ReplCommand::Help(arg()),
        "browse" if !rest.contains(char::is_whitespace) => ReplCommand::Browse(arg()),
        _ => ReplCommand::Eval(input.to_string()),
    }
}
