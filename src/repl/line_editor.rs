// パス: src/repl/line_editor.rs
// 役割: 履歴付きの 1 行エディタ（Raw モードの端末入力と、非端末向けの素朴な読み取り）
// 意図: 外部クレートに頼らず、矢印キーでの履歴呼び出しと行内編集を提供する
// 関連ファイル: src/repl/cmd.rs, src/repl/config.rs
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::PathBuf;

/// 行入力が返す 3 種類の結果を表す列挙体。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadResult {
    Line(String),
    Eof,
    Interrupted,
}

/// 履歴付きの行編集を提供する簡易ラインエディタ。
pub struct LineEditor {
    history: History,
}

impl LineEditor {
    /// `path` の履歴を読み込んでエディタを作る。`None` なら履歴を保存しない。
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            history: History::load(path),
        }
    }

    /// プロンプトを出力し、1 行分の入力または制御シグナルを取得する。
    ///
    /// 標準入力が端末でなければ（パイプやファイル）Raw モードを使わずに読む。
    pub fn read_line(&mut self, prompt: &str) -> io::Result<ReadResult> {
        #[cfg(unix)]
        {
            match RawMode::new() {
                Ok(raw) => self.read_line_raw(prompt, raw),
                Err(e) => {
                    tracing::trace!(error = %e, "raw mode unavailable");
                    read_line_plain(prompt)
                }
            }
        }
        #[cfg(not(unix))]
        {
            read_line_plain(prompt)
        }
    }

    /// 入力文字列を履歴へ追加し、重複や空行を除外する。
    pub fn add_history(&mut self, entry: &str) {
        self.history.add(entry);
    }

    /// 現在の履歴内容を永続ストレージへ書き出す。
    pub fn save_history(&self) -> io::Result<()> {
        self.history.save()
    }
}

/// 端末以外の入力向けの読み取り。
fn read_line_plain(prompt: &str) -> io::Result<ReadResult> {
    let mut stdout = io::stdout();
    write!(stdout, "{}", prompt)?;
    stdout.flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(ReadResult::Eof);
    }
    let trimmed = line.trim_end_matches(['\n', '\r']).len();
    line.truncate(trimmed);
    Ok(ReadResult::Line(line))
}

#[cfg(unix)]
impl LineEditor {
    #[allow(unexpected_cfgs)]
    #[cfg_attr(coverage, coverage(off))]
    fn read_line_raw(&mut self, prompt: &str, _raw: RawMode) -> io::Result<ReadResult> {
        let mut stdout = io::stdout();
        write!(stdout, "{}", prompt)?;
        stdout.flush()?;

        let stdin = io::stdin();
        let mut stdin = stdin.lock();
        let mut session = EditorSession::new(&self.history);
        loop {
            let mut byte = [0u8; 1];
            if stdin.read(&mut byte)? == 0 {
                return Ok(ReadResult::Eof);
            }
            let action = interpret_action(byte[0], &mut stdin)?;
            let changed = match action {
                EditAction::Submit => {
                    write!(stdout, "\r\n")?;
                    stdout.flush()?;
                    return Ok(ReadResult::Line(session.into_string()));
                }
                EditAction::Interrupt => {
                    write!(stdout, "^C\r\n")?;
                    stdout.flush()?;
                    return Ok(ReadResult::Interrupted);
                }
                EditAction::Eof if session.is_empty() => {
                    write!(stdout, "\r\n")?;
                    stdout.flush()?;
                    return Ok(ReadResult::Eof);
                }
                other => session.apply(other),
            };
            if changed {
                refresh_line(&mut stdout, prompt, session.buffer(), session.cursor())?;
            }
        }
    }
}

/// 先頭バイトと後続バイトから UTF-8 の 1 文字を復元する。
fn read_utf8_char<R: Read>(first: u8, reader: &mut R) -> io::Result<Option<char>> {
    let width = match first {
        0x00..=0x7f => 1,
        0xc2..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf4 => 4,
        _ => return Ok(None),
    };
    let mut buf = [0u8; 4];
    buf[0] = first;
    for idx in 1..width {
        reader.read_exact(&mut buf[idx..idx + 1])?;
    }
    match std::str::from_utf8(&buf[..width]) {
        Ok(s) => Ok(s.chars().next()),
        Err(_) => Ok(None),
    }
}

/// 読み取った制御シーケンスを内部の編集操作へ写像する。
fn interpret_action<R: Read>(first: u8, reader: &mut R) -> io::Result<EditAction> {
    match first {
        b'\n' | b'\r' => Ok(EditAction::Submit),
        0x01 => Ok(EditAction::Home),
        0x03 => Ok(EditAction::Interrupt),
        0x04 => Ok(EditAction::Eof),
        0x05 => Ok(EditAction::End),
        0x0b => Ok(EditAction::KillToEnd),
        0x15 => Ok(EditAction::KillToStart),
        0x7f | 0x08 => Ok(EditAction::DeleteLeft),
        0x1b => {
            let mut seq = [0u8; 2];
            if reader.read_exact(&mut seq[..1]).is_err() || seq[0] != b'[' {
                return Ok(EditAction::Ignore);
            }
            if reader.read_exact(&mut seq[1..2]).is_err() {
                return Ok(EditAction::Ignore);
            }
            Ok(match seq[1] {
                b'A' => EditAction::HistoryPrev,
                b'B' => EditAction::HistoryNext,
                b'C' => EditAction::MoveRight,
                b'D' => EditAction::MoveLeft,
                b'H' => EditAction::Home,
                b'F' => EditAction::End,
                _ => EditAction::Ignore,
            })
        }
        _ => match read_utf8_char(first, reader)? {
            Some(ch) if !ch.is_control() => Ok(EditAction::InsertChar(ch)),
            _ => Ok(EditAction::Ignore),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditAction {
    Submit,
    Interrupt,
    Eof,
    DeleteLeft,
    MoveLeft,
    MoveRight,
    Home,
    End,
    KillToStart,
    KillToEnd,
    HistoryPrev,
    HistoryNext,
    InsertChar(char),
    Ignore,
}

/// 1 行分の編集状態。履歴を辿る間は編集中の内容を退避しておく。
struct EditorSession<'a> {
    buffer: Vec<char>,
    cursor: usize,
    history_index: usize,
    saved_current: Option<Vec<char>>,
    history: &'a History,
}

impl<'a> EditorSession<'a> {
    fn new(history: &'a History) -> Self {
        Self {
            buffer: Vec::new(),
            cursor: 0,
            history_index: history.len(),
            saved_current: None,
            history,
        }
    }

    fn buffer(&self) -> &[char] {
        &self.buffer
    }

    fn cursor(&self) -> usize {
        self.cursor
    }

    fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// 編集操作を適用し、再描画が必要なら `true` を返す。
    fn apply(&mut self, action: EditAction) -> bool {
        match action {
            EditAction::InsertChar(ch) => {
                self.insert_char(ch);
                true
            }
            EditAction::DeleteLeft => self.delete_left(),
            EditAction::MoveLeft => self.move_left(),
            EditAction::MoveRight => self.move_right(),
            EditAction::Home => self.move_to(0),
            EditAction::End => self.move_to(self.buffer.len()),
            EditAction::KillToStart => self.kill_to_start(),
            EditAction::KillToEnd => self.kill_to_end(),
            EditAction::HistoryPrev => self.history_prev(),
            EditAction::HistoryNext => self.history_next(),
            EditAction::Submit | EditAction::Interrupt | EditAction::Eof | EditAction::Ignore => {
                false
            }
        }
    }

    fn insert_char(&mut self, ch: char) {
        self.buffer.insert(self.cursor, ch);
        self.cursor += 1;
        self.reset_history_cursor();
    }

    fn delete_left(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        self.buffer.remove(self.cursor);
        self.reset_history_cursor();
        true
    }

    fn move_left(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    fn move_right(&mut self) -> bool {
        if self.cursor >= self.buffer.len() {
            return false;
        }
        self.cursor += 1;
        true
    }

    fn move_to(&mut self, pos: usize) -> bool {
        if self.cursor == pos {
            return false;
        }
        self.cursor = pos;
        true
    }

    fn kill_to_start(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.buffer.drain(..self.cursor);
        self.cursor = 0;
        self.reset_history_cursor();
        true
    }

    fn kill_to_end(&mut self) -> bool {
        if self.cursor >= self.buffer.len() {
            return false;
        }
        self.buffer.truncate(self.cursor);
        self.reset_history_cursor();
        true
    }

    fn history_prev(&mut self) -> bool {
        if self.history_index == 0 {
            return false;
        }
        if self.history_index == self.history.len() {
            self.saved_current = Some(self.buffer.clone());
        }
        self.history_index -= 1;
        match self.history.get(self.history_index) {
            Some(entry) => {
                self.buffer = entry.chars().collect();
                self.cursor = self.buffer.len();
                true
            }
            None => false,
        }
    }

    fn history_next(&mut self) -> bool {
        if self.history_index >= self.history.len() {
            return false;
        }
        self.history_index += 1;
        if self.history_index == self.history.len() {
            self.buffer = self.saved_current.take().unwrap_or_default();
        } else if let Some(entry) = self.history.get(self.history_index) {
            self.buffer = entry.chars().collect();
        }
        self.cursor = self.buffer.len();
        true
    }

    fn into_string(self) -> String {
        self.buffer.into_iter().collect()
    }

    fn reset_history_cursor(&mut self) {
        self.history_index = self.history.len();
        self.saved_current = None;
    }
}

/// バッファとカーソル位置に合わせて行全体を再描画する。
fn refresh_line<W: Write>(
    writer: &mut W,
    prompt: &str,
    buffer: &[char],
    cursor: usize,
) -> io::Result<()> {
    let rendered: String = buffer.iter().collect();
    write!(writer, "\r{}{}\x1b[K", prompt, rendered)?;
    let back = buffer.len().saturating_sub(cursor);
    if back > 0 {
        write!(writer, "\x1b[{}D", back)?;
    }
    writer.flush()
}

/// 入力履歴の保持と永続化を司る補助構造体。
pub(crate) struct History {
    entries: Vec<String>,
    path: Option<PathBuf>,
    max_entries: usize,
}

impl History {
    pub(crate) const MAX_ENTRIES: usize = 1000;

    /// 履歴ファイルを読み込む。存在しなければ空から始める。
    pub(crate) fn load(path: Option<PathBuf>) -> Self {
        let mut entries: Vec<String> = path
            .as_deref()
            .and_then(|p| fs::read_to_string(p).ok())
            .map(|content| content.lines().map(str::to_string).collect())
            .unwrap_or_default();
        if entries.len() > Self::MAX_ENTRIES {
            entries.drain(..entries.len() - Self::MAX_ENTRIES);
        }
        tracing::debug!(entries = entries.len(), path = ?path, "history loaded");
        Self {
            entries,
            path,
            max_entries: Self::MAX_ENTRIES,
        }
    }

    /// 新しい入力を追加し、空行と直前の重複をスキップする。
    pub(crate) fn add(&mut self, entry: &str) {
        let trimmed = entry.trim();
        if trimmed.is_empty() || self.entries.last().map(String::as_str) == Some(trimmed) {
            return;
        }
        if self.entries.len() == self.max_entries {
            self.entries.remove(0);
        }
        self.entries.push(trimmed.to_string());
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn get(&self, idx: usize) -> Option<&str> {
        self.entries.get(idx).map(String::as_str)
    }

    /// 現在の履歴をファイルへ書き出す。
    pub(crate) fn save(&self) -> io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = io::BufWriter::new(fs::File::create(path)?);
        for entry in &self.entries {
            writeln!(file, "{}", entry)?;
        }
        file.flush()
    }
}

#[cfg(unix)]
/// Raw モードへの切り替えと復帰を担う RAII ガード。
struct RawMode {
    original: Termios,
}

#[cfg(unix)]
impl RawMode {
    /// 標準入力の termios 設定を Raw モードへ変更する。端末でなければ失敗する。
    #[allow(unexpected_cfgs)]
    #[cfg_attr(coverage, coverage(off))]
    fn new() -> io::Result<Self> {
        let fd = 0;
        let mut termios = Termios::default();
        if unsafe { tcgetattr(fd, &mut termios as *mut _) } != 0 {
            return Err(io::Error::last_os_error());
        }
        let mut raw = termios;
        unsafe {
            cfmakeraw(&mut raw as *mut _);
        }
        if unsafe { tcsetattr(fd, TCSANOW, &raw as *const _) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { original: termios })
    }
}

#[cfg(unix)]
impl Drop for RawMode {
    #[allow(unexpected_cfgs)]
    #[cfg_attr(coverage, coverage(off))]
    fn drop(&mut self) {
        unsafe {
            let _ = tcsetattr(0, TCSANOW, &self.original as *const _);
        }
    }
}

#[cfg(unix)]
const TCSANOW: i32 = 0;

#[cfg(unix)]
#[repr(C)]
#[derive(Clone, Copy)]
/// POSIX 端末属性 (`termios`) を Rust 表現に写した構造体。
struct Termios {
    c_iflag: u32,
    c_oflag: u32,
    c_cflag: u32,
    c_lflag: u32,
    c_line: u8,
    c_cc: [u8; NCCS],
    c_ispeed: u32,
    c_ospeed: u32,
}

#[cfg(unix)]
impl Default for Termios {
    fn default() -> Self {
        Self {
            c_iflag: 0,
            c_oflag: 0,
            c_cflag: 0,
            c_lflag: 0,
            c_line: 0,
            c_cc: [0; NCCS],
            c_ispeed: 0,
            c_ospeed: 0,
        }
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
const NCCS: usize = 32;
#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "netbsd",
    target_os = "openbsd",
))]
const NCCS: usize = 20;
#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "netbsd",
    target_os = "openbsd",
)))]
const NCCS: usize = 32;

#[cfg(unix)]
extern "C" {
    fn tcgetattr(fd: i32, termios: *mut Termios) -> i32;
    fn tcsetattr(fd: i32, optional_actions: i32, termios: *const Termios) -> i32;
    fn cfmakeraw(termios: *mut Termios);
}

#[cfg(test)]
mod tests {
    use super::{interpret_action, read_utf8_char, refresh_line, EditAction, EditorSession, History};
    use std::io::Cursor;

    fn history(entries: &[&str], max: usize) -> History {
        History {
            entries: entries.iter().map(|s| s.to_string()).collect(),
            path: None,
            max_entries: max,
        }
    }

    #[test]
    /// 連続する同じ入力と空行は履歴に入らない。
    fn history_add_deduplicates_and_trims() {
        let mut h = history(&[], 5);
        h.add("1+2");
        h.add(" 1+2 ");
        h.add("   ");
        h.add("_");
        h.add("1+2");
        assert_eq!(h.entries, ["1+2", "_", "1+2"]);
    }

    #[test]
    /// 上限を超えた履歴は古いものから捨てる。
    fn history_respects_max_entries() {
        let mut h = history(&["0", "1", "2"], 3);
        h.add("3");
        assert_eq!(h.entries, ["1", "2", "3"]);
    }

    #[test]
    /// 保存した履歴を読み戻せる。親ディレクトリが無ければ作る。
    fn history_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(".replhistory");
        let mut h = History::load(Some(path.clone()));
        assert!(h.entries.is_empty());
        h.add("len(os.Args)");
        h.add("fmt.Println(\"hi\")");
        h.save().unwrap();

        let loaded = History::load(Some(path.clone()));
        assert_eq!(loaded.entries, ["len(os.Args)", "fmt.Println(\"hi\")"]);
        assert_eq!(loaded.path, Some(path));
    }

    #[test]
    /// パスの無い履歴は保存しても何も起きない。
    fn history_without_path_is_memory_only() {
        let mut h = History::load(None);
        h.add("x");
        assert!(h.save().is_ok());
        assert_eq!(h.path, None);
    }

    #[test]
    /// 複数バイトの UTF-8 文字と不正な先頭バイト。
    fn read_utf8_char_cases() {
        let mut cursor = Cursor::new(vec![0x81, 0x82]);
        assert_eq!(read_utf8_char(0xe3, &mut cursor).unwrap(), Some('あ'));
        let mut cursor = Cursor::new(vec![0xff, 0x00, 0x00]);
        assert_eq!(read_utf8_char(0x80, &mut cursor).unwrap(), None);
    }

    #[test]
    /// 再描画後にカーソルを手前へ戻す。
    fn refresh_line_repositions_cursor() {
        let mut buffer: Vec<u8> = Vec::new();
        refresh_line(&mut buffer, "go> ", &['a', 'b', 'c'], 1).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        assert!(output.starts_with("\rgo> abc\x1b[K"));
        assert!(output.ends_with("\x1b[2D"));
    }

    #[test]
    /// 制御文字とエスケープシーケンスの解釈。
    fn interpret_actions() {
        let act = |first: u8, rest: &[u8]| interpret_action(first, &mut Cursor::new(rest.to_vec())).unwrap();
        assert_eq!(act(0x1b, b"[A"), EditAction::HistoryPrev);
        assert_eq!(act(0x1b, b"[D"), EditAction::MoveLeft);
        assert_eq!(act(0x1b, b"[H"), EditAction::Home);
        assert_eq!(act(0x01, b""), EditAction::Home);
        assert_eq!(act(0x15, b""), EditAction::KillToStart);
        assert_eq!(act(0x1b, b""), EditAction::Ignore);
        assert_eq!(act(0x1b, b"X"), EditAction::Ignore);
        assert_eq!(act(0x1b, b"[Z"), EditAction::Ignore);
        assert_eq!(act(0x02, b""), EditAction::Ignore);
        assert_eq!(act(b'g', b""), EditAction::InsertChar('g'));
    }

    #[test]
    /// 履歴を辿った後、編集中の内容へ戻れる。
    fn session_history_navigation() {
        let h = history(&["first", "second"], 10);
        let mut s = EditorSession::new(&h);
        for ch in "tmp".chars() {
            s.insert_char(ch);
        }
        assert!(s.apply(EditAction::HistoryPrev));
        assert_eq!(s.buffer().iter().collect::<String>(), "second");
        assert!(s.apply(EditAction::HistoryPrev));
        assert!(!s.apply(EditAction::HistoryPrev));
        assert!(s.apply(EditAction::HistoryNext));
        assert!(s.apply(EditAction::HistoryNext));
        assert_eq!(s.buffer().iter().collect::<String>(), "tmp");
        assert!(!s.apply(EditAction::HistoryNext));
    }

    #[test]
    /// 行内の移動と削除。
    fn session_editing() {
        let h = history(&[], 10);
        let mut s = EditorSession::new(&h);
        assert!(!s.apply(EditAction::DeleteLeft));
        for ch in "1+23".chars() {
            s.insert_char(ch);
        }
        assert!(s.apply(EditAction::MoveLeft));
        assert!(s.apply(EditAction::KillToEnd));
        assert_eq!(s.buffer().iter().collect::<String>(), "1+2");
        assert!(s.apply(EditAction::Home));
        assert!(!s.apply(EditAction::Home));
        assert!(s.apply(EditAction::End));
        assert!(s.apply(EditAction::MoveLeft));
        assert!(s.apply(EditAction::KillToStart));
        assert_eq!(s.buffer().iter().collect::<String>(), "2");
        assert_eq!(s.cursor(), 0);
        assert!(!s.apply(EditAction::Submit));
        assert_eq!(s.into_string(), "2");
    }
}
