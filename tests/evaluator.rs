// パス: tests/evaluator.rs
// 役割: 評価器と標準ライブラリの統合テスト
// 意図: 検査済みの式が Go と同じ値・出力・実行時エラーになることを確認する
// 関連ファイル: src/evaluator.rs, src/stdlib/fmt.rs, src/stdlib/os.rs, tests/test_support.rs
#[path = "test_support.rs"]
mod support;

use support::{eval_error_code, eval_one, eval_strings, eval_with_output};

#[test]
/// 算術と比較の代表例をテーブル駆動で検証する。
fn arithmetic_and_comparison() {
    let cases = [
        ("1 + 2", "3"),
        ("7 / 2", "3"),
        ("-7 % 3", "-1"),
        ("7.0 / 2", "3.5"),
        ("1.5 * 2", "3"),
        ("1e6", "1e+06"),
        ("1 << 3 | 1", "9"),
        ("'a' + 1", "98"),
        ("\"a\" + \"b\"", "\"ab\""),
        ("\"abc\" < \"abd\"", "true"),
        ("true && !false", "true"),
    ];
    for (src, want) in cases {
        assert_eq!(eval_one(src), want, "{src}");
    }
}

#[test]
/// 型付き整数の演算は型の幅で折り返す。
fn typed_integers_wrap() {
    assert_eq!(eval_one("byte(len(os.Args)) * 200"), "144");
    assert_eq!(eval_one("^0"), "-1");
    assert_eq!(eval_one("int8(len(os.Args)) * 100"), "-56");
    assert_eq!(eval_one("int16(len(os.Args)) << 14"), "-32768");
    assert_eq!(eval_one("uint16(len(os.Args)) - 3"), "65535");
    assert_eq!(eval_one("uint32(len(os.Args)) - 3"), "4294967295");
    assert_eq!(eval_one("^uint16(0)"), "65535");
    assert_eq!(eval_one("^uint32(len(os.Args))"), "4294967293");
}

#[test]
/// プロセス引数と標準出力の束縛。
fn os_package_values() {
    assert_eq!(eval_one("os.Args"), "[\"prog\" \"x\"]");
    assert_eq!(eval_one("len(os.Args)"), "2");
    assert_eq!(eval_one("os.Args[1]"), "\"x\"");
    assert_eq!(eval_one("os.Stdout"), "&os.File{name: \"/dev/stdout\"}");
    assert_eq!(eval_one("os.Stdout.Name()"), "\"/dev/stdout\"");
}

#[test]
/// スライス・文字列・append の挙動。
fn slices_and_strings() {
    assert_eq!(eval_one("[]int{1, 2, 3}[1:]"), "[2 3]");
    assert_eq!(eval_one("append([]int{1}, 2, 3)"), "[1 2 3]");
    assert_eq!(eval_one("append(os.Args[:1], os.Args...)"), "[\"prog\" \"prog\" \"x\"]");
    assert_eq!(eval_one("\"héllo\"[1]"), "195");
    assert_eq!(eval_one("string(rune(65))"), "\"A\"");
    assert_eq!(eval_one("[]byte(\"hi\")"), "[104 105]");
    assert_eq!(eval_one("string([]byte(\"hi\"))"), "\"hi\"");
}

#[test]
/// `env` は読んだ時点の環境を写す。
fn env_snapshot() {
    assert_eq!(eval_one("env.Name"), "\".\"");
    assert_eq!(eval_one("env.Vars"), "[\"_\" \"env\"]");
    assert_eq!(eval_one("env.Pkgs"), "[\"fmt\" \"os\"]");
}

#[test]
/// fmt の関数は出力先に書き、書いたバイト数と nil エラーを返す。
fn fmt_functions_write_output() {
    let (vals, out) = eval_with_output("fmt.Println(\"hi\", 2, 1.5, os.Args)");
    assert_eq!(out, "hi 2 1.5 [prog x]\n");
    assert_eq!(vals.unwrap(), vec!["18", "<nil>"]);

    let (vals, out) = eval_with_output("fmt.Printf(\"%d-%s|%5.2f|%q|%T\\n\", 5, \"z\", 3.14159, \"q\", os.Args)");
    assert_eq!(out, "5-z| 3.14|\"q\"|[]string\n");
    assert_eq!(vals.unwrap()[0], out.len().to_string());

    let (_, out) = eval_with_output("fmt.Printf(\"%d %d\\n\", \"x\")");
    assert_eq!(out, "%!d(string=x) %!d(MISSING)\n");
}

#[test]
/// os.File のメソッドも出力先へ書く。
fn file_methods() {
    let (vals, out) = eval_with_output("os.Stdout.WriteString(\"hey\")");
    assert_eq!(out, "hey");
    assert_eq!(vals.unwrap(), vec!["3", "<nil>"]);
}

#[test]
/// 実行時エラーのコード。
fn runtime_errors() {
    let cases = [
        ("1 / (len(os.Args) - 2)", "EVAL010"),
        ("os.Args[len(os.Args)]", "EVAL020"),
        ("os.Args[1:len(os.Args)+1]", "EVAL021"),
        ("1 << (len(os.Args) - 3)", "EVAL030"),
        ("interface{}(os.Args) == interface{}(os.Args)", "EVAL050"),
    ];
    for (src, code) in cases {
        assert_eq!(eval_error_code(src), code, "{src}");
    }
}

#[test]
/// 値を返さない組み込み関数は空の結果になる。
fn builtin_print_has_no_values() {
    assert!(eval_strings("println(1, \"a\")").is_empty());
}
