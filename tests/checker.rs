// パス: tests/checker.rs
// 役割: 静的検査の型付けとエラー報告の統合テスト
// 意図: 環境に対する名前解決と Go の型規則が公開 API から期待通りに見えることを確認する
// 関連ファイル: src/checker/mod.rs, src/checker/ops.rs, src/checker/call.rs, tests/test_support.rs
#[path = "test_support.rs"]
mod support;

use support::{check_codes, check_errors, check_type};

#[test]
/// 最上位の型なし定数は既定型へ落ちる。
fn untyped_results_are_defaulted() {
    let cases = [
        ("1 + 2", "int"),
        ("'a' + 1", "int32"),
        ("1.5 * 2", "float64"),
        ("\"a\" + \"b\"", "string"),
        ("1 < 2", "bool"),
        ("1 << 3", "int"),
    ];
    for (src, ty) in cases {
        assert_eq!(check_type(src), ty, "{src}");
    }
}

#[test]
/// 環境の束縛とパッケージメンバーの型。
fn environment_bindings_have_go_types() {
    let cases = [
        ("os.Args", "[]string"),
        ("os.Args[0]", "string"),
        ("os.Args[1:]", "[]string"),
        ("len(os.Args) > 1", "bool"),
        ("os.Stdout", "*os.File"),
        ("os.Stdout.Name", "func() string"),
        ("fmt.Println", "func(...interface {}) (int, error)"),
        ("fmt.Println(\"x\")", "(int, error)"),
        ("env", "*eval.Env"),
        ("env.Vars", "[]string"),
    ];
    for (src, ty) in cases {
        assert_eq!(check_type(src), ty, "{src}");
    }
}

#[test]
/// 変換・合成リテラル・組み込み関数の結果型。
fn conversions_and_builtins() {
    assert_eq!(check_type("[]byte(\"hi\")"), "[]uint8");
    assert_eq!(check_type("string(rune(65))"), "string");
    assert_eq!(check_type("interface{}(1)"), "interface {}");
    assert_eq!(check_type("append(os.Args, \"y\")"), "[]string");
    assert_eq!(check_type("[]interface{}{1, \"a\", nil}"), "[]interface {}");
    assert_eq!(check_type("float64(len(os.Args)) / 2"), "float64");
    assert_eq!(check_type("int8(127)"), "int8");
    assert_eq!(check_type("uint16(1) + 2"), "uint16");
    assert_eq!(check_type("[]uint32{1, 2}"), "[]uint32");
}

#[test]
/// 代表的な検査エラーのコード。
fn error_codes() {
    let cases = [
        ("foo", "CHK001"),
        ("fmt.Sprintf", "CHK002"),
        ("1 + \"a\"", "CHK010"),
        ("\"a\" - \"b\"", "CHK011"),
        ("1 / 0", "CHK012"),
        ("byte(300)", "CHK013"),
        ("int(1.5)", "CHK015"),
        ("int8(128)", "CHK013"),
        ("uint32(-1)", "CHK013"),
        ("fmt.Println() + 1", "CHK030"),
        ("int", "CHK060"),
        ("fmt", "CHK061"),
    ];
    for (src, code) in cases {
        assert_eq!(check_codes(src), vec![code], "{src}");
    }
}

#[test]
/// 定数 0 での除算は、被除数が定数か整数のときだけ検査エラー。
fn constant_zero_divisor() {
    assert_eq!(check_codes("1.0 / 0"), vec!["CHK012"]);
    assert_eq!(check_codes("len(os.Args) / 0"), vec!["CHK012"]);
    assert_eq!(check_codes("len(os.Args) % 0"), vec!["CHK012"]);
    assert_eq!(check_type("float64(len(os.Args)) / 0"), "float64");
}

#[test]
/// 1 行の中の複数のエラーを順に全部報告する。
fn errors_accumulate_in_source_order() {
    let errs = check_errors("missing + alsoMissing");
    assert_eq!(errs.len(), 2);
    assert_eq!(errs[0].0.col, Some(1));
    assert_eq!(errs[1].0.col, Some(11));
}

#[test]
/// エラーは問題の部分式の位置を持つ。
fn errors_carry_positions() {
    let errs = check_errors("1 + foo");
    assert_eq!(errs.len(), 1);
    let info = &errs[0].0;
    assert_eq!((info.line, info.col, info.pos), (Some(1), Some(5), Some(4)));
    assert!(errs[0].to_string().starts_with("[CHK001] "));
}
