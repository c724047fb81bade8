//! 解释模式与编译模式的一致性测试

mod common;
use common::{output_of, run_both};

#[test]
fn test_hello_main() {
    assert_eq!(output_of(r#"fn main() { print("Hello!") } main()"#), "Hello!\n");
}

#[test]
fn test_arithmetic() {
    let code = r#"
        print(1 + 2 * 3 - 4 / 2)
        print(2 ** 10, -2 ** 2, 2 ** 3 ** 2)
        print(7 % 3, 0.1 + 0.2, 10 / 4)
        print(!0, !"", !null, !"x")
    "#;
    assert_eq!(
        output_of(code),
        "5\n1024 4 512\n1 0.30000000000000004 2.5\ntrue true true false\n"
    );
}

#[test]
fn test_strings() {
    let code = r#"
        let name = "nexus"
        print("hello, " + name + "!")
        print("n=" + 3, true + "!")
        print("ab" * 3, len("héllo"), "héllo"[1])
        print("a" < "b", "b" <= "a")
    "#;
    assert_eq!(
        output_of(code),
        "hello, nexus!\nn=3 true!\nababab 5 é\ntrue false\n"
    );
}

#[test]
fn test_short_circuit() {
    let code = r#"
        fn boom() { return 1 / 0 }
        print(false && boom())
        print(true || boom())
        print(1 && 2, null || "fallback", 0 && 1, "" || 0)
    "#;
    assert_eq!(output_of(code), "false\ntrue\n2 fallback false 0\n");
}

#[test]
fn test_scoping_rules() {
    let code = r#"
        let g = 1
        fn read_global() { return g }
        fn shadow() { let g = 99  return g }
        fn update() { g = g + 1 }
        fn local_only() { fresh = 5  return fresh }
        print(read_global(), shadow(), g)
        update()
        print(g, local_only())
        print(type(fresh))
    "#;
    let outcome = run_both(code);
    assert_eq!(outcome.output, "1 99 1\n2 5\n");
    assert_eq!(outcome.error_category(), Some("undefined_variable"));
}

#[test]
fn test_functions_do_not_capture_locals() {
    let code = r#"
        fn outer() {
            let hidden = 42
            fn inner() { return hidden }
            return inner()
        }
        outer()
    "#;
    let outcome = run_both(code);
    assert_eq!(outcome.error_category(), Some("undefined_variable"));
}

#[test]
fn test_nested_functions_are_callable() {
    let code = r#"
        fn outer(x) {
            fn double(n) { return n * 2 }
            return double(x) + 1
        }
        print(outer(20))
    "#;
    assert_eq!(output_of(code), "41\n");
}

#[test]
fn test_control_flow() {
    let code = r#"
        fn classify(n) {
            if n < 0 { return "negative" }
            else if n == 0 { return "zero" }
            else { return "positive" }
        }
        print(classify(-3), classify(0), classify(8))

        let total = 0
        let i = 0
        while true {
            i = i + 1
            if i % 2 == 0 { continue }
            if i > 9 { break }
            total = total + i
        }
        print(total)

        for c in "abc" { print(c) }
        for k in {zeta: 1, alpha: 2, mid: 3} { print(k) }
    "#;
    assert_eq!(
        output_of(code),
        "negative zero positive\n25\na\nb\nc\nalpha\nmid\nzeta\n"
    );
}

#[test]
fn test_nested_loops_with_break() {
    let code = r#"
        let pairs = []
        for a in range(4) {
            for b in range(4) {
                if b > a { break }
                if a == b { continue }
                pairs = push(pairs, [a, b])
            }
        }
        print(pairs)
    "#;
    assert_eq!(
        output_of(code),
        "[[1, 0], [2, 0], [2, 1], [3, 0], [3, 1], [3, 2]]\n"
    );
}

#[test]
fn test_collections_are_values() {
    let code = r#"
        let xs = [1, 2]
        let ys = push(xs, 3)
        print(xs, ys, xs + ys)
        let m = {name: "nexus", tags: ["dsl", "vm"]}
        print(m["tags"][1], m["nope"], keys(m), len(m))
        print(m)
        print(str([1, "a", null]), type({}), type(print), type(len))
    "#;
    assert_eq!(
        output_of(code),
        "[1, 2] [1, 2, 3] [1, 2, 1, 2, 3]\n\
         vm null [\"name\", \"tags\"] 2\n\
         {\"name\": \"nexus\", \"tags\": [\"dsl\", \"vm\"]}\n\
         [1, \"a\", null] map function function\n"
    );
}

#[test]
fn test_recursion() {
    let code = r#"
        fn fib(n) { if n < 2 { return n } return fib(n - 1) + fib(n - 2) }
        print(fib(20))
    "#;
    assert_eq!(output_of(code), "6765\n");
}

#[test]
fn test_top_level_return() {
    let code = "print(\"before\")\nreturn\nprint(\"after\")";
    assert_eq!(output_of(code), "before\n");
}

#[test]
fn test_runtime_faults_match() {
    let cases = [
        ("print(1 / 0)", "division_by_zero"),
        ("missing()", "undefined_variable"),
        ("let n = 1 n()", "not_callable"),
        ("fn f(a, b) { return a } f(1)", "arity_mismatch"),
        ("len()", "arity_mismatch"),
        ("[1, 2][2]", "index_out_of_bounds"),
        ("-\"x\"", "type_error"),
        ("1 < \"2\"", "type_error"),
        ("\"ab\" * -1", "type_error"),
        ("for x in 5 { }", "type_error"),
        ("trait(\"charisma\")", "personality"),
    ];
    for (code, category) in cases {
        let outcome = run_both(code);
        assert_eq!(outcome.error_category(), Some(category), "for {code}");
    }
}

#[test]
fn test_partial_output_before_fault() {
    let outcome = run_both("print(\"one\") print(\"two\") print(nope) print(\"three\")");
    assert_eq!(outcome.output, "one\ntwo\n");
    assert!(!outcome.is_success());
}

#[test]
fn test_literals_larger_than_operand_stack() {
    let items: Vec<String> = (0..1100).map(|i| i.to_string()).collect();
    let code = format!(
        "let xs = [{}]\nprint(len(xs), xs[0], xs[1099])\nprint(len([{}]))",
        items.join(", "),
        items.join(", ")
    );
    assert_eq!(output_of(&code), "1100 0 1099\n1100\n");

    let entries: Vec<String> = (0..1100).map(|i| format!("k{}: {}", i, i)).collect();
    let code = format!("let m = {{{}}}\nprint(len(m), m[\"k1099\"])", entries.join(", "));
    assert_eq!(output_of(&code), "1100 1099\n");
}

#[test]
fn test_builtin_names_can_be_rebound() {
    let code = r#"
        fn apply(print, x) { return print(x) }
        print(apply(len, "abc"))
        len = fn_free
    "#;
    let outcome = run_both(code);
    assert_eq!(outcome.output, "3\n");
    assert_eq!(outcome.error_category(), Some("undefined_variable"));

    let code = r#"
        fn twice(x) { return x * 2 }
        str = twice
        print(str(4), type(print))
    "#;
    assert_eq!(output_of(code), "8 function\n");
}

#[test]
fn test_statement_calls_discard_results() {
    let code = r#"
        fn side(n) { print("side", n) return n }
        side(1)
        len("abc")
        let kept = side(2)
        print(kept)
    "#;
    assert_eq!(output_of(code), "side 1\nside 2\n2\n");
}
