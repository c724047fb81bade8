//! 编译、序列化与加载的端到端测试

mod common;
use common::{compile_and_load, parse_code, run_both};

use nexus_core::binary::{CorruptionError, FormatError};
use nexus_core::runtime::Constant;
use nexus_core::{compile, load, serialize, LoadError};

const SAMPLE: &str = r#"
    personality { curiosity: 0.9, humor: 0.2 }
    fn greet(name) {
        if trait("curiosity") > 0.8 { return "Curious hello, " + name }
        return "hello, " + name
    }
    let names = ["ada", "grace", "linus"]
    for n in names { print(greet(n)) }
    let i = 0
    while i < 3 { i = i + 1 }
    print(i, describe("humor"))
"#;

fn sample_bytes() -> Vec<u8> {
    serialize(&compile(&parse_code(SAMPLE)).unwrap())
}

#[test]
fn test_constant_deduplication() {
    let program = compile(&parse_code(r#"fn main(){ print("a") print("a") } main()"#)).unwrap();
    let a_count = program
        .constants
        .iter()
        .filter(|c| c.as_str() == Some("a"))
        .count();
    assert_eq!(a_count, 1);

    let mut seen = std::collections::HashSet::new();
    for constant in &program.constants {
        let key = match constant {
            Constant::Number(n) => format!("n:{}", n.to_bits()),
            Constant::String(s) => format!("s:{}", s),
        };
        assert!(seen.insert(key), "duplicate constant {constant}");
    }
}

#[test]
fn test_compilation_is_deterministic() {
    assert_eq!(sample_bytes(), sample_bytes());
}

#[test]
fn test_round_trip_preserves_program() {
    let compiled = compile(&parse_code(SAMPLE)).unwrap();
    let loaded = load(&serialize(&compiled)).unwrap();
    assert_eq!(loaded, compiled);
    assert_eq!(loaded.disassemble(), compiled.disassemble());
}

#[test]
fn test_loaded_program_runs_like_source() {
    let outcome = run_both(SAMPLE);
    assert!(outcome.is_success());
    assert_eq!(
        outcome.output,
        "Curious hello, ada\nCurious hello, grace\nCurious hello, linus\n3 low\n"
    );
}

fn assert_smaller_than_text(code: &str) {
    let program = parse_code(code);
    let text = program.to_string();
    let bytes = serialize(&compile(&program).unwrap());
    assert!(
        bytes.len() < text.len(),
        "{code:?}: binary {} bytes, text {} bytes",
        bytes.len(),
        text.len()
    );
}

#[test]
fn test_binary_smaller_than_source_text() {
    assert_smaller_than_text(
        r#"
        fn report(label) {
            print("status report for the nexus runtime: " + label)
            print("status report for the nexus runtime: " + label)
        }
        report("alpha")
        report("alpha")
    "#,
    );
    assert_smaller_than_text(SAMPLE);
}

#[test]
fn test_short_programs_smaller_than_source_text() {
    for code in [
        r#"fn main(){ print("a") print("a") } main()"#,
        "print(1) print(2)",
        "let x = 1 print(x)",
        "let x = 1 let y = 2",
        r#"print("hi") print("hi")"#,
        "let xs = [1, 2, 3] print(len(xs))",
        "fn add(a, b) { return a + b } print(add(1, 2))",
        "let i = 0 while i < 3 { i = i + 1 }",
    ] {
        assert_smaller_than_text(code);
    }
}

#[test]
fn test_main_scenario_size() {
    let program = parse_code(r#"fn main(){ print("a") print("a") } main()"#);
    let bytes = serialize(&compile(&program).unwrap());
    // 10 字节固定开销 + 常量池 ["main", "a"] + 16 字节指令
    assert_eq!(bytes.len(), 33);
    assert_eq!(program.to_string().len(), 54);
}

#[test]
fn test_every_byte_flip_is_detected() {
    let bytes = sample_bytes();
    // 跳过魔数与版本：那里的翻转属于格式错误
    for i in 3..bytes.len() {
        let mut corrupted = bytes.clone();
        corrupted[i] ^= 0x5A;
        assert!(load(&corrupted).is_err(), "flip at byte {i} was not detected");
    }
}

#[test]
fn test_truncation_is_rejected() {
    let bytes = sample_bytes();
    for len in [0, 2, 3, 4, bytes.len() / 2, bytes.len() - 1] {
        let err = load(&bytes[..len]).unwrap_err();
        assert!(err.is_format(), "len {len}: {err}");
    }
}

#[test]
fn test_error_groups() {
    let mut bytes = sample_bytes();
    bytes[0] = b'X';
    assert!(matches!(
        load(&bytes),
        Err(LoadError::Format(FormatError::BadMagic))
    ));

    let mut bytes = sample_bytes();
    bytes[2] = 9;
    assert!(matches!(
        load(&bytes),
        Err(LoadError::Format(FormatError::UnsupportedVersion(9)))
    ));

    let mut bytes = sample_bytes();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    assert!(matches!(
        load(&bytes),
        Err(LoadError::Corruption(CorruptionError::ChecksumMismatch { .. }))
    ));

    let mut bytes = sample_bytes();
    bytes.push(0);
    assert!(matches!(
        load(&bytes),
        Err(LoadError::Format(FormatError::TrailingBytes(1)))
    ));
}

#[test]
fn test_loaded_program_matches_helper() {
    let program = parse_code("print(1)");
    let loaded = compile_and_load(&program);
    assert_eq!(loaded, compile(&program).unwrap());
}
