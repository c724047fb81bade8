//! 请求处理器的端到端测试

mod common;
use common::{compiled_config, config_with_timeout, request};

use nexus_api::nexus_core::runtime::stdlib::{KnowledgeEntry, Services, StaticKnowledge};
use nexus_api::{
    analyze, compile, execute, run, run_binary, compile_source, AnalyzeRequest, CompileRequest,
    NexusError, RunConfig,
};
use std::time::Duration;

const HELLO: &str = r#"fn main() { print("Hello!") } main()"#;

#[test]
fn test_execute_hello_in_both_modes() {
    let config = RunConfig::default();
    for compile_to_binary in [false, true] {
        let response = execute(&request(HELLO, compile_to_binary), &config, Services::default());
        assert!(response.success);
        assert_eq!(response.output, "Hello!\n");
        assert_eq!(response.error, None);
        assert_eq!(response.error_category, None);
        assert!(!response.output_truncated);
        assert!(response.execution_time >= 0.0);
    }
}

#[test]
fn test_execute_timeout() {
    let config = config_with_timeout(1000);
    let response = execute(&request("while true {}", false), &config, Services::default());
    assert!(!response.success);
    assert_eq!(response.error_category.as_deref(), Some("timeout"));
    assert!(response.execution_time >= 1000.0);
    assert!(response.execution_time < 1500.0);
}

#[test]
fn test_execute_reports_pre_execution_errors() {
    let config = RunConfig::default();
    let response = execute(&request("print(", false), &config, Services::default());
    assert!(!response.success);
    assert_eq!(response.error_category.as_deref(), Some("parser"));
    assert_eq!(response.output, "");

    let response = execute(&request("print(\"open", false), &config, Services::default());
    assert_eq!(response.error_category.as_deref(), Some("lexer"));
}

#[test]
fn test_analyze_before_run_blocks_execution() {
    let config = RunConfig {
        analyze_before_run: true,
        ..Default::default()
    };
    let code = "personality { curiosity: 1.5 }\nprint(\"never\")";
    let response = execute(&request(code, false), &config, Services::default());
    assert!(!response.success);
    assert_eq!(response.error_category.as_deref(), Some("analyzer"));
    assert!(response.error.unwrap().contains("1.5"));
    assert_eq!(response.output, "");
}

#[test]
fn test_source_too_large_is_rejected() {
    let code = format!("print(\"{}\")", "x".repeat(1024 * 1024));
    let response = execute(&request(&code, false), &RunConfig::default(), Services::default());
    assert!(!response.success);
    assert_eq!(response.error_category.as_deref(), Some("source"));
}

#[test]
fn test_runtime_fault_keeps_output() {
    let response = execute(
        &request("print(\"before\")\nprint(1 / 0)", true),
        &RunConfig::default(),
        Services::default(),
    );
    assert!(!response.success);
    assert_eq!(response.output, "before\n");
    assert_eq!(response.error_category.as_deref(), Some("division_by_zero"));
    assert_eq!(response.error.as_deref(), Some("Division by zero"));
}

#[test]
fn test_compile_reports_ratio() {
    let code = r#"
        fn banner() {
            print("=====================================")
            print("=====================================")
        }
        banner()
        banner()
    "#;
    let response = compile(&CompileRequest { code: code.into() }, &RunConfig::default());
    assert!(response.success, "{:?}", response.error);
    assert!(response.binary_size > 0);
    assert!(response.compression_ratio > 1.0);

    let response = compile(&CompileRequest { code: "fn (".into() }, &RunConfig::default());
    assert!(!response.success);
    assert_eq!(response.binary_size, 0);
}

#[test]
fn test_compile_then_run_binary() {
    let config = compiled_config();
    let bytes = compile_source(HELLO, &config).unwrap();
    let outcome = run_binary(&bytes, &config, Services::default()).unwrap();
    assert_eq!(outcome.output, "Hello!\n");

    let mut corrupted = bytes.clone();
    let mid = corrupted.len() / 2;
    corrupted[mid] ^= 0xFF;
    let err = run_binary(&corrupted, &config, Services::default()).unwrap_err();
    assert!(matches!(err, NexusError::Load(_)));
    assert_eq!(err.phase(), "loader");
}

#[test]
fn test_analyze_handler() {
    let response = analyze(
        &AnalyzeRequest {
            code: "personality { curiosity: 1.5 }".into(),
        },
        &RunConfig::default(),
    );
    assert_eq!(response.errors.len(), 1);
    assert!(response.errors[0].message.contains("1.5"));

    let response = analyze(&AnalyzeRequest { code: "let = 3".into() }, &RunConfig::default());
    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].line, 1);

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["errors"][0]["kind"], "syntax_error");
    assert_eq!(json["errors"][0]["severity"], "error");
}

#[test]
fn test_template_profile_and_knowledge_service() {
    let knowledge = StaticKnowledge::new(vec![KnowledgeEntry {
        topic: "ops".into(),
        title: "Runbooks".into(),
        summary: "Write them down.".into(),
        confidence: 0.9,
        verified: true,
    }]);
    let services = Services::default().with_knowledge(&knowledge);
    let config = RunConfig::default().with_template("guardian").unwrap();
    let code = r#"
        let hits = knowledge("ops")
        print(hits[0]["title"], describe("consistency"))
    "#;
    let outcome = run(code, &config, services).unwrap();
    assert_eq!(outcome.output, "Runbooks high\n");
    assert!(outcome.elapsed < Duration::from_secs(5));
}
