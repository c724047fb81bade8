//! CLI 格式化输出
//!
//! 提供命令行友好的错误显示和源码上下文打印。

use nexus_api::NexusError;

/// 错误行前后显示的上下文行数
const CONTEXT_LINES: usize = 2;

/// 打印错误并显示源代码上下文
pub fn print_error_with_source(e: &NexusError, source: &str) {
    eprintln!("error: {}", e.to_report());

    if let (Some(line), Some(column)) = (e.line(), e.column()) {
        eprint!("{}", render_source_context(source, line, column));
    }
}

/// 源代码上下文（错误行前后几行），并在错误列下方标记
fn render_source_context(source: &str, error_line: usize, error_col: usize) -> String {
    let lines: Vec<&str> = source.lines().collect();
    if error_line == 0 || error_line > lines.len() {
        return String::new();
    }

    let start_line = error_line.saturating_sub(CONTEXT_LINES).max(1);
    let end_line = (error_line + CONTEXT_LINES).min(lines.len());
    let width = end_line.to_string().len();

    let mut out = format!("{}|--\n", "-".repeat(width + 1));
    for line_no in start_line..=end_line {
        out.push_str(&format!("{:>width$} | {}\n", line_no, lines[line_no - 1]));
        if line_no == error_line {
            let marker = " ".repeat(error_col.saturating_sub(1));
            out.push_str(&format!("{:width$} | {}^\n", "", marker));
        }
    }
    out.push_str(&format!("{}|--\n", "-".repeat(width + 1)));
    out
}
