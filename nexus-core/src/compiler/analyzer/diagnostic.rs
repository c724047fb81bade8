//! 分析诊断信息

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Suggestion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    // errors
    /// 源码无法词法或语法分析（由 API 层产生）
    SyntaxError,
    UnresolvedIdentifier,
    TraitOutOfRange,
    DuplicateTrait,
    // warnings
    UnreachableCode,
    TraitOverridden,
    UnusedParameter,
    UnknownReturnType,
    MissingReturnValue,
    // suggestions
    MainNotCalled,
    EmptyFunctionBody,
    InfiniteLoop,
}

impl DiagnosticKind {
    pub fn severity(&self) -> Severity {
        use DiagnosticKind::*;
        match self {
            SyntaxError | UnresolvedIdentifier | TraitOutOfRange | DuplicateTrait => {
                Severity::Error
            }
            UnreachableCode | TraitOverridden | UnusedParameter | UnknownReturnType
            | MissingReturnValue => Severity::Warning,
            MainNotCalled | EmptyFunctionBody | InfiniteLoop => Severity::Suggestion,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            severity: kind.severity(),
            kind,
            message: message.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}] {}", self.line, self.column, self.message)
    }
}

/// 分析结果，按严重程度分组
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub suggestions: Vec<Diagnostic>,
}

impl AnalysisReport {
    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => self.errors.push(diagnostic),
            Severity::Warning => self.warnings.push(diagnostic),
            Severity::Suggestion => self.suggestions.push(diagnostic),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// 按 错误、警告、建议 的顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.errors
            .iter()
            .chain(&self.warnings)
            .chain(&self.suggestions)
    }

    pub fn len(&self) -> usize {
        self.errors.len() + self.warnings.len() + self.suggestions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_groups_by_severity() {
        let mut report = AnalysisReport::default();
        report.push(Diagnostic::new(DiagnosticKind::TraitOutOfRange, "bad", 1, 1));
        report.push(Diagnostic::new(DiagnosticKind::UnusedParameter, "unused", 2, 1));
        report.push(Diagnostic::new(DiagnosticKind::InfiniteLoop, "loop", 3, 1));
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.suggestions.len(), 1);
        assert!(report.has_errors());
        assert_eq!(report.iter().count(), 3);
    }

    #[test]
    fn test_serialize_kind() {
        let diag = Diagnostic::new(DiagnosticKind::UnreachableCode, "dead", 4, 5);
        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.contains("\"kind\":\"unreachable_code\""));
        assert!(json.contains("\"severity\":\"warning\""));
        assert_eq!(diag.to_string(), "[4:5] dead");
    }
}
