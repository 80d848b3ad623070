//! Diagnostic de-duplication across a group's permutations.
//!
//! Every permutation compiles the same source, so most compiler messages
//! repeat once per permutation. The sink keeps the set of lines already
//! seen for the group and hands back only the new ones; the pragma-related
//! `X3568` warnings are expected (the external compiler does not know this
//! tool's pragmas) and are dropped outright.

use std::collections::HashSet;
use std::sync::{Mutex, OnceLock, PoisonError};

use regex::Regex;

fn suppressed_warning_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r".*: warning X3568: '(target|namespace|entry|option)' : unknown pragma ignored")
            .unwrap()
    })
}

/// Mutex-guarded set of diagnostic lines already emitted for one group
/// build.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    seen: Mutex<HashSet<String>>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Splits `raw` into lines and returns the ones not suppressed and not
    /// seen before, marking them seen.
    pub fn filter_new_lines(&self, raw: &str) -> Vec<String> {
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        raw.lines()
            .filter(|line| !line.trim().is_empty())
            .filter(|line| !suppressed_warning_regex().is_match(line))
            .filter(|line| seen.insert((*line).to_string()))
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pragma_warnings_are_suppressed_for_every_keyword() {
        let sink = DiagnosticSink::new();
        for keyword in ["target", "namespace", "entry", "option"] {
            let line = format!(
                "C:\\shaders\\blur.hlsl(3,1): warning X3568: '{keyword}' : unknown pragma ignored"
            );
            assert!(sink.filter_new_lines(&line).is_empty(), "{keyword}");
        }
    }

    #[test]
    fn other_pragma_warnings_pass_through() {
        let sink = DiagnosticSink::new();
        let line = "blur.hlsl(3,1): warning X3568: 'loopcount' : unknown pragma ignored";
        assert_eq!(sink.filter_new_lines(line), vec![line.to_string()]);
    }

    #[test]
    fn repeated_lines_are_reported_once() {
        let sink = DiagnosticSink::new();
        let raw = "blur.hlsl(10): warning X3557: loop unrolled\n\
                   blur.hlsl(12): error X3004: undeclared identifier 'foo'";
        assert_eq!(sink.filter_new_lines(raw).len(), 2);
        assert!(sink.filter_new_lines(raw).is_empty());

        let partly_new = "blur.hlsl(12): error X3004: undeclared identifier 'foo'\n\
                          blur.hlsl(14): error X3018: invalid subscript";
        assert_eq!(
            sink.filter_new_lines(partly_new),
            vec!["blur.hlsl(14): error X3018: invalid subscript".to_string()]
        );
    }

    #[test]
    fn blank_lines_are_dropped() {
        let sink = DiagnosticSink::new();
        assert!(sink.filter_new_lines("\n  \n\n").is_empty());
    }
}
