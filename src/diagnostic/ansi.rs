use crate::ast::SourceMap;
use super::Diagnostic;

pub struct AnsiRenderer {
    pub use_color: bool,
}

impl AnsiRenderer {
    fn bold(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[1m{s}\x1b[0m") } else { s.to_string() }
    }

    fn bold_red(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[1;31m{s}\x1b[0m") } else { s.to_string() }
    }

    fn cyan(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[36m{s}\x1b[0m") } else { s.to_string() }
    }

    fn dim(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[2m{s}\x1b[0m") } else { s.to_string() }
    }

    pub fn render(&self, d: &Diagnostic) -> String {
        let mut out = String::new();

        // "error[ARC-P001]: message"
        let heading = match d.code {
            Some(code) => format!("error[{code}]"),
            None => "error".to_string(),
        };
        out.push_str(&format!("{}: {}\n", self.bold_red(&heading), self.bold(&d.message)));

        // First label gets the source snippet
        let primary = d.labels.first();
        if let (Some(label), Some(source)) = (primary, &d.source) {
            let map = SourceMap::new(source);
            let (line, col) = map.lookup(label.span.start);
            let line_text = map.line_text(source, line);

            // "  --> line:col"
            out.push_str(&format!("  {} {}:{}\n", self.cyan("-->"), line, col));

            // Gutter width based on line number digits
            let gutter = line.to_string().len();
            let pipe = self.cyan("|");
            let pad = " ".repeat(gutter);

            // Empty gutter line
            out.push_str(&format!("{pad} {pipe}\n"));

            // Source line
            let line_num = self.cyan(&format!("{line:>gutter$}"));
            out.push_str(&format!("{line_num} {pipe} {line_text}\n"));

            // Caret line
            let span_start_in_line = col.saturating_sub(1);
            let span_len = (label.span.end.saturating_sub(label.span.start)).max(1);
            let carets = self.bold_red(&"^".repeat(span_len));
            let indent = " ".repeat(span_start_in_line);
            if label.message.is_empty() {
                out.push_str(&format!("{pad} {pipe} {indent}{carets}\n"));
            } else {
                out.push_str(&format!("{pad} {pipe} {indent}{carets} {}\n",
                    self.bold_red(&label.message)));
            }

            // Empty gutter line after
            out.push_str(&format!("{pad} {pipe}\n"));
        }

        // Notes
        for note in &d.notes {
            out.push_str(&format!("  {} note: {}\n", self.dim("="), note));
        }

        // Suggestion
        if let Some(suggestion) = &d.suggestion {
            out.push_str(&format!("  {} suggestion: {}\n", self.dim("="), suggestion));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Span;

    const SRC: &str = "let a = 5\nlet b = a + c\nreturn b";

    fn undefined_c() -> Diagnostic {
        Diagnostic::error("undefined variable: c")
            .with_code("ARC-C001")
            .with_span(Span { start: 22, end: 23 }, "not bound")
            .with_source(SRC)
            .with_suggestion("bind it first, e.g. 'let c = 0'")
    }

    fn plain() -> AnsiRenderer {
        AnsiRenderer { use_color: false }
    }

    #[test]
    fn heading_carries_code() {
        let out = plain().render(&undefined_c());
        assert!(out.starts_with("error[ARC-C001]: undefined variable: c\n"), "{out}");
    }

    #[test]
    fn heading_without_code() {
        let out = plain().render(&Diagnostic::error("division by zero"));
        assert_eq!(out, "error: division by zero\n");
    }

    #[test]
    fn snippet_points_at_second_line() {
        let out = plain().render(&undefined_c());
        assert!(out.contains("--> 2:13"), "{out}");
        assert!(out.contains("2 | let b = a + c"), "{out}");
        assert!(out.contains("  |             ^ not bound"), "{out}");
    }

    #[test]
    fn caret_length_matches_span() {
        let d = Diagnostic::error("'break' outside of a while loop")
            .with_span(Span { start: 0, end: 5 }, "")
            .with_source("break");
        let out = plain().render(&d);
        assert!(out.contains("| ^^^^^\n"), "{out}");
    }

    #[test]
    fn notes_and_suggestion_listed() {
        let d = undefined_c().with_note("at instruction 3");
        let out = plain().render(&d);
        assert!(out.contains("= note: at instruction 3"), "{out}");
        assert!(out.contains("= suggestion: bind it first"), "{out}");
    }

    #[test]
    fn no_source_no_snippet() {
        let d = Diagnostic::error("bad").with_span(Span { start: 1, end: 2 }, "here");
        let out = plain().render(&d);
        assert!(!out.contains("-->"), "{out}");
    }

    #[test]
    fn color_toggles_escape_codes() {
        let colored = AnsiRenderer { use_color: true }.render(&undefined_c());
        assert!(colored.contains("\x1b["));
        assert!(!plain().render(&undefined_c()).contains("\x1b["));
    }
}
