use ariadne::{Color, Label, Report, ReportKind, Source};
use tally::TallyError;

const SOURCE_ID: &str = "formula";

/// Format a TallyError with fancy terminal output using Ariadne
pub fn format_error(error: &TallyError) -> String {
    match error {
        TallyError::Syntax(details) | TallyError::Runtime(details) => {
            let mut output = Vec::new();

            let error_type = match error {
                TallyError::Syntax(_) => "Syntax error",
                _ => "Runtime error",
            };

            // Spans at the very end of the formula still need a visible marker
            let end = details.span.end.max(details.span.start + 1);
            let mut report = Report::build(ReportKind::Error, SOURCE_ID, details.span.start)
                .with_message(format!("{}: {}", error_type, details.message))
                .with_label(
                    Label::new((SOURCE_ID, details.span.start..end))
                        .with_message("")
                        .with_color(Color::Red),
                );

            if let Some(suggestion) = &details.suggestion {
                report = report.with_help(suggestion);
            }

            match report
                .finish()
                .write((SOURCE_ID, Source::from(details.formula.as_ref())), &mut output)
            {
                Ok(_) => String::from_utf8_lossy(&output).to_string(),
                Err(_) => {
                    // Fallback to simple format
                    format!("{}", error)
                }
            }
        }
        TallyError::Engine(msg) => format!("Engine error: {}", msg),
        TallyError::CircularDependency(msg) => format!("Circular dependency: {}", msg),
        TallyError::ResourceLimitExceeded {
            limit_name,
            limit_value,
            actual_value,
            suggestion,
        } => {
            format!(
                "Resource limit exceeded: {}\n  Limit: {}\n  Actual: {}\n  {}",
                limit_name, limit_value, actual_value, suggestion
            )
        }
        TallyError::MultipleErrors(errors) => {
            let mut result = String::from("Multiple errors occurred:\n\n");
            for error in errors {
                result.push_str(&format_error(error));
                result.push_str("\n\n");
            }
            result
        }
    }
}
