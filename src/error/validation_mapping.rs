use validator::{ValidationErrors, ValidationErrorsKind};

use super::app_error::ValidationIssue;

/// Flattens nested validator output into dotted field paths, sorted so
/// responses are stable.
pub(super) fn validation_issues(errors: &ValidationErrors) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    collect(None, errors, &mut issues);
    issues.sort_by(|left, right| left.field.cmp(&right.field).then(left.code.cmp(&right.code)));
    issues
}

fn collect(prefix: Option<&str>, errors: &ValidationErrors, out: &mut Vec<ValidationIssue>) {
    for (field, kind) in errors.errors() {
        let path = prefix.map_or_else(|| field.to_string(), |prefix| format!("{prefix}.{field}"));

        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                out.extend(field_errors.iter().map(|error| ValidationIssue {
                    field: path.clone(),
                    message: error
                        .message
                        .as_ref()
                        .map_or_else(|| format!("{path} is invalid"), |message| message.to_string()),
                    code: error.code.to_string(),
                }));
            }
            ValidationErrorsKind::Struct(nested) => collect(Some(&path), nested, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect(Some(&format!("{path}[{index}]")), nested, out);
                }
            }
        }
    }
}
