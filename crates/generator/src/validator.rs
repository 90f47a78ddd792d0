//! Model invariant checks
//!
//! Runs before any output file is opened.  A violation here is a
//! programming error in the API table, so the result is a single
//! diagnostic line naming the offending call(s) and the rule broken.
//!
//! The rule "every non-daemon call carries the sentinel procedure number"
//! is discharged structurally: [`crate::model::Proc::Client`] has no number
//! to get wrong.  Everything else is checked here, and a new rule should be
//! added here and nowhere else.

use crate::model::{Model, Proc, ReturnKind};

/// Check every invariant of the model.  Returns the first violation as a
/// one-line diagnostic.
pub fn validate(model: &Model) -> Result<(), String> {
    for call in &model.calls {
        if call.name.contains('-') {
            return Err(format!(
                "call '{}': name contains a hyphen (use underscores)",
                call.name
            ));
        }

        if call.longdesc.ends_with('\n') {
            return Err(format!(
                "call '{}': long description must not end with a newline",
                call.name
            ));
        }

        if let Proc::Daemon(n) = call.proc {
            if n == 0 {
                return Err(format!(
                    "call '{}': daemon calls need a procedure number > 0",
                    call.name
                ));
            }
            if matches!(call.ret, ReturnKind::ConstString(_)) {
                return Err(format!(
                    "call '{}': const-string return is not possible on a daemon call",
                    call.name
                ));
            }
        }
    }

    check_duplicate_names(model)?;
    check_duplicate_procs(model)?;

    Ok(())
}

fn check_duplicate_names(model: &Model) -> Result<(), String> {
    let mut names: Vec<&str> = model.calls.iter().map(|c| c.name.as_str()).collect();
    names.sort_unstable();
    for pair in names.windows(2) {
        if pair[0] == pair[1] {
            return Err(format!("call '{}' is defined twice", pair[0]));
        }
    }
    Ok(())
}

/// Procedure numbers, once sorted, must be strictly increasing.
fn check_duplicate_procs(model: &Model) -> Result<(), String> {
    let mut procs: Vec<(u32, &str)> = model
        .calls
        .iter()
        .filter_map(|c| c.proc_number().map(|n| (n, c.name.as_str())))
        .collect();
    procs.sort_unstable();
    for pair in procs.windows(2) {
        if pair[0].0 == pair[1].0 {
            return Err(format!(
                "procedure number {} is used by both '{}' and '{}'",
                pair[0].0, pair[0].1, pair[1].1
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Arg, Call};

    fn model_of(calls: Vec<Call>) -> Model {
        Model { calls }
    }

    #[test]
    fn test_hyphen_in_name_rejected() {
        let m = model_of(vec![Call::client("set-path", ReturnKind::Err, vec![])]);
        let err = validate(&m).unwrap_err();
        assert!(err.contains("set-path"));
        assert!(err.contains("hyphen"));
    }

    #[test]
    fn test_trailing_newline_rejected() {
        let mut c = Call::client("launch", ReturnKind::Err, vec![]);
        c.longdesc = "Launches the subprocess.\n".to_string();
        let err = validate(&model_of(vec![c])).unwrap_err();
        assert!(err.contains("launch"));
        assert!(err.contains("newline"));
    }

    #[test]
    fn test_zero_procedure_number_rejected() {
        let m = model_of(vec![Call::daemon("sync", 0, ReturnKind::Err, vec![])]);
        let err = validate(&m).unwrap_err();
        assert!(err.contains("sync"));
    }

    #[test]
    fn test_duplicate_procedure_number_names_both_calls() {
        let m = model_of(vec![
            Call::daemon("a", 7, ReturnKind::Err, vec![]),
            Call::daemon("b", 7, ReturnKind::Err, vec![]),
        ]);
        let err = validate(&m).unwrap_err();
        assert!(err.contains('7'));
        assert!(err.contains("'a'"));
        assert!(err.contains("'b'"));
    }

    #[test]
    fn test_const_string_on_daemon_call_rejected() {
        let m = model_of(vec![Call::daemon(
            "foo",
            9,
            ReturnKind::ConstString("x".to_string()),
            vec![],
        )]);
        let err = validate(&m).unwrap_err();
        assert!(err.contains("foo"));
        assert!(err.contains("const-string"));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let m = model_of(vec![
            Call::client("launch", ReturnKind::Err, vec![]),
            Call::client("launch", ReturnKind::Err, vec![]),
        ]);
        let err = validate(&m).unwrap_err();
        assert!(err.contains("twice"));
    }

    #[test]
    fn test_valid_model_passes() {
        let m = model_of(vec![
            Call::daemon("touch", 3, ReturnKind::Err, vec![Arg::string("path")]),
            Call::client("launch", ReturnKind::Err, vec![]),
        ]);
        assert!(validate(&m).is_ok());
    }

    #[test]
    fn test_shipped_names_match_identifier_shape() {
        // Stronger property than the hyphen rule: every shipped name is a
        // lower-case C identifier.
        let model = crate::api::api_model();
        for call in &model.calls {
            let mut chars = call.name.chars();
            let first = chars.next().unwrap();
            assert!(
                first.is_ascii_lowercase() || first == '_',
                "bad name start: {}",
                call.name
            );
            assert!(
                chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'),
                "bad name: {}",
                call.name
            );
        }
    }
}
