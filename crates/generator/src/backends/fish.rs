//! Interactive shell backend
//!
//! Emits the shell's generated command layer: the alphabetical command
//! table, the per-command help dispatcher, the LVM record printers, one
//! `run_*` wrapper per call, and the top-level `run_action` dispatcher.
//! Calls flagged as not-in-shell are left out of all of it.
//!
//! Command tokens match case-insensitively against the public name, the
//! hyphenated name and the alias, in that order, first match wins.

use super::EmitError;
use crate::banner::{generated_by, CommentStyle, License};
use crate::model::{ArgKind, Call, ColKind, LvmKind, Model, ReturnKind};
use std::fmt::Write as _;

pub fn generate_fish_cmds(model: &Model) -> Result<String, EmitError> {
    let mut out = generated_by(CommentStyle::CStyle, License::GPLv2plus);

    writeln!(out, "#include <stdio.h>")?;
    writeln!(out, "#include <stdlib.h>")?;
    writeln!(out, "#include <string.h>")?;
    writeln!(out, "#include <inttypes.h>")?;
    writeln!(out)?;
    writeln!(out, "#include <guestfs.h>")?;
    writeln!(out, "#include \"fish.h\"")?;
    writeln!(out)?;

    emit_list_commands(&mut out, model)?;
    emit_display_command(&mut out, model)?;
    for kind in LvmKind::ALL {
        emit_record_printer(&mut out, kind)?;
    }
    for call in fish_calls(model) {
        emit_runner(&mut out, call)?;
    }
    emit_run_action(&mut out, model)?;

    Ok(out)
}

/// Calls visible to the shell, in declaration order.
fn fish_calls(model: &Model) -> impl Iterator<Item = &Call> {
    model.calls.iter().filter(|c| c.in_fish())
}

/// Escape arbitrary text into a C string literal body.
fn c_quote(text: &str) -> String {
    let mut out = String::new();
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

/// Rewrite cross-references to the C API into plain command names.
fn fishify(text: &str) -> String {
    text.replace("C<guestfs_", "C<")
}

/// Synopsis line: hyphenated name plus one placeholder per argument.
fn synopsis(call: &Call) -> String {
    let mut s = call.fish_name();
    for arg in &call.args {
        match arg.kind {
            ArgKind::Bool => {
                let _ = write!(s, " <true|false>");
            }
            _ => {
                let _ = write!(s, " <{}>", arg.name);
            }
        }
    }
    s
}

fn emit_list_commands(out: &mut String, model: &Model) -> Result<(), EmitError> {
    let mut calls: Vec<&Call> = fish_calls(model).collect();
    calls.sort_by_key(|c| c.fish_name());

    writeln!(out, "void list_commands (void)")?;
    writeln!(out, "{{")?;
    writeln!(
        out,
        "  printf (\"    %-16s     %s\\n\", \"Command\", \"Description\");"
    )?;
    writeln!(out, "  list_builtin_commands ();")?;
    for call in calls {
        writeln!(
            out,
            "  printf (\"%-20s %s\\n\", \"{}\", \"{}\");",
            call.fish_name(),
            c_quote(&call.shortdesc)
        )?;
    }
    writeln!(
        out,
        "  printf (\"    Use -h <cmd> / help <cmd> to show detailed help for a command.\\n\");"
    )?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    Ok(())
}

/// The strcasecmp chain matching a user token against one command's
/// accepted spellings.
fn match_condition(call: &Call) -> String {
    let mut cond = format!("strcasecmp (cmd, \"{}\") == 0", call.name);
    if call.fish_name() != call.name {
        let _ = write!(cond, " || strcasecmp (cmd, \"{}\") == 0", call.fish_name());
    }
    if let Some(alias) = call.fish_alias() {
        let _ = write!(cond, " || strcasecmp (cmd, \"{}\") == 0", alias);
    }
    cond
}

fn emit_display_command(out: &mut String, model: &Model) -> Result<(), EmitError> {
    writeln!(out, "void display_command (const char *cmd)")?;
    writeln!(out, "{{")?;
    for call in fish_calls(model) {
        let mut body = format!(" {}\n\n{}", synopsis(call), fishify(&call.longdesc));
        if call.protocol_limit_warning() {
            body.push_str("\n\n");
            body.push_str(super::PROTOCOL_LIMIT_WARNING);
        }
        if let Some(alias) = call.fish_alias() {
            let _ = write!(
                body,
                "\n\nYou can use '{}' as an alias for this command.",
                alias
            );
        }
        writeln!(out, "  if ({})", match_condition(call))?;
        writeln!(
            out,
            "    pod2text (\"{} - {}\", \"{}\");",
            call.fish_name(),
            c_quote(&call.shortdesc),
            c_quote(&body)
        )?;
        writeln!(out, "  else")?;
    }
    writeln!(out, "    display_builtin_command (cmd);")?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    Ok(())
}

/// Per-record printers used by the structured-list runners.
fn emit_record_printer(out: &mut String, kind: LvmKind) -> Result<(), EmitError> {
    let k = kind.name();
    writeln!(
        out,
        "static void print_{k} (struct guestfs_lvm_{k} *{k})",
        k = k
    )?;
    writeln!(out, "{{")?;
    if kind.columns().iter().any(|(_, c)| *c == ColKind::Uuid) {
        writeln!(out, "  int i;")?;
        writeln!(out)?;
    }
    for (col, colkind) in kind.columns() {
        match colkind {
            ColKind::Str => {
                writeln!(out, "  printf (\"{c}: %s\\n\", {k}->{c});", c = col, k = k)?;
            }
            ColKind::Uuid => {
                writeln!(out, "  printf (\"{}: \");", col)?;
                writeln!(out, "  for (i = 0; i < 32; ++i)")?;
                writeln!(out, "    printf (\"%c\", {}->{}[i]);", k, col)?;
                writeln!(out, "  printf (\"\\n\");")?;
            }
            ColKind::Bytes => {
                writeln!(
                    out,
                    "  printf (\"{c}: %\" PRIu64 \"\\n\", {k}->{c});",
                    c = col,
                    k = k
                )?;
            }
            ColKind::Int64 => {
                writeln!(
                    out,
                    "  printf (\"{c}: %\" PRIi64 \"\\n\", {k}->{c});",
                    c = col,
                    k = k
                )?;
            }
            ColKind::OptPercent => {
                writeln!(out, "  if ({}->{} >= 0)", k, col)?;
                writeln!(
                    out,
                    "    printf (\"{c}: %g %%\\n\", {k}->{c});",
                    c = col,
                    k = k
                )?;
                writeln!(out, "  else")?;
                writeln!(out, "    printf (\"{}: \\n\");", col)?;
            }
        }
    }
    writeln!(out, "}}")?;
    writeln!(out)?;
    writeln!(
        out,
        "static void print_{k}_list (struct guestfs_lvm_{k}_list *{k}s)",
        k = k
    )?;
    writeln!(out, "{{")?;
    writeln!(out, "  unsigned int i;")?;
    writeln!(out)?;
    writeln!(out, "  for (i = 0; i < {k}s->len; ++i)", k = k)?;
    writeln!(out, "    print_{k} (&{k}s->val[i]);", k = k)?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    Ok(())
}

/// C type of the runner's result local for one return kind.
fn runner_result_type(ret: &ReturnKind) -> &'static str {
    match ret {
        ReturnKind::Err | ReturnKind::Int(_) | ReturnKind::Bool(_) => "int r;",
        ReturnKind::ConstString(_) => "const char *r;",
        ReturnKind::String(_) => "char *r;",
        ReturnKind::StringList(_) => "char **r;",
        ReturnKind::IntBool(_, _) => "struct guestfs_int_bool *r;",
        ReturnKind::PvList(_) => "struct guestfs_lvm_pv_list *r;",
        ReturnKind::VgList(_) => "struct guestfs_lvm_vg_list *r;",
        ReturnKind::LvList(_) => "struct guestfs_lvm_lv_list *r;",
    }
}

fn emit_runner(out: &mut String, call: &Call) -> Result<(), EmitError> {
    let n = &call.name;
    writeln!(
        out,
        "static int run_{} (const char *cmd, int argc, char *argv[])",
        n
    )?;
    writeln!(out, "{{")?;
    writeln!(out, "  {}", runner_result_type(&call.ret))?;
    for arg in &call.args {
        match arg.kind {
            ArgKind::Str | ArgKind::OptStr => {
                writeln!(out, "  const char *{};", arg.name)?
            }
            ArgKind::Bool | ArgKind::Int => writeln!(out, "  int {};", arg.name)?,
        }
    }
    writeln!(out, "  if (argc != {}) {{", call.args.len())?;
    writeln!(
        out,
        "    fprintf (stderr, \"%s should have {} parameter(s)\\n\", cmd);",
        call.args.len()
    )?;
    writeln!(
        out,
        "    fprintf (stderr, \"type 'help %s' for help on %s\\n\", cmd, cmd);"
    )?;
    writeln!(out, "    return -1;")?;
    writeln!(out, "  }}")?;

    for (i, arg) in call.args.iter().enumerate() {
        match arg.kind {
            ArgKind::Str => writeln!(out, "  {} = argv[{}];", arg.name, i)?,
            ArgKind::OptStr => writeln!(
                out,
                "  {} = strcmp (argv[{}], \"\") != 0 ? argv[{}] : NULL;",
                arg.name, i, i
            )?,
            ArgKind::Bool => {
                writeln!(out, "  {} = is_true (argv[{}]) ? 1 : 0;", arg.name, i)?
            }
            ArgKind::Int => writeln!(out, "  {} = atoi (argv[{}]);", arg.name, i)?,
        }
    }

    // The shell-action flag replaces the library call with a shell-side
    // function of the same shape.
    let mut invocation = match call.fish_action() {
        Some(action) => format!("{} (g", action),
        None => format!("guestfs_{} (g", n),
    };
    for arg in &call.args {
        let _ = write!(invocation, ", {}", arg.name);
    }
    invocation.push(')');

    writeln!(out, "  r = {};", invocation)?;
    emit_runner_result(out, call)?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    Ok(())
}

fn emit_runner_result(out: &mut String, call: &Call) -> Result<(), EmitError> {
    match &call.ret {
        ReturnKind::Err => {
            writeln!(out, "  return r;")?;
        }
        ReturnKind::Int(_) => {
            writeln!(out, "  if (r == -1) return -1;")?;
            writeln!(out, "  printf (\"%d\\n\", r);")?;
            writeln!(out, "  return 0;")?;
        }
        ReturnKind::Bool(_) => {
            writeln!(out, "  if (r == -1) return -1;")?;
            writeln!(out, "  if (r) printf (\"true\\n\"); else printf (\"false\\n\");")?;
            writeln!(out, "  return 0;")?;
        }
        ReturnKind::ConstString(_) => {
            writeln!(out, "  if (r == NULL) return -1;")?;
            writeln!(out, "  printf (\"%s\\n\", r);")?;
            writeln!(out, "  return 0;")?;
        }
        ReturnKind::String(_) => {
            writeln!(out, "  if (r == NULL) return -1;")?;
            writeln!(out, "  printf (\"%s\\n\", r);")?;
            writeln!(out, "  free (r);")?;
            writeln!(out, "  return 0;")?;
        }
        ReturnKind::StringList(_) => {
            writeln!(out, "  if (r == NULL) return -1;")?;
            writeln!(out, "  print_strings (r);")?;
            writeln!(out, "  free_strings (r);")?;
            writeln!(out, "  return 0;")?;
        }
        ReturnKind::IntBool(_, _) => {
            writeln!(out, "  if (r == NULL) return -1;")?;
            writeln!(
                out,
                "  printf (\"%d, %s\\n\", r->i, r->b ? \"true\" : \"false\");"
            )?;
            writeln!(out, "  guestfs_free_int_bool (r);")?;
            writeln!(out, "  return 0;")?;
        }
        ReturnKind::PvList(_) => {
            writeln!(out, "  if (r == NULL) return -1;")?;
            writeln!(out, "  print_pv_list (r);")?;
            writeln!(out, "  guestfs_free_lvm_pv_list (r);")?;
            writeln!(out, "  return 0;")?;
        }
        ReturnKind::VgList(_) => {
            writeln!(out, "  if (r == NULL) return -1;")?;
            writeln!(out, "  print_vg_list (r);")?;
            writeln!(out, "  guestfs_free_lvm_vg_list (r);")?;
            writeln!(out, "  return 0;")?;
        }
        ReturnKind::LvList(_) => {
            writeln!(out, "  if (r == NULL) return -1;")?;
            writeln!(out, "  print_lv_list (r);")?;
            writeln!(out, "  guestfs_free_lvm_lv_list (r);")?;
            writeln!(out, "  return 0;")?;
        }
    }
    Ok(())
}

fn emit_run_action(out: &mut String, model: &Model) -> Result<(), EmitError> {
    writeln!(out, "int run_action (const char *cmd, int argc, char *argv[])")?;
    writeln!(out, "{{")?;
    for call in fish_calls(model) {
        writeln!(out, "  if ({})", match_condition(call))?;
        writeln!(out, "    return run_{} (cmd, argc, argv);", call.name)?;
        writeln!(out, "  else")?;
    }
    writeln!(out, "    {{")?;
    writeln!(out, "      fprintf (stderr, \"%s: unknown command\\n\", cmd);")?;
    writeln!(out, "      return -1;")?;
    writeln!(out, "    }}")?;
    writeln!(out, "}}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::api_model;

    #[test]
    fn test_command_table_is_alphabetical_and_hyphenated() {
        let c = generate_fish_cmds(&api_model()).unwrap();
        let table: Vec<&str> = c
            .lines()
            .filter(|l| l.starts_with("  printf (\"%-20s"))
            .collect();
        assert!(table.len() > 10);
        let mut sorted = table.clone();
        sorted.sort();
        assert_eq!(table, sorted);
        assert!(c.contains("  printf (\"%-20s %s\\n\", \"set-path\", \"set the search path\");"));
        assert!(!c.contains("  printf (\"%-20s %s\\n\", \"set_path\""));
    }

    #[test]
    fn test_not_in_fish_is_excluded() {
        let c = generate_fish_cmds(&api_model()).unwrap();
        assert!(!c.contains("wait_ready"));
        assert!(!c.contains("wait-ready"));
    }

    #[test]
    fn test_help_matches_name_hyphen_and_alias() {
        let c = generate_fish_cmds(&api_model()).unwrap();
        assert!(c.contains(
            "strcasecmp (cmd, \"set_path\") == 0 || strcasecmp (cmd, \"set-path\") == 0 || strcasecmp (cmd, \"path\") == 0"
        ));
    }

    #[test]
    fn test_help_rewrites_api_references() {
        let c = generate_fish_cmds(&api_model()).unwrap();
        // pvs references C<guestfs_pvs_full> which must lose its prefix.
        assert!(c.contains("C<pvs_full>"));
        assert!(!c.contains("C<guestfs_"));
    }

    #[test]
    fn test_bool_synopsis_placeholder() {
        let c = generate_fish_cmds(&api_model()).unwrap();
        assert!(c.contains(" set-autosync <true|false>"));
    }

    #[test]
    fn test_argument_coercions() {
        let c = generate_fish_cmds(&api_model()).unwrap();
        assert!(c.contains("  mode = atoi (argv[0]);"));
        assert!(c.contains("  autosync = is_true (argv[0]) ? 1 : 0;"));
        assert!(c.contains("  qemuvalue = strcmp (argv[1], \"\") != 0 ? argv[1] : NULL;"));
        assert!(c.contains("  device = argv[0];"));
    }

    #[test]
    fn test_argc_check_references_help() {
        let c = generate_fish_cmds(&api_model()).unwrap();
        assert!(c.contains("%s should have 2 parameter(s)"));
        assert!(c.contains("type 'help %s' for help on %s"));
    }

    #[test]
    fn test_fish_action_override() {
        let c = generate_fish_cmds(&api_model()).unwrap();
        // launch carries a shell-action flag, so its runner must not call
        // the library directly.
        assert!(c.contains("static int run_launch"));
        let runner = c.split("static int run_launch").nth(1).unwrap();
        let runner = &runner[..runner.find("\n}\n").unwrap()];
        assert!(runner.contains("  r = launch (g);"));
        assert!(!runner.contains("guestfs_launch"));
    }

    #[test]
    fn test_structured_list_printers() {
        let c = generate_fish_cmds(&api_model()).unwrap();
        assert!(c.contains("static void print_pv (struct guestfs_lvm_pv *pv)"));
        assert!(c.contains("  printf (\"pv_size: %\" PRIu64 \"\\n\", pv->pv_size);"));
        assert!(c.contains("    printf (\"snap_percent: %g %%\\n\", lv->snap_percent);"));
        assert!(c.contains("    printf (\"snap_percent: \\n\");"));
        assert!(c.contains("  print_pv_list (r);"));
        assert!(c.contains("  guestfs_free_lvm_pv_list (r);"));
    }

    #[test]
    fn test_unknown_command_diagnostic() {
        let c = generate_fish_cmds(&api_model()).unwrap();
        assert!(c.contains("%s: unknown command"));
    }

    #[test]
    fn test_uuid_printed_char_by_char() {
        let c = generate_fish_cmds(&api_model()).unwrap();
        assert!(c.contains("    printf (\"%c\", pv->pv_uuid[i]);"));
    }
}
