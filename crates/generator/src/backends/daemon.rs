//! Daemon-side backends
//!
//! Two artefacts: the `do_*` prototype header the daemon implements, and
//! the dispatch file containing one wire stub per daemon call, the
//! procedure switch, and the LVM field tokenizers with their
//! `parse_command_line_*` drivers.
//!
//! Stub discipline: decode the arguments (error reply on failure), invoke
//! `do_<name>`, and if the implementation returned its error marker it has
//! already sent an error reply, so the stub just cleans up.  Otherwise the
//! return value is packaged into the wire `_ret` struct and a success
//! reply is sent, after which pointer returns are freed.

use super::EmitError;
use crate::banner::{generated_by, CommentStyle, License};
use crate::model::{ArgKind, Call, ColKind, LvmKind, Model, ReturnKind};
use crate::signature::{c_signature, daemon_ret_type, SigFlavor};
use std::fmt::Write as _;

pub fn generate_daemon_actions_h(model: &Model) -> Result<String, EmitError> {
    let mut out = generated_by(CommentStyle::CStyle, License::GPLv2plus);

    for call in model.daemon_calls() {
        out.push_str(&c_signature(call, SigFlavor::DaemonStub));
    }

    Ok(out)
}

pub fn generate_daemon_stubs(model: &Model) -> Result<String, EmitError> {
    let mut out = generated_by(CommentStyle::CStyle, License::GPLv2plus);

    writeln!(out, "#include <stdio.h>")?;
    writeln!(out, "#include <stdlib.h>")?;
    writeln!(out, "#include <string.h>")?;
    writeln!(out, "#include <ctype.h>")?;
    writeln!(out, "#include <inttypes.h>")?;
    writeln!(out, "#include <rpc/types.h>")?;
    writeln!(out, "#include <rpc/xdr.h>")?;
    writeln!(out)?;
    writeln!(out, "#include \"daemon.h\"")?;
    writeln!(out, "#include \"../src/guestfs_protocol.h\"")?;
    writeln!(out, "#include \"actions.h\"")?;
    writeln!(out)?;

    for call in model.daemon_calls() {
        emit_stub(&mut out, call)?;
    }

    emit_dispatch(&mut out, model)?;

    for kind in LvmKind::ALL {
        emit_lvm_tokenizer(&mut out, kind)?;
        emit_lvm_driver(&mut out, kind)?;
    }

    Ok(out)
}

fn emit_stub(out: &mut String, call: &Call) -> Result<(), EmitError> {
    let n = &call.name;
    writeln!(out, "static void {}_stub (XDR *xdr_in)", n)?;
    writeln!(out, "{{")?;
    let ty = stub_local_type(call)?;
    if ty.ends_with('*') {
        writeln!(out, "  {}r;", ty)?;
    } else {
        writeln!(out, "  {} r;", ty)?;
    }
    if !call.args.is_empty() {
        writeln!(out, "  struct guestfs_{}_args args;", n)?;
        for arg in &call.args {
            match arg.kind {
                ArgKind::Str | ArgKind::OptStr => {
                    writeln!(out, "  const char *{};", arg.name)?
                }
                ArgKind::Bool | ArgKind::Int => writeln!(out, "  int {};", arg.name)?,
            }
        }
        writeln!(out)?;
        writeln!(out, "  memset (&args, 0, sizeof args);")?;
        writeln!(out)?;
        writeln!(out, "  if (!xdr_guestfs_{}_args (xdr_in, &args)) {{", n)?;
        writeln!(
            out,
            "    reply_with_error (\"%s: daemon failed to decode procedure arguments\", \"{}\");",
            n
        )?;
        writeln!(out, "    return;")?;
        writeln!(out, "  }}")?;
        for arg in &call.args {
            match arg.kind {
                ArgKind::Str | ArgKind::Bool | ArgKind::Int => {
                    writeln!(out, "  {a} = args.{a};", a = arg.name)?;
                }
                ArgKind::OptStr => {
                    writeln!(out, "  {a} = args.{a} ? *args.{a} : NULL;", a = arg.name)?;
                }
            }
        }
    }
    writeln!(out)?;

    let arg_names: Vec<&str> = call.args.iter().map(|a| a.name.as_str()).collect();
    writeln!(out, "  r = do_{} ({});", n, arg_names.join(", "))?;
    let marker = if call.ret.error_marker_is_int() {
        "r == -1"
    } else {
        "r == NULL"
    };
    writeln!(out, "  if ({})", marker)?;
    writeln!(out, "    /* do_{} has already called reply_with_error */", n)?;
    writeln!(out, "    goto done;")?;
    writeln!(out)?;

    emit_stub_reply(out, call)?;

    writeln!(out, "done:")?;
    if call.args.is_empty() {
        writeln!(out, "  return;")?;
    } else {
        writeln!(
            out,
            "  xdr_free ((xdrproc_t) xdr_guestfs_{}_args, (char *) &args);",
            n
        )?;
    }
    writeln!(out, "}}")?;
    writeln!(out)?;
    Ok(())
}

/// C type of the stub's local holding the `do_*` result.
fn stub_local_type(call: &Call) -> Result<String, EmitError> {
    match &call.ret {
        ReturnKind::ConstString(_) => Err(EmitError::Logic(format!(
            "{}: const-string daemon calls are rejected by the validator",
            call.name
        ))),
        _ => Ok(daemon_ret_type(call)),
    }
}

fn emit_stub_reply(out: &mut String, call: &Call) -> Result<(), EmitError> {
    let n = &call.name;
    match &call.ret {
        ReturnKind::Err => {
            writeln!(out, "  reply (NULL, NULL);")?;
        }
        ReturnKind::Int(f) | ReturnKind::Bool(f) => {
            writeln!(out, "  {{")?;
            writeln!(out, "    struct guestfs_{}_ret ret;", n)?;
            writeln!(out, "    ret.{} = r;", f)?;
            writeln!(
                out,
                "    reply ((xdrproc_t) xdr_guestfs_{}_ret, (char *) &ret);",
                n
            )?;
            writeln!(out, "  }}")?;
        }
        ReturnKind::ConstString(_) => {
            return Err(EmitError::Logic(format!(
                "{}: const-string daemon calls are rejected by the validator",
                call.name
            )))
        }
        ReturnKind::String(f) => {
            writeln!(out, "  {{")?;
            writeln!(out, "    struct guestfs_{}_ret ret;", n)?;
            writeln!(out, "    ret.{} = r;", f)?;
            writeln!(
                out,
                "    reply ((xdrproc_t) xdr_guestfs_{}_ret, (char *) &ret);",
                n
            )?;
            writeln!(out, "    free (r);")?;
            writeln!(out, "  }}")?;
        }
        ReturnKind::StringList(f) => {
            writeln!(out, "  {{")?;
            writeln!(out, "    struct guestfs_{}_ret ret;", n)?;
            writeln!(out, "    ret.{f}.{f}_len = count_strings (r);", f = f)?;
            writeln!(out, "    ret.{f}.{f}_val = r;", f = f)?;
            writeln!(
                out,
                "    reply ((xdrproc_t) xdr_guestfs_{}_ret, (char *) &ret);",
                n
            )?;
            writeln!(out, "    free_strings (r);")?;
            writeln!(out, "  }}")?;
        }
        ReturnKind::IntBool(_, _) => {
            writeln!(
                out,
                "  reply ((xdrproc_t) xdr_guestfs_{}_ret, (char *) r);",
                n
            )?;
            writeln!(
                out,
                "  xdr_free ((xdrproc_t) xdr_guestfs_{}_ret, (char *) r);",
                n
            )?;
            writeln!(out, "  free (r);")?;
        }
        ReturnKind::PvList(f) | ReturnKind::VgList(f) | ReturnKind::LvList(f) => {
            let k = lvm_kind_of_ret(&call.ret);
            writeln!(out, "  {{")?;
            writeln!(out, "    struct guestfs_{}_ret ret;", n)?;
            writeln!(out, "    ret.{} = *r;", f)?;
            writeln!(
                out,
                "    reply ((xdrproc_t) xdr_guestfs_{}_ret, (char *) &ret);",
                n
            )?;
            writeln!(
                out,
                "    xdr_free ((xdrproc_t) xdr_guestfs_lvm_int_{}_list, (char *) r);",
                k
            )?;
            writeln!(out, "    free (r);")?;
            writeln!(out, "  }}")?;
        }
    }
    Ok(())
}

fn lvm_kind_of_ret(ret: &ReturnKind) -> &'static str {
    match ret {
        ReturnKind::PvList(_) => "pv",
        ReturnKind::VgList(_) => "vg",
        ReturnKind::LvList(_) => "lv",
        _ => "",
    }
}

/// The procedure switch, in wire order.  Unknown numbers get an error
/// reply rather than silence so a newer client degrades loudly.
fn emit_dispatch(out: &mut String, model: &Model) -> Result<(), EmitError> {
    let mut daemon: Vec<&Call> = model.daemon_calls().collect();
    daemon.sort_by_key(|c| c.proc_number());

    writeln!(out, "void dispatch_incoming_message (XDR *xdr_in)")?;
    writeln!(out, "{{")?;
    writeln!(out, "  switch (proc_nr) {{")?;
    for call in daemon {
        writeln!(
            out,
            "    case GUESTFS_PROC_{}:",
            call.name.to_uppercase()
        )?;
        writeln!(out, "      {}_stub (xdr_in);", call.name)?;
        writeln!(out, "      break;")?;
    }
    writeln!(out, "    default:")?;
    writeln!(
        out,
        "      reply_with_error (\"dispatch_incoming_message: unknown procedure number %d\", proc_nr);"
    )?;
    writeln!(out, "  }}")?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    Ok(())
}

/// Tokenize one comma-separated `lvm` output line into a wire record.
/// Each failure case gets its own diagnostic so field drift in the lvm
/// output is attributable.
fn emit_lvm_tokenizer(out: &mut String, kind: LvmKind) -> Result<(), EmitError> {
    let k = kind.name();
    writeln!(
        out,
        "static int lvm_tokenize_{k} (char *str, guestfs_lvm_int_{k} *r)",
        k = k
    )?;
    writeln!(out, "{{")?;
    writeln!(out, "  char *tok, *p, *next;")?;
    writeln!(out, "  int i, j;")?;
    writeln!(out)?;
    writeln!(out, "  if (!str) {{")?;
    writeln!(
        out,
        "    fprintf (stderr, \"%s: failed: passed a NULL string\\n\", __func__);"
    )?;
    writeln!(out, "    return -1;")?;
    writeln!(out, "  }}")?;
    writeln!(out, "  if (!*str || isspace (*str)) {{")?;
    writeln!(
        out,
        "    fprintf (stderr, \"%s: failed: passed a empty string or one beginning with whitespace\\n\", __func__);"
    )?;
    writeln!(out, "    return -1;")?;
    writeln!(out, "  }}")?;
    writeln!(out, "  tok = str;")?;

    for (col, colkind) in kind.columns() {
        writeln!(out, "  if (!tok) {{")?;
        writeln!(
            out,
            "    fprintf (stderr, \"%s: failed: string finished early, around token %s\\n\", __func__, \"{}\");",
            col
        )?;
        writeln!(out, "    return -1;")?;
        writeln!(out, "  }}")?;
        writeln!(out, "  p = strchrnul (tok, ',');")?;
        writeln!(out, "  if (*p) next = p+1; else next = NULL;")?;
        writeln!(out, "  *p = '\\0';")?;
        match colkind {
            ColKind::Str => {
                writeln!(out, "  r->{} = strdup (tok);", col)?;
                writeln!(out, "  if (r->{} == NULL) {{", col)?;
                writeln!(out, "    perror (\"strdup\");")?;
                writeln!(out, "    return -1;")?;
                writeln!(out, "  }}")?;
            }
            ColKind::Uuid => {
                writeln!(out, "  for (i = j = 0; i < 32; ++j) {{")?;
                writeln!(out, "    if (tok[j] == '\\0') {{")?;
                writeln!(
                    out,
                    "      fprintf (stderr, \"%s: failed to parse UUID from '%s'\\n\", __func__, tok);"
                )?;
                writeln!(out, "      return -1;")?;
                writeln!(out, "    }} else if (tok[j] != '-')")?;
                writeln!(out, "      r->{}[i++] = tok[j];", col)?;
                writeln!(out, "  }}")?;
            }
            ColKind::Bytes => {
                writeln!(
                    out,
                    "  if (sscanf (tok, \"%\" SCNu64, &r->{}) != 1) {{",
                    col
                )?;
                writeln!(
                    out,
                    "    fprintf (stderr, \"%s: failed to parse size '%s' from token %s\\n\", __func__, tok, \"{}\");",
                    col
                )?;
                writeln!(out, "    return -1;")?;
                writeln!(out, "  }}")?;
            }
            ColKind::Int64 => {
                writeln!(
                    out,
                    "  if (sscanf (tok, \"%\" SCNi64, &r->{}) != 1) {{",
                    col
                )?;
                writeln!(
                    out,
                    "    fprintf (stderr, \"%s: failed to parse int '%s' from token %s\\n\", __func__, tok, \"{}\");",
                    col
                )?;
                writeln!(out, "    return -1;")?;
                writeln!(out, "  }}")?;
            }
            ColKind::OptPercent => {
                writeln!(out, "  if (tok[0] == '\\0')")?;
                writeln!(out, "    r->{} = -1;", col)?;
                writeln!(out, "  else if (sscanf (tok, \"%f\", &r->{}) != 1) {{", col)?;
                writeln!(
                    out,
                    "    fprintf (stderr, \"%s: failed to parse float '%s' from token %s\\n\", __func__, tok, \"{}\");",
                    col
                )?;
                writeln!(out, "    return -1;")?;
                writeln!(out, "  }}")?;
            }
        }
        writeln!(out, "  tok = next;")?;
    }

    writeln!(out, "  if (tok != NULL) {{")?;
    writeln!(
        out,
        "    fprintf (stderr, \"%s: failed: extra tokens at end of string\\n\", __func__);"
    )?;
    writeln!(out, "    return -1;")?;
    writeln!(out, "  }}")?;
    writeln!(out, "  return 0;")?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    Ok(())
}

/// Run the lvm tool and tokenize its output line by line, growing the
/// result list one slot per line.
fn emit_lvm_driver(out: &mut String, kind: LvmKind) -> Result<(), EmitError> {
    let k = kind.name();
    let cols: Vec<&str> = kind.columns().iter().map(|(n, _)| *n).collect();
    let list = format!("guestfs_lvm_int_{}_list", k);

    writeln!(out, "{} *", list)?;
    writeln!(out, "parse_command_line_{}s (void)", k)?;
    writeln!(out, "{{")?;
    writeln!(out, "  char *out, *err;")?;
    writeln!(out, "  char **lines;")?;
    writeln!(out, "  int i, r;")?;
    writeln!(out, "  {} *ret;", list)?;
    writeln!(out)?;
    writeln!(out, "  ret = malloc (sizeof *ret);")?;
    writeln!(out, "  if (!ret) {{")?;
    writeln!(out, "    reply_with_perror (\"malloc\");")?;
    writeln!(out, "    return NULL;")?;
    writeln!(out, "  }}")?;
    writeln!(out)?;
    writeln!(out, "  ret->{}_len = 0;", list)?;
    writeln!(out, "  ret->{}_val = NULL;", list)?;
    writeln!(out)?;
    writeln!(out, "  r = command (&out, &err,")?;
    writeln!(
        out,
        "               \"/sbin/lvm\", \"{}s\", \"--unbuffered\", \"--noheadings\",",
        k
    )?;
    writeln!(
        out,
        "               \"--nosuffix\", \"--separator\", \",\", \"--units\", \"b\", \"-o\","
    )?;
    writeln!(out, "               \"{}\", NULL);", cols.join(","))?;
    writeln!(out, "  if (r == -1) {{")?;
    writeln!(out, "    reply_with_error (\"%s\", err);")?;
    writeln!(out, "    free (out);")?;
    writeln!(out, "    free (err);")?;
    writeln!(out, "    free (ret);")?;
    writeln!(out, "    return NULL;")?;
    writeln!(out, "  }}")?;
    writeln!(out)?;
    writeln!(out, "  free (err);")?;
    writeln!(out)?;
    writeln!(out, "  lines = split_lines (out);")?;
    writeln!(out, "  free (out);")?;
    writeln!(out, "  if (lines == NULL) {{")?;
    writeln!(out, "    free (ret);")?;
    writeln!(out, "    return NULL;")?;
    writeln!(out, "  }}")?;
    writeln!(out)?;
    writeln!(out, "  for (i = 0; lines[i] != NULL; ++i) {{")?;
    writeln!(out, "    char *p = lines[i];")?;
    writeln!(out)?;
    writeln!(out, "    /* Skip any blank lines and trim the rest. */")?;
    writeln!(out, "    while (*p && isspace (*p)) p++;")?;
    writeln!(out, "    if (!*p) continue;")?;
    writeln!(out)?;
    writeln!(out, "    ret->{}_val =", list)?;
    writeln!(out, "      realloc (ret->{}_val,", list)?;
    writeln!(
        out,
        "               sizeof (guestfs_lvm_int_{}) * (ret->{}_len + 1));",
        k, list
    )?;
    writeln!(out, "    if (ret->{}_val == NULL) {{", list)?;
    writeln!(out, "      reply_with_perror (\"realloc\");")?;
    writeln!(out, "      free_strings (lines);")?;
    writeln!(out, "      free (ret);")?;
    writeln!(out, "      return NULL;")?;
    writeln!(out, "    }}")?;
    writeln!(out)?;
    writeln!(
        out,
        "    if (lvm_tokenize_{} (p, &ret->{}_val[ret->{}_len]) == -1) {{",
        k, list, list
    )?;
    writeln!(
        out,
        "      reply_with_error (\"failed to parse output of '{}s' command\");",
        k
    )?;
    writeln!(out, "      free_strings (lines);")?;
    writeln!(out, "      free (ret);")?;
    writeln!(out, "      return NULL;")?;
    writeln!(out, "    }}")?;
    writeln!(out)?;
    writeln!(out, "    ret->{}_len++;", list)?;
    writeln!(out, "  }}")?;
    writeln!(out)?;
    writeln!(out, "  free_strings (lines);")?;
    writeln!(out, "  return ret;")?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::api_model;

    #[test]
    fn test_daemon_header_only_daemon_calls() {
        let h = generate_daemon_actions_h(&api_model()).unwrap();
        assert!(h.contains("extern int do_mount (const char *device, const char *mountpoint);\n"));
        assert!(h.contains("extern char *do_cat (const char *path);\n"));
        assert!(!h.contains("do_launch"));
        assert!(!h.contains("do_set_path"));
    }

    #[test]
    fn test_daemon_header_wire_types_for_aggregates() {
        let h = generate_daemon_actions_h(&api_model()).unwrap();
        assert!(h.contains("extern guestfs_lvm_int_pv_list *do_pvs_full (void);\n"));
        assert!(h.contains("extern guestfs_aug_defnode_ret *do_aug_defnode (const char *name, const char *expr, const char *val);\n"));
    }

    #[test]
    fn test_stub_decode_failure_reply() {
        let s = generate_daemon_stubs(&api_model()).unwrap();
        assert!(s.contains("if (!xdr_guestfs_touch_args (xdr_in, &args)) {"));
        assert!(s.contains(
            "reply_with_error (\"%s: daemon failed to decode procedure arguments\", \"touch\");"
        ));
    }

    #[test]
    fn test_stub_error_marker_suppresses_reply() {
        let s = generate_daemon_stubs(&api_model()).unwrap();
        assert!(s.contains("  r = do_touch (path);"));
        assert!(s.contains("    /* do_touch has already called reply_with_error */"));
        assert!(s.contains("  if (r == NULL)\n    /* do_cat has already called reply_with_error */"));
    }

    #[test]
    fn test_dispatch_switch_covers_touch() {
        let s = generate_daemon_stubs(&api_model()).unwrap();
        assert!(s.contains("    case GUESTFS_PROC_TOUCH:\n      touch_stub (xdr_in);\n      break;\n"));
        assert!(s.contains("unknown procedure number %d"));
    }

    #[test]
    fn test_string_list_reply_counts_and_frees() {
        let s = generate_daemon_stubs(&api_model()).unwrap();
        assert!(s.contains("    ret.listing.listing_len = count_strings (r);"));
        assert!(s.contains("    free_strings (r);"));
    }

    #[test]
    fn test_lvm_list_reply_uses_wire_free_routine() {
        let s = generate_daemon_stubs(&api_model()).unwrap();
        assert!(s.contains("    ret.physvols = *r;"));
        assert!(s.contains("    xdr_free ((xdrproc_t) xdr_guestfs_lvm_int_pv_list, (char *) r);"));
    }

    #[test]
    fn test_tokenizer_diagnostics_are_distinct() {
        let s = generate_daemon_stubs(&api_model()).unwrap();
        assert!(s.contains("passed a NULL string"));
        assert!(s.contains("passed a empty string or one beginning with whitespace"));
        assert!(s.contains("string finished early, around token %s"));
        assert!(s.contains("failed to parse size '%s' from token %s"));
        assert!(s.contains("extra tokens at end of string"));
    }

    #[test]
    fn test_uuid_tokenizer_skips_dashes() {
        let s = generate_daemon_stubs(&api_model()).unwrap();
        assert!(s.contains("    } else if (tok[j] != '-')\n      r->pv_uuid[i++] = tok[j];"));
    }

    #[test]
    fn test_lvm_driver_invocation() {
        let s = generate_daemon_stubs(&api_model()).unwrap();
        assert!(s.contains("\"/sbin/lvm\", \"pvs\", \"--unbuffered\", \"--noheadings\","));
        assert!(s.contains("\"--nosuffix\", \"--separator\", \",\", \"--units\", \"b\", \"-o\","));
        assert!(s.contains("\"pv_name,pv_uuid,pv_fmt,pv_size,dev_size,pv_free,pv_used,pv_attr,pv_pe_count,pv_pe_alloc_count,pv_tags,pe_start,pv_mda_count,pv_mda_free\", NULL);"));
        assert!(s.contains("parse_command_line_lvs (void)"));
    }

    #[test]
    fn test_opt_percent_empty_token_is_sentinel() {
        let s = generate_daemon_stubs(&api_model()).unwrap();
        assert!(s.contains("  if (tok[0] == '\\0')\n    r->snap_percent = -1;"));
    }
}
