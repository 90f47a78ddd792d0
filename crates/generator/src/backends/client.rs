//! Client action implementation backend
//!
//! For every daemon call this emits a reply-vessel struct, the reply
//! callback that parses the answer and quits the event loop, and the
//! public blocking stub.  Client-only calls are hand-written in the
//! library proper and do not appear here.
//!
//! Ownership rules inscribed into the output: plain string returns pass
//! straight through to the caller; string lists are reallocated one slot
//! larger so a terminating NULL can be appended; aggregate returns are
//! duplicated into fresh heap storage the caller frees with the matching
//! free routine.

use super::EmitError;
use crate::banner::{generated_by, CommentStyle, License};
use crate::model::{ArgKind, Call, Model, ReturnKind};
use crate::signature::{c_signature, SigFlavor};
use std::fmt::Write as _;

pub fn generate_client_actions(model: &Model) -> Result<String, EmitError> {
    let mut out = generated_by(CommentStyle::CStyle, License::LGPLv2plus);

    writeln!(out, "#include <stdio.h>")?;
    writeln!(out, "#include <stdlib.h>")?;
    writeln!(out, "#include <string.h>")?;
    writeln!(out)?;
    writeln!(out, "#include \"guestfs.h\"")?;
    writeln!(out, "#include \"guestfs_protocol.h\"")?;
    writeln!(out)?;
    writeln!(out, "#define error guestfs_error")?;
    writeln!(out, "#define perrorf guestfs_perrorf")?;
    writeln!(out, "#define safe_malloc guestfs_safe_malloc")?;
    writeln!(out, "#define safe_realloc guestfs_safe_realloc")?;
    writeln!(out, "#define safe_strdup guestfs_safe_strdup")?;
    writeln!(out, "#define safe_memdup guestfs_safe_memdup")?;
    writeln!(out)?;

    emit_check_reply_header(&mut out)?;
    emit_check_state(&mut out)?;

    for call in model.daemon_calls() {
        emit_reply_vessel(&mut out, call)?;
        emit_reply_callback(&mut out, call)?;
        emit_public_stub(&mut out, call)?;
    }

    Ok(out)
}

/// Shared helper: verify the reply header matches the call we made.
fn emit_check_reply_header(out: &mut String) -> Result<(), EmitError> {
    writeln!(out, "/* Check the return message from a call for validity. */")?;
    writeln!(out, "static int")?;
    writeln!(out, "check_reply_header (guestfs_h *g,")?;
    writeln!(out, "                    const struct guestfs_message_header *hdr,")?;
    writeln!(out, "                    int proc_nr, int serial)")?;
    writeln!(out, "{{")?;
    writeln!(out, "  if (hdr->prog != GUESTFS_PROGRAM) {{")?;
    writeln!(out, "    error (g, \"wrong program (%d/%d)\", hdr->prog, GUESTFS_PROGRAM);")?;
    writeln!(out, "    return -1;")?;
    writeln!(out, "  }}")?;
    writeln!(out, "  if (hdr->vers != GUESTFS_PROTOCOL_VERSION) {{")?;
    writeln!(
        out,
        "    error (g, \"wrong protocol version (%d/%d)\", hdr->vers, GUESTFS_PROTOCOL_VERSION);"
    )?;
    writeln!(out, "    return -1;")?;
    writeln!(out, "  }}")?;
    writeln!(out, "  if (hdr->direction != GUESTFS_DIRECTION_REPLY) {{")?;
    writeln!(out, "    error (g, \"unexpected message direction (%d)\", hdr->direction);")?;
    writeln!(out, "    return -1;")?;
    writeln!(out, "  }}")?;
    writeln!(out, "  if (hdr->proc != proc_nr) {{")?;
    writeln!(out, "    error (g, \"unexpected procedure number (%d/%d)\", hdr->proc, proc_nr);")?;
    writeln!(out, "    return -1;")?;
    writeln!(out, "  }}")?;
    writeln!(out, "  if (hdr->serial != serial) {{")?;
    writeln!(out, "    error (g, \"unexpected serial (%d/%d)\", hdr->serial, serial);")?;
    writeln!(out, "    return -1;")?;
    writeln!(out, "  }}")?;
    writeln!(out, "  return 0;")?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    Ok(())
}

/// Shared helper: refuse to run unless the handle is in the ready state.
fn emit_check_state(out: &mut String) -> Result<(), EmitError> {
    writeln!(out, "/* Check we are in the right state to run a command. */")?;
    writeln!(out, "static int")?;
    writeln!(out, "check_state (guestfs_h *g, const char *caller)")?;
    writeln!(out, "{{")?;
    writeln!(out, "  if (!guestfs_is_ready (g)) {{")?;
    writeln!(out, "    if (guestfs_is_config (g))")?;
    writeln!(
        out,
        "      error (g, \"%s: call launch() before using this function\", caller);"
    )?;
    writeln!(out, "    else if (guestfs_is_launching (g))")?;
    writeln!(
        out,
        "      error (g, \"%s: call wait_ready() before using this function\", caller);"
    )?;
    writeln!(out, "    else")?;
    writeln!(
        out,
        "      error (g, \"%s called from the wrong state, %d\", caller, guestfs_get_state (g));"
    )?;
    writeln!(out, "    return -1;")?;
    writeln!(out, "  }}")?;
    writeln!(out, "  return 0;")?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    Ok(())
}

/// The struct the reply callback fills in for the blocking stub.
fn emit_reply_vessel(out: &mut String, call: &Call) -> Result<(), EmitError> {
    writeln!(out, "struct {}_rv {{", call.name)?;
    writeln!(out, "  int cb_done;  /* flag to indicate callback was called */")?;
    writeln!(out, "  struct guestfs_message_header hdr;")?;
    writeln!(out, "  struct guestfs_message_error err;")?;
    match &call.ret {
        ReturnKind::Err => writeln!(out, "  /* no return value */")?,
        ReturnKind::ConstString(_) => {
            return Err(EmitError::Logic(format!(
                "{}: const-string daemon calls are rejected by the validator",
                call.name
            )))
        }
        _ => writeln!(out, "  struct guestfs_{}_ret ret;", call.name)?,
    }
    writeln!(out, "}};")?;
    writeln!(out)?;
    Ok(())
}

fn emit_reply_callback(out: &mut String, call: &Call) -> Result<(), EmitError> {
    let n = &call.name;
    writeln!(out, "static void {}_cb (guestfs_h *g, void *data, XDR *xdr)", n)?;
    writeln!(out, "{{")?;
    writeln!(out, "  guestfs_main_loop *ml = guestfs_get_main_loop (g);")?;
    writeln!(out, "  struct {n}_rv *rv = (struct {n}_rv *) data;", n = n)?;
    writeln!(out)?;
    writeln!(out, "  if (!xdr_guestfs_message_header (xdr, &rv->hdr)) {{")?;
    writeln!(
        out,
        "    error (g, \"%s: failed to parse reply header\", \"guestfs_{}\");",
        n
    )?;
    writeln!(out, "    return;")?;
    writeln!(out, "  }}")?;
    writeln!(out, "  if (rv->hdr.status == GUESTFS_STATUS_ERROR) {{")?;
    writeln!(out, "    if (!xdr_guestfs_message_error (xdr, &rv->err)) {{")?;
    writeln!(
        out,
        "      error (g, \"%s: failed to parse reply error\", \"guestfs_{}\");",
        n
    )?;
    writeln!(out, "      return;")?;
    writeln!(out, "    }}")?;
    writeln!(out, "    goto done;")?;
    writeln!(out, "  }}")?;
    if !matches!(call.ret, ReturnKind::Err) {
        writeln!(out, "  if (!xdr_guestfs_{}_ret (xdr, &rv->ret)) {{", n)?;
        writeln!(
            out,
            "    error (g, \"%s: failed to parse reply\", \"guestfs_{}\");",
            n
        )?;
        writeln!(out, "    return;")?;
        writeln!(out, "  }}")?;
    }
    writeln!(out, " done:")?;
    writeln!(out, "  rv->cb_done = 1;")?;
    writeln!(out, "  ml->main_loop_quit (ml, g);")?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    Ok(())
}

/// The error marker proper to a call's return kind: `-1` or `NULL`.
fn error_marker(ret: &ReturnKind) -> &'static str {
    if ret.error_marker_is_int() {
        "-1"
    } else {
        "NULL"
    }
}

fn emit_public_stub(out: &mut String, call: &Call) -> Result<(), EmitError> {
    let n = &call.name;
    let marker = error_marker(&call.ret);
    let proc = format!("GUESTFS_PROC_{}", n.to_uppercase());

    out.push_str(&c_signature(call, SigFlavor::CDefinition));
    writeln!(out, "{{")?;
    if !call.args.is_empty() {
        writeln!(out, "  struct guestfs_{}_args args;", n)?;
    }
    writeln!(out, "  struct {}_rv rv;", n)?;
    writeln!(out, "  guestfs_main_loop *ml = guestfs_get_main_loop (g);")?;
    writeln!(out, "  int serial;")?;
    writeln!(out)?;
    writeln!(
        out,
        "  if (check_state (g, \"guestfs_{}\") == -1) return {};",
        n, marker
    )?;
    writeln!(out)?;
    writeln!(out, "  memset (&rv, 0, sizeof rv);")?;
    writeln!(out)?;

    // Materialise the arguments into the wire struct.
    for arg in &call.args {
        match arg.kind {
            ArgKind::Str => {
                writeln!(out, "  args.{a} = (char *) {a};", a = arg.name)?;
            }
            ArgKind::OptStr => {
                writeln!(
                    out,
                    "  args.{a} = {a} ? (char **) &{a} : NULL;",
                    a = arg.name
                )?;
            }
            ArgKind::Bool | ArgKind::Int => {
                writeln!(out, "  args.{a} = {a};", a = arg.name)?;
            }
        }
    }
    if call.args.is_empty() {
        writeln!(out, "  serial = guestfs__send_sync (g, {}, NULL, NULL);", proc)?;
    } else {
        writeln!(out, "  serial = guestfs__send_sync (g, {},", proc)?;
        writeln!(
            out,
            "                               (xdrproc_t) xdr_guestfs_{}_args, (char *) &args);",
            n
        )?;
    }
    writeln!(out, "  if (serial == -1)")?;
    writeln!(out, "    return {};", marker)?;
    writeln!(out)?;
    writeln!(out, "  rv.cb_done = 0;")?;
    writeln!(out, "  guestfs_set_reply_callback (g, {}_cb, &rv);", n)?;
    writeln!(out, "  (void) ml->main_loop_run (ml, g);")?;
    writeln!(out, "  guestfs_set_reply_callback (g, NULL, NULL);")?;
    writeln!(out, "  if (!rv.cb_done) {{")?;
    writeln!(
        out,
        "    error (g, \"guestfs_{} failed, see earlier error messages\");",
        n
    )?;
    writeln!(out, "    return {};", marker)?;
    writeln!(out, "  }}")?;
    writeln!(out)?;
    writeln!(
        out,
        "  if (check_reply_header (g, &rv.hdr, {}, serial) == -1)",
        proc
    )?;
    writeln!(out, "    return {};", marker)?;
    writeln!(out)?;
    writeln!(out, "  if (rv.hdr.status == GUESTFS_STATUS_ERROR) {{")?;
    writeln!(out, "    error (g, \"%s\", rv.err.error);")?;
    writeln!(out, "    return {};", marker)?;
    writeln!(out, "  }}")?;
    writeln!(out)?;

    emit_return_value(out, call)?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    Ok(())
}

fn emit_return_value(out: &mut String, call: &Call) -> Result<(), EmitError> {
    match &call.ret {
        ReturnKind::Err => writeln!(out, "  return 0;")?,
        ReturnKind::Int(f) | ReturnKind::Bool(f) => {
            writeln!(out, "  return rv.ret.{};", f)?;
        }
        ReturnKind::ConstString(_) => {
            return Err(EmitError::Logic(format!(
                "{}: const-string daemon calls are rejected by the validator",
                call.name
            )))
        }
        ReturnKind::String(f) => {
            writeln!(out, "  return rv.ret.{}; /* caller will free */", f)?;
        }
        ReturnKind::StringList(f) => {
            writeln!(out, "  /* caller will free this, but we need to add a NULL entry */")?;
            writeln!(out, "  rv.ret.{f}.{f}_val =", f = f)?;
            writeln!(out, "    safe_realloc (g, rv.ret.{f}.{f}_val,", f = f)?;
            writeln!(
                out,
                "                  sizeof (char *) * (rv.ret.{f}.{f}_len + 1));",
                f = f
            )?;
            writeln!(out, "  rv.ret.{f}.{f}_val[rv.ret.{f}.{f}_len] = NULL;", f = f)?;
            writeln!(out, "  return rv.ret.{f}.{f}_val;", f = f)?;
        }
        ReturnKind::IntBool(_, _) => {
            writeln!(out, "  /* caller will free this */")?;
            writeln!(out, "  return safe_memdup (g, &rv.ret, sizeof (rv.ret));")?;
        }
        ReturnKind::PvList(f) | ReturnKind::VgList(f) | ReturnKind::LvList(f) => {
            writeln!(out, "  /* caller will free this */")?;
            writeln!(
                out,
                "  return safe_memdup (g, &rv.ret.{f}, sizeof (rv.ret.{f}));",
                f = f
            )?;
        }
    }
    Ok(())
}
