//! OCaml binding backend
//!
//! Three artefacts: the typed interface, the implementation module (all
//! `external` declarations plus exception registration), and the C glue
//! that marshals between the OCaml runtime and the client API.
//!
//! Glue discipline per call: copy the arguments out of the OCaml heap,
//! release the runtime lock around the blocking library call, re-acquire
//! it, raise [Error] on failure, then build the typed result.  List
//! returns are freed after copying; structured returns are deep-copied
//! into OCaml records and freed with their matching free routine.

use super::EmitError;
use crate::banner::{generated_by, CommentStyle, License};
use crate::model::{ArgKind, Call, ColKind, LvmKind, Model, ReturnKind};
use crate::signature::ocaml_function_type;
use std::fmt::Write as _;

pub fn generate_ocaml_mli(model: &Model) -> Result<String, EmitError> {
    let mut out = generated_by(CommentStyle::OCamlStyle, License::LGPLv2plus);

    writeln!(out, "type t")?;
    writeln!(out, "(** A [guestfs_h] handle. *)")?;
    writeln!(out)?;
    writeln!(out, "exception Error of string")?;
    writeln!(out, "(** This exception is raised when there is an error. *)")?;
    writeln!(out)?;
    writeln!(out, "val create : unit -> t")?;
    writeln!(out)?;
    writeln!(out, "val close : t -> unit")?;
    writeln!(out, "(** Handles are closed by the garbage collector when they become")?;
    writeln!(out, "    unreferenced, but callers can call this in order to provide")?;
    writeln!(out, "    predictable cleanup. *)")?;
    writeln!(out)?;

    for kind in LvmKind::ALL {
        for line in record_type_lines(kind) {
            writeln!(out, "{}", line)?;
        }
        writeln!(out)?;
    }

    for call in &model.calls {
        writeln!(out, "val {} : {}", call.name, ocaml_function_type(call))?;
        writeln!(out, "(** {} *)", call.shortdesc)?;
        writeln!(out)?;
    }

    Ok(out)
}

pub fn generate_ocaml_ml(model: &Model) -> Result<String, EmitError> {
    let mut out = generated_by(CommentStyle::OCamlStyle, License::LGPLv2plus);

    writeln!(out, "type t")?;
    writeln!(out)?;
    writeln!(out, "exception Error of string")?;
    writeln!(out)?;
    writeln!(out, "external create : unit -> t = \"ocaml_guestfs_create\"")?;
    writeln!(out, "external close : t -> unit = \"ocaml_guestfs_close\"")?;
    writeln!(out)?;

    for kind in LvmKind::ALL {
        for line in record_type_lines(kind) {
            writeln!(out, "{}", line)?;
        }
        writeln!(out)?;
    }

    for call in &model.calls {
        writeln!(
            out,
            "external {} : {} = \"ocaml_guestfs_{}\"",
            call.name,
            ocaml_function_type(call),
            call.name
        )?;
    }
    writeln!(out)?;

    writeln!(out, "(* Run it at module initialization time so the C glue can")?;
    writeln!(out, "   find the exception by name. *)")?;
    writeln!(out, "let () =")?;
    writeln!(out, "  Callback.register_exception \"ocaml_guestfs_error\" (Error \"\")")?;

    Ok(out)
}

/// The OCaml record declaration of one LVM kind, shared by .mli and .ml.
fn record_type_lines(kind: LvmKind) -> Vec<String> {
    let mut lines = vec![format!("type lvm_{} = {{", kind.name())];
    for (name, col) in kind.columns() {
        let ty = match col {
            ColKind::Str | ColKind::Uuid => "string",
            ColKind::Bytes | ColKind::Int64 => "int64",
            ColKind::OptPercent => "float",
        };
        lines.push(format!("  {} : {};", name, ty));
    }
    lines.push("}".to_string());
    lines
}

pub fn generate_ocaml_c(model: &Model) -> Result<String, EmitError> {
    let mut out = generated_by(CommentStyle::CStyle, License::LGPLv2plus);

    writeln!(out, "#include <stdio.h>")?;
    writeln!(out, "#include <stdlib.h>")?;
    writeln!(out, "#include <string.h>")?;
    writeln!(out)?;
    writeln!(out, "#include <caml/config.h>")?;
    writeln!(out, "#include <caml/alloc.h>")?;
    writeln!(out, "#include <caml/callback.h>")?;
    writeln!(out, "#include <caml/fail.h>")?;
    writeln!(out, "#include <caml/memory.h>")?;
    writeln!(out, "#include <caml/mlvalues.h>")?;
    writeln!(out, "#include <caml/signals.h>")?;
    writeln!(out)?;
    writeln!(out, "#include <guestfs.h>")?;
    writeln!(out)?;
    writeln!(out, "#include \"guestfs_c.h\"")?;
    writeln!(out)?;

    emit_copy_helpers(&mut out)?;

    for call in &model.calls {
        emit_glue(&mut out, call)?;
    }

    Ok(out)
}

/// Deep-copy helpers turning C structs into OCaml records and arrays.
fn emit_copy_helpers(out: &mut String) -> Result<(), EmitError> {
    writeln!(out, "/* Copy a 32 byte UUID into an OCaml string. */")?;
    writeln!(out, "static value")?;
    writeln!(out, "copy_uuid (const char *uuid)")?;
    writeln!(out, "{{")?;
    writeln!(out, "  value rv = caml_alloc_string (32);")?;
    writeln!(out, "  memcpy (Bytes_val (rv), uuid, 32);")?;
    writeln!(out, "  return rv;")?;
    writeln!(out, "}}")?;
    writeln!(out)?;

    for kind in LvmKind::ALL {
        let k = kind.name();
        writeln!(out, "static value")?;
        writeln!(out, "copy_lvm_{k} (const struct guestfs_lvm_{k} *{k})", k = k)?;
        writeln!(out, "{{")?;
        writeln!(out, "  CAMLparam0 ();")?;
        writeln!(out, "  CAMLlocal2 (rv, v);")?;
        writeln!(out)?;
        writeln!(out, "  rv = caml_alloc ({}, 0);", kind.columns().len())?;
        for (i, (col, colkind)) in kind.columns().iter().enumerate() {
            match colkind {
                ColKind::Str => {
                    writeln!(out, "  v = caml_copy_string ({}->{});", k, col)?
                }
                ColKind::Uuid => writeln!(out, "  v = copy_uuid ({}->{});", k, col)?,
                ColKind::Bytes | ColKind::Int64 => {
                    writeln!(out, "  v = caml_copy_int64 ({}->{});", k, col)?
                }
                ColKind::OptPercent => {
                    writeln!(out, "  v = caml_copy_double ({}->{});", k, col)?
                }
            }
            writeln!(out, "  Store_field (rv, {}, v);", i)?;
        }
        writeln!(out, "  CAMLreturn (rv);")?;
        writeln!(out, "}}")?;
        writeln!(out)?;

        writeln!(out, "static value")?;
        writeln!(
            out,
            "copy_lvm_{k}_list (const struct guestfs_lvm_{k}_list *{k}s)",
            k = k
        )?;
        writeln!(out, "{{")?;
        writeln!(out, "  CAMLparam0 ();")?;
        writeln!(out, "  CAMLlocal2 (rv, v);")?;
        writeln!(out, "  unsigned int i;")?;
        writeln!(out)?;
        writeln!(out, "  if ({}s->len == 0)", k)?;
        writeln!(out, "    CAMLreturn (Atom (0));")?;
        writeln!(out, "  rv = caml_alloc ({}s->len, 0);", k)?;
        writeln!(out, "  for (i = 0; i < {}s->len; ++i) {{", k)?;
        writeln!(out, "    v = copy_lvm_{k} (&{k}s->val[i]);", k = k)?;
        writeln!(out, "    Store_field (rv, i, v);")?;
        writeln!(out, "  }}")?;
        writeln!(out, "  CAMLreturn (rv);")?;
        writeln!(out, "}}")?;
        writeln!(out)?;
    }
    Ok(())
}

/// C result type and error test for one return kind.
fn glue_result(ret: &ReturnKind) -> (&'static str, &'static str) {
    match ret {
        ReturnKind::Err | ReturnKind::Int(_) | ReturnKind::Bool(_) => ("int r;", "r == -1"),
        ReturnKind::ConstString(_) => ("const char *r;", "r == NULL"),
        ReturnKind::String(_) => ("char *r;", "r == NULL"),
        ReturnKind::StringList(_) => ("char **r;", "r == NULL"),
        ReturnKind::IntBool(_, _) => ("struct guestfs_int_bool *r;", "r == NULL"),
        ReturnKind::PvList(_) => ("struct guestfs_lvm_pv_list *r;", "r == NULL"),
        ReturnKind::VgList(_) => ("struct guestfs_lvm_vg_list *r;", "r == NULL"),
        ReturnKind::LvList(_) => ("struct guestfs_lvm_lv_list *r;", "r == NULL"),
    }
}

fn emit_glue(out: &mut String, call: &Call) -> Result<(), EmitError> {
    let n = &call.name;

    writeln!(out, "CAMLprim value")?;
    let params: Vec<String> = std::iter::once("value gv".to_string())
        .chain(call.args.iter().map(|a| format!("value {}v", a.name)))
        .collect();
    writeln!(out, "ocaml_guestfs_{} ({})", n, params.join(", "))?;
    writeln!(out, "{{")?;
    let regs: Vec<String> = std::iter::once("gv".to_string())
        .chain(call.args.iter().map(|a| format!("{}v", a.name)))
        .collect();
    writeln!(out, "  CAMLparam{} ({});", regs.len(), regs.join(", "))?;
    writeln!(out, "  CAMLlocal1 (rv);")?;
    writeln!(out)?;
    writeln!(out, "  guestfs_h *g = Guestfs_val (gv);")?;
    writeln!(out, "  if (g == NULL)")?;
    writeln!(out, "    caml_failwith (\"{}: used handle after closing it\");", n)?;
    writeln!(out)?;

    // Copy arguments out of the OCaml heap: the GC may move them once the
    // runtime lock is released.
    for arg in &call.args {
        match arg.kind {
            ArgKind::Str => writeln!(
                out,
                "  char *{a} = guestfs_safe_strdup (g, String_val ({a}v));",
                a = arg.name
            )?,
            ArgKind::OptStr => {
                writeln!(out, "  char *{a} =", a = arg.name)?;
                writeln!(
                    out,
                    "    {a}v != Val_int (0) ? guestfs_safe_strdup (g, String_val (Field ({a}v, 0))) : NULL;",
                    a = arg.name
                )?;
            }
            ArgKind::Bool => writeln!(
                out,
                "  int {a} = Bool_val ({a}v);",
                a = arg.name
            )?,
            ArgKind::Int => writeln!(
                out,
                "  int {a} = Int_val ({a}v);",
                a = arg.name
            )?,
        }
    }

    let (decl, failed) = glue_result(&call.ret);
    writeln!(out, "  {}", decl)?;
    if matches!(call.ret, ReturnKind::StringList(_)) {
        writeln!(out, "  int i;")?;
    }
    writeln!(out)?;
    writeln!(out, "  caml_enter_blocking_section ();")?;
    let mut invocation = format!("guestfs_{} (g", n);
    for arg in &call.args {
        let _ = write!(invocation, ", {}", arg.name);
    }
    invocation.push(')');
    writeln!(out, "  r = {};", invocation)?;
    writeln!(out, "  caml_leave_blocking_section ();")?;
    for arg in &call.args {
        if matches!(arg.kind, ArgKind::Str | ArgKind::OptStr) {
            writeln!(out, "  free ({});", arg.name)?;
        }
    }
    writeln!(out, "  if ({})", failed)?;
    writeln!(out, "    ocaml_guestfs_raise_error (g, \"{}\");", n)?;
    writeln!(out)?;

    match &call.ret {
        ReturnKind::Err => writeln!(out, "  rv = Val_unit;")?,
        ReturnKind::Int(_) => writeln!(out, "  rv = Val_int (r);")?,
        ReturnKind::Bool(_) => writeln!(out, "  rv = Val_bool (r);")?,
        ReturnKind::ConstString(_) => writeln!(out, "  rv = caml_copy_string (r);")?,
        ReturnKind::String(_) => {
            writeln!(out, "  rv = caml_copy_string (r);")?;
            writeln!(out, "  free (r);")?;
        }
        ReturnKind::StringList(_) => {
            writeln!(out, "  rv = caml_copy_string_array ((const char **) r);")?;
            writeln!(out, "  for (i = 0; r[i] != NULL; ++i) free (r[i]);")?;
            writeln!(out, "  free (r);")?;
        }
        ReturnKind::IntBool(_, _) => {
            writeln!(out, "  rv = caml_alloc (2, 0);")?;
            writeln!(out, "  Store_field (rv, 0, Val_int (r->i));")?;
            writeln!(out, "  Store_field (rv, 1, Val_bool (r->b));")?;
            writeln!(out, "  guestfs_free_int_bool (r);")?;
        }
        ReturnKind::PvList(_) => {
            writeln!(out, "  rv = copy_lvm_pv_list (r);")?;
            writeln!(out, "  guestfs_free_lvm_pv_list (r);")?;
        }
        ReturnKind::VgList(_) => {
            writeln!(out, "  rv = copy_lvm_vg_list (r);")?;
            writeln!(out, "  guestfs_free_lvm_vg_list (r);")?;
        }
        ReturnKind::LvList(_) => {
            writeln!(out, "  rv = copy_lvm_lv_list (r);")?;
            writeln!(out, "  guestfs_free_lvm_lv_list (r);")?;
        }
    }
    writeln!(out, "  CAMLreturn (rv);")?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::api_model;

    #[test]
    fn test_mli_declares_every_call() {
        let model = api_model();
        let mli = generate_ocaml_mli(&model).unwrap();
        for call in &model.calls {
            assert!(
                mli.contains(&format!("val {} : ", call.name)),
                "missing val for {}",
                call.name
            );
        }
        assert!(mli.contains("val mount : t -> string -> string -> unit"));
        assert!(mli.contains("val aug_defvar : t -> string -> string option -> int"));
        assert!(mli.contains("val aug_defnode : t -> string -> string -> string -> int * bool"));
        assert!(mli.contains("val pvs_full : t -> lvm_pv array"));
    }

    #[test]
    fn test_mli_record_types() {
        let mli = generate_ocaml_mli(&api_model()).unwrap();
        assert!(mli.contains("type lvm_pv = {\n  pv_name : string;\n  pv_uuid : string;\n"));
        assert!(mli.contains("  pv_size : int64;\n"));
        assert!(mli.contains("  snap_percent : float;\n"));
    }

    #[test]
    fn test_ml_externals_and_exception() {
        let ml = generate_ocaml_ml(&api_model()).unwrap();
        assert!(ml.contains(
            "external mount : t -> string -> string -> unit = \"ocaml_guestfs_mount\""
        ));
        assert!(ml.contains("Callback.register_exception \"ocaml_guestfs_error\" (Error \"\")"));
        assert!(ml.contains("external create : unit -> t = \"ocaml_guestfs_create\""));
    }

    #[test]
    fn test_glue_releases_runtime_around_call() {
        let c = generate_ocaml_c(&api_model()).unwrap();
        let mount = c.split("ocaml_guestfs_mount ").nth(1).unwrap();
        let mount = &mount[..mount.find("\n}\n").unwrap()];
        assert!(mount.contains("CAMLparam3 (gv, devicev, mountpointv);"));
        assert!(mount.contains("caml_enter_blocking_section ();"));
        assert!(mount.contains("r = guestfs_mount (g, device, mountpoint);"));
        assert!(mount.contains("caml_leave_blocking_section ();"));
        assert!(mount.contains("ocaml_guestfs_raise_error (g, \"mount\");"));
    }

    #[test]
    fn test_glue_copies_strings_before_blocking() {
        let c = generate_ocaml_c(&api_model()).unwrap();
        assert!(c.contains("  char *device = guestfs_safe_strdup (g, String_val (devicev));"));
        assert!(c.contains("  free (device);"));
    }

    #[test]
    fn test_glue_option_argument() {
        let c = generate_ocaml_c(&api_model()).unwrap();
        assert!(c.contains(
            "    exprv != Val_int (0) ? guestfs_safe_strdup (g, String_val (Field (exprv, 0))) : NULL;"
        ));
    }

    #[test]
    fn test_glue_string_list_freed_after_copy() {
        let c = generate_ocaml_c(&api_model()).unwrap();
        assert!(c.contains("  rv = caml_copy_string_array ((const char **) r);"));
        assert!(c.contains("  for (i = 0; r[i] != NULL; ++i) free (r[i]);"));
    }

    #[test]
    fn test_glue_deep_copies_records() {
        let c = generate_ocaml_c(&api_model()).unwrap();
        assert!(c.contains("copy_lvm_pv (const struct guestfs_lvm_pv *pv)"));
        assert!(c.contains("  v = copy_uuid (pv->pv_uuid);"));
        assert!(c.contains("  v = caml_copy_int64 (pv->pv_size);"));
        assert!(c.contains("  rv = copy_lvm_pv_list (r);"));
        assert!(c.contains("  guestfs_free_lvm_pv_list (r);"));
        assert!(c.contains("CAMLreturn (Atom (0));"));
    }

    #[test]
    fn test_glue_int_bool_pair() {
        let c = generate_ocaml_c(&api_model()).unwrap();
        assert!(c.contains("  Store_field (rv, 0, Val_int (r->i));"));
        assert!(c.contains("  Store_field (rv, 1, Val_bool (r->b));"));
        assert!(c.contains("  guestfs_free_int_bool (r);"));
    }
}
