//! Perl binding backend
//!
//! Two artefacts: the XS stub module that marshals between the Perl stack
//! and the client API, and the pure-POD documentation module that wraps
//! it as C<Sys::Guestfs>.
//!
//! Each XS stub validates and extracts its arguments, calls the client
//! API, croaks with the captured error message on failure, and pushes
//! typed results: scalars as SVs, lists element by element, structured
//! records as hash references keyed by column name.

use super::{EmitError, PROTOCOL_LIMIT_WARNING};
use crate::banner::{generated_by, CommentStyle, License};
use crate::model::{ArgKind, Call, ColKind, LvmKind, Model, ReturnKind};
use std::fmt::Write as _;

pub fn generate_perl_xs(model: &Model) -> Result<String, EmitError> {
    let mut out = generated_by(CommentStyle::CStyle, License::LGPLv2plus);

    writeln!(out, "#include \"EXTERN.h\"")?;
    writeln!(out, "#include \"perl.h\"")?;
    writeln!(out, "#include \"XSUB.h\"")?;
    writeln!(out)?;
    writeln!(out, "#include <guestfs.h>")?;
    writeln!(out, "#include <inttypes.h>")?;
    writeln!(out)?;
    writeln!(out, "/* Not thread-safe.  The last error is captured here so the")?;
    writeln!(out, " * stubs can croak with it after a failed call.")?;
    writeln!(out, " */")?;
    writeln!(out, "static char *last_error = NULL;")?;
    writeln!(out)?;
    writeln!(out, "static void")?;
    writeln!(out, "error_handler (guestfs_h *g, void *data, const char *msg)")?;
    writeln!(out, "{{")?;
    writeln!(out, "  if (last_error != NULL) free (last_error);")?;
    writeln!(out, "  last_error = strdup (msg);")?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    writeln!(out, "/* 64 bit numbers as IVs where perl supports it, else as strings. */")?;
    writeln!(out, "static SV *")?;
    writeln!(out, "my_newSVll (long long val) {{")?;
    writeln!(out, "#ifdef USE_64_BIT_ALL")?;
    writeln!(out, "  return newSViv (val);")?;
    writeln!(out, "#else")?;
    writeln!(out, "  char buf[100];")?;
    writeln!(out, "  int len;")?;
    writeln!(out, "  len = snprintf (buf, 100, \"%\" PRId64, val);")?;
    writeln!(out, "  return newSVpv (buf, len);")?;
    writeln!(out, "#endif")?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    writeln!(out, "static SV *")?;
    writeln!(out, "my_newSVull (unsigned long long val) {{")?;
    writeln!(out, "#ifdef USE_64_BIT_ALL")?;
    writeln!(out, "  return newSVuv (val);")?;
    writeln!(out, "#else")?;
    writeln!(out, "  char buf[100];")?;
    writeln!(out, "  int len;")?;
    writeln!(out, "  len = snprintf (buf, 100, \"%\" PRIu64, val);")?;
    writeln!(out, "  return newSVpv (buf, len);")?;
    writeln!(out, "#endif")?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    writeln!(out, "MODULE = Sys::Guestfs  PACKAGE = Sys::Guestfs")?;
    writeln!(out)?;
    writeln!(out, "guestfs_h *")?;
    writeln!(out, "_create ()")?;
    writeln!(out, "   CODE:")?;
    writeln!(out, "      RETVAL = guestfs_create ();")?;
    writeln!(out, "      if (!RETVAL)")?;
    writeln!(out, "        croak (\"could not create guestfs handle\");")?;
    writeln!(out, "      guestfs_set_error_handler (RETVAL, error_handler, NULL);")?;
    writeln!(out, " OUTPUT:")?;
    writeln!(out, "      RETVAL")?;
    writeln!(out)?;
    writeln!(out, "void")?;
    writeln!(out, "DESTROY (g)")?;
    writeln!(out, "      guestfs_h *g;")?;
    writeln!(out, " PPCODE:")?;
    writeln!(out, "      guestfs_close (g);")?;
    writeln!(out)?;

    for call in &model.calls {
        emit_xs_stub(&mut out, call)?;
    }

    Ok(out)
}

/// XS parameter declaration block for one call.
fn emit_xs_params(out: &mut String, call: &Call) -> Result<(), EmitError> {
    let params: Vec<String> = std::iter::once("g".to_string())
        .chain(call.args.iter().map(|a| a.name.clone()))
        .collect();
    writeln!(out, "{} ({})", call.name, params.join(", "))?;
    writeln!(out, "      guestfs_h *g;")?;
    for (i, arg) in call.args.iter().enumerate() {
        match arg.kind {
            ArgKind::Str => writeln!(out, "      char *{};", arg.name)?,
            // undef collapses to the absent case.
            ArgKind::OptStr => writeln!(
                out,
                "      char *{} = SvOK (ST({})) ? SvPV_nolen (ST({})) : NULL;",
                arg.name,
                i + 1,
                i + 1
            )?,
            ArgKind::Bool | ArgKind::Int => writeln!(out, "      int {};", arg.name)?,
        }
    }
    Ok(())
}

fn call_expr(call: &Call) -> String {
    let mut s = format!("guestfs_{} (g", call.name);
    for arg in &call.args {
        let _ = write!(s, ", {}", arg.name);
    }
    s.push(')');
    s
}

fn emit_xs_stub(out: &mut String, call: &Call) -> Result<(), EmitError> {
    let n = &call.name;
    match &call.ret {
        ReturnKind::Err => {
            writeln!(out, "void")?;
            emit_xs_params(out, call)?;
            writeln!(out, " PPCODE:")?;
            writeln!(out, "      if ({} == -1)", call_expr(call))?;
            writeln!(out, "        croak (\"{}: %s\", last_error);", n)?;
        }
        ReturnKind::Int(f) | ReturnKind::Bool(f) => {
            writeln!(out, "SV *")?;
            emit_xs_params(out, call)?;
            writeln!(out, "PREINIT:")?;
            writeln!(out, "      int {};", f)?;
            writeln!(out, "   CODE:")?;
            writeln!(out, "      {} = {};", f, call_expr(call))?;
            writeln!(out, "      if ({} == -1)", f)?;
            writeln!(out, "        croak (\"{}: %s\", last_error);", n)?;
            writeln!(out, "      RETVAL = newSViv ({});", f)?;
            writeln!(out, " OUTPUT:")?;
            writeln!(out, "      RETVAL")?;
        }
        ReturnKind::ConstString(f) => {
            writeln!(out, "SV *")?;
            emit_xs_params(out, call)?;
            writeln!(out, "PREINIT:")?;
            writeln!(out, "      const char *{};", f)?;
            writeln!(out, "   CODE:")?;
            writeln!(out, "      {} = {};", f, call_expr(call))?;
            writeln!(out, "      if ({} == NULL)", f)?;
            writeln!(out, "        croak (\"{}: %s\", last_error);", n)?;
            writeln!(out, "      RETVAL = newSVpv ({}, 0);", f)?;
            writeln!(out, " OUTPUT:")?;
            writeln!(out, "      RETVAL")?;
        }
        ReturnKind::String(f) => {
            writeln!(out, "SV *")?;
            emit_xs_params(out, call)?;
            writeln!(out, "PREINIT:")?;
            writeln!(out, "      char *{};", f)?;
            writeln!(out, "   CODE:")?;
            writeln!(out, "      {} = {};", f, call_expr(call))?;
            writeln!(out, "      if ({} == NULL)", f)?;
            writeln!(out, "        croak (\"{}: %s\", last_error);", n)?;
            writeln!(out, "      RETVAL = newSVpv ({}, 0);", f)?;
            writeln!(out, "      free ({});", f)?;
            writeln!(out, " OUTPUT:")?;
            writeln!(out, "      RETVAL")?;
        }
        ReturnKind::StringList(f) => {
            writeln!(out, "void")?;
            emit_xs_params(out, call)?;
            writeln!(out, "PREINIT:")?;
            writeln!(out, "      char **{};", f)?;
            writeln!(out, "      int i, n;")?;
            writeln!(out, " PPCODE:")?;
            writeln!(out, "      {} = {};", f, call_expr(call))?;
            writeln!(out, "      if ({} == NULL)", f)?;
            writeln!(out, "        croak (\"{}: %s\", last_error);", n)?;
            writeln!(out, "      for (n = 0; {}[n] != NULL; ++n) /**/;", f)?;
            writeln!(out, "      EXTEND (SP, n);")?;
            writeln!(out, "      for (i = 0; i < n; ++i) {{")?;
            writeln!(out, "        PUSHs (sv_2mortal (newSVpv ({}[i], 0)));", f)?;
            writeln!(out, "        free ({}[i]);", f)?;
            writeln!(out, "      }}")?;
            writeln!(out, "      free ({});", f)?;
        }
        ReturnKind::IntBool(_, _) => {
            writeln!(out, "void")?;
            emit_xs_params(out, call)?;
            writeln!(out, "PREINIT:")?;
            writeln!(out, "      struct guestfs_int_bool *r;")?;
            writeln!(out, " PPCODE:")?;
            writeln!(out, "      r = {};", call_expr(call))?;
            writeln!(out, "      if (r == NULL)")?;
            writeln!(out, "        croak (\"{}: %s\", last_error);", n)?;
            writeln!(out, "      EXTEND (SP, 2);")?;
            writeln!(out, "      PUSHs (sv_2mortal (newSViv (r->i)));")?;
            writeln!(out, "      PUSHs (sv_2mortal (newSViv (r->b)));")?;
            writeln!(out, "      guestfs_free_int_bool (r);")?;
        }
        ReturnKind::PvList(f) => emit_xs_record_list(out, call, f, LvmKind::Pv)?,
        ReturnKind::VgList(f) => emit_xs_record_list(out, call, f, LvmKind::Vg)?,
        ReturnKind::LvList(f) => emit_xs_record_list(out, call, f, LvmKind::Lv)?,
    }
    writeln!(out)?;
    Ok(())
}

/// Push a list of LVM records as hash references, one per element.
fn emit_xs_record_list(
    out: &mut String,
    call: &Call,
    field: &str,
    kind: LvmKind,
) -> Result<(), EmitError> {
    let k = kind.name();
    writeln!(out, "void")?;
    emit_xs_params(out, call)?;
    writeln!(out, "PREINIT:")?;
    writeln!(out, "      struct guestfs_lvm_{}_list *{};", k, field)?;
    writeln!(out, "      unsigned int i;")?;
    writeln!(out, "      HV *hv;")?;
    writeln!(out, " PPCODE:")?;
    writeln!(out, "      {} = {};", field, call_expr(call))?;
    writeln!(out, "      if ({} == NULL)", field)?;
    writeln!(out, "        croak (\"{}: %s\", last_error);", call.name)?;
    writeln!(out, "      EXTEND (SP, {}->len);", field)?;
    writeln!(out, "      for (i = 0; i < {}->len; ++i) {{", field)?;
    writeln!(out, "        hv = newHV ();")?;
    for (col, colkind) in kind.columns() {
        let sv = match colkind {
            ColKind::Str => format!("newSVpv ({}->val[i].{}, 0)", field, col),
            ColKind::Uuid => format!("newSVpv ({}->val[i].{}, 32)", field, col),
            ColKind::Bytes => format!("my_newSVull ({}->val[i].{})", field, col),
            ColKind::Int64 => format!("my_newSVll ({}->val[i].{})", field, col),
            ColKind::OptPercent => format!("newSVnv ({}->val[i].{})", field, col),
        };
        writeln!(
            out,
            "        (void) hv_store (hv, \"{}\", {}, {}, 0);",
            col,
            col.len(),
            sv
        )?;
    }
    writeln!(out, "        PUSHs (sv_2mortal (newRV ((SV *) hv)));")?;
    writeln!(out, "      }}")?;
    writeln!(out, "      guestfs_free_lvm_{}_list ({});", k, field)?;
    Ok(())
}

pub fn generate_perl_pm(model: &Model) -> Result<String, EmitError> {
    let mut out = generated_by(CommentStyle::HashStyle, License::LGPLv2plus);

    writeln!(out, "=pod")?;
    writeln!(out)?;
    writeln!(out, "=head1 NAME")?;
    writeln!(out)?;
    writeln!(out, "Sys::Guestfs - Perl bindings for libguestfs")?;
    writeln!(out)?;
    writeln!(out, "=head1 SYNOPSIS")?;
    writeln!(out)?;
    writeln!(out, " use Sys::Guestfs;")?;
    writeln!(out)?;
    writeln!(out, " my $h = Sys::Guestfs->new ();")?;
    writeln!(out, " $h->add_drive ('guest.img');")?;
    writeln!(out, " $h->launch ();")?;
    writeln!(out, " $h->wait_ready ();")?;
    writeln!(out, " $h->mount ('/dev/sda1', '/');")?;
    writeln!(out, " $h->touch ('/hello');")?;
    writeln!(out, " $h->sync ();")?;
    writeln!(out)?;
    writeln!(out, "=head1 DESCRIPTION")?;
    writeln!(out)?;
    writeln!(out, "The C<Sys::Guestfs> module provides a Perl XS binding to the")?;
    writeln!(out, "libguestfs API for examining and modifying virtual machine")?;
    writeln!(out, "disk images.")?;
    writeln!(out)?;
    writeln!(out, "Errors which happen while using the module are turned into Perl")?;
    writeln!(out, "exceptions by croaking.  Use C<eval> to catch them.")?;
    writeln!(out)?;
    writeln!(out, "=head1 METHODS")?;
    writeln!(out)?;
    writeln!(out, "=over 4")?;
    writeln!(out)?;
    writeln!(out, "=cut")?;
    writeln!(out)?;
    writeln!(out, "package Sys::Guestfs;")?;
    writeln!(out)?;
    writeln!(out, "use strict;")?;
    writeln!(out, "use warnings;")?;
    writeln!(out)?;
    writeln!(out, "require XSLoader;")?;
    writeln!(out, "XSLoader::load ('Sys::Guestfs');")?;
    writeln!(out)?;
    writeln!(out, "=item $h = Sys::Guestfs->new ();")?;
    writeln!(out)?;
    writeln!(out, "Create a new guestfs handle.")?;
    writeln!(out)?;
    writeln!(out, "=cut")?;
    writeln!(out)?;
    writeln!(out, "sub new {{")?;
    writeln!(out, "  my $proto = shift;")?;
    writeln!(out, "  my $class = ref ($proto) || $proto;")?;
    writeln!(out)?;
    writeln!(out, "  my $self = Sys::Guestfs::_create ();")?;
    writeln!(out, "  bless $self, $class;")?;
    writeln!(out, "  return $self;")?;
    writeln!(out, "}}")?;
    writeln!(out)?;

    for call in model.sorted_calls() {
        writeln!(out, "=item {}", pm_calling_convention(call))?;
        writeln!(out)?;
        writeln!(out, "{}", pm_description(call))?;
        if call.protocol_limit_warning() {
            writeln!(out)?;
            writeln!(out, "{}", PROTOCOL_LIMIT_WARNING)?;
        }
        writeln!(out)?;
    }

    writeln!(out, "=back")?;
    writeln!(out)?;
    writeln!(out, "=cut")?;
    writeln!(out)?;
    writeln!(out, "1;")?;

    Ok(out)
}

/// The Perl calling convention line for one call.
fn pm_calling_convention(call: &Call) -> String {
    let args: Vec<String> = call
        .args
        .iter()
        .map(|a| format!("${}", a.name))
        .collect();
    let args = args.join(", ");
    let invocation = if args.is_empty() {
        format!("$h->{} ();", call.name)
    } else {
        format!("$h->{} ({});", call.name, args)
    };
    match &call.ret {
        ReturnKind::Err => invocation,
        ReturnKind::Int(f) | ReturnKind::Bool(f) => format!("${} = {}", f, invocation),
        ReturnKind::ConstString(f) | ReturnKind::String(f) => {
            format!("${} = {}", f, invocation)
        }
        ReturnKind::StringList(f) => format!("@{} = {}", f, invocation),
        ReturnKind::IntBool(i, b) => format!("(${}, ${}) = {}", i, b, invocation),
        ReturnKind::PvList(f) | ReturnKind::VgList(f) | ReturnKind::LvList(f) => {
            format!("@{} = {}", f, invocation)
        }
    }
}

/// Long description with API references rewritten to method syntax, plus
/// the structured-return note where it applies.
fn pm_description(call: &Call) -> String {
    let mut desc = call.longdesc.replace("C<guestfs_", "C<$h-E<gt>");
    match &call.ret {
        ReturnKind::StringList(_) => {
            desc.push_str("\n\nThis returns a list of strings.");
        }
        ReturnKind::PvList(_) | ReturnKind::VgList(_) | ReturnKind::LvList(_) => {
            desc.push_str(
                "\n\nThis returns a list of hash references, one per record,\nkeyed by column name.",
            );
        }
        _ => {}
    }
    desc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::api_model;

    #[test]
    fn test_xs_err_stub_croaks_on_failure() {
        let xs = generate_perl_xs(&api_model()).unwrap();
        assert!(xs.contains("      if (guestfs_mount (g, device, mountpoint) == -1)"));
        assert!(xs.contains("        croak (\"mount: %s\", last_error);"));
    }

    #[test]
    fn test_xs_string_return_freed() {
        let xs = generate_perl_xs(&api_model()).unwrap();
        assert!(xs.contains("      content = guestfs_cat (g, path);"));
        assert!(xs.contains("      RETVAL = newSVpv (content, 0);"));
        assert!(xs.contains("      free (content);"));
    }

    #[test]
    fn test_xs_string_list_pushed_and_freed() {
        let xs = generate_perl_xs(&api_model()).unwrap();
        assert!(xs.contains("      for (n = 0; listing[n] != NULL; ++n) /**/;"));
        assert!(xs.contains("        PUSHs (sv_2mortal (newSVpv (listing[i], 0)));"));
        assert!(xs.contains("        free (listing[i]);"));
    }

    #[test]
    fn test_xs_optional_string_collapses_undef() {
        let xs = generate_perl_xs(&api_model()).unwrap();
        assert!(xs.contains(
            "      char *expr = SvOK (ST(2)) ? SvPV_nolen (ST(2)) : NULL;"
        ));
    }

    #[test]
    fn test_xs_record_list_as_hashrefs() {
        let xs = generate_perl_xs(&api_model()).unwrap();
        assert!(xs.contains("        (void) hv_store (hv, \"pv_name\", 7, newSVpv (physvols->val[i].pv_name, 0), 0);"));
        assert!(xs.contains("        (void) hv_store (hv, \"pv_uuid\", 7, newSVpv (physvols->val[i].pv_uuid, 32), 0);"));
        assert!(xs.contains("my_newSVull (physvols->val[i].pv_size)"));
        assert!(xs.contains("newSVnv (logvols->val[i].snap_percent)"));
        assert!(xs.contains("      guestfs_free_lvm_pv_list (physvols);"));
    }

    #[test]
    fn test_xs_int_bool_pushes_pair() {
        let xs = generate_perl_xs(&api_model()).unwrap();
        assert!(xs.contains("      EXTEND (SP, 2);"));
        assert!(xs.contains("      PUSHs (sv_2mortal (newSViv (r->i)));"));
        assert!(xs.contains("      PUSHs (sv_2mortal (newSViv (r->b)));"));
    }

    #[test]
    fn test_xs_create_installs_error_handler() {
        let xs = generate_perl_xs(&api_model()).unwrap();
        assert!(xs.contains("      guestfs_set_error_handler (RETVAL, error_handler, NULL);"));
        assert!(xs.contains("MODULE = Sys::Guestfs  PACKAGE = Sys::Guestfs"));
    }

    #[test]
    fn test_pm_calling_conventions() {
        let pm = generate_perl_pm(&api_model()).unwrap();
        assert!(pm.contains("=item $h->mount ($device, $mountpoint);"));
        assert!(pm.contains("=item $content = $h->cat ($path);"));
        assert!(pm.contains("=item @listing = $h->ls ($directory);"));
        assert!(pm.contains("=item ($nrnodes, $created) = $h->aug_defnode ($name, $expr, $val);"));
        assert!(pm.contains("=item @physvols = $h->pvs_full ();"));
    }

    #[test]
    fn test_pm_rewrites_references_to_method_syntax() {
        let pm = generate_perl_pm(&api_model()).unwrap();
        assert!(pm.contains("C<$h-E<gt>pvs_full>"));
        assert!(!pm.contains("C<guestfs_"));
    }

    #[test]
    fn test_pm_is_a_loadable_module() {
        let pm = generate_perl_pm(&api_model()).unwrap();
        assert!(pm.contains("package Sys::Guestfs;"));
        assert!(pm.contains("XSLoader::load ('Sys::Guestfs');"));
        assert!(pm.ends_with("1;\n"));
        assert!(pm.contains("=back"));
    }
}
