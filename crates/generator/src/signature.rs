//! Call signature formatting
//!
//! Shared helpers that turn one call's (return kind, argument vector) into
//! the textual declaration each backend needs.  The interesting split is
//! the aggregate return kinds: the int/bool pair and the three LVM list
//! kinds are public structs in the client's view of the world but wire
//! structs inside the daemon build, and this module is the one place that
//! knows it.

use crate::model::{ArgKind, Call, ReturnKind};
use std::fmt::Write as _;

/// Which declaration surface is being emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigFlavor {
    /// Single-line `extern` prototype with handle, for the client header.
    CExtern,
    /// Definition opener with handle, arguments broken at commas, no
    /// trailing semicolon, for the client implementation.
    CDefinition,
    /// Single-line `extern` prototype in the `do_` namespace, no handle,
    /// for the daemon header.
    DaemonStub,
}

/// C type of an argument, uniform across every C surface.
pub fn c_arg_type(kind: ArgKind) -> &'static str {
    match kind {
        ArgKind::Str | ArgKind::OptStr => "const char *",
        ArgKind::Bool | ArgKind::Int => "int",
    }
}

/// C return type as the client sees it (public structs for aggregates).
pub fn client_ret_type(ret: &ReturnKind) -> String {
    match ret {
        ReturnKind::Err | ReturnKind::Int(_) | ReturnKind::Bool(_) => "int".to_string(),
        ReturnKind::ConstString(_) => "const char *".to_string(),
        ReturnKind::String(_) => "char *".to_string(),
        ReturnKind::StringList(_) => "char **".to_string(),
        ReturnKind::IntBool(_, _) => "struct guestfs_int_bool *".to_string(),
        ReturnKind::PvList(_) => "struct guestfs_lvm_pv_list *".to_string(),
        ReturnKind::VgList(_) => "struct guestfs_lvm_vg_list *".to_string(),
        ReturnKind::LvList(_) => "struct guestfs_lvm_lv_list *".to_string(),
    }
}

/// C return type as the daemon sees it (wire structs for aggregates).
pub fn daemon_ret_type(call: &Call) -> String {
    match &call.ret {
        ReturnKind::Err | ReturnKind::Int(_) | ReturnKind::Bool(_) => "int".to_string(),
        ReturnKind::ConstString(_) => "const char *".to_string(),
        ReturnKind::String(_) => "char *".to_string(),
        ReturnKind::StringList(_) => "char **".to_string(),
        ReturnKind::IntBool(_, _) => format!("guestfs_{}_ret *", call.name),
        ReturnKind::PvList(_) => "guestfs_lvm_int_pv_list *".to_string(),
        ReturnKind::VgList(_) => "guestfs_lvm_int_vg_list *".to_string(),
        ReturnKind::LvList(_) => "guestfs_lvm_int_lv_list *".to_string(),
    }
}

/// Join a C type and an identifier, eliding the space after a pointer
/// star so `char *` + `guestfs_cat` reads `char *guestfs_cat`.
fn join_type_ident(ty: &str, ident: &str) -> String {
    if ty.ends_with('*') {
        format!("{}{}", ty, ident)
    } else {
        format!("{} {}", ty, ident)
    }
}

/// Format a call's declaration (or definition opener) for one C surface.
pub fn c_signature(call: &Call, flavor: SigFlavor) -> String {
    let mut out = String::new();

    match flavor {
        SigFlavor::CExtern => {
            let name = format!("guestfs_{}", call.name);
            let _ = write!(
                out,
                "extern {} (guestfs_h *handle",
                join_type_ident(&client_ret_type(&call.ret), &name)
            );
            for arg in &call.args {
                let _ = write!(out, ", {}", join_type_ident(c_arg_type(arg.kind), &arg.name));
            }
            out.push_str(");\n");
        }
        SigFlavor::CDefinition => {
            let name = format!("guestfs_{}", call.name);
            let _ = write!(
                out,
                "{} (guestfs_h *g",
                join_type_ident(&client_ret_type(&call.ret), &name)
            );
            for arg in &call.args {
                let _ = write!(
                    out,
                    ",\n\t\t{}",
                    join_type_ident(c_arg_type(arg.kind), &arg.name)
                );
            }
            out.push_str(")\n");
        }
        SigFlavor::DaemonStub => {
            let name = format!("do_{}", call.name);
            let _ = write!(
                out,
                "extern {} (",
                join_type_ident(&daemon_ret_type(call), &name)
            );
            if call.args.is_empty() {
                out.push_str("void");
            } else {
                for (i, arg) in call.args.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(&join_type_ident(c_arg_type(arg.kind), &arg.name));
                }
            }
            out.push_str(");\n");
        }
    }

    out
}

/// OCaml type of an argument.
pub fn ocaml_arg_type(kind: ArgKind) -> &'static str {
    match kind {
        ArgKind::Str => "string",
        ArgKind::OptStr => "string option",
        ArgKind::Bool => "bool",
        ArgKind::Int => "int",
    }
}

/// OCaml type of a return value.
pub fn ocaml_ret_type(ret: &ReturnKind) -> &'static str {
    match ret {
        ReturnKind::Err => "unit",
        ReturnKind::Int(_) => "int",
        ReturnKind::Bool(_) => "bool",
        ReturnKind::ConstString(_) | ReturnKind::String(_) => "string",
        ReturnKind::StringList(_) => "string array",
        ReturnKind::IntBool(_, _) => "int * bool",
        ReturnKind::PvList(_) => "lvm_pv array",
        ReturnKind::VgList(_) => "lvm_vg array",
        ReturnKind::LvList(_) => "lvm_lv array",
    }
}

/// Full OCaml arrow type of a call, handle first: `t -> string -> unit`.
pub fn ocaml_function_type(call: &Call) -> String {
    let mut out = String::from("t -> ");
    for arg in &call.args {
        let _ = write!(out, "{} -> ", ocaml_arg_type(arg.kind));
    }
    out.push_str(ocaml_ret_type(&call.ret));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Arg;

    #[test]
    fn test_extern_prototype_is_single_line() {
        let c = Call::daemon("touch", 3, ReturnKind::Err, vec![Arg::string("path")]);
        assert_eq!(
            c_signature(&c, SigFlavor::CExtern),
            "extern int guestfs_touch (guestfs_h *handle, const char *path);\n"
        );
    }

    #[test]
    fn test_pointer_return_hugs_the_name() {
        let c = Call::daemon(
            "cat",
            4,
            ReturnKind::String("content".to_string()),
            vec![Arg::string("path")],
        );
        let sig = c_signature(&c, SigFlavor::CExtern);
        assert!(sig.starts_with("extern char *guestfs_cat (guestfs_h *handle"));
    }

    #[test]
    fn test_definition_breaks_at_commas() {
        let c = Call::daemon(
            "mount",
            1,
            ReturnKind::Err,
            vec![Arg::string("device"), Arg::string("mountpoint")],
        );
        assert_eq!(
            c_signature(&c, SigFlavor::CDefinition),
            "int guestfs_mount (guestfs_h *g,\n\t\tconst char *device,\n\t\tconst char *mountpoint)\n"
        );
    }

    #[test]
    fn test_daemon_stub_has_no_handle_and_void_when_empty() {
        let c = Call::daemon(
            "list_devices",
            7,
            ReturnKind::StringList("devices".to_string()),
            vec![],
        );
        assert_eq!(
            c_signature(&c, SigFlavor::DaemonStub),
            "extern char **do_list_devices (void);\n"
        );
    }

    #[test]
    fn test_aggregate_returns_split_by_flavour() {
        let c = Call::daemon(
            "pvs_full",
            12,
            ReturnKind::PvList("physvols".to_string()),
            vec![],
        );
        assert_eq!(client_ret_type(&c.ret), "struct guestfs_lvm_pv_list *");
        assert_eq!(daemon_ret_type(&c), "guestfs_lvm_int_pv_list *");

        let ib = Call::daemon(
            "aug_defnode",
            17,
            ReturnKind::IntBool("nrnodes".to_string(), "created".to_string()),
            vec![],
        );
        assert_eq!(client_ret_type(&ib.ret), "struct guestfs_int_bool *");
        assert_eq!(daemon_ret_type(&ib), "guestfs_aug_defnode_ret *");
    }

    #[test]
    fn test_int_args_render_as_int() {
        let c = Call::daemon(
            "chmod",
            30,
            ReturnKind::Err,
            vec![Arg::int("mode"), Arg::string("path")],
        );
        assert_eq!(
            c_signature(&c, SigFlavor::DaemonStub),
            "extern int do_chmod (int mode, const char *path);\n"
        );
    }

    #[test]
    fn test_ocaml_arrow_type() {
        let c = Call::daemon(
            "aug_defvar",
            16,
            ReturnKind::Int("nrnodes".to_string()),
            vec![Arg::string("name"), Arg::opt_string("expr")],
        );
        assert_eq!(
            ocaml_function_type(&c),
            "t -> string -> string option -> int"
        );
    }
}
