//! Wire-schema backend
//!
//! Emits the XDR interface description that the RPC stub generator turns
//! into serialisers: the LVM record types, one `_args` struct per daemon
//! call with arguments, one `_ret` struct per daemon call that returns a
//! value, the procedure enumeration, the protocol constants, and the
//! common message framing types.

use super::EmitError;
use crate::banner::{generated_by, CommentStyle, License};
use crate::model::{ArgKind, ColKind, LvmKind, Model, ReturnKind};
use std::fmt::Write as _;

/// Maximum size of a single message on the wire.
pub const MESSAGE_MAX: u32 = 4 * 1024 * 1024;
/// Program magic carried in every message header.
pub const PROGRAM: &str = "0x2000F5F5";
/// Wire protocol version.
pub const PROTOCOL_VERSION: u32 = 1;
/// Maximum length of a daemon error message.
pub const ERROR_LEN: u32 = 256;

pub fn generate_xdr(model: &Model) -> Result<String, EmitError> {
    let mut out = generated_by(CommentStyle::CStyle, License::LGPLv2plus);

    // Variable-length text alias used throughout the schema.  XDR does not
    // allow "string *" so optional arguments point at this typedef instead.
    writeln!(out, "typedef string str<>;")?;
    writeln!(out)?;

    for kind in LvmKind::ALL {
        emit_lvm_record(&mut out, kind)?;
    }

    for call in model.daemon_calls() {
        if call.args.is_empty() {
            continue;
        }
        writeln!(out, "struct guestfs_{}_args {{", call.name)?;
        for arg in &call.args {
            match arg.kind {
                ArgKind::Str => writeln!(out, "  string {}<>;", arg.name)?,
                ArgKind::OptStr => writeln!(out, "  str *{};", arg.name)?,
                ArgKind::Bool => writeln!(out, "  bool {};", arg.name)?,
                ArgKind::Int => writeln!(out, "  int {};", arg.name)?,
            }
        }
        writeln!(out, "}};")?;
        writeln!(out)?;
    }

    for call in model.daemon_calls() {
        if matches!(call.ret, ReturnKind::Err) {
            continue;
        }
        writeln!(out, "struct guestfs_{}_ret {{", call.name)?;
        match &call.ret {
            ReturnKind::Err => {}
            ReturnKind::Int(n) => writeln!(out, "  int {};", n)?,
            ReturnKind::Bool(n) => writeln!(out, "  bool {};", n)?,
            ReturnKind::ConstString(_) => {
                return Err(EmitError::Logic(format!(
                    "{}: const-string cannot be represented on the wire",
                    call.name
                )))
            }
            ReturnKind::String(n) => writeln!(out, "  string {}<>;", n)?,
            ReturnKind::StringList(n) => writeln!(out, "  str {}<>;", n)?,
            ReturnKind::IntBool(i, b) => {
                writeln!(out, "  int {};", i)?;
                writeln!(out, "  bool {};", b)?;
            }
            ReturnKind::PvList(n) => writeln!(out, "  guestfs_lvm_int_pv_list {};", n)?,
            ReturnKind::VgList(n) => writeln!(out, "  guestfs_lvm_int_vg_list {};", n)?,
            ReturnKind::LvList(n) => writeln!(out, "  guestfs_lvm_int_lv_list {};", n)?,
        }
        writeln!(out, "}};")?;
        writeln!(out)?;
    }

    // Procedure numbers, in wire order.  The trailing dummy entry exists
    // so the last real entry keeps its comma.
    let mut daemon: Vec<_> = model.daemon_calls().collect();
    daemon.sort_by_key(|c| c.proc_number());
    writeln!(out, "enum guestfs_procedure {{")?;
    for call in &daemon {
        if let Some(n) = call.proc_number() {
            writeln!(out, "  GUESTFS_PROC_{} = {},", call.name.to_uppercase(), n)?;
        }
    }
    writeln!(out, "  GUESTFS_PROC_dummy")?;
    writeln!(out, "}};")?;
    writeln!(out)?;

    writeln!(out, "const GUESTFS_MESSAGE_MAX = {};", MESSAGE_MAX)?;
    writeln!(out)?;
    writeln!(out, "const GUESTFS_PROGRAM = {};", PROGRAM)?;
    writeln!(out, "const GUESTFS_PROTOCOL_VERSION = {};", PROTOCOL_VERSION)?;
    writeln!(out)?;

    writeln!(out, "enum guestfs_message_direction {{")?;
    writeln!(out, "  GUESTFS_DIRECTION_CALL = 0,        /* client -> daemon */")?;
    writeln!(out, "  GUESTFS_DIRECTION_REPLY = 1        /* daemon -> client */")?;
    writeln!(out, "}};")?;
    writeln!(out)?;

    writeln!(out, "enum guestfs_message_status {{")?;
    writeln!(out, "  GUESTFS_STATUS_OK = 0,")?;
    writeln!(out, "  GUESTFS_STATUS_ERROR = 1")?;
    writeln!(out, "}};")?;
    writeln!(out)?;

    writeln!(out, "const GUESTFS_ERROR_LEN = {};", ERROR_LEN)?;
    writeln!(out)?;
    writeln!(out, "struct guestfs_message_error {{")?;
    writeln!(out, "  string error<GUESTFS_ERROR_LEN>;")?;
    writeln!(out, "}};")?;
    writeln!(out)?;

    writeln!(out, "struct guestfs_message_header {{")?;
    writeln!(out, "  unsigned prog;                     /* GUESTFS_PROGRAM */")?;
    writeln!(out, "  unsigned vers;                     /* GUESTFS_PROTOCOL_VERSION */")?;
    writeln!(out, "  guestfs_procedure proc;            /* GUESTFS_PROC_x */")?;
    writeln!(out, "  guestfs_message_direction direction;")?;
    writeln!(out, "  unsigned serial;                   /* message serial number */")?;
    writeln!(out, "  guestfs_message_status status;")?;
    writeln!(out, "}};")?;

    Ok(out)
}

/// One fixed-field record plus its variable-length list typedef.
fn emit_lvm_record(out: &mut String, kind: LvmKind) -> Result<(), EmitError> {
    writeln!(out, "struct guestfs_lvm_int_{} {{", kind.name())?;
    for (name, col) in kind.columns() {
        match col {
            ColKind::Str => writeln!(out, "  string {}<>;", name)?,
            ColKind::Uuid => writeln!(out, "  opaque {}[32];", name)?,
            ColKind::Bytes | ColKind::Int64 => writeln!(out, "  hyper {};", name)?,
            ColKind::OptPercent => writeln!(out, "  float {};", name)?,
        }
    }
    writeln!(out, "}};")?;
    writeln!(out)?;
    writeln!(
        out,
        "typedef struct guestfs_lvm_int_{} guestfs_lvm_int_{}_list<>;",
        kind.name(),
        kind.name()
    )?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::api_model;

    #[test]
    fn test_touch_args_and_enum_entry() {
        let x = generate_xdr(&api_model()).unwrap();
        assert!(x.contains("struct guestfs_touch_args {\n  string path<>;\n};\n"));
        assert!(x.contains("  GUESTFS_PROC_TOUCH = 3,\n"));
    }

    #[test]
    fn test_zero_arg_calls_get_no_args_struct() {
        let x = generate_xdr(&api_model()).unwrap();
        assert!(!x.contains("guestfs_sync_args"));
        assert!(!x.contains("guestfs_list_devices_args"));
    }

    #[test]
    fn test_err_calls_get_no_ret_struct() {
        let x = generate_xdr(&api_model()).unwrap();
        assert!(!x.contains("guestfs_mount_ret"));
        assert!(x.contains("struct guestfs_cat_ret {\n  string content<>;\n};\n"));
    }

    #[test]
    fn test_optional_string_wires_as_pointer() {
        let x = generate_xdr(&api_model()).unwrap();
        assert!(x.contains("struct guestfs_aug_defvar_args {\n  string name<>;\n  str *expr;\n};\n"));
    }

    #[test]
    fn test_int_bool_ret_has_two_fields() {
        let x = generate_xdr(&api_model()).unwrap();
        assert!(
            x.contains("struct guestfs_aug_defnode_ret {\n  int nrnodes;\n  bool created;\n};\n")
        );
    }

    #[test]
    fn test_lvm_records_and_lists() {
        let x = generate_xdr(&api_model()).unwrap();
        assert!(x.contains("struct guestfs_lvm_int_pv {\n  string pv_name<>;\n  opaque pv_uuid[32];\n"));
        assert!(x.contains("typedef struct guestfs_lvm_int_pv guestfs_lvm_int_pv_list<>;"));
        assert!(x.contains("  float snap_percent;\n"));
        assert!(x.contains("  hyper pv_size;\n"));
    }

    #[test]
    fn test_protocol_constants() {
        let x = generate_xdr(&api_model()).unwrap();
        assert!(x.contains("const GUESTFS_MESSAGE_MAX = 4194304;"));
        assert!(x.contains("const GUESTFS_PROGRAM = 0x2000F5F5;"));
        assert!(x.contains("const GUESTFS_PROTOCOL_VERSION = 1;"));
        assert!(x.contains("const GUESTFS_ERROR_LEN = 256;"));
        assert!(x.contains("GUESTFS_PROC_dummy\n};"));
    }

    #[test]
    fn test_client_only_calls_stay_off_the_wire() {
        let x = generate_xdr(&api_model()).unwrap();
        assert!(!x.contains("GUESTFS_PROC_SET_PATH"));
        assert!(!x.contains("guestfs_config_args"));
    }

    #[test]
    fn test_structured_list_ret_embeds_list_type() {
        let x = generate_xdr(&api_model()).unwrap();
        assert!(x.contains(
            "struct guestfs_pvs_full_ret {\n  guestfs_lvm_int_pv_list physvols;\n};\n"
        ));
    }
}
