//! Public struct header backend
//!
//! Caller-visible definitions only.  The LVM structs must mirror the wire
//! layout bit for bit: the client library fills them by plain copy from
//! the decoded wire structs, so field types, widths and order all come
//! straight from the column schemas.

use super::EmitError;
use crate::banner::{generated_by, CommentStyle, License};
use crate::model::{ColKind, LvmKind, Model};
use std::fmt::Write as _;

pub fn generate_structs_h(_model: &Model) -> Result<String, EmitError> {
    let mut out = generated_by(CommentStyle::CStyle, License::LGPLv2plus);

    writeln!(out, "struct guestfs_int_bool {{")?;
    writeln!(out, "  int32_t i;")?;
    writeln!(out, "  int32_t b;")?;
    writeln!(out, "}};")?;
    writeln!(out)?;

    for kind in LvmKind::ALL {
        for line in record_decl_lines(kind) {
            writeln!(out, "{}", line)?;
        }
        writeln!(out)?;
        for line in list_decl_lines(kind) {
            writeln!(out, "{}", line)?;
        }
        writeln!(out)?;
    }

    Ok(out)
}

/// The public C declaration of one LVM record, line by line.  Shared with
/// the structs manual page, which quotes the declaration verbatim.
pub(crate) fn record_decl_lines(kind: LvmKind) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(format!("struct guestfs_lvm_{} {{", kind.name()));
    for (name, col) in kind.columns() {
        match col {
            ColKind::Str => lines.push(format!("  char *{};", name)),
            ColKind::Uuid => {
                lines.push(
                    "  /* The next field is NOT nul-terminated, be careful when printing it: */"
                        .to_string(),
                );
                lines.push(format!("  char {}[32];", name));
            }
            ColKind::Bytes => lines.push(format!("  uint64_t {};", name)),
            ColKind::Int64 => lines.push(format!("  int64_t {};", name)),
            ColKind::OptPercent => {
                lines.push(format!("  float {}; /* [0..100] or -1 */", name))
            }
        }
    }
    lines.push("};".to_string());
    lines
}

/// The matching length+array container declaration.
pub(crate) fn list_decl_lines(kind: LvmKind) -> Vec<String> {
    vec![
        format!("struct guestfs_lvm_{}_list {{", kind.name()),
        "  uint32_t len; /* Number of elements in list. */".to_string(),
        format!("  struct guestfs_lvm_{} *val; /* Elements. */", kind.name()),
        "};".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::api_model;

    #[test]
    fn test_int_bool_pair() {
        let h = generate_structs_h(&api_model()).unwrap();
        assert!(h.contains("struct guestfs_int_bool {\n  int32_t i;\n  int32_t b;\n};\n"));
    }

    #[test]
    fn test_pv_struct_matches_wire_layout() {
        let h = generate_structs_h(&api_model()).unwrap();
        // Order and widths are the wire contract.
        let pv = h.split("struct guestfs_lvm_pv {").nth(1).unwrap();
        let name_at = pv.find("char *pv_name;").unwrap();
        let uuid_at = pv.find("char pv_uuid[32];").unwrap();
        let size_at = pv.find("uint64_t pv_size;").unwrap();
        assert!(name_at < uuid_at && uuid_at < size_at);
    }

    #[test]
    fn test_uuid_carries_warning_comment() {
        let h = generate_structs_h(&api_model()).unwrap();
        assert!(h.contains("NOT nul-terminated"));
    }

    #[test]
    fn test_opt_percent_annotated() {
        let h = generate_structs_h(&api_model()).unwrap();
        assert!(h.contains("  float snap_percent; /* [0..100] or -1 */\n"));
    }

    #[test]
    fn test_list_containers() {
        let h = generate_structs_h(&api_model()).unwrap();
        for kind in ["pv", "vg", "lv"] {
            assert!(h.contains(&format!(
                "struct guestfs_lvm_{k}_list {{\n  uint32_t len; /* Number of elements in list. */\n  struct guestfs_lvm_{k} *val; /* Elements. */\n}};\n",
                k = kind
            )));
        }
    }
}
