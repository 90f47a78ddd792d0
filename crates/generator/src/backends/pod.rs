//! Manual-page backends
//!
//! Three documentation artefacts in POD markup: the client API manual
//! (every call, with a return-value clause per return kind), the shell
//! manual (shell-visible calls, library cross-references rewritten to
//! command names), and the struct manual quoting the public LVM
//! declarations with their annotations.
//!
//! All three list their calls alphabetically.

use super::{structs_h, EmitError, PROTOCOL_LIMIT_WARNING};
use crate::banner::{generated_by, CommentStyle, License};
use crate::model::{ArgKind, Call, LvmKind, Model, ReturnKind};
use crate::signature::{c_signature, SigFlavor};
use std::fmt::Write as _;

pub fn generate_actions_pod(model: &Model) -> Result<String, EmitError> {
    let mut out = generated_by(CommentStyle::HashStyle, License::LGPLv2plus);

    for call in model.sorted_calls() {
        writeln!(out, "=head2 guestfs_{}", call.name)?;
        writeln!(out)?;
        // Prototype as a verbatim block, without the extern keyword.
        let sig = c_signature(call, SigFlavor::CExtern);
        let sig = sig.trim_end();
        let sig = sig.strip_prefix("extern ").unwrap_or(sig);
        writeln!(out, " {}", sig)?;
        writeln!(out)?;
        writeln!(out, "{}", call.longdesc)?;
        writeln!(out)?;
        writeln!(out, "{}", return_clause(&call.ret))?;
        if call.protocol_limit_warning() {
            writeln!(out)?;
            writeln!(out, "{}", PROTOCOL_LIMIT_WARNING)?;
        }
        writeln!(out)?;
    }

    Ok(out)
}

/// The ownership and error-marker sentence for one return kind.
fn return_clause(ret: &ReturnKind) -> String {
    match ret {
        ReturnKind::Err => {
            "This function returns 0 on success or -1 on error.".to_string()
        }
        ReturnKind::Int(_) => "On error this function returns -1.".to_string(),
        ReturnKind::Bool(_) => {
            "This function returns a C truth value on success or -1 on error.".to_string()
        }
        ReturnKind::ConstString(_) => {
            "This function returns a string, or NULL on error.\nThe string is owned by the guest handle and must I<not> be freed."
                .to_string()
        }
        ReturnKind::String(_) => {
            "This function returns a string, or NULL on error.\nI<The caller must free the returned string after use>."
                .to_string()
        }
        ReturnKind::StringList(_) => {
            "This function returns a NULL-terminated array of strings\n(like L<environ(3)>), or NULL if there was an error.\nI<The caller must free the strings and the array after use>."
                .to_string()
        }
        ReturnKind::IntBool(_, _) => {
            "This function returns a C<struct guestfs_int_bool *>,\nor NULL if there was an error.\nI<The caller must call C<guestfs_free_int_bool> after use>."
                .to_string()
        }
        ReturnKind::PvList(_) | ReturnKind::VgList(_) | ReturnKind::LvList(_) => {
            let k = match ret {
                ReturnKind::PvList(_) => "pv",
                ReturnKind::VgList(_) => "vg",
                _ => "lv",
            };
            format!(
                "This function returns a C<struct guestfs_lvm_{k}_list *>\n(see E<lt>guestfs-structs.hE<gt>), or NULL if there was an error.\nI<The caller must call C<guestfs_free_lvm_{k}_list> after use>.",
                k = k
            )
        }
    }
}

pub fn generate_fish_pod(model: &Model) -> Result<String, EmitError> {
    let mut out = generated_by(CommentStyle::HashStyle, License::GPLv2plus);

    let mut calls: Vec<&Call> = model.calls.iter().filter(|c| c.in_fish()).collect();
    calls.sort_by_key(|c| c.fish_name());

    for call in calls {
        match call.fish_alias() {
            Some(alias) => writeln!(out, "=head2 {} | {}", call.fish_name(), alias)?,
            None => writeln!(out, "=head2 {}", call.fish_name())?,
        }
        writeln!(out)?;
        writeln!(out, " {}", fish_synopsis(call))?;
        writeln!(out)?;
        writeln!(out, "{}", call.longdesc.replace("C<guestfs_", "C<"))?;
        if call.protocol_limit_warning() {
            writeln!(out)?;
            writeln!(out, "{}", PROTOCOL_LIMIT_WARNING)?;
        }
        writeln!(out)?;
    }

    Ok(out)
}

fn fish_synopsis(call: &Call) -> String {
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

pub fn generate_structs_pod(_model: &Model) -> Result<String, EmitError> {
    let mut out = generated_by(CommentStyle::HashStyle, License::LGPLv2plus);

    for kind in LvmKind::ALL {
        writeln!(out, "=head2 guestfs_lvm_{}", kind.name())?;
        writeln!(out)?;
        for line in structs_h::record_decl_lines(kind) {
            writeln!(out, " {}", line)?;
        }
        writeln!(out)?;
        for line in structs_h::list_decl_lines(kind) {
            writeln!(out, " {}", line)?;
        }
        writeln!(out)?;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::api_model;

    #[test]
    fn test_actions_pod_is_alphabetical() {
        let p = generate_actions_pod(&api_model()).unwrap();
        let heads: Vec<&str> = p
            .lines()
            .filter(|l| l.starts_with("=head2 "))
            .collect();
        let mut sorted = heads.clone();
        sorted.sort();
        assert_eq!(heads, sorted);
        assert_eq!(heads.first(), Some(&"=head2 guestfs_add_cdrom"));
    }

    #[test]
    fn test_cat_entry_has_limit_warning_and_ownership() {
        let p = generate_actions_pod(&api_model()).unwrap();
        let cat = p.split("=head2 guestfs_cat").nth(1).unwrap();
        let cat = &cat[..cat.find("=head2 ").unwrap_or(cat.len())];
        assert!(cat.contains(" char *guestfs_cat (guestfs_h *handle, const char *path);"));
        assert!(cat.contains("I<The caller must free the returned string after use>."));
        assert!(cat.contains("transfer limit\nof somewhere between 2MB and 4MB"));
    }

    #[test]
    fn test_err_return_clause() {
        let p = generate_actions_pod(&api_model()).unwrap();
        let touch = p.split("=head2 guestfs_touch").nth(1).unwrap();
        assert!(touch.contains("This function returns 0 on success or -1 on error."));
    }

    #[test]
    fn test_structured_return_clause_names_free_routine() {
        let p = generate_actions_pod(&api_model()).unwrap();
        assert!(p.contains("C<guestfs_free_lvm_pv_list>"));
        assert!(p.contains("C<guestfs_free_int_bool>"));
    }

    #[test]
    fn test_api_references_kept_in_actions_pod() {
        let p = generate_actions_pod(&api_model()).unwrap();
        assert!(p.contains("C<guestfs_pvs_full>"));
    }

    #[test]
    fn test_fish_pod_uses_hyphenated_names_and_aliases() {
        let p = generate_fish_pod(&api_model()).unwrap();
        assert!(p.contains("=head2 set-path | path"));
        assert!(p.contains("=head2 cat\n"));
        assert!(!p.contains("C<guestfs_"));
        assert!(!p.contains("wait-ready"));
    }

    #[test]
    fn test_fish_pod_synopsis() {
        let p = generate_fish_pod(&api_model()).unwrap();
        assert!(p.contains("\n mount <device> <mountpoint>\n"));
        assert!(p.contains("\n set-autosync <true|false>\n"));
    }

    #[test]
    fn test_structs_pod_quotes_declarations() {
        let p = generate_structs_pod(&api_model()).unwrap();
        assert!(p.contains("=head2 guestfs_lvm_pv\n"));
        assert!(p.contains("\n struct guestfs_lvm_pv {\n"));
        assert!(p.contains("  /* The next field is NOT nul-terminated"));
        assert!(p.contains("  float snap_percent; /* [0..100] or -1 */"));
        assert!(p.contains("  uint32_t len; /* Number of elements in list. */"));
    }
}
