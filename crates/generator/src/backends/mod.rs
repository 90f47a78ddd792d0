//! Output backends
//!
//! One module per artefact family.  Each backend is a pure function of the
//! model: it walks the call table and returns the complete file contents
//! as a string.  The driver owns the sinks; nothing here touches the
//! filesystem, which is what makes the determinism tests cheap.

pub mod actions_h;
pub mod client;
pub mod daemon;
pub mod fish;
pub mod ocaml;
pub mod perl;
pub mod pod;
pub mod structs_h;
pub mod xdr;

use crate::model::Model;

/// Fixed notice appended to the documentation of calls whose payload can
/// hit the wire message ceiling.
pub const PROTOCOL_LIMIT_WARNING: &str = "Because of the message protocol, there is a transfer limit\nof somewhere between 2MB and 4MB.  To transfer large files you should use\nFTP.";

/// Error type for backend emission.
///
/// Allows `?` propagation for both logical errors (a model shape a backend
/// cannot express) and formatting errors from writing into the buffer.
#[derive(Debug)]
pub enum EmitError {
    /// A logical error in emission (e.g. a return kind that cannot appear
    /// on this surface).
    Logic(String),
    /// A formatting error while writing output.
    Format(std::fmt::Error),
}

impl std::fmt::Display for EmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmitError::Logic(s) => write!(f, "{}", s),
            EmitError::Format(e) => write!(f, "emission error: {}", e),
        }
    }
}

impl std::error::Error for EmitError {}

impl From<String> for EmitError {
    fn from(s: String) -> Self {
        EmitError::Logic(s)
    }
}

impl From<std::fmt::Error> for EmitError {
    fn from(e: std::fmt::Error) -> Self {
        EmitError::Format(e)
    }
}

/// One generated file: where it goes and how to produce it.
pub struct Artefact {
    /// Path relative to the build tree root.
    pub path: &'static str,
    pub generate: fn(&Model) -> Result<String, EmitError>,
}

/// Every artefact the generator produces, in emission order.
pub fn artefacts() -> Vec<Artefact> {
    vec![
        Artefact {
            path: "src/guestfs_protocol.x",
            generate: xdr::generate_xdr,
        },
        Artefact {
            path: "src/guestfs-structs.h",
            generate: structs_h::generate_structs_h,
        },
        Artefact {
            path: "src/guestfs-actions.h",
            generate: actions_h::generate_actions_h,
        },
        Artefact {
            path: "src/guestfs-actions.c",
            generate: client::generate_client_actions,
        },
        Artefact {
            path: "daemon/actions.h",
            generate: daemon::generate_daemon_actions_h,
        },
        Artefact {
            path: "daemon/stubs.c",
            generate: daemon::generate_daemon_stubs,
        },
        Artefact {
            path: "fish/cmds.c",
            generate: fish::generate_fish_cmds,
        },
        Artefact {
            path: "src/guestfs-actions.pod",
            generate: pod::generate_actions_pod,
        },
        Artefact {
            path: "fish/guestfish-actions.pod",
            generate: pod::generate_fish_pod,
        },
        Artefact {
            path: "src/guestfs-structs.pod",
            generate: pod::generate_structs_pod,
        },
        Artefact {
            path: "ocaml/guestfs.mli",
            generate: ocaml::generate_ocaml_mli,
        },
        Artefact {
            path: "ocaml/guestfs.ml",
            generate: ocaml::generate_ocaml_ml,
        },
        Artefact {
            path: "ocaml/guestfs_c_actions.c",
            generate: ocaml::generate_ocaml_c,
        },
        Artefact {
            path: "perl/Guestfs.xs",
            generate: perl::generate_perl_xs,
        },
        Artefact {
            path: "perl/lib/Sys/Guestfs.pm",
            generate: perl::generate_perl_pm,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_artefact_generates_deterministically() {
        let model = crate::api::api_model();
        for artefact in artefacts() {
            let one = (artefact.generate)(&model).unwrap();
            let two = (artefact.generate)(&model).unwrap();
            assert_eq!(one, two, "{} is not deterministic", artefact.path);
            assert!(!one.is_empty(), "{} is empty", artefact.path);
        }
    }

    #[test]
    fn test_every_artefact_carries_the_banner() {
        let model = crate::api::api_model();
        for artefact in artefacts() {
            let text = (artefact.generate)(&model).unwrap();
            assert!(
                text.contains("generated file"),
                "{} lacks the generated-file banner",
                artefact.path
            );
            assert!(
                text.ends_with('\n'),
                "{} does not end with a newline",
                artefact.path
            );
        }
    }

    #[test]
    fn test_alphabetical_artefacts_ignore_declaration_order() {
        // The manuals sort by name, so permuting the table must not
        // change a byte.  (Headers and stub files follow declaration
        // order on purpose and are exempt.)
        let model = crate::api::api_model();
        let mut reversed = model.clone();
        reversed.calls.reverse();

        assert_eq!(
            pod::generate_actions_pod(&model).unwrap(),
            pod::generate_actions_pod(&reversed).unwrap()
        );
        assert_eq!(
            pod::generate_fish_pod(&model).unwrap(),
            pod::generate_fish_pod(&reversed).unwrap()
        );
    }

    #[test]
    fn test_artefact_paths_are_unique() {
        let list = artefacts();
        for (i, a) in list.iter().enumerate() {
            for b in &list[i + 1..] {
                assert_ne!(a.path, b.path);
            }
        }
    }
}
