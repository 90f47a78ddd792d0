//! Generated-file banners
//!
//! Every artefact starts with the same recognisable preamble: a "do not
//! edit" notice followed by the licence, wrapped in whichever comment
//! syntax the target language uses.

use std::fmt::Write as _;

/// Comment syntax of the target language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentStyle {
    /// `/* ... */` (C, XDR, XS)
    CStyle,
    /// `# ...` (Perl modules, POD)
    HashStyle,
    /// `(* ... *)` (OCaml)
    OCamlStyle,
}

/// Licence of the generated file.  Library-side artefacts are LGPL so
/// proprietary programs can link; the daemon and shell are GPL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum License {
    LGPLv2plus,
    GPLv2plus,
}

const NOTICE: &[&str] = &[
    "libguestfs generated file",
    "WARNING: THIS FILE IS GENERATED BY 'guestfs-gen'",
    "FROM THE API TABLE IN THE GENERATOR.",
    "ANY CHANGES YOU MAKE TO THIS FILE WILL BE LOST.",
    "",
    "Copyright (C) 2009 Guest image tools contributors",
];

const LGPL: &[&str] = &[
    "This library is free software; you can redistribute it and/or",
    "modify it under the terms of the GNU Lesser General Public",
    "License as published by the Free Software Foundation; either",
    "version 2 of the License, or (at your option) any later version.",
    "",
    "This library is distributed in the hope that it will be useful,",
    "but WITHOUT ANY WARRANTY; without even the implied warranty of",
    "MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU",
    "Lesser General Public License for more details.",
    "",
    "You should have received a copy of the GNU Lesser General Public",
    "License along with this library; if not, write to the Free Software",
    "Foundation, Inc., 51 Franklin Street, Fifth Floor, Boston, MA  02110-1301  USA",
];

const GPL: &[&str] = &[
    "This program is free software; you can redistribute it and/or modify",
    "it under the terms of the GNU General Public License as published by",
    "the Free Software Foundation; either version 2 of the License, or",
    "(at your option) any later version.",
    "",
    "This program is distributed in the hope that it will be useful,",
    "but WITHOUT ANY WARRANTY; without even the implied warranty of",
    "MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the",
    "GNU General Public License for more details.",
    "",
    "You should have received a copy of the GNU General Public License along",
    "with this program; if not, write to the Free Software Foundation, Inc.,",
    "51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.",
];

/// Render the standard top-of-file block, including the trailing blank
/// line that separates it from the first declaration.
pub fn generated_by(style: CommentStyle, license: License) -> String {
    let body = NOTICE
        .iter()
        .chain([""].iter())
        .chain(match license {
            License::LGPLv2plus => LGPL.iter(),
            License::GPLv2plus => GPL.iter(),
        })
        .copied();

    let mut out = String::new();
    match style {
        CommentStyle::CStyle => {
            for (i, line) in body.enumerate() {
                let lead = if i == 0 { "/* " } else { " * " };
                push_line(&mut out, lead, line);
            }
            out.push_str(" */\n");
        }
        CommentStyle::HashStyle => {
            for line in body {
                push_line(&mut out, "# ", line);
            }
        }
        CommentStyle::OCamlStyle => {
            for (i, line) in body.enumerate() {
                let lead = if i == 0 { "(* " } else { " * " };
                push_line(&mut out, lead, line);
            }
            out.push_str(" *)\n");
        }
    }
    out.push('\n');
    out
}

fn push_line(out: &mut String, lead: &str, line: &str) {
    if line.is_empty() {
        let _ = writeln!(out, "{}", lead.trim_end());
    } else {
        let _ = writeln!(out, "{}{}", lead, line);
    }
}
