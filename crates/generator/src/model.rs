//! Typed model of the library API
//!
//! Everything the generator emits is a projection of the entities in this
//! module: calls with typed argument vectors and return kinds, the flag set
//! that modulates shell and documentation output, and the fixed column
//! schemas of the three LVM record types.
//!
//! The model is pure data. It is built once at start-up by [`crate::api`],
//! checked by [`crate::validator`], and never mutated by a backend.

/// Kind of a single call argument.
///
/// Arguments are positional; a call carries at most three of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// Non-null constant text.
    Str,
    /// Text that may be absent.
    OptStr,
    /// True / false.
    Bool,
    /// Signed integer. At most 31 bits of magnitude, even though it wires
    /// as a full 32-bit signed field.
    Int,
}

/// A named, typed call argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub name: String,
    pub kind: ArgKind,
}

impl Arg {
    pub fn new(name: &str, kind: ArgKind) -> Self {
        Arg {
            name: name.to_string(),
            kind,
        }
    }

    pub fn string(name: &str) -> Self {
        Arg::new(name, ArgKind::Str)
    }

    pub fn opt_string(name: &str) -> Self {
        Arg::new(name, ArgKind::OptStr)
    }

    pub fn bool(name: &str) -> Self {
        Arg::new(name, ArgKind::Bool)
    }

    pub fn int(name: &str) -> Self {
        Arg::new(name, ArgKind::Int)
    }
}

/// Return discipline of a call.
///
/// Every variant except [`ReturnKind::Err`] carries the field name(s) used
/// when the value is materialised into a wire struct, a binding record, or
/// documentation prose.
#[derive(Debug, Clone, PartialEq)]
pub enum ReturnKind {
    /// Success / failure indication only. 0 on success, -1 on error.
    Err,
    /// Non-negative integer on success, -1 on error.
    Int(String),
    /// Boolean on success, -1 on error.
    Bool(String),
    /// Text owned by the library. Forbidden on daemon calls: there is no
    /// thread-safe place to retain the string between calls.
    ConstString(String),
    /// Heap text the caller must free.
    String(String),
    /// Null-terminated array of heap text the caller must free.
    StringList(String),
    /// An (integer, boolean) pair, returned as a caller-owned struct.
    IntBool(String, String),
    /// Caller-owned list of physical-volume records.
    PvList(String),
    /// Caller-owned list of volume-group records.
    VgList(String),
    /// Caller-owned list of logical-volume records.
    LvList(String),
}

impl ReturnKind {
    /// True for kinds whose C error marker is -1 rather than NULL.
    pub fn error_marker_is_int(&self) -> bool {
        matches!(
            self,
            ReturnKind::Err | ReturnKind::Int(_) | ReturnKind::Bool(_)
        )
    }
}

/// Optional annotations modulating shell and documentation output.
#[derive(Debug, Clone, PartialEq)]
pub enum Flag {
    /// Append the fixed transfer-ceiling notice to the call's manual entry.
    ProtocolLimitWarning,
    /// Extra name the shell accepts for this command.
    FishAlias(String),
    /// Shell-side function invoked instead of the library call.
    FishAction(String),
    /// Exclude the call from the shell dispatcher and the shell manual.
    NotInFish,
}

/// Where a call's implementation lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Proc {
    /// Implemented in the daemon; the number identifies it on the wire.
    /// Strictly positive, globally unique, permanently retired on removal.
    Daemon(u32),
    /// Implemented entirely in the client library; never on the wire.
    Client,
}

/// One entry in the API table.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// Public identifier, used unchanged in the generated client API.
    /// Letters, digits and underscores only.
    pub name: String,
    pub ret: ReturnKind,
    /// 0 to 3 positional arguments.
    pub args: Vec<Arg>,
    pub proc: Proc,
    pub flags: Vec<Flag>,
    /// One-line summary for tables and listings.
    pub shortdesc: String,
    /// Multi-paragraph prose in manual-page markup. Must not end with a
    /// line terminator.
    pub longdesc: String,
}

impl Call {
    /// A call implemented in the daemon, reachable over the wire.
    pub fn daemon(name: &str, num: u32, ret: ReturnKind, args: Vec<Arg>) -> Self {
        Call {
            name: name.to_string(),
            ret,
            args,
            proc: Proc::Daemon(num),
            flags: Vec::new(),
            shortdesc: String::new(),
            longdesc: String::new(),
        }
    }

    /// A call implemented entirely in the client library.
    pub fn client(name: &str, ret: ReturnKind, args: Vec<Arg>) -> Self {
        Call {
            name: name.to_string(),
            ret,
            args,
            proc: Proc::Client,
            flags: Vec::new(),
            shortdesc: String::new(),
            longdesc: String::new(),
        }
    }

    pub fn with_flag(mut self, flag: Flag) -> Self {
        self.flags.push(flag);
        self
    }

    pub fn with_desc(mut self, shortdesc: &str, longdesc: &str) -> Self {
        self.shortdesc = shortdesc.to_string();
        self.longdesc = longdesc.to_string();
        self
    }

    pub fn is_daemon(&self) -> bool {
        matches!(self.proc, Proc::Daemon(_))
    }

    pub fn proc_number(&self) -> Option<u32> {
        match self.proc {
            Proc::Daemon(n) => Some(n),
            Proc::Client => None,
        }
    }

    /// Shell-facing spelling: underscores become hyphens.
    pub fn fish_name(&self) -> String {
        self.name.replace('_', "-")
    }

    pub fn in_fish(&self) -> bool {
        !self.flags.contains(&Flag::NotInFish)
    }

    pub fn fish_alias(&self) -> Option<&str> {
        self.flags.iter().find_map(|f| match f {
            Flag::FishAlias(a) => Some(a.as_str()),
            _ => None,
        })
    }

    pub fn fish_action(&self) -> Option<&str> {
        self.flags.iter().find_map(|f| match f {
            Flag::FishAction(a) => Some(a.as_str()),
            _ => None,
        })
    }

    pub fn protocol_limit_warning(&self) -> bool {
        self.flags.contains(&Flag::ProtocolLimitWarning)
    }
}

/// Kind of one column of an LVM record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColKind {
    /// Heap text.
    Str,
    /// Fixed 32 bytes, not null-terminated.
    Uuid,
    /// Unsigned 64-bit size in bytes.
    Bytes,
    /// Signed 64-bit integer.
    Int64,
    /// Float in [0, 100], or -1 meaning "not present".
    OptPercent,
}

/// The three structured record types the daemon extracts from LVM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LvmKind {
    Pv,
    Vg,
    Lv,
}

impl LvmKind {
    pub const ALL: [LvmKind; 3] = [LvmKind::Pv, LvmKind::Vg, LvmKind::Lv];

    /// Short name: the `<kind>` in `lvm <kind>s` and in type names.
    pub fn name(self) -> &'static str {
        match self {
            LvmKind::Pv => "pv",
            LvmKind::Vg => "vg",
            LvmKind::Lv => "lv",
        }
    }

    /// Column order is a global contract: it fixes the field order on the
    /// wire, in the public C structs, in binding records, and the token
    /// order of the `lvm --separator ,` output.
    pub fn columns(self) -> &'static [(&'static str, ColKind)] {
        match self {
            LvmKind::Pv => PV_COLUMNS,
            LvmKind::Vg => VG_COLUMNS,
            LvmKind::Lv => LV_COLUMNS,
        }
    }
}

pub const PV_COLUMNS: &[(&str, ColKind)] = &[
    ("pv_name", ColKind::Str),
    ("pv_uuid", ColKind::Uuid),
    ("pv_fmt", ColKind::Str),
    ("pv_size", ColKind::Bytes),
    ("dev_size", ColKind::Bytes),
    ("pv_free", ColKind::Bytes),
    ("pv_used", ColKind::Bytes),
    ("pv_attr", ColKind::Str),
    ("pv_pe_count", ColKind::Int64),
    ("pv_pe_alloc_count", ColKind::Int64),
    ("pv_tags", ColKind::Str),
    ("pe_start", ColKind::Bytes),
    ("pv_mda_count", ColKind::Int64),
    ("pv_mda_free", ColKind::Bytes),
];

pub const VG_COLUMNS: &[(&str, ColKind)] = &[
    ("vg_name", ColKind::Str),
    ("vg_uuid", ColKind::Uuid),
    ("vg_fmt", ColKind::Str),
    ("vg_attr", ColKind::Str),
    ("vg_size", ColKind::Bytes),
    ("vg_free", ColKind::Bytes),
    ("vg_sysid", ColKind::Str),
    ("vg_extent_size", ColKind::Bytes),
    ("vg_extent_count", ColKind::Int64),
    ("vg_free_count", ColKind::Int64),
    ("max_lv", ColKind::Int64),
    ("max_pv", ColKind::Int64),
    ("pv_count", ColKind::Int64),
    ("lv_count", ColKind::Int64),
    ("snap_count", ColKind::Int64),
    ("vg_seqno", ColKind::Int64),
    ("vg_tags", ColKind::Str),
    ("vg_mda_count", ColKind::Int64),
    ("vg_mda_free", ColKind::Bytes),
];

pub const LV_COLUMNS: &[(&str, ColKind)] = &[
    ("lv_name", ColKind::Str),
    ("lv_uuid", ColKind::Uuid),
    ("lv_attr", ColKind::Str),
    ("major", ColKind::Int64),
    ("minor", ColKind::Int64),
    ("kernel_major", ColKind::Int64),
    ("kernel_minor", ColKind::Int64),
    ("lv_size", ColKind::Bytes),
    ("seg_count", ColKind::Int64),
    ("origin", ColKind::Str),
    ("snap_percent", ColKind::OptPercent),
    ("copy_percent", ColKind::OptPercent),
    ("move_pv", ColKind::Str),
    ("lv_tags", ColKind::Str),
    ("mirror_log", ColKind::Str),
    ("modules", ColKind::Str),
];

/// The whole API table, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub calls: Vec<Call>,
}

impl Model {
    /// Daemon calls in declaration order (which is procedure-number order
    /// in the shipped table; the validator enforces it).
    pub fn daemon_calls(&self) -> impl Iterator<Item = &Call> {
        self.calls.iter().filter(|c| c.is_daemon())
    }

    /// All calls sorted by public name, for the artefacts that list
    /// alphabetically.
    pub fn sorted_calls(&self) -> Vec<&Call> {
        let mut calls: Vec<&Call> = self.calls.iter().collect();
        calls.sort_by(|a, b| a.name.cmp(&b.name));
        calls
    }

    pub fn find(&self, name: &str) -> Option<&Call> {
        self.calls.iter().find(|c| c.name == name)
    }
}
