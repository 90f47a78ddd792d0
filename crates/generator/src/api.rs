//! The authoritative API table
//!
//! One entry per library call, in declaration order. Daemon calls carry
//! their wire procedure number; once assigned a number is never reused,
//! so removed calls leave permanent gaps (18-25 are retired here).
//!
//! Adding a call to this table is the single edit needed to extend every
//! generated artefact at once.

use crate::model::{Arg, Call, Flag, Model, ReturnKind};

/// Build the full API model. Infallible; the validator checks it afterwards.
pub fn api_model() -> Model {
    let mut calls = Vec::new();
    calls.extend(client_calls());
    calls.extend(daemon_calls());
    Model { calls }
}

/// Calls implemented entirely inside the client library. These never
/// traverse the wire, so they have no procedure number and no stubs; they
/// still appear in the client header, the shell and all bindings.
fn client_calls() -> Vec<Call> {
    vec![
        Call::client("launch", ReturnKind::Err, vec![])
            .with_flag(Flag::FishAlias("run".to_string()))
            .with_flag(Flag::FishAction("launch".to_string()))
            .with_desc(
                "launch the qemu subprocess",
                r#"Internally libguestfs is implemented by running a virtual machine
using L<qemu(1)>.

You should call this after configuring the handle
(eg. adding drives) but before performing any actions."#,
            ),
        Call::client("wait_ready", ReturnKind::Err, vec![])
            .with_flag(Flag::NotInFish)
            .with_desc(
                "wait until the qemu subprocess launches",
                r#"Internally libguestfs is implemented by running a virtual machine
using L<qemu(1)>.

You should call this after C<guestfs_launch> to wait for the launch
to complete."#,
            ),
        Call::client("kill_subprocess", ReturnKind::Err, vec![]).with_desc(
            "kill the qemu subprocess",
            r#"This kills the qemu subprocess.  You should never need to call this."#,
        ),
        Call::client("add_drive", ReturnKind::Err, vec![Arg::string("filename")])
            .with_flag(Flag::FishAlias("add".to_string()))
            .with_desc(
                "add an image to examine or modify",
                r#"This function adds a virtual machine disk image C<filename> to the
guest.  The first time you call this function, the disk appears as IDE
disk 0 (C</dev/sda>) in the guest, the second time as C</dev/sdb>, and
so on.

You don't necessarily need to be root when using libguestfs.  However
you obviously do need sufficient permissions to access the filename
for whatever operations you want to perform (ie. read access if you
just want to read the image or write access if you want to modify the
image)."#,
            ),
        Call::client("add_cdrom", ReturnKind::Err, vec![Arg::string("filename")])
            .with_flag(Flag::FishAlias("cdrom".to_string()))
            .with_desc(
                "add a CD-ROM disk image to examine",
                r#"This function adds a virtual CD-ROM disk image to the guest.

This is equivalent to the qemu parameter C<-cdrom filename>."#,
            ),
        Call::client(
            "config",
            ReturnKind::Err,
            vec![Arg::string("qemuparam"), Arg::opt_string("qemuvalue")],
        )
        .with_desc(
            "add qemu parameters",
            r#"This can be used to add arbitrary qemu command line parameters
of the form C<-param value>.  Actually it's not quite arbitrary - we
prevent you from setting some parameters which would interfere with
parameters that we use.

The first character of C<qemuparam> must be a C<-> (dash).

C<qemuvalue> can be NULL."#,
        ),
        Call::client("set_path", ReturnKind::Err, vec![Arg::string("path")])
            .with_flag(Flag::FishAlias("path".to_string()))
            .with_desc(
                "set the search path",
                r#"Set the path that libguestfs searches for kernel and initrd.img.

The default is C<$libdir/guestfs> unless overridden by setting
C<LIBGUESTFS_PATH> environment variable.

The string C<path> is stashed in the libguestfs handle, so the caller
must make sure it remains valid for the lifetime of the handle.

Setting C<path> to C<NULL> restores the default path."#,
            ),
        Call::client(
            "get_path",
            ReturnKind::ConstString("path".to_string()),
            vec![],
        )
        .with_desc(
            "get the search path",
            r#"Return the current search path.

This is always non-NULL.  If it wasn't set already, then this will
return the default path."#,
        ),
        Call::client(
            "set_autosync",
            ReturnKind::Err,
            vec![Arg::bool("autosync")],
        )
        .with_flag(Flag::FishAlias("autosync".to_string()))
        .with_desc(
            "set autosync mode",
            r#"If C<autosync> is true, this enables autosync.  Libguestfs will make a
best effort attempt to run C<guestfs_sync> when the handle is closed
(also if the program exits without closing handles)."#,
        ),
        Call::client(
            "get_autosync",
            ReturnKind::Bool("autosync".to_string()),
            vec![],
        )
        .with_desc(
            "get autosync mode",
            r#"Get the autosync flag."#,
        ),
        Call::client("set_verbose", ReturnKind::Err, vec![Arg::bool("verbose")])
            .with_flag(Flag::FishAlias("verbose".to_string()))
            .with_desc(
                "set verbose mode",
                r#"If C<verbose> is true, this turns on verbose messages (to C<stderr>).

Verbose messages are disabled unless the environment variable
C<LIBGUESTFS_DEBUG> is defined and set to C<1>."#,
            ),
        Call::client(
            "get_verbose",
            ReturnKind::Bool("verbose".to_string()),
            vec![],
        )
        .with_desc(
            "get verbose mode",
            r#"This returns the verbose messages flag."#,
        ),
    ]
}

/// Calls implemented in the daemon, in procedure-number order.
fn daemon_calls() -> Vec<Call> {
    vec![
        Call::daemon(
            "mount",
            1,
            ReturnKind::Err,
            vec![Arg::string("device"), Arg::string("mountpoint")],
        )
        .with_desc(
            "mount a guest disk at a position in the filesystem",
            r#"Mount a guest disk at a position in the filesystem.  Block devices
are named C</dev/sda>, C</dev/sdb> and so on, as they were added to
the guest.  If those block devices contain partitions, they will have
the usual names (eg. C</dev/sda1>).  Also LVM C</dev/VG/LV>-style
names can be used.

The rules are the same as for L<mount(2)>:  A filesystem must
first be mounted on C</> before others can be mounted.  Other
filesystems can only be mounted on directories which already
exist.

The mounted filesystem is writable, if we have sufficient permissions
on the underlying device."#,
        ),
        Call::daemon("sync", 2, ReturnKind::Err, vec![]).with_desc(
            "sync disks, writes are flushed through to the disk image",
            r#"This syncs the disk, so that any writes are flushed through to the
underlying disk image.

You should always call this if you have modified a disk image, before
closing the handle."#,
        ),
        Call::daemon("touch", 3, ReturnKind::Err, vec![Arg::string("path")]).with_desc(
            "update file timestamps or create a new file",
            r#"Touch acts like the L<touch(1)> command.  It can be used to
update the timestamps on a file, or, if the file does not exist,
to create a new zero-length file."#,
        ),
        Call::daemon(
            "cat",
            4,
            ReturnKind::String("content".to_string()),
            vec![Arg::string("path")],
        )
        .with_flag(Flag::ProtocolLimitWarning)
        .with_desc(
            "list the contents of a file",
            r#"Return the contents of the file named C<path>.

Note that this function cannot correctly handle binary files
(specifically, files containing C<\0> character which is treated
as end of string).  For those you need to use the C<guestfs_read_file>
function which has a more complex interface."#,
        ),
        Call::daemon(
            "ll",
            5,
            ReturnKind::String("listing".to_string()),
            vec![Arg::string("directory")],
        )
        .with_desc(
            "list the files in a directory (long format)",
            r#"List the files in C<directory> (relative to the root directory,
there is no cwd) in the format of 'ls -la'.

This command is mostly useful for interactive sessions.  It
is I<not> intended that you try to parse the output string."#,
        ),
        Call::daemon(
            "ls",
            6,
            ReturnKind::StringList("listing".to_string()),
            vec![Arg::string("directory")],
        )
        .with_desc(
            "list the files in a directory",
            r#"List the files in C<directory> (relative to the root directory,
there is no cwd).  The '.' and '..' entries are not returned, but
hidden files are shown.

This command is mostly useful for interactive sessions."#,
        ),
        Call::daemon(
            "list_devices",
            7,
            ReturnKind::StringList("devices".to_string()),
            vec![],
        )
        .with_desc(
            "list the block devices",
            r#"List all the block devices.

The full block device names are returned, eg. C</dev/sda>"#,
        ),
        Call::daemon(
            "list_partitions",
            8,
            ReturnKind::StringList("partitions".to_string()),
            vec![],
        )
        .with_desc(
            "list the partitions",
            r#"List all the partitions detected on all block devices.

The full partition device names are returned, eg. C</dev/sda1>

This does not return logical volumes.  For that you will need to
call C<guestfs_lvs>."#,
        ),
        Call::daemon(
            "pvs",
            9,
            ReturnKind::StringList("physvols".to_string()),
            vec![],
        )
        .with_desc(
            "list the LVM physical volumes (PVs)",
            r#"List all the physical volumes detected.  This is the equivalent
of the L<pvs(8)> command.

This returns a list of just the device names that contain
PVs (eg. C</dev/sda2>).

See also C<guestfs_pvs_full>."#,
        ),
        Call::daemon(
            "vgs",
            10,
            ReturnKind::StringList("volgroups".to_string()),
            vec![],
        )
        .with_desc(
            "list the LVM volume groups (VGs)",
            r#"List all the volumes groups detected.  This is the equivalent
of the L<vgs(8)> command.

This returns a list of just the volume group names that were
detected (eg. C<VolGroup00>).

See also C<guestfs_vgs_full>."#,
        ),
        Call::daemon(
            "lvs",
            11,
            ReturnKind::StringList("logvols".to_string()),
            vec![],
        )
        .with_desc(
            "list the LVM logical volumes (LVs)",
            r#"List all the logical volumes detected.  This is the equivalent
of the L<lvs(8)> command.

This returns a list of the logical volume device names
(eg. C</dev/VolGroup00/LogVol00>).

See also C<guestfs_lvs_full>."#,
        ),
        Call::daemon(
            "pvs_full",
            12,
            ReturnKind::PvList("physvols".to_string()),
            vec![],
        )
        .with_desc(
            "list the LVM physical volumes (PVs)",
            r#"List all the physical volumes detected.  This is the equivalent
of the L<pvs(8)> command.  The "full" version includes all fields."#,
        ),
        Call::daemon(
            "vgs_full",
            13,
            ReturnKind::VgList("volgroups".to_string()),
            vec![],
        )
        .with_desc(
            "list the LVM volume groups (VGs)",
            r#"List all the volumes groups detected.  This is the equivalent
of the L<vgs(8)> command.  The "full" version includes all fields."#,
        ),
        Call::daemon(
            "lvs_full",
            14,
            ReturnKind::LvList("logvols".to_string()),
            vec![],
        )
        .with_desc(
            "list the LVM logical volumes (LVs)",
            r#"List all the logical volumes detected.  This is the equivalent
of the L<lvs(8)> command.  The "full" version includes all fields."#,
        ),
        Call::daemon(
            "read_lines",
            15,
            ReturnKind::StringList("lines".to_string()),
            vec![Arg::string("path")],
        )
        .with_flag(Flag::ProtocolLimitWarning)
        .with_desc(
            "read file as lines",
            r#"Return the contents of the file named C<path>.

The file contents are returned as a list of lines.  Trailing
C<LF> and C<CRLF> character sequences are I<not> returned.

Note that this function cannot correctly handle binary files
(specifically, files containing C<\0> character which is treated
as end of line).  For those you need to use the C<guestfs_read_file>
function which has a more complex interface."#,
        ),
        Call::daemon(
            "aug_defvar",
            16,
            ReturnKind::Int("nrnodes".to_string()),
            vec![Arg::string("name"), Arg::opt_string("expr")],
        )
        .with_desc(
            "define an Augeas variable",
            r#"Defines an Augeas variable C<name> whose value is the result
of evaluating C<expr>.  If C<expr> is NULL, then C<name> is
undefined.

On success this returns the number of nodes in C<expr>, or
C<0> if C<expr> evaluates to something which is not a nodeset."#,
        ),
        Call::daemon(
            "aug_defnode",
            17,
            ReturnKind::IntBool("nrnodes".to_string(), "created".to_string()),
            vec![
                Arg::string("name"),
                Arg::string("expr"),
                Arg::string("val"),
            ],
        )
        .with_desc(
            "define an Augeas node",
            r#"Defines a variable C<name> whose value is the result of
evaluating C<expr>.

If C<expr> evaluates to an empty nodeset, a node is created
with the value C<val>, and C<name> will be the nodeset
containing that single node.

On success this returns a pair containing the number of nodes
in the nodeset, and a boolean flag if a node was created."#,
        ),
        Call::daemon("rm", 26, ReturnKind::Err, vec![Arg::string("path")]).with_desc(
            "remove a file",
            r#"Remove the single file C<path>."#,
        ),
        Call::daemon("rmdir", 27, ReturnKind::Err, vec![Arg::string("path")]).with_desc(
            "remove a directory",
            r#"Remove the single directory C<path>."#,
        ),
        Call::daemon("mkdir", 28, ReturnKind::Err, vec![Arg::string("path")]).with_desc(
            "create a directory",
            r#"Create a directory named C<path>."#,
        ),
        Call::daemon("mkdir_p", 29, ReturnKind::Err, vec![Arg::string("path")]).with_desc(
            "create a directory and parents",
            r#"Create a directory named C<path>, creating any parent directories
as necessary.  This is like the C<mkdir -p> shell command."#,
        ),
        Call::daemon(
            "chmod",
            30,
            ReturnKind::Err,
            vec![Arg::int("mode"), Arg::string("path")],
        )
        .with_desc(
            "change file mode",
            r#"Change the mode (permissions) of C<path> to C<mode>.  Only
numeric modes are supported."#,
        ),
        Call::daemon(
            "chown",
            31,
            ReturnKind::Err,
            vec![
                Arg::int("owner"),
                Arg::int("group"),
                Arg::string("path"),
            ],
        )
        .with_desc(
            "change file owner and group",
            r#"Change the file owner to C<owner> and group to C<group>.

Only numeric uid and gid are supported.  If you want to use
names, you will need to locate and parse the password file
yourself (Augeas support makes this relatively easy)."#,
        ),
        Call::daemon(
            "exists",
            32,
            ReturnKind::Bool("existsflag".to_string()),
            vec![Arg::string("path")],
        )
        .with_desc(
            "test if file or directory exists",
            r#"This returns C<true> if and only if there is a file, directory
(or anything) with the given C<path> name.

See also C<guestfs_is_file>, C<guestfs_is_dir>."#,
        ),
        Call::daemon(
            "is_file",
            33,
            ReturnKind::Bool("fileflag".to_string()),
            vec![Arg::string("path")],
        )
        .with_desc(
            "test if file exists",
            r#"This returns C<true> if and only if there is a file
with the given C<path> name.  Note that it returns false for
other objects like directories.

See also C<guestfs_exists>."#,
        ),
        Call::daemon(
            "is_dir",
            34,
            ReturnKind::Bool("dirflag".to_string()),
            vec![Arg::string("path")],
        )
        .with_desc(
            "test if directory exists",
            r#"This returns C<true> if and only if there is a directory
with the given C<path> name.  Note that it returns false for
other objects like files.

See also C<guestfs_exists>."#,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Proc;

    #[test]
    fn test_table_is_valid() {
        let model = api_model();
        crate::validator::validate(&model).expect("shipped table must validate");
    }

    #[test]
    fn test_touch_and_cat_numbers() {
        // Wire numbers are a permanent contract.
        let model = api_model();
        assert_eq!(model.find("touch").unwrap().proc, Proc::Daemon(3));
        assert_eq!(model.find("cat").unwrap().proc, Proc::Daemon(4));
    }

    #[test]
    fn test_every_arg_count_is_exercised() {
        let model = api_model();
        for n in 0..=3 {
            assert!(
                model.calls.iter().any(|c| c.args.len() == n),
                "no call with {} arguments",
                n
            );
        }
    }

    #[test]
    fn test_client_calls_have_no_number() {
        let model = api_model();
        assert!(model.find("launch").unwrap().proc_number().is_none());
        assert!(model.find("get_path").unwrap().proc_number().is_none());
    }
}
