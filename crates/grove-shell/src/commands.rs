//! Command registry and handlers.
//!
//! Every command owns its option grammar (a clap parser applied to the
//! tokenized line) and resolves path arguments against the working
//! context. Expected per-path failures print a scoped line and let
//! sibling paths proceed; session-level failures propagate to the
//! dispatch loop.

use std::io::Write;

use anyhow::Result;
use clap::{CommandFactory, Parser};

use grove_client::{Client, Node};
use grove_model::acl::{merge_acls, remove_acls};
use grove_model::{Acl, Disposition, GroveError, Id, NodePath};

use crate::encoding::Encoding;
use crate::find;
use crate::render;
use crate::shell::{LoopSignal, ShellContext};

/// The fixed command registry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CommandKind {
    /// Change the working path.
    Cd,
    /// Print the working path.
    Pwd,
    /// List children.
    Ls,
    /// Print node data.
    Get,
    /// Overwrite node data.
    Set,
    /// Print node status.
    Stat,
    /// Print a node's ACL list.
    GetAcl,
    /// Modify a node's ACL list.
    SetAcl,
    /// Create a node.
    Mk,
    /// Delete a node.
    Rm,
    /// Match names and run a subcommand per match.
    Find,
    /// Print session configuration.
    Config,
    /// Print command help.
    Help,
    /// Leave the shell.
    Quit,
}

impl CommandKind {
    /// All commands, in help-listing order.
    pub fn all() -> &'static [CommandKind] {
        &[
            CommandKind::Cd,
            CommandKind::Pwd,
            CommandKind::Ls,
            CommandKind::Get,
            CommandKind::Set,
            CommandKind::Stat,
            CommandKind::GetAcl,
            CommandKind::SetAcl,
            CommandKind::Mk,
            CommandKind::Rm,
            CommandKind::Find,
            CommandKind::Config,
            CommandKind::Help,
            CommandKind::Quit,
        ]
    }

    /// Primary name.
    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::Cd => "cd",
            CommandKind::Pwd => "pwd",
            CommandKind::Ls => "ls",
            CommandKind::Get => "get",
            CommandKind::Set => "set",
            CommandKind::Stat => "stat",
            CommandKind::GetAcl => "getacl",
            CommandKind::SetAcl => "setacl",
            CommandKind::Mk => "mk",
            CommandKind::Rm => "rm",
            CommandKind::Find => "find",
            CommandKind::Config => "config",
            CommandKind::Help => "help",
            CommandKind::Quit => "quit",
        }
    }

    /// Alternate names accepted at the prompt.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            CommandKind::Ls => &["dir"],
            CommandKind::Stat => &["info"],
            CommandKind::Mk => &["create"],
            CommandKind::Rm => &["del"],
            CommandKind::Quit => &["exit"],
            _ => &[],
        }
    }

    /// One-line description for the help listing.
    pub fn about(&self) -> &'static str {
        match self {
            CommandKind::Cd => "Change the working path",
            CommandKind::Pwd => "Print the working path",
            CommandKind::Ls => "List the children of one or more nodes",
            CommandKind::Get => "Print the data of one or more nodes",
            CommandKind::Set => "Overwrite a node's data",
            CommandKind::Stat => "Print the status of one or more nodes",
            CommandKind::GetAcl => "Print a node's ACL list",
            CommandKind::SetAcl => "Replace, merge into, or prune a node's ACL list",
            CommandKind::Mk => "Create a node",
            CommandKind::Rm => "Delete a node",
            CommandKind::Find => "Match child names against a pattern and run a subcommand per match",
            CommandKind::Config => "Print session configuration",
            CommandKind::Help => "Print command help",
            CommandKind::Quit => "Leave the shell",
        }
    }

    /// Resolves a typed name, including aliases.
    pub fn lookup(name: &str) -> Option<CommandKind> {
        CommandKind::all()
            .iter()
            .copied()
            .find(|kind| kind.name() == name || kind.aliases().contains(&name))
    }

    /// Full usage text.
    pub fn usage(&self) -> String {
        let mut command = match self {
            CommandKind::Cd => CdArgs::command(),
            CommandKind::Pwd => PwdArgs::command(),
            CommandKind::Ls => LsArgs::command(),
            CommandKind::Get => GetArgs::command(),
            CommandKind::Set => SetArgs::command(),
            CommandKind::Stat => StatArgs::command(),
            CommandKind::GetAcl => GetAclArgs::command(),
            CommandKind::SetAcl => SetAclArgs::command(),
            CommandKind::Mk => MkArgs::command(),
            CommandKind::Rm => RmArgs::command(),
            CommandKind::Find => find::FindArgs::command(),
            CommandKind::Config => ConfigArgs::command(),
            CommandKind::Help => HelpArgs::command(),
            CommandKind::Quit => QuitArgs::command(),
        };
        command.render_long_help().to_string()
    }
}

/// Runs one tokenized command against the context.
pub async fn dispatch(
    tokens: &[String],
    ctx: &mut ShellContext,
    client: &Client,
) -> Result<LoopSignal> {
    let Some(first) = tokens.first() else {
        return Ok(LoopSignal::Continue);
    };
    let Some(kind) = CommandKind::lookup(first) else {
        println!("unknown command '{first}' (try help)");
        return Ok(LoopSignal::Continue);
    };
    match kind {
        CommandKind::Cd => cmd_cd(tokens, ctx, client).await?,
        CommandKind::Pwd => cmd_pwd(tokens, ctx, client).await?,
        CommandKind::Ls => cmd_ls(tokens, ctx, client).await?,
        CommandKind::Get => cmd_get(tokens, ctx, client).await?,
        CommandKind::Set => cmd_set(tokens, ctx, client).await?,
        CommandKind::Stat => cmd_stat(tokens, ctx, client).await?,
        CommandKind::GetAcl => cmd_getacl(tokens, ctx, client).await?,
        CommandKind::SetAcl => cmd_setacl(tokens, ctx, client).await?,
        CommandKind::Mk => cmd_mk(tokens, ctx, client).await?,
        CommandKind::Rm => cmd_rm(tokens, ctx, client).await?,
        CommandKind::Find => find::cmd_find(tokens, ctx, client).await?,
        CommandKind::Config => cmd_config(tokens, ctx, client).await?,
        CommandKind::Help => cmd_help(tokens)?,
        CommandKind::Quit => return Ok(LoopSignal::Quit),
    }
    Ok(LoopSignal::Continue)
}

/// Parses the tokenized line with a command's clap grammar, printing the
/// rendered error (or requested help) on failure.
pub(crate) fn parse_args<T: Parser>(tokens: &[String]) -> Option<T> {
    match T::try_parse_from(tokens) {
        Ok(args) => Some(args),
        Err(err) => {
            let _ = err.print();
            None
        }
    }
}

/// Resolves a path argument against the working path and collapses
/// `.`/`..` segments.
pub(crate) fn resolve(ctx: &ShellContext, arg: &str) -> NodePath {
    ctx.cwd.resolve(&NodePath::new(arg)).normalize()
}

/// Per-path failure policy: expected failures print and yield `None` so
/// sibling paths proceed; session-level failures propagate.
pub(crate) fn report<T>(result: Result<T, GroveError>) -> Result<Option<T>, GroveError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_session_level() => Err(err),
        Err(err) => {
            println!("{err}");
            Ok(None)
        }
    }
}

/// Materializes a data argument: `@FILE` reads the file's raw bytes,
/// anything else is encoded per the charset.
pub(crate) fn payload(arg: Option<&str>, encoding: Encoding) -> Result<Vec<u8>, String> {
    match arg {
        None => Ok(Vec::new()),
        Some(arg) => match arg.strip_prefix('@') {
            Some(file) => std::fs::read(file).map_err(|err| format!("{file}: {err}")),
            None => encoding.encode(arg).map_err(|err| err.to_string()),
        },
    }
}

/// Maps the mk-style flag set onto a creation disposition. Conflicting
/// combinations are already rejected by the clap grammars.
pub(crate) fn disposition_from_flags(
    container: bool,
    ephemeral: bool,
    sequential: bool,
    has_ttl: bool,
) -> Disposition {
    match (container, ephemeral, sequential, has_ttl) {
        (true, _, _, _) => Disposition::Container,
        (_, true, true, _) => Disposition::EphemeralSequential,
        (_, true, false, _) => Disposition::Ephemeral,
        (_, false, true, true) => Disposition::PersistentSequentialTtl,
        (_, false, false, true) => Disposition::PersistentTtl,
        (_, false, true, false) => Disposition::PersistentSequential,
        (_, false, false, false) => Disposition::Persistent,
    }
}

/// Enforces the `--version N | --force` choice shared by the mutating
/// commands.
pub(crate) fn version_guard(
    version: Option<i32>,
    force: bool,
    command: &str,
) -> Result<Option<i32>, String> {
    match (version, force) {
        (Some(v), false) => Ok(Some(v)),
        (None, true) => Ok(None),
        _ => Err(format!("{command}: one of --version or --force is required")),
    }
}

#[derive(Parser)]
#[command(name = "cd", about = "Change the working path", disable_version_flag = true)]
struct CdArgs {
    /// Verify the target exists before changing
    #[arg(short, long)]
    check: bool,

    /// Target path, or `-` for the previous working path; defaults to `/`
    target: Option<String>,
}

async fn cmd_cd(tokens: &[String], ctx: &mut ShellContext, client: &Client) -> Result<()> {
    let Some(args) = parse_args::<CdArgs>(tokens) else {
        return Ok(());
    };
    let target = match args.target.as_deref() {
        None => NodePath::root(),
        Some("-") => match &ctx.last {
            Some(last) => last.clone(),
            None => {
                println!("cd: no previous path");
                return Ok(());
            }
        },
        Some(arg) => resolve(ctx, arg),
    };
    if args.check {
        match report(client.exists(&target).await)? {
            Some(Some(_)) => {}
            Some(None) => {
                println!("{target}: no such node");
                return Ok(());
            }
            None => return Ok(()),
        }
    }
    ctx.last = Some(std::mem::replace(&mut ctx.cwd, target));
    Ok(())
}

#[derive(Parser)]
#[command(name = "pwd", about = "Print the working path", disable_version_flag = true)]
struct PwdArgs {
    /// Also verify the working path still exists
    #[arg(short, long)]
    check: bool,
}

async fn cmd_pwd(tokens: &[String], ctx: &mut ShellContext, client: &Client) -> Result<()> {
    let Some(args) = parse_args::<PwdArgs>(tokens) else {
        return Ok(());
    };
    println!("{}", ctx.cwd);
    if args.check {
        if let Some(status) = report(client.exists(&ctx.cwd).await)? {
            if status.is_none() {
                println!("{}: no such node", ctx.cwd);
            }
        }
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "ls", about = "List the children of one or more nodes", disable_version_flag = true)]
struct LsArgs {
    /// Recurse into the whole subtree
    #[arg(short, long)]
    recursive: bool,

    /// One row per child with version, size, and child count
    #[arg(short, long)]
    long: bool,

    /// Paths to list; defaults to the working path
    paths: Vec<String>,
}

async fn cmd_ls(tokens: &[String], ctx: &mut ShellContext, client: &Client) -> Result<()> {
    let Some(args) = parse_args::<LsArgs>(tokens) else {
        return Ok(());
    };
    let targets = resolve_targets(ctx, &args.paths);
    let multi = targets.len() > 1;
    for (i, target) in targets.iter().enumerate() {
        if multi {
            if i > 0 {
                println!();
            }
            println!("{target}:");
        }
        if args.recursive {
            ls_recursive(client, target, args.long).await?;
        } else if let Some(names) = report(client.children(target).await)? {
            for name in names {
                if args.long {
                    let child = target.child(&name);
                    match report(client.exists(&child).await)? {
                        Some(Some(status)) => println!("{}", render::long_row(&status, &name)),
                        // Deleted between listing and stat; show the bare name.
                        Some(None) | None => println!("{name}"),
                    }
                } else {
                    println!("{name}");
                }
            }
        }
    }
    Ok(())
}

async fn ls_recursive(client: &Client, base: &NodePath, long: bool) -> Result<()> {
    let mut stack = Vec::new();
    if let Some(names) = report(client.children(base).await)? {
        for name in names.into_iter().rev() {
            stack.push(base.child(&name));
        }
    }
    while let Some(path) = stack.pop() {
        if long {
            match report(client.exists(&path).await)? {
                Some(Some(status)) => println!("{}", render::long_row(&status, path.as_str())),
                Some(None) | None => println!("{path}"),
            }
        } else {
            println!("{path}");
        }
        match client.children(&path).await {
            Ok(names) => {
                for name in names.into_iter().rev() {
                    stack.push(path.child(&name));
                }
            }
            // The node vanished mid-walk; its subtree is gone with it.
            Err(GroveError::NoNode { .. }) => {}
            Err(err) if err.is_session_level() => return Err(err.into()),
            Err(err) => println!("{err}"),
        }
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "get", about = "Print the data of one or more nodes", disable_version_flag = true)]
struct GetArgs {
    /// Hex-dump the data (the default)
    #[arg(long, conflicts_with_all = ["string", "binary"])]
    hex: bool,

    /// Decode the data as text
    #[arg(short, long, conflicts_with = "binary")]
    string: bool,

    /// Write the raw bytes to stdout
    #[arg(short, long)]
    binary: bool,

    /// Charset for --string (defaults to the session charset)
    #[arg(short, long)]
    encoding: Option<Encoding>,

    /// Paths to read; defaults to the working path
    paths: Vec<String>,
}

async fn cmd_get(tokens: &[String], ctx: &mut ShellContext, client: &Client) -> Result<()> {
    let Some(args) = parse_args::<GetArgs>(tokens) else {
        return Ok(());
    };
    let encoding = args.encoding.unwrap_or(ctx.default_encoding);
    let targets = resolve_targets(ctx, &args.paths);
    let multi = targets.len() > 1;
    for (i, target) in targets.iter().enumerate() {
        if multi && !args.binary {
            if i > 0 {
                println!();
            }
            println!("{target}:");
        }
        let Some((data, _)) = report(client.get(target).await)? else {
            continue;
        };
        if args.binary {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&data)?;
            stdout.flush()?;
        } else if args.string {
            match encoding.decode(&data) {
                Ok(text) => println!("{text}"),
                Err(err) => println!("{target}: {err}"),
            }
        } else {
            // --hex merely pins the default display.
            let _ = args.hex;
            print!("{}", render::hex_dump(&data));
        }
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "set", about = "Overwrite a node's data", disable_version_flag = true)]
struct SetArgs {
    /// Charset for the data argument
    #[arg(short, long)]
    encoding: Option<Encoding>,

    /// Expected data version
    #[arg(short = 'v', long, conflicts_with = "force")]
    version: Option<i32>,

    /// Write without a version guard
    #[arg(short, long)]
    force: bool,

    /// Path to write
    path: String,

    /// Payload; `@FILE` reads the file's raw bytes, absent means empty
    data: Option<String>,
}

async fn cmd_set(tokens: &[String], ctx: &mut ShellContext, client: &Client) -> Result<()> {
    let Some(args) = parse_args::<SetArgs>(tokens) else {
        return Ok(());
    };
    let version = match version_guard(args.version, args.force, "set") {
        Ok(version) => version,
        Err(msg) => {
            println!("{msg}");
            return Ok(());
        }
    };
    let encoding = args.encoding.unwrap_or(ctx.default_encoding);
    let data = match payload(args.data.as_deref(), encoding) {
        Ok(data) => data,
        Err(msg) => {
            println!("{msg}");
            return Ok(());
        }
    };
    let target = resolve(ctx, &args.path);
    report(client.set(&target, data, version).await)?;
    Ok(())
}

#[derive(Parser)]
#[command(name = "stat", about = "Print the status of one or more nodes", disable_version_flag = true)]
struct StatArgs {
    /// One line per node instead of the full block
    #[arg(short, long)]
    compact: bool,

    /// Paths to stat; defaults to the working path
    paths: Vec<String>,
}

async fn cmd_stat(tokens: &[String], ctx: &mut ShellContext, client: &Client) -> Result<()> {
    let Some(args) = parse_args::<StatArgs>(tokens) else {
        return Ok(());
    };
    let targets = resolve_targets(ctx, &args.paths);
    let multi = targets.len() > 1;
    for (i, target) in targets.iter().enumerate() {
        if multi && !args.compact {
            if i > 0 {
                println!();
            }
            println!("{target}:");
        }
        match report(client.exists(target).await)? {
            Some(Some(status)) => {
                if args.compact {
                    println!("{} {}", target, render::status_line(&status));
                } else {
                    println!("{}", render::status_block(&status));
                }
            }
            Some(None) => println!("{target}: no such node"),
            None => {}
        }
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "getacl", about = "Print a node's ACL list", disable_version_flag = true)]
struct GetAclArgs {
    /// Paths to inspect; defaults to the working path
    paths: Vec<String>,
}

async fn cmd_getacl(tokens: &[String], ctx: &mut ShellContext, client: &Client) -> Result<()> {
    let Some(args) = parse_args::<GetAclArgs>(tokens) else {
        return Ok(());
    };
    let targets = resolve_targets(ctx, &args.paths);
    let multi = targets.len() > 1;
    for (i, target) in targets.iter().enumerate() {
        if multi {
            if i > 0 {
                println!();
            }
            println!("{target}:");
        }
        if let Some((acl, _)) = report(client.get_acl(target).await)? {
            for entry in acl {
                println!("{entry}");
            }
        }
    }
    Ok(())
}

#[derive(Parser)]
#[command(
    name = "setacl",
    about = "Replace, merge into, or prune a node's ACL list",
    disable_version_flag = true
)]
struct SetAclArgs {
    /// Merge the entries into the current list (per identity, last writer wins)
    #[arg(long, conflicts_with_all = ["remove", "set"])]
    add: bool,

    /// Remove the listed identities from the current list
    #[arg(long, conflicts_with = "set")]
    remove: bool,

    /// Replace the list wholesale (the default)
    #[arg(long)]
    set: bool,

    /// Expected ACL version
    #[arg(short = 'v', long, conflicts_with = "force")]
    version: Option<i32>,

    /// Write without a version guard
    #[arg(short, long)]
    force: bool,

    /// Path to modify
    path: String,

    /// Entries (`scheme:id=rwcda*`), or identities for --remove
    #[arg(required = true)]
    entries: Vec<String>,
}

async fn cmd_setacl(tokens: &[String], ctx: &mut ShellContext, client: &Client) -> Result<()> {
    let Some(args) = parse_args::<SetAclArgs>(tokens) else {
        return Ok(());
    };
    let version = match version_guard(args.version, args.force, "setacl") {
        Ok(version) => version,
        Err(msg) => {
            println!("{msg}");
            return Ok(());
        }
    };
    let target = resolve(ctx, &args.path);

    // Replace is the default; --set merely pins it explicitly.
    let _ = args.set;
    let new_list = if args.remove {
        let mut ids = Vec::with_capacity(args.entries.len());
        for entry in &args.entries {
            // Accept either a bare identity or a full entry; the mask is
            // irrelevant for removal.
            let id_text = entry.rsplit_once('=').map_or(entry.as_str(), |(id, _)| id);
            match Id::parse(id_text) {
                Ok(id) => ids.push(id),
                Err(err) => {
                    println!("{err}");
                    return Ok(());
                }
            }
        }
        let Some((current, _)) = report(client.get_acl(&target).await)? else {
            return Ok(());
        };
        remove_acls(&current, &ids)
    } else {
        let mut entries = Vec::with_capacity(args.entries.len());
        for entry in &args.entries {
            match Acl::parse(entry) {
                Ok(acl) => entries.push(acl),
                Err(err) => {
                    println!("{err}");
                    return Ok(());
                }
            }
        }
        if args.add {
            let Some((current, _)) = report(client.get_acl(&target).await)? else {
                return Ok(());
            };
            merge_acls(&current, &entries)
        } else {
            entries
        }
    };

    if new_list.is_empty() {
        println!("setacl: the resulting ACL list would be empty");
        return Ok(());
    }
    report(client.set_acl(&target, new_list, version).await)?;
    Ok(())
}

#[derive(Parser)]
#[command(name = "mk", about = "Create a node", disable_version_flag = true)]
struct MkArgs {
    /// Create missing ancestors as persistent nodes
    #[arg(short, long)]
    recursive: bool,

    /// Charset for the data argument
    #[arg(short, long)]
    encoding: Option<Encoding>,

    /// Append a unique sequence suffix to the name
    #[arg(short, long, conflicts_with = "container")]
    sequential: bool,

    /// Tie the node's lifetime to this session
    #[arg(long, conflicts_with_all = ["container", "ttl"])]
    ephemeral: bool,

    /// Expire the node after this many milliseconds once childless
    #[arg(long, conflicts_with = "container")]
    ttl: Option<u64>,

    /// Create a container node
    #[arg(long)]
    container: bool,

    /// ACL entry for the new node; repeatable, defaults to world:anyone=*
    #[arg(long = "acl")]
    acl: Vec<String>,

    /// Path to create
    path: String,

    /// Payload; `@FILE` reads the file's raw bytes, absent means empty
    data: Option<String>,
}

async fn cmd_mk(tokens: &[String], ctx: &mut ShellContext, client: &Client) -> Result<()> {
    let Some(args) = parse_args::<MkArgs>(tokens) else {
        return Ok(());
    };
    let disposition = disposition_from_flags(
        args.container,
        args.ephemeral,
        args.sequential,
        args.ttl.is_some(),
    );
    let ttl = args.ttl.map(std::time::Duration::from_millis);

    let mut acl = Vec::with_capacity(args.acl.len());
    for entry in &args.acl {
        match Acl::parse(entry) {
            Ok(parsed) => acl.push(parsed),
            Err(err) => {
                println!("{err}");
                return Ok(());
            }
        }
    }
    if acl.is_empty() {
        acl.push(Acl::open());
    }

    let encoding = args.encoding.unwrap_or(ctx.default_encoding);
    let data = match payload(args.data.as_deref(), encoding) {
        Ok(data) => data,
        Err(msg) => {
            println!("{msg}");
            return Ok(());
        }
    };

    let target = resolve(ctx, &args.path);
    let created = if args.recursive {
        client.create_recursive(&target, data, acl, disposition, ttl).await
    } else {
        client.create(&target, data, acl, disposition, ttl).await
    };
    if let Some(path) = report(created)? {
        println!("{path}");
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "rm", about = "Delete a node", disable_version_flag = true)]
struct RmArgs {
    /// Delete the whole subtree (requires --force)
    #[arg(short, long, conflicts_with = "version")]
    recursive: bool,

    /// Expected data version
    #[arg(short = 'v', long, conflicts_with = "force")]
    version: Option<i32>,

    /// Delete without a version guard
    #[arg(short, long)]
    force: bool,

    /// Path to delete
    path: String,
}

async fn cmd_rm(tokens: &[String], ctx: &mut ShellContext, client: &Client) -> Result<()> {
    let Some(args) = parse_args::<RmArgs>(tokens) else {
        return Ok(());
    };
    let version = match version_guard(args.version, args.force, "rm") {
        Ok(version) => version,
        Err(msg) => {
            println!("{msg}");
            return Ok(());
        }
    };
    let target = resolve(ctx, &args.path);
    let result = if args.recursive {
        client.delete_recursive(&target).await
    } else {
        client.delete(&target, version).await
    };
    report(result)?;
    Ok(())
}

#[derive(Parser)]
#[command(name = "config", about = "Print session configuration", disable_version_flag = true)]
struct ConfigArgs {}

async fn cmd_config(tokens: &[String], ctx: &mut ShellContext, client: &Client) -> Result<()> {
    let Some(_args) = parse_args::<ConfigArgs>(tokens) else {
        return Ok(());
    };
    let session = client.session();
    println!("ensemble: {}", ctx.ensemble);
    println!("session: {:#x}", session.id);
    println!("timeout: {:?}", session.timeout);
    println!("read-only: {}", session.read_only);
    println!("state: {}", client.current_state());
    Ok(())
}

#[derive(Parser)]
#[command(name = "help", about = "Print command help", disable_version_flag = true)]
struct HelpArgs {
    /// Command to describe in full
    command: Option<String>,
}

#[derive(Parser)]
#[command(name = "quit", about = "Leave the shell", disable_version_flag = true)]
struct QuitArgs {}

fn cmd_help(tokens: &[String]) -> Result<()> {
    let Some(args) = parse_args::<HelpArgs>(tokens) else {
        return Ok(());
    };
    match args.command.as_deref() {
        Some(name) => match CommandKind::lookup(name) {
            Some(kind) => print!("{}", kind.usage()),
            None => println!("unknown command '{name}' (try help)"),
        },
        None => {
            for kind in CommandKind::all() {
                let name = if kind.aliases().is_empty() {
                    kind.name().to_string()
                } else {
                    format!("{} ({})", kind.name(), kind.aliases().join(", "))
                };
                println!("{name:<16} {}", kind.about());
            }
        }
    }
    Ok(())
}

fn resolve_targets(ctx: &ShellContext, paths: &[String]) -> Vec<NodePath> {
    if paths.is_empty() {
        vec![ctx.cwd.clone()]
    } else {
        paths.iter().map(|arg| resolve(ctx, arg)).collect()
    }
}

/// Builds a bound [`Node`] for find-engine delegation.
pub(crate) fn bind(client: &Client, path: NodePath) -> Node {
    Node::new(client.clone(), path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_names_and_aliases() {
        assert_eq!(CommandKind::lookup("ls"), Some(CommandKind::Ls));
        assert_eq!(CommandKind::lookup("dir"), Some(CommandKind::Ls));
        assert_eq!(CommandKind::lookup("info"), Some(CommandKind::Stat));
        assert_eq!(CommandKind::lookup("create"), Some(CommandKind::Mk));
        assert_eq!(CommandKind::lookup("del"), Some(CommandKind::Rm));
        assert_eq!(CommandKind::lookup("exit"), Some(CommandKind::Quit));
        assert_eq!(CommandKind::lookup("bogus"), None);
    }

    #[test]
    fn test_ls_args_parsing() {
        let args = LsArgs::try_parse_from(["ls", "-r", "--long", "/a", "b"]).unwrap();
        assert!(args.recursive);
        assert!(args.long);
        assert_eq!(args.paths, vec!["/a", "b"]);
    }

    #[test]
    fn test_get_args_mode_conflicts() {
        assert!(GetArgs::try_parse_from(["get", "--hex", "--string"]).is_err());
        assert!(GetArgs::try_parse_from(["get", "-s", "-b"]).is_err());
        let args = GetArgs::try_parse_from(["get", "-s", "-e", "latin-1", "/a"]).unwrap();
        assert!(args.string);
        assert_eq!(args.encoding, Some(Encoding::Latin1));
    }

    #[test]
    fn test_set_args_version_conflicts_with_force() {
        assert!(SetArgs::try_parse_from(["set", "-v", "1", "-f", "/a", "x"]).is_err());
        let args = SetArgs::try_parse_from(["set", "-v", "3", "/a", "x"]).unwrap();
        assert_eq!(args.version, Some(3));
        assert_eq!(args.data.as_deref(), Some("x"));
    }

    #[test]
    fn test_version_guard_requires_choice() {
        assert!(version_guard(None, false, "set").is_err());
        assert_eq!(version_guard(Some(2), false, "set"), Ok(Some(2)));
        assert_eq!(version_guard(None, true, "set"), Ok(None));
    }

    #[test]
    fn test_mk_args_dispositions() {
        let args =
            MkArgs::try_parse_from(["mk", "--ephemeral", "-s", "/a/job-"]).unwrap();
        assert!(args.ephemeral && args.sequential);
        assert!(MkArgs::try_parse_from(["mk", "--container", "--ephemeral", "/a"]).is_err());
        assert!(MkArgs::try_parse_from(["mk", "--ephemeral", "--ttl", "500", "/a"]).is_err());
        let args = MkArgs::try_parse_from(["mk", "--ttl", "500", "--acl", "world:anyone=r", "/a"])
            .unwrap();
        assert_eq!(args.ttl, Some(500));
        assert_eq!(args.acl, vec!["world:anyone=r"]);
    }

    #[test]
    fn test_rm_args_recursive_conflicts_with_version() {
        assert!(RmArgs::try_parse_from(["rm", "-r", "-v", "1", "/a"]).is_err());
        let args = RmArgs::try_parse_from(["rm", "-r", "-f", "/a"]).unwrap();
        assert!(args.recursive && args.force);
    }

    #[test]
    fn test_setacl_mode_conflicts() {
        assert!(SetAclArgs::try_parse_from(["setacl", "--add", "--remove", "-f", "/a", "world:anyone=r"]).is_err());
        let args = SetAclArgs::try_parse_from(["setacl", "--add", "-f", "/a", "world:anyone=r"])
            .unwrap();
        assert!(args.add);
        assert_eq!(args.entries, vec!["world:anyone=r"]);
        // At least one entry is required.
        assert!(SetAclArgs::try_parse_from(["setacl", "-f", "/a"]).is_err());
    }

    #[test]
    fn test_payload_encodes_inline_data() {
        assert_eq!(payload(Some("hi"), Encoding::Utf8), Ok(b"hi".to_vec()));
        assert_eq!(payload(None, Encoding::Utf8), Ok(Vec::new()));
        assert!(payload(Some("héllo"), Encoding::Ascii).is_err());
    }

    #[test]
    fn test_payload_reads_files() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\x00\x01raw").unwrap();
        let arg = format!("@{}", file.path().display());
        assert_eq!(payload(Some(&arg), Encoding::Utf8), Ok(b"\x00\x01raw".to_vec()));
        assert!(payload(Some("@/definitely/not/here"), Encoding::Utf8).is_err());
    }

    #[test]
    fn test_usage_text_is_available_for_every_command() {
        for kind in CommandKind::all() {
            let usage = kind.usage();
            assert!(usage.contains("Usage"), "no usage for {}", kind.name());
        }
    }
}
