//! Find engine: match names, then act on each match.
//!
//! Runs in two explicit phases. Enumeration walks the tree (one level, or
//! depth-first for `--recursive`) and snapshots every node whose name
//! matches the pattern; the action phase then applies the delegated
//! subcommand to each snapshot entry. The tree may change between the
//! phases: nodes created after enumeration are not visited, and a node
//! deleted before its action runs surfaces as no-such-node — which the
//! delete action treats as already satisfied rather than a failure.

use anyhow::Result;
use clap::Parser;
use regex::Regex;

use std::time::Duration;

use grove_client::{Client, Node};
use grove_model::acl::{merge_acls, remove_acls};
use grove_model::{Acl, Disposition, GroveError, Id, NodePath};

use crate::commands::{
    bind, disposition_from_flags, parse_args, payload, resolve, version_guard,
};
use crate::encoding::Encoding;
use crate::render;
use crate::shell::ShellContext;

/// `find [--recursive] [--quiet] [--halt] PATTERN [PATH] [--exec SUB...]`
#[derive(Parser)]
#[command(
    name = "find",
    about = "Match child names against a pattern and run a subcommand per match",
    disable_version_flag = true
)]
pub struct FindArgs {
    /// Walk the whole subtree instead of one level
    #[arg(short, long)]
    pub recursive: bool,

    /// Suppress the matched-path echo
    #[arg(short, long)]
    pub quiet: bool,

    /// Stop at the first failing match
    #[arg(long)]
    pub halt: bool,

    /// Regular expression matched against the whole node name
    pub pattern: String,

    /// Base path; defaults to the working path
    pub path: Option<String>,

    /// Subcommand to run per match (default: print); must come last
    #[arg(long, num_args = 1.., allow_hyphen_values = true, value_name = "SUBCOMMAND")]
    pub exec: Vec<String>,
}

pub(crate) async fn cmd_find(
    tokens: &[String],
    ctx: &mut ShellContext,
    client: &Client,
) -> Result<()> {
    let Some(args) = parse_args::<FindArgs>(tokens) else {
        return Ok(());
    };
    let pattern = match Regex::new(&format!("^(?:{})$", args.pattern)) {
        Ok(pattern) => pattern,
        Err(err) => {
            println!("find: invalid pattern: {err}");
            return Ok(());
        }
    };
    let Some(action) = ExecAction::parse(&args.exec, ctx.default_encoding) else {
        return Ok(());
    };
    let base = match args.path.as_deref() {
        Some(arg) => resolve(ctx, arg),
        None => ctx.cwd.clone(),
    };

    let matches = match enumerate(client, &base, &pattern, args.recursive).await {
        Ok(matches) => matches,
        Err(err) if err.is_session_level() => return Err(err.into()),
        Err(err) => {
            println!("{err}");
            return Ok(());
        }
    };
    execute(client, &matches, &action, args.quiet, args.halt).await
}

/// Enumeration phase: snapshots every matching path under `base`, in
/// depth-first preorder for recursive walks. Nodes vanishing mid-walk are
/// skipped.
pub async fn enumerate(
    client: &Client,
    base: &NodePath,
    pattern: &Regex,
    recursive: bool,
) -> Result<Vec<NodePath>, GroveError> {
    let mut matches = Vec::new();
    if recursive {
        let mut stack: Vec<NodePath> = Vec::new();
        for name in client.children(base).await?.into_iter().rev() {
            stack.push(base.child(&name));
        }
        while let Some(path) = stack.pop() {
            if pattern.is_match(path.name()) {
                matches.push(path.clone());
            }
            match client.children(&path).await {
                Ok(names) => {
                    for name in names.into_iter().rev() {
                        stack.push(path.child(&name));
                    }
                }
                Err(GroveError::NoNode { .. }) => {}
                Err(err) => return Err(err),
            }
        }
    } else {
        for name in client.children(base).await? {
            if pattern.is_match(&name) {
                matches.push(base.child(&name));
            }
        }
    }
    Ok(matches)
}

/// Action phase: applies the subcommand to each snapshot entry. Per-node
/// failures print and the walk continues unless `halt` is set;
/// session-level failures always abort.
pub async fn execute(
    client: &Client,
    matches: &[NodePath],
    action: &ExecAction,
    quiet: bool,
    halt: bool,
) -> Result<()> {
    for path in matches {
        if !quiet {
            println!("{path}");
        }
        match action.apply(&bind(client, path.clone())).await {
            Ok(()) => {}
            Err(err) if err.is_session_level() => return Err(err.into()),
            Err(err) => {
                println!("{err}");
                if halt {
                    break;
                }
            }
        }
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "get", disable_version_flag = true)]
struct ExecGetArgs {
    #[arg(long, conflicts_with = "string")]
    hex: bool,
    #[arg(short, long)]
    string: bool,
    #[arg(short, long)]
    encoding: Option<Encoding>,
}

#[derive(Parser)]
#[command(name = "ls", disable_version_flag = true)]
struct ExecLsArgs {
    #[arg(short, long)]
    long: bool,
}

#[derive(Parser)]
#[command(name = "stat", disable_version_flag = true)]
struct ExecStatArgs {
    #[arg(short, long)]
    compact: bool,
}

#[derive(Parser)]
#[command(name = "set", disable_version_flag = true)]
struct ExecSetArgs {
    #[arg(short, long)]
    encoding: Option<Encoding>,
    #[arg(short = 'v', long, conflicts_with = "force")]
    version: Option<i32>,
    #[arg(short, long)]
    force: bool,
    data: String,
}

#[derive(Parser)]
#[command(name = "setacl", disable_version_flag = true)]
struct ExecSetAclArgs {
    #[arg(long, conflicts_with_all = ["remove", "set"])]
    add: bool,
    #[arg(long, conflicts_with = "set")]
    remove: bool,
    #[arg(long)]
    set: bool,
    #[arg(short = 'v', long, conflicts_with = "force")]
    version: Option<i32>,
    #[arg(short, long)]
    force: bool,
    #[arg(required = true)]
    entries: Vec<String>,
}

#[derive(Parser)]
#[command(name = "mk", disable_version_flag = true)]
struct ExecMkArgs {
    #[arg(short, long, conflicts_with = "container")]
    sequential: bool,
    #[arg(long, conflicts_with_all = ["container", "ttl"])]
    ephemeral: bool,
    #[arg(long, conflicts_with = "container")]
    ttl: Option<u64>,
    #[arg(long)]
    container: bool,
    #[arg(long = "acl")]
    acl: Vec<String>,
    #[arg(short, long)]
    encoding: Option<Encoding>,
    name: String,
    data: Option<String>,
}

#[derive(Parser)]
#[command(name = "rm", disable_version_flag = true)]
struct ExecRmArgs {
    #[arg(short, long, conflicts_with = "version")]
    recursive: bool,
    #[arg(short = 'v', long, conflicts_with = "force")]
    version: Option<i32>,
    #[arg(short, long)]
    force: bool,
}

/// A delegated subcommand, fully validated before the action phase runs.
pub enum ExecAction {
    /// Echo the matched path only (the default).
    Print,
    /// Print each match's data.
    Get {
        /// Decode as text instead of hex-dumping.
        string: bool,
        /// Charset for text decoding.
        encoding: Encoding,
    },
    /// List each match's children.
    Ls {
        /// Long rows with version, size, and child count.
        long: bool,
    },
    /// Print each match's status.
    Stat {
        /// Single-line form.
        compact: bool,
    },
    /// Print each match's ACL list.
    GetAcl,
    /// Overwrite each match's data.
    Set {
        /// Pre-encoded payload.
        data: Vec<u8>,
        /// Version guard.
        version: Option<i32>,
    },
    /// Modify each match's ACL list.
    SetAcl {
        /// Parsed entries for set/add modes.
        entries: Vec<Acl>,
        /// Identities for remove mode.
        removals: Vec<Id>,
        /// Merge instead of replacing.
        add: bool,
        /// ACL version guard.
        version: Option<i32>,
    },
    /// Create a child under each match.
    Mk {
        /// Child name (may gain a sequence suffix).
        name: String,
        /// Pre-encoded payload.
        data: Vec<u8>,
        /// Parsed ACL list.
        acl: Vec<Acl>,
        /// Creation mode.
        disposition: Disposition,
        /// TTL for TTL dispositions.
        ttl: Option<Duration>,
    },
    /// Delete each match; already-gone nodes count as success.
    Rm {
        /// Delete whole subtrees.
        recursive: bool,
        /// Version guard for non-recursive deletes.
        version: Option<i32>,
    },
}

impl ExecAction {
    /// Parses and validates an `--exec` token list; prints the failure and
    /// returns `None` on bad arguments, before any network traffic.
    pub fn parse(tokens: &[String], default_encoding: Encoding) -> Option<ExecAction> {
        let Some(name) = tokens.first() else {
            return Some(ExecAction::Print);
        };
        match name.as_str() {
            "print" => {
                if tokens.len() > 1 {
                    println!("find: print takes no arguments");
                    return None;
                }
                Some(ExecAction::Print)
            }
            "get" => {
                let args = parse_args::<ExecGetArgs>(tokens)?;
                let _ = args.hex;
                Some(ExecAction::Get {
                    string: args.string,
                    encoding: args.encoding.unwrap_or(default_encoding),
                })
            }
            "ls" | "dir" => {
                let args = parse_args::<ExecLsArgs>(tokens)?;
                Some(ExecAction::Ls { long: args.long })
            }
            "stat" | "info" => {
                let args = parse_args::<ExecStatArgs>(tokens)?;
                Some(ExecAction::Stat {
                    compact: args.compact,
                })
            }
            "getacl" => {
                if tokens.len() > 1 {
                    println!("find: getacl takes no arguments");
                    return None;
                }
                Some(ExecAction::GetAcl)
            }
            "set" => {
                let args = parse_args::<ExecSetArgs>(tokens)?;
                let version = match version_guard(args.version, args.force, "set") {
                    Ok(version) => version,
                    Err(msg) => {
                        println!("{msg}");
                        return None;
                    }
                };
                let encoding = args.encoding.unwrap_or(default_encoding);
                let data = match payload(Some(args.data.as_str()), encoding) {
                    Ok(data) => data,
                    Err(msg) => {
                        println!("{msg}");
                        return None;
                    }
                };
                Some(ExecAction::Set { data, version })
            }
            "setacl" => {
                let args = parse_args::<ExecSetAclArgs>(tokens)?;
                let _ = args.set;
                let version = match version_guard(args.version, args.force, "setacl") {
                    Ok(version) => version,
                    Err(msg) => {
                        println!("{msg}");
                        return None;
                    }
                };
                let mut entries = Vec::new();
                let mut removals = Vec::new();
                for entry in &args.entries {
                    if args.remove {
                        let id_text = entry.rsplit_once('=').map_or(entry.as_str(), |(id, _)| id);
                        match Id::parse(id_text) {
                            Ok(id) => removals.push(id),
                            Err(err) => {
                                println!("{err}");
                                return None;
                            }
                        }
                    } else {
                        match Acl::parse(entry) {
                            Ok(acl) => entries.push(acl),
                            Err(err) => {
                                println!("{err}");
                                return None;
                            }
                        }
                    }
                }
                Some(ExecAction::SetAcl {
                    entries,
                    removals,
                    add: args.add,
                    version,
                })
            }
            "mk" | "create" => {
                let args = parse_args::<ExecMkArgs>(tokens)?;
                let disposition = disposition_from_flags(
                    args.container,
                    args.ephemeral,
                    args.sequential,
                    args.ttl.is_some(),
                );
                let mut acl = Vec::new();
                for entry in &args.acl {
                    match Acl::parse(entry) {
                        Ok(parsed) => acl.push(parsed),
                        Err(err) => {
                            println!("{err}");
                            return None;
                        }
                    }
                }
                if acl.is_empty() {
                    acl.push(Acl::open());
                }
                let encoding = args.encoding.unwrap_or(default_encoding);
                let data = match payload(args.data.as_deref(), encoding) {
                    Ok(data) => data,
                    Err(msg) => {
                        println!("{msg}");
                        return None;
                    }
                };
                Some(ExecAction::Mk {
                    name: args.name,
                    data,
                    acl,
                    disposition,
                    ttl: args.ttl.map(Duration::from_millis),
                })
            }
            "rm" | "del" => {
                let args = parse_args::<ExecRmArgs>(tokens)?;
                let version = match version_guard(args.version, args.force, "rm") {
                    Ok(version) => version,
                    Err(msg) => {
                        println!("{msg}");
                        return None;
                    }
                };
                Some(ExecAction::Rm {
                    recursive: args.recursive,
                    version,
                })
            }
            other => {
                println!("find: unsupported subcommand '{other}'");
                None
            }
        }
    }

    async fn apply(&self, node: &Node) -> Result<(), GroveError> {
        match self {
            ExecAction::Print => Ok(()),
            ExecAction::Get { string, encoding } => {
                let (data, _) = node.data().await?;
                if *string {
                    match encoding.decode(&data) {
                        Ok(text) => println!("{text}"),
                        Err(err) => println!("{}: {err}", node.path()),
                    }
                } else {
                    print!("{}", render::hex_dump(&data));
                }
                Ok(())
            }
            ExecAction::Ls { long } => {
                for child in node.children().await? {
                    if *long {
                        match child.exists().await? {
                            Some(status) => {
                                println!("{}", render::long_row(&status, child.name()))
                            }
                            None => println!("{}", child.name()),
                        }
                    } else {
                        println!("{}", child.name());
                    }
                }
                Ok(())
            }
            ExecAction::Stat { compact } => {
                let status = node.stat().await?;
                if *compact {
                    println!("{} {}", node.path(), render::status_line(&status));
                } else {
                    println!("{}", render::status_block(&status));
                }
                Ok(())
            }
            ExecAction::GetAcl => {
                let (acl, _) = node.acl().await?;
                for entry in acl {
                    println!("{entry}");
                }
                Ok(())
            }
            ExecAction::Set { data, version } => {
                node.set_data(data.clone(), *version).await?;
                Ok(())
            }
            ExecAction::SetAcl {
                entries,
                removals,
                add,
                version,
            } => {
                let new_list = if !removals.is_empty() {
                    let (current, _) = node.acl().await?;
                    remove_acls(&current, removals)
                } else if *add {
                    let (current, _) = node.acl().await?;
                    merge_acls(&current, entries)
                } else {
                    entries.clone()
                };
                if new_list.is_empty() {
                    println!("{}: the resulting ACL list would be empty", node.path());
                    return Ok(());
                }
                node.set_acl(new_list, *version).await?;
                Ok(())
            }
            ExecAction::Mk {
                name,
                data,
                acl,
                disposition,
                ttl,
            } => {
                let created = node
                    .child(name)
                    .create(data.clone(), acl.clone(), *disposition, *ttl)
                    .await?;
                println!("{created}");
                Ok(())
            }
            ExecAction::Rm { recursive, version } => {
                let result = if *recursive {
                    node.delete_recursive().await
                } else {
                    node.delete(*version).await
                };
                match result {
                    // Deleted since enumeration: the goal state holds.
                    Err(GroveError::NoNode { .. }) => Ok(()),
                    other => other,
                }
            }
        }
    }
}
