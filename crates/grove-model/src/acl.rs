//! Identity and access-control grammar.
//!
//! Identities are `scheme:id` strings over a fixed scheme set; ACL entries
//! bind an identity to a permission bitmask and render as
//! `scheme:id=rwcda` with `-` placeholders for absent bits. Parsing is
//! strict and every failure is a descriptive [`AclError`], never a panic:
//! the shell surfaces the message and aborts only the offending command.

use std::fmt;
use std::net::IpAddr;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by identity and ACL parsing.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AclError {
    /// The input had no `scheme:` separator.
    #[error("identity '{0}' must have the form scheme:id")]
    MissingSeparator(String),

    /// The scheme is not one of `world|auth|digest|host|ip`.
    #[error("unrecognized identity scheme '{0}'")]
    UnknownScheme(String),

    /// The `world` scheme only admits the id `anyone`.
    #[error("world identity must be 'world:anyone', got id '{0}'")]
    InvalidWorldId(String),

    /// The `auth` scheme carries no id.
    #[error("auth identity takes no id, got '{0}'")]
    AuthTakesNoId(String),

    /// A `digest` id is `username:password`.
    #[error("digest identity must be 'digest:username:password'")]
    InvalidDigestId,

    /// A `host` id is a non-empty domain suffix.
    #[error("host identity requires a domain")]
    EmptyHostDomain,

    /// The ip address portion did not parse.
    #[error("invalid ip address '{0}'")]
    InvalidIpAddress(String),

    /// The ip prefix length did not parse or is out of range.
    #[error("invalid ip prefix '{prefix}' (0..={max})")]
    InvalidIpPrefix {
        /// Offending prefix text.
        prefix: String,
        /// Largest prefix the address family admits.
        max: u8,
    },

    /// An ACL entry had no `=` between identity and permissions.
    #[error("acl entry '{0}' must have the form scheme:id=permissions")]
    MissingPermissions(String),

    /// A permission character outside `[rwcda*-]`.
    #[error("unrecognized permission character '{0}'")]
    InvalidPermissionChar(char),
}

/// Permission bitmask over a node.
///
/// A union of read/write/create/delete/admin bits. Renders in canonical
/// `rwcda` order with `-` for absent bits, so `READ | ADMIN` prints as
/// `r---a`; the parser accepts `-` as a no-op so rendered masks round-trip.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permissions(u32);

impl Permissions {
    /// No permissions.
    pub const NONE: Permissions = Permissions(0);
    /// Read node data and list children.
    pub const READ: Permissions = Permissions(1 << 0);
    /// Write node data.
    pub const WRITE: Permissions = Permissions(1 << 1);
    /// Create children.
    pub const CREATE: Permissions = Permissions(1 << 2);
    /// Delete children.
    pub const DELETE: Permissions = Permissions(1 << 3);
    /// Change the node's ACL.
    pub const ADMIN: Permissions = Permissions(1 << 4);
    /// All of the above.
    pub const ALL: Permissions = Permissions(0b11111);

    /// Whether every bit of `other` is present in `self`.
    pub fn contains(self, other: Permissions) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether no bits are set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Parses a permission-character class: each of `rwcda` ORs in its
    /// bit, `*` ORs in all bits, `-` is ignored, anything else fails.
    pub fn parse(s: &str) -> Result<Permissions, AclError> {
        let mut perms = Permissions::NONE;
        for ch in s.chars() {
            perms |= match ch {
                'r' => Permissions::READ,
                'w' => Permissions::WRITE,
                'c' => Permissions::CREATE,
                'd' => Permissions::DELETE,
                'a' => Permissions::ADMIN,
                '*' => Permissions::ALL,
                '-' => Permissions::NONE,
                other => return Err(AclError::InvalidPermissionChar(other)),
            };
        }
        Ok(perms)
    }
}

impl BitOr for Permissions {
    type Output = Permissions;

    fn bitor(self, rhs: Permissions) -> Permissions {
        Permissions(self.0 | rhs.0)
    }
}

impl BitOrAssign for Permissions {
    fn bitor_assign(&mut self, rhs: Permissions) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (bit, ch) in [
            (Permissions::READ, 'r'),
            (Permissions::WRITE, 'w'),
            (Permissions::CREATE, 'c'),
            (Permissions::DELETE, 'd'),
            (Permissions::ADMIN, 'a'),
        ] {
            write!(f, "{}", if self.contains(bit) { ch } else { '-' })?;
        }
        Ok(())
    }
}

/// A typed identity, one variant per scheme.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Id {
    /// `world:anyone` — every client, authenticated or not.
    World,
    /// `auth:` — whatever identities the session has authenticated as.
    Auth,
    /// `digest:username:password` — username/password credentials.
    Digest {
        /// Account name.
        username: String,
        /// Password or password digest, kept opaque.
        password: String,
    },
    /// `host:domain` — clients resolving into the domain suffix.
    Host {
        /// Domain suffix, e.g. `corp.example.com`.
        domain: String,
    },
    /// `ip:addr/prefix` — clients within the address block.
    Ip {
        /// Network address.
        addr: IpAddr,
        /// Prefix length; at most 32 for IPv4, 128 for IPv6.
        prefix: u8,
    },
}

impl Id {
    /// Parses a `scheme:id` string into a typed identity.
    pub fn parse(s: &str) -> Result<Id, AclError> {
        let (scheme, rest) = s
            .split_once(':')
            .ok_or_else(|| AclError::MissingSeparator(s.to_string()))?;
        match scheme {
            "world" => {
                if rest == "anyone" {
                    Ok(Id::World)
                } else {
                    Err(AclError::InvalidWorldId(rest.to_string()))
                }
            }
            "auth" => {
                if rest.is_empty() {
                    Ok(Id::Auth)
                } else {
                    Err(AclError::AuthTakesNoId(rest.to_string()))
                }
            }
            "digest" => {
                let (username, password) =
                    rest.split_once(':').ok_or(AclError::InvalidDigestId)?;
                if username.is_empty() {
                    return Err(AclError::InvalidDigestId);
                }
                Ok(Id::Digest {
                    username: username.to_string(),
                    password: password.to_string(),
                })
            }
            "host" => {
                if rest.is_empty() {
                    Err(AclError::EmptyHostDomain)
                } else {
                    Ok(Id::Host {
                        domain: rest.to_string(),
                    })
                }
            }
            "ip" => {
                let (addr_text, prefix_text) = match rest.split_once('/') {
                    Some((a, p)) => (a, Some(p)),
                    None => (rest, None),
                };
                let addr: IpAddr = addr_text
                    .parse()
                    .map_err(|_| AclError::InvalidIpAddress(addr_text.to_string()))?;
                let max = if addr.is_ipv4() { 32 } else { 128 };
                let prefix = match prefix_text {
                    None => max,
                    Some(p) => {
                        let parsed: u8 = p.parse().map_err(|_| AclError::InvalidIpPrefix {
                            prefix: p.to_string(),
                            max,
                        })?;
                        if parsed > max {
                            return Err(AclError::InvalidIpPrefix {
                                prefix: p.to_string(),
                                max,
                            });
                        }
                        parsed
                    }
                };
                Ok(Id::Ip { addr, prefix })
            }
            other => Err(AclError::UnknownScheme(other.to_string())),
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::World => f.write_str("world:anyone"),
            Id::Auth => f.write_str("auth:"),
            Id::Digest { username, password } => write!(f, "digest:{username}:{password}"),
            Id::Host { domain } => write!(f, "host:{domain}"),
            Id::Ip { addr, prefix } => write!(f, "ip:{addr}/{prefix}"),
        }
    }
}

/// One access-control entry: an identity and its permission mask.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acl {
    /// Who the entry applies to.
    pub id: Id,
    /// What the identity may do.
    pub perms: Permissions,
}

impl Acl {
    /// Builds an entry from its pieces.
    pub fn new(id: Id, perms: Permissions) -> Self {
        Self { id, perms }
    }

    /// The conventional open entry, `world:anyone=*`.
    pub fn open() -> Self {
        Self::new(Id::World, Permissions::ALL)
    }

    /// Parses `scheme:id=permissions`, splitting on the last `=` so digest
    /// passwords containing `=` survive.
    pub fn parse(s: &str) -> Result<Acl, AclError> {
        let (id_text, perm_text) = s
            .rsplit_once('=')
            .ok_or_else(|| AclError::MissingPermissions(s.to_string()))?;
        Ok(Acl {
            id: Id::parse(id_text)?,
            perms: Permissions::parse(perm_text)?,
        })
    }
}

impl fmt::Display for Acl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.id, self.perms)
    }
}

/// Replaces entries in `existing` by identity key, appending identities not
/// yet present. For an identity that appears in both lists the update's
/// mask wins wholesale; permission bits are not ORed together.
pub fn merge_acls(existing: &[Acl], updates: &[Acl]) -> Vec<Acl> {
    let mut merged: Vec<Acl> = existing.to_vec();
    for update in updates {
        match merged.iter_mut().find(|entry| entry.id == update.id) {
            Some(entry) => entry.perms = update.perms,
            None => merged.push(update.clone()),
        }
    }
    merged
}

/// Drops every entry whose identity appears in `ids`.
pub fn remove_acls(existing: &[Acl], ids: &[Id]) -> Vec<Acl> {
    existing
        .iter()
        .filter(|entry| !ids.contains(&entry.id))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_permissions_parse_and_render() {
        let perms = Permissions::parse("ra").unwrap();
        assert!(perms.contains(Permissions::READ));
        assert!(perms.contains(Permissions::ADMIN));
        assert!(!perms.contains(Permissions::WRITE));
        assert_eq!(perms.to_string(), "r---a");

        assert_eq!(Permissions::parse("*").unwrap(), Permissions::ALL);
        assert_eq!(Permissions::ALL.to_string(), "rwcda");
        assert_eq!(Permissions::parse("").unwrap(), Permissions::NONE);
        assert_eq!(Permissions::NONE.to_string(), "-----");
    }

    #[test]
    fn test_permissions_rendered_form_round_trips() {
        for text in ["r----", "rw---", "rwcda", "-----", "r---a", "--cd-"] {
            let perms = Permissions::parse(text).unwrap();
            assert_eq!(perms.to_string(), text);
        }
    }

    #[test]
    fn test_permissions_rejects_unknown_char() {
        assert_eq!(
            Permissions::parse("rx"),
            Err(AclError::InvalidPermissionChar('x'))
        );
    }

    #[test]
    fn test_id_parse_world() {
        assert_eq!(Id::parse("world:anyone").unwrap(), Id::World);
        assert_eq!(
            Id::parse("world:bad"),
            Err(AclError::InvalidWorldId("bad".to_string()))
        );
        assert_eq!(
            Id::parse("world"),
            Err(AclError::MissingSeparator("world".to_string()))
        );
    }

    #[test]
    fn test_id_parse_auth() {
        assert_eq!(Id::parse("auth:").unwrap(), Id::Auth);
        assert!(matches!(Id::parse("auth:me"), Err(AclError::AuthTakesNoId(_))));
    }

    #[test]
    fn test_id_parse_digest() {
        assert_eq!(
            Id::parse("digest:alice:s3cret").unwrap(),
            Id::Digest {
                username: "alice".to_string(),
                password: "s3cret".to_string(),
            }
        );
        assert_eq!(Id::parse("digest:alice"), Err(AclError::InvalidDigestId));
        assert_eq!(
            Id::parse("digest"),
            Err(AclError::MissingSeparator("digest".to_string()))
        );
    }

    #[test]
    fn test_id_parse_host() {
        assert_eq!(
            Id::parse("host:corp.example.com").unwrap(),
            Id::Host {
                domain: "corp.example.com".to_string(),
            }
        );
        assert_eq!(Id::parse("host:"), Err(AclError::EmptyHostDomain));
    }

    #[test]
    fn test_id_parse_ip() {
        assert_eq!(
            Id::parse("ip:10.0.0.0/8").unwrap(),
            Id::Ip {
                addr: "10.0.0.0".parse().unwrap(),
                prefix: 8,
            }
        );
        // Bare address defaults to the full prefix for its family.
        assert_eq!(
            Id::parse("ip:1.2.3.4").unwrap(),
            Id::Ip {
                addr: "1.2.3.4".parse().unwrap(),
                prefix: 32,
            }
        );
        assert_eq!(
            Id::parse("ip:::1/129"),
            Err(AclError::InvalidIpPrefix {
                prefix: "129".to_string(),
                max: 128,
            })
        );
        assert_eq!(
            Id::parse("ip:1.2.3.4/33"),
            Err(AclError::InvalidIpPrefix {
                prefix: "33".to_string(),
                max: 32,
            })
        );
        assert!(matches!(
            Id::parse("ip:not-an-addr"),
            Err(AclError::InvalidIpAddress(_))
        ));
    }

    #[test]
    fn test_id_parse_unknown_scheme() {
        assert_eq!(
            Id::parse("kerberos:alice"),
            Err(AclError::UnknownScheme("kerberos".to_string()))
        );
    }

    #[test]
    fn test_id_display_round_trip() {
        for text in [
            "world:anyone",
            "auth:",
            "digest:alice:s3cret",
            "host:corp.example.com",
            "ip:10.0.0.0/8",
        ] {
            assert_eq!(Id::parse(text).unwrap().to_string(), text);
        }
    }

    #[test]
    fn test_acl_parse_and_render() {
        let acl = Acl::parse("world:anyone=rw").unwrap();
        assert_eq!(acl.id, Id::World);
        assert_eq!(acl.to_string(), "world:anyone=rw---");
    }

    #[test]
    fn test_acl_parse_splits_on_last_equals() {
        // A digest password may itself contain '='.
        let acl = Acl::parse("digest:alice:pa=ss=r").unwrap();
        assert_eq!(
            acl.id,
            Id::Digest {
                username: "alice".to_string(),
                password: "pa=ss".to_string(),
            }
        );
        assert_eq!(acl.perms, Permissions::READ);
    }

    #[test]
    fn test_acl_parse_requires_equals() {
        assert_eq!(
            Acl::parse("world:anyone"),
            Err(AclError::MissingPermissions("world:anyone".to_string()))
        );
    }

    #[test]
    fn test_merge_replaces_per_identity() {
        // Adding world:anyone=r over an existing world:anyone=w replaces the
        // mask outright; it does not OR into rw.
        let existing = vec![Acl::parse("world:anyone=w").unwrap()];
        let updates = vec![Acl::parse("world:anyone=r").unwrap()];
        let merged = merge_acls(&existing, &updates);
        assert_eq!(merged, vec![Acl::new(Id::World, Permissions::READ)]);
    }

    #[test]
    fn test_merge_appends_new_identities() {
        let existing = vec![Acl::parse("world:anyone=r").unwrap()];
        let updates = vec![Acl::parse("digest:a:b=rw").unwrap()];
        let merged = merge_acls(&existing, &updates);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id, Id::World);
        assert_eq!(merged[1].perms, Permissions::READ | Permissions::WRITE);
    }

    #[test]
    fn test_remove_by_identity() {
        let existing = vec![
            Acl::parse("world:anyone=r").unwrap(),
            Acl::parse("digest:a:b=rw").unwrap(),
        ];
        let remaining = remove_acls(&existing, &[Id::World]);
        assert_eq!(remaining.len(), 1);
        assert!(matches!(remaining[0].id, Id::Digest { .. }));
    }

    proptest! {
        #[test]
        fn prop_acl_render_parse_round_trip(
            bits in 0u32..32,
            domain in "[a-z]{1,8}\\.[a-z]{2,3}",
        ) {
            let perms = Permissions::parse(
                &[
                    (Permissions::READ, 'r'),
                    (Permissions::WRITE, 'w'),
                    (Permissions::CREATE, 'c'),
                    (Permissions::DELETE, 'd'),
                    (Permissions::ADMIN, 'a'),
                ]
                .iter()
                .filter(|(bit, _)| bits & bit.0 != 0)
                .map(|(_, ch)| *ch)
                .collect::<String>(),
            )
            .unwrap();
            let acl = Acl::new(Id::Host { domain }, perms);
            prop_assert_eq!(Acl::parse(&acl.to_string()).unwrap(), acl);
        }
    }
}
