//! Firewall rule model and the pure rule compiler.
//!
//! Rules render to pf syntax:
//!
//! ```text
//! block drop out proto tcp from any port 443 to any
//! block drop log out quick on en0 user 501 to any
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Set of local ports held by a process.
///
/// Backed by an ordered set so iteration is always ascending, which is the
/// canonical order for rule compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSet(BTreeSet<u16>);

impl PortSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, port: u16) -> bool {
        self.0.insert(port)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Ports in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<u16> for PortSet {
    fn from_iter<I: IntoIterator<Item = u16>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl std::fmt::Display for PortSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ports: Vec<String> = self.iter().map(|p| p.to_string()).collect();
        write!(f, "{{{}}}", ports.join(", "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Out,
}

/// What a rule matches on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Selector {
    /// Traffic originating from a local port.
    Port(u16),
    /// All traffic of a user on an interface (fallback when no ports are known).
    User { uid: u32, interface: String },
}

/// One line of pf filter syntax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallRule {
    pub action: Action,
    pub protocol: Option<Protocol>,
    pub direction: Direction,
    pub selector: Selector,
}

impl FirewallRule {
    /// Block outbound traffic from a local port for one protocol.
    pub fn block_port(protocol: Protocol, port: u16) -> Self {
        Self {
            action: Action::Block,
            protocol: Some(protocol),
            direction: Direction::Out,
            selector: Selector::Port(port),
        }
    }

    /// Block all outbound traffic of a user on an interface.
    pub fn block_user(uid: u32, interface: impl Into<String>) -> Self {
        Self {
            action: Action::Block,
            protocol: None,
            direction: Direction::Out,
            selector: Selector::User {
                uid,
                interface: interface.into(),
            },
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.selector, Selector::User { .. })
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Tcp => f.write_str("tcp"),
            Protocol::Udp => f.write_str("udp"),
        }
    }
}

impl std::fmt::Display for FirewallRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.selector, self.protocol) {
            (Selector::Port(port), Some(proto)) => {
                write!(f, "block drop out proto {proto} from any port {port} to any")
            }
            (Selector::Port(port), None) => {
                write!(f, "block drop out from any port {port} to any")
            }
            (Selector::User { uid, interface }, _) => {
                write!(f, "block drop log out quick on {interface} user {uid} to any")
            }
        }
    }
}

/// Compile a port set into pf rules.
///
/// With ports: one TCP and one UDP rule per port, ascending by port, so the
/// result always holds `2 * ports.len()` rules. Without ports: exactly one
/// rule blocking everything `fallback_uid` sends out on `interface`.
pub fn compile(ports: &PortSet, fallback_uid: u32, interface: &str) -> Vec<FirewallRule> {
    if ports.is_empty() {
        return vec![FirewallRule::block_user(fallback_uid, interface)];
    }

    ports
        .iter()
        .flat_map(|port| {
            [
                FirewallRule::block_port(Protocol::Tcp, port),
                FirewallRule::block_port(Protocol::Udp, port),
            ]
        })
        .collect()
}

/// Render rules as anchor file text (one rule per line, trailing newline).
pub fn render(rules: &[FirewallRule]) -> String {
    let mut text = String::new();
    for rule in rules {
        text.push_str(&rule.to_string());
        text.push('\n');
    }
    text
}
