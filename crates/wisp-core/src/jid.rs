//! Peer address identifiers.

use std::fmt;

/// Well-known server part of a [`Jid`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JidServer {
    /// Individual user accounts (`s.whatsapp.net`).
    User,
    /// Group chats (`g.us`).
    Group,
    /// Broadcast lists.
    Broadcast,
    /// Hidden-user addressing (`lid`).
    Lid,
    /// Call endpoints.
    Call,
    /// Any server this client has no dedicated handling for.
    Other(String),
}

impl JidServer {
    /// Parse a server string.
    pub fn parse(value: &str) -> Self {
        match value {
            "s.whatsapp.net" => Self::User,
            "g.us" => Self::Group,
            "broadcast" => Self::Broadcast,
            "lid" => Self::Lid,
            "call" => Self::Call,
            other => Self::Other(other.to_owned()),
        }
    }

    /// The wire string for this server.
    pub fn as_str(&self) -> &str {
        match self {
            Self::User => "s.whatsapp.net",
            Self::Group => "g.us",
            Self::Broadcast => "broadcast",
            Self::Lid => "lid",
            Self::Call => "call",
            Self::Other(value) => value,
        }
    }
}

impl fmt::Display for JidServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A peer address: user, server, and optional companion-device qualifiers.
///
/// Three wire representations collapse into this one type:
/// - plain `user@server`
/// - server-only (empty user)
/// - companion form carrying agent and device bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Jid {
    /// Account identifier; `None` for server-only jids.
    pub user: Option<String>,
    /// Server part.
    pub server: JidServer,
    /// Companion device index.
    pub device: Option<u8>,
    /// Companion agent index.
    pub agent: Option<u8>,
}

impl Jid {
    /// A plain `user@server` jid.
    pub fn new(user: impl Into<String>, server: JidServer) -> Self {
        let user = user.into();
        Self {
            user: (!user.is_empty()).then_some(user),
            server,
            device: None,
            agent: None,
        }
    }

    /// A server-only jid.
    pub fn server_only(server: JidServer) -> Self {
        Self {
            user: None,
            server,
            device: None,
            agent: None,
        }
    }

    /// A companion jid on the user server.
    pub fn companion(user: impl Into<String>, agent: u8, device: u8) -> Self {
        let user = user.into();
        Self {
            user: (!user.is_empty()).then_some(user),
            server: JidServer::User,
            device: Some(device),
            agent: Some(agent),
        }
    }

    /// True when this jid carries companion qualifiers.
    pub fn is_companion(&self) -> bool {
        self.device.is_some() || self.agent.is_some()
    }

    /// Parse the textual form produced by [`fmt::Display`].
    pub fn parse(value: &str) -> Self {
        let (address, server) = match value.split_once('@') {
            Some((address, server)) => (address, JidServer::parse(server)),
            None => return Self::server_only(JidServer::parse(value)),
        };
        let (address, device) = match address.split_once(':') {
            Some((head, device)) => match device.parse().ok() {
                Some(device) => (head, Some(device)),
                None => (address, None),
            },
            None => (address, None),
        };
        let (user, agent) = match address.split_once('.') {
            Some((head, agent)) => match agent.parse().ok() {
                Some(agent) => (head, Some(agent)),
                None => (address, None),
            },
            None => (address, None),
        };
        Self {
            user: (!user.is_empty()).then(|| user.to_owned()),
            server,
            device,
            agent,
        }
    }
}

impl fmt::Display for Jid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(user) = &self.user {
            f.write_str(user)?;
            if let Some(agent) = self.agent {
                write!(f, ".{agent}")?;
            }
            if let Some(device) = self.device {
                write!(f, ":{device}")?;
            }
            write!(f, "@{}", self.server)
        } else {
            write!(f, "{}", self.server)
        }
    }
}
