// Status codes reported with state-change notifications
//
// Engines report load results as 32-bit result codes. A code is a failure when
// its severity (high) bit is set. Well-known network codes are mapped to their
// symbolic names so a failed navigation can be reported by name.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Result code carried by a state-change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Status(pub u32);

impl Status {
    pub const OK: Status = Status(0);

    pub const NS_ERROR_FAILURE: Status = Status(0x8000_4005);
    pub const NS_ERROR_ABORT: Status = Status(0x8000_4004);
    pub const NS_ERROR_NOT_AVAILABLE: Status = Status(0x8004_0111);

    pub const NS_BINDING_FAILED: Status = Status(0x804B_0001);
    pub const NS_BINDING_ABORTED: Status = Status(0x804B_0002);
    pub const NS_ERROR_MALFORMED_URI: Status = Status(0x804B_000A);
    pub const NS_ERROR_CONNECTION_REFUSED: Status = Status(0x804B_000D);
    pub const NS_ERROR_NET_TIMEOUT: Status = Status(0x804B_000E);
    pub const NS_ERROR_OFFLINE: Status = Status(0x804B_0010);
    pub const NS_ERROR_UNKNOWN_PROTOCOL: Status = Status(0x804B_0012);
    pub const NS_ERROR_PORT_ACCESS_NOT_ALLOWED: Status = Status(0x804B_0013);
    pub const NS_ERROR_NET_RESET: Status = Status(0x804B_0014);
    pub const NS_ERROR_CORRUPTED_CONTENT: Status = Status(0x804B_001D);
    pub const NS_ERROR_UNKNOWN_HOST: Status = Status(0x804B_001E);
    pub const NS_ERROR_REDIRECT_LOOP: Status = Status(0x804B_001F);
    pub const NS_ERROR_UNKNOWN_PROXY_HOST: Status = Status(0x804B_002A);
    pub const NS_ERROR_NET_INTERRUPT: Status = Status(0x804B_0047);
    pub const NS_ERROR_PROXY_CONNECTION_REFUSED: Status = Status(0x804B_0048);

    /// Parsed document was served from the back-forward cache.
    pub const NS_ERROR_PARSED_DATA_CACHED: Status = Status(0x805D_0021);

    const KNOWN: &'static [(Status, &'static str)] = &[
        (Status::NS_ERROR_FAILURE, "NS_ERROR_FAILURE"),
        (Status::NS_ERROR_ABORT, "NS_ERROR_ABORT"),
        (Status::NS_ERROR_NOT_AVAILABLE, "NS_ERROR_NOT_AVAILABLE"),
        (Status::NS_BINDING_FAILED, "NS_BINDING_FAILED"),
        (Status::NS_BINDING_ABORTED, "NS_BINDING_ABORTED"),
        (Status::NS_ERROR_MALFORMED_URI, "NS_ERROR_MALFORMED_URI"),
        (Status::NS_ERROR_CONNECTION_REFUSED, "NS_ERROR_CONNECTION_REFUSED"),
        (Status::NS_ERROR_NET_TIMEOUT, "NS_ERROR_NET_TIMEOUT"),
        (Status::NS_ERROR_OFFLINE, "NS_ERROR_OFFLINE"),
        (Status::NS_ERROR_UNKNOWN_PROTOCOL, "NS_ERROR_UNKNOWN_PROTOCOL"),
        (
            Status::NS_ERROR_PORT_ACCESS_NOT_ALLOWED,
            "NS_ERROR_PORT_ACCESS_NOT_ALLOWED",
        ),
        (Status::NS_ERROR_NET_RESET, "NS_ERROR_NET_RESET"),
        (Status::NS_ERROR_CORRUPTED_CONTENT, "NS_ERROR_CORRUPTED_CONTENT"),
        (Status::NS_ERROR_UNKNOWN_HOST, "NS_ERROR_UNKNOWN_HOST"),
        (Status::NS_ERROR_REDIRECT_LOOP, "NS_ERROR_REDIRECT_LOOP"),
        (Status::NS_ERROR_UNKNOWN_PROXY_HOST, "NS_ERROR_UNKNOWN_PROXY_HOST"),
        (Status::NS_ERROR_NET_INTERRUPT, "NS_ERROR_NET_INTERRUPT"),
        (
            Status::NS_ERROR_PROXY_CONNECTION_REFUSED,
            "NS_ERROR_PROXY_CONNECTION_REFUSED",
        ),
        (Status::NS_ERROR_PARSED_DATA_CACHED, "NS_ERROR_PARSED_DATA_CACHED"),
    ];

    /// Returns true if the severity bit is clear.
    pub fn is_success(self) -> bool {
        self.0 & 0x8000_0000 == 0
    }

    /// Returns the symbolic name of the code.
    ///
    /// Unknown failure codes are rendered as `NS_ERROR_UNKNOWN (0x........)`
    /// so the name stays human-readable and unique.
    pub fn name(self) -> Cow<'static, str> {
        if self.is_success() {
            return Cow::Borrowed("NS_OK");
        }
        Self::KNOWN
            .iter()
            .find(|(status, _)| *status == self)
            .map(|(_, name)| Cow::Borrowed(*name))
            .unwrap_or_else(|| Cow::Owned(format!("NS_ERROR_UNKNOWN ({:#010X})", self.0)))
    }
}

impl From<u32> for Status {
    fn from(code: u32) -> Self {
        Status(code)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
