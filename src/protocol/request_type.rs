//! Request type codes.
//!
//! The type byte of every header identifies the message kind. Three values
//! are reserved sentinels and never name an application message:
//!
//! - [`RequestType::NULL`] (0x00): default/uninitialized
//! - [`RequestType::NONE`] (0xFF): "no specific type", used as a queue filter
//! - [`RequestType::MAX`]: every code at or above it is invalid
//!
//! Valid application codes occupy `[1, MAX)`.

use std::fmt;

use serde::Serialize;

/// A one-byte request type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct RequestType(pub u8);

impl RequestType {
    /// Default/uninitialized type.
    pub const NULL: RequestType = RequestType(0x00);
    /// "Don't filter" sentinel.
    pub const NONE: RequestType = RequestType(0xFF);
    /// First invalid type code.
    pub const MAX: RequestType = RequestType(0x44);

    pub const LOGIN: RequestType = RequestType(0x01);
    pub const LOGOUT: RequestType = RequestType(0x02);
    pub const SIGNUP: RequestType = RequestType(0x03);
    pub const FEEDBACK: RequestType = RequestType(0x04);
    pub const PLAYER_SET: RequestType = RequestType(0x10);
    pub const PLAYER_GET: RequestType = RequestType(0x11);
    pub const PLAYER_SET_FLAG: RequestType = RequestType(0x12);
    pub const GAME_INS: RequestType = RequestType(0x20);
    pub const GAME_REM: RequestType = RequestType(0x21);
    pub const GAME_LST: RequestType = RequestType(0x22);
    pub const GAME_INFO: RequestType = RequestType(0x23);
    pub const GAME_START: RequestType = RequestType(0x24);
    pub const CHAT_SENDMSG: RequestType = RequestType(0x30);
    pub const CHAT_GETMSG: RequestType = RequestType(0x31);
    pub const CHAT_IUNAI: RequestType = RequestType(0x32);
    pub const CHAT_JOIN: RequestType = RequestType(0x33);
    pub const CHAT_JOINS: RequestType = RequestType(0x34);
    pub const CHAT_QUITS: RequestType = RequestType(0x35);
    pub const CHAT_MOTTO_GET: RequestType = RequestType(0x36);
    pub const CHAT_MOTTO_SET: RequestType = RequestType(0x37);
    pub const CHAT_MOTTO_CHANGED: RequestType = RequestType(0x38);
    pub const CHAT_LIST: RequestType = RequestType(0x39);
    pub const CHAT_USER_GET: RequestType = RequestType(0x3A);
    pub const CHAT_PUBLICS: RequestType = RequestType(0x3B);
    pub const CHAT_KICK: RequestType = RequestType(0x3C);
    pub const CHAT_KICKED: RequestType = RequestType(0x3D);
    pub const CHAT_OP: RequestType = RequestType(0x3E);
    pub const CHAT_OPED: RequestType = RequestType(0x3F);
    pub const CHAT_DEOP: RequestType = RequestType(0x40);
    pub const CHAT_DEOPED: RequestType = RequestType(0x41);
    pub const CHAT_LIST_MY_CHANS: RequestType = RequestType(0x42);
    pub const CHAT_DESTROY_CHAN: RequestType = RequestType(0x43);

    /// Raw code.
    #[inline]
    pub fn code(self) -> u8 {
        self.0
    }

    /// True if a header carrying this type passes validation (`< MAX`).
    ///
    /// Note that `NULL` passes; only `mreq` rejects it.
    #[inline]
    pub fn is_below_max(self) -> bool {
        self < Self::MAX
    }

    /// True for the codes an application may send as a request.
    #[inline]
    pub fn is_request(self) -> bool {
        self != Self::NULL && self.is_below_max()
    }
}

impl From<u8> for RequestType {
    fn from(code: u8) -> Self {
        RequestType(code)
    }
}

impl From<RequestType> for u8 {
    fn from(ty: RequestType) -> Self {
        ty.0
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::null(RequestType::NULL, true, false)]
    #[case::login(RequestType::LOGIN, true, true)]
    #[case::last(RequestType::CHAT_DESTROY_CHAN, true, true)]
    #[case::max(RequestType::MAX, false, false)]
    #[case::none(RequestType::NONE, false, false)]
    #[case::between(RequestType(0x80), false, false)]
    fn test_classification(
        #[case] ty: RequestType,
        #[case] below_max: bool,
        #[case] request: bool,
    ) {
        assert_eq!(ty.is_below_max(), below_max);
        assert_eq!(ty.is_request(), request);
    }

    #[test]
    fn test_display_is_hex() {
        assert_eq!(RequestType::LOGIN.to_string(), "0x01");
        assert_eq!(RequestType::NONE.to_string(), "0xff");
    }
}
