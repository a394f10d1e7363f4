//! Metadata tokens as they appear in CIL operands.
//!
//! A token is a 32-bit value whose high byte selects a metadata table and whose low 24 bits
//! select a row (ECMA-335 §II.22). Call-kind instructions carry a token naming the invoked
//! method; the decoder hands it to a [`crate::assembly::CalleeResolver`] to learn the call shape.

use std::fmt;

/// A metadata token (table id in the high byte, 1-based row in the low 24 bits).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(pub u32);

impl Token {
    /// Table id of `MethodDef`
    pub const METHOD_DEF: u8 = 0x06;
    /// Table id of `MemberRef`
    pub const MEMBER_REF: u8 = 0x0A;
    /// Table id of `StandAloneSig` (operand of `calli`)
    pub const STANDALONE_SIG: u8 = 0x11;
    /// Table id of `MethodSpec`
    pub const METHOD_SPEC: u8 = 0x2B;

    /// Create a token from its raw value.
    #[must_use]
    pub fn new(value: u32) -> Self {
        Token(value)
    }

    /// Create a token from a table id and a row number.
    #[must_use]
    pub fn from_parts(table: u8, row: u32) -> Self {
        Token((u32::from(table) << 24) | (row & 0x00FF_FFFF))
    }

    /// Raw 32-bit value.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Table id (high byte).
    #[must_use]
    pub fn table(&self) -> u8 {
        self.0.to_be_bytes()[0]
    }

    /// Row number (low 24 bits).
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// Returns `true` for the null token.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if the token can name a call target or call site signature.
    #[must_use]
    pub fn is_call_target(&self) -> bool {
        matches!(
            self.table(),
            Self::METHOD_DEF | Self::MEMBER_REF | Self::METHOD_SPEC | Self::STANDALONE_SIG
        )
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl From<Token> for u32 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token(0x{:08x}, table: 0x{:02x}, row: {})",
            self.0,
            self.table(),
            self.row()
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}
