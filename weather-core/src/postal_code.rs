use std::fmt;

use thiserror::Error;

/// Number of characters in a Brazilian postal code (CEP).
pub const POSTAL_CODE_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidPostalCode {
    #[error("postal code must have exactly {POSTAL_CODE_LEN} characters, got {0}")]
    Length(usize),

    #[error("postal code must contain only decimal digits")]
    NonDigit,
}

/// A validated 8-digit postal code.
///
/// Both service boundaries build one through [`PostalCode::parse`], so the
/// provider clients never see an unchecked string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PostalCode(String);

impl PostalCode {
    pub fn parse(raw: &str) -> Result<Self, InvalidPostalCode> {
        let len = raw.chars().count();
        if len != POSTAL_CODE_LEN {
            return Err(InvalidPostalCode::Length(len));
        }

        if !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidPostalCode::NonDigit);
        }

        Ok(Self(raw.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for PostalCode {
    type Error = InvalidPostalCode;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_eight_digits() {
        let code = PostalCode::parse("01001000").expect("valid code");
        assert_eq!(code.as_str(), "01001000");
        assert_eq!(code.to_string(), "01001000");
    }

    #[test]
    fn rejects_wrong_length() {
        assert_eq!(PostalCode::parse("123"), Err(InvalidPostalCode::Length(3)));
        assert_eq!(PostalCode::parse(""), Err(InvalidPostalCode::Length(0)));
        assert_eq!(PostalCode::parse("123456789"), Err(InvalidPostalCode::Length(9)));
    }

    #[test]
    fn rejects_non_digits() {
        assert_eq!(PostalCode::parse("0100100a"), Err(InvalidPostalCode::NonDigit));
        assert_eq!(PostalCode::parse("01001-00"), Err(InvalidPostalCode::NonDigit));
        assert_eq!(PostalCode::parse(" 1001000"), Err(InvalidPostalCode::NonDigit));
    }

    #[test]
    fn rejects_non_ascii_digits() {
        // Fullwidth digits are eight characters but not ASCII decimal digits.
        let fullwidth = "０１００１０００";
        assert_eq!(PostalCode::parse(fullwidth), Err(InvalidPostalCode::NonDigit));
    }
}
