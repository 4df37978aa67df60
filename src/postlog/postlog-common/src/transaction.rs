/*
 * vSMTP mail transfer agent
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
 */

lazy_static::lazy_static! {
    static ref LEADING_ID: regex::Regex =
        regex::Regex::new(r"^(?P<id>[A-F0-9]+):").expect("valid regex");
}

/// Postfix queue identifier, an uppercase hexadecimal token.
///
/// Postfix recycles queue ids, so an id is only a correlation key within
/// the window of one log file.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct TransactionId(String);

impl TransactionId {
    /// Extract the id heading a log message, `"ABC123: from=<...>"` gives `ABC123`.
    #[must_use]
    pub fn from_content(content: &str) -> Option<Self> {
        LEADING_ID
            .captures(content)
            .and_then(|captures| captures.name("id"))
            .map(|id| Self(id.as_str().to_owned()))
    }

    ///
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The token is not an uppercase hexadecimal queue id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("`{0}` is not a valid transaction id")]
pub struct InvalidTransactionId(String);

impl std::str::FromStr for TransactionId {
    type Err = InvalidTransactionId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.is_empty() && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'A'..=b'F')) {
            Ok(Self(s.to_owned()))
        } else {
            Err(InvalidTransactionId(s.to_owned()))
        }
    }
}

impl TryFrom<String> for TransactionId {
    type Error = InvalidTransactionId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TransactionId> for String {
    fn from(value: TransactionId) -> Self {
        value.0
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    #[case("ABC123: from=<a@x.com>, size=512", Some("ABC123"))]
    #[case("4F2A9C01B: removed", Some("4F2A9C01B"))]
    #[case("abc123: lowercase is not a queue id", None)]
    #[case("connect from unknown[10.0.0.1]", None)]
    #[case(" ABC123: leading space", None)]
    #[case("ABC123 missing colon", None)]
    #[case("", None)]
    fn leading_id(#[case] content: &str, #[case] expected: Option<&str>) {
        assert_eq!(
            TransactionId::from_content(content)
                .as_ref()
                .map(TransactionId::as_str),
            expected
        );
    }

    #[test]
    fn from_str() {
        assert_eq!("0A1B".parse::<TransactionId>().unwrap().to_string(), "0A1B");
        "0a1b".parse::<TransactionId>().unwrap_err();
        "".parse::<TransactionId>().unwrap_err();
    }

    #[test]
    fn serde() {
        let id = "ABC123".parse::<TransactionId>().unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""ABC123""#);
        assert_eq!(
            serde_json::from_str::<TransactionId>(r#""ABC123""#).unwrap(),
            id
        );
        serde_json::from_str::<TransactionId>(r#""nope""#).unwrap_err();
    }
}
