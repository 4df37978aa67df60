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
use crate::{utils::parse_rfc3339, TransactionId};

lazy_static::lazy_static! {
    static ref LINE: regex::Regex = regex::Regex::new(
        r"^(?P<timestamp>\S+)\s+(?P<hostname>\S+)\s+(?P<service>[^\s\[\]]+)\[(?P<pid>\d+)\]:\s+(?P<content>.*)$"
    )
    .expect("valid regex");
}

/// Reason why a line of the log source is not a [`LogEntry`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The line is empty or made of whitespaces.
    #[error("the line is empty")]
    Empty,
    /// The line does not have the shape `timestamp host service[pid]: message`.
    #[error("the line does not match `timestamp host service[pid]: message`")]
    Shape,
    /// The process id does not fit an unsigned 32 bits integer.
    #[error("invalid process id `{0}`")]
    Pid(String),
}

/// One line of the log source.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LogEntry {
    /// The timestamp token, as written in the source.
    pub timestamp: String,
    /// The parsed [`Self::timestamp`], `None` if the token is not RFC 3339.
    #[serde(with = "time::serde::rfc3339::option")]
    pub occurred_at: Option<time::OffsetDateTime>,
    ///
    pub hostname: String,
    /// Name of the emitting service, e.g. `postfix/qmgr`.
    pub service: String,
    ///
    pub pid: u32,
    /// Remainder of the line after `service[pid]: `.
    pub content: String,
}

impl std::str::FromStr for LogEntry {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim_end_matches(&['\r', '\n'][..]);
        if line.trim().is_empty() {
            return Err(ParseError::Empty);
        }

        let captures = LINE.captures(line).ok_or(ParseError::Shape)?;
        let group = |name: &str| captures.name(name).map_or("", |m| m.as_str());

        let pid = group("pid")
            .parse::<u32>()
            .map_err(|_| ParseError::Pid(group("pid").to_owned()))?;
        let timestamp = group("timestamp").to_owned();

        Ok(Self {
            occurred_at: parse_rfc3339(&timestamp),
            timestamp,
            hostname: group("hostname").to_owned(),
            service: group("service").to_owned(),
            pid,
            content: group("content").to_owned(),
        })
    }
}

impl LogEntry {
    /// Parse one raw line, `None` if the line is not a log entry.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        line.parse().ok()
    }

    /// The transaction id heading the content, if the entry is correlatable.
    #[must_use]
    pub fn transaction_id(&self) -> Option<TransactionId> {
        TransactionId::from_content(&self.content)
    }

    /// Hex encoded SHA-256 of the natural key of the entry.
    ///
    /// Two physical lines with the same hostname, service, pid, timestamp
    /// and content have the same fingerprint.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        use sha2::Digest;

        let mut hasher = sha2::Sha256::new();
        for part in [
            self.hostname.as_bytes(),
            self.service.as_bytes(),
            self.pid.to_string().as_bytes(),
            self.timestamp.as_bytes(),
            self.content.as_bytes(),
        ] {
            hasher.update(part);
            // separator, not a valid byte in any of the fields
            hasher.update([0_u8]);
        }
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QMGR: &str = "2026-02-11T09:26:24.771360+01:00 mail postfix/qmgr[1234]: ABC123: from=<a@x.com>, size=512, nrcpt=1 (queue active)";

    #[test]
    fn well_formed() {
        pretty_assertions::assert_eq!(
            LogEntry::parse(QMGR).unwrap(),
            LogEntry {
                timestamp: "2026-02-11T09:26:24.771360+01:00".to_string(),
                occurred_at: Some(time::macros::datetime!(2026-02-11 09:26:24.771360 +01:00)),
                hostname: "mail".to_string(),
                service: "postfix/qmgr".to_string(),
                pid: 1234,
                content: "ABC123: from=<a@x.com>, size=512, nrcpt=1 (queue active)".to_string(),
            }
        );
    }

    #[test]
    fn timestamp_not_rfc3339_is_kept() {
        let entry = LogEntry::parse("1707639984 relay opendkim[88]: ABC123: DKIM-Signature field added")
            .unwrap();

        assert_eq!(entry.timestamp, "1707639984");
        assert_eq!(entry.occurred_at, None);
        assert_eq!(entry.service, "opendkim");
    }

    #[test]
    fn trailing_carriage_return() {
        let entry = LogEntry::parse(&format!("{QMGR}\r")).unwrap();
        assert!(entry.content.ends_with("(queue active)"));
    }

    #[rstest::rstest]
    #[case("", ParseError::Empty)]
    #[case("   \t ", ParseError::Empty)]
    #[case("2026-02-11T09:26:24+01:00 mail postfix/qmgr: ABC123: removed", ParseError::Shape)]
    #[case("2026-02-11T09:26:24+01:00 mail postfix/qmgr[12a]: ABC123: removed", ParseError::Shape)]
    #[case("2026-02-11T09:26:24+01:00 mail postfix/qmgr[]: ABC123: removed", ParseError::Shape)]
    #[case("2026-02-11T09:26:24+01:00 mail postfix/qmgr[12]:ABC123: removed", ParseError::Shape)]
    #[case("    250 2.0.0 Ok: queued as 1234ABCD)", ParseError::Shape)]
    #[case("2026-02-11T09:26:24+01:00 postfix/qmgr[12]: ABC123: removed", ParseError::Shape)]
    #[case(
        "2026-02-11T09:26:24+01:00 mail postfix/qmgr[99999999999]: ABC123: removed",
        ParseError::Pid("99999999999".to_string())
    )]
    fn rejected(#[case] line: &str, #[case] expected: ParseError) {
        assert_eq!(line.parse::<LogEntry>().unwrap_err(), expected);
        assert_eq!(LogEntry::parse(line), None);
    }

    #[test]
    fn transaction_id() {
        let entry = LogEntry::parse(QMGR).unwrap();
        assert_eq!(entry.transaction_id().unwrap().as_str(), "ABC123");

        let entry =
            LogEntry::parse("2026-02-11T09:26:24+01:00 mail postfix/smtpd[9]: connect from x[1.2.3.4]")
                .unwrap();
        assert_eq!(entry.transaction_id(), None);
    }

    #[test]
    fn fingerprint_is_the_natural_key() {
        let entry = LogEntry::parse(QMGR).unwrap();
        assert_eq!(entry.fingerprint(), LogEntry::parse(QMGR).unwrap().fingerprint());
        assert_eq!(entry.fingerprint().len(), 64);

        let mut other_pid = entry.clone();
        other_pid.pid += 1;
        assert_ne!(entry.fingerprint(), other_pid.fingerprint());

        let mut other_content = entry.clone();
        other_content.content.push('!');
        assert_ne!(entry.fingerprint(), other_content.fingerprint());
    }
}
