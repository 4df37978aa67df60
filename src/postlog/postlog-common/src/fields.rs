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
use crate::ServiceKind;

/// Build the pattern of a `key=value` attribute of a Postfix message.
///
/// The key must start the content or follow a space or a comma, so that
/// `to=` does not match inside `orig_to=`.
macro_rules! attribute {
    ($key:literal, $value:literal) => {
        regex::Regex::new(concat!(r"(?:^|[\s,])", $key, "=", $value)).expect("valid regex")
    };
}

lazy_static::lazy_static! {
    // address: `<bracketed>` (possibly empty, the null sender) or a bare token
    static ref FROM: regex::Regex =
        attribute!("from", r"(?:<(?P<bracketed>[^>]*)>|(?P<bare>[^\s,<>]+))");
    static ref TO: regex::Regex =
        attribute!("to", r"(?:<(?P<bracketed>[^>]*)>|(?P<bare>[^\s,<>]+))");

    static ref SIZE: regex::Regex = attribute!("size", r"(?P<value>\d+)");
    static ref RELAY: regex::Regex = attribute!("relay", r"(?P<value>[^\s,]+)");
    static ref DELAY: regex::Regex = attribute!("delay", r"(?P<value>\d+(?:\.\d+)?)");
    static ref DSN: regex::Regex = attribute!("dsn", r"(?P<value>\d+(?:\.\d+)*)");
    static ref STATUS: regex::Regex =
        attribute!("status", r"(?P<status>\w+)(?:\s+\((?P<response>.*)\))?");
}

/// Fields of a delivery observed in one or many log entries.
///
/// `None` means "not observed", which is distinct from an empty value:
/// `from=<>` (a bounce) gives `sender: Some("")`.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FieldSet {
    /// Envelope sender, from the queue manager.
    pub sender: Option<String>,
    /// Size of the message in bytes, from the queue manager.
    pub size: Option<u64>,
    /// Recipient of the delivery attempt.
    pub recipient: Option<String>,
    /// Next hop, `host[ip]:port` or `none`.
    pub relay: Option<String>,
    /// Total delay of the message in seconds.
    pub delay: Option<f64>,
    /// Delivery status notification code, e.g. `2.0.0`.
    pub dsn: Option<String>,
    /// Outcome of the attempt, e.g. `sent`, `deferred`, `bounced`.
    pub status: Option<String>,
    /// Text in parenthesis after the status, usually the remote reply.
    pub response: Option<String>,
}

impl FieldSet {
    /// No field has been observed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// The set identifies an email: a sender or a recipient has been observed.
    #[must_use]
    pub const fn is_identifying(&self) -> bool {
        self.sender.is_some() || self.recipient.is_some()
    }

    /// Merge `newer` on top of `self`, field by field.
    ///
    /// Observed values of `newer` replace the current ones, missing values
    /// never erase what is known.
    pub fn overlay(&mut self, newer: Self) {
        fn keep_latest<T>(current: &mut Option<T>, newer: Option<T>) {
            if newer.is_some() {
                *current = newer;
            }
        }

        keep_latest(&mut self.sender, newer.sender);
        keep_latest(&mut self.size, newer.size);
        keep_latest(&mut self.recipient, newer.recipient);
        keep_latest(&mut self.relay, newer.relay);
        keep_latest(&mut self.delay, newer.delay);
        keep_latest(&mut self.dsn, newer.dsn);
        keep_latest(&mut self.status, newer.status);
        keep_latest(&mut self.response, newer.response);
    }
}

fn value(regex: &regex::Regex, content: &str) -> Option<String> {
    regex
        .captures(content)
        .and_then(|captures| captures.name("value"))
        .map(|m| m.as_str().to_owned())
}

fn address(regex: &regex::Regex, content: &str) -> Option<String> {
    let captures = regex.captures(content)?;
    captures
        .name("bracketed")
        .or_else(|| captures.name("bare"))
        .map(|m| m.as_str().to_owned())
}

/// Extract the fields carried by the message of `kind`.
///
/// Services of kind [`ServiceKind::Other`] carry no field.
#[must_use]
pub fn extract(kind: ServiceKind, content: &str) -> FieldSet {
    match kind {
        ServiceKind::QueueManager => FieldSet {
            sender: address(&FROM, content),
            size: value(&SIZE, content).and_then(|size| size.parse().ok()),
            ..FieldSet::default()
        },
        ServiceKind::Delivery => {
            let status = STATUS.captures(content);

            FieldSet {
                recipient: address(&TO, content),
                relay: value(&RELAY, content),
                delay: value(&DELAY, content).and_then(|delay| delay.parse().ok()),
                dsn: value(&DSN, content),
                status: status
                    .as_ref()
                    .and_then(|c| c.name("status"))
                    .map(|m| m.as_str().to_owned()),
                response: status
                    .as_ref()
                    .and_then(|c| c.name("response"))
                    .map(|m| m.as_str().to_owned()),
                ..FieldSet::default()
            }
        }
        ServiceKind::Other => FieldSet::default(),
    }
}
