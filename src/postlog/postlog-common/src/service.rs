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

/// Role of a service in the journey of a message, drives the field extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ServiceKind {
    /// The queue manager, reports the envelope sender and the size.
    QueueManager,
    /// A delivery agent, reports the recipient and the outcome of the attempt.
    Delivery,
    /// Any other service, stored but not correlated.
    Other,
}

/// Exact service names mapped to their [`ServiceKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceMap {
    queue: Vec<String>,
    delivery: Vec<String>,
}

impl Default for ServiceMap {
    fn default() -> Self {
        Self::new(
            vec![Self::QMGR.to_owned()],
            vec![Self::SMTP.to_owned()],
        )
    }
}

impl ServiceMap {
    /// Name of the Postfix queue manager.
    pub const QMGR: &'static str = "postfix/qmgr";
    /// Name of the Postfix SMTP client.
    pub const SMTP: &'static str = "postfix/smtp";

    ///
    #[must_use]
    pub const fn new(queue: Vec<String>, delivery: Vec<String>) -> Self {
        Self { queue, delivery }
    }

    /// The role of `service`, matched on the exact name.
    #[must_use]
    pub fn classify(&self, service: &str) -> ServiceKind {
        if self.queue.iter().any(|s| s == service) {
            ServiceKind::QueueManager
        } else if self.delivery.iter().any(|s| s == service) {
            ServiceKind::Delivery
        } else {
            ServiceKind::Other
        }
    }
}
