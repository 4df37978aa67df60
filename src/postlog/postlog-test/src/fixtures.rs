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

/// `ABC123` enters the queue.
pub const QMGR_ABC123: &str =
    "2026-02-11T09:26:24.771360+01:00 mail postfix/qmgr[1234]: ABC123: from=<a@x.com>, size=512";

/// `ABC123` is delivered.
pub const SMTP_ABC123_SENT: &str = "2026-02-11T09:26:25.000000+01:00 mail postfix/smtp[1235]: ABC123: to=<b@y.com>, relay=mx.y.com, delay=0.42, dsn=2.0.0, status=sent (250 OK)";

/// A second attempt for `ABC123`, bounced.
pub const SMTP_ABC123_BOUNCED: &str = "2026-02-11T09:27:01.000000+01:00 mail postfix/smtp[1236]: ABC123: to=<b@y.com>, relay=mx.y.com, delay=36, dsn=5.1.1, status=bounced (550 5.1.1 user unknown)";

/// A bounce notification of `DEF456`, with the null sender.
pub const QMGR_DEF456_NULL_SENDER: &str =
    "2026-02-11T09:28:00.000000+01:00 mail postfix/qmgr[1234]: DEF456: from=<>, size=2048";

/// An entry of `DEF456` which is neither a queue nor a delivery event.
pub const CLEANUP_DEF456: &str = "2026-02-11T09:27:59.000000+01:00 mail postfix/cleanup[1300]: DEF456: message-id=<bounce@mail>";

/// An entry without transaction id.
pub const SMTPD_CONNECT: &str =
    "2026-02-11T09:26:20.000000+01:00 mail postfix/smtpd[1200]: connect from unknown[10.0.0.1]";

/// A wrapped continuation line, not a log entry.
pub const CONTINUATION: &str = "    with a continuation of the previous line";

/// Write `lines` as the whole content of `filepath`, each line terminated.
///
/// # Panics
///
/// * the file cannot be written
pub fn write_log(filepath: &std::path::Path, lines: &[&str]) {
    std::fs::write(filepath, render(lines)).expect("log file written");
}

/// Append `lines` to `filepath`, each line terminated.
///
/// # Panics
///
/// * the file cannot be opened or written
pub fn append_log(filepath: &std::path::Path, lines: &[&str]) {
    use std::io::Write;

    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(filepath)
        .and_then(|mut file| file.write_all(render(lines).as_bytes()))
        .expect("log file appended");
}

fn render(lines: &[&str]) -> String {
    lines.iter().map(|line| format!("{line}\n")).collect()
}

/// Parse `lines` and persist their entries and delivery records into `store`,
/// as one ingestion run would.
///
/// # Panics
///
/// * a line is not a log entry
/// * the store refuses a write
pub async fn populate(store: &dyn postlog_store::LogStore, lines: &[&str]) {
    let entries = lines
        .iter()
        .map(|line| postlog_common::LogEntry::parse(line).expect("valid log entry"))
        .collect::<Vec<_>>();

    store.persist_entries(&entries).await.expect("entries persisted");
    store
        .persist_deliveries(&postlog_common::correlate(
            &entries,
            &postlog_common::ServiceMap::default(),
        ))
        .await
        .expect("deliveries persisted");
}
