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

/// Instants are stored as microseconds since the unix epoch.
///
/// Values outside of the `i64` range saturate.
#[must_use]
pub fn to_unix_micros(instant: time::OffsetDateTime) -> i64 {
    let micros = instant.unix_timestamp_nanos() / 1_000;
    i64::try_from(micros).unwrap_or(if micros < 0 { i64::MIN } else { i64::MAX })
}

/// Inverse of [`to_unix_micros`], in UTC.
#[must_use]
pub fn from_unix_micros(micros: i64) -> Option<time::OffsetDateTime> {
    time::OffsetDateTime::from_unix_timestamp_nanos(i128::from(micros) * 1_000).ok()
}

/// Parse an RFC 3339 instant, as written by Postfix with `enable_long_timestamp`.
#[must_use]
pub fn parse_rfc3339(input: &str) -> Option<time::OffsetDateTime> {
    time::OffsetDateTime::parse(input, &time::format_description::well_known::Rfc3339).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn micros_keep_sub_second_precision() {
        let instant = parse_rfc3339("2026-02-11T09:26:24.771360+01:00").unwrap();
        let micros = to_unix_micros(instant);

        assert_eq!(micros % 1_000_000, 771_360);
        assert_eq!(from_unix_micros(micros).unwrap(), instant);
    }

    #[test]
    fn not_rfc3339() {
        assert_eq!(parse_rfc3339("Feb"), None);
        assert_eq!(parse_rfc3339("2026-02-11"), None);
    }
}
