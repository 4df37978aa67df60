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

const INSTANT: &[time::format_description::FormatItem<'static>] =
    time::macros::format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");

/// An instant in UTC to the second, `-` if unknown.
pub(crate) fn instant(value: Option<time::OffsetDateTime>) -> String {
    value
        .and_then(|v| v.to_offset(time::UtcOffset::UTC).format(INSTANT).ok())
        .unwrap_or_else(|| "-".to_string())
}

/// `<>` for the null sender, `-` if unknown.
pub(crate) fn address(value: Option<&str>) -> &str {
    match value {
        Some("") => "<>",
        Some(address) => address,
        None => "-",
    }
}

pub(crate) fn or_dash<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
