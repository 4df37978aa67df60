//! postlog configuration
//!
//! # Configuration
//!
//! The type [`Config`] is read from a [TOML] file with [`Config::from_toml`].
//! Every field but `version_requirement` is optional and defaulted.
//!
//! # Example
//!
//! You can find examples of TOML file in the `demos/config` directory of the repository.
//!
//! [TOML]: https://github.com/toml-lang/toml

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

#![doc(html_no_source)]
#![deny(missing_docs)]
#![forbid(unsafe_code)]
//
#![warn(rust_2018_idioms)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
//
#![allow(clippy::multiple_crate_versions)]

#[cfg(test)]
mod tests;

mod parser {
    pub mod tracing_directive;
}

mod config;
mod default;
mod ensure;

pub use config::{field, Config};

impl Config {
    /// Parse a [`Config`] with [TOML] format
    ///
    /// # Errors
    ///
    /// * data is not a valid [TOML]
    /// * one field is unknown
    /// * the version requirement are not fulfilled
    /// * a value is rejected by the validation (see [`Config::ensure`])
    ///
    /// [TOML]: https://github.com/toml-lang/toml
    pub fn from_toml(input: &str) -> anyhow::Result<Self> {
        use anyhow::Context;

        Self::check_version_requirement(input)?;

        let config = toml::from_str::<Self>(input).context("Invalid configuration document")?;
        Self::ensure(config)
    }

    fn check_version_requirement(input: &str) -> anyhow::Result<()> {
        use anyhow::Context;

        #[derive(serde::Deserialize)]
        struct Header {
            version_requirement: semver::VersionReq,
        }

        let Header {
            version_requirement,
        } = toml::from_str(input).context("The field `version_requirement` is missing or invalid")?;
        let version = semver::Version::parse(env!("CARGO_PKG_VERSION"))?;

        anyhow::ensure!(
            version_requirement.matches(&version),
            "Version requirement not fulfilled: postlog {version} does not match '{version_requirement}'"
        );
        Ok(())
    }

    /// Read and parse the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// * the file cannot be read
    /// * see [`Config::from_toml`]
    pub fn from_path(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        use anyhow::Context;

        let path = path.as_ref();
        let input = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read file '{}'", path.display()))?;

        Self::from_toml(&input).with_context(|| format!("Invalid configuration '{}'", path.display()))
    }

    /// The dispatch of the services, as configured in `[correlation]`.
    #[must_use]
    pub fn service_map(&self) -> postlog_common::ServiceMap {
        postlog_common::ServiceMap::new(
            self.correlation.queue_services.clone(),
            self.correlation.delivery_services.clone(),
        )
    }
}
