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
use tracing_subscriber::filter::Directive;

/// `level = "info,postlog_store=warn"` (the `RUST_LOG` syntax) or
/// `level = ["info", "postlog_store=warn"]`.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum Directives {
    Joined(String),
    Listed(Vec<String>),
}

impl Directives {
    fn into_parts(self) -> Vec<String> {
        match self {
            Self::Joined(joined) => joined
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(str::to_owned)
                .collect(),
            Self::Listed(listed) => listed,
        }
    }
}

pub fn serialize<S: serde::Serializer>(
    value: &[Directive],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(value.iter().map(ToString::to_string))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Directive>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let parts = <Directives as serde::Deserialize>::deserialize(deserializer)?.into_parts();
    if parts.is_empty() {
        return Err(serde::de::Error::custom("at least one log directive is required"));
    }

    parts
        .iter()
        .map(|part| {
            part.parse::<Directive>()
                .map_err(|e| serde::de::Error::custom(format!("invalid log directive `{part}`: {e}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    #[derive(Debug, serde::Serialize, serde::Deserialize)]
    struct Logs {
        #[serde(with = "super")]
        level: Vec<super::Directive>,
    }

    fn level(json: &str) -> Result<Vec<String>, serde_json::Error> {
        serde_json::from_str::<Logs>(json)
            .map(|logs| logs.level.iter().map(ToString::to_string).collect())
    }

    #[test]
    fn listed_or_joined() {
        assert_eq!(
            level(r#"{"level": ["info", "postlog_store=warn"]}"#).unwrap(),
            vec!["info", "postlog_store=warn"]
        );
        assert_eq!(
            level(r#"{"level": "info, postlog_store=warn,"}"#).unwrap(),
            vec!["info", "postlog_store=warn"]
        );
    }

    #[test]
    fn rejected() {
        assert!(level(r#"{"level": []}"#).is_err());
        assert!(level(r#"{"level": " , "}"#).is_err());
        assert!(level(r#"{"level": ["postlog=loud"]}"#).is_err());
        assert!(level(r#"{"level": 3}"#).is_err());
    }

    #[test]
    fn serialized_as_a_list() {
        let logs = Logs {
            level: vec!["postlog_ingest=debug".parse().unwrap()],
        };
        assert_eq!(
            serde_json::to_string(&logs).unwrap(),
            r#"{"level":["postlog_ingest=debug"]}"#
        );
    }
}
