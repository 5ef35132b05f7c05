/*
 * Copyright 2024 Fluence Labs Limited
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use std::collections::BTreeMap;
use std::fmt::Display;

/// Content of a group `schemata` file, one line per resource:
/// `L3:0=7ff;1=7ff`, `MB:0=100;1=100`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Schemata {
    resources: BTreeMap<String, BTreeMap<u32, String>>,
}

impl Schemata {
    pub fn parse(text: &str) -> Result<Self, String> {
        let mut resources = BTreeMap::new();

        for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
            let (resource, domains) = line
                .split_once(':')
                .ok_or_else(|| format!("line {line:?} has no resource name"))?;

            let mut values = BTreeMap::new();
            for domain in domains.split(';').filter(|domain| !domain.is_empty()) {
                let (id, value) = domain
                    .split_once('=')
                    .ok_or_else(|| format!("domain {domain:?} has no value"))?;
                let id = id
                    .trim()
                    .parse::<u32>()
                    .map_err(|error| format!("domain id {id:?} isn't a number: {error}"))?;
                values.insert(id, value.trim().to_string());
            }

            resources.insert(resource.trim().to_string(), values);
        }

        Ok(Self { resources })
    }

    /// Domain ids of the resource in ascending order.
    pub fn domain_ids(&self, resource: &str) -> Vec<u32> {
        self.resources
            .get(resource)
            .map(|domains| domains.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn value(&self, resource: &str, domain: u32) -> Option<&str> {
        self.resources
            .get(resource)?
            .get(&domain)
            .map(String::as_str)
    }
}

/// A schemata line setting one value per domain.
pub(crate) fn schemata_line<V: Display>(
    resource: &str,
    values: impl IntoIterator<Item = (u32, V)>,
) -> String {
    let domains = values
        .into_iter()
        .map(|(domain, value)| format!("{domain}={value}"))
        .collect::<Vec<_>>()
        .join(";");

    format!("{resource}:{domains}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT_SCHEMATA: &str = "    L3:0=fffff;1=fffff\n    MB:0=100;1=100\n";

    #[test]
    fn parses_kernel_output() {
        let schemata = Schemata::parse(ROOT_SCHEMATA).unwrap();

        assert_eq!(schemata.domain_ids("L3"), vec![0, 1]);
        assert_eq!(schemata.value("MB", 1), Some("100"));
        assert!(schemata.domain_ids("L3CODE").is_empty());
        assert!(schemata.domain_ids("L2").is_empty());
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(Schemata::parse("L3 0=ff").is_err());
        assert!(Schemata::parse("L3:0ff").is_err());
        assert!(Schemata::parse("L3:x=ff").is_err());
    }

    #[test]
    fn formats_line() {
        let line = schemata_line("L3", [(0, "ff"), (2, "f0")]);
        assert_eq!(line, "L3:0=ff;2=f0");
        assert_eq!(schemata_line("MB", [(1, 70)]), "MB:1=70");
    }
}
