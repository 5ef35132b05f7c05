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

use std::collections::BTreeSet;

use rdt_shared::types::CPUIdType;
use rdt_shared::types::LogicalCoreId;

/// Parses the kernel cpu list format, e.g. `0-3,8,10-11`.
pub fn parse_cpu_list(list: &str) -> Result<BTreeSet<LogicalCoreId>, String> {
    let mut cores = BTreeSet::new();

    for range in list.trim().split(',').filter(|range| !range.is_empty()) {
        let (first, last) = match range.split_once('-') {
            Some((first, last)) => (parse_cpu(first)?, parse_cpu(last)?),
            None => {
                let cpu = parse_cpu(range)?;
                (cpu, cpu)
            }
        };
        if first > last {
            return Err(format!("range {range} is reversed"));
        }
        cores.extend((first..=last).map(LogicalCoreId::new));
    }

    Ok(cores)
}

fn parse_cpu(cpu: &str) -> Result<CPUIdType, String> {
    cpu.trim()
        .parse()
        .map_err(|error| format!("{cpu:?} isn't a cpu number: {error}"))
}

/// Formats cores collapsing consecutive ids into ranges.
pub fn format_cpu_list(cores: &BTreeSet<LogicalCoreId>) -> String {
    let mut ranges: Vec<(CPUIdType, CPUIdType)> = Vec::new();
    for core_id in cores.iter().map(|core_id| core_id.get()) {
        match ranges.last_mut() {
            Some((_, last)) if *last + 1 == core_id => *last = core_id,
            _ => ranges.push((core_id, core_id)),
        }
    }

    ranges
        .into_iter()
        .map(|(first, last)| {
            if first == last {
                first.to_string()
            } else {
                format!("{first}-{last}")
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use maplit::btreeset;

    use super::*;

    fn cores(ids: &[u32]) -> BTreeSet<LogicalCoreId> {
        ids.iter().copied().map(LogicalCoreId::new).collect()
    }

    #[test]
    fn parses_ranges_and_singles() {
        let parsed = parse_cpu_list("0-3,8,10-11\n").unwrap();
        assert_eq!(parsed, cores(&[0, 1, 2, 3, 8, 10, 11]));
    }

    #[test]
    fn empty_list_is_empty_set() {
        assert_eq!(parse_cpu_list("\n").unwrap(), btreeset! {});
    }

    #[test]
    fn malformed_lists_are_errors() {
        assert!(parse_cpu_list("3-1").is_err());
        assert!(parse_cpu_list("a,2").is_err());
        assert!(parse_cpu_list("1-").is_err());
    }

    #[test]
    fn formats_ranges() {
        assert_eq!(format_cpu_list(&cores(&[0, 1, 2, 3, 8, 10, 11])), "0-3,8,10-11");
        assert_eq!(format_cpu_list(&cores(&[5])), "5");
        assert_eq!(format_cpu_list(&cores(&[])), "");
    }
}
