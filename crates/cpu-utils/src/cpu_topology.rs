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

use hwlocality::object::TopologyObject;
use nonempty::NonEmpty;

use crate::errors::CPUTopologyError;
use crate::CTResult;
use crate::LogicalCoreId;

#[derive(Debug)]
pub struct CPUTopology {
    topology: hwlocality::Topology,
}

/// A physical package (socket) with the logical cores it hosts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Package {
    /// Id of the package as reported by the OS.
    pub os_index: u32,
    pub logical_cores: NonEmpty<LogicalCoreId>,
}

impl CPUTopology {
    pub fn new() -> CTResult<Self> {
        let topology = hwlocality::Topology::new()?;
        Ok(Self { topology })
    }

    /// Returns packages in the order of their logical index.
    pub fn packages(&self) -> CTResult<NonEmpty<Package>> {
        use hwlocality::object::types::ObjectType;

        let packages = self
            .topology
            .objects_with_type(ObjectType::Package)
            .map(|package| {
                let logical_index = package.logical_index();
                let os_index = package
                    .os_index()
                    .ok_or(CPUTopologyError::package_os_index_not_found(logical_index))?;
                let logical_cores = logical_cores_of(package)
                    .ok_or(CPUTopologyError::package_cores_not_found(logical_index))?;

                Ok(Package {
                    os_index: os_index as u32,
                    logical_cores,
                })
            })
            .collect::<CTResult<Vec<_>>>()?;

        NonEmpty::from_vec(packages).ok_or(CPUTopologyError::PackagesNotFound)
    }
}

impl Package {
    pub fn first_core(&self) -> LogicalCoreId {
        self.logical_cores.head
    }
}

fn logical_cores_of(object: &TopologyObject) -> Option<NonEmpty<LogicalCoreId>> {
    let cpuset = object.cpuset()?;
    let logical_core_ids = cpuset
        .into_iter()
        .map(usize::from)
        .map(|value| LogicalCoreId::from(value as u32))
        .collect::<Vec<_>>();

    NonEmpty::from_vec(logical_core_ids)
}
