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

mod bandwidth;
mod class_id;
mod core;
mod socket;
mod task_id;

pub use bandwidth::BandwidthMode;
pub use bandwidth::BandwidthResetMode;
pub use bandwidth::UnknownBandwidthResetMode;
pub use class_id::ClassId;
pub use class_id::ClassIdInner;
pub use core::CPUIdType;
pub use core::LogicalCoreId;
pub use socket::SocketIndex;
pub use task_id::TaskId;
