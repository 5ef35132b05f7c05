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

use std::fmt;
use std::sync::atomic::compiler_fence;
use std::sync::atomic::Ordering;

/// Response produced by a conversation. The bytes are overwritten with zeros
/// before the buffer is released.
pub struct SecretResponse {
    bytes: Vec<u8>,
}

impl SecretResponse {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn empty() -> Self {
        Self { bytes: Vec::new() }
    }

    pub fn expose(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Zeroes the whole allocation, including spare capacity, and empties the response.
    pub fn scrub(&mut self) {
        let capacity = self.bytes.capacity();
        let ptr = self.bytes.as_mut_ptr();
        for offset in 0..capacity {
            // SAFETY: offset < capacity, the allocation is owned by `self.bytes`
            // and u8 has no invalid bit patterns.
            unsafe { std::ptr::write_volatile(ptr.add(offset), 0u8) };
        }
        compiler_fence(Ordering::SeqCst);
        self.bytes.clear();
    }
}

impl From<String> for SecretResponse {
    fn from(value: String) -> Self {
        Self::new(value.into_bytes())
    }
}

impl From<&str> for SecretResponse {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes().to_vec())
    }
}

impl Drop for SecretResponse {
    fn drop(&mut self) {
        self.scrub();
    }
}

impl fmt::Debug for SecretResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretResponse(<{} bytes redacted>)", self.bytes.len())
    }
}
