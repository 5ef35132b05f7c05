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

//! Class of service registers and the values written into them.

use rdt_shared::types::ClassId;

pub const IA32_PQR_ASSOC: u32 = 0xC8F;
pub const IA32_L3_QOS_MASK_0: u32 = 0xC90;
pub const IA32_L2_QOS_EXT_BW_THRTL_0: u32 = 0xD50;

const PQR_ASSOC_COS_SHIFT: u32 = 32;
/// COS lives in the upper half of PQR_ASSOC, the lower half holds the RMID.
pub const PQR_ASSOC_COS_MASK: u64 = 0xFFFF_FFFF << PQR_ASSOC_COS_SHIFT;

/// Throttling delays are programmed in steps of this size.
pub const MBA_DELAY_STEP: u32 = 10;
const MAX_PERCENTAGE: u32 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MSRItem {
    register_id: u32,
    value: u64,
    mask: u64,
}

impl MSRItem {
    pub const NO_MASK: u64 = u64::MAX;

    pub fn new(register_id: u32, value: u64) -> Self {
        Self {
            register_id,
            value,
            mask: Self::NO_MASK,
        }
    }

    pub fn with_mask(register_id: u32, value: u64, mask: u64) -> Self {
        Self {
            register_id,
            value,
            mask,
        }
    }

    pub fn l3_mask(class_id: ClassId, ways_mask: u64) -> Self {
        Self::new(IA32_L3_QOS_MASK_0 + class_id.get(), ways_mask)
    }

    pub fn mba_delay(class_id: ClassId, delay: u32) -> Self {
        Self::new(IA32_L2_QOS_EXT_BW_THRTL_0 + class_id.get(), delay as u64)
    }

    /// Association of a core with a class, keeps the RMID untouched.
    pub fn pqr_assoc(class_id: ClassId) -> Self {
        let value = (class_id.get() as u64) << PQR_ASSOC_COS_SHIFT;
        Self::with_mask(IA32_PQR_ASSOC, value, PQR_ASSOC_COS_MASK)
    }

    pub fn register_id(&self) -> u32 {
        self.register_id
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn mask(&self) -> u64 {
        self.mask
    }

    pub fn is_masked(&self) -> bool {
        self.mask != Self::NO_MASK
    }

    pub fn masked_value(old_value: u64, new_value: u64, mask: u64) -> u64 {
        (new_value & mask) | (old_value & !mask)
    }
}

pub fn class_from_pqr_assoc(value: u64) -> ClassId {
    ClassId::new(((value & PQR_ASSOC_COS_MASK) >> PQR_ASSOC_COS_SHIFT) as u32)
}

/// Throttling delay granting at least `percentage` of the bandwidth.
pub fn delay_for_percentage(percentage: u32, max_delay: u32) -> u32 {
    let delay = MAX_PERCENTAGE.saturating_sub(percentage);
    let delay = delay / MBA_DELAY_STEP * MBA_DELAY_STEP;
    delay.min(max_delay / MBA_DELAY_STEP * MBA_DELAY_STEP)
}

pub fn percentage_for_delay(delay: u32) -> u32 {
    MAX_PERCENTAGE.saturating_sub(delay)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pqr_assoc_keeps_rmid() {
        let item = MSRItem::pqr_assoc(ClassId::new(3));
        let old_value = (1u64 << 32) | 0x2A;

        let value = MSRItem::masked_value(old_value, item.value(), item.mask());

        assert_eq!(value, (3u64 << 32) | 0x2A);
        assert_eq!(class_from_pqr_assoc(value), ClassId::new(3));
        assert!(item.is_masked());
    }

    #[test]
    fn class_registers_are_offset_by_class() {
        assert_eq!(MSRItem::l3_mask(ClassId::new(2), 0xF).register_id(), 0xC92);
        assert_eq!(MSRItem::mba_delay(ClassId::new(1), 30).register_id(), 0xD51);
        assert!(!MSRItem::l3_mask(ClassId::new(2), 0xF).is_masked());
    }

    #[test]
    fn delay_rounds_in_favour_of_bandwidth() {
        assert_eq!(delay_for_percentage(100, 90), 0);
        assert_eq!(delay_for_percentage(55, 90), 40);
        assert_eq!(percentage_for_delay(40), 60);
        assert_eq!(delay_for_percentage(10, 90), 90);
        assert_eq!(delay_for_percentage(1, 90), 90);
        assert_eq!(delay_for_percentage(5, 75), 70);
    }
}
