use unindy_classfile::{Error as ClassfileError, MethodDescriptor};

use crate::error::Result;

/// Local variable layout of a synthesized helper: the parameters, then the lookup, the
/// method type and the call site temporaries in consecutive slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotLayout {
    /// Last slot occupied by a parameter, `-1` when there are none.
    pub last_param_end_slot: i32,
    pub lookup_slot: u16,
    pub method_type_slot: u16,
    pub call_site_slot: u16,
}

impl SlotLayout {
    pub fn for_descriptor(descriptor: &MethodDescriptor) -> Result<Self> {
        let param_slots = descriptor.param_slots();
        let slot = |offset: u32| {
            u16::try_from(param_slots + offset)
                .map_err(|_| ClassfileError::LimitExceeded("max_locals"))
        };
        Ok(Self {
            last_param_end_slot: param_slots as i32 - 1,
            lookup_slot: slot(0)?,
            method_type_slot: slot(1)?,
            call_site_slot: slot(2)?,
        })
    }

    pub fn max_locals(&self) -> u16 {
        self.call_site_slot + 1
    }
}

/// Starting slot of each parameter, in declaration order.
pub fn parameter_slots(descriptor: &MethodDescriptor) -> Vec<u16> {
    let mut next = 0u16;
    descriptor
        .params
        .iter()
        .map(|param| {
            let slot = next;
            next = next.saturating_add(param.slot_size());
            slot
        })
        .collect()
}
