//! Event object command family.
//!
//! | op             | args                                        | reply          |
//! |----------------|---------------------------------------------|----------------|
//! | CreateEvent    | device, create_info*, allocator*, event*    | result, event* |
//! | DestroyEvent   | device, event, allocator*                   | -              |
//! | GetEventStatus | device, event                               | result         |
//! | SetEvent       | device, event                               | result         |
//! | ResetEvent     | device, event                               | result         |

use crate::dispatch::Instance;
use crate::protocol::{
    AllocationCallbacks, Arg, CommandType, Device, Encode, Event, EventCreateInfo, OpDescriptor,
    ResultCode,
};
use crate::transport::Channel;

pub const CREATE_EVENT: OpDescriptor = OpDescriptor::new(CommandType::CREATE_EVENT, true);
pub const DESTROY_EVENT: OpDescriptor = OpDescriptor::new(CommandType::DESTROY_EVENT, false);
pub const GET_EVENT_STATUS: OpDescriptor =
    OpDescriptor::new(CommandType::GET_EVENT_STATUS, true);
pub const SET_EVENT: OpDescriptor = OpDescriptor::new(CommandType::SET_EVENT, true);
pub const RESET_EVENT: OpDescriptor = OpDescriptor::new(CommandType::RESET_EVENT, true);

impl<C: Channel> Instance<C> {
    /// `event` membawa id yang sudah dipilih client; reply menulis ulang
    /// nilainya jika renderer mengembalikannya.
    pub fn call_create_event(
        &self,
        device: Device,
        create_info: Option<&EventCreateInfo>,
        allocator: Option<&AllocationCallbacks>,
        event: &mut Event,
    ) -> ResultCode {
        self.call(
            &CREATE_EVENT,
            &mut [
                Arg::Value(&device),
                Arg::Input(create_info.map(|info| info as &dyn Encode)),
                Arg::Allocator(allocator),
                Arg::InOut(Some(event)),
            ],
        )
    }

    pub fn async_create_event(
        &self,
        device: Device,
        create_info: Option<&EventCreateInfo>,
        allocator: Option<&AllocationCallbacks>,
        event: Event,
    ) {
        let mut event = event;
        self.call_async(
            &CREATE_EVENT,
            &[
                Arg::Value(&device),
                Arg::Input(create_info.map(|info| info as &dyn Encode)),
                Arg::Allocator(allocator),
                Arg::InOut(Some(&mut event)),
            ],
        );
    }

    pub fn call_destroy_event(
        &self,
        device: Device,
        event: Event,
        allocator: Option<&AllocationCallbacks>,
    ) {
        self.call(
            &DESTROY_EVENT,
            &mut [
                Arg::Value(&device),
                Arg::Value(&event),
                Arg::Allocator(allocator),
            ],
        );
    }

    pub fn async_destroy_event(
        &self,
        device: Device,
        event: Event,
        allocator: Option<&AllocationCallbacks>,
    ) {
        self.call_async(
            &DESTROY_EVENT,
            &[
                Arg::Value(&device),
                Arg::Value(&event),
                Arg::Allocator(allocator),
            ],
        );
    }

    /// Returns `EventSet` atau `EventReset`, atau error code.
    pub fn call_get_event_status(&self, device: Device, event: Event) -> ResultCode {
        self.call(
            &GET_EVENT_STATUS,
            &mut [Arg::Value(&device), Arg::Value(&event)],
        )
    }

    pub fn async_get_event_status(&self, device: Device, event: Event) {
        self.call_async(&GET_EVENT_STATUS, &[Arg::Value(&device), Arg::Value(&event)]);
    }

    pub fn call_set_event(&self, device: Device, event: Event) -> ResultCode {
        self.call(&SET_EVENT, &mut [Arg::Value(&device), Arg::Value(&event)])
    }

    pub fn async_set_event(&self, device: Device, event: Event) {
        self.call_async(&SET_EVENT, &[Arg::Value(&device), Arg::Value(&event)]);
    }

    pub fn call_reset_event(&self, device: Device, event: Event) -> ResultCode {
        self.call(&RESET_EVENT, &mut [Arg::Value(&device), Arg::Value(&event)])
    }

    pub fn async_reset_event(&self, device: Device, event: Event) {
        self.call_async(&RESET_EVENT, &[Arg::Value(&device), Arg::Value(&event)]);
    }
}
