//! Semaphore command family.
//!
//! `SemaphoreCreateInfo` adalah base dengan chain yang benar-benar
//! di-forward (timeline type, export info), dan
//! `GetSemaphoreCounterValue` punya out argument berupa nilai biasa.

use crate::dispatch::Instance;
use crate::protocol::{
    AllocationCallbacks, Arg, CommandType, Device, Encode, OpDescriptor, ResultCode, Semaphore,
    SemaphoreCreateInfo, SemaphoreSignalInfo,
};
use crate::transport::Channel;

pub const CREATE_SEMAPHORE: OpDescriptor =
    OpDescriptor::new(CommandType::CREATE_SEMAPHORE, true);
pub const DESTROY_SEMAPHORE: OpDescriptor =
    OpDescriptor::new(CommandType::DESTROY_SEMAPHORE, false);
pub const GET_SEMAPHORE_COUNTER_VALUE: OpDescriptor =
    OpDescriptor::new(CommandType::GET_SEMAPHORE_COUNTER_VALUE, true);
pub const SIGNAL_SEMAPHORE: OpDescriptor =
    OpDescriptor::new(CommandType::SIGNAL_SEMAPHORE, true);

impl<C: Channel> Instance<C> {
    pub fn call_create_semaphore(
        &self,
        device: Device,
        create_info: Option<&SemaphoreCreateInfo>,
        allocator: Option<&AllocationCallbacks>,
        semaphore: &mut Semaphore,
    ) -> ResultCode {
        self.call(
            &CREATE_SEMAPHORE,
            &mut [
                Arg::Value(&device),
                Arg::Input(create_info.map(|info| info as &dyn Encode)),
                Arg::Allocator(allocator),
                Arg::InOut(Some(semaphore)),
            ],
        )
    }

    pub fn async_create_semaphore(
        &self,
        device: Device,
        create_info: Option<&SemaphoreCreateInfo>,
        allocator: Option<&AllocationCallbacks>,
        semaphore: Semaphore,
    ) {
        let mut semaphore = semaphore;
        self.call_async(
            &CREATE_SEMAPHORE,
            &[
                Arg::Value(&device),
                Arg::Input(create_info.map(|info| info as &dyn Encode)),
                Arg::Allocator(allocator),
                Arg::InOut(Some(&mut semaphore)),
            ],
        );
    }

    pub fn call_destroy_semaphore(
        &self,
        device: Device,
        semaphore: Semaphore,
        allocator: Option<&AllocationCallbacks>,
    ) {
        self.call(
            &DESTROY_SEMAPHORE,
            &mut [
                Arg::Value(&device),
                Arg::Value(&semaphore),
                Arg::Allocator(allocator),
            ],
        );
    }

    pub fn async_destroy_semaphore(
        &self,
        device: Device,
        semaphore: Semaphore,
        allocator: Option<&AllocationCallbacks>,
    ) {
        self.call_async(
            &DESTROY_SEMAPHORE,
            &[
                Arg::Value(&device),
                Arg::Value(&semaphore),
                Arg::Allocator(allocator),
            ],
        );
    }

    /// `value` hanya ditulis jika renderer mengirim nilainya.
    pub fn call_get_semaphore_counter_value(
        &self,
        device: Device,
        semaphore: Semaphore,
        value: &mut u64,
    ) -> ResultCode {
        self.call(
            &GET_SEMAPHORE_COUNTER_VALUE,
            &mut [
                Arg::Value(&device),
                Arg::Value(&semaphore),
                Arg::Output(Some(value)),
            ],
        )
    }

    /// Tidak ada tempat untuk hasilnya; slot output dikirim sebagai null.
    pub fn async_get_semaphore_counter_value(&self, device: Device, semaphore: Semaphore) {
        self.call_async(
            &GET_SEMAPHORE_COUNTER_VALUE,
            &[
                Arg::Value(&device),
                Arg::Value(&semaphore),
                Arg::Output(None),
            ],
        );
    }

    pub fn call_signal_semaphore(
        &self,
        device: Device,
        signal_info: Option<&SemaphoreSignalInfo>,
    ) -> ResultCode {
        self.call(
            &SIGNAL_SEMAPHORE,
            &mut [
                Arg::Value(&device),
                Arg::Input(signal_info.map(|info| info as &dyn Encode)),
            ],
        )
    }

    pub fn async_signal_semaphore(&self, device: Device, signal_info: Option<&SemaphoreSignalInfo>) {
        self.call_async(
            &SIGNAL_SEMAPHORE,
            &[
                Arg::Value(&device),
                Arg::Input(signal_info.map(|info| info as &dyn Encode)),
            ],
        );
    }
}
