//! Data models for device portal payloads.

pub mod device;

pub use device::OperatingSystemInfo;
pub(crate) use device::{DeviceFamilyResponse, DeviceNameResponse};
