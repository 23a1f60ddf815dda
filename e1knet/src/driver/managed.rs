use core::marker::PhantomData;

use uefi::prelude::*;
use uefi::proto::{unsafe_protocol, Protocol};
use uefi::table::boot::{OpenProtocolAttributes, OpenProtocolParams};
use uefi::Result;

/// Answers whether handles belong to a driver.
pub trait ManagementRegistry {
    /// `handle` is known to the handle database.
    fn is_valid_handle(&self, handle: Handle) -> bool;

    /// `controller` is currently opened BY_DRIVER on behalf of `driver_binding`.
    fn is_managed(&self, controller: Handle, driver_binding: Handle) -> bool;
}

/// PCI I/O protocol, only its identity is needed here.
#[repr(C)]
#[unsafe_protocol("4cf5b200-68b8-4ca5-9eec-b23e3f50029a")]
pub struct PciIoProtocol {
    _opaque: [u8; 0],
}

/// Firmware backed registry, a controller is managed if `P` on it has been
/// opened BY_DRIVER by the driver binding handle.
pub struct BootServicesRegistry<P: Protocol = PciIoProtocol> {
    st: SystemTable<Boot>,
    _protocol: PhantomData<P>,
}
impl<P: Protocol> BootServicesRegistry<P> {
    pub fn new(st: SystemTable<Boot>) -> Self {
        Self {
            st,
            _protocol: PhantomData,
        }
    }
}
impl<P: Protocol> ManagementRegistry for BootServicesRegistry<P> {
    fn is_valid_handle(&self, handle: Handle) -> bool {
        self.st.boot_services().protocols_per_handle(handle).is_ok()
    }

    fn is_managed(&self, controller: Handle, driver_binding: Handle) -> bool {
        let bt = self.st.boot_services();
        let res = unsafe {
            bt.open_protocol::<P>(
                OpenProtocolParams {
                    handle: controller,
                    agent: driver_binding,
                    controller: Some(controller),
                },
                OpenProtocolAttributes::ByDriver,
            )
        };
        match res {
            // nobody had it open, closed again on drop
            Ok(_pt) => false,
            Err(e) => e.status() == Status::ALREADY_STARTED,
        }
    }
}

/// Check that `controller` (and `child`, if given) may be named by the driver
/// owning `driver_binding`.
///
/// A missing `child` asks about the bus controller itself. Bus and child
/// controllers are not told apart beyond handle validity.
pub fn verify_managed(
    registry: &dyn ManagementRegistry,
    controller: Option<Handle>,
    child: Option<Handle>,
    driver_binding: Handle,
) -> Result {
    let Some(controller) = controller else {
        return Err(uefi::Error::new(Status::INVALID_PARAMETER, ()));
    };
    check_child(registry, child)?;

    if !registry.is_managed(controller, driver_binding) {
        log::debug!(
            "controller {:?} not managed by {:?}",
            controller,
            driver_binding
        );
        return Err(uefi::Error::new(Status::UNSUPPORTED, ()));
    }
    Ok(())
}

fn check_child(registry: &dyn ManagementRegistry, child: Option<Handle>) -> Result {
    match child {
        Some(child) if !registry.is_valid_handle(child) => {
            log::debug!("invalid child handle {:?}", child);
            Err(uefi::Error::new(Status::INVALID_PARAMETER, ()))
        }
        _ => Ok(()),
    }
}
