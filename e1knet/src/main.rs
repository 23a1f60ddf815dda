#![no_main]
#![no_std]

extern crate alloc;

use alloc::boxed::Box;

use uefi::prelude::*;
use uefi::proto::loaded_image::LoadedImage;
use uefi_e1knet::{BootServicesRegistry, PciIoProtocol};
use uefi_services::system_table;

const MIN_UEFI_REVISION: uefi::table::Revision = uefi::table::Revision::EFI_2_00;

static mut EVENT: Option<uefi::Event> = None;

#[entry]
fn main(image_handle: Handle, mut system_table: SystemTable<Boot>) -> Status {
    match uefi_services::init(&mut system_table) {
        Ok(event) => unsafe { EVENT = event },
        Err(e) => return e.status(),
    }
    let bt = system_table.boot_services();

    if system_table.uefi_revision() < MIN_UEFI_REVISION {
        log::error!(
            "system UEFI revision {} smaller than required {}",
            system_table.uefi_revision(),
            MIN_UEFI_REVISION
        );
        return Status::INCOMPATIBLE_VERSION;
    }

    // the image handle doubles as the driver binding handle
    let registry = BootServicesRegistry::<PciIoProtocol>::new(unsafe { system_table.unsafe_clone() });
    if let Err(e) =
        uefi_e1knet::install_component_name(bt, Some(image_handle), image_handle, Box::new(registry))
    {
        return e.status();
    }

    let mut image = match bt.open_protocol_exclusive::<LoadedImage>(image_handle) {
        Ok(image) => image,
        Err(e) => {
            log::error!("failed to open loaded image: {:?}", e);
            if let Err(e) = uefi_e1knet::uninstall_component_name(bt, image_handle) {
                log::warn!("failed to remove component name: {:?}", e);
            }
            return e.status();
        }
    };
    unsafe { image.set_unload(unload) };
    Status::SUCCESS
}

extern "efiapi" fn unload(image_handle: Handle) -> Status {
    let bt = unsafe { system_table().as_ref().boot_services() };
    if let Some(event) = unsafe { EVENT.take() } {
        if let Err(e) = bt.close_event(event) {
            log::warn!("failed to close logger event: {:?}", e);
        }
    }
    uefi_e1knet::uninstall_component_name(bt, image_handle).status()
}
