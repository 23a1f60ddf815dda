mod comp_name;
mod lang;
mod managed;
mod name_table;

pub use comp_name::{ComponentName, ComponentName2Protocol, ComponentNameProtocol};
pub use lang::Dialect;
pub use managed::{verify_managed, BootServicesRegistry, ManagementRegistry, PciIoProtocol};
pub use name_table::{NameEntry, NameKind, NameTable};

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;
use core::ffi::c_void;
use core::mem::offset_of;
use core::ptr;

use uefi::prelude::*;
use uefi::proto::unsafe_protocol;
use uefi::table::boot::{OpenProtocolAttributes, OpenProtocolParams};
use uefi::Result;
use uefi::{Guid, Identify};
use uefi_raw::Handle as RawHandle;

#[repr(C)]
struct NameContext {
    comp_name: ComponentNameProtocol,
    comp_name2: ComponentName2Protocol,
    driver_binding_handle: Handle,
    registry: Box<dyn ManagementRegistry>,
    protocols: Vec<(Guid, *mut c_void)>,
}
impl NameContext {
    fn new(driver_binding_handle: Handle, registry: Box<dyn ManagementRegistry>) -> Box<Self> {
        Box::new(Self {
            comp_name: comp_name::create_comp_name(),
            comp_name2: comp_name::create_comp_name2(),
            driver_binding_handle,
            registry,
            protocols: vec![],
        })
    }

    #[inline]
    unsafe fn from_comp_name_ptr<'a>(ptr: *const ComponentNameProtocol) -> &'a Self {
        &*ptr
            .cast::<u8>()
            .sub(offset_of!(Self, comp_name))
            .cast::<Self>()
    }
    #[inline]
    unsafe fn from_comp_name2_ptr<'a>(ptr: *const ComponentName2Protocol) -> &'a Self {
        &*ptr
            .cast::<u8>()
            .sub(offset_of!(Self, comp_name2))
            .cast::<Self>()
    }
}

/// Install `EFI_COMPONENT_NAME_PROTOCOL` and `EFI_COMPONENT_NAME2_PROTOCOL` on
/// `handle`, or on a new handle if `None`.
///
/// Controller names are only handed out for controllers `registry` reports as
/// managed by `driver_binding`.
pub fn install_component_name(
    bt: &BootServices,
    handle: Option<Handle>,
    driver_binding: Handle,
    registry: Box<dyn ManagementRegistry>,
) -> Result<Handle> {
    if let Some(handle) = handle {
        if let Ok(Some(_)) = unsafe { get_protocol_mut::<ComponentName2Protocol>(bt, handle) } {
            log::error!("component name already installed on {:?}, aborting", handle);
            return Err(uefi::Error::new(Status::ALREADY_STARTED, ()));
        }
    }

    let mut ctx = NameContext::new(driver_binding, registry);

    let res = unsafe {
        ctx.protocols = vec![
            (
                ComponentNameProtocol::GUID,
                ptr::addr_of_mut!(ctx.comp_name).cast(),
            ),
            (
                ComponentName2Protocol::GUID,
                ptr::addr_of_mut!(ctx.comp_name2).cast(),
            ),
        ];
        install_multiple_protocols(bt, handle, &ctx.protocols)
    };
    let handle = match res {
        Ok(Some(handle)) => handle,
        Ok(None) => return Err(uefi::Error::new(Status::INVALID_PARAMETER, ())),
        Err(e) => {
            let InstallError { pair, rolled_back } = e.data();
            let (protocol, interface) = pair;
            log::error!("failed to install protocol {} {:?}", protocol, interface);
            let (status, rolled_back) = (e.status(), *rolled_back);
            release_context(ctx, !rolled_back);
            return Err(uefi::Error::new(status, ()));
        }
    };

    log::debug!("component name installed on {:?}", handle);
    let _ = Box::into_raw(ctx);
    Ok(handle)
}

pub fn uninstall_component_name(bt: &BootServices, handle: Handle) -> Result {
    unsafe {
        let Some(comp_name2_ptr) = get_protocol_mut::<ComponentName2Protocol>(bt, handle)? else {
            return Err(uefi::Error::new(Status::NOT_FOUND, ()));
        };
        let ctx = NameContext::from_comp_name2_ptr(comp_name2_ptr);

        if let Err(e) = uninstall_multiple_protocols(bt, handle, &ctx.protocols) {
            let (protocol, interface) = e.data();
            log::error!("failed to uninstall protocol {} {:?}", protocol, interface);
            return Err(e.to_err_without_payload());
        };

        let _ = Box::from_raw(ctx as *const NameContext as *mut NameContext);
        log::debug!("component name removed from {:?}", handle);
        Ok(())
    }
}

/// Drop `ctx` unless firmware may still reach it through an installed interface.
fn release_context(ctx: Box<NameContext>, still_installed: bool) {
    if still_installed {
        log::error!("interfaces still installed, leaking component name context");
        let _ = Box::into_raw(ctx);
    }
}

#[derive(Debug)]
struct InstallError<'a> {
    pair: &'a (Guid, *mut c_void),
    /// interfaces installed before the failing one were removed again
    rolled_back: bool,
}

unsafe fn install_multiple_protocols<'a>(
    bt: &BootServices,
    mut handle: Option<Handle>,
    pairs: &'a [(Guid, *mut c_void)],
) -> Result<Option<Handle>, InstallError<'a>> {
    let Some((curr, pairs)) = pairs.split_last() else {
        return Ok(handle);
    };
    if !pairs.is_empty() {
        handle = install_multiple_protocols(bt, handle, pairs)?
    }

    let (protocol, interface) = curr;
    match bt.install_protocol_interface(handle, protocol, *interface) {
        Ok(h) => handle = Some(h),
        Err(e) => {
            let mut rolled_back = true;
            if let Some(handle) = handle {
                // roll back what is already in place
                if uninstall_multiple_protocols(bt, handle, pairs).is_err() {
                    log::error!("failed to roll back protocols on {:?}", handle);
                    rolled_back = false;
                }
            }
            let err = InstallError {
                pair: curr,
                rolled_back,
            };
            return Err(uefi::Error::new(e.status(), err));
        }
    }
    Ok(handle)
}

unsafe fn uninstall_multiple_protocols<'a>(
    bt: &BootServices,
    handle: Handle,
    pairs: &'a [(Guid, *mut c_void)],
) -> Result<(), &'a (Guid, *mut c_void)> {
    let Some((curr, pairs)) = pairs.split_first() else {
        return Ok(());
    };
    if !pairs.is_empty() {
        uninstall_multiple_protocols(bt, handle, pairs)?;
    }

    let (protocol, interface) = curr;
    if let Err(e) = bt.uninstall_protocol_interface(handle, protocol, *interface) {
        if install_multiple_protocols(bt, Some(handle), pairs).is_err() {
            log::error!("failed to restore protocols on {:?}", handle);
        }
        return Err(uefi::Error::new(e.status(), curr));
    }
    Ok(())
}

#[allow(clippy::missing_safety_doc)]
#[inline]
pub unsafe fn get_protocol_mut<P: uefi::proto::Protocol>(
    bt: &BootServices,
    handle: Handle,
) -> Result<Option<*mut P>> {
    let pt = bt.open_protocol::<P>(
        OpenProtocolParams {
            handle,
            agent: handle,
            controller: None,
        },
        OpenProtocolAttributes::GetProtocol,
    )?;
    Ok(pt.get_mut().map(|r| r as *mut _))
}
