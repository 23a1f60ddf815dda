use super::*;

use core::ffi::CStr;
use uefi::CStr16;

use lang::Dialect;
use managed::{verify_managed, ManagementRegistry};
use name_table::NameKind;

#[repr(C)]
#[derive(Debug)]
#[unsafe_protocol("107a772c-d5e1-11d4-9a46-0090273fc14d")]
pub struct ComponentNameProtocol {
    pub get_driver_name: unsafe extern "efiapi" fn(
        this: *const Self,
        language: *const u8,
        driver_name: *mut *const u16,
    ) -> Status,
    pub get_controller_name: unsafe extern "efiapi" fn(
        this: *const Self,
        controller_handle: RawHandle,
        child_handle: RawHandle,
        language: *const u8,
        controller_name: *mut *const u16,
    ) -> Status,
    pub supported_languages: *const u8,
}

#[repr(C)]
#[derive(Debug)]
#[unsafe_protocol("6a7a5cff-e8d9-4f70-bada-75ab3025ce14")]
pub struct ComponentName2Protocol {
    pub get_driver_name: unsafe extern "efiapi" fn(
        this: *const Self,
        language: *const u8,
        driver_name: *mut *const u16,
    ) -> Status,
    pub get_controller_name: unsafe extern "efiapi" fn(
        this: *const Self,
        controller_handle: RawHandle,
        child_handle: RawHandle,
        language: *const u8,
        controller_name: *mut *const u16,
    ) -> Status,
    pub supported_languages: *const u8,
}

/// One public face of the driver's names, ISO 639-2 or RFC 4646 flavored.
#[derive(Debug, Clone, Copy)]
pub struct ComponentName {
    dialect: Dialect,
    supported_languages: &'static CStr,
}
impl ComponentName {
    pub const ISO639: Self = Self {
        dialect: Dialect::Iso639,
        supported_languages: c"eng",
    };
    pub const RFC4646: Self = Self {
        dialect: Dialect::Rfc4646,
        supported_languages: c"en",
    };

    #[inline]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }
    #[inline]
    pub fn supported_languages(&self) -> &'static CStr {
        self.supported_languages
    }

    fn lookup(&self, language: &CStr, kind: NameKind) -> Result<&'static CStr16> {
        let requested = language.to_bytes();
        lang::resolve(
            requested,
            self.supported_languages.to_bytes(),
            kind.table(),
            self.dialect,
        )
        .ok_or_else(|| {
            log::debug!(
                "{:?} name not available in {:?} ({:?})",
                kind,
                language,
                self.dialect
            );
            uefi::Error::new(Status::UNSUPPORTED, ())
        })
    }

    pub fn driver_name(&self, language: Option<&CStr>) -> Result<&'static CStr16> {
        self.lookup(language_arg(language)?, NameKind::Driver)
    }

    /// Name of `controller`, or of its `child`, as seen by the driver owning
    /// `driver_binding`. Both get the same name.
    pub fn controller_name(
        &self,
        registry: &dyn ManagementRegistry,
        driver_binding: Handle,
        controller: Option<Handle>,
        child: Option<Handle>,
        language: Option<&CStr>,
    ) -> Result<&'static CStr16> {
        let language = language_arg(language)?;
        verify_managed(registry, controller, child, driver_binding)?;
        self.lookup(language, NameKind::Controller)
    }
}

fn language_arg(language: Option<&CStr>) -> Result<&CStr> {
    match language {
        Some(language) if !language.is_empty() => Ok(language),
        _ => Err(uefi::Error::new(Status::INVALID_PARAMETER, ())),
    }
}

#[inline]
unsafe fn language_from_ptr<'a>(language: *const u8) -> Option<&'a CStr> {
    (!language.is_null()).then(|| CStr::from_ptr(language.cast()))
}

unsafe fn driver_name_ffi(
    identity: ComponentName,
    language: *const u8,
    driver_name: *mut *const u16,
) -> Status {
    if driver_name.is_null() {
        return Status::INVALID_PARAMETER;
    }
    match identity.driver_name(language_from_ptr(language)) {
        Err(e) => e.status(),
        Ok(name) => {
            *driver_name = name.as_ptr().cast();
            Status::SUCCESS
        }
    }
}

unsafe fn controller_name_ffi(
    identity: ComponentName,
    ctx: &NameContext,
    controller_handle: RawHandle,
    child_handle: RawHandle,
    language: *const u8,
    controller_name: *mut *const u16,
) -> Status {
    if controller_name.is_null() {
        return Status::INVALID_PARAMETER;
    }
    let res = identity.controller_name(
        ctx.registry.as_ref(),
        ctx.driver_binding_handle,
        Handle::from_ptr(controller_handle),
        Handle::from_ptr(child_handle),
        language_from_ptr(language),
    );
    match res {
        Err(e) => e.status(),
        Ok(name) => {
            *controller_name = name.as_ptr().cast();
            Status::SUCCESS
        }
    }
}

unsafe extern "efiapi" fn get_driver_name(
    this: *const ComponentNameProtocol,
    language: *const u8,
    driver_name: *mut *const u16,
) -> Status {
    if this.is_null() {
        return Status::INVALID_PARAMETER;
    }
    driver_name_ffi(ComponentName::ISO639, language, driver_name)
}

unsafe extern "efiapi" fn get_controller_name(
    this: *const ComponentNameProtocol,
    controller_handle: RawHandle,
    child_handle: RawHandle,
    language: *const u8,
    controller_name: *mut *const u16,
) -> Status {
    if this.is_null() {
        return Status::INVALID_PARAMETER;
    }
    let ctx = NameContext::from_comp_name_ptr(this);
    controller_name_ffi(
        ComponentName::ISO639,
        ctx,
        controller_handle,
        child_handle,
        language,
        controller_name,
    )
}

unsafe extern "efiapi" fn get_driver_name2(
    this: *const ComponentName2Protocol,
    language: *const u8,
    driver_name: *mut *const u16,
) -> Status {
    if this.is_null() {
        return Status::INVALID_PARAMETER;
    }
    driver_name_ffi(ComponentName::RFC4646, language, driver_name)
}

unsafe extern "efiapi" fn get_controller_name2(
    this: *const ComponentName2Protocol,
    controller_handle: RawHandle,
    child_handle: RawHandle,
    language: *const u8,
    controller_name: *mut *const u16,
) -> Status {
    if this.is_null() {
        return Status::INVALID_PARAMETER;
    }
    let ctx = NameContext::from_comp_name2_ptr(this);
    controller_name_ffi(
        ComponentName::RFC4646,
        ctx,
        controller_handle,
        child_handle,
        language,
        controller_name,
    )
}

pub fn create_comp_name() -> ComponentNameProtocol {
    ComponentNameProtocol {
        get_driver_name,
        get_controller_name,
        supported_languages: ComponentName::ISO639.supported_languages().as_ptr().cast(),
    }
}

pub fn create_comp_name2() -> ComponentName2Protocol {
    ComponentName2Protocol {
        get_driver_name: get_driver_name2,
        get_controller_name: get_controller_name2,
        supported_languages: ComponentName::RFC4646.supported_languages().as_ptr().cast(),
    }
}
