use std::env::var;

fn main() {
    let target = var("TARGET").unwrap_or_default();
    // only the driver image needs the boot service subsystem
    if target.ends_with("-uefi") {
        println!("cargo:rustc-link-arg-bins=/subsystem:EFI_BOOT_SERVICE_DRIVER");
    }
    println!("cargo:rerun-if-changed=build.rs");
}
