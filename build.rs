fn main() {
    println!("cargo:rerun-if-changed=config/node.json");

    // Device builds pull the ESP-IDF environment (linker args, sdkconfig).
    // Host builds for tests have nothing to export.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
