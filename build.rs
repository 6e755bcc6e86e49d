fn main() {
    // Only device builds link against ESP-IDF; host builds have nothing to do.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
