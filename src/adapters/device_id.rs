//! Device identity derived from the ESP32 factory MAC address.
//!
//! The MQTT client id is the last 3 bytes of the 6-byte MAC in lowercase
//! hex (e.g. `efcafe`).  It is deterministic across reboots (factory-burned
//! eFuse MAC) and names every topic the device uses.

use core::fmt::Write;

/// Fixed-size client id string: "xxyyzz".
pub type ClientId = heapless::String<8>;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

pub fn client_id(mac: &MacAddress) -> ClientId {
    let mut id = ClientId::new();
    let _ = write!(id, "{:02x}{:02x}{:02x}", mac[3], mac[4], mac[5]);
    id
}

/// `AA:BB:CC:DD:EE:FF`, for the adoption `network` section.
pub fn mac_display(mac: &MacAddress) -> heapless::String<18> {
    let mut s = heapless::String::new();
    let _ = write!(
        s,
        "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
        mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
    );
    s
}
