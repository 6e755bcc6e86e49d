//! WiFi station-mode adapter.
//!
//! Credentials are compiled in (`STATEIO_WIFI_SSID` / `STATEIO_WIFI_PASS`
//! at build time) and validated before the radio is touched.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver via `esp_idf_svc::wifi`.
//! - **all other targets**: validation only, for host-side tests.
//!
//! Failing to join at boot is the one fatal path: `main` restarts the device.

use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)"),
        }
    }
}

/// Build-time credentials.
pub fn credentials() -> Result<(&'static str, &'static str), ConnectivityError> {
    let ssid = option_env!("STATEIO_WIFI_SSID").ok_or(ConnectivityError::NoCredentials)?;
    let password = option_env!("STATEIO_WIFI_PASS").unwrap_or("");
    validate_ssid(ssid)?;
    validate_password(password)?;
    Ok((ssid, password))
}

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

pub fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

/// Join the configured network and block until an IP is assigned.
#[cfg(target_os = "espidf")]
pub fn connect(
    modem: esp_idf_svc::hal::modem::Modem,
    sysloop: esp_idf_svc::eventloop::EspSystemEventLoop,
    nvs: Option<esp_idf_svc::nvs::EspDefaultNvsPartition>,
    ssid: &str,
    password: &str,
) -> Result<esp_idf_svc::wifi::BlockingWifi<esp_idf_svc::wifi::EspWifi<'static>>, esp_idf_svc::sys::EspError> {
    use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
    use log::info;

    let mut wifi = BlockingWifi::wrap(EspWifi::new(modem, sysloop.clone(), nvs)?, sysloop)?;

    let mut client = ClientConfiguration {
        auth_method: if password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        },
        ..Default::default()
    };
    // Lengths were validated against the same bounds as these buffers.
    let _ = client.ssid.push_str(ssid);
    let _ = client.password.push_str(password);

    wifi.set_configuration(&Configuration::Client(client))?;
    wifi.start()?;
    info!("WiFi: connecting to '{}'", ssid);
    wifi.connect()?;
    wifi.wait_netif_up()?;
    info!("WiFi: connected, ip={:?}", wifi.wifi().sta_netif().get_ip_info().map(|i| i.ip));
    Ok(wifi)
}
