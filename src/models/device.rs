//! Wire types for the device-info endpoints.
//!
//! The portal answers with PascalCase JSON; these types parse it into
//! the snapshot fields the session exposes. The schema is treated as
//! opaque beyond the named fields.

use serde::Deserialize;

/// Operating-system snapshot reported by the device.
///
/// Populated only after a successful full handshake; observers see
/// `None` before that, never a placeholder value.
#[derive(Debug, Clone, Deserialize)]
pub struct OperatingSystemInfo {
    #[serde(rename = "ComputerName")]
    pub name: String,
    #[serde(rename = "Language")]
    pub language: String,
    #[serde(rename = "OsEdition")]
    pub edition: String,
    #[serde(rename = "OsEditionId")]
    pub edition_id: u32,
    #[serde(rename = "OsVersion")]
    pub version: String,
    #[serde(rename = "Platform")]
    pub platform: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeviceNameResponse {
    #[serde(rename = "ComputerName")]
    pub(crate) name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeviceFamilyResponse {
    #[serde(rename = "DeviceType")]
    pub(crate) family: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_os_info_payload() {
        let json = r#"{
            "ComputerName": "LIVING-ROOM-XBOX",
            "Language": "en-US",
            "OsEdition": "Professional",
            "OsEditionId": 48,
            "OsVersion": "10.0.19041.1",
            "Platform": "Xbox One"
        }"#;

        let info: OperatingSystemInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.name, "LIVING-ROOM-XBOX");
        assert_eq!(info.language, "en-US");
        assert_eq!(info.edition, "Professional");
        assert_eq!(info.edition_id, 48);
        assert_eq!(info.version, "10.0.19041.1");
        assert_eq!(info.platform, "Xbox One");
    }

    #[test]
    fn parses_name_and_family_payloads() {
        let name: DeviceNameResponse =
            serde_json::from_str(r#"{"ComputerName": "DESKTOP-12345"}"#).unwrap();
        assert_eq!(name.name, "DESKTOP-12345");

        let family: DeviceFamilyResponse =
            serde_json::from_str(r#"{"DeviceType": "Windows.Desktop"}"#).unwrap();
        assert_eq!(family.family, "Windows.Desktop");
    }
}
