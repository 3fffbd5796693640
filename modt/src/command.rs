//! Fixed command catalog of the MOD-t.
//!
//! Every request the printer understands outside of file uploads is a
//! constant frame. Two-way requests go to the control endpoint and are
//! answered on [`endpoint::CONTROL_IN`]; the status request goes to the
//! file endpoint and is answered on [`endpoint::STATUS_IN`].

use std::fmt;

/// Bulk endpoint addresses.
pub mod endpoint {
    /// Control OUT endpoint (two-way command requests, init sequence).
    pub const CONTROL_OUT: u8 = 0x02;
    /// Control IN endpoint (two-way command replies).
    pub const CONTROL_IN: u8 = 0x81;
    /// File OUT endpoint (status requests, file push metadata and blocks).
    pub const FILE_OUT: u8 = 0x04;
    /// Status IN endpoint (status replies).
    pub const STATUS_IN: u8 = 0x83;
}

/// A statically defined request frame and the endpoint it is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandPayload {
    /// OUT endpoint the frame is written to.
    pub endpoint: u8,
    /// Complete frame bytes.
    pub body: &'static [u8],
}

const BIO_GET_VERSION: &[u8] = br#"{"transport":{"attrs":["request","twoway"],"id":3},"data":{"command":{"idx":0,"name":"bio_get_version"}}};"#;
const ENTER_DFU_MODE: &[u8] = br#"{"transport":{"attrs":["request","twoway"],"id":7},"data":{"command":{"idx":53,"name":"Enter_dfu_mode"}}};"#;
const LOAD_INITIATE: &[u8] = br#"{"transport":{"attrs":["request","twoway"],"id":9},"data":{"command":{"idx":52,"name":"load_initiate"}}};"#;
const UNLOAD_INITIATE: &[u8] = br#"{"transport":{"attrs":["request","twoway"],"id":11},"data":{"command":{"idx":51,"name":"unload_initiate"}}};"#;
const WIFI_CLIENT_GET_STATUS: &[u8] = br#"{"transport":{"attrs":["request","twoway"],"id":5},"data":{"command":{"idx":22,"name":"wifi_client_get_status","args":{"interface_t":0}}}};"#;
const STATUS: &[u8] = br#"{"metadata":{"version":1,"type":"status"}}"#;

/// Named printer commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Query the bio firmware version.
    BioVersion,
    /// Reboot into DFU mode.
    EnterDfu,
    /// Start loading filament.
    LoadFilament,
    /// Start unloading filament.
    UnloadFilament,
    /// Query the wifi client status.
    WifiStatus,
    /// Query the general printer status.
    Status,
}

impl Command {
    /// Every catalog entry.
    pub const ALL: [Self; 6] = [
        Self::BioVersion,
        Self::EnterDfu,
        Self::LoadFilament,
        Self::UnloadFilament,
        Self::WifiStatus,
        Self::Status,
    ];

    /// Frame and target endpoint for this command.
    pub fn payload(self) -> CommandPayload {
        let (endpoint, body) = match self {
            Self::BioVersion => (endpoint::CONTROL_OUT, BIO_GET_VERSION),
            Self::EnterDfu => (endpoint::CONTROL_OUT, ENTER_DFU_MODE),
            Self::LoadFilament => (endpoint::CONTROL_OUT, LOAD_INITIATE),
            Self::UnloadFilament => (endpoint::CONTROL_OUT, UNLOAD_INITIATE),
            Self::WifiStatus => (endpoint::CONTROL_OUT, WIFI_CLIENT_GET_STATUS),
            Self::Status => (endpoint::FILE_OUT, STATUS),
        };
        CommandPayload { endpoint, body }
    }

    /// OUT endpoint the command is written to.
    pub fn endpoint(self) -> u8 {
        self.payload().endpoint
    }

    /// IN endpoint carrying the reply, if the command has one.
    pub fn response_endpoint(self) -> Option<u8> {
        match self {
            Self::BioVersion | Self::WifiStatus => Some(endpoint::CONTROL_IN),
            Self::Status => Some(endpoint::STATUS_IN),
            Self::EnterDfu | Self::LoadFilament | Self::UnloadFilament => None,
        }
    }

    /// Command-line name of the command.
    pub fn name(self) -> &'static str {
        match self {
            Self::BioVersion => "bio_version",
            Self::EnterDfu => "enter_dfu",
            Self::LoadFilament => "load_filament",
            Self::UnloadFilament => "unload_filament",
            Self::WifiStatus => "wifi_status",
            Self::Status => "status",
        }
    }

    /// Look up a command by its command-line name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|cmd| cmd.name() == name)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::frame::{FRAME_TERMINATOR, StatusFrame, is_well_formed};

    #[test]
    fn test_every_payload_is_well_formed() {
        for cmd in Command::ALL {
            assert!(is_well_formed(cmd.payload().body), "{cmd}");
        }
    }

    #[test]
    fn test_two_way_commands_are_terminated() {
        for cmd in Command::ALL {
            let payload = cmd.payload();
            let terminated = payload.body.last() == Some(&FRAME_TERMINATOR);
            assert_eq!(terminated, cmd != Command::Status, "{cmd}");
            if cmd != Command::Status {
                assert_eq!(payload.endpoint, endpoint::CONTROL_OUT);
            }
        }
    }

    #[test]
    fn test_status_matches_encoded_frame() {
        let payload = Command::Status.payload();
        assert_eq!(payload.endpoint, endpoint::FILE_OUT);
        assert_eq!(payload.body, StatusFrame::default().encode().unwrap().as_slice());
        assert_eq!(Command::Status.response_endpoint(), Some(0x83));
    }

    #[test]
    fn test_transport_ids_and_indices() {
        let cases = [
            (Command::BioVersion, 3, 0, "bio_get_version"),
            (Command::EnterDfu, 7, 53, "Enter_dfu_mode"),
            (Command::LoadFilament, 9, 52, "load_initiate"),
            (Command::UnloadFilament, 11, 51, "unload_initiate"),
            (Command::WifiStatus, 5, 22, "wifi_client_get_status"),
        ];
        for (cmd, id, idx, name) in cases {
            let body = cmd.payload().body;
            let value: serde_json::Value =
                serde_json::from_slice(&body[..body.len() - 1]).unwrap();
            assert_eq!(value["transport"]["id"], id);
            assert_eq!(value["transport"]["attrs"][1], "twoway");
            assert_eq!(value["data"]["command"]["idx"], idx);
            assert_eq!(value["data"]["command"]["name"], name);
        }
    }

    #[test]
    fn test_response_endpoints() {
        assert_eq!(Command::BioVersion.response_endpoint(), Some(0x81));
        assert_eq!(Command::WifiStatus.response_endpoint(), Some(0x81));
        assert_eq!(Command::EnterDfu.response_endpoint(), None);
        assert_eq!(Command::LoadFilament.response_endpoint(), None);
        assert_eq!(Command::UnloadFilament.response_endpoint(), None);
    }

    #[test]
    fn test_from_name() {
        for cmd in Command::ALL {
            assert_eq!(Command::from_name(cmd.name()), Some(cmd));
        }
        assert_eq!(Command::from_name("wifi_stats"), None);
    }
}
