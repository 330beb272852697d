//! Response envelope and payload types for the Subsonic protocol.
//!
//! Every response is a [`Response`] wrapped under the `subsonic-response`
//! root. The serde shape here is the single source for both output formats:
//! JSON serializes it directly and the XML renderer walks the same tree
//! (scalars become attributes, objects and arrays become child elements).

use serde::Serialize;

/// Protocol version advertised in every envelope.
pub const API_VERSION: &str = "1.15.0";

/// Server name advertised in the `type` field.
pub const SERVER_TYPE: &str = "subsonic-bridge";

/// Root element name (XML) and top-level key (JSON).
pub const ROOT_NAME: &str = "subsonic-response";

/// XML namespace of the root element.
pub const XMLNS: &str = "http://subsonic.org/restapi";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Failed,
}

/// Protocol error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Generic,
    MissingParameter,
    ClientTooOld,
    ServerTooOld,
    WrongCredentials,
    NotAuthorized,
    NotFound,
}

impl ErrorCode {
    pub fn code(self) -> u16 {
        match self {
            Self::Generic => 0,
            Self::MissingParameter => 10,
            Self::ClientTooOld => 20,
            Self::ServerTooOld => 30,
            Self::WrongCredentials => 40,
            Self::NotAuthorized => 50,
            Self::NotFound => 70,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    pub code: u16,
    pub message: String,
}

/// The uniform root of every response.
///
/// Fields are private so `error` can only be present on a failed envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    status: Status,
    version: &'static str,
    #[serde(rename = "type")]
    server_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ApiError>,
    #[serde(flatten)]
    payload: Option<Payload>,
}

impl Response {
    /// An `ok` envelope with no payload.
    pub fn new() -> Self {
        Self {
            status: Status::Ok,
            version: API_VERSION,
            server_type: SERVER_TYPE,
            error: None,
            payload: None,
        }
    }

    pub fn with_payload(payload: Payload) -> Self {
        Self {
            payload: Some(payload),
            ..Self::new()
        }
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status: Status::Failed,
            error: Some(ApiError {
                code: code.code(),
                message: message.into(),
            }),
            ..Self::new()
        }
    }

    pub fn api_error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }

    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

/// At most one domain response per envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Payload {
    License(License),
    MusicFolders(MusicFolders),
    InternetRadioStations(InternetRadioStations),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct License {
    pub valid: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MusicFolders {
    #[serde(rename = "musicFolder")]
    pub list: Vec<MusicFolder>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MusicFolder {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InternetRadioStations {
    #[serde(rename = "internetRadioStation")]
    pub list: Vec<InternetRadioStation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternetRadioStation {
    pub id: String,
    pub name: String,
    pub stream_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub homepage_url: String,
}

impl InternetRadioStation {
    /// Build the protocol view of a configured station.
    pub fn from_config(station: &crate::config::RadioStation) -> Self {
        Self {
            id: format!("ir-{}", station.id),
            name: station.name.clone(),
            stream_url: station.stream_url.clone(),
            homepage_url: station.homepage_url.clone().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ok_envelope_shape() {
        let value = serde_json::to_value(Response::new()).unwrap();
        assert_eq!(
            value,
            json!({"status": "ok", "version": API_VERSION, "type": SERVER_TYPE})
        );
    }

    #[test]
    fn test_error_envelope_is_failed() {
        let resp = Response::error(ErrorCode::NotFound, "no such track");
        assert_eq!(resp.api_error().unwrap().code, 70);

        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["error"], json!({"code": 70, "message": "no such track"}));
    }

    #[test]
    fn test_payload_is_flattened_under_its_name() {
        let resp = Response::with_payload(Payload::MusicFolders(MusicFolders {
            list: vec![MusicFolder {
                id: 0,
                name: "music".into(),
            }],
        }));
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(
            value["musicFolders"],
            json!({"musicFolder": [{"id": 0, "name": "music"}]})
        );
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_radio_station_from_config() {
        let station = crate::config::RadioStation {
            id: 3,
            name: "Jazz".into(),
            stream_url: "http://radio.example/jazz".into(),
            homepage_url: None,
        };
        let view = InternetRadioStation::from_config(&station);
        assert_eq!(view.id, "ir-3");
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["streamUrl"], "http://radio.example/jazz");
        assert!(value.get("homepageUrl").is_none());
    }
}
