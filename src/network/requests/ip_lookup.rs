use crate::errors::ProbeError;
use crate::network::client::RawResponse;
use crate::network::requests::Request;
use crate::results::IpInfo;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde_json::{Map, Value};
use std::net::IpAddr;

/// Field names used by the common IP geolocation services, most specific
/// first.
const IP_FIELDS: &[&str] = &["ip", "query", "ip_addr", "ipAddress"];
const COUNTRY_FIELDS: &[&str] =
    &["country_code", "countryCode", "country", "country_name"];
const CITY_FIELDS: &[&str] = &["city"];
const ISP_FIELDS: &[&str] = &["isp", "org", "organization", "asn_org"];

/// Country reported when a service gives an address but no country.
pub const UNKNOWN_COUNTRY: &str = "Unknown";

#[derive(Debug, Clone, Copy)]
pub struct IpLookup;

impl Request for IpLookup {
    type Response = IpInfo;

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert(USER_AGENT, super::user_agent());
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        headers
    }

    fn parse(&self, response: RawResponse) -> Result<IpInfo, ProbeError> {
        parse_ip_info(&response.body)
    }
}

/// Parse either a JSON object with any of the known field aliases or a
/// bare address in plain text.
pub fn parse_ip_info(body: &[u8]) -> Result<IpInfo, ProbeError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(fields)) => from_fields(&fields),
        Ok(_) => Err(ProbeError::parse("expected a JSON object")),
        Err(json_error) => {
            let text = String::from_utf8_lossy(body);
            let text = text.trim();

            match text.parse::<IpAddr>() {
                Ok(address) => Ok(IpInfo::new(
                    address.to_string(),
                    UNKNOWN_COUNTRY.to_string(),
                )),
                Err(_) => Err(json_error.into()),
            }
        }
    }
}

fn from_fields(fields: &Map<String, Value>) -> Result<IpInfo, ProbeError> {
    let ip = first_string(fields, IP_FIELDS).ok_or_else(|| {
        ProbeError::parse("response carries no recognizable address field")
    })?;

    let country = first_string(fields, COUNTRY_FIELDS)
        .unwrap_or_else(|| UNKNOWN_COUNTRY.to_string());

    let mut info = IpInfo::new(ip, country);
    info.city = first_string(fields, CITY_FIELDS);
    info.isp = first_string(fields, ISP_FIELDS);

    Ok(info)
}

fn first_string(fields: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    aliases
        .iter()
        .filter_map(|alias| fields.get(*alias))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn test_parses_ipapi_style_response() {
        let body = br#"{
            "ip": "198.51.100.23",
            "city": "Osaka",
            "country_code": "JP",
            "country_name": "Japan",
            "org": "Example Telecom"
        }"#;

        let info = parse_ip_info(body).unwrap();
        assert_eq!(info.ip, "198.51.100.23");
        assert_eq!(info.country, "JP");
        assert_eq!(info.city.as_deref(), Some("Osaka"));
        assert_eq!(info.isp.as_deref(), Some("Example Telecom"));
        assert!(!info.simulated);
    }

    #[test]
    fn test_parses_ip_api_com_aliases() {
        let body = br#"{"query":"192.0.2.1","countryCode":"DE","isp":"Kabel"}"#;

        let info = parse_ip_info(body).unwrap();
        assert_eq!(info.ip, "192.0.2.1");
        assert_eq!(info.country, "DE");
        assert_eq!(info.isp.as_deref(), Some("Kabel"));
        assert_eq!(info.city, None);
    }

    #[test]
    fn test_missing_country_is_unknown() {
        let info = parse_ip_info(br#"{"ip":"203.0.113.9"}"#).unwrap();
        assert_eq!(info.country, UNKNOWN_COUNTRY);
    }

    #[test]
    fn test_plain_text_address() {
        let info = parse_ip_info(b"2001:db8::1\n").unwrap();
        assert_eq!(info.ip, "2001:db8::1");
    }

    #[test]
    fn test_object_without_address_is_parse_error() {
        let error = parse_ip_info(br#"{"country":"FR"}"#).unwrap_err();
        assert_eq!(error.kind, ErrorKind::Parse);
    }

    #[test]
    fn test_html_is_parse_error() {
        let error = parse_ip_info(b"<html>rate limited</html>").unwrap_err();
        assert_eq!(error.kind, ErrorKind::Parse);
    }
}
