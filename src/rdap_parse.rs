//! RDAP response parsing.
//!
//! Registries disagree wildly about which optional members they emit, so the
//! parsers walk a loosely-typed JSON tree and treat every missing or
//! ill-typed branch as absent rather than fatal. Only a body that is not
//! JSON at all is an error.

use crate::errors::LookupError;
use crate::records::{AsnInfo, DomainInfo, IpInfo};
use serde_json::Value;

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key)?.as_str()
}

fn arr_field<'a>(value: &'a Value, key: &str) -> Option<&'a [Value]> {
    value.get(key)?.as_array().map(Vec::as_slice)
}

fn u64_field(value: &Value, key: &str) -> Option<u64> {
    value.get(key)?.as_u64()
}

fn string_list(value: &Value, key: &str) -> Vec<String> {
    arr_field(value, key)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Registrar name from a jCard: the `vcardArray[1]` entry whose first
/// element is `"fn"` carries the display name in position 3.
fn registrar_from_vcard(vcard: &Value) -> Option<String> {
    let items = vcard.as_array()?.get(1)?.as_array()?;
    for item in items {
        let parts = item.as_array()?;
        if parts.first()?.as_str()? == "fn" {
            return parts.get(3)?.as_str().map(str::to_string);
        }
    }
    None
}

fn apply_domain_event(info: &mut DomainInfo, action: &str, date: &str) {
    match action {
        "registration" => info.creation_date = date.to_string(),
        "expiration" => info.registry_expiry_date = date.to_string(),
        "last changed" => info.updated_date = date.to_string(),
        "last update of RDAP database" => info.last_update_of_db = date.to_string(),
        _ => {}
    }
}

/// Parse an RDAP domain response into the canonical record.
pub fn parse_rdap_domain(response: &str) -> Result<DomainInfo, LookupError> {
    let root: Value = serde_json::from_str(response)?;

    let mut info = DomainInfo {
        dnssec: "unsigned".to_string(),
        ..Default::default()
    };

    if let Some(ldh_name) = str_field(&root, "ldhName") {
        info.domain_name = ldh_name.to_string();
    }

    info.domain_status = string_list(&root, "status");

    if let Some(entities) = arr_field(&root, "entities") {
        for entity in entities {
            let is_registrar = arr_field(entity, "roles")
                .map(|roles| roles.iter().any(|r| r.as_str() == Some("registrar")))
                .unwrap_or(false);
            if !is_registrar {
                continue;
            }
            if let Some(vcard) = entity.get("vcardArray") {
                if let Some(name) = registrar_from_vcard(vcard) {
                    info.registrar = name;
                }
            }
            if let Some(id) = arr_field(entity, "publicIds")
                .and_then(|ids| ids.first())
                .and_then(|id| str_field(id, "identifier"))
            {
                info.registrar_iana_id = id.to_string();
            }
            break;
        }
    }

    if let Some(events) = arr_field(&root, "events") {
        for event in events {
            if let (Some(action), Some(date)) =
                (str_field(event, "eventAction"), str_field(event, "eventDate"))
            {
                apply_domain_event(&mut info, action, date);
            }
        }
    }

    if let Some(nameservers) = arr_field(&root, "nameservers") {
        info.name_server = nameservers
            .iter()
            .filter_map(|ns| str_field(ns, "ldhName"))
            .map(str::to_string)
            .collect();
    }

    if let Some(secure_dns) = root.get("secureDNS") {
        if secure_dns.get("delegationSigned").and_then(Value::as_bool) == Some(true) {
            info.dnssec = "signedDelegation".to_string();
            if let Some(ds_data) = arr_field(secure_dns, "dsData").filter(|d| !d.is_empty()) {
                for ds in ds_data {
                    if let (Some(key_tag), Some(algorithm), Some(digest_type), Some(digest)) = (
                        u64_field(ds, "keyTag"),
                        u64_field(ds, "algorithm"),
                        u64_field(ds, "digestType"),
                        str_field(ds, "digest"),
                    ) {
                        info.dnssec_ds_data
                            .push(format!("{key_tag} {algorithm} {digest_type} {digest}"));
                    }
                }
            } else if let Some(key_data) = arr_field(secure_dns, "keyData") {
                // Legacy registries publish keyData instead of dsData.
                for key in key_data {
                    if let (Some(algorithm), Some(flags), Some(protocol), Some(public_key)) = (
                        u64_field(key, "algorithm"),
                        u64_field(key, "flags"),
                        u64_field(key, "protocol"),
                        str_field(key, "publicKey"),
                    ) {
                        info.dnssec_ds_data
                            .push(format!("{algorithm} {flags} {protocol} {public_key}"));
                    }
                }
            }
        }
    }

    Ok(info)
}

/// Parse an RDAP IP network response into the canonical record.
pub fn parse_rdap_ip(response: &str) -> Result<IpInfo, LookupError> {
    let root: Value = serde_json::from_str(response)?;

    let mut info = IpInfo::default();

    if let Some(handle) = str_field(&root, "handle") {
        info.handle = handle.to_string();
    }

    if let Some(start) = str_field(&root, "startAddress") {
        info.range = start.to_string();
    }
    if let Some(end) = str_field(&root, "endAddress") {
        info.range = format!("{} - {end}", info.range);
    }

    if let Some(name) = str_field(&root, "name") {
        info.net_name = name.to_string();
    }

    if let Some(cidrs) = arr_field(&root, "cidr0_cidrs") {
        for cidr in cidrs {
            let prefix = str_field(cidr, "v4prefix").or_else(|| str_field(cidr, "v6prefix"));
            if let (Some(prefix), Some(length)) = (prefix, u64_field(cidr, "length")) {
                info.cidr = format!("{prefix}/{length}");
            }
        }
    }

    info.network_type = str_field(&root, "type").unwrap_or("Unknown").to_string();

    if let Some(country) = str_field(&root, "country") {
        info.country = country.to_string();
    }

    info.status = string_list(&root, "status");

    if let Some(events) = arr_field(&root, "events") {
        for event in events {
            if let (Some(action), Some(date)) =
                (str_field(event, "eventAction"), str_field(event, "eventDate"))
            {
                match action {
                    "registration" => info.creation_date = date.to_string(),
                    "last changed" => info.updated_date = date.to_string(),
                    _ => {}
                }
            }
        }
    }

    Ok(info)
}

/// Parse an RDAP autnum response into the canonical record.
pub fn parse_rdap_asn(response: &str) -> Result<AsnInfo, LookupError> {
    let root: Value = serde_json::from_str(response)?;

    let mut info = AsnInfo::default();

    if let Some(handle) = str_field(&root, "handle") {
        info.asn = handle.to_string();
    }

    if let Some(name) = str_field(&root, "name") {
        info.as_name = name.to_string();
    }

    info.status = string_list(&root, "status");

    if let Some(events) = arr_field(&root, "events") {
        for event in events {
            if let (Some(action), Some(date)) =
                (str_field(event, "eventAction"), str_field(event, "eventDate"))
            {
                match action {
                    "registration" => info.creation_date = date.to_string(),
                    "last changed" => info.updated_date = date.to_string(),
                    _ => {}
                }
            }
        }
    }

    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOMAIN_FIXTURE: &str = r#"{
        "objectClassName": "domain",
        "ldhName": "EXAMPLE.COM",
        "status": ["client delete prohibited", "client transfer prohibited"],
        "entities": [
            {
                "objectClassName": "entity",
                "roles": ["registrar"],
                "vcardArray": ["vcard", [
                    ["version", {}, "text", "4.0"],
                    ["fn", {}, "text", "RESERVED-Internet Assigned Numbers Authority"]
                ]],
                "publicIds": [{"type": "IANA Registrar ID", "identifier": "376"}]
            }
        ],
        "events": [
            {"eventAction": "registration", "eventDate": "1995-08-14T04:00:00Z"},
            {"eventAction": "expiration", "eventDate": "2026-08-13T04:00:00Z"},
            {"eventAction": "last changed", "eventDate": "2025-08-14T07:01:44Z"},
            {"eventAction": "last update of RDAP database", "eventDate": "2025-09-01T17:30:11Z"}
        ],
        "nameservers": [
            {"objectClassName": "nameserver", "ldhName": "A.IANA-SERVERS.NET"},
            {"objectClassName": "nameserver", "ldhName": "B.IANA-SERVERS.NET"}
        ],
        "secureDNS": {
            "delegationSigned": true,
            "dsData": [
                {"keyTag": 370, "algorithm": 13, "digestType": 2, "digest": "BE74359954660069D5C63D200C39F5603827D7DD02B56F120EE9F3A86764247C"}
            ]
        }
    }"#;

    #[test]
    fn parses_domain_response() {
        let info = parse_rdap_domain(DOMAIN_FIXTURE).unwrap();
        assert_eq!(info.domain_name, "EXAMPLE.COM");
        assert_eq!(
            info.registrar,
            "RESERVED-Internet Assigned Numbers Authority"
        );
        assert_eq!(info.registrar_iana_id, "376");
        assert_eq!(info.domain_status.len(), 2);
        assert_eq!(info.creation_date, "1995-08-14T04:00:00Z");
        assert_eq!(info.registry_expiry_date, "2026-08-13T04:00:00Z");
        assert_eq!(info.updated_date, "2025-08-14T07:01:44Z");
        assert_eq!(info.last_update_of_db, "2025-09-01T17:30:11Z");
        assert_eq!(
            info.name_server,
            vec!["A.IANA-SERVERS.NET", "B.IANA-SERVERS.NET"]
        );
        assert_eq!(info.dnssec, "signedDelegation");
        assert_eq!(
            info.dnssec_ds_data,
            vec!["370 13 2 BE74359954660069D5C63D200C39F5603827D7DD02B56F120EE9F3A86764247C"]
        );
    }

    #[test]
    fn unsigned_when_delegation_not_signed() {
        let info =
            parse_rdap_domain(r#"{"ldhName": "example.org", "secureDNS": {"delegationSigned": false}}"#)
                .unwrap();
        assert_eq!(info.dnssec, "unsigned");
        assert!(info.dnssec_ds_data.is_empty());
    }

    #[test]
    fn key_data_fallback() {
        let info = parse_rdap_domain(
            r#"{"ldhName": "example.net", "secureDNS": {
                "delegationSigned": true,
                "keyData": [{"algorithm": 13, "flags": 257, "protocol": 3, "publicKey": "mdsswUyr3DPW132mOi8V9xESWE8jTo0dxCjjnopKl+GqJxpVXckHAeF+KkxLbxILfDLUT0rAK9iUzy1L53eKGQ=="}]
            }}"#,
        )
        .unwrap();
        assert_eq!(info.dnssec, "signedDelegation");
        assert_eq!(info.dnssec_ds_data.len(), 1);
        assert!(info.dnssec_ds_data[0].starts_with("13 257 3 "));
    }

    #[test]
    fn missing_branches_are_skipped() {
        let info = parse_rdap_domain(r#"{"ldhName": "bare.example"}"#).unwrap();
        assert_eq!(info.domain_name, "bare.example");
        assert!(info.registrar.is_empty());
        assert!(info.domain_status.is_empty());
        assert_eq!(info.dnssec, "unsigned");

        // Ill-typed members are skipped too, never fatal.
        let info =
            parse_rdap_domain(r#"{"ldhName": 42, "status": "active", "events": {}}"#).unwrap();
        assert!(info.domain_name.is_empty());
        assert!(info.domain_status.is_empty());
    }

    #[test]
    fn non_json_is_a_parse_error() {
        assert!(matches!(
            parse_rdap_domain("<html>not json</html>"),
            Err(LookupError::Parse(_))
        ));
    }

    #[test]
    fn parses_ip_response() {
        let info = parse_rdap_ip(
            r#"{
                "handle": "NET-203-0-113-0-1",
                "startAddress": "203.0.113.0",
                "endAddress": "203.0.113.255",
                "name": "DOC-NET",
                "cidr0_cidrs": [{"v4prefix": "203.0.113.0", "length": 24}],
                "type": "ASSIGNED PORTABLE",
                "country": "AU",
                "status": ["active"],
                "events": [
                    {"eventAction": "registration", "eventDate": "2011-02-08T00:00:00Z"},
                    {"eventAction": "last changed", "eventDate": "2020-05-20T03:04:05Z"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(info.handle, "NET-203-0-113-0-1");
        assert_eq!(info.range, "203.0.113.0 - 203.0.113.255");
        assert_eq!(info.net_name, "DOC-NET");
        assert_eq!(info.cidr, "203.0.113.0/24");
        assert_eq!(info.network_type, "ASSIGNED PORTABLE");
        assert_eq!(info.country, "AU");
        assert_eq!(info.creation_date, "2011-02-08T00:00:00Z");
        assert_eq!(info.updated_date, "2020-05-20T03:04:05Z");
    }

    #[test]
    fn ip_v6_prefix_and_unknown_type() {
        let info = parse_rdap_ip(
            r#"{"handle": "2001:db8::/32", "cidr0_cidrs": [{"v6prefix": "2001:db8::", "length": 32}]}"#,
        )
        .unwrap();
        assert_eq!(info.cidr, "2001:db8::/32");
        assert_eq!(info.network_type, "Unknown");
    }

    #[test]
    fn parses_asn_response() {
        let info = parse_rdap_asn(
            r#"{
                "handle": "AS64500",
                "name": "EXAMPLE-AS",
                "status": ["active"],
                "events": [
                    {"eventAction": "registration", "eventDate": "2004-03-01T00:00:00Z"},
                    {"eventAction": "last changed", "eventDate": "2023-10-10T10:10:10Z"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(info.asn, "AS64500");
        assert_eq!(info.as_name, "EXAMPLE-AS");
        assert_eq!(info.status, vec!["active"]);
        assert_eq!(info.creation_date, "2004-03-01T00:00:00Z");
        assert_eq!(info.updated_date, "2023-10-10T10:10:10Z");
    }
}
