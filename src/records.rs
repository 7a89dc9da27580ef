//! Canonical records returned to clients.
//!
//! Field names carry spaces and mixed case for wire compatibility with the
//! classic WHOIS-style JSON consumed by existing clients; do not rename them.

use serde::{Deserialize, Serialize};

/// Registration data for a domain, assembled from RDAP or parsed WHOIS text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainInfo {
    #[serde(rename = "Domain Name")]
    pub domain_name: String,
    #[serde(rename = "Registrar")]
    pub registrar: String,
    #[serde(rename = "Registrar IANA ID")]
    pub registrar_iana_id: String,
    #[serde(rename = "Domain Status")]
    pub domain_status: Vec<String>,
    #[serde(rename = "Creation Date")]
    pub creation_date: String,
    #[serde(rename = "Registry Expiry Date")]
    pub registry_expiry_date: String,
    #[serde(rename = "Updated Date")]
    pub updated_date: String,
    #[serde(rename = "Name Server")]
    pub name_server: Vec<String>,
    #[serde(rename = "DNSSEC")]
    pub dnssec: String,
    #[serde(rename = "DNSSEC DS Data")]
    pub dnssec_ds_data: Vec<String>,
    #[serde(rename = "Last Update of Database")]
    pub last_update_of_db: String,
}

/// Registration data for an IP network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpInfo {
    #[serde(rename = "IP Network")]
    pub handle: String,
    #[serde(rename = "Address Range")]
    pub range: String,
    #[serde(rename = "Network Name")]
    pub net_name: String,
    #[serde(rename = "CIDR")]
    pub cidr: String,
    #[serde(rename = "Network Type")]
    pub network_type: String,
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "Status")]
    pub status: Vec<String>,
    #[serde(rename = "Creation Date")]
    pub creation_date: String,
    #[serde(rename = "Updated Date")]
    pub updated_date: String,
}

/// Registration data for an autonomous system number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsnInfo {
    #[serde(rename = "AS Number")]
    pub asn: String,
    #[serde(rename = "Network Name")]
    pub as_name: String,
    #[serde(rename = "Status")]
    pub status: Vec<String>,
    #[serde(rename = "Creation Date")]
    pub creation_date: String,
    #[serde(rename = "Updated Date")]
    pub updated_date: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_info_wire_keys() {
        let info = DomainInfo {
            domain_name: "example.com".to_string(),
            dnssec: "unsigned".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["Domain Name"], "example.com");
        assert_eq!(json["DNSSEC"], "unsigned");
        assert!(json.get("Registry Expiry Date").is_some());
        assert!(json.get("Last Update of Database").is_some());
    }

    #[test]
    fn domain_info_round_trips() {
        let info = DomainInfo {
            domain_name: "example.cn".to_string(),
            registrar: "Example Registrar".to_string(),
            domain_status: vec!["active".to_string(), "active".to_string()],
            creation_date: "2025-03-01T04:00:00Z".to_string(),
            registry_expiry_date: "2026-03-01T04:00:00Z".to_string(),
            name_server: vec!["ns1.example.com".to_string()],
            dnssec: "signedDelegation".to_string(),
            dnssec_ds_data: vec!["12345 13 2 ABCDEF".to_string()],
            ..Default::default()
        };
        let json = serde_json::to_string(&info).unwrap();
        let back: DomainInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, info);
    }

    #[test]
    fn ip_and_asn_wire_keys() {
        let ip = IpInfo {
            handle: "NET-203-0-113-0-1".to_string(),
            range: "203.0.113.0 - 203.0.113.255".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&ip).unwrap();
        assert_eq!(json["IP Network"], "NET-203-0-113-0-1");
        assert_eq!(json["Address Range"], "203.0.113.0 - 203.0.113.255");

        let asn = AsnInfo {
            asn: "AS64500".to_string(),
            as_name: "EXAMPLE-AS".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&asn).unwrap();
        assert_eq!(json["AS Number"], "AS64500");
        assert_eq!(json["Network Name"], "EXAMPLE-AS");
    }
}
