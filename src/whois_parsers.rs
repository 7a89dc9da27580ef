//! Per-TLD WHOIS free-text parsers.
//!
//! Each parser regex-extracts named fields from a registry's free-text
//! response and normalizes them into the same canonical [`DomainInfo`] the
//! RDAP path produces. A parser succeeds only when registrar, creation date
//! and expiry date were all found (`.au` is the exception: its registry
//! omits expiry for some license classes, so only the registrar is
//! required); anything less is reported as resource-not-found, which is how
//! these registries express "no such domain".
//!
//! Repeated `Domain Status:` lines are kept in order, duplicates included.

use crate::errors::LookupError;
use crate::records::DomainInfo;
use chrono::{FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

pub type ParseFn = fn(&str, &str) -> Result<DomainInfo, LookupError>;

/// Parser dispatch by (punycoded) TLD label, IDN aliases included.
pub fn parser_for_tld(tld: &str) -> Option<ParseFn> {
    match tld {
        "cn" | "xn--fiqs8s" | "xn--fiqz9s" => Some(parse_cn),
        "hk" | "xn--j6w193g" => Some(parse_hk),
        "tw" => Some(parse_tw),
        "so" | "sb" | "la" => Some(parse_icann),
        "sg" => Some(parse_sg),
        "mo" => Some(parse_mo),
        "ru" | "su" => Some(parse_ru),
        "au" => Some(parse_au),
        _ => None,
    }
}

fn first_capture<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    re.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str())
}

fn all_captures(re: &Regex, text: &str) -> Vec<String> {
    re.captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

fn now_utc_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// CNNIC and TWNIC timestamps are `YYYY-MM-DD HH:MM:SS` in CST (UTC+8).
fn cst_to_utc_rfc3339(text: &str) -> Option<String> {
    let naive = NaiveDateTime::parse_from_str(text.trim(), "%Y-%m-%d %H:%M:%S").ok()?;
    let cst = FixedOffset::east_opt(8 * 3600)?;
    let utc = cst.from_local_datetime(&naive).single()?.with_timezone(&Utc);
    Some(utc.to_rfc3339_opts(SecondsFormat::Secs, true))
}

fn not_found_guard(info: DomainInfo) -> Result<DomainInfo, LookupError> {
    if info.registrar.is_empty()
        || info.creation_date.is_empty()
        || info.registry_expiry_date.is_empty()
    {
        return Err(LookupError::ResourceNotFound);
    }
    Ok(info)
}

/// `.cn` and its IDN aliases (whois.cnnic.cn).
pub fn parse_cn(response: &str, domain: &str) -> Result<DomainInfo, LookupError> {
    static RE_CREATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"Registration Time: (.*)").unwrap());
    static RE_EXPIRY: Lazy<Regex> = Lazy::new(|| Regex::new(r"Expiration Time: (.*)").unwrap());
    static RE_NS: Lazy<Regex> = Lazy::new(|| Regex::new(r"Name Server: (.*)").unwrap());
    static RE_DNSSEC: Lazy<Regex> = Lazy::new(|| Regex::new(r"DNSSEC: (.*)").unwrap());
    static RE_REGISTRAR: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"Sponsoring Registrar: (.*)").unwrap());
    static RE_STATUS: Lazy<Regex> = Lazy::new(|| Regex::new(r"Domain Status: (.*)").unwrap());

    let mut info = DomainInfo {
        domain_name: domain.to_string(),
        ..Default::default()
    };

    if let Some(raw) = first_capture(&RE_CREATION, response) {
        info.creation_date = cst_to_utc_rfc3339(raw)
            .ok_or_else(|| LookupError::Parse(format!("invalid registration time: {raw}")))?;
    }
    if let Some(raw) = first_capture(&RE_EXPIRY, response) {
        info.registry_expiry_date = cst_to_utc_rfc3339(raw)
            .ok_or_else(|| LookupError::Parse(format!("invalid expiration time: {raw}")))?;
    }

    info.name_server = all_captures(&RE_NS, response);
    if let Some(dnssec) = first_capture(&RE_DNSSEC, response) {
        info.dnssec = dnssec.to_string();
    }
    if let Some(registrar) = first_capture(&RE_REGISTRAR, response) {
        info.registrar = registrar.to_string();
    }
    info.domain_status = all_captures(&RE_STATUS, response);
    info.last_update_of_db = now_utc_rfc3339();

    not_found_guard(info)
}

/// `.hk` and its IDN alias (whois.hkirc.hk). Dates are `DD-MM-YYYY`;
/// nameservers sit in a block under `Name Servers Information:`.
pub fn parse_hk(response: &str, domain: &str) -> Result<DomainInfo, LookupError> {
    static RE_CREATION: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"Domain Name Commencement Date: (.*)").unwrap());
    static RE_EXPIRY: Lazy<Regex> = Lazy::new(|| Regex::new(r"Expiry Date: (.*)").unwrap());
    static RE_NS: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"Name Servers Information:\s*\n\n((?:.+\n)+)").unwrap());
    static RE_DNSSEC: Lazy<Regex> = Lazy::new(|| Regex::new(r"DNSSEC: (.*)").unwrap());
    static RE_REGISTRAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"Registrar Name: (.*)").unwrap());
    static RE_STATUS: Lazy<Regex> = Lazy::new(|| Regex::new(r"Domain Status: (.*)").unwrap());

    let mut info = DomainInfo {
        domain_name: domain.to_string(),
        ..Default::default()
    };

    if let Some(raw) = first_capture(&RE_CREATION, response) {
        if let Ok(date) = NaiveDate::parse_from_str(raw.trim(), "%d-%m-%Y") {
            info.creation_date = date.format("%Y-%m-%d").to_string();
        }
    }
    if let Some(raw) = first_capture(&RE_EXPIRY, response) {
        if let Ok(date) = NaiveDate::parse_from_str(raw.trim(), "%d-%m-%Y") {
            info.registry_expiry_date = date.format("%Y-%m-%d").to_string();
        }
    }

    if let Some(block) = first_capture(&RE_NS, response) {
        info.name_server = block
            .trim()
            .lines()
            .map(|line| line.trim().to_string())
            .collect();
    }
    if let Some(dnssec) = first_capture(&RE_DNSSEC, response) {
        info.dnssec = dnssec.trim().to_string();
    }
    if let Some(registrar) = first_capture(&RE_REGISTRAR, response) {
        info.registrar = registrar.to_string();
    }
    if let Some(status) = first_capture(&RE_STATUS, response) {
        info.domain_status = vec![status.trim().to_string()];
    }
    info.last_update_of_db = now_utc_rfc3339();

    not_found_guard(info)
}

/// `.tw` (whois.twnic.net.tw). Timestamps are CST; nameservers sit between
/// `Domain servers in listed order:` and a blank line.
pub fn parse_tw(response: &str, domain: &str) -> Result<DomainInfo, LookupError> {
    static RE_REGISTRAR: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"Registration Service Provider: (.*)").unwrap());
    static RE_STATUS: Lazy<Regex> = Lazy::new(|| Regex::new(r"Domain Status: (.*)").unwrap());
    static RE_CREATION: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"Record created on ([0-9]{4}-[0-9]{2}-[0-9]{2} [0-9]{2}:[0-9]{2}:[0-9]{2})")
            .unwrap()
    });
    static RE_EXPIRY: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"Record expires on ([0-9]{4}-[0-9]{2}-[0-9]{2} [0-9]{2}:[0-9]{2}:[0-9]{2})")
            .unwrap()
    });
    static RE_NS: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?s)Domain servers in listed order:\n\s+(.*?)\n\n").unwrap());
    static RE_DNSSEC: Lazy<Regex> = Lazy::new(|| Regex::new(r"DNSSEC: (.*)").unwrap());

    let mut info = DomainInfo {
        domain_name: domain.to_string(),
        ..Default::default()
    };

    if let Some(registrar) = first_capture(&RE_REGISTRAR, response) {
        info.registrar = registrar.trim().to_string();
    }
    info.domain_status = all_captures(&RE_STATUS, response)
        .into_iter()
        .map(|s| s.trim().to_string())
        .collect();

    if let Some(raw) = first_capture(&RE_CREATION, response) {
        info.creation_date = cst_to_utc_rfc3339(raw)
            .ok_or_else(|| LookupError::Parse(format!("invalid creation time: {raw}")))?;
    }
    if let Some(raw) = first_capture(&RE_EXPIRY, response) {
        info.registry_expiry_date = cst_to_utc_rfc3339(raw)
            .ok_or_else(|| LookupError::Parse(format!("invalid expiry time: {raw}")))?;
    }

    if let Some(block) = first_capture(&RE_NS, response) {
        info.name_server = block
            .trim()
            .lines()
            .map(|line| line.trim().to_string())
            .collect();
    }
    if let Some(dnssec) = first_capture(&RE_DNSSEC, response) {
        info.dnssec = dnssec.to_string();
    }
    info.last_update_of_db = now_utc_rfc3339();

    not_found_guard(info)
}

/// ICANN-style key/value responses (`.so`, `.sb`, `.la`).
pub fn parse_icann(response: &str, domain: &str) -> Result<DomainInfo, LookupError> {
    static RE_REGISTRAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"Registrar: (.*)").unwrap());
    static RE_STATUS: Lazy<Regex> = Lazy::new(|| Regex::new(r"Domain Status: (.*)").unwrap());
    static RE_UPDATED: Lazy<Regex> = Lazy::new(|| Regex::new(r"Updated Date: (.*)").unwrap());
    static RE_IANA_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"Registrar IANA ID: (.*)").unwrap());
    static RE_CREATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"Creation Date: (.*)").unwrap());
    static RE_EXPIRY: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"Registry Expiry Date: (.*)").unwrap());
    static RE_NS: Lazy<Regex> = Lazy::new(|| Regex::new(r"Name Server: (.*)").unwrap());
    static RE_DNSSEC: Lazy<Regex> = Lazy::new(|| Regex::new(r"DNSSEC: (.*)").unwrap());
    static RE_DS_DATA: Lazy<Regex> = Lazy::new(|| Regex::new(r"DNSSEC DS Data: (.*)").unwrap());
    static RE_DB_UPDATE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"Last update of WHOIS database: (.*)").unwrap());

    let mut info = DomainInfo {
        domain_name: domain.to_string(),
        ..Default::default()
    };

    if let Some(registrar) = first_capture(&RE_REGISTRAR, response) {
        info.registrar = registrar.to_string();
    }
    info.domain_status = all_captures(&RE_STATUS, response);
    if let Some(id) = first_capture(&RE_IANA_ID, response) {
        info.registrar_iana_id = id.to_string();
    }
    if let Some(date) = first_capture(&RE_CREATION, response) {
        info.creation_date = date.to_string();
    }
    if let Some(date) = first_capture(&RE_EXPIRY, response) {
        info.registry_expiry_date = date.to_string();
    }
    if let Some(date) = first_capture(&RE_UPDATED, response) {
        info.updated_date = date.to_string();
    }
    info.name_server = all_captures(&RE_NS, response);
    if let Some(dnssec) = first_capture(&RE_DNSSEC, response) {
        info.dnssec = dnssec.to_string();
    }
    info.dnssec_ds_data = all_captures(&RE_DS_DATA, response);

    match first_capture(&RE_DB_UPDATE, response) {
        Some(stamp) => {
            info.last_update_of_db = stamp.strip_suffix(" <<<").unwrap_or(stamp).to_string();
        }
        None => info.last_update_of_db = now_utc_rfc3339(),
    }

    not_found_guard(info)
}

/// `.sg` (whois.sgnic.sg). Lines carry carriage-return noise.
pub fn parse_sg(response: &str, domain: &str) -> Result<DomainInfo, LookupError> {
    static RE_CREATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"Creation Date:\s+(.*)").unwrap());
    static RE_EXPIRY: Lazy<Regex> = Lazy::new(|| Regex::new(r"Expiration Date:\s+(.*)").unwrap());
    static RE_NS: Lazy<Regex> = Lazy::new(|| Regex::new(r"Name Servers?:\s+(.*)").unwrap());
    static RE_DNSSEC: Lazy<Regex> = Lazy::new(|| Regex::new(r"DNSSEC:\s+(.*)").unwrap());
    static RE_REGISTRAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"Registrar:\s+(.*)").unwrap());
    static RE_STATUS: Lazy<Regex> = Lazy::new(|| Regex::new(r"Domain Status:\s+(.*)").unwrap());
    static RE_UPDATED: Lazy<Regex> = Lazy::new(|| Regex::new(r"Modified Date:\s+(.*)").unwrap());

    let mut info = DomainInfo {
        domain_name: domain.to_string(),
        ..Default::default()
    };

    if let Some(date) = first_capture(&RE_CREATION, response) {
        info.creation_date = date.trim_end_matches('\r').to_string();
    }
    if let Some(date) = first_capture(&RE_EXPIRY, response) {
        info.registry_expiry_date = date.trim_end_matches('\r').to_string();
    }
    if let Some(date) = first_capture(&RE_UPDATED, response) {
        info.updated_date = date.trim_end_matches('\r').to_string();
    }
    info.name_server = all_captures(&RE_NS, response)
        .into_iter()
        .map(|ns| ns.trim_end_matches('\r').to_string())
        .collect();
    if let Some(dnssec) = first_capture(&RE_DNSSEC, response) {
        info.dnssec = dnssec.trim_end_matches(['\r', '\t']).to_string();
    }
    if let Some(registrar) = first_capture(&RE_REGISTRAR, response) {
        info.registrar = registrar.trim_end_matches('\r').to_string();
    }
    info.domain_status = all_captures(&RE_STATUS, response)
        .into_iter()
        .map(|s| s.trim_end_matches('\r').to_string())
        .collect();
    info.last_update_of_db = now_utc_rfc3339();

    not_found_guard(info)
}

/// `.mo` (whois.monic.mo). Nameservers follow a dashed separator.
pub fn parse_mo(response: &str, domain: &str) -> Result<DomainInfo, LookupError> {
    static RE_CREATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"Record created on (.*)").unwrap());
    static RE_EXPIRY: Lazy<Regex> = Lazy::new(|| Regex::new(r"Record expires on (.*)").unwrap());
    static RE_NS: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"Domain name servers:\s*\n\s*-+\n((?:.+\n)+)").unwrap());

    let mut info = DomainInfo {
        domain_name: domain.to_string(),
        ..Default::default()
    };

    if let Some(date) = first_capture(&RE_CREATION, response) {
        info.creation_date = date.to_string();
    }
    if let Some(date) = first_capture(&RE_EXPIRY, response) {
        info.registry_expiry_date = date.to_string();
    }
    if let Some(block) = first_capture(&RE_NS, response) {
        info.name_server = block
            .trim()
            .lines()
            .map(|line| line.trim().to_string())
            .collect();
    }
    info.last_update_of_db = now_utc_rfc3339();

    not_found_guard(info)
}

/// `.ru` / `.su` (whois.tcinet.ru). Lowercase key/value with `paid-till:`
/// as the expiry.
pub fn parse_ru(response: &str, domain: &str) -> Result<DomainInfo, LookupError> {
    static RE_REGISTRAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"registrar: (.*)").unwrap());
    static RE_CREATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"created:\s+(.*)").unwrap());
    static RE_EXPIRY: Lazy<Regex> = Lazy::new(|| Regex::new(r"paid-till:\s+(.*)").unwrap());
    static RE_NS: Lazy<Regex> = Lazy::new(|| Regex::new(r"nserver:\s+(.*)").unwrap());
    static RE_STATUS: Lazy<Regex> = Lazy::new(|| Regex::new(r"state:\s+(.*)").unwrap());
    static RE_DB_UPDATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Last updated on (.*)").unwrap());

    let mut info = DomainInfo {
        domain_name: domain.to_string(),
        ..Default::default()
    };

    if let Some(registrar) = first_capture(&RE_REGISTRAR, response) {
        info.registrar = registrar.trim().to_string();
    }
    if let Some(date) = first_capture(&RE_CREATION, response) {
        info.creation_date = date.to_string();
    }
    if let Some(date) = first_capture(&RE_EXPIRY, response) {
        info.registry_expiry_date = date.to_string();
    }
    info.name_server = all_captures(&RE_NS, response);
    info.domain_status = all_captures(&RE_STATUS, response);

    match first_capture(&RE_DB_UPDATE, response) {
        Some(stamp) => info.last_update_of_db = stamp.to_string(),
        None => info.last_update_of_db = now_utc_rfc3339(),
    }

    not_found_guard(info)
}

/// `.au` (whois.auda.org.au). Responses carry stray `\r`; the registry
/// omits expiry for some license classes, so only the registrar gates the
/// not-found signal.
pub fn parse_au(response: &str, domain: &str) -> Result<DomainInfo, LookupError> {
    static RE_REGISTRAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"Registrar Name: (.*)").unwrap());
    static RE_IANA_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"Registrar IANA ID: (.*)").unwrap());
    static RE_STATUS: Lazy<Regex> = Lazy::new(|| Regex::new(r"Status: (.*)").unwrap());
    static RE_CREATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"Creation Date: (.*)").unwrap());
    static RE_EXPIRY: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"Registry Expiry Date: (.*)").unwrap());
    static RE_UPDATED: Lazy<Regex> = Lazy::new(|| Regex::new(r"Last Modified: (.*)").unwrap());
    static RE_NS: Lazy<Regex> = Lazy::new(|| Regex::new(r"Name Server: (.*)").unwrap());
    static RE_DNSSEC: Lazy<Regex> = Lazy::new(|| Regex::new(r"DNSSEC: (.*)").unwrap());
    static RE_DS_DATA: Lazy<Regex> = Lazy::new(|| Regex::new(r"DNSSEC DS Data: (.*)").unwrap());
    static RE_DB_UPDATE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"Last update of WHOIS database: ([0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-9]{2}Z)",
        )
        .unwrap()
    });

    let cleaned = response.replace('\r', "");

    let mut info = DomainInfo {
        domain_name: domain.to_string(),
        ..Default::default()
    };

    if let Some(date) = first_capture(&RE_CREATION, &cleaned) {
        info.creation_date = date.to_string();
    }
    if let Some(date) = first_capture(&RE_EXPIRY, &cleaned) {
        info.registry_expiry_date = date.to_string();
    }
    if let Some(date) = first_capture(&RE_UPDATED, &cleaned) {
        info.updated_date = date.to_string();
    }
    info.name_server = all_captures(&RE_NS, &cleaned);
    if let Some(dnssec) = first_capture(&RE_DNSSEC, &cleaned) {
        info.dnssec = dnssec.to_string();
    }
    if let Some(registrar) = first_capture(&RE_REGISTRAR, &cleaned) {
        info.registrar = registrar.trim().to_string();
    }
    info.domain_status = all_captures(&RE_STATUS, &cleaned)
        .into_iter()
        .map(|s| s.trim().to_string())
        .collect();
    if let Some(id) = first_capture(&RE_IANA_ID, &cleaned) {
        info.registrar_iana_id = id.to_string();
    }
    info.dnssec_ds_data = all_captures(&RE_DS_DATA, &cleaned);

    match first_capture(&RE_DB_UPDATE, &cleaned) {
        Some(stamp) => info.last_update_of_db = stamp.to_string(),
        None => info.last_update_of_db = now_utc_rfc3339(),
    }

    if info.registrar.is_empty() {
        return Err(LookupError::ResourceNotFound);
    }
    Ok(info)
}
