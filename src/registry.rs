//! Static registry tables.
//!
//! One map routes RDAP queries and holds three key shapes side by side:
//! literal TLD labels, textual CIDR blocks (`"a.b.c.d/n"`, v4 or v6) and
//! textual ASN ranges (`"lo-hi"`). The classifier decides which shape to
//! scan, so the mixed keys never collide. A second map routes legacy WHOIS.
//!
//! Tables are built once and never mutated; concurrent readers need no
//! locking. The CIDR and ASN scans are linear first-match, which is fine for
//! the realistic table size (well under ~50 non-TLD entries).

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// RDAP base URLs. Every value ends in `/` so `{base}{kind}/{id}` composes.
pub static TLD_TO_RDAP_SERVER: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut map = HashMap::new();

    // Generic TLDs
    map.insert("com", "https://rdap.verisign.com/com/v1/");
    map.insert("net", "https://rdap.verisign.com/net/v1/");
    map.insert("cc", "https://rdap.verisign.com/cc/v1/");
    map.insert("tv", "https://rdap.verisign.com/tv/v1/");
    map.insert("name", "https://rdap.verisign.com/name/v1/");
    map.insert("org", "https://rdap.publicinterestregistry.org/rdap/");
    map.insert("info", "https://rdap.identitydigital.services/rdap/");
    map.insert("mobi", "https://rdap.identitydigital.services/rdap/");
    map.insert("pro", "https://rdap.identitydigital.services/rdap/");
    map.insert("app", "https://www.registry.google/rdap/");
    map.insert("dev", "https://www.registry.google/rdap/");
    map.insert("page", "https://www.registry.google/rdap/");
    map.insert("xyz", "https://rdap.centralnic.com/xyz/");
    map.insert("site", "https://rdap.centralnic.com/site/");
    map.insert("online", "https://rdap.centralnic.com/online/");
    map.insert("top", "https://rdap.zdnscloud.com/top/");
    map.insert("io", "https://rdap.nic.io/");
    map.insert("me", "https://rdap.nic.me/");
    map.insert("co", "https://rdap.nic.co/");

    // Country codes with RDAP service
    map.insert("uk", "https://rdap.nominet.uk/uk/");
    map.insert("fr", "https://rdap.nic.fr/");
    map.insert("de", "https://rdap.denic.de/");
    map.insert("nl", "https://rdap.sidn.nl/");
    map.insert("cz", "https://rdap.nic.cz/");
    map.insert("br", "https://rdap.registro.br/");
    map.insert("ca", "https://rdap.ca.fury.ca/rdap/");
    map.insert("us", "https://rdap.nic.us/");

    // IPv4 blocks, delegated per RIR
    map.insert("1.0.0.0/8", "https://rdap.apnic.net/");
    map.insert("14.0.0.0/8", "https://rdap.apnic.net/");
    map.insert("27.0.0.0/8", "https://rdap.apnic.net/");
    map.insert("36.0.0.0/8", "https://rdap.apnic.net/");
    map.insert("43.0.0.0/8", "https://rdap.apnic.net/");
    map.insert("58.0.0.0/8", "https://rdap.apnic.net/");
    map.insert("101.0.0.0/8", "https://rdap.apnic.net/");
    map.insert("110.0.0.0/8", "https://rdap.apnic.net/");
    map.insert("203.0.0.0/8", "https://rdap.apnic.net/");
    map.insert("218.0.0.0/8", "https://rdap.apnic.net/");
    map.insert("3.0.0.0/8", "https://rdap.arin.net/registry/");
    map.insert("8.0.0.0/8", "https://rdap.arin.net/registry/");
    map.insert("23.0.0.0/8", "https://rdap.arin.net/registry/");
    map.insert("50.0.0.0/8", "https://rdap.arin.net/registry/");
    map.insert("76.0.0.0/8", "https://rdap.arin.net/registry/");
    map.insert("104.0.0.0/8", "https://rdap.arin.net/registry/");
    map.insert("2.0.0.0/8", "https://rdap.db.ripe.net/");
    map.insert("5.0.0.0/8", "https://rdap.db.ripe.net/");
    map.insert("31.0.0.0/8", "https://rdap.db.ripe.net/");
    map.insert("46.0.0.0/8", "https://rdap.db.ripe.net/");
    map.insert("62.0.0.0/8", "https://rdap.db.ripe.net/");
    map.insert("185.0.0.0/8", "https://rdap.db.ripe.net/");
    map.insert("193.0.0.0/8", "https://rdap.db.ripe.net/");
    map.insert("177.0.0.0/8", "https://rdap.lacnic.net/rdap/");
    map.insert("186.0.0.0/8", "https://rdap.lacnic.net/rdap/");
    map.insert("190.0.0.0/8", "https://rdap.lacnic.net/rdap/");
    map.insert("200.0.0.0/8", "https://rdap.lacnic.net/rdap/");
    map.insert("41.0.0.0/8", "https://rdap.afrinic.net/rdap/");
    map.insert("102.0.0.0/8", "https://rdap.afrinic.net/rdap/");
    map.insert("196.0.0.0/8", "https://rdap.afrinic.net/rdap/");

    // IPv6 blocks
    map.insert("2001:200::/23", "https://rdap.apnic.net/");
    map.insert("2400::/12", "https://rdap.apnic.net/");
    map.insert("2001:400::/23", "https://rdap.arin.net/registry/");
    map.insert("2600::/12", "https://rdap.arin.net/registry/");
    map.insert("2001:600::/23", "https://rdap.db.ripe.net/");
    map.insert("2a00::/12", "https://rdap.db.ripe.net/");
    map.insert("2800::/12", "https://rdap.lacnic.net/rdap/");
    map.insert("2c00::/12", "https://rdap.afrinic.net/rdap/");

    // ASN ranges, delegated per RIR
    map.insert("1-1876", "https://rdap.arin.net/registry/");
    map.insert("3354-4543", "https://rdap.arin.net/registry/");
    map.insert("10240-12287", "https://rdap.arin.net/registry/");
    map.insert("16384-17407", "https://rdap.arin.net/registry/");
    map.insert("18432-20479", "https://rdap.arin.net/registry/");
    map.insert("46080-47103", "https://rdap.arin.net/registry/");
    map.insert("393216-399260", "https://rdap.arin.net/registry/");
    map.insert("4608-4865", "https://rdap.apnic.net/");
    map.insert("9216-10239", "https://rdap.apnic.net/");
    map.insert("17408-18431", "https://rdap.apnic.net/");
    map.insert("23552-24575", "https://rdap.apnic.net/");
    map.insert("131072-141625", "https://rdap.apnic.net/");
    map.insert("1877-1901", "https://rdap.db.ripe.net/");
    map.insert("8192-9215", "https://rdap.db.ripe.net/");
    map.insert("12288-13311", "https://rdap.db.ripe.net/");
    map.insert("15360-16383", "https://rdap.db.ripe.net/");
    map.insert("20480-21503", "https://rdap.db.ripe.net/");
    map.insert("196608-213403", "https://rdap.db.ripe.net/");
    map.insert("27648-28671", "https://rdap.lacnic.net/rdap/");
    map.insert("52224-53247", "https://rdap.lacnic.net/rdap/");
    map.insert("262144-273820", "https://rdap.lacnic.net/rdap/");
    map.insert("36864-37887", "https://rdap.afrinic.net/rdap/");
    map.insert("327680-329727", "https://rdap.afrinic.net/rdap/");

    map
});

/// WHOIS hosts for TLDs without a usable RDAP service. Values may carry an
/// explicit port; port 43 is assumed otherwise.
pub static TLD_TO_WHOIS_SERVER: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut map = HashMap::new();

    map.insert("cn", "whois.cnnic.cn");
    map.insert("xn--fiqs8s", "whois.cnnic.cn");
    map.insert("xn--fiqz9s", "whois.cnnic.cn");
    map.insert("hk", "whois.hkirc.hk");
    map.insert("xn--j6w193g", "whois.hkirc.hk");
    map.insert("tw", "whois.twnic.net.tw");
    map.insert("sg", "whois.sgnic.sg");
    map.insert("mo", "whois.monic.mo");
    map.insert("so", "whois.nic.so");
    map.insert("sb", "whois.nic.net.sb");
    map.insert("la", "whois.nic.la");
    map.insert("ru", "whois.tcinet.ru");
    map.insert("su", "whois.tcinet.ru");
    map.insert("au", "whois.auda.org.au");
    map.insert("jp", "whois.jprs.jp");
    map.insert("kr", "whois.kr");
    map.insert("my", "whois.mynic.my");
    map.insert("th", "whois.thnic.co.th");
    map.insert("vn", "whois.vnnic.vn");
    map.insert("id", "whois.id");

    map
});

/// A parsed CIDR block, v4 or v6, with prefix-mask containment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CidrBlock {
    V4 { network: u32, prefix_len: u8 },
    V6 { network: u128, prefix_len: u8 },
}

impl CidrBlock {
    pub fn parse(text: &str) -> Option<Self> {
        let (addr, len) = text.split_once('/')?;
        let prefix_len: u8 = len.parse().ok()?;
        if let Ok(v4) = addr.parse::<Ipv4Addr>() {
            if prefix_len > 32 {
                return None;
            }
            Some(CidrBlock::V4 {
                network: u32::from(v4) & v4_mask(prefix_len),
                prefix_len,
            })
        } else if let Ok(v6) = addr.parse::<Ipv6Addr>() {
            if prefix_len > 128 {
                return None;
            }
            Some(CidrBlock::V6 {
                network: u128::from(v6) & v6_mask(prefix_len),
                prefix_len,
            })
        } else {
            None
        }
    }

    pub fn contains(&self, ip: &IpAddr) -> bool {
        match (self, ip) {
            (CidrBlock::V4 { network, prefix_len }, IpAddr::V4(v4)) => {
                u32::from(*v4) & v4_mask(*prefix_len) == *network
            }
            (CidrBlock::V6 { network, prefix_len }, IpAddr::V6(v6)) => {
                u128::from(*v6) & v6_mask(*prefix_len) == *network
            }
            _ => false,
        }
    }
}

fn v4_mask(prefix_len: u8) -> u32 {
    if prefix_len == 0 {
        0
    } else {
        u32::MAX << (32 - prefix_len)
    }
}

fn v6_mask(prefix_len: u8) -> u128 {
    if prefix_len == 0 {
        0
    } else {
        u128::MAX << (128 - prefix_len)
    }
}

/// A textual ASN range key, `"lo-hi"` inclusive on both bounds.
fn parse_asn_range(text: &str) -> Option<(u32, u32)> {
    let (lo, hi) = text.split_once('-')?;
    let lo: u32 = lo.parse().ok()?;
    let hi: u32 = hi.parse().ok()?;
    Some((lo, hi))
}

/// RDAP base for a TLD label.
pub fn rdap_server_for_tld(tld: &str) -> Option<&'static str> {
    TLD_TO_RDAP_SERVER.get(tld).copied()
}

/// WHOIS host for a TLD label.
pub fn whois_server_for_tld(tld: &str) -> Option<&'static str> {
    TLD_TO_WHOIS_SERVER.get(tld).copied()
}

/// First CIDR key containing the address. Keys that do not parse as CIDR
/// (TLD labels, ASN ranges) are skipped.
pub fn rdap_server_for_ip(ip: &IpAddr) -> Option<(&'static str, &'static str)> {
    for (key, server) in TLD_TO_RDAP_SERVER.iter() {
        let Some(block) = CidrBlock::parse(key) else {
            continue;
        };
        if block.contains(ip) {
            return Some((key, server));
        }
    }
    None
}

/// First ASN-range key whose inclusive interval contains the number.
pub fn rdap_server_for_asn(asn: u32) -> Option<(&'static str, &'static str)> {
    for (key, server) in TLD_TO_RDAP_SERVER.iter() {
        let Some((lo, hi)) = parse_asn_range(key) else {
            continue;
        };
        if asn >= lo && asn <= hi {
            return Some((key, server));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tld_lookup() {
        assert_eq!(
            rdap_server_for_tld("com"),
            Some("https://rdap.verisign.com/com/v1/")
        );
        assert_eq!(whois_server_for_tld("cn"), Some("whois.cnnic.cn"));
        assert_eq!(whois_server_for_tld("xn--fiqs8s"), Some("whois.cnnic.cn"));
        assert!(rdap_server_for_tld("example").is_none());
    }

    #[test]
    fn cidr_membership_v4() {
        let block = CidrBlock::parse("203.0.0.0/8").unwrap();
        assert!(block.contains(&"203.0.113.1".parse().unwrap()));
        assert!(!block.contains(&"204.0.113.1".parse().unwrap()));

        let (key, server) = rdap_server_for_ip(&"203.0.113.1".parse().unwrap()).unwrap();
        assert_eq!(key, "203.0.0.0/8");
        assert_eq!(server, "https://rdap.apnic.net/");
    }

    #[test]
    fn cidr_membership_v6() {
        let block = CidrBlock::parse("2001:db8::/32").unwrap();
        assert!(block.contains(&"2001:db8::1".parse().unwrap()));
        assert!(!block.contains(&"2001:db9::1".parse().unwrap()));
    }

    #[test]
    fn v4_key_never_matches_v6_address() {
        let block = CidrBlock::parse("203.0.0.0/8").unwrap();
        assert!(!block.contains(&"2400::1".parse().unwrap()));
    }

    #[test]
    fn asn_range_bounds_inclusive() {
        let (key, server) = rdap_server_for_asn(4608).unwrap();
        assert_eq!(key, "4608-4865");
        assert_eq!(server, "https://rdap.apnic.net/");

        let (key, _) = rdap_server_for_asn(4865).unwrap();
        assert_eq!(key, "4608-4865");

        assert!(rdap_server_for_asn(4_294_967_295).is_none());
    }

    #[test]
    fn mixed_keys_do_not_cross_match() {
        // TLD and range keys are skipped during the CIDR scan and vice versa.
        assert!(CidrBlock::parse("com").is_none());
        assert!(CidrBlock::parse("4608-4865").is_none());
        assert!(parse_asn_range("203.0.0.0/8").is_none());
    }
}
