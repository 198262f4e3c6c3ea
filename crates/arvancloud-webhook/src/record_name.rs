/// Label used for records at the zone apex
pub const ZONE_APEX: &str = "@";

/// Strip trailing dots from a domain name
pub fn un_fqdn(name: &str) -> &str {
    name.trim_end_matches('.')
}

/// Derive the zone-relative record name for `fqdn` within `zone`
///
/// Both inputs may carry a trailing dot. The zone apex yields [`ZONE_APEX`].
/// The caller guarantees `fqdn` lies within `zone`; if it does not, the
/// normalized `fqdn` is returned unchanged.
pub fn relative_record_name(fqdn: &str, zone: &str) -> String {
    let name = un_fqdn(fqdn);
    let zone = un_fqdn(zone);

    if name == zone {
        return ZONE_APEX.to_string();
    }

    name.strip_suffix(zone)
        .and_then(|prefix| prefix.strip_suffix('.'))
        .unwrap_or(name)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apex() {
        assert_eq!(relative_record_name("example.com", "example.com"), "@");
        assert_eq!(relative_record_name("example.com.", "example.com"), "@");
        assert_eq!(relative_record_name("example.com", "example.com."), "@");
        assert_eq!(relative_record_name("example.com.", "example.com."), "@");
    }

    #[test]
    fn test_single_label() {
        assert_eq!(
            relative_record_name("_acme-challenge.example.com.", "example.com."),
            "_acme-challenge"
        );
        assert_eq!(
            relative_record_name("_acme-challenge.example.com", "example.com."),
            "_acme-challenge"
        );
    }

    #[test]
    fn test_multi_label() {
        assert_eq!(
            relative_record_name("_acme-challenge.www.example.com.", "example.com"),
            "_acme-challenge.www"
        );
    }

    #[test]
    fn test_suffix_must_be_label_aligned() {
        // "badexample.com" ends with "example.com" but not at a label boundary
        assert_eq!(
            relative_record_name("badexample.com.", "example.com."),
            "badexample.com"
        );
    }

    #[test]
    fn test_outside_zone_is_returned_unchanged() {
        assert_eq!(
            relative_record_name("_acme-challenge.example.org.", "example.com."),
            "_acme-challenge.example.org"
        );
    }

    #[test]
    fn test_un_fqdn() {
        assert_eq!(un_fqdn("example.com."), "example.com");
        assert_eq!(un_fqdn("example.com"), "example.com");
    }
}
