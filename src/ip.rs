//! IPv4 address parsing
//!
//! Dataset fields and lookup queries accept either dotted-decimal notation
//! (`8.8.8.8`) or the address as a plain unsigned 32-bit decimal integer
//! (`134744072`). IPv4-mapped IPv6 addresses (`::ffff:8.8.8.8`) resolve to
//! the embedded IPv4 address; any other IPv6 address is rejected.

use crate::error::IpParseError;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Convert an address string to its 32-bit numeric form
///
/// # Example
///
/// ```rust
/// use ip2country::ip::parse_ipv4;
///
/// assert_eq!(parse_ipv4("8.8.8.8").unwrap(), 134744072);
/// assert_eq!(parse_ipv4("134744072").unwrap(), 134744072);
/// assert!(parse_ipv4("2001:db8::1").is_err());
/// ```
pub fn parse_ipv4(s: &str) -> Result<u32, IpParseError> {
    if s.is_empty() {
        return Err(IpParseError::Empty);
    }

    if let Ok(addr) = s.parse::<Ipv4Addr>() {
        return Ok(u32::from(addr));
    }

    if let Ok(addr) = s.parse::<Ipv6Addr>() {
        return match addr.to_ipv4_mapped() {
            Some(v4) => Ok(u32::from(v4)),
            None => Err(IpParseError::NotIpv4(s.to_string())),
        };
    }

    // u32::from_str tolerates a leading '+', the dataset format does not
    if s.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(num) = s.parse::<u32>() {
            return Ok(num);
        }
    }

    Err(IpParseError::InvalidFormat(s.to_string()))
}

/// Render a numeric address in dotted-decimal form
pub fn format_ipv4(ip: u32) -> String {
    Ipv4Addr::from(ip).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dotted_decimal() {
        assert_eq!(parse_ipv4("0.0.0.0").unwrap(), 0);
        assert_eq!(parse_ipv4("1.0.0.0").unwrap(), 16_777_216);
        assert_eq!(parse_ipv4("255.255.255.255").unwrap(), u32::MAX);
    }

    #[test]
    fn test_integer_form() {
        assert_eq!(parse_ipv4("0").unwrap(), 0);
        assert_eq!(parse_ipv4("16777216").unwrap(), 16_777_216);
        assert_eq!(parse_ipv4("4294967295").unwrap(), u32::MAX);
    }

    #[test]
    fn test_integer_overflow_rejected() {
        assert!(matches!(
            parse_ipv4("4294967296"),
            Err(IpParseError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_sign_and_garbage_rejected() {
        assert!(parse_ipv4("+5").is_err());
        assert!(parse_ipv4("-5").is_err());
        assert!(parse_ipv4("1.2.3").is_err());
        assert!(parse_ipv4("1.2.3.256").is_err());
        assert!(parse_ipv4("example.com").is_err());
        assert!(parse_ipv4(" 1.2.3.4").is_err());
        assert_eq!(parse_ipv4(""), Err(IpParseError::Empty));
    }

    #[test]
    fn test_ipv6() {
        assert!(matches!(
            parse_ipv4("2001:db8::1"),
            Err(IpParseError::NotIpv4(_))
        ));
        assert_eq!(parse_ipv4("::ffff:8.8.8.8").unwrap(), 134_744_072);
    }

    #[test]
    fn test_format() {
        assert_eq!(format_ipv4(134_744_072), "8.8.8.8");
        assert_eq!(format_ipv4(0), "0.0.0.0");
    }
}
