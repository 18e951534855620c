pub mod connection;
pub mod connector;
pub mod listener;
pub mod peer;
pub mod supervisor;

use crate::error::NodeError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Inbound,
    Outbound,
}

// Parses a `tcp://host:port` URI into its `(host, port)` parts. This is the
// only URI scheme the core understands (see spec §6).
pub fn parse_uri(uri: &str) -> Result<(String, u16), NodeError> {
    let rest = uri
        .strip_prefix("tcp://")
        .ok_or_else(|| NodeError::InvalidUri(uri.to_string()))?;
    let (host, port) = rest
        .rsplit_once(':')
        .ok_or_else(|| NodeError::InvalidUri(uri.to_string()))?;
    let port: u16 = port
        .parse()
        .map_err(|_| NodeError::InvalidUri(uri.to_string()))?;
    Ok((host.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_valid_uri() {
        assert_eq!(
            parse_uri("tcp://127.0.0.1:2125").unwrap(),
            ("127.0.0.1".to_string(), 2125)
        );
    }

    #[test]
    fn rejects_a_missing_scheme() {
        assert!(parse_uri("127.0.0.1:2125").is_err());
    }

    #[test]
    fn rejects_a_non_numeric_port() {
        assert!(parse_uri("tcp://127.0.0.1:notaport").is_err());
    }
}
