use crate::error::PortError;

pub type Port = u16;

/// Parses a comma-separated port list such as `"22, 80,443"`.
///
/// Order and duplicates are kept as given.
pub fn parse_ports(s: &str) -> Result<Vec<Port>, PortError> {
    let ports: Vec<Port> = s
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<Port>().map_err(|_| PortError::Invalid(part.to_string())))
        .collect::<Result<_, _>>()?;

    if ports.is_empty() {
        return Err(PortError::Empty);
    }
    Ok(ports)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_list_in_order() {
        assert_eq!(parse_ports("443,22, 80"), Ok(vec![443, 22, 80]));
        assert_eq!(parse_ports("0,65535"), Ok(vec![0, 65535]));
    }

    #[test]
    fn rejects_out_of_range_and_garbage() {
        assert_eq!(parse_ports("65536"), Err(PortError::Invalid("65536".into())));
        assert_eq!(parse_ports("-1"), Err(PortError::Invalid("-1".into())));
        assert_eq!(parse_ports("80,http"), Err(PortError::Invalid("http".into())));
    }

    #[test]
    fn rejects_empty_list() {
        assert_eq!(parse_ports(""), Err(PortError::Empty));
        assert_eq!(parse_ports(" , "), Err(PortError::Empty));
    }
}
