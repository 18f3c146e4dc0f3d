use crate::error::ConfigError;
use crate::scanner::target::PortRange;

/// Parses a port list such as `80,443,3000-3100` into ranges.
pub fn parse_ports(spec: &str) -> Result<Vec<PortRange>, ConfigError> {
    let mut ranges = Vec::new();

    for part in spec.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let range = match part.split_once('-') {
            Some((start, end)) => PortRange::new(parse_number(start)?, parse_number(end)?)?,
            None => {
                let port = parse_number(part)?;
                PortRange::new(port, port)?
            }
        };
        ranges.push(range);
    }

    if ranges.is_empty() {
        return Err(ConfigError::InvalidPortSpec(spec.to_string()));
    }

    Ok(ranges)
}

fn parse_number(value: &str) -> Result<u32, ConfigError> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| ConfigError::InvalidPortSpec(value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_tolerated() {
        let ranges = parse_ports(" 80 , 8000 - 8002 ").unwrap();
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[1].len(), 3);
    }

    #[test]
    fn test_out_of_bounds() {
        assert!(matches!(
            parse_ports("70000"),
            Err(ConfigError::InvalidRange { .. })
        ));
        assert!(matches!(parse_ports("0"), Err(ConfigError::InvalidRange { .. })));
    }

    #[test]
    fn test_empty_spec() {
        assert!(matches!(parse_ports(" , "), Err(ConfigError::InvalidPortSpec(_))));
    }
}
