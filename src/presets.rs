// Named port range bundles for common scanning purposes

use crate::error::ConfigError;
use crate::scanner::target::{PortRange, ScanTarget};

#[derive(Debug)]
pub struct Preset {
    pub name: &'static str,
    pub description: &'static str,
    ranges: &'static [(u16, u16)],
}

pub const PRESETS: &[Preset] = &[
    Preset {
        name: "quick",
        description: "Common dev server ports",
        ranges: &[(3000, 9000), (8000, 8100)],
    },
    Preset {
        name: "dev",
        description: "Extended dev server ranges",
        ranges: &[
            (3000, 3100),
            (4000, 4100),
            (5000, 5100),
            (8000, 8100),
            (9000, 9100),
            (8080, 8090),
        ],
    },
    Preset {
        name: "web",
        description: "Web server ports",
        ranges: &[
            (80, 80),
            (443, 443),
            (8080, 8080),
            (8443, 8443),
            (3000, 3100),
            (8000, 8100),
            (9000, 9100),
        ],
    },
    Preset {
        name: "full",
        description: "Complete port range (slow)",
        ranges: &[(1, 65535)],
    },
    Preset {
        name: "services",
        description: "Common service ports",
        ranges: &[
            (21, 25),
            (53, 53),
            (80, 80),
            (110, 110),
            (143, 143),
            (443, 443),
            (993, 993),
            (995, 995),
            (1433, 1433),
            (3306, 3306),
            (5432, 5432),
            (6379, 6379),
            (27017, 27017),
        ],
    },
];

impl Preset {
    pub fn find(name: &str) -> Result<&'static Preset, ConfigError> {
        PRESETS
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| ConfigError::UnknownPreset(name.to_string()))
    }

    pub fn ranges(&self) -> Result<Vec<PortRange>, ConfigError> {
        self.ranges
            .iter()
            .map(|&(start, end)| PortRange::new(start as u32, end as u32))
            .collect()
    }

    pub fn target(&self) -> Result<ScanTarget, ConfigError> {
        ScanTarget::new(self.ranges()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_presets_are_valid() {
        for preset in PRESETS {
            let target = preset.target().unwrap();
            assert!(!target.is_empty(), "{} is empty", preset.name);
        }
    }

    #[test]
    fn test_quick_preset_collapses_overlap() {
        let target = Preset::find("quick").unwrap().target().unwrap();
        // 8000-8100 sits inside 3000-9000
        assert_eq!(target.len(), 6001);
    }

    #[test]
    fn test_full_preset_covers_everything() {
        let target = Preset::find("FULL").unwrap().target().unwrap();
        assert_eq!(target.len(), 65535);
        assert!(target.contains(1));
        assert!(target.contains(65535));
    }

    #[test]
    fn test_unknown_preset() {
        assert!(matches!(
            Preset::find("everything"),
            Err(ConfigError::UnknownPreset(_))
        ));
    }
}
