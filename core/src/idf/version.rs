use std::{
    fmt,
    str::FromStr,
};

/// `major.minor[.patch]` engine version. Missing components compare as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionNumber {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl VersionNumber {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for VersionNumber {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut parts = [0u32; 3];
        let mut count = 0;
        for part in input.trim().split(['.', '-']) {
            if count == parts.len() {
                return Err(format!("{input:?} has too many version components"));
            }
            parts[count] = part
                .trim()
                .parse()
                .map_err(|_| format!("{input:?} is not a version number"))?;
            count += 1;
        }
        if count < 2 {
            return Err(format!("{input:?} needs at least major.minor"));
        }
        Ok(Self::new(parts[0], parts[1], parts[2]))
    }
}

impl serde::Serialize for VersionNumber {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for VersionNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_and_orders_versions() {
        let old: VersionNumber = "9.4".parse().unwrap();
        let new: VersionNumber = "25.1.0".parse().unwrap();
        assert_eq!(old, VersionNumber::new(9, 4, 0));
        assert!(old < new);
        assert_eq!("25.1".parse::<VersionNumber>().unwrap(), new);
        assert_eq!(new.to_string(), "25.1.0");
        assert!("latest".parse::<VersionNumber>().is_err());
        assert!("25".parse::<VersionNumber>().is_err());
        assert!("1.2.3.4".parse::<VersionNumber>().is_err());
    }
}
