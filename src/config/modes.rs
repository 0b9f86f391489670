//! Storage mode definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How synced content is laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// Flat per-kind folders fed by the media albums (default).
    #[default]
    Media,
    /// One directory per post with its text and attachments.
    Post,
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageType::Media => write!(f, "media"),
            StorageType::Post => write!(f, "post"),
        }
    }
}

impl FromStr for StorageType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "media" => Ok(StorageType::Media),
            "post" | "posts" => Ok(StorageType::Post),
            _ => Err(format!("Unknown storage type: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_type_parse() {
        assert_eq!("media".parse::<StorageType>().unwrap(), StorageType::Media);
        assert_eq!("Post".parse::<StorageType>().unwrap(), StorageType::Post);
        assert!("gallery".parse::<StorageType>().is_err());
        assert_eq!(StorageType::Post.to_string(), "post");
    }
}
