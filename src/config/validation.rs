//! Configuration validation and link parsing.

use std::sync::OnceLock;

use crate::config::loader::Config;
use crate::download::PostLink;
use crate::error::{Error, Result};
use regex::Regex;

/// A creator, optionally narrowed to one post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTarget {
    pub creator: String,
    pub post_id: Option<String>,
}

fn link_pattern() -> Result<&'static Regex> {
    static PATTERN: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"boosty\.to/([^/\s?#]+)/?(?:posts/([0-9a-fA-F-]+))?"))
        .as_ref()
        .map_err(|e| Error::Config(format!("Invalid link pattern: {}", e)))
}

/// Parse a boosty.to link or a bare creator name.
///
/// Returns `None` when the input is neither.
pub fn parse_boosty_link(input: &str) -> Result<Option<LinkTarget>> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }

    if let Some(captures) = link_pattern()?.captures(input) {
        let creator = captures.get(1).map(|m| m.as_str().to_string());
        let post_id = captures.get(2).map(|m| m.as_str().to_string());
        return Ok(creator.map(|creator| LinkTarget { creator, post_id }));
    }

    if input.contains(|c: char| c.is_whitespace() || matches!(c, '/' | '?' | '#')) {
        return Ok(None);
    }
    Ok(Some(LinkTarget {
        creator: input.trim_start_matches('@').to_string(),
        post_id: None,
    }))
}

/// Post links of a links file, plus the lines that are not post links.
///
/// Blank lines and `#` comments are skipped; surrounding quotes are stripped.
pub fn parse_links(content: &str) -> Result<(Vec<PostLink>, Vec<String>)> {
    let mut links = Vec::new();
    let mut invalid = Vec::new();

    for line in content.lines() {
        let mut line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let quoted = line.len() >= 2
            && ((line.starts_with('"') && line.ends_with('"'))
                || (line.starts_with('\'') && line.ends_with('\'')));
        if quoted {
            line = line[1..line.len() - 1].trim();
        }

        match parse_boosty_link(line)? {
            Some(LinkTarget {
                creator,
                post_id: Some(post_id),
            }) => links.push(PostLink {
                creator,
                post_id,
                raw: line.to_string(),
            }),
            _ => invalid.push(line.to_string()),
        }
    }

    Ok((links, invalid))
}

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_parallelism(config)?;
    validate_threshold(config.options.incomplete_threshold)?;
    validate_target(config)?;
    validate_sync_dir(config)?;

    Ok(())
}

fn validate_parallelism(config: &Config) -> Result<()> {
    if config.options.max_download_parallel == 0 {
        return Err(Error::ConfigValidation {
            field: "max_download_parallel".to_string(),
            message: "Must be at least 1".to_string(),
        });
    }
    if config.options.max_post_parallel == Some(0) {
        return Err(Error::ConfigValidation {
            field: "max_post_parallel".to_string(),
            message: "Must be at least 1".to_string(),
        });
    }
    Ok(())
}

/// Validate the incomplete-file threshold.
pub fn validate_threshold(threshold: f64) -> Result<()> {
    if !(threshold > 0.0 && threshold <= 1.0) {
        return Err(Error::ConfigValidation {
            field: "incomplete_threshold".to_string(),
            message: format!("Must be in (0, 1] (got {})", threshold),
        });
    }
    Ok(())
}

fn validate_target(config: &Config) -> Result<()> {
    let target = &config.target;
    if target.links_file.is_some() {
        return Ok(());
    }

    let raw = if target.post_link.trim().is_empty() {
        target.creator_name.trim()
    } else {
        target.post_link.trim()
    };
    if raw.is_empty() {
        return Err(Error::MissingConfig(
            "creator_name, post_link or links_file".to_string(),
        ));
    }

    let lower = raw.to_lowercase();
    if lower == "replaceme" || lower == "creator" {
        return Err(Error::ConfigValidation {
            field: "creator_name".to_string(),
            message: format!(
                "'{}' appears to be a placeholder. Please provide an actual creator name.",
                raw
            ),
        });
    }

    if parse_boosty_link(raw)?.is_none() {
        return Err(Error::ConfigValidation {
            field: "creator_name".to_string(),
            message: format!("Not a creator name or boosty.to link: '{}'", raw),
        });
    }
    Ok(())
}

fn validate_sync_dir(config: &Config) -> Result<()> {
    let dir = &config.options.sync_dir;
    if !dir.is_dir() {
        return Err(Error::ConfigValidation {
            field: "sync_dir".to_string(),
            message: format!(
                "Path {} does not exist. Create it and try again.",
                dir.display()
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(creator: &str, post: Option<&str>) -> Option<LinkTarget> {
        Some(LinkTarget {
            creator: creator.to_string(),
            post_id: post.map(str::to_string),
        })
    }

    #[test]
    fn test_parse_creator_link() {
        assert_eq!(
            parse_boosty_link("https://boosty.to/artist").unwrap(),
            target("artist", None)
        );
        assert_eq!(
            parse_boosty_link("boosty.to/artist/").unwrap(),
            target("artist", None)
        );
        assert_eq!(parse_boosty_link("artist").unwrap(), target("artist", None));
    }

    #[test]
    fn test_parse_post_link() {
        let link = "https://boosty.to/artist/posts/1a2b3c4d-0000-4e5f-8a9b-abcdefabcdef?share=1";
        assert_eq!(
            parse_boosty_link(link).unwrap(),
            target("artist", Some("1a2b3c4d-0000-4e5f-8a9b-abcdefabcdef"))
        );
    }

    #[test]
    fn test_parse_rejects_other_urls() {
        assert_eq!(parse_boosty_link("https://example.com/artist").unwrap(), None);
        assert_eq!(parse_boosty_link("two words").unwrap(), None);
        assert_eq!(parse_boosty_link("   ").unwrap(), None);
    }

    #[test]
    fn test_parse_links_file() {
        let content = "\
# favourites
https://boosty.to/a/posts/aaaa-1111

\"https://boosty.to/b/posts/bbbb-2222\"
'boosty.to/c/posts/cccc-3333'
https://boosty.to/only-creator
";
        let (links, invalid) = parse_links(content).unwrap();
        let ids: Vec<_> = links.iter().map(|l| (l.creator.as_str(), l.post_id.as_str())).collect();
        assert_eq!(ids, vec![("a", "aaaa-1111"), ("b", "bbbb-2222"), ("c", "cccc-3333")]);
        assert_eq!(links[1].raw, "https://boosty.to/b/posts/bbbb-2222");
        assert_eq!(invalid, vec!["https://boosty.to/only-creator".to_string()]);
    }

    #[test]
    fn test_threshold_bounds() {
        assert!(validate_threshold(0.8).is_ok());
        assert!(validate_threshold(1.0).is_ok());
        assert!(validate_threshold(0.0).is_err());
        assert!(validate_threshold(1.5).is_err());
        assert!(validate_threshold(f64::NAN).is_err());
    }

    #[test]
    fn test_validate_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.options.sync_dir = dir.path().to_path_buf();

        assert!(matches!(validate_config(&config), Err(Error::MissingConfig(_))));

        config.target.creator_name = "artist".into();
        assert!(validate_config(&config).is_ok());

        config.options.max_download_parallel = 0;
        assert!(validate_config(&config).is_err());
        config.options.max_download_parallel = 3;

        config.options.sync_dir = dir.path().join("missing");
        assert!(validate_config(&config).is_err());
    }
}
