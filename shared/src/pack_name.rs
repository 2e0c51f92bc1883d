/// Sticker pack name extraction from user input.
///
/// Accepts a bare pack name or a share link such as `https://t.me/addstickers/Name`.
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{StickerError, StickerResult};

/// Bot API pack names: letters, digits and underscores, at most 64 chars.
static PACK_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_]{1,64}$").unwrap()
});

/// Normalise raw input to a pack name.
///
/// The last `/`-separated segment wins; query strings, fragments and
/// surrounding whitespace are dropped.
pub fn normalize_pack_name(input: &str) -> StickerResult<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(StickerError::InvalidInput(
            "please provide a sticker set name".to_string(),
        ));
    }

    let without_query = trimmed
        .split(|c: char| c == '?' || c == '#')
        .next()
        .unwrap_or(trimmed)
        .trim_end_matches('/');

    let candidate = without_query.rsplit('/').next().unwrap_or(without_query);

    if PACK_NAME_RE.is_match(candidate) {
        Ok(candidate.to_string())
    } else {
        Err(StickerError::InvalidInput(format!(
            "'{}' is not a valid sticker set name",
            candidate
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_name() {
        assert_eq!(normalize_pack_name("cats").unwrap(), "cats");
        assert_eq!(normalize_pack_name("  Animals_by_bot ").unwrap(), "Animals_by_bot");
    }

    #[test]
    fn test_share_link() {
        assert_eq!(
            normalize_pack_name("https://t.me/addstickers/HotCherry").unwrap(),
            "HotCherry"
        );
    }

    #[test]
    fn test_trailing_slash_and_query() {
        assert_eq!(
            normalize_pack_name("https://t.me/addstickers/HotCherry/?start=1#x").unwrap(),
            "HotCherry"
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(normalize_pack_name("   "), Err(StickerError::InvalidInput(_))));
    }

    #[test]
    fn test_invalid_characters() {
        assert!(normalize_pack_name("cats and dogs").is_err());
        assert!(normalize_pack_name("https://t.me/addstickers/cat-pack").is_err());
        assert!(normalize_pack_name(&"x".repeat(65)).is_err());
    }
}
