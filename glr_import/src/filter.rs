//! Selecting triangles by the texture bound to unit 0.

use std::fmt;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::{
    error::ImportError,
    scene::{texture_token, Triangle, NO_TEXTURE},
};

/// How a [FilterList] is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListMode {
    /// Remove triangles whose texture is listed.
    Blacklist,
    /// Remove triangles whose texture is not listed.
    Whitelist,
}

impl Default for ListMode {
    fn default() -> Self {
        Self::Blacklist
    }
}

/// A set of texture tokens, in the order they were first given.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterList {
    tokens: IndexSet<String>,
}

impl FilterList {
    /// Parses a comma separated list of tokens, e.g. `0123456789ABCDEF,NO_TEXTURE,`.
    ///
    /// A token is 16 uppercase hex digits or `NO_TEXTURE`. A trailing comma is allowed.
    /// The empty string is the empty list.
    ///
    /// Parsing is lenient about spacing: whitespace around the whole expression and
    /// around each token is stripped before validation, so `" A , B "` reads as `A,B,`.
    /// Whitespace inside a token, or a token made only of whitespace, is still an
    /// error.
    pub fn parse(expression: &str) -> Result<Self, ImportError> {
        let expression = expression.trim();
        let mut list = Self::default();
        if expression.is_empty() {
            return Ok(list);
        }

        let body = expression.strip_suffix(',').unwrap_or(expression);
        for token in body.split(',').map(str::trim) {
            if !is_valid_token(token) {
                return Err(ImportError::InvalidFilterExpression(token.to_string()));
            }
            list.tokens.insert(token.to_string());
        }
        Ok(list)
    }

    /// Renders the list in the canonical form accepted by [FilterList::parse], with a
    /// comma after every token.
    pub fn to_expression(&self) -> String {
        self.tokens.iter().map(|token| format!("{},", token)).collect()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.tokens.iter().map(String::as_str)
    }
}

impl fmt::Display for FilterList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_expression())
    }
}

fn is_valid_token(token: &str) -> bool {
    token == NO_TEXTURE
        || (token.len() == 16
            && token
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b)))
}

/// Keeps or drops triangles based on their texture 0 token.
///
/// Untextured triangles are never matched against the list: they are all dropped when
/// `drop_untextured` is set and all kept otherwise.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default)]
pub struct TriangleFilter {
    pub mode: ListMode,
    pub list: FilterList,
    pub drop_untextured: bool,
}

impl TriangleFilter {
    /// Whether a triangle survives the filter.
    pub fn keeps(&self, tri: &Triangle) -> bool {
        let crc = tri.textures[0].crc;
        if crc == 0 {
            return !self.drop_untextured;
        }
        let listed = self.list.contains(&texture_token(crc));
        match self.mode {
            ListMode::Blacklist => !listed,
            ListMode::Whitelist => listed,
        }
    }

    /// Removes filtered triangles, keeping the order of the rest.
    pub fn apply(&self, mut triangles: Vec<Triangle>) -> Vec<Triangle> {
        triangles.retain(|tri| self.keeps(tri));
        triangles
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_util::textured;

    const A: u64 = 0x0123456789ABCDEF;
    const B: u64 = 0xABCDEF0123456789;
    const C: u64 = 0x00000000000000C0;

    fn crcs(triangles: &[Triangle]) -> Vec<u64> {
        triangles.iter().map(|tri| tri.textures[0].crc).collect()
    }

    fn sample() -> Vec<Triangle> {
        vec![textured(A), textured(0), textured(B), textured(C), textured(A)]
    }

    fn filter(mode: ListMode, expression: &str, drop_untextured: bool) -> TriangleFilter {
        TriangleFilter {
            mode,
            list: FilterList::parse(expression).unwrap(),
            drop_untextured,
        }
    }

    #[test]
    fn test_parse() {
        let list = FilterList::parse("0123456789ABCDEF,NO_TEXTURE,").unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.contains("0123456789ABCDEF"));
        assert!(list.contains(NO_TEXTURE));

        let list = FilterList::parse(" 0123456789ABCDEF , ABCDEF0123456789").unwrap();
        assert_eq!(list.len(), 2);

        assert!(FilterList::parse("").unwrap().is_empty());
        assert!(FilterList::parse("   ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_strips_surrounding_whitespace() {
        let spaced = FilterList::parse("\t0123456789ABCDEF ,\nNO_TEXTURE ,  ").unwrap();
        assert_eq!(spaced, FilterList::parse("0123456789ABCDEF,NO_TEXTURE").unwrap());
        assert_eq!(spaced.to_expression(), "0123456789ABCDEF,NO_TEXTURE,");
        assert!(FilterList::parse("01234567 89ABCDEF").is_err());
        assert!(FilterList::parse("0123456789ABCDEF, ,").is_err());
    }

    #[test]
    fn test_parse_rejects_bad_tokens() {
        for expression in [
            "0123456789abcdef",
            "0123456789ABCDE",
            "0123456789ABCDEF0",
            "0123456789ABCDEG",
            "0123456789ABCDEF,,",
            ",0123456789ABCDEF",
            "no_texture",
        ] {
            assert!(
                matches!(
                    FilterList::parse(expression),
                    Err(ImportError::InvalidFilterExpression(_))
                ),
                "{}",
                expression
            );
        }
    }

    #[test]
    fn test_to_expression() {
        let list = FilterList::parse("ABCDEF0123456789,0123456789ABCDEF,ABCDEF0123456789").unwrap();
        assert_eq!(list.to_expression(), "ABCDEF0123456789,0123456789ABCDEF,");
        assert_eq!(FilterList::parse(&list.to_expression()).unwrap(), list);
        assert_eq!(FilterList::default().to_expression(), "");
    }

    #[test]
    fn test_blacklist() {
        let kept = filter(ListMode::Blacklist, "0123456789ABCDEF", false).apply(sample());
        assert_eq!(crcs(&kept), vec![0, B, C]);
    }

    #[test]
    fn test_whitelist() {
        let kept = filter(ListMode::Whitelist, "0123456789ABCDEF", false).apply(sample());
        assert_eq!(crcs(&kept), vec![A, 0, A]);
    }

    #[test]
    fn test_untextured_ignore_list() {
        let kept = filter(ListMode::Blacklist, "NO_TEXTURE", false).apply(sample());
        assert_eq!(crcs(&kept), crcs(&sample()));

        let kept = filter(ListMode::Whitelist, "", false).apply(sample());
        assert_eq!(crcs(&kept), vec![0]);

        let kept = filter(ListMode::Whitelist, "NO_TEXTURE", true).apply(sample());
        assert!(kept.is_empty());

        let kept = filter(ListMode::Blacklist, "", true).apply(sample());
        assert_eq!(crcs(&kept), vec![A, B, C, A]);
    }

    #[test]
    fn test_filter_is_idempotent() {
        for mode in [ListMode::Blacklist, ListMode::Whitelist] {
            for drop_untextured in [false, true] {
                let f = filter(mode, "0123456789ABCDEF,00000000000000C0", drop_untextured);
                let once = f.apply(sample());
                let twice = f.apply(once.clone());
                assert_eq!(once, twice);
            }
        }
    }

    #[test]
    fn test_lists_are_complements() {
        for expression in ["", "0123456789ABCDEF", "0123456789ABCDEF,ABCDEF0123456789,"] {
            let black = filter(ListMode::Blacklist, expression, true).apply(sample());
            let white = filter(ListMode::Whitelist, expression, true).apply(sample());

            let mut union = crcs(&black);
            union.extend(crcs(&white));
            union.sort_unstable();
            let mut all = crcs(&filter(ListMode::Blacklist, "", true).apply(sample()));
            all.sort_unstable();
            assert_eq!(union, all);

            assert!(crcs(&black).iter().all(|crc| !crcs(&white).contains(crc)));
        }
    }
}
