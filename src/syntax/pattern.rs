use std::sync::LazyLock;

use regex::Regex;
#[cfg(feature = "serde")]
use serde::Serialize;

use crate::{ConvertedRegex, Result, VimsynError, VimsynErrorKind};

/// The part of a match an offset moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum OffsetType {
    /// `ms`
    MatchStart,
    /// `me`
    MatchEnd,
    /// `hs`
    HighlightStart,
    /// `he`
    HighlightEnd,
    /// `rs`
    RegionStart,
    /// `re`
    RegionEnd,
}

/// The end of the match an offset is relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum Whence {
    /// `s`
    Start,
    /// `e`
    End,
}

/// A pattern offset like `ms=s+1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct PatternOffset {
    /// What is moved.
    pub offset_type: OffsetType,
    /// Relative to which end of the match.
    pub whence: Whence,
    /// Number of characters, negative to the left.
    pub displacement: i32,
}

impl PatternOffset {
    /// Creates a new offset.
    pub fn new(offset_type: OffsetType, whence: Whence, displacement: i32) -> Self {
        Self {
            offset_type,
            whence,
            displacement,
        }
    }
}

static OFFSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<what>\w\w)=(?P<whence>[se])?(?P<displacement>[+-]?\d+)?$")
        .expect("offset regex is valid")
});

/// A converted Vim pattern of a match item or of a region delimiter.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Pattern {
    /// The converted regex.
    pub regex: String,
    /// The regex refers back to one of its own groups.
    pub has_back_reference: bool,
    /// The regex contains the `zs` group.
    pub has_match_start_group: bool,
    /// The regex contains the `ze` group.
    pub has_match_end_group: bool,
    /// Number of external groups, `\z(...\)`.
    pub external_groups: usize,
    /// The highest external group referenced, `\z1`..`\z9`.
    pub last_external_match: usize,
    /// A match of the regex includes the end of the line.
    pub eat_new_line: bool,
    /// The offsets in declaration order.
    pub offsets: Vec<PatternOffset>,
    /// Characters before the match that are matched but not part of it, `lc=`.
    pub leading_context: Option<i32>,
    /// The highlight group of the delimiter itself, `matchgroup=`.
    pub match_group: Option<String>,
}

impl Pattern {
    /// Creates a pattern from the result of a conversion.
    pub fn from_converted(converted: &ConvertedRegex, exclude_nl: bool) -> Self {
        Self {
            regex: converted.regex.clone(),
            has_back_reference: converted.has_back_reference,
            has_match_start_group: converted.has_match_start_group,
            has_match_end_group: converted.has_match_end_group,
            external_groups: converted.external_groups,
            last_external_match: converted.last_external_match,
            eat_new_line: !exclude_nl && converted.matches_magic_dollar,
            ..Default::default()
        }
    }

    /// Applies a comma separated list of offsets like `ms=s+1,lc=2`.
    pub fn add_offsets(&mut self, offsets: &str) -> Result<()> {
        for offset in offsets.split(',').filter(|o| !o.is_empty()) {
            self.add_offset(offset)?;
        }
        Ok(())
    }

    fn add_offset(&mut self, offset: &str) -> Result<()> {
        let captures = OFFSET.captures(offset).ok_or_else(|| {
            VimsynError::new(VimsynErrorKind::InvalidOffset(offset.to_string()))
        })?;
        let displacement = match captures.name("displacement") {
            Some(d) => d
                .as_str()
                .trim_start_matches('+')
                .parse::<i32>()
                .map_err(|_| VimsynError::new(VimsynErrorKind::InvalidOffset(offset.to_string())))?,
            None => 0,
        };
        let what = &captures["what"];
        if what == "lc" {
            if displacement == 0 {
                return Err(VimsynError::new(VimsynErrorKind::InvalidOffset(format!(
                    "'{offset}' sets the leading context without a number"
                ))));
            }
            self.leading_context = Some(displacement);
            return Ok(());
        }
        let whence = match captures.name("whence").map(|w| w.as_str()) {
            Some("s") => Whence::Start,
            _ => Whence::End,
        };
        let offset_type = match what {
            "ms" => OffsetType::MatchStart,
            "me" => OffsetType::MatchEnd,
            "hs" => OffsetType::HighlightStart,
            "he" => OffsetType::HighlightEnd,
            "rs" => OffsetType::RegionStart,
            "re" => OffsetType::RegionEnd,
            _ => {
                return Err(VimsynError::new(VimsynErrorKind::UnknownOffsetCode(
                    what.to_string(),
                )))
            }
        };
        self.offsets
            .push(PatternOffset::new(offset_type, whence, displacement));
        Ok(())
    }
}
