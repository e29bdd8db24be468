#[cfg(feature = "serde")]
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

use bitflags::bitflags;

bitflags! {
    /// Temporal categories a rule can produce. A rule carries exactly one
    /// category; callers filter with any combination.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    #[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
    pub struct TemporalType: u32 {
        const DATE = 1;
        const TIME = 2;
        const DURATION = 4;
        const SET = 8;
    }
}

impl TemporalType {
    /// Parses a single category name as written in a rule's `type` attribute.
    pub fn from_type_name(name: &str) -> Option<Self> {
        let name = name.trim();
        [
            ("date", Self::DATE),
            ("time", Self::TIME),
            ("duration", Self::DURATION),
            ("set", Self::SET),
        ]
        .into_iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
        .map(|(_, flag)| flag)
    }

    /// Parses a comma-separated filter such as `date,time` or `all`.
    pub fn from_list(list: &str) -> Option<Self> {
        if list.trim().eq_ignore_ascii_case("all") {
            return Some(Self::all());
        }

        let mut flags = Self::empty();
        for name in list.split(',').filter(|n| !n.trim().is_empty()) {
            flags |= Self::from_type_name(name)?;
        }
        Some(flags)
    }

    pub fn name(&self) -> &'static str {
        if *self == Self::DATE {
            "date"
        } else if *self == Self::TIME {
            "time"
        } else if *self == Self::DURATION {
            "duration"
        } else if *self == Self::SET {
            "set"
        } else {
            "mixed"
        }
    }
}

bitflags! {
    /// Grammar-wide load options.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
    pub struct TimexOptions: u32 {
        /// Rule regexes and normalization tables compare case-sensitively.
        const CASE_SENSITIVE = 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
#[repr(u8)]
pub enum ResourceScope {
    /// Only referenceable from other resources.
    Private = 0,
    /// Additionally exposed to the matcher.
    #[default]
    Public = 1,
}

impl ResourceScope {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            n if n.eq_ignore_ascii_case("private") => Some(Self::Private),
            n if n.eq_ignore_ascii_case("public") => Some(Self::Public),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
#[repr(u8)]
pub enum WeekdayLogic {
    Programmatic = 0,
    SimpleOffset = 1,
    WeekBoundary = 2,
}

impl WeekdayLogic {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            n if n.eq_ignore_ascii_case("programmatic") => Some(Self::Programmatic),
            n if n.eq_ignore_ascii_case("simpleoffset") => Some(Self::SimpleOffset),
            n if n.eq_ignore_ascii_case("weekboundary") => Some(Self::WeekBoundary),
            _ => None,
        }
    }
}

/// Locale-specific resolution hints declared by `<meta name=".." content=".."/>`.
/// The engine only carries them; resolving a dictionary into calendar values
/// is the caller's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
pub struct GrammarHints {
    pub weekday_logic: Option<WeekdayLogic>,
    pub am_pm_inference_cutoff: Option<i32>,
    pub include_current_time_in_past_or_future: Option<bool>,
}

impl GrammarHints {
    /// Applies one meta entry. Returns false when the name is unknown or the
    /// content does not parse, leaving the hints untouched.
    pub fn apply(&mut self, name: &str, content: &str) -> bool {
        let content = content.trim();
        match name {
            "WeekdayLogic" => match WeekdayLogic::from_name(content) {
                Some(logic) => {
                    self.weekday_logic = Some(logic);
                    true
                }
                None => false,
            },
            "AmPmInferenceCutoff" => match content.parse::<i32>() {
                Ok(cutoff) => {
                    self.am_pm_inference_cutoff = Some(cutoff);
                    true
                }
                Err(_) => false,
            },
            "IncludeCurrentTimeInPastOrFuture" => {
                let flag = if content.eq_ignore_ascii_case("true") {
                    true
                } else if content.eq_ignore_ascii_case("false") {
                    false
                } else {
                    return false;
                };
                self.include_current_time_in_past_or_future = Some(flag);
                true
            }
            _ => false,
        }
    }
}
