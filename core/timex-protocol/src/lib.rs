#![no_std] // Critical for WASM/Embedded compatibility

extern crate alloc;

// Enable std if the feature is active (for tests/tools)
#[cfg(feature = "std")]
extern crate std;

pub mod ids;
pub mod temporal;

// Re-export core types for convenience
pub use ids::PartId;
pub use temporal::*;

pub mod tree;
pub use tree::{names, GrammarElement, GrammarNode};

use alloc::collections::BTreeMap;
use alloc::string::String;

/// Facts produced by tag scripts for a single match (`timex["key"] = ...`).
pub type TimexDictionary = BTreeMap<String, String>;

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_part_id_names() {
        assert_eq!(PartId::new(0).to_string(), "Part0");
        assert_eq!(PartId::new(12).to_string(), "Part12");
        assert_eq!(PartId::from_name("Part7"), Some(PartId(7)));
        assert_eq!(PartId::from_name("Part"), None);
        assert_eq!(PartId::from_name("Group1"), None);
    }

    #[test]
    fn test_temporal_type_names() {
        assert_eq!(TemporalType::from_type_name("date"), Some(TemporalType::DATE));
        assert_eq!(TemporalType::from_type_name("Time"), Some(TemporalType::TIME));
        assert_eq!(TemporalType::from_type_name("DURATION"), Some(TemporalType::DURATION));
        assert_eq!(TemporalType::from_type_name("set"), Some(TemporalType::SET));
        assert_eq!(TemporalType::from_type_name("weekday"), None);
        assert_eq!(TemporalType::from_name("DATE"), Some(TemporalType::DATE));
        assert_eq!(TemporalType::from_name("date"), None);

        let mixed = TemporalType::from_list("date, time").unwrap();
        assert!(mixed.contains(TemporalType::DATE | TemporalType::TIME));
        assert!(!mixed.contains(TemporalType::SET));
        assert_eq!(TemporalType::from_list("all"), Some(TemporalType::all()));
        assert_eq!(TemporalType::from_list("date,bogus"), None);
    }

    #[test]
    fn test_scope_and_hints() {
        assert_eq!(ResourceScope::from_name("PRIVATE"), Some(ResourceScope::Private));
        assert_eq!(ResourceScope::from_name("public"), Some(ResourceScope::Public));
        assert_eq!(ResourceScope::from_name("internal"), None);
        assert_eq!(ResourceScope::default(), ResourceScope::Public);

        let mut hints = GrammarHints::default();
        assert!(hints.apply("AmPmInferenceCutoff", "7"));
        assert!(hints.apply("WeekdayLogic", "WeekBoundary"));
        assert!(hints.apply("IncludeCurrentTimeInPastOrFuture", "True"));
        assert!(!hints.apply("AmPmInferenceCutoff", "seven"));
        assert!(!hints.apply("Unknown", "1"));
        assert_eq!(hints.am_pm_inference_cutoff, Some(7));
        assert_eq!(hints.weekday_logic, Some(WeekdayLogic::WeekBoundary));
        assert_eq!(hints.include_current_time_in_past_or_future, Some(true));
    }

    #[test]
    fn test_tree_text_and_attributes() {
        let item = GrammarElement::new("item")
            .with_attribute("repeat", "1-2")
            .with_text("next ")
            .with_child(GrammarElement::new("tag").with_text("timex[\"a\"] = \"1\""))
            .with_text(" week");

        assert_eq!(item.attribute("repeat"), Some("1-2"));
        assert_eq!(item.attribute("include"), None);
        assert_eq!(item.elements().count(), 1);
        assert_eq!(item.first_element("tag").map(|t| t.text()), Some("timex[\"a\"] = \"1\"".to_string()));
        assert_eq!(item.own_text(), "next  week");
        assert!(item.text().contains("timex"));
    }
}
