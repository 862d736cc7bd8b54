mod common;

use record_lens::{
    compare::{ComparisonGroup, GroupCondition, boolean_combinations, compare_groups, parse_group},
    config::{AnalysisConfig, DropZone},
    data::Value,
    pipeline::Session,
};

use common::normalized_fixture;

#[test]
fn groups_over_the_same_field_are_independent() {
    let records = normalized_fixture("sessions.json");
    let offer = ComparisonGroup::from_conditions(vec![GroupCondition::new("isOfferApplied", true)]);
    let no_offer =
        ComparisonGroup::from_conditions(vec![GroupCondition::new("isOfferApplied", false)]);
    let groups = compare_groups(&records, &[offer, no_offer]);
    let sizes = groups.iter().map(|(name, members)| (name.as_str(), members.len())).collect::<Vec<_>>();
    assert_eq!(sizes, vec![("isOfferApplied: True", 4), ("isOfferApplied: False", 4)]);
}

#[test]
fn overlapping_groups_can_exceed_dataset_size() {
    let records = normalized_fixture("sessions.json");
    let everything = ComparisonGroup::new("All");
    let android = parse_group("Android:platform=Android").expect("parse group");
    let groups = compare_groups(&records, &[everything, android]);
    let total = groups.values().map(Vec::len).sum::<usize>();
    assert_eq!(groups["All"].len(), records.len());
    assert_eq!(groups["Android"].len(), 5);
    assert!(total > records.len());
}

#[test]
fn equality_is_strict() {
    let records = normalized_fixture("sessions.json");
    // Decoded booleans are not equal to their string spelling.
    let stringly = ComparisonGroup::from_conditions(vec![GroupCondition::new("isOfferApplied", "true")]);
    let groups = compare_groups(&records, &[stringly]);
    assert!(groups["isOfferApplied: True"].is_empty());
}

#[test]
fn empty_groups_are_kept() {
    let records = normalized_fixture("sessions.json");
    let nobody = parse_group("Nobody:platform=web").expect("parse group");
    let groups = compare_groups(&records, &[nobody]);
    assert_eq!(groups.len(), 1);
    assert!(groups["Nobody"].is_empty());
}

#[test]
fn combinations_partition_boolean_fields() {
    let records = normalized_fixture("sessions.json");
    let groups = boolean_combinations(&["isOfferApplied".to_string(), "isPriceListApplied".to_string()]);
    assert_eq!(groups.len(), 4);
    let result = compare_groups(&records, &groups);
    let sizes = result.values().map(Vec::len).collect::<Vec<_>>();
    assert_eq!(sizes, vec![1, 3, 2, 2]);
    assert_eq!(sizes.iter().sum::<usize>(), records.len());
}

#[test]
fn dropped_fields_build_comparison_groups() {
    let mut session = Session::new();
    let raw = std::fs::read_to_string(common::fixture_path("sessions.json")).expect("read fixture");
    session.load_json(&raw).expect("load dataset");

    assert!(session.apply(|c| c.handle_field_drop("isOfferApplied", DropZone::Comparisons)));
    let group = &session.config().comparison_groups[0];
    assert_eq!(group.name, "isOfferApplied: True");
    assert_eq!(group.conditions[0].value, Value::Boolean(true));

    let id = group.id;
    session.apply(|c| c.update_comparison_condition(id, 0, "isOfferApplied", Value::Boolean(false)));
    let comparison = session.comparison();
    assert_eq!(comparison["isOfferApplied: False"].len(), 4);

    session.apply(AnalysisConfig::add_comparison_group);
    assert_eq!(session.config().comparison_groups[1].name, "Group 2");
    assert_eq!(session.comparison()["Group 2"].len(), 8);
}
