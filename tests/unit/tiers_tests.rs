/*!
 * Tests for tiers and tier types
 */

use elan_data::tiers::{Stereotype, Tier, TierType, DEFAULT_TIER, DEFAULT_TIER_TYPE};
use elan_data::EafError;
use quick_xml::events::BytesStart;

/// Test that a subtier keeps its parent and extra attributes through its XML tag
#[test]
fn test_tier_asXml_withSubtier_shouldParseBack() {
    let mut tier = Tier::subtier("Gloss", "Speaker A", "gloss-lt")
        .with_participant("Alice")
        .with_annotator("Bob");
    tier.set_attribute("DEFAULT_LOCALE", "en");

    let parsed = Tier::from_xml(&tier.as_xml()).unwrap();

    assert_eq!(parsed, tier);
    assert!(parsed.is_subtier());
    assert_eq!(parsed.parent.as_deref(), Some("Speaker A"));
}

/// Test that a TIER tag without a linguistic type is rejected
#[test]
fn test_tier_fromXml_withoutTypeRef_shouldReportMissingAttribute() {
    let tag = BytesStart::from_content(r#"TIER TIER_ID="lonely""#, 4);

    match Tier::from_xml(&tag) {
        Err(EafError::MissingAttribute { element, attribute }) => {
            assert_eq!(element, "TIER");
            assert_eq!(attribute, "LINGUISTIC_TYPE_REF");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

/// Test the defaults of a new tier
#[test]
fn test_tier_default_shouldBeTopLevelDefaultTier() {
    let tier = Tier::default();
    assert_eq!(tier.name, DEFAULT_TIER);
    assert_eq!(tier.tier_type, DEFAULT_TIER_TYPE);
    assert!(!tier.is_subtier());
    assert!(tier.extra.is_empty());
}

/// Test that symbolic tier types are written as not time alignable
#[test]
fn test_tierType_asXml_withSymbolicStereotype_shouldNotBeTimeAlignable() {
    let tier_type = TierType::new("gloss-lt", Stereotype::SymbolicAssociation);
    let tag = tier_type.as_xml();

    let attributes: Vec<(String, String)> = tag
        .attributes()
        .map(|a| {
            let a = a.unwrap();
            (
                String::from_utf8_lossy(a.key.as_ref()).into_owned(),
                a.unescape_value().unwrap().into_owned(),
            )
        })
        .collect();

    assert!(attributes.contains(&("TIME_ALIGNABLE".to_string(), "false".to_string())));
    assert!(attributes.contains(&("CONSTRAINTS".to_string(), "Symbolic_Association".to_string())));
    assert_eq!(TierType::from_xml(&tag).unwrap(), tier_type);
}

/// Test that an unknown CONSTRAINTS value fails to parse
#[test]
fn test_tierType_fromXml_withBadStereotype_shouldFail() {
    let tag = BytesStart::from_content(r#"LINGUISTIC_TYPE LINGUISTIC_TYPE_ID="x" CONSTRAINTS="Sideways""#, 15);
    assert!(matches!(TierType::from_xml(&tag), Err(EafError::InvalidStereotype(s)) if s == "Sideways"));
}

/// Test the stereotype spellings used in EAF files
#[test]
fn test_stereotype_display_shouldMatchEafSpelling() {
    let names: Vec<String> = Stereotype::ALL.iter().map(|s| s.to_string()).collect();
    assert_eq!(
        names,
        vec![
            "None",
            "Time_Subdivision",
            "Symbolic_Subdivision",
            "Symbolic_Association",
            "Included_In"
        ]
    );
    assert_eq!(Stereotype::default(), Stereotype::None);
}
