//! 人格档案操作的边界测试

use nexus_core::personality::{template, Direction, Level, PersonalityError, DEFAULT_TRAIT_VALUE};
use nexus_core::{PersonalityProfile, Trait};

fn assert_in_range(profile: &PersonalityProfile) {
    for (t, value) in profile.iter() {
        assert!((0.0..=1.0).contains(&value), "{t} = {value}");
    }
}

#[test]
fn test_every_template_stays_in_range() {
    for name in template::names() {
        let profile = PersonalityProfile::from_template(name).unwrap();
        assert_in_range(&profile);
    }
    assert_eq!(
        PersonalityProfile::from_template("jester"),
        Err(PersonalityError::UnknownTemplate("jester".into()))
    );
}

#[test]
fn test_set_rejects_out_of_range() {
    let profile = PersonalityProfile::default();
    for bad in [-0.01, 1.01, f64::NAN, f64::INFINITY] {
        assert!(matches!(
            profile.set(Trait::Curiosity, bad),
            Err(PersonalityError::InvalidTrait { .. })
        ));
    }
    assert_eq!(profile.get(Trait::Curiosity), DEFAULT_TRAIT_VALUE);
    assert_eq!(profile.set(Trait::Curiosity, 1.0).unwrap().get(Trait::Curiosity), 1.0);
    assert!(profile.set_named("charisma", 0.5).is_err());
}

#[test]
fn test_evolve_clamps_at_bounds() {
    let mut profile = PersonalityProfile::default();
    for _ in 0..10 {
        profile = profile.evolve(Trait::Humor, Direction::Increase, 0.25).unwrap();
        assert_in_range(&profile);
    }
    assert_eq!(profile.get(Trait::Humor), 1.0);

    for _ in 0..10 {
        profile = profile.evolve(Trait::Humor, Direction::Decrease, 0.3).unwrap();
    }
    assert_eq!(profile.get(Trait::Humor), 0.0);

    for rate in [0.0, -0.1, 1.5] {
        assert_eq!(
            profile.evolve(Trait::Humor, Direction::Increase, rate),
            Err(PersonalityError::InvalidEvolution(rate))
        );
    }
}

#[test]
fn test_mix_weights() {
    let analyst = PersonalityProfile::from_template("analyst").unwrap();
    let creative = PersonalityProfile::from_template("creative").unwrap();

    let mixed = analyst.mix(&creative, (0.6, 0.4)).unwrap();
    assert_in_range(&mixed);
    let expected = 0.6 * analyst.get(Trait::Creativity) + 0.4 * creative.get(Trait::Creativity);
    assert!((mixed.get(Trait::Creativity) - expected).abs() < 1e-12);

    assert_eq!(analyst.mix(&creative, (1.0, 0.0)).unwrap(), analyst);
    assert_eq!(
        analyst.mix(&creative, (0.6, 0.6)),
        Err(PersonalityError::InvalidWeights(0.6, 0.6))
    );
    assert!(analyst.mix(&creative, (1.2, -0.2)).is_err());
}

#[test]
fn test_describe_thresholds() {
    let profile = PersonalityProfile::default()
        .set(Trait::Empathy, 0.81)
        .and_then(|p| p.set(Trait::Humor, 0.8))
        .and_then(|p| p.set(Trait::Formality, 0.6))
        .unwrap();
    assert_eq!(profile.describe(Trait::Empathy), Level::High);
    assert_eq!(profile.describe(Trait::Humor), Level::Moderate);
    assert_eq!(profile.describe(Trait::Formality), Level::Low);
}

#[test]
fn test_apply_block_is_all_or_nothing() {
    let profile = PersonalityProfile::default();
    let entries = [(Trait::Curiosity, 0.9), (Trait::Humor, 1.3)];
    assert!(profile.apply_block(&entries).is_err());
    assert_eq!(profile.get(Trait::Curiosity), DEFAULT_TRAIT_VALUE);

    let duplicate = [(Trait::Humor, 0.2), (Trait::Humor, 0.3)];
    assert_eq!(
        profile.apply_block(&duplicate),
        Err(PersonalityError::DuplicateTrait("humor".into()))
    );
}

#[test]
fn test_profile_deserializes_from_json_map() {
    let profile: PersonalityProfile =
        serde_json::from_str(r#"{"curiosity": 0.9, "humor": 0.1}"#).unwrap();
    assert_eq!(profile.get(Trait::Curiosity), 0.9);
    assert_eq!(profile.get(Trait::Humor), 0.1);
    assert_eq!(profile.get(Trait::Empathy), DEFAULT_TRAIT_VALUE);

    assert!(serde_json::from_str::<PersonalityProfile>(r#"{"curiosity": 2.0}"#).is_err());
}
