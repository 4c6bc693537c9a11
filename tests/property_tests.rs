/// Property-based tests using proptest
/// Tests invariants of the validator and the feature row for arbitrary inputs
use immo_predict::features::{FeatureRow, FEATURE_COLUMNS};
use immo_predict::models::{Epc, Province, SubpropertyType};
use immo_predict::validation::validate_payload;
use proptest::prelude::*;
use serde_json::{json, Value};

fn valid_body(
    area: f64,
    bedrooms: u32,
    frontages: u8,
    kind: SubpropertyType,
    province: Province,
    epc: Epc,
    terrace: bool,
) -> Value {
    json!({
        "total_area_sqm": area,
        "cadastral_income": 850.0,
        "primary_energy_consumption_sqm": 210.0,
        "nbr_bedrooms": bedrooms,
        "nbr_frontages": frontages,
        "subproperty_type": kind.as_str(),
        "province": province.as_str(),
        "fl_terrace": terrace,
        "fl_garden": false,
        "fl_swimming_pool": false,
        "fl_furnished": false,
        "epc": epc.as_str(),
        "equipped_kitchen": "INSTALLED",
        "heating_type": "GAS"
    })
}

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        (-1.0e9f64..1.0e9).prop_map(|n| json!(n)),
        "\\PC{0,12}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::hash_map(
                prop_oneof![
                    prop::sample::select(FEATURE_COLUMNS.to_vec()).prop_map(str::to_string),
                    "[a-z_]{1,12}",
                ],
                inner,
                0..16
            )
            .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

// Property: Validation should never panic
proptest! {
    #[test]
    fn validation_never_panics(body in arb_json()) {
        let _ = validate_payload(&body);
    }

    #[test]
    fn rejected_bodies_always_name_a_field(body in arb_json()) {
        if let Err(err) = validate_payload(&body) {
            prop_assert!(!err.errors.is_empty());
        }
    }
}

// Property: Well-formed listings are accepted and materialize to the fourteen columns
proptest! {
    #[test]
    fn valid_listings_are_accepted(
        area in 1.0f64..5000.0,
        bedrooms in 0u32..30,
        frontages in 1u8..=4,
        kind in prop::sample::select(SubpropertyType::ALL.to_vec()),
        province in prop::sample::select(Province::ALL.to_vec()),
        epc in prop::sample::select(Epc::ALL.to_vec()),
        terrace in any::<bool>()
    ) {
        let body = valid_body(area, bedrooms, frontages, kind, province, epc, terrace);
        let features = validate_payload(&body).unwrap();
        prop_assert_eq!(features.subproperty_type, kind);
        prop_assert_eq!(features.nbr_frontages, frontages);

        let row = FeatureRow::from(&features);
        prop_assert_eq!(row.column_names().collect::<Vec<_>>(), FEATURE_COLUMNS.to_vec());
    }

    #[test]
    fn frontages_outside_one_to_four_are_rejected(frontages in prop_oneof![Just(0i64), 5i64..1000]) {
        let mut body = valid_body(80.0, 1, 2, SubpropertyType::House, Province::Namur, Epc::Bad, false);
        body["nbr_frontages"] = json!(frontages);
        let err = validate_payload(&body).unwrap_err();
        prop_assert!(err.mentions("nbr_frontages"));
    }

    #[test]
    fn any_single_missing_field_is_named(index in 0usize..14) {
        let mut body = valid_body(120.0, 3, 4, SubpropertyType::Villa, Province::Liege, Epc::Excellent, true);
        let column = FEATURE_COLUMNS[index];
        body.as_object_mut().unwrap().remove(column);
        let err = validate_payload(&body).unwrap_err();
        prop_assert_eq!(err.errors.len(), 1);
        prop_assert!(err.mentions(column));
    }
}
