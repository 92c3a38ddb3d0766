use super::*;

const ALL: [Ease; 7] = [
    Ease::Linear,
    Ease::EaseIn,
    Ease::EaseOut,
    Ease::EaseInOut,
    Ease::InCubic,
    Ease::OutCubic,
    Ease::InOutCubic,
];

#[test]
fn endpoints_are_fixed() {
    for ease in ALL {
        assert!(ease.apply(0.0).abs() < 1e-12, "{ease:?} at 0");
        assert!((ease.apply(1.0) - 1.0).abs() < 1e-12, "{ease:?} at 1");
    }
}

#[test]
fn input_is_clamped() {
    assert_eq!(Ease::Linear.apply(-3.0), 0.0);
    assert_eq!(Ease::EaseInOut.apply(7.0), 1.0);
}

#[test]
fn curves_are_monotonic() {
    for ease in ALL {
        let mut last = 0.0;
        for i in 0..=100 {
            let v = ease.apply(f64::from(i) / 100.0);
            assert!(v + 1e-12 >= last, "{ease:?} decreased at step {i}");
            last = v;
        }
    }
}

#[test]
fn parses_css_and_alias_names() {
    assert_eq!(Ease::parse("linear").unwrap(), Ease::Linear);
    assert_eq!(Ease::parse("Ease-In-Out").unwrap(), Ease::EaseInOut);
    assert_eq!(Ease::parse("in_quad").unwrap(), Ease::EaseIn);
    assert_eq!(Ease::parse("out-cubic").unwrap(), Ease::OutCubic);
    assert!(Ease::parse("bouncy").is_err());
}

#[test]
fn deserializes_from_json_names() {
    let e: Ease = serde_json::from_str("\"ease-in-out\"").unwrap();
    assert_eq!(e, Ease::EaseInOut);
    let e: Ease = serde_json::from_str("\"out-quad\"").unwrap();
    assert_eq!(e, Ease::EaseOut);
}
