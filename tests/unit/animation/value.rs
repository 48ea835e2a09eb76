use super::*;

fn mix(progress: f64) -> Mix {
    Mix {
        progress,
        eased: progress,
    }
}

#[test]
fn numbers_lerp_with_eased_progress() {
    let a = PropValue::Number(140.0);
    let b = PropValue::Number(0.0);
    let m = Mix {
        progress: 0.5,
        eased: 0.25,
    };
    assert_eq!(PropValue::blend(&a, &b, m), PropValue::Number(105.0));
}

#[test]
fn records_blend_per_field() {
    let a = PropValue::record([("bearing", 140.0), ("pitch", 60.0)]);
    let b = PropValue::record([("bearing", 0.0), ("pitch", 30.0)]);
    let out = PropValue::blend(&a, &b, mix(0.5));
    assert_eq!(out.get_f64("bearing"), Some(70.0));
    assert_eq!(out.get_f64("pitch"), Some(45.0));
}

#[test]
fn lists_of_equal_length_blend_per_element() {
    let a = PropValue::from(vec![0.0, 10.0]);
    let b = PropValue::from(vec![10.0, 20.0]);
    assert_eq!(
        PropValue::blend(&a, &b, mix(0.5)),
        PropValue::from(vec![5.0, 15.0])
    );
}

#[test]
fn non_numeric_fields_step_at_midpoint() {
    let a = PropValue::record([
        ("visible", PropValue::Bool(false)),
        ("label", PropValue::from("a")),
    ]);
    let b = PropValue::record([
        ("visible", PropValue::Bool(true)),
        ("label", PropValue::from("b")),
    ]);

    let before = PropValue::blend(&a, &b, mix(0.499));
    assert_eq!(before.get("visible"), Some(&PropValue::Bool(false)));
    assert_eq!(before.get("label"), Some(&PropValue::from("a")));

    let at = PropValue::blend(&a, &b, mix(0.5));
    assert_eq!(at.get("visible"), Some(&PropValue::Bool(true)));
    assert_eq!(at.get("label"), Some(&PropValue::from("b")));
}

#[test]
fn step_uses_raw_progress_not_eased_progress() {
    let a = PropValue::Bool(false);
    let b = PropValue::Bool(true);
    // An ease-in curve keeps `eased` well below 0.5 at u = 0.6; the switch still happens.
    let m = Mix {
        progress: 0.6,
        eased: 0.36,
    };
    assert_eq!(PropValue::blend(&a, &b, m), PropValue::Bool(true));
}

#[test]
fn shape_mismatches_step() {
    let a = PropValue::from(vec![1.0, 2.0]);
    let b = PropValue::from(vec![1.0, 2.0, 3.0]);
    assert_eq!(PropValue::blend(&a, &b, mix(0.2)), a);
    assert_eq!(PropValue::blend(&a, &b, mix(0.8)), b);

    let n = PropValue::Number(1.0);
    let t = PropValue::from("one");
    assert_eq!(PropValue::blend(&n, &t, mix(0.3)), n);
}

#[test]
fn one_sided_fields_appear_and_disappear_at_midpoint() {
    let a = PropValue::record([("opacity", 0.5), ("only_left", 1.0)]);
    let b = PropValue::record([("opacity", 1.0), ("only_right", 2.0)]);

    let early = PropValue::blend(&a, &b, mix(0.25));
    assert_eq!(early.get_f64("only_left"), Some(1.0));
    assert!(early.get("only_right").is_none());

    let late = PropValue::blend(&a, &b, mix(0.75));
    assert!(late.get("only_left").is_none());
    assert_eq!(late.get_f64("only_right"), Some(2.0));
}

#[test]
fn merged_with_overlays_records_recursively() {
    let base = PropValue::record([
        ("zoom", PropValue::Number(11.5)),
        (
            "style",
            PropValue::record([("width", 50.0), ("opacity", 1.0)]),
        ),
    ]);
    let over = PropValue::record([("style", PropValue::record([("opacity", 0.5)]))]);
    let out = base.merged_with(&over);
    assert_eq!(out.get_f64("zoom"), Some(11.5));
    let style = out.get("style").unwrap();
    assert_eq!(style.get_f64("width"), Some(50.0));
    assert_eq!(style.get_f64("opacity"), Some(0.5));
}

#[test]
fn untagged_json_shapes_deserialize() {
    let v: PropValue =
        serde_json::from_str(r#"{"bearing": 140, "visible": true, "color": [243, 140, 0]}"#)
            .unwrap();
    assert_eq!(v.get_f64("bearing"), Some(140.0));
    assert_eq!(v.get("visible"), Some(&PropValue::Bool(true)));
    assert_eq!(v.get("color"), Some(&PropValue::from(vec![243.0, 140.0, 0.0])));
}
