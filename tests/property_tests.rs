//! Property tests for canonical form, numbers and determinism

use proptest::prelude::*;
use selfscript::*;

/// Small random expressions built from the grammar
fn expression() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        (0u32..1000).prop_map(|n| n.to_string()),
        (0u32..1000).prop_map(|n| format!("-{}", n)),
        "[a-z]{1,4}",
        prop::collection::vec(any::<u8>(), 0..4).prop_map(|bytes| format!("0x{}", hex::encode(bytes))),
        Just("TRUE".to_string()),
        Just("@BLOCK".to_string()),
    ];
    leaf.prop_recursive(4, 24, 3, |inner| {
        let ops = prop::sample::select(vec!["+", "-", "*", "/", "%", "&", "|", "^", "EQ", "LT", "AND", "OR", "<<"]);
        prop_oneof![
            (inner.clone(), ops, inner.clone()).prop_map(|(l, op, r)| format!("{} {} {}", l, op, r)),
            inner.clone().prop_map(|e| format!("( {} )", e)),
            inner.clone().prop_map(|e| format!("NOT {}", e)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("max({}, {})", a, b)),
            inner.prop_map(|e| format!("LEN({})", e)),
        ]
    })
}

fn script() -> impl Strategy<Value = String> {
    (expression(), expression(), expression()).prop_map(|(a, b, c)| {
        format!("let v = {} if {} then return {} endif return false", a, b, c)
    })
}

proptest! {
    #[test]
    fn prop_clean_is_idempotent(script in script()) {
        let engine = ScriptEngine::new();
        if let Ok(once) = engine.clean(&script) {
            let twice = engine.clean(&once).unwrap();
            prop_assert_eq!(&twice, &once);
            prop_assert_eq!(engine.parse(&once).unwrap(), engine.parse(&script).unwrap());
        }
    }

    #[test]
    fn prop_address_ignores_layout(script in script()) {
        let engine = ScriptEngine::new();
        if let Ok(address) = engine.address(&script) {
            let spaced = script.replace(' ', "   ").to_uppercase();
            // Upper-casing only touches keywords, names and hex digits
            if let Ok(other) = engine.address(&spaced) {
                prop_assert_eq!(address.hash(), other.hash());
            }
        }
    }

    #[test]
    fn prop_evaluation_is_deterministic(script in script()) {
        let engine = ScriptEngine::new();
        let tx = Transaction::default();
        let witness = Witness::default();
        let mut first = engine.contract(&script, &tx, &witness, &[]);
        first.set_global("BLOCK", Value::Number(Number::from(7i64)));
        let mut second = engine.contract(&script, &tx, &witness, &[]);
        second.set_global("BLOCK", Value::Number(Number::from(7i64)));
        prop_assert_eq!(first.execute(), second.execute());
        prop_assert_eq!(first.instructions(), second.instructions());
        prop_assert!(first.instructions() <= MAX_INSTRUCTIONS);
    }

    #[test]
    fn prop_number_text_is_canonical(whole in -1_000_000i64..1_000_000, frac in 0u32..10_000) {
        let text = format!("{}.{:04}", whole, frac);
        let number: Number = text.parse().unwrap();
        let canonical = number.to_string();
        let reparsed: Number = canonical.parse().unwrap();
        prop_assert_eq!(&reparsed, &number);
        prop_assert_eq!(reparsed.to_string(), canonical.clone());
        prop_assert!(!canonical.ends_with('.'));
        prop_assert!(!canonical.contains('.') || !canonical.ends_with('0'));
    }
}
