//! Proptest generators for property-based testing.

use proptest::prelude::*;

/// Any slot number a caller might send, valid or not.
pub fn any_slot_number() -> impl Strategy<Value = i64> {
    prop_oneof![
        8 => 1i64..=25,
        1 => -5i64..=0,
        1 => 26i64..=40,
    ]
}

/// A slot list that passes validation, in random order.
pub fn valid_slots() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::btree_set(1i64..=25, 1..=25)
        .prop_map(|set| set.into_iter().collect::<Vec<_>>())
        .prop_shuffle()
}

/// A slot list that fails validation: empty, out of range, or repeated.
pub fn invalid_slots() -> impl Strategy<Value = Vec<i64>> {
    prop_oneof![
        Just(Vec::new()),
        (valid_slots(), prop_oneof![i64::MIN..=0i64, 26i64..=i64::MAX]).prop_map(
            |(mut slots, bad)| {
                slots.push(bad);
                slots
            }
        ),
        valid_slots().prop_map(|mut slots| {
            slots.push(slots[0]);
            slots
        }),
    ]
}

/// A password that satisfies the policy.
pub fn password() -> impl Strategy<Value = String> {
    "[a-z]{5,8}[A-Z]{1,3}[0-9]{1,3}[@$!%*?&]{1,2}".prop_map(String::from)
}

/// An email whose local part is a valid username.
pub fn email() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{2,15}@example\\.(com|org)".prop_map(String::from)
}

/// A grant and a slot to ask about afterwards.
#[derive(Debug, Clone)]
pub struct GrantProbe {
    pub slots: Vec<i64>,
    pub probe: i64,
}

impl GrantProbe {
    /// Whether `probe` should be editable under `slots`.
    pub fn expected(&self) -> bool {
        self.slots.contains(&self.probe)
    }
}

impl Arbitrary for GrantProbe {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (valid_slots(), any_slot_number())
            .prop_map(|(slots, probe)| GrantProbe { slots, probe })
            .boxed()
    }
}
