use proptest::prelude::*;

use tether_shared::diff::{apply, diff, SpliceInstruction};

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[test]
fn two_independent_regions_give_two_instructions() {
    let old = strings(&["a", "b", "c", "d"]);
    let new = strings(&["x", "b", "c", "y"]);

    let edits = diff(&old, &new);

    assert_eq!(
        edits,
        vec![
            SpliceInstruction::replace(0, 1, strings(&["x"])),
            SpliceInstruction::replace(3, 1, strings(&["y"])),
        ]
    );
    assert_eq!(apply(&old, &edits).unwrap(), new);
}

#[test]
fn interleaved_edits_give_one_instruction_per_region() {
    let old = strings(&["a", "b", "c", "d", "e", "f"]);
    let new = strings(&["x", "a", "b", "y", "d", "z"]);

    let edits = diff(&old, &new);

    assert_eq!(edits.len(), 3);
    assert_eq!(apply(&old, &edits).unwrap(), new);
}

#[test]
fn single_insertion_is_one_instruction() {
    let old = strings(&["a", "b"]);
    let new = strings(&["a", "q", "r", "b"]);

    assert_eq!(
        diff(&old, &new),
        vec![SpliceInstruction::insert(1, strings(&["q", "r"]))]
    );
}

fn sequence() -> impl Strategy<Value = Vec<u8>> {
    // a small alphabet so sequences share elements
    prop::collection::vec(0u8..6, 0..24)
}

proptest! {
    #[test]
    fn applying_the_diff_yields_the_target(old in sequence(), new in sequence()) {
        let edits = diff(&old, &new);
        prop_assert_eq!(apply(&old, &edits).unwrap(), new);
    }

    #[test]
    fn identical_sequences_need_no_edits(values in sequence()) {
        prop_assert!(diff(&values, &values).is_empty());
    }

    #[test]
    fn instructions_are_ordered_and_disjoint(old in sequence(), new in sequence()) {
        let edits = diff(&old, &new);
        for pair in edits.windows(2) {
            // at least one matched element separates two regions
            prop_assert!(pair[0].end() < pair[1].start);
        }
        for edit in &edits {
            prop_assert!(!edit.is_noop());
        }
    }

    #[test]
    fn untouched_elements_survive_in_order(old in sequence(), new in sequence()) {
        let edits = diff(&old, &new);
        let kept: Vec<u8> = old
            .iter()
            .enumerate()
            .filter(|(index, _)| !edits.iter().any(|edit| edit.covers(*index)))
            .map(|(_, value)| *value)
            .collect();
        let inserted: usize = edits.iter().map(|edit| edit.items.len()).sum();

        let mut remaining = new.iter();
        for value in &kept {
            prop_assert!(remaining.any(|candidate| candidate == value));
        }
        prop_assert_eq!(kept.len() + inserted, new.len());
    }
}
