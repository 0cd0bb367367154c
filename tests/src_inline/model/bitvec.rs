use super::*;

fn ids(raw: &[u64]) -> Vec<ExperimentId> {
    raw.iter().map(|v| ExperimentId(*v)).collect()
}

#[test]
fn test_ordering_is_sorted_and_deduplicated() {
    let ordering = ExperimentOrdering::new(ids(&[30, 10, 20, 10]));
    assert_eq!(ordering.ids(), ids(&[10, 20, 30]).as_slice());
    assert_eq!(ordering.position(ExperimentId(20)), Some(1));
    assert_eq!(ordering.position(ExperimentId(99)), None);
}

#[test]
fn test_ordering_independent_of_input_order() {
    let a = ExperimentOrdering::new(ids(&[5, 1, 9, 3]));
    let b = ExperimentOrdering::new(ids(&[9, 3, 5, 1]));
    assert_eq!(a, b);
    let (bits_a, _) = a.encode(ids(&[3, 9]));
    let (bits_b, _) = b.encode(ids(&[9, 3]));
    assert_eq!(bits_a, bits_b);
}

#[test]
fn test_bit_layout_msb_first() {
    let mut bits = ExperimentBits::new(10);
    assert_eq!(bits.bytes.len(), 2);
    bits.set(0);
    bits.set(9);
    assert_eq!(bits.bytes, [0x80, 0x40]);
    assert_eq!(bits.to_bit_string(), "1000000001");
}

#[test]
fn test_encode_decode() {
    let ordering = ExperimentOrdering::new(ids(&[1, 2, 3, 4, 5, 6, 7, 8, 9]));
    let (bits, set) = ordering.encode(ids(&[2, 9, 2, 42]));
    assert_eq!(set, 2);
    assert_eq!(bits.count_ones(), 2);
    assert_eq!(ordering.decode(&bits), ids(&[2, 9]));
}

#[test]
fn test_full_encode_has_no_padding_bits() {
    let ordering = ExperimentOrdering::new(ids(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]));
    let (bits, set) = ordering.encode(ordering.ids().to_vec());
    assert_eq!(set, 11);
    assert_eq!(bits.count_ones(), 11);
    assert_eq!(bits.bytes, [0xFF, 0xE0]);
}

#[test]
fn test_subset() {
    let mut all = ExperimentBits::new(4);
    all.set(0);
    all.set(2);
    let mut some = ExperimentBits::new(4);
    some.set(2);
    assert!(some.is_subset_of(&all));
    some.set(1);
    assert!(!some.is_subset_of(&all));
}

#[test]
fn test_empty_vector() {
    let bits = ExperimentBits::new(0);
    assert!(bits.is_empty());
    assert!(bits.bytes.is_empty());
    assert_eq!(bits.count_ones(), 0);
}

#[test]
#[should_panic]
fn test_set_out_of_range_panics() {
    let mut bits = ExperimentBits::new(3);
    bits.set(3);
}
