use pts_engine::{PcrSet, PtsError};

// Test Objective: Verify the selection bitmap layout for a known subset
// Expected Result: select = {0x01, 0x04, 0x02}, count 3, max index 17
#[test]
fn test_select_bitmap_layout() {
    let mut set = PcrSet::new();
    set.select(0).unwrap();
    set.select(10).unwrap();
    set.select(17).unwrap();

    assert_eq!(set.select_bytes(), &[0x01, 0x04, 0x02]);
    assert_eq!(set.count(), 3);
    assert_eq!(set.max_index(), 17);
    assert_eq!(set.size_of_select(), 3);
    assert!(set.is_selected(0));
    assert!(set.is_selected(10));
    assert!(set.is_selected(17));
    assert!(!set.is_selected(1));
    assert_eq!(set.selected_indices(), vec![0, 10, 17]);
}

#[test]
fn test_select_is_idempotent() {
    let mut set = PcrSet::new();
    set.select(5).unwrap();
    set.select(5).unwrap();
    assert_eq!(set.count(), 1);
}

// Test Objective: Verify the index bounds of the 24-register TPM 1.2 model
// Expected Result: index 24 is rejected, index 23 is accepted
#[test]
fn test_index_bounds() {
    let mut set = PcrSet::new();
    assert!(matches!(set.select(24), Err(PtsError::PcrIndexOutOfRange(24))));
    assert!(matches!(
        set.add(24, &[0u8; 20], &[0u8; 20]),
        Err(PtsError::PcrIndexOutOfRange(24))
    ));
    assert!(set.select(23).is_ok());
    assert_eq!(set.max_index(), 23);
}

// Test Objective: The first stored value fixes the register width
// Expected Result: a later value of a different width is rejected
#[test]
fn test_register_width_is_fixed_by_first_add() {
    let mut set = PcrSet::new();
    set.add(0, &[0u8; 20], &[0x0au8; 20]).unwrap();
    assert_eq!(set.pcr_len(), 20);

    let result = set.add(1, &[0u8; 16], &[0x0bu8; 16]);
    assert!(matches!(
        result,
        Err(PtsError::PcrLengthMismatch { expected: 20, actual: 16 })
    ));
}

// Test Objective: A mismatching pcr_before value is not fatal
// Expected Result: the new value still replaces the stored one
#[test]
fn test_add_overwrites_on_before_mismatch() {
    let mut set = PcrSet::new();
    set.add(3, &[0u8; 20], &[0x0au8; 20]).unwrap();
    set.add(3, &[0u8; 20], &[0x0bu8; 20]).unwrap();

    assert_eq!(set.value(3), Some(&[0x0bu8; 20][..]));
    assert_eq!(set.count(), 1);
}

// Test Objective: Verify the exact PCR Composite bytes for three registers
// Expected Result: 0x0003 | 0x010402 | 0x0000003C | the three values
#[test]
fn test_composite_bytes() {
    let mut set = PcrSet::new();
    set.add(0, &[0u8; 20], &[0x00u8; 20]).unwrap();
    set.add(10, &[0u8; 20], &[0x11u8; 20]).unwrap();
    set.add(17, &[0u8; 20], &[0x22u8; 20]).unwrap();

    let composite = set.compose();
    let mut expected = vec![0x00, 0x03, 0x01, 0x04, 0x02, 0x00, 0x00, 0x00, 0x3c];
    expected.extend_from_slice(&[0x00u8; 20]);
    expected.extend_from_slice(&[0x11u8; 20]);
    expected.extend_from_slice(&[0x22u8; 20]);
    assert_eq!(composite, expected);
}

// Test Objective: A selection-only register widens the declared value size
// but contributes no value bytes
// Expected Result: value_size counts both registers, the value area holds one
#[test]
fn test_composite_with_selection_only_register() {
    let mut set = PcrSet::new();
    set.add(0, &[0u8; 20], &[0x0au8; 20]).unwrap();
    set.select(5).unwrap();

    let composite = set.compose();
    // size_of_select 3, bits 0 and 5 in the first byte
    assert_eq!(&composite[..5], &[0x00, 0x03, 0x21, 0x00, 0x00]);
    // declared value size is count * pcr_len
    assert_eq!(&composite[5..9], &40u32.to_be_bytes());
    // only the stored value follows
    assert_eq!(composite.len(), 9 + 20);
}

#[test]
fn test_clear_resets_selection_but_keeps_width() {
    let mut set = PcrSet::new();
    set.add(7, &[0u8; 20], &[0x07u8; 20]).unwrap();
    set.clear();

    assert_eq!(set.count(), 0);
    assert_eq!(set.max_index(), 0);
    assert_eq!(set.select_bytes(), &[0x00, 0x00, 0x00]);
    assert_eq!(set.value(7), None);
    assert_eq!(set.pcr_len(), 20);
    assert_eq!(set.compose(), vec![0x00, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
}
