//! Property-based tests using proptest
//!
//! These tests verify name resolution invariants across randomized inputs.

use afl_models::models::resolver::{is_valid_stat_name, resolve_any, resolve_core, resolve_stat};
use afl_models::{Catalog, ModelError};
use proptest::prelude::*;

// =============================================================================
// Stat name validation
// =============================================================================

proptest! {
    /// Any name containing a character outside [a-z_] is InvalidName, never UnknownModel
    #[test]
    fn prop_stat_name_with_bad_char_is_invalid(
        prefix in "[a-z_]{0,10}",
        bad in "[A-Z0-9 !.,;:/\\-]",
        suffix in "[a-z_]{0,10}",
    ) {
        let name = format!("{}{}{}", prefix, bad, suffix);
        let catalog = Catalog::builtin();
        prop_assert!(!is_valid_stat_name(&name));
        let is_invalid = matches!(
            resolve_stat(&catalog, &name),
            Err(ModelError::InvalidName { .. })
        );
        prop_assert!(is_invalid);
    }

    /// Well-formed names either resolve to `<name>.rds` or are UnknownModel
    #[test]
    fn prop_well_formed_stat_names(name in "[a-z_]{1,24}") {
        let catalog = Catalog::builtin();
        prop_assert!(is_valid_stat_name(&name));
        match resolve_stat(&catalog, &name) {
            Ok(descriptor) => {
                prop_assert!(catalog.is_stat(&name));
                prop_assert_eq!(&descriptor.filename, &format!("{}.rds", name));
                prop_assert_eq!(descriptor.tag(), "stat-models");
            }
            Err(ModelError::UnknownModel { .. }) => prop_assert!(!catalog.is_stat(&name)),
            Err(other) => prop_assert!(false, "unexpected error {:?}", other),
        }
    }

    /// Core resolution ignores case for both alias forms
    #[test]
    fn prop_core_resolution_case_insensitive(index in 0usize..4, upper_mask in any::<u32>()) {
        let catalog = Catalog::builtin();
        let model = &catalog.core_models()[index];
        for form in [&model.name, &model.file_stem] {
            let mixed: String = form
                .chars()
                .enumerate()
                .map(|(i, c)| if upper_mask & (1 << (i % 32)) != 0 { c.to_ascii_uppercase() } else { c })
                .collect();
            let descriptor = resolve_core(&catalog, &mixed).unwrap();
            prop_assert_eq!(&descriptor, &resolve_core(&catalog, &model.name).unwrap());
            prop_assert_eq!(descriptor.tag(), "core-models");
        }
    }

    /// Resolution is deterministic
    #[test]
    fn prop_resolution_is_pure(name in "[a-zA-Z_ ]{0,16}") {
        let catalog = Catalog::builtin();
        let first = resolve_any(&catalog, &name).ok();
        let second = resolve_any(&catalog, &name).ok();
        prop_assert_eq!(first, second);
    }
}

#[test]
fn test_every_catalog_stat_resolves() {
    let catalog = Catalog::builtin();
    for name in catalog.stat_models() {
        let descriptor = resolve_stat(&catalog, name).unwrap();
        assert_eq!(&descriptor.name, name);
    }
}
