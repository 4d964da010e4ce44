use crate::properties::strategies::{amount_strategy, uint256_strategy};

use charged_token_indexer::models::{
	add_amounts, is_negative_amount, is_zero_amount, parse_amount, sub_amounts,
};
use proptest::{prelude::*, test_runner::Config};

proptest! {
	#![proptest_config(Config {
		failure_persistence: None,
		..Config::default()
	})]

	#[test]
	fn test_add_then_sub_restores_amount(a in amount_strategy(), b in amount_strategy()) {
		let sum = add_amounts(&a, &b).unwrap();
		prop_assert_eq!(sub_amounts(&sum, &b).unwrap(), a);
	}

	#[test]
	fn test_add_is_commutative(a in amount_strategy(), b in amount_strategy()) {
		prop_assert_eq!(add_amounts(&a, &b).unwrap(), add_amounts(&b, &a).unwrap());
	}

	#[test]
	fn test_sub_sign_follows_operands(a in any::<u64>(), b in any::<u64>()) {
		let diff = sub_amounts(&a.to_string(), &b.to_string()).unwrap();

		prop_assert_eq!(is_negative_amount(&diff), b > a);
		prop_assert_eq!(is_zero_amount(&diff), a == b);
		prop_assert_eq!(diff, (a as i128 - b as i128).to_string());
	}

	#[test]
	fn test_parse_matches_decimal_text(a in amount_strategy()) {
		prop_assert_eq!(parse_amount(&a).unwrap().to_string(), a);
	}

	#[test]
	fn test_sub_then_add_restores_uint256(a in uint256_strategy(), b in uint256_strategy()) {
		prop_assert_eq!(parse_amount(&a).unwrap().to_string(), a.clone());
		let diff = sub_amounts(&a, &b).unwrap();
		prop_assert_eq!(add_amounts(&diff, &b).unwrap(), a);
	}

	// Empty strings count as zero on both sides
	#[test]
	fn test_empty_amount_is_neutral(a in amount_strategy()) {
		prop_assert_eq!(add_amounts("", &a).unwrap(), a.clone());
		prop_assert_eq!(sub_amounts(&a, "").unwrap(), a);
	}

	#[test]
	fn test_non_numeric_amounts_are_rejected(
		a in amount_strategy(),
		garbage in "[a-z]{1,5}"
	) {
		prop_assert!(add_amounts(&a, &garbage).is_err());
		let tainted = format!("{}{}", a, garbage);
		prop_assert!(sub_amounts(&tainted, "1").is_err());
	}
}
