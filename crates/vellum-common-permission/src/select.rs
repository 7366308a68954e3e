// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use vellum_common_transcript::{PermissionOption, PermissionOptionKind};

/// Picks the option an auto-approving session answers with.
///
/// Preference: allow once, allow always, any option whose name mentions
/// "allow", then the first option.
pub fn auto_select(options: &[PermissionOption]) -> Option<&PermissionOption> {
	let by_kind = |kind| options.iter().find(|o| o.kind == Some(kind));

	by_kind(PermissionOptionKind::AllowOnce)
		.or_else(|| by_kind(PermissionOptionKind::AllowAlways))
		.or_else(|| {
			options
				.iter()
				.find(|o| o.name.to_lowercase().contains("allow"))
		})
		.or_else(|| options.first())
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn opt(id: &str, name: &str, kind: Option<PermissionOptionKind>) -> PermissionOption {
		PermissionOption::new(id, name, kind)
	}

	#[test]
	fn test_prefers_allow_once() {
		let options = vec![
			opt("always", "Always", Some(PermissionOptionKind::AllowAlways)),
			opt("once", "Once", Some(PermissionOptionKind::AllowOnce)),
		];
		assert_eq!(auto_select(&options).map(|o| o.option_id.as_str()), Some("once"));
	}

	#[test]
	fn test_falls_back_to_allow_always() {
		let options = vec![
			opt("no", "Reject", Some(PermissionOptionKind::RejectOnce)),
			opt("always", "Always", Some(PermissionOptionKind::AllowAlways)),
		];
		assert_eq!(auto_select(&options).map(|o| o.option_id.as_str()), Some("always"));
	}

	#[test]
	fn test_falls_back_to_name_match() {
		let options = vec![
			opt("x", "Skip", None),
			opt("y", "Please ALLOW this", None),
		];
		assert_eq!(auto_select(&options).map(|o| o.option_id.as_str()), Some("y"));
	}

	#[test]
	fn test_falls_back_to_first() {
		let options = vec![opt("x", "Skip", None), opt("y", "Deny", None)];
		assert_eq!(auto_select(&options).map(|o| o.option_id.as_str()), Some("x"));
		assert!(auto_select(&[]).is_none());
	}

	proptest! {
			/// **Property: Auto selection always returns one of the offered options**
			#[test]
			fn test_auto_select_is_member(names in prop::collection::vec("[A-Za-z ]{0,10}", 1..8)) {
					let options: Vec<_> = names
							.iter()
							.enumerate()
							.map(|(i, n)| opt(&i.to_string(), n, None))
							.collect();
					let picked = auto_select(&options).expect("non-empty");
					prop_assert!(options.contains(picked));
			}
	}
}
