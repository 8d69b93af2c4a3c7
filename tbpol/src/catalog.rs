// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 Tbpol Authors

//! Built-in policy templates.
//!
//! The catalog holds the fixed set of named, immutable policies this tool
//! can emit. Templates are constructed once at first use and never mutated.

use crate::algorithms::HashAlgorithm;
use crate::policy::{
    HashType, Policy, PolicyEntry, PolicyType, MODULE_NUM_ANY, PCR_NONE,
    POLCTL_EXTEND_PCR17, POLICY_VERSION,
};
use std::sync::OnceLock;

static DEFAULT: OnceLock<Policy> = OnceLock::new();
static DEFAULT_DETAILED_AUTHORITY: OnceLock<Policy> = OnceLock::new();
static LEGACY_REFERENCE: OnceLock<Policy> = OnceLock::new();

/// Names of all built-in templates, in catalog order.
pub const TEMPLATE_NAMES: [&str; 3] = [
    "default",
    "default-detailed-authority",
    "legacy-reference",
];

fn two_entry_policy(policy_type: PolicyType, other_pcr: u8) -> Policy {
    Policy {
        version: POLICY_VERSION,
        policy_type,
        hash_algorithm: HashAlgorithm::Sha1,
        control_flags: POLCTL_EXTEND_PCR17,
        entries: vec![
            // module 0 is extended by the launch environment itself, so
            // don't re-extend it
            PolicyEntry {
                module_number: 0,
                pcr: PCR_NONE,
                hash_type: HashType::Any,
                hashes: Vec::new(),
            },
            // all other modules
            PolicyEntry {
                module_number: MODULE_NUM_ANY,
                pcr: other_pcr,
                hash_type: HashType::Any,
                hashes: Vec::new(),
            },
        ],
    }
}

fn default_policy() -> &'static Policy {
    DEFAULT.get_or_init(|| {
        two_entry_policy(PolicyType::ContinueOnNonFatal, 19)
    })
}

/// Details/Authorities PCR mapping: everything goes to PCR 17.
fn detailed_authority_policy() -> &'static Policy {
    DEFAULT_DETAILED_AUTHORITY.get_or_init(|| {
        two_entry_policy(PolicyType::ContinueOnNonFatal, 17)
    })
}

/// Historical reference policy, not reachable from the command line.
fn legacy_reference_policy() -> &'static Policy {
    LEGACY_REFERENCE
        .get_or_init(|| two_entry_policy(PolicyType::HaltOnAnyError, 19))
}

/// Returns the template selected by the Details/Authorities flag.
pub fn select(detailed_authority: bool) -> &'static Policy {
    if detailed_authority {
        detailed_authority_policy()
    } else {
        default_policy()
    }
}

/// Looks up a template by name.
pub fn template(name: &str) -> Option<&'static Policy> {
    match name {
        "default" => Some(default_policy()),
        "default-detailed-authority" => Some(detailed_authority_policy()),
        "legacy-reference" => Some(legacy_reference_policy()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::policy::{ENTRY_HEADER_LEN, POLICY_HEADER_LEN};

    #[test]
    fn test_select_default() {
        let policy = select(false);
        assert_eq!(policy.policy_type, PolicyType::ContinueOnNonFatal);
        assert_eq!(policy.entries.len(), 2);
        assert_eq!(policy.entries[0].module_number, 0);
        assert_eq!(policy.entries[0].pcr, PCR_NONE);
        assert_eq!(policy.entries[1].module_number, MODULE_NUM_ANY);
        assert_eq!(policy.entries[1].pcr, 19);
    }

    #[test]
    fn test_select_detailed_authority() {
        let policy = select(true);
        assert_eq!(policy.policy_type, PolicyType::ContinueOnNonFatal);
        assert_eq!(policy.entries[1].pcr, 17);
    }

    #[test]
    fn test_legacy_reference_unselectable_but_present() {
        let policy = template("legacy-reference").unwrap();
        assert_eq!(policy.policy_type, PolicyType::HaltOnAnyError);
        assert_eq!(policy.entries[1].pcr, 19);
        // the selection flag can never reach it
        assert_ne!(select(false).policy_type, PolicyType::HaltOnAnyError);
        assert_ne!(select(true).policy_type, PolicyType::HaltOnAnyError);
    }

    #[test]
    fn test_unknown_template() {
        assert!(template("no-such-template").is_none());
    }

    #[test]
    fn test_every_listed_name_resolves() {
        for name in TEMPLATE_NAMES {
            assert!(
                template(name).is_some(),
                "template {name} is listed but does not resolve"
            );
        }
    }

    #[test]
    fn test_all_templates_share_invariants() {
        for name in TEMPLATE_NAMES {
            let policy = template(name).unwrap();
            assert_eq!(policy.version, POLICY_VERSION);
            assert_eq!(policy.hash_algorithm, HashAlgorithm::Sha1);
            assert_eq!(policy.control_flags, POLCTL_EXTEND_PCR17);
            assert_eq!(
                policy.encoded_len(),
                POLICY_HEADER_LEN + 2 * ENTRY_HEADER_LEN,
                "template {name} has an unexpected size"
            );
            for entry in &policy.entries {
                assert_eq!(entry.hash_type, HashType::Any);
                assert!(entry.hashes.is_empty());
            }
        }
    }
}
