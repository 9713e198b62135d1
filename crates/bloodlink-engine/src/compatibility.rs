//! ABO/Rh transfusion compatibility, as two literal lookup tables.

use bloodlink_types::BloodType;
use bloodlink_types::BloodType::*;

/// Donor types that may give to a patient of `recipient` type.
pub fn compatible_donor_types(recipient: BloodType) -> &'static [BloodType] {
    match recipient {
        ONeg => &[ONeg],
        OPos => &[OPos, ONeg],
        ANeg => &[ANeg, ONeg],
        APos => &[APos, ANeg, OPos, ONeg],
        BNeg => &[BNeg, ONeg],
        BPos => &[BPos, BNeg, OPos, ONeg],
        AbNeg => &[ANeg, BNeg, AbNeg, ONeg],
        AbPos => &[ONeg, OPos, ANeg, APos, BNeg, BPos, AbNeg, AbPos],
    }
}

/// Patient types a donor of `donor` type may give to.
pub fn compatible_recipient_types(donor: BloodType) -> &'static [BloodType] {
    match donor {
        ONeg => &[ONeg, OPos, ANeg, APos, BNeg, BPos, AbNeg, AbPos],
        OPos => &[OPos, APos, BPos, AbPos],
        ANeg => &[ANeg, APos, AbNeg, AbPos],
        APos => &[APos, AbPos],
        BNeg => &[BNeg, BPos, AbNeg, AbPos],
        BPos => &[BPos, AbPos],
        AbNeg => &[AbNeg, AbPos],
        AbPos => &[AbPos],
    }
}

/// Donor types for a request's free-text blood group. Unparseable groups
/// match nobody.
pub fn donor_types_for(blood_group: &str) -> &'static [BloodType] {
    match blood_group.parse::<BloodType>() {
        Ok(recipient) => compatible_donor_types(recipient),
        Err(_) => &[],
    }
}

pub fn can_donate(donor: BloodType, recipient: BloodType) -> bool {
    compatible_donor_types(recipient).contains(&donor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn universal_donor_and_recipient() {
        for recipient in BloodType::ALL {
            assert!(compatible_donor_types(recipient).contains(&ONeg));
        }
        assert_eq!(compatible_donor_types(AbPos).len(), 8);
        assert_eq!(compatible_recipient_types(ONeg).len(), 8);
        assert_eq!(compatible_recipient_types(AbPos), &[AbPos]);
    }

    #[test]
    fn tables_agree_in_both_directions() {
        for donor in BloodType::ALL {
            for recipient in BloodType::ALL {
                assert_eq!(
                    compatible_donor_types(recipient).contains(&donor),
                    compatible_recipient_types(donor).contains(&recipient),
                    "{} -> {}",
                    donor,
                    recipient
                );
            }
        }
    }

    #[test]
    fn no_duplicates_in_either_table() {
        for t in BloodType::ALL {
            for set in [compatible_donor_types(t), compatible_recipient_types(t)] {
                let mut seen = set.to_vec();
                seen.sort();
                seen.dedup();
                assert_eq!(seen.len(), set.len());
            }
        }
    }

    #[test]
    fn a_positive_takes_four_types() {
        assert_eq!(compatible_donor_types(APos), &[APos, ANeg, OPos, ONeg]);
        assert!(!can_donate(BPos, APos));
        assert!(can_donate(ONeg, APos));
    }

    #[test]
    fn unknown_groups_match_nobody() {
        assert!(donor_types_for("C+").is_empty());
        assert!(donor_types_for("").is_empty());
        assert_eq!(donor_types_for(" ab+ ").len(), 8);
    }
}
