use bloodlink_types::models::normalize_location;

/// How close a donor is to a request. Variants are declared nearest first,
/// so ordering by tier orders by proximity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LocationTier {
    /// Same division and district
    Exact,
    /// Same division, different district
    Division,
    None,
}

impl LocationTier {
    /// Classify a (division, district) pair against a request's. Inputs are
    /// compared in normalized form.
    pub fn classify(
        donor_division: &str,
        donor_district: &str,
        request_division: &str,
        request_district: &str,
    ) -> Self {
        if normalize_location(donor_division) != normalize_location(request_division) {
            return Self::None;
        }
        if normalize_location(donor_district) == normalize_location(request_district) {
            Self::Exact
        } else {
            Self::Division
        }
    }

    /// Locality line shown in offers.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Exact => Some("exact match (same district)"),
            Self::Division => Some("same division"),
            Self::None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_three_tiers() {
        assert_eq!(LocationTier::classify("Dhaka", "Dhaka", "dhaka", " DHAKA "), LocationTier::Exact);
        assert_eq!(
            LocationTier::classify("dhaka", "gazipur", "dhaka", "dhaka"),
            LocationTier::Division
        );
        assert_eq!(LocationTier::classify("sylhet", "dhaka", "dhaka", "dhaka"), LocationTier::None);
    }

    #[test]
    fn same_district_name_in_other_division_is_not_a_match() {
        assert_eq!(
            LocationTier::classify("khulna", "sadar", "barisal", "sadar"),
            LocationTier::None
        );
    }

    #[test]
    fn tiers_order_by_proximity() {
        assert!(LocationTier::Exact < LocationTier::Division);
        assert!(LocationTier::Division < LocationTier::None);
        assert_eq!(LocationTier::None.hint(), None);
    }
}
