//! Text and buttons for everything the engine says to chat users.

use bloodlink_types::events::{Action, ActionButton};
use bloodlink_types::models::{BloodRequest, Donor, DonorId, RequestId, UserHandle};

use crate::location::LocationTier;

pub const DONATION_TERMS: &str = "\
DONATION CONSENT AND DATA SHARING

Before you commit to this donation, please confirm:

1. Your name and phone number will be shared with the requester for this donation only, \
and they may contact you directly.
2. By agreeing you commit to donate. If you can no longer make it, tell the requester promptly.
3. You confirm you are eligible to donate and will tell the hospital about any health \
condition that may affect the donation.
4. Your contact details may be used for follow-up about this donation.

Press \"I Agree\" to continue.";

pub const DECLINED: &str = "You have declined this blood donation request. Thank you for considering.\n\n\
You can still donate in the future if your availability changes.";

pub const TERMS_DECLINED: &str = "You have declined the donation terms. Your donation has been cancelled.\n\n\
Thank you for considering. You can always accept other requests in the future.";

pub const ASK_NAME: &str =
    "Thank you for agreeing to donate! Before we connect you with the requester, please send your full name:";

pub const ASK_NAME_AGAIN: &str = "Please send your full name so the requester knows who you are:";

pub const ASK_PHONE: &str = "Please send your phone number so the requester can contact you:";

pub const ASK_PHONE_AGAIN: &str = "Please send a phone number the requester can reach you on:";

pub const FINISH_TERMS_FIRST: &str =
    "Please agree to or decline the donation terms above first, or send /cancel.";

pub const CANCELLED: &str = "Donation acceptance cancelled. Nothing was recorded.";

pub const NOTHING_TO_CANCEL: &str = "There is no donation in progress to cancel.";

pub const ALREADY_MATCHED: &str = "Thank you! This request has already been matched with another donor, \
so no further donors are needed right now.";

pub const ALREADY_COMMITTED: &str = "You have already committed to this donation request. \
The requester has your details, so there is nothing more to do here.";

pub const RECENT_REQUESTS_HEADER: &str =
    "RECENT BLOOD REQUESTS MATCHING YOUR PROFILE\n\nHere are recent blood requests you can help with:";

pub const NO_RECENT_REQUESTS: &str = "No recent blood requests match your profile at the moment.\n\
You will be notified when someone needs your help!";

pub const SUPPORT_PROMPT: &str = "SUGGESTION & SUPPORT BOX\n\n\
Tell us about your donation experience, report a problem, or suggest an improvement. \
Type your message now, or send /cancel.";

pub const SUPPORT_PROMPT_AGAIN: &str = "Please type the message you want to send to the administrator, or send /cancel.";

pub const SUPPORT_SENT: &str = "Thank you! Your message has been sent to the administrator. \
You will get a reply here if one is needed.";

pub const SUPPORT_DISCARDED: &str = "Your message was not sent.";

pub fn support_actions() -> Vec<ActionButton> {
    vec![
        ActionButton::new("Yes, Send it", Action::SendSupport),
        ActionButton::new("No, Cancel", Action::DiscardSupport),
    ]
}

/// Shown before a support message is sent.
pub fn support_preview(message: &str) -> String {
    format!("Please review your message:\n\n{}\n\nSend it to the administrator?", message)
}

pub fn support_notice(id: i64, user: UserHandle, user_name: &str, message: &str) -> String {
    let from = if user_name.is_empty() {
        user.to_string()
    } else {
        format!("{} ({})", user_name, user)
    };
    format!(
        "NEW SUGGESTION/SUPPORT REQUEST #{}\n\nFrom: {}\n\n{}\n\nReply through the support inbox.",
        id, from, message
    )
}

pub fn admin_reply(message: &str) -> String {
    format!(
        "REPLY FROM ADMINISTRATOR\n\n{}\n\nIf you need further assistance, press Contact Support.",
        message
    )
}

pub fn reply_actions() -> Vec<ActionButton> {
    vec![ActionButton::new("Contact Support", Action::OpenSupport)]
}

/// Attached to the commit notices so either party can report back.
pub fn feedback_actions(label: &str) -> Vec<ActionButton> {
    vec![ActionButton::new(label, Action::OpenSupport)]
}

pub fn offer_actions(request_id: RequestId, donor_id: DonorId) -> Vec<ActionButton> {
    vec![
        ActionButton::new("I Can Donate", Action::Accept { request_id, donor_id }),
        ActionButton::new("Not Available", Action::Decline { request_id, donor_id }),
    ]
}

pub fn terms_actions() -> Vec<ActionButton> {
    vec![
        ActionButton::new("I Agree", Action::AgreeTerms),
        ActionButton::new("I Decline", Action::DeclineTerms),
        ActionButton::new("Cancel", Action::Cancel),
    ]
}

/// The offer sent to a candidate donor. Carries no patient name and no
/// contact phone; those are revealed only after a commit.
pub fn offer(request: &BloodRequest, donor: &Donor, tier: LocationTier) -> String {
    let mut text = format!(
        "Blood Donation Request\n\n\
         A patient needs {} blood\n\
         Hospital: {}\n\
         Location: {}\n\
         Urgency: {}\n\n\
         You are receiving this because your blood group ({}) is compatible.",
        request.blood_group,
        request.hospital_name,
        location(request),
        request.urgency,
        donor.blood_type,
    );
    if let Some(hint) = tier.hint() {
        text.push_str(&format!("\n\nMatch: {}", hint));
    }
    text
}

/// A request offered right after registration.
pub fn recent_request(request: &BloodRequest, tier: LocationTier) -> String {
    let mut text = format!(
        "BLOOD NEEDED: {}\n\n\
         Hospital: {}\n\
         Location: {}\n\
         Urgency: {}\n\
         Posted: {}",
        request.blood_group,
        request.hospital_name,
        location(request),
        request.urgency,
        request.created_at.format("%Y-%m-%d %H:%M"),
    );
    if let Some(hint) = tier.hint() {
        text.push_str(&format!("\n\nMatch: {}", hint));
    }
    text
}

/// Full request detail for a donor who has just committed.
pub fn donor_committed(request: &BloodRequest, requester_handle: Option<&str>) -> String {
    let mut text = format!(
        "Thank you for accepting this donation request!\n\n\
         Patient Details:\n\
         Name: {}\n\
         Age: {}\n\
         Blood Group: {}\n\
         Hospital: {}\n\
         Address: {}\n\
         Contact: {}\n\n",
        request.patient_name,
        request.patient_age,
        request.blood_group,
        request.hospital_name,
        request.hospital_address,
        request.phone,
    );
    match requester_handle {
        Some(handle) => text.push_str(&format!("You can contact the requester directly: @{}", handle)),
        None => text.push_str("Please contact them using the phone number above."),
    }
    text
}

/// Donor detail for the requester once a donor has committed.
pub fn requester_notice(donor: &Donor, donor_handle: Option<&str>) -> String {
    let mut text = format!(
        "Good news! A donor has accepted your blood request.\n\n\
         Donor Details:\n\
         Name: {}\n\
         Blood Group: {}\n\
         Contact: {}\n\n",
        donor.name, donor.blood_type, donor.phone,
    );
    match donor_handle {
        Some(handle) => text.push_str(&format!("You can contact the donor directly: @{}", handle)),
        None => text.push_str("Please contact the donor using the phone number above."),
    }
    text
}

pub struct AdminSummary<'a> {
    pub donor: &'a Donor,
    pub donor_handle: Option<&'a str>,
    pub request: &'a BloodRequest,
    pub requester_handle: Option<&'a str>,
    pub total_operations: u32,
}

pub fn admin_summary(s: &AdminSummary<'_>) -> String {
    let handle = |h: Option<&str>| h.map_or_else(|| "Not available".to_string(), |h| format!("@{}", h));
    format!(
        "SUCCESSFUL DONATION OPERATION #{total}\n\n\
         DONOR\n\
         ID: {}\nName: {}\nAge: {}\nGender: {}\nBlood Group: {}\nPhone: {}\n\
         Location: {}, {}, {}\nHandle: {}\n\n\
         RECIPIENT\n\
         ID: {}\nPatient: {}\nAge: {}\nBlood Group: {}\nHospital: {}\nAddress: {}\n\
         Urgency: {}\nPhone: {}\nHandle: {}\n\n\
         Total successful operations to date: {total}",
        s.donor.id,
        s.donor.name,
        s.donor.age,
        s.donor.gender,
        s.donor.blood_type,
        s.donor.phone,
        s.donor.area,
        s.donor.district,
        s.donor.division,
        handle(s.donor_handle),
        s.request.id,
        s.request.patient_name,
        s.request.patient_age,
        s.request.blood_group,
        s.request.hospital_name,
        s.request.hospital_address,
        s.request.urgency,
        s.request.phone,
        handle(s.requester_handle),
        total = s.total_operations,
    )
}

fn location(request: &BloodRequest) -> String {
    [&request.area, &request.district, &request.division]
        .into_iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloodlink_types::BloodType;
    use bloodlink_types::models::{RequestStatus, UserHandle, Urgency};

    fn request() -> BloodRequest {
        BloodRequest {
            id: RequestId(4),
            requester: UserHandle(1),
            patient_name: "Ayesha Khan".into(),
            patient_age: "31".into(),
            hospital_name: "Square Hospital".into(),
            hospital_address: "Panthapath".into(),
            area: "".into(),
            district: "dhaka".into(),
            division: "dhaka".into(),
            urgency: Urgency::Urgent,
            phone: "01911222333".into(),
            blood_group: "B+".into(),
            status: RequestStatus::Active,
            created_at: Default::default(),
        }
    }

    fn donor() -> Donor {
        Donor {
            id: DonorId(9),
            user: UserHandle(2),
            name: "Rahim".into(),
            age: "28".into(),
            phone: "01811000000".into(),
            gender: "Male".into(),
            blood_type: BloodType::ONeg,
            division: "dhaka".into(),
            district: "dhaka".into(),
            area: "mirpur".into(),
            is_restricted: false,
            registered_at: Default::default(),
        }
    }

    #[test]
    fn offer_hides_patient_and_contact() {
        let text = offer(&request(), &donor(), LocationTier::Exact);
        assert!(!text.contains("Ayesha"));
        assert!(!text.contains("01911222333"));
        assert!(text.contains("B+"));
        assert!(text.contains("Urgent"));
        assert!(text.contains("O-"));
        assert!(text.contains("exact match (same district)"));
        assert!(text.contains("dhaka, dhaka"));
    }

    #[test]
    fn offer_without_locality_has_no_hint() {
        let text = offer(&request(), &donor(), LocationTier::None);
        assert!(!text.contains("same division"));
        assert!(!text.contains("exact match"));
    }

    #[test]
    fn offer_buttons_carry_the_pair() {
        let actions = offer_actions(RequestId(4), DonorId(9));
        let wire: Vec<&str> = actions.iter().map(|a| a.action_id.as_str()).collect();
        assert_eq!(wire, vec!["accept:4:9", "decline:4:9"]);
    }

    #[test]
    fn contact_falls_back_to_phone_without_handle() {
        let text = donor_committed(&request(), None);
        assert!(text.contains("01911222333"));
        assert!(text.contains("Ayesha Khan"));
        assert!(!text.contains('@'));

        let text = requester_notice(&donor(), Some("rahim"));
        assert!(text.contains("@rahim"));
        assert!(text.contains("01811000000"));
    }

    #[test]
    fn admin_summary_carries_running_total() {
        let (d, r) = (donor(), request());
        let text = admin_summary(&AdminSummary {
            donor: &d,
            donor_handle: None,
            request: &r,
            requester_handle: Some("ayesha"),
            total_operations: 12,
        });
        assert!(text.starts_with("SUCCESSFUL DONATION OPERATION #12"));
        assert!(text.contains("Total successful operations to date: 12"));
        assert!(text.contains("Handle: Not available"));
        assert!(text.contains("@ayesha"));
    }
}
