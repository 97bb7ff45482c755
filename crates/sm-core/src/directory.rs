//! Approved-destination directory.
//!
//! The directory lists, per channel, the destinations a nurse is allowed to
//! send patient information to. Assignments draw their expected targets from
//! it, and nurses look values up in it when completing a task.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Medium an assignment instructs a nurse to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    Fax,
    Email,
    Transfer,
    Courier,
    SecureMessage,
}

impl ChannelType {
    /// All channels, in display order.
    pub const ALL: [ChannelType; 5] = [
        ChannelType::Fax,
        ChannelType::Email,
        ChannelType::Transfer,
        ChannelType::Courier,
        ChannelType::SecureMessage,
    ];

    /// Stable database representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            ChannelType::Fax => "fax",
            ChannelType::Email => "email",
            ChannelType::Transfer => "transfer",
            ChannelType::Courier => "courier",
            ChannelType::SecureMessage => "secure_message",
        }
    }

    /// Verb phrase used when describing a task on this channel.
    pub fn action_phrase(&self) -> &'static str {
        match self {
            ChannelType::Fax => "Fax patient records to",
            ChannelType::Email => "Email patient summary to",
            ChannelType::Transfer => "Transfer patient to",
            ChannelType::Courier => "Send records via courier to",
            ChannelType::SecureMessage => "Send secure message to",
        }
    }

    /// HIPAA section governing disclosures over this channel.
    pub fn compliance_reference(&self) -> &'static str {
        match self {
            ChannelType::Fax | ChannelType::Email | ChannelType::SecureMessage => "164.312(e)(1)",
            ChannelType::Transfer => "164.310(a)(2)(iii)",
            ChannelType::Courier => "164.310(d)(1)",
        }
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelType::Fax => write!(f, "Fax"),
            ChannelType::Email => write!(f, "Email"),
            ChannelType::Transfer => write!(f, "Transfer"),
            ChannelType::Courier => write!(f, "Courier"),
            ChannelType::SecureMessage => write!(f, "Secure Message"),
        }
    }
}

impl FromStr for ChannelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "fax" => Ok(ChannelType::Fax),
            "email" => Ok(ChannelType::Email),
            "transfer" => Ok(ChannelType::Transfer),
            "courier" => Ok(ChannelType::Courier),
            "secure_message" | "secure_msg" => Ok(ChannelType::SecureMessage),
            _ => Err(format!("Unknown channel type: {}", s)),
        }
    }
}

/// An approved destination for one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub id: Uuid,
    pub channel: ChannelType,
    /// Human-readable name shown in task descriptions.
    pub display_name: String,
    /// Channel-specific value a nurse must submit (fax number, address, code).
    pub target_value: String,
    pub department: String,
    pub notes: String,
}

impl DirectoryEntry {
    pub fn new(
        channel: ChannelType,
        display_name: impl Into<String>,
        target_value: impl Into<String>,
        department: impl Into<String>,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel,
            display_name: display_name.into(),
            target_value: target_value.into(),
            department: department.into(),
            notes: notes.into(),
        }
    }
}

/// The standard directory: five approved destinations per channel.
pub fn default_directory() -> Vec<DirectoryEntry> {
    use ChannelType::*;

    #[rustfmt::skip]
    let rows: [(ChannelType, &str, &str, &str, &str); 25] = [
        (Fax, "St. Mary's Hospital - Radiology", "(555) 723-4400", "Radiology", "1200 Medical Center Dr, Building A, Floor 2"),
        (Fax, "City General - Cardiology Dept", "(555) 892-1155", "Cardiology", "450 Healthcare Plaza, Suite 300, Springfield, IL 62701"),
        (Fax, "SecureMed Billing Department", "(555) 234-2000", "Billing", "Internal - 789 Admin Blvd, Room 105"),
        (Fax, "Valley Orthopedics Center", "(555) 456-7890", "Orthopedics", "890 Medical Park Way, Building 3, Springfield, IL 62703"),
        (Fax, "Regional Laboratory Services", "(555) 334-8899", "Laboratory", "220 Science Blvd, Floor 1, Springfield, IL 62705"),
        (Email, "Medical Records Department", "records@securemed.internal", "Records", "Use encrypted email only - Internal system"),
        (Email, "Insurance Pre-Authorization", "preauth@securemed.internal", "Insurance", "For insurance claims and pre-auth requests"),
        (Email, "Lab Results Coordination", "labresults@securemed.internal", "Laboratory", "Secure portal for lab result transmission"),
        (Email, "Specialist Referrals", "referrals@securemed.internal", "Care Coordination", "For specialist consultation requests"),
        (Email, "Imaging Department", "imaging@securemed.internal", "Radiology", "CT, MRI, and X-ray report distribution"),
        (Transfer, "St. Mary's Hospital - Emergency", "2500 Medical Center Dr, Springfield, IL 62702", "Emergency", "ER Receiving - Use secure transfer line (555) 723-4911"),
        (Transfer, "Regional Medical Center - ICU", "3400 Healthcare Pkwy, Building C, Floor 4, Springfield, IL 62704", "Critical Care", "Contact Charge Nurse at (555) 445-7800 before transfer"),
        (Transfer, "Downtown Specialty Clinic", "125 Main Street, Suite 200, Springfield, IL 62701", "Specialists", "Referrals for Cardiology, Neurology, Oncology"),
        (Transfer, "Memorial Hospital - Surgical Unit", "5600 University Ave, Springfield, IL 62706", "Surgery", "Pre-surgical admissions - Call (555) 667-3200 ext. 401"),
        (Transfer, "Springfield Rehabilitation Center", "1880 Wellness Drive, Springfield, IL 62708", "Rehabilitation", "Physical therapy and post-acute care"),
        (Courier, "MedCourier Express", "Pickup: Building C Main Entrance, 789 Admin Blvd", "Logistics", "Scheduled pickups M-F 10am, 2pm, 5pm - Call (555) 768-2100"),
        (Courier, "SecureTransport Medical", "Drop-off: Loading Dock B, Rear of Building A", "Logistics", "HIPAA-compliant transport - Tracking # required"),
        (Courier, "QuickMed Delivery Service", "450 Healthcare Plaza, Central Receiving", "Logistics", "Same-day delivery within 5 miles - (555) 892-3344"),
        (Courier, "Priority Health Logistics", "789 Admin Blvd, Suite 100", "Logistics", "Overnight delivery available - Temperature controlled"),
        (Courier, "CareLink Transport Services", "Central Hub: 3200 Distribution Pkwy", "Logistics", "Multi-facility routing - Call (555) 445-9900 for scheduling"),
        (SecureMessage, "Dr. Sarah Chen - Internal Medicine", "SM-1847", "Internal Medicine", "Secure message via internal system - Patient consults"),
        (SecureMessage, "Pharmacy - Prescription Refills", "RX-4402", "Pharmacy", "Use for prescription renewals and clarifications"),
        (SecureMessage, "Care Coordination Team", "MSG-7733", "Care Management", "Discharge planning and follow-up coordination"),
        (SecureMessage, "Dr. Michael Roberts - Cardiology", "CARD-8821", "Cardiology", "Cardiac consultation and follow-up"),
        (SecureMessage, "Nurse Practitioner - Primary Care", "NP-5544", "Primary Care", "Routine follow-ups and medication management"),
    ];

    rows.into_iter()
        .map(|(channel, name, value, department, notes)| {
            DirectoryEntry::new(channel, name, value, department, notes)
        })
        .collect()
}
