use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Triage state of a contact form message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactStatus {
    New,
    Read,
    Replied,
    Archived,
}

impl AsRef<str> for ContactStatus {
    fn as_ref(&self) -> &str {
        match self {
            Self::New => "new",
            Self::Read => "read",
            Self::Replied => "replied",
            Self::Archived => "archived",
        }
    }
}

impl FromStr for ContactStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "new" => Ok(Self::New),
            "read" => Ok(Self::Read),
            "replied" => Ok(Self::Replied),
            "archived" => Ok(Self::Archived),
            other => Err(format!("{} is not a contact status", other)),
        }
    }
}

impl TryFrom<String> for ContactStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Sales state of a catering inquiry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InquiryStatus {
    New,
    Contacted,
    Quoted,
    Booked,
    Declined,
}

impl AsRef<str> for InquiryStatus {
    fn as_ref(&self) -> &str {
        match self {
            Self::New => "new",
            Self::Contacted => "contacted",
            Self::Quoted => "quoted",
            Self::Booked => "booked",
            Self::Declined => "declined",
        }
    }
}

impl FromStr for InquiryStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "new" => Ok(Self::New),
            "contacted" => Ok(Self::Contacted),
            "quoted" => Ok(Self::Quoted),
            "booked" => Ok(Self::Booked),
            "declined" => Ok(Self::Declined),
            other => Err(format!("{} is not an inquiry status", other)),
        }
    }
}

impl TryFrom<String> for InquiryStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
