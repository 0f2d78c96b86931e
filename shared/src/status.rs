use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} code: {code}")]
pub struct UnknownStatusCode {
    pub kind: &'static str,
    pub code: String,
}

/// Lifecycle status of a handling unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HuStatus {
    Planning,
    Active,
    Reserved,
    Picked,
    Issued,
    Shipped,
    Destroyed,
}

impl HuStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HuStatus::Planning => "planning",
            HuStatus::Active => "active",
            HuStatus::Reserved => "reserved",
            HuStatus::Picked => "picked",
            HuStatus::Issued => "issued",
            HuStatus::Shipped => "shipped",
            HuStatus::Destroyed => "destroyed",
        }
    }

    /// Whether an HU in this status still counts as physically present stock.
    pub fn is_active_flag(&self) -> bool {
        !matches!(self, HuStatus::Destroyed | HuStatus::Shipped | HuStatus::Issued)
    }
}

impl fmt::Display for HuStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HuStatus {
    type Err = UnknownStatusCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "planning" => Ok(HuStatus::Planning),
            "active" => Ok(HuStatus::Active),
            "reserved" => Ok(HuStatus::Reserved),
            "picked" => Ok(HuStatus::Picked),
            "issued" => Ok(HuStatus::Issued),
            "shipped" => Ok(HuStatus::Shipped),
            "destroyed" => Ok(HuStatus::Destroyed),
            other => Err(UnknownStatusCode {
                kind: "HU status",
                code: other.to_string(),
            }),
        }
    }
}

/// Document status, using the two-letter codes of the document engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DocStatus {
    #[serde(rename = "DR")]
    Drafted,
    #[serde(rename = "IP")]
    InProgress,
    #[serde(rename = "WP")]
    WaitingPayment,
    #[serde(rename = "WC")]
    WaitingConfirmation,
    #[serde(rename = "AP")]
    Approved,
    #[serde(rename = "NA")]
    NotApproved,
    #[serde(rename = "IN")]
    Invalid,
    #[serde(rename = "CO")]
    Completed,
    #[serde(rename = "CL")]
    Closed,
    #[serde(rename = "RE")]
    Reversed,
    #[serde(rename = "VO")]
    Voided,
    #[serde(rename = "??")]
    Unknown,
}

impl DocStatus {
    pub fn code(&self) -> &'static str {
        match self {
            DocStatus::Drafted => "DR",
            DocStatus::InProgress => "IP",
            DocStatus::WaitingPayment => "WP",
            DocStatus::WaitingConfirmation => "WC",
            DocStatus::Approved => "AP",
            DocStatus::NotApproved => "NA",
            DocStatus::Invalid => "IN",
            DocStatus::Completed => "CO",
            DocStatus::Closed => "CL",
            DocStatus::Reversed => "RE",
            DocStatus::Voided => "VO",
            DocStatus::Unknown => "??",
        }
    }
}

impl fmt::Display for DocStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
