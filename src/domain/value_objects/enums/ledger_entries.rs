use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LedgerEntryType {
    Credit,
    Debit,
}

impl LedgerEntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerEntryType::Credit => "credit",
            LedgerEntryType::Debit => "debit",
        }
    }
}

impl Display for LedgerEntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LedgerCategory {
    Donation,
    Subscription,
}

impl LedgerCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerCategory::Donation => "donation",
            LedgerCategory::Subscription => "subscription",
        }
    }
}

impl Display for LedgerCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference kinds a ledger entry can be deduplicated against.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LedgerRefType {
    Donation,
    Invoice,
}

impl LedgerRefType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerRefType::Donation => "donation",
            LedgerRefType::Invoice => "invoice",
        }
    }
}

impl Display for LedgerRefType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
