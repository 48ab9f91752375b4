//! Coded value lists referenced by tube and cable attributes

use crate::{NetworkError, Result};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Code every list starts with, for attributes whose value was never surveyed
pub const UNKNOWN_CODE: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ValueListKind {
    /// Operating status of tubes and cables
    Status,
    /// Protection type of a tube
    TubeCableProtection,
    /// Voltage class of a cable
    CableTension,
}

impl ValueListKind {
    pub const ALL: [ValueListKind; 3] = [
        ValueListKind::Status,
        ValueListKind::TubeCableProtection,
        ValueListKind::CableTension,
    ];

    fn name(&self) -> &'static str {
        match self {
            ValueListKind::Status => "StatusType",
            ValueListKind::TubeCableProtection => "TubeCableProtectionType",
            ValueListKind::CableTension => "CableTensionType",
        }
    }
}

impl fmt::Display for ValueListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ValueListEntry {
    pub code: u32,
    pub name: String,
    /// Display position
    pub index: Option<u32>,
    pub is_active: bool,
}

impl ValueListEntry {
    pub fn new(code: u32, name: impl Into<String>) -> Self {
        Self {
            code,
            name: name.into(),
            index: None,
            is_active: true,
        }
    }
}

/// All value lists, keyed by code
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ValueLists {
    lists: BTreeMap<ValueListKind, BTreeMap<u32, ValueListEntry>>,
}

impl Default for ValueLists {
    /// Every list with only the unknown entry
    fn default() -> Self {
        let mut lists = Self::empty();
        for kind in ValueListKind::ALL {
            lists.insert(kind, ValueListEntry::new(UNKNOWN_CODE, "unknown"));
        }
        lists
    }
}

impl ValueLists {
    pub fn empty() -> Self {
        Self {
            lists: BTreeMap::new(),
        }
    }

    /// Add or replace an entry
    pub fn insert(&mut self, kind: ValueListKind, entry: ValueListEntry) {
        self.lists.entry(kind).or_default().insert(entry.code, entry);
    }

    pub fn get(&self, kind: ValueListKind, code: u32) -> Option<&ValueListEntry> {
        self.lists.get(&kind).and_then(|list| list.get(&code))
    }

    pub fn contains(&self, kind: ValueListKind, code: u32) -> bool {
        self.get(kind, code).is_some()
    }

    /// Entries of one list, active ones first, then by display position and code
    pub fn entries(&self, kind: ValueListKind) -> Vec<&ValueListEntry> {
        let mut entries: Vec<&ValueListEntry> = self
            .lists
            .get(&kind)
            .map(|list| list.values().collect())
            .unwrap_or_default();
        entries.sort_by_key(|e| (!e.is_active, e.index.unwrap_or(u32::MAX), e.code));
        entries
    }

    /// Fail unless `code` (when set) is a known entry of `kind`
    pub fn check(&self, kind: ValueListKind, code: Option<u32>) -> Result<()> {
        match code {
            Some(code) if !self.contains(kind, code) => Err(NetworkError::Referential {
                kind: kind.name(),
                id: code.to_string(),
            }),
            _ => Ok(()),
        }
    }
}
