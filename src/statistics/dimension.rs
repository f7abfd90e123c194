//! Dimension grouping.
//!
//! A dimension is the axis a breakdown is grouped on. Profiles map records
//! one to one; designers and vendors fan a single record out to every
//! name it lists.

use super::sort::compare_names;
use super::ParseError;
use crate::store::Keyset;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A grouping axis for breakdown views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Profile,
    Designer,
    Vendor,
}

impl Dimension {
    /// Every dimension, in output order.
    pub const ALL: [Dimension; 3] = [Dimension::Profile, Dimension::Designer, Dimension::Vendor];

    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Profile => "profile",
            Dimension::Designer => "designer",
            Dimension::Vendor => "vendor",
        }
    }

    /// Whether one record can belong to several groups.
    pub fn is_multi_valued(self) -> bool {
        !matches!(self, Dimension::Profile)
    }

    /// Names of the groups `keyset` belongs to.
    ///
    /// Names are trimmed, empty names are dropped and a name listed twice
    /// on the same record is returned once.
    pub fn extract(self, keyset: &Keyset) -> Vec<&str> {
        let raw: Vec<&str> = match self {
            Dimension::Profile => vec![keyset.profile.as_str()],
            Dimension::Designer => keyset.designer.iter().map(String::as_str).collect(),
            Dimension::Vendor => keyset.vendors.iter().map(|v| v.name.as_str()).collect(),
        };

        let mut names: Vec<&str> = Vec::with_capacity(raw.len());
        for name in raw.into_iter().map(str::trim) {
            if !name.is_empty() && !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "profile" => Ok(Dimension::Profile),
            "designer" => Ok(Dimension::Designer),
            "vendor" | "vendors" => Ok(Dimension::Vendor),
            _ => Err(ParseError::new("dimension", s)),
        }
    }
}

/// The records belonging to one dimension value.
#[derive(Debug, Clone)]
pub struct Group<'a> {
    pub name: String,
    pub members: Vec<&'a Keyset>,
}

impl Group<'_> {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Groups `records` on `dimension`, sorted case-insensitively by name.
pub fn group_by<'a, I>(records: I, dimension: Dimension) -> Vec<Group<'a>>
where
    I: IntoIterator<Item = &'a Keyset>,
{
    let mut groups: BTreeMap<&'a str, Vec<&'a Keyset>> = BTreeMap::new();

    for keyset in records {
        for name in dimension.extract(keyset) {
            groups.entry(name).or_default().push(keyset);
        }
    }

    let mut out: Vec<Group<'a>> = groups
        .into_iter()
        .map(|(name, members)| Group {
            name: name.to_string(),
            members,
        })
        .collect();
    out.sort_by(|a, b| compare_names(&a.name, &b.name));
    out
}

/// Distinct names for `dimension` across `records`, in default order.
pub fn group_names(records: &[Keyset], dimension: Dimension) -> Vec<String> {
    group_by(records, dimension)
        .into_iter()
        .map(|group| group.name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Vendor;

    fn keyset(profile: &str, designers: &[&str], vendors: &[&str]) -> Keyset {
        let mut keyset = Keyset::new(profile, profile, "Test");
        keyset.designer = designers.iter().map(|d| d.to_string()).collect();
        keyset.vendors = vendors
            .iter()
            .map(|name| Vendor {
                name: name.to_string(),
                ..Default::default()
            })
            .collect();
        keyset
    }

    #[test]
    fn test_profile_groups_are_one_to_one() {
        let records = vec![
            keyset("SA", &["a"], &[]),
            keyset("Cherry", &["b"], &[]),
            keyset("SA", &["c"], &[]),
        ];

        let groups = group_by(&records, Dimension::Profile);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "Cherry");
        assert_eq!(groups[1].name, "SA");
        assert_eq!(groups[1].len(), 2);
    }

    #[test]
    fn test_designer_fan_out() {
        let records = vec![
            keyset("SA", &["Alice", "bob"], &[]),
            keyset("GMK", &["Bob"], &[]),
            keyset("KAT", &["alice"], &[]),
        ];

        let groups = group_by(&records, Dimension::Designer);
        let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();

        // case-insensitive order, distinct spellings kept apart
        assert_eq!(names, vec!["Alice", "alice", "Bob", "bob"]);
        let members: usize = groups.iter().map(Group::len).sum();
        assert_eq!(members, 4);
    }

    #[test]
    fn test_vendor_names_deduplicated_per_record() {
        let records = vec![keyset("SA", &[], &["NovelKeys", "NovelKeys ", ""])];

        let groups = group_by(&records, Dimension::Vendor);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "NovelKeys");
        assert_eq!(groups[0].len(), 1);
    }

    #[test]
    fn test_group_names_empty_input() {
        assert!(group_names(&[], Dimension::Designer).is_empty());
    }

    #[test]
    fn test_dimension_from_str() {
        assert_eq!("Vendor".parse::<Dimension>().unwrap(), Dimension::Vendor);
        assert_eq!("profile".parse::<Dimension>().unwrap(), Dimension::Profile);
        assert!("colorway".parse::<Dimension>().is_err());
    }
}
