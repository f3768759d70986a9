//! Text hierarchy descriptor
//!
//! A manuscript contains text fragments, a fragment contains lines, a line
//! contains signs. Every unit above the sign is delimited inside the sign
//! stream by a pair of terminator signs whose interpretation carries a
//! sentinel attribute value. Callers use [`unit_bounds`] to find those
//! terminators before handing anchors to the planner.

use crate::repository::HierarchyRepository;
use crate::schema::StreamType;
use crate::types::{EditionId, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Level of the manuscript hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextUnit {
    Manuscript,
    TextFragment,
    Line,
    Sign,
}

impl TextUnit {
    /// Outermost first
    pub const ALL: [TextUnit; 4] = [
        TextUnit::Manuscript,
        TextUnit::TextFragment,
        TextUnit::Line,
        TextUnit::Sign,
    ];

    /// Table holding this unit's rows
    #[must_use]
    pub fn table(self) -> &'static str {
        match self {
            TextUnit::Manuscript => "manuscript_data",
            TextUnit::TextFragment => "text_fragment_data",
            TextUnit::Line => "line_data",
            TextUnit::Sign => "sign_interpretation",
        }
    }

    #[must_use]
    pub fn parent(self) -> Option<TextUnit> {
        match self {
            TextUnit::Manuscript => None,
            TextUnit::TextFragment => Some(TextUnit::Manuscript),
            TextUnit::Line => Some(TextUnit::TextFragment),
            TextUnit::Sign => Some(TextUnit::Line),
        }
    }

    #[must_use]
    pub fn child(self) -> Option<TextUnit> {
        match self {
            TextUnit::Manuscript => Some(TextUnit::TextFragment),
            TextUnit::TextFragment => Some(TextUnit::Line),
            TextUnit::Line => Some(TextUnit::Sign),
            TextUnit::Sign => None,
        }
    }

    /// Join table linking this unit to its children
    #[must_use]
    pub fn child_link_table(self) -> Option<&'static str> {
        match self {
            TextUnit::Manuscript => Some("manuscript_to_text_fragment"),
            TextUnit::TextFragment => Some("text_fragment_to_line"),
            TextUnit::Line => Some("line_to_sign"),
            TextUnit::Sign => None,
        }
    }

    /// Stream that orders this unit's children
    #[must_use]
    pub fn child_stream(self) -> Option<StreamType> {
        match self {
            TextUnit::Manuscript => Some(StreamType::TextFragmentStream),
            TextUnit::TextFragment | TextUnit::Line => Some(StreamType::SignInterpretationStream),
            TextUnit::Sign => None,
        }
    }

    /// Units enclosing this one, innermost first
    pub fn ancestors(self) -> impl Iterator<Item = TextUnit> {
        std::iter::successors(self.parent(), |unit| unit.parent())
    }
}

impl std::fmt::Display for TextUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TextUnit::Manuscript => "manuscript",
            TextUnit::TextFragment => "text fragment",
            TextUnit::Line => "line",
            TextUnit::Sign => "sign",
        })
    }
}

/// Attribute values marking the first and last sign of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Terminators {
    pub start: u32,
    pub end: u32,
}

impl Terminators {
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }
}

/// Sentinel attribute values per unit, the `[terminators]` config section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminatorConfig {
    pub manuscript: Terminators,
    pub text_fragment: Terminators,
    pub line: Terminators,
}

impl Default for TerminatorConfig {
    fn default() -> Self {
        Self {
            manuscript: Terminators::new(14, 15),
            text_fragment: Terminators::new(12, 13),
            line: Terminators::new(10, 11),
        }
    }
}

impl TerminatorConfig {
    /// Terminators for `unit`; signs have none
    #[must_use]
    pub fn for_unit(&self, unit: TextUnit) -> Option<Terminators> {
        match unit {
            TextUnit::Manuscript => Some(self.manuscript),
            TextUnit::TextFragment => Some(self.text_fragment),
            TextUnit::Line => Some(self.line),
            TextUnit::Sign => None,
        }
    }

    /// Each unit needs two distinct values and no value may be shared
    /// between units.
    pub(crate) fn check(&self) -> Result<(), String> {
        let mut seen = BTreeSet::new();
        for unit in [TextUnit::Manuscript, TextUnit::TextFragment, TextUnit::Line] {
            let Some(t) = self.for_unit(unit) else { continue };
            if t.start == t.end {
                return Err(format!("{unit} start and end terminators are both {}", t.start));
            }
            for value in [t.start, t.end] {
                if !seen.insert(value) {
                    return Err(format!("terminator value {value} is used twice"));
                }
            }
        }
        Ok(())
    }
}

/// First and last signs of one unit
///
/// Variant readings may give a unit several candidate terminators, so both
/// sides are sets and map directly onto planner anchor sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitBounds {
    pub starts: BTreeSet<NodeId>,
    pub ends: BTreeSet<NodeId>,
}

impl UnitBounds {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.starts.is_empty() && !self.ends.is_empty()
    }
}

/// Find the terminator signs of `unit_id`
///
/// Returns `Ok(None)` for signs, which have no terminators, and for units
/// where neither terminator could be found.
pub async fn unit_bounds<R>(
    repo: &R,
    edition: EditionId,
    unit: TextUnit,
    unit_id: u32,
    terminators: &TerminatorConfig,
) -> Result<Option<UnitBounds>, R::Error>
where
    R: HierarchyRepository + ?Sized,
{
    let Some(sentinels) = terminators.for_unit(unit) else {
        return Ok(None);
    };

    let starts: BTreeSet<_> = repo
        .nodes_with_attribute(edition, unit, unit_id, sentinels.start)
        .await?
        .into_iter()
        .collect();
    let ends: BTreeSet<_> = repo
        .nodes_with_attribute(edition, unit, unit_id, sentinels.end)
        .await?
        .into_iter()
        .collect();

    tracing::debug!(
        "Resolved {} {} bounds: {} start(s), {} end(s)",
        unit,
        unit_id,
        starts.len(),
        ends.len()
    );

    if starts.is_empty() && ends.is_empty() {
        return Ok(None);
    }
    Ok(Some(UnitBounds { starts, ends }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hierarchy_is_consistent() {
        for unit in TextUnit::ALL {
            if let Some(child) = unit.child() {
                assert_eq!(child.parent(), Some(unit));
                assert!(unit.child_link_table().is_some());
                assert!(unit.child_stream().is_some());
            }
        }
        assert_eq!(TextUnit::Manuscript.parent(), None);
        assert_eq!(TextUnit::Sign.child(), None);
    }

    #[test]
    fn ancestors_innermost_first() {
        let chain: Vec<_> = TextUnit::Sign.ancestors().collect();
        assert_eq!(
            chain,
            vec![TextUnit::Line, TextUnit::TextFragment, TextUnit::Manuscript]
        );
        assert_eq!(TextUnit::Manuscript.ancestors().count(), 0);
    }

    #[test]
    fn fragments_are_ordered_by_their_own_stream() {
        assert_eq!(
            TextUnit::Manuscript.child_stream(),
            Some(StreamType::TextFragmentStream)
        );
        assert_eq!(
            TextUnit::Line.child_stream(),
            Some(StreamType::SignInterpretationStream)
        );
    }

    #[test]
    fn default_terminators_are_distinct() {
        let config = TerminatorConfig::default();
        assert!(config.check().is_ok());
        assert_eq!(config.for_unit(TextUnit::Sign), None);
    }

    #[test]
    fn shared_terminator_values_rejected() {
        let config = TerminatorConfig {
            line: Terminators::new(12, 11),
            ..TerminatorConfig::default()
        };
        assert!(config.check().is_err());

        let config = TerminatorConfig {
            manuscript: Terminators::new(3, 3),
            ..TerminatorConfig::default()
        };
        assert!(config.check().is_err());
    }
}
