//! Edge table schema
//!
//! Sign interpretations and text fragments are ordered by two parallel edge
//! tables with identical shape. [`EdgeTableSchema`] names the table and
//! columns for one of them; it is chosen once per planner and handed to every
//! repository call.

use crate::error::SchemaError;
use serde::{Deserialize, Serialize};

/// Which stream namespace is being edited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamType {
    /// Sign interpretations within lines and fragments
    SignInterpretationStream,
    /// Text fragments within a manuscript
    TextFragmentStream,
}

impl StreamType {
    pub const ALL: [StreamType; 2] = [
        StreamType::SignInterpretationStream,
        StreamType::TextFragmentStream,
    ];

    /// Default schema for this namespace
    #[must_use]
    pub fn schema(self) -> EdgeTableSchema {
        EdgeTableSchema::for_stream(self)
    }
}

impl std::fmt::Display for StreamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamType::SignInterpretationStream => write!(f, "sign-interpretation"),
            StreamType::TextFragmentStream => write!(f, "text-fragment"),
        }
    }
}

impl std::str::FromStr for StreamType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sign-interpretation" | "sign_interpretation_stream" | "sign" => {
                Ok(StreamType::SignInterpretationStream)
            }
            "text-fragment" | "text_fragment_stream" | "fragment" => {
                Ok(StreamType::TextFragmentStream)
            }
            other => Err(SchemaError::UnknownStream(other.to_string())),
        }
    }
}

/// Table and column names for one stream namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeTableSchema {
    pub stream: StreamType,
    /// Edge table
    pub table: String,
    /// Column holding the preceding node
    pub item_column: String,
    /// Column holding the following node
    pub next_item_column: String,
    /// Table recording which edition owns an edge row
    pub owner_table: String,
    /// Column of the owner table referencing the edge row
    pub owner_column: String,
}

impl EdgeTableSchema {
    #[must_use]
    pub fn for_stream(stream: StreamType) -> Self {
        match stream {
            StreamType::SignInterpretationStream => Self {
                stream,
                table: "position_in_stream".to_string(),
                item_column: "sign_interpretation_id".to_string(),
                next_item_column: "next_sign_interpretation_id".to_string(),
                owner_table: "position_in_stream_owner".to_string(),
                owner_column: "position_in_stream_id".to_string(),
            },
            StreamType::TextFragmentStream => Self {
                stream,
                table: "position_in_text_fragment_stream".to_string(),
                item_column: "text_fragment_id".to_string(),
                next_item_column: "next_text_fragment_id".to_string(),
                owner_table: "position_in_text_fragment_stream_owner".to_string(),
                owner_column: "position_in_text_fragment_stream_id".to_string(),
            },
        }
    }

    /// Reject names that could not be real identifiers
    pub fn validate(&self) -> Result<(), SchemaError> {
        for (field, value) in [
            ("table", &self.table),
            ("item_column", &self.item_column),
            ("next_item_column", &self.next_item_column),
            ("owner_table", &self.owner_table),
            ("owner_column", &self.owner_column),
        ] {
            check_identifier(field, value)?;
        }

        if self.item_column == self.next_item_column {
            return Err(SchemaError::IdenticalColumns(self.item_column.clone()));
        }
        if self.table == self.owner_table {
            return Err(SchemaError::IdenticalTables(self.table.clone()));
        }
        Ok(())
    }
}

fn check_identifier(field: &'static str, value: &str) -> Result<(), SchemaError> {
    if value.is_empty() {
        return Err(SchemaError::EmptyIdentifier(field));
    }
    let starts_ok = value
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !starts_ok || !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(SchemaError::InvalidIdentifier {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Partial replacement of the default names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableOverride {
    pub table: Option<String>,
    pub item_column: Option<String>,
    pub next_item_column: Option<String>,
    pub owner_table: Option<String>,
    pub owner_column: Option<String>,
}

/// Per-namespace overrides, usually read from the `[schema]` config section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaOverrides {
    pub sign_interpretation: Option<TableOverride>,
    pub text_fragment: Option<TableOverride>,
}

impl SchemaOverrides {
    /// Resolve and validate the schema for `stream`
    pub fn resolve(&self, stream: StreamType) -> Result<EdgeTableSchema, SchemaError> {
        let mut schema = EdgeTableSchema::for_stream(stream);
        let overrides = match stream {
            StreamType::SignInterpretationStream => self.sign_interpretation.as_ref(),
            StreamType::TextFragmentStream => self.text_fragment.as_ref(),
        };

        if let Some(o) = overrides {
            let fields = [
                (&o.table, &mut schema.table),
                (&o.item_column, &mut schema.item_column),
                (&o.next_item_column, &mut schema.next_item_column),
                (&o.owner_table, &mut schema.owner_table),
                (&o.owner_column, &mut schema.owner_column),
            ];
            for (replacement, slot) in fields {
                if let Some(value) = replacement {
                    slot.clone_from(value);
                }
            }
        }

        schema.validate()?;
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schemas_are_valid() {
        for stream in StreamType::ALL {
            assert!(stream.schema().validate().is_ok(), "{stream}");
        }
    }

    #[test]
    fn namespaces_use_distinct_tables() {
        let signs = StreamType::SignInterpretationStream.schema();
        let fragments = StreamType::TextFragmentStream.schema();
        assert_ne!(signs.table, fragments.table);
        assert_eq!(signs.item_column, "sign_interpretation_id");
        assert_eq!(fragments.next_item_column, "next_text_fragment_id");
    }

    #[test]
    fn override_replaces_only_given_fields() {
        let overrides = SchemaOverrides {
            sign_interpretation: Some(TableOverride {
                table: Some("sign_stream".to_string()),
                ..TableOverride::default()
            }),
            text_fragment: None,
        };
        let schema = overrides
            .resolve(StreamType::SignInterpretationStream)
            .unwrap();
        assert_eq!(schema.table, "sign_stream");
        assert_eq!(schema.item_column, "sign_interpretation_id");
    }

    #[test]
    fn invalid_overrides_fail_fast() {
        let same_columns = SchemaOverrides {
            text_fragment: Some(TableOverride {
                next_item_column: Some("text_fragment_id".to_string()),
                ..TableOverride::default()
            }),
            ..SchemaOverrides::default()
        };
        assert!(matches!(
            same_columns.resolve(StreamType::TextFragmentStream),
            Err(SchemaError::IdenticalColumns(_))
        ));

        let injected = SchemaOverrides {
            sign_interpretation: Some(TableOverride {
                table: Some("stream; DROP TABLE x".to_string()),
                ..TableOverride::default()
            }),
            ..SchemaOverrides::default()
        };
        assert!(matches!(
            injected.resolve(StreamType::SignInterpretationStream),
            Err(SchemaError::InvalidIdentifier { field: "table", .. })
        ));

        let empty = SchemaOverrides {
            sign_interpretation: Some(TableOverride {
                owner_column: Some(String::new()),
                ..TableOverride::default()
            }),
            ..SchemaOverrides::default()
        };
        assert_eq!(
            empty.resolve(StreamType::SignInterpretationStream),
            Err(SchemaError::EmptyIdentifier("owner_column"))
        );
    }

    #[test]
    fn stream_type_parses() {
        assert_eq!(
            "sign".parse::<StreamType>().unwrap(),
            StreamType::SignInterpretationStream
        );
        assert_eq!(
            "text-fragment".parse::<StreamType>().unwrap(),
            StreamType::TextFragmentStream
        );
        assert!("line".parse::<StreamType>().is_err());
    }
}
