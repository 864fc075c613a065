//! Stats service response parsing
//!
//! Responses carry one or more named result sets:
//!
//! ```json
//! {"resultSets": [{"name": "PlayerGameLog", "headers": ["GAME_ID", ...], "rowSet": [[...], ...]}]}
//! ```
//!
//! Some endpoints use a single `resultSet` object instead of the array.

use serde_json::Value;

use crate::fetcher::{FetcherError, FetcherResult};
use crate::identifier::EntityId;
use crate::{Entity, Table};

/// Parser for stats service result sets
pub struct StatsParser;

impl StatsParser {
    /// Extract the result set called `name` as a [`Table`]
    pub fn parse_result_set(body: &Value, name: &str) -> FetcherResult<Table> {
        let result_set = Self::find_result_set(body, name)?;

        let headers = result_set
            .get("headers")
            .and_then(Value::as_array)
            .ok_or_else(|| FetcherError::ParseError(format!("result set {name} has no headers")))?
            .iter()
            .map(|h| {
                h.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| FetcherError::ParseError(format!("non-string header in {name}")))
            })
            .collect::<FetcherResult<Vec<String>>>()?;

        let rows = match result_set.get("rowSet") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(rows)) => rows
                .iter()
                .map(|row| {
                    row.as_array()
                        .map(|cells| cells.iter().map(Self::cell_to_string).collect())
                        .ok_or_else(|| FetcherError::ParseError(format!("non-array row in {name}")))
                })
                .collect::<FetcherResult<Vec<Vec<String>>>>()?,
            Some(other) => {
                return Err(FetcherError::ParseError(format!(
                    "rowSet of {name} is not an array: {other}"
                )))
            }
        };

        Table::new(headers, rows).map_err(FetcherError::ParseError)
    }

    /// Convert a `commonallplayers` table into roster entries
    ///
    /// Requires `PERSON_ID`; name, roster status and career span are optional.
    pub fn parse_roster(table: &Table) -> FetcherResult<Vec<Entity>> {
        let id_col = table
            .column("PERSON_ID")
            .ok_or_else(|| FetcherError::ParseError("roster lacks PERSON_ID column".to_string()))?;
        let name_col = table.column("DISPLAY_FIRST_LAST");
        let status_col = table.column("ROSTERSTATUS");
        let from_col = table.column("FROM_YEAR");
        let to_col = table.column("TO_YEAR");

        table
            .rows()
            .iter()
            .map(|row| {
                let id = EntityId::parse(&row[id_col])
                    .map_err(|e| FetcherError::ParseError(e.to_string()))?;
                let cell = |col: Option<usize>| col.map(|c| row[c].trim()).unwrap_or("");

                Ok(Entity {
                    id,
                    name: cell(name_col).to_string(),
                    is_active: matches!(cell(status_col), "1" | "Active"),
                    from_year: cell(from_col).parse().ok(),
                    to_year: cell(to_col).parse().ok(),
                })
            })
            .collect()
    }

    fn find_result_set<'a>(body: &'a Value, name: &str) -> FetcherResult<&'a Value> {
        if let Some(sets) = body.get("resultSets").and_then(Value::as_array) {
            return sets
                .iter()
                .find(|set| set.get("name").and_then(Value::as_str) == Some(name))
                .ok_or_else(|| FetcherError::MissingResultSet(name.to_string()));
        }

        match body.get("resultSet") {
            Some(set) if set.get("name").and_then(Value::as_str) == Some(name) => Ok(set),
            _ => Err(FetcherError::MissingResultSet(name.to_string())),
        }
    }

    fn cell_to_string(cell: &Value) -> String {
        match cell {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}
