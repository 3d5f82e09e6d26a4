//! Translation of [`BookmarkFilter`] into a SQL `WHERE` clause.
//!
//! The clause refers to the bookmarks table as `b` and uses anonymous `?`
//! placeholders, with parameters in clause order.

use rito_core::filter::{BookmarkFilter, Owner};
use rusqlite::types::Value;

/// A `WHERE` clause (or the empty string) and its bound parameters.
#[derive(Debug, Clone, Default)]
pub struct WhereClause {
  pub sql:    String,
  pub params: Vec<Value>,
}

const HAS_TAG: &str = "SELECT 1 FROM bookmark_tags bt
  JOIN tags t ON t.id = bt.tag_id
  WHERE bt.bookmark_uri = b.uri";

/// `?, ?, ?` with `n` placeholders.
pub fn placeholders(n: usize) -> String { vec!["?"; n].join(", ") }

fn text(values: impl IntoIterator<Item = impl Into<String>>) -> Vec<Value> {
  values.into_iter().map(|v| Value::Text(v.into())).collect()
}

pub fn where_clause(filter: &BookmarkFilter) -> WhereClause {
  let mut conds: Vec<String> = Vec::new();
  let mut params: Vec<Value> = Vec::new();

  // Filter tags arrive folded; compare against the stored folded name.
  for tag in &filter.required_tags {
    conds.push(format!("EXISTS ({HAS_TAG} AND t.folded = ?)"));
    params.push(Value::Text(tag.clone()));
  }
  if !filter.excluded_tags.is_empty() {
    conds.push(format!(
      "NOT EXISTS ({HAS_TAG} AND t.folded IN ({}))",
      placeholders(filter.excluded_tags.len())
    ));
    params.extend(text(filter.excluded_tags.iter().cloned()));
  }

  if !filter.handles.is_empty() {
    conds.push(format!("b.handle IN ({})", placeholders(filter.handles.len())));
    params.extend(text(filter.handles.iter().cloned()));
  }
  if !filter.excluded_handles.is_empty() {
    conds.push(format!(
      "(b.handle IS NULL OR b.handle NOT IN ({}))",
      placeholders(filter.excluded_handles.len())
    ));
    params.extend(text(filter.excluded_handles.iter().cloned()));
  }

  match &filter.owner {
    Some(Owner::Did(did)) => {
      conds.push("b.did = ?".to_owned());
      params.push(Value::Text(did.clone()));
    }
    Some(Owner::Handle(handle)) => {
      conds.push("b.handle = ?".to_owned());
      params.push(Value::Text(handle.clone()));
    }
    None => {}
  }

  if let Some(dids) = &filter.dids {
    if dids.is_empty() {
      conds.push("0".to_owned());
    } else {
      conds.push(format!("b.did IN ({})", placeholders(dids.len())));
      params.extend(text(dids.iter().cloned()));
    }
  }

  let sql = if conds.is_empty() {
    String::new()
  } else {
    format!("WHERE {}", conds.join(" AND "))
  };
  WhereClause { sql, params }
}
