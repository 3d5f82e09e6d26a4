//! `at://authority/collection/rkey` record identifiers.

use std::{fmt, str::FromStr};

use crate::{Error, Result};

const SCHEME: &str = "at://";

/// The AT-URI of a single record in a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AtUri {
  /// A DID or handle.
  pub authority:  String,
  /// NSID of the record collection, e.g. `blue.rito.feed.bookmark`.
  pub collection: String,
  pub rkey:       String,
}

impl AtUri {
  pub fn new(
    authority: impl Into<String>,
    collection: impl Into<String>,
    rkey: impl Into<String>,
  ) -> Self {
    Self {
      authority:  authority.into(),
      collection: collection.into(),
      rkey:       rkey.into(),
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    let invalid = || Error::InvalidAtUri(s.to_owned());
    let rest = s.strip_prefix(SCHEME).ok_or_else(invalid)?;

    let mut parts = rest.split('/');
    let (Some(authority), Some(collection), Some(rkey), None) =
      (parts.next(), parts.next(), parts.next(), parts.next())
    else {
      return Err(invalid());
    };
    if authority.is_empty() || collection.is_empty() || rkey.is_empty() {
      return Err(invalid());
    }

    Ok(Self::new(authority, collection, rkey))
  }
}

impl fmt::Display for AtUri {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{SCHEME}{}/{}/{}", self.authority, self.collection, self.rkey)
  }
}

impl FromStr for AtUri {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> { Self::parse(s) }
}
