// Copyright (C) 2021-2026  Veridoc Labs Ltd. (VDL).
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public
// License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! This module combines several namespace → data-element maps into one queryable [`Claims`] view.
//!
//! Merging performs no verification of its own: callers only merge claims whose authenticity was
//! already established by the [`verifier`][crate::verifier] pipeline.

use std::collections::HashMap;

use crate::{models::Claims, MdocError, Result};

/// How a data element present in more than one merge input is handled.
///
/// The default is [`Clash`][DuplicatePolicy::Clash]: in conformance terms, overlapping disclosure
/// normally indicates a tampered or malformed submission, so it is rejected unless the caller
/// explicitly opts into an override order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Any data element present in two inputs is an error naming the element.
    #[default]
    Clash,
    /// A later input wins; used when a fresher device-signed value intentionally supersedes a
    /// stale issuer-signed one.
    Override,
    /// An earlier input wins, later occurrences are ignored.
    UseFirst,
}

/// Merges the provided claims maps into one, handling duplicates per the `policy`.
///
/// Merging with an empty input is the identity under every policy.
pub fn merge_claims(
    inputs: impl IntoIterator<Item = Claims>,
    policy: DuplicatePolicy,
) -> Result<Claims> {
    let mut merged: Claims = Claims(HashMap::new());

    for input in inputs {
        for (name_space, elements) in input.0 {
            let merged_elements = merged.0.entry(name_space.clone()).or_default();

            for (identifier, value) in elements {
                match policy {
                    DuplicatePolicy::Clash => {
                        if merged_elements.contains_key(&identifier) {
                            return Err(vderror::Error::root(MdocError::DuplicateDataElement(
                                name_space.clone(),
                                identifier,
                            )));
                        }
                        merged_elements.insert(identifier, value);
                    }
                    DuplicatePolicy::Override => {
                        merged_elements.insert(identifier, value);
                    }
                    DuplicatePolicy::UseFirst => {
                        merged_elements.entry(identifier).or_insert(value);
                    }
                }
            }
        }
    }

    Ok(merged)
}
