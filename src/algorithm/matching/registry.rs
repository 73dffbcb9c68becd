//! Registry of case patterns awaiting controls
//!
//! Patterns live in an arena ordered by id. A separate list holds the arena
//! slots of patterns that still need controls. The list is walked newest
//! first, so a pattern closed during a walk is removed at the current position
//! without disturbing the slots not yet visited.

use crate::algorithm::matching::criteria::ControlQuota;
use crate::algorithm::matching::types::{CaseId, CasePattern, CaseSummary};
use crate::error::{MatchingError, Result};
use log::debug;

/// Collection of case patterns, open until their control quota is met
#[derive(Debug)]
pub struct CaseSetRegistry {
    patterns: Vec<CasePattern>,
    open: Vec<usize>,
    quota: ControlQuota,
}

impl CaseSetRegistry {
    /// Create an empty registry for the given quota
    #[must_use]
    pub const fn new(quota: ControlQuota) -> Self {
        Self {
            patterns: Vec::new(),
            open: Vec::new(),
            quota,
        }
    }

    /// Add a pattern; ids must be registered in increasing order
    ///
    /// A pattern whose quota is already met (a quota of zero) is stored but
    /// never opened.
    pub fn register(&mut self, pattern: CasePattern) -> Result<CaseId> {
        if let Some(last) = self.patterns.last() {
            if pattern.id <= last.id {
                return Err(MatchingError::validation(format!(
                    "case pattern {} registered after {}",
                    pattern.id, last.id
                )));
            }
        }

        let id = pattern.id;
        let slot = self.patterns.len();
        let already_full = self.quota.is_met(pattern.controls_found);
        self.patterns.push(pattern);
        if !already_full {
            self.open.push(slot);
        }
        Ok(id)
    }

    /// Look up a pattern by id
    #[must_use]
    pub fn get(&self, id: CaseId) -> Option<&CasePattern> {
        self.slot_of(id).map(|slot| &self.patterns[slot])
    }

    /// Close a pattern so no further candidate is tried against it
    ///
    /// Returns `false` when the pattern was not open.
    pub fn remove(&mut self, id: CaseId) -> bool {
        let Some(slot) = self.slot_of(id) else {
            return false;
        };
        match self.open.iter().position(|&open| open == slot) {
            Some(position) => {
                self.open.remove(position);
                true
            }
            None => false,
        }
    }

    /// Try every open pattern against one candidate, newest first
    ///
    /// `try_match` returns `true` when the candidate was accepted as a control.
    /// The pattern's control count is then incremented, and the pattern is
    /// closed once its quota is met.
    pub fn visit_open<F>(&mut self, mut try_match: F) -> Result<()>
    where
        F: FnMut(&CasePattern) -> Result<bool>,
    {
        let mut position = self.open.len();
        while position > 0 {
            position -= 1;
            let slot = self.open[position];
            let pattern = &mut self.patterns[slot];

            if !try_match(pattern)? {
                continue;
            }

            pattern.controls_found += 1;
            if self.quota.is_met(pattern.controls_found) {
                debug!(
                    "Case set {} complete with {} controls",
                    pattern.id, pattern.controls_found
                );
                self.open.remove(position);
            }
        }
        Ok(())
    }

    /// Ids of open patterns, newest first
    pub fn open_ids(&self) -> impl Iterator<Item = CaseId> + '_ {
        self.open.iter().rev().map(|&slot| self.patterns[slot].id)
    }

    /// Number of patterns still awaiting controls
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    /// Number of registered patterns, open or closed
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether nothing has been registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// All registered patterns in id order
    pub fn patterns(&self) -> impl Iterator<Item = &CasePattern> {
        self.patterns.iter()
    }

    /// Final control counts of every registered case
    #[must_use]
    pub fn summaries(&self) -> Vec<CaseSummary> {
        self.patterns
            .iter()
            .map(|pattern| CaseSummary {
                id: pattern.id,
                patient_id: pattern.patient_id.clone(),
                event_type: pattern.case_event.event_type.clone(),
                controls_found: pattern.controls_found,
            })
            .collect()
    }

    fn slot_of(&self, id: CaseId) -> Option<usize> {
        self.patterns
            .binary_search_by_key(&id, |pattern| pattern.id)
            .ok()
    }
}
