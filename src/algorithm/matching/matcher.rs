//! Core matching algorithm implementation
//!
//! This module implements the Matcher struct which orchestrates the two
//! matching passes over a population.

use crate::algorithm::matching::adapter::PredicateAdapter;
use crate::algorithm::matching::case_identifier::CaseIdentifier;
use crate::algorithm::matching::control::ControlMatcher;
use crate::algorithm::matching::criteria::{ControlQuota, MatchingConfig};
use crate::algorithm::matching::registry::CaseSetRegistry;
use crate::algorithm::matching::sequential::{control_search_pass, identify_cases_pass, PassState};
use crate::algorithm::matching::types::MatchingResult;
use crate::algorithm::matching::validation::validate_population;
use crate::common::traits::{CovariateProvider, ExclusionCriteria, RecordSink};
use crate::error::Result;
use crate::models::Patient;
use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rustc_hash::FxHashSet;
use std::time::Instant;

/// Matcher for pairing cases with controls
#[derive(Debug)]
pub struct Matcher<'a> {
    /// Matching configuration
    config: MatchingConfig,
    adapter: PredicateAdapter<'a>,
    show_progress: bool,
}

impl<'a> Matcher<'a> {
    /// Create a new matcher with the given configuration and collaborators
    #[must_use]
    pub fn new(
        config: MatchingConfig,
        exclusion: &'a dyn ExclusionCriteria,
        covariates: &'a dyn CovariateProvider,
    ) -> Self {
        Self {
            config,
            adapter: PredicateAdapter::new(exclusion, covariates),
            show_progress: false,
        }
    }

    /// Show progress bars while the passes run
    #[must_use]
    pub const fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// The configuration this matcher runs with
    #[must_use]
    pub const fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Event-count rule labels, in output column order
    #[must_use]
    pub fn rule_labels(&self) -> Vec<String> {
        self.config
            .event_count_rules
            .iter()
            .map(|rule| rule.label.clone())
            .collect()
    }

    /// Exclusion-criteria labels, in output column order
    #[must_use]
    pub fn exclusion_labels(&self) -> Vec<String> {
        self.adapter.exclusion_labels()
    }

    /// Covariate labels, in output column order
    #[must_use]
    pub fn covariate_labels(&self) -> Vec<String> {
        self.adapter.covariate_labels()
    }

    /// Run both passes over a population
    ///
    /// # Arguments
    ///
    /// * `patients` - The population, each patient's records sorted by date
    /// * `sink` - Receives every case and control record as it is produced
    ///
    /// # Returns
    ///
    /// Case and control counts, per-case control counts and attrition
    pub fn perform_matching(
        &self,
        patients: &[Patient],
        sink: &mut dyn RecordSink,
    ) -> Result<MatchingResult> {
        let start_time = Instant::now();

        validate_population(patients)?;
        info!(
            "Matching {} patients with configuration:\n{}",
            patients.len(),
            self.config
        );

        let order = self.processing_order(patients);

        let mut state = PassState::new(CaseSetRegistry::new(self.config.controls_per_case), sink);
        let mut identifier = CaseIdentifier::new(&self.config, self.adapter);
        let case_patients = identify_cases_pass(&order, &mut identifier, &mut state, self.show_progress)?;

        let skip = if self.config.controls_never_case {
            case_patients
        } else {
            FxHashSet::default()
        };
        let matcher = ControlMatcher::new(&self.config, self.adapter);
        control_search_pass(
            &order,
            &matcher,
            self.adapter,
            &skip,
            &mut state,
            self.show_progress,
        )?;

        let cases = state.registry.summaries();
        let mut attrition = state.attrition;
        let searched = self.config.controls_per_case != ControlQuota::Bounded(0);
        for case in &cases {
            if searched && case.controls_found == 0 {
                attrition.cases_without_controls += 1;
            }
            if matches!(
                self.config.controls_per_case,
                ControlQuota::Bounded(quota) if case.controls_found < quota
            ) {
                attrition.cases_below_quota += 1;
            }
        }

        let elapsed = start_time.elapsed();
        info!(
            "Matching complete: {} cases matched with {} controls in {:.2?}",
            state.cases_emitted, state.controls_emitted, elapsed
        );

        Ok(MatchingResult {
            case_count: state.cases_emitted,
            control_count: state.controls_emitted,
            cases,
            attrition,
            matching_time: elapsed,
        })
    }

    /// Input order, or a seeded shuffle of it
    fn processing_order<'p>(&self, patients: &'p [Patient]) -> Vec<&'p Patient> {
        let mut order: Vec<&Patient> = patients.iter().collect();
        if let Some(seed) = self.config.random_seed {
            debug!("Shuffling processing order with seed {seed}");
            let mut rng = StdRng::seed_from_u64(seed);
            order.shuffle(&mut rng);
        }
        order
    }
}
