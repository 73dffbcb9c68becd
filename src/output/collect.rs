//! In-memory sink

use crate::algorithm::matching::types::MatchRecord;
use crate::common::traits::RecordSink;
use crate::error::Result;

/// Collects records in emission order
#[derive(Debug, Default, Clone)]
pub struct VecSink {
    records: Vec<MatchRecord>,
}

impl VecSink {
    /// Records collected so far
    #[must_use]
    pub fn records(&self) -> &[MatchRecord] {
        &self.records
    }

    /// Take ownership of the collected records
    #[must_use]
    pub fn into_records(self) -> Vec<MatchRecord> {
        self.records
    }

    /// Number of records collected
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing was collected
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordSink for VecSink {
    fn emit(&mut self, record: MatchRecord) -> Result<()> {
        self.records.push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::matching::adapter::OutputValues;
    use crate::algorithm::matching::types::CasePattern;
    use crate::models::{CohortInterval, Event, Gender, Patient};

    #[test]
    fn test_records_kept_in_emission_order() {
        let cohort = CohortInterval::new(0, 100);
        let first = Patient::new("A", 0, Gender::Female, "PR1", cohort);
        let second = Patient::new("B", 0, Gender::Female, "PR1", cohort);

        let mut sink = VecSink::default();
        assert!(sink.is_empty());
        for (id, patient) in [(1, &first), (2, &second)] {
            let pattern = CasePattern::new(id, patient, Event::new("MI", 50), cohort);
            sink.emit(MatchRecord::for_case(&pattern, OutputValues::default()))
                .unwrap();
        }

        assert_eq!(sink.len(), 2);
        let ids: Vec<_> = sink.records().iter().map(|r| r.case_set_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(sink.into_records()[1].patient_id, "B");
    }
}
