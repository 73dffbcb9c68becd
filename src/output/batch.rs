//! Arrow record batch sink
//!
//! Fixed columns come first, followed by one column per event-count rule,
//! exclusion label and covariate label, in configuration order. Dates are
//! written as `Date32`, which shares the engine's day epoch.

use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanBuilder, Date32Builder, StringBuilder, UInt32Builder, UInt64Builder,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;

use crate::algorithm::matching::types::MatchRecord;
use crate::common::traits::RecordSink;
use crate::error::{MatchingError, Result};

/// Collects records and converts them to a [`RecordBatch`]
#[derive(Debug, Clone)]
pub struct RecordBatchSink {
    rule_labels: Vec<String>,
    exclusion_labels: Vec<String>,
    covariate_labels: Vec<String>,
    records: Vec<MatchRecord>,
}

impl RecordBatchSink {
    /// Create a sink for records carrying the given labelled values
    ///
    /// # Arguments
    ///
    /// * `rule_labels` - Event-count rule labels, in rule order
    /// * `exclusion_labels` - Exclusion-criteria labels
    /// * `covariate_labels` - Covariate labels
    #[must_use]
    pub fn new(
        rule_labels: Vec<String>,
        exclusion_labels: Vec<String>,
        covariate_labels: Vec<String>,
    ) -> Self {
        Self {
            rule_labels,
            exclusion_labels,
            covariate_labels,
            records: Vec::new(),
        }
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

    /// Schema of the produced batch
    #[must_use]
    pub fn schema(&self) -> SchemaRef {
        let mut fields = vec![
            Field::new("case_set_id", DataType::UInt64, false),
            Field::new("event_type", DataType::Utf8, false),
            Field::new("is_case", DataType::Boolean, false),
            Field::new("patient_id", DataType::Utf8, false),
            Field::new("practice_id", DataType::Utf8, false),
            Field::new("birth_date", DataType::Date32, false),
            Field::new("gender", DataType::Utf8, false),
            Field::new("index_date", DataType::Date32, false),
            Field::new("cohort_start", DataType::Date32, false),
            Field::new("cohort_end", DataType::Date32, false),
            Field::new("drug_count", DataType::UInt32, true),
        ];
        fields.extend(
            self.rule_labels
                .iter()
                .map(|label| Field::new(label, DataType::UInt32, false)),
        );
        fields.extend(
            self.exclusion_labels
                .iter()
                .chain(&self.covariate_labels)
                .map(|label| Field::new(label, DataType::Utf8, false)),
        );
        Arc::new(Schema::new(fields))
    }

    /// Build a record batch from everything collected so far
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let mut case_set_id = UInt64Builder::new();
        let mut event_type = StringBuilder::new();
        let mut is_case = BooleanBuilder::new();
        let mut patient_id = StringBuilder::new();
        let mut practice_id = StringBuilder::new();
        let mut birth_date = Date32Builder::new();
        let mut gender = StringBuilder::new();
        let mut index_date = Date32Builder::new();
        let mut cohort_start = Date32Builder::new();
        let mut cohort_end = Date32Builder::new();
        let mut drug_count = UInt32Builder::new();
        let mut rule_counts: Vec<UInt32Builder> =
            self.rule_labels.iter().map(|_| UInt32Builder::new()).collect();
        let mut labelled: Vec<StringBuilder> = self
            .exclusion_labels
            .iter()
            .chain(&self.covariate_labels)
            .map(|_| StringBuilder::new())
            .collect();

        for record in &self.records {
            case_set_id.append_value(record.case_set_id);
            event_type.append_value(&record.event_type);
            is_case.append_value(record.is_case);
            patient_id.append_value(&record.patient_id);
            practice_id.append_value(&record.practice_id);
            birth_date.append_value(record.birth_date);
            gender.append_value(record.gender.code());
            index_date.append_value(record.index_date);
            cohort_start.append_value(record.cohort_start);
            cohort_end.append_value(record.cohort_end);
            drug_count.append_option(record.drug_count);

            for (builder, count) in rule_counts.iter_mut().zip(&record.event_counts) {
                builder.append_value(*count);
            }
            let values = record.exclusion_values.iter().chain(&record.covariate_values);
            for (builder, value) in labelled.iter_mut().zip(values) {
                builder.append_value(value);
            }
        }

        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(case_set_id.finish()),
            Arc::new(event_type.finish()),
            Arc::new(is_case.finish()),
            Arc::new(patient_id.finish()),
            Arc::new(practice_id.finish()),
            Arc::new(birth_date.finish()),
            Arc::new(gender.finish()),
            Arc::new(index_date.finish()),
            Arc::new(cohort_start.finish()),
            Arc::new(cohort_end.finish()),
            Arc::new(drug_count.finish()),
        ];
        columns.extend(
            rule_counts
                .iter_mut()
                .map(|builder| Arc::new(builder.finish()) as ArrayRef),
        );
        columns.extend(
            labelled
                .iter_mut()
                .map(|builder| Arc::new(builder.finish()) as ArrayRef),
        );

        Ok(RecordBatch::try_new(self.schema(), columns)?)
    }

    fn check_width(&self, record: &MatchRecord) -> Result<()> {
        let widths = [
            ("event counts", record.event_counts.len(), self.rule_labels.len()),
            ("exclusion values", record.exclusion_values.len(), self.exclusion_labels.len()),
            ("covariate values", record.covariate_values.len(), self.covariate_labels.len()),
        ];
        for (what, got, expected) in widths {
            if got != expected {
                return Err(MatchingError::Sink(format!(
                    "record for patient {} has {got} {what}, expected {expected}",
                    record.patient_id
                )));
            }
        }
        Ok(())
    }
}

impl RecordSink for RecordBatchSink {
    fn emit(&mut self, record: MatchRecord) -> Result<()> {
        self.check_width(&record)?;
        self.records.push(record);
        Ok(())
    }
}
