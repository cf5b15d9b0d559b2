use crate::domain::activity::{ActivityField, ActivityRecord};

/// Computes which of the six required slots are still unfilled.
#[derive(Clone, Copy, Debug, Default)]
pub struct SlotTracker;

impl SlotTracker {
    /// Unfilled fields in canonical order.
    pub fn missing_fields(&self, record: &ActivityRecord) -> Vec<ActivityField> {
        ActivityField::ALL.into_iter().filter(|field| !record.has(*field)).collect()
    }

    pub fn is_complete(&self, record: &ActivityRecord) -> bool {
        self.missing_fields(record).is_empty()
    }

    pub fn completed_count(&self, record: &ActivityRecord) -> usize {
        ActivityField::ALL.len() - self.missing_fields(record).len()
    }
}

#[cfg(test)]
mod tests {
    use super::SlotTracker;
    use crate::domain::activity::{ActivityField, ActivityRecord, ExtractionResult};

    fn record_from_mask(mask: u8) -> ActivityRecord {
        let mut values = ExtractionResult::default();
        for (bit, field) in ActivityField::ALL.into_iter().enumerate() {
            if mask & (1 << bit) == 0 {
                continue;
            }
            match field {
                ActivityField::NumberOfKids => values.set_kids(7),
                _ => values.set_text(field, "value"),
            }
        }
        ActivityRecord::from(values)
    }

    #[test]
    fn completion_holds_exactly_when_all_six_are_present() {
        let tracker = SlotTracker;
        for mask in 0u8..64 {
            let record = record_from_mask(mask);
            let missing = tracker.missing_fields(&record);

            assert_eq!(tracker.is_complete(&record), mask == 0b11_1111, "mask {mask:06b}");
            assert_eq!(missing.len(), 6 - mask.count_ones() as usize, "mask {mask:06b}");
            assert_eq!(tracker.completed_count(&record), mask.count_ones() as usize);

            let mut sorted = missing.clone();
            sorted.sort();
            assert_eq!(missing, sorted, "missing fields keep canonical order");
        }
    }

    #[test]
    fn empty_record_misses_everything_in_canonical_order() {
        assert_eq!(SlotTracker.missing_fields(&ActivityRecord::new()), ActivityField::ALL.to_vec());
    }

    #[test]
    fn two_turns_accumulate_fields() {
        let tracker = SlotTracker;
        let mut record = ActivityRecord::new();
        record.absorb(&ExtractionResult {
            name: Some("Sarah".to_string()),
            activity_type: Some("teaching".to_string()),
            ..ExtractionResult::default()
        });
        record.absorb(&ExtractionResult {
            location: Some("Ban Nong Khai".to_string()),
            ..ExtractionResult::default()
        });

        assert_eq!(
            tracker.missing_fields(&record),
            vec![ActivityField::NumberOfKids, ActivityField::YouthHouse, ActivityField::Date]
        );
    }
}
