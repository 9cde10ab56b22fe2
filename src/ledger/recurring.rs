use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{
    recurrence::Recurrence,
    transaction::{format_date, Occurrence, RecurringTemplate, TransactionRecord},
};
use crate::core::ids::IdGenerator;

/// Upper bound on occurrences a single template may generate in one run.
///
/// A template that is further behind than this catches up over several runs.
pub const MAX_CATCH_UP_ITERATIONS: usize = 12;

const MAX_ID_ATTEMPTS: usize = 64;

/// A template the materializer could not interpret and left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedTemplate {
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct MaterializeOutcome {
    /// Input records, templates carrying their advanced watermark, followed by
    /// the generated occurrences.
    pub transactions: Vec<TransactionRecord>,
    pub generated: usize,
    pub skipped: Vec<SkippedTemplate>,
}

impl MaterializeOutcome {
    pub fn changed(&self) -> bool {
        self.generated > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceSnapshot {
    pub template_id: String,
    pub recurrence: Recurrence,
    pub anchor: NaiveDate,
    pub next_due: Option<NaiveDate>,
    /// Occurrences due on or before the reference date, ignoring the per-run cap.
    pub behind: usize,
}

/// Generates every due occurrence of every recurring template in
/// `transactions` up to and including `reference`.
///
/// Concrete transactions pass through untouched. Templates whose dates cannot
/// be parsed are reported in [`MaterializeOutcome::skipped`] and left as they
/// were. Running this again with the same `reference` on its own output
/// generates nothing.
pub fn materialize(
    reference: NaiveDate,
    mut transactions: Vec<TransactionRecord>,
    ids: &dyn IdGenerator,
) -> MaterializeOutcome {
    let mut taken: HashSet<String> = transactions.iter().map(|txn| txn.id.clone()).collect();
    let mut created: Vec<TransactionRecord> = Vec::new();
    let mut skipped = Vec::new();

    for record in transactions.iter_mut().filter(|txn| txn.is_template()) {
        let mut template = match RecurringTemplate::try_from(&*record) {
            Ok(template) => template,
            Err(err) => {
                warn!(template = %record.id, error = %err, "skipping malformed recurring template");
                skipped.push(SkippedTemplate {
                    id: record.id.clone(),
                    reason: err.to_string(),
                });
                continue;
            }
        };

        let occurrences = catch_up(&mut template, reference, &mut || {
            fresh_id(ids, &mut taken)
        });
        if occurrences.is_empty() {
            continue;
        }

        if let Some(last) = template.last_processed {
            record.last_processed_date = Some(format_date(last));
        }
        debug!(
            template = %template.id,
            recurrence = %template.recurrence,
            generated = occurrences.len(),
            watermark = ?template.last_processed,
            "materialized recurring occurrences"
        );
        if occurrences.len() == MAX_CATCH_UP_ITERATIONS {
            let remaining = pending_occurrences(&template, reference);
            if remaining > 0 {
                debug!(
                    template = %template.id,
                    remaining,
                    "catch-up limit reached; template still behind"
                );
            }
        }
        created.extend(occurrences.into_iter().map(TransactionRecord::from));
    }

    let generated = created.len();
    transactions.extend(created);
    MaterializeOutcome {
        transactions,
        generated,
        skipped,
    }
}

/// Advances a single template, returning the occurrences due on or before
/// `reference`, at most [`MAX_CATCH_UP_ITERATIONS`] of them. The template's
/// watermark moves to the date of the last returned occurrence.
pub fn due_occurrences(
    template: &mut RecurringTemplate,
    reference: NaiveDate,
    ids: &dyn IdGenerator,
) -> Vec<Occurrence> {
    catch_up(template, reference, &mut || ids.new_id())
}

/// Date the template would generate next, counted from its watermark.
pub fn next_due_date(template: &RecurringTemplate) -> Option<NaiveDate> {
    template.recurrence.next_date(template.anchor())
}

/// Number of occurrences due on or before `reference` that have not been
/// generated yet, without the per-run cap.
pub fn pending_occurrences(template: &RecurringTemplate, reference: NaiveDate) -> usize {
    let anchor = template.anchor();
    if reference <= anchor {
        return 0;
    }
    let elapsed_days = (reference - anchor).num_days();
    match template.recurrence {
        Recurrence::Daily => elapsed_days as usize,
        Recurrence::Weekly => (elapsed_days / 7) as usize,
        Recurrence::Monthly => {
            let mut count = 0usize;
            let mut cursor = anchor;
            while let Some(due) = Recurrence::Monthly.next_date(cursor) {
                if due > reference {
                    break;
                }
                count += 1;
                cursor = due;
            }
            count
        }
    }
}

/// Describes every interpretable template relative to `reference`.
pub fn snapshot_templates(
    transactions: &[TransactionRecord],
    reference: NaiveDate,
) -> Vec<RecurrenceSnapshot> {
    let mut snapshots: Vec<RecurrenceSnapshot> = transactions
        .iter()
        .filter(|txn| txn.is_template())
        .filter_map(|txn| RecurringTemplate::try_from(txn).ok())
        .map(|template| RecurrenceSnapshot {
            next_due: next_due_date(&template),
            behind: pending_occurrences(&template, reference),
            anchor: template.anchor(),
            recurrence: template.recurrence,
            template_id: template.id,
        })
        .collect();
    snapshots.sort_by(|a, b| {
        a.next_due
            .cmp(&b.next_due)
            .then_with(|| a.template_id.cmp(&b.template_id))
    });
    snapshots
}

fn catch_up(
    template: &mut RecurringTemplate,
    reference: NaiveDate,
    next_id: &mut dyn FnMut() -> String,
) -> Vec<Occurrence> {
    let mut occurrences = Vec::new();
    let mut anchor = template.anchor();
    while occurrences.len() < MAX_CATCH_UP_ITERATIONS {
        let Some(due) = template.recurrence.next_date(anchor) else {
            break;
        };
        if due > reference {
            break;
        }
        occurrences.push(template.occurrence(next_id(), due));
        template.last_processed = Some(due);
        anchor = due;
    }
    occurrences
}

fn fresh_id(ids: &dyn IdGenerator, taken: &mut HashSet<String>) -> String {
    for _ in 0..MAX_ID_ATTEMPTS {
        let candidate = ids.new_id();
        if taken.insert(candidate.clone()) {
            return candidate;
        }
    }
    warn!("id generator kept returning existing ids; falling back to a random uuid");
    let fallback = Uuid::new_v4().to_string();
    taken.insert(fallback.clone());
    fallback
}
