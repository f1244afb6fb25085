//! Merging extracted document data into an existing discovery record.
//!
//! Imports never silently overwrite user text: long-form fields are
//! concatenated, short fields only take a new value when one was found.

use crate::models::DiscoveryRecord;

/// Number of leading characters of new text used for the duplicate check.
const DUPLICATE_PREFIX_CHARS: usize = 50;

/// Separator placed between existing and appended text.
pub const SEPARATOR: &str = "\n\n";

/// Combine two versions of a free-text field.
///
/// Returns `existing` when `new` is empty or when the first 50 characters of
/// `new` already occur in `existing` (case-insensitive); returns `new` when
/// `existing` is empty; otherwise appends `new` after a blank line.
pub fn combine(existing: &str, new: &str) -> String {
    if existing.is_empty() {
        return new.to_string();
    }
    if new.is_empty() {
        return existing.to_string();
    }

    let prefix: String = new
        .chars()
        .take(DUPLICATE_PREFIX_CHARS)
        .collect::<String>()
        .to_lowercase();
    if existing.to_lowercase().contains(&prefix) {
        return existing.to_string();
    }

    format!("{existing}{SEPARATOR}{new}")
}

fn prefer_new(existing: &str, new: &str) -> String {
    if new.is_empty() {
        existing.to_string()
    } else {
        new.to_string()
    }
}

/// Merge an extracted record into the working record.
pub fn merge_discovery(existing: &DiscoveryRecord, extracted: &DiscoveryRecord) -> DiscoveryRecord {
    DiscoveryRecord {
        company_name: prefer_new(&existing.company_name, &extracted.company_name),
        industry: prefer_new(&existing.industry, &extracted.industry),
        business_context: combine(&existing.business_context, &extracted.business_context),
        current_challenges: combine(&existing.current_challenges, &extracted.current_challenges),
        strategic_goals: combine(&existing.strategic_goals, &extracted.strategic_goals),
        technical_landscape: combine(
            &existing.technical_landscape,
            &extracted.technical_landscape,
        ),
        constraints: combine(&existing.constraints, &extracted.constraints),
        timeline: prefer_new(&existing.timeline, &extracted.timeline),
        budget: prefer_new(&existing.budget, &extracted.budget),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_new_keeps_existing() {
        assert_eq!(combine("existing text", ""), "existing text");
    }

    #[test]
    fn empty_existing_takes_new() {
        assert_eq!(combine("", "new text"), "new text");
        assert_eq!(combine("", ""), "");
    }

    #[test]
    fn duplicate_prefix_is_skipped() {
        let existing = "We operate FIVE plants across Ohio and Michigan with 2,000 staff.";
        let new = "we operate five plants across ohio and michigan with 2,000 staff. Also more.";
        assert_eq!(combine(existing, new), existing);
    }

    #[test]
    fn distinct_text_is_appended() {
        assert_eq!(combine("first", "second"), "first\n\nsecond");
    }

    #[test]
    fn prefix_check_uses_first_fifty_chars_only() {
        let existing = "x".repeat(50);
        let new = format!("{}{}", "x".repeat(50), "tail that is not present");
        assert_eq!(combine(&existing, &new), existing);
    }

    #[test]
    fn merge_prefers_new_short_fields_and_combines_long_ones() {
        let existing = DiscoveryRecord {
            company_name: "Acme".into(),
            industry: "Manufacturing".into(),
            business_context: "Makes widgets.".into(),
            timeline: "12 months".into(),
            ..Default::default()
        };
        let extracted = DiscoveryRecord {
            company_name: "Acme Corp".into(),
            business_context: "Sells through dealers.".into(),
            budget: "$2M".into(),
            ..Default::default()
        };
        let merged = merge_discovery(&existing, &extracted);
        assert_eq!(merged.company_name, "Acme Corp");
        assert_eq!(merged.industry, "Manufacturing");
        assert_eq!(
            merged.business_context,
            "Makes widgets.\n\nSells through dealers."
        );
        assert_eq!(merged.timeline, "12 months");
        assert_eq!(merged.budget, "$2M");
    }
}
