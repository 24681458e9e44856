use crate::types::AnomalyRecord;

/// Maximum number of alerts reported per run
pub const MAX_ALERTS: usize = 3;

/// Top `k` records by percentage increase, highest first.
/// The sort is stable, so equal increases keep detection order.
pub fn rank(records: &[AnomalyRecord], k: usize) -> Vec<AnomalyRecord> {
    let mut ranked = records.to_vec();
    ranked.sort_by(|a, b| b.percentage_increase.total_cmp(&a.percentage_increase));
    ranked.truncate(k);
    ranked
}
