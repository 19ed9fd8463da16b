//! Missing-token reconciliation
//!
//! Mints that appear in an activity snapshot but never made it into a
//! result set, e.g. after failures or an interrupted run.

use std::path::Path;

use super::result_store::{read_column, StoreError};
use crate::domain::MINT_COLUMN;

/// Snapshot column holding the token mint
pub const ACTIVITY_MINT_COLUMN: &str = "TokenAddress";

/// Sorted mints present in `activities` and absent from `results`
///
/// Both files must exist.
pub fn find_missing_tokens(activities: &Path, results: &Path) -> Result<Vec<String>, StoreError> {
    let activity_mints = read_column(activities, ACTIVITY_MINT_COLUMN)?;
    let result_mints = read_column(results, MINT_COLUMN)?;

    let mut missing: Vec<String> = activity_mints.difference(&result_mints).cloned().collect();
    missing.sort();
    Ok(missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_difference_is_sorted() {
        let dir = TempDir::new().unwrap();
        let activities = dir.path().join("activities.csv");
        let results = dir.path().join("results.csv");
        fs::write(
            &activities,
            "Signature,TokenAddress\ns1,Zeta\ns2,Alpha\ns3,Beta\ns4,Alpha\n",
        )
        .unwrap();
        fs::write(&results, "name,mint\nB,Beta\n").unwrap();

        let missing = find_missing_tokens(&activities, &results).unwrap();

        assert_eq!(missing, vec!["Alpha".to_string(), "Zeta".to_string()]);
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let activities = dir.path().join("activities.csv");
        fs::write(&activities, "TokenAddress\nA\n").unwrap();

        let result = find_missing_tokens(&activities, &dir.path().join("nope.csv"));

        assert!(matches!(result, Err(StoreError::Csv(_))));
    }

    #[test]
    fn test_wrong_columns() {
        let dir = TempDir::new().unwrap();
        let activities = dir.path().join("a.csv");
        let results = dir.path().join("r.csv");
        fs::write(&activities, "Signature\ns1\n").unwrap();
        fs::write(&results, "mint\nA\n").unwrap();

        assert!(matches!(
            find_missing_tokens(&activities, &results),
            Err(StoreError::MissingColumn { column: "TokenAddress", .. })
        ));
    }
}
