//! Header registry: the ordered, unique set of column names in row 0.
//!
//! Merging is additive so that idempotent re-runs never shift a column that
//! already holds data. Overwriting replaces the header set wholesale.

/// Outcome of planning a header write. `new_cells` holds the header cells
/// that still need to be queued; positions already occupied by the same name
/// produce no write.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderPlan {
    /// The full header list after the write lands.
    pub headers: Vec<String>,
    /// (column index, name) pairs for header cells that must be written.
    pub new_cells: Vec<(usize, String)>,
}

/// Plans a header write against the current header row.
///
/// In merge mode every existing name keeps its column position and each
/// incoming name not already present is appended at the first unused index,
/// preserving incoming order. In overwrite mode the incoming list replaces
/// the header set entirely. Duplicate incoming names are collapsed to their
/// first occurrence; header names stay unique in both modes.
pub fn merge(existing: &[String], incoming: &[String], overwrite: bool) -> HeaderPlan {
    if overwrite {
        let mut headers = Vec::with_capacity(incoming.len());
        let mut new_cells = Vec::with_capacity(incoming.len());
        for name in incoming {
            if headers.iter().any(|h| h == name) {
                continue;
            }
            new_cells.push((headers.len(), name.clone()));
            headers.push(name.clone());
        }
        return HeaderPlan { headers, new_cells };
    }

    let mut headers: Vec<String> = existing.to_vec();
    let mut new_cells = Vec::new();
    for name in incoming {
        if headers.iter().any(|h| h == name) {
            continue;
        }
        new_cells.push((headers.len(), name.clone()));
        headers.push(name.clone());
    }
    HeaderPlan { headers, new_cells }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn merge_appends_unseen_names_after_existing_ones() {
        let plan = merge(&names(&["A", "C"]), &names(&["A", "B"]), false);
        assert_eq!(plan.headers, names(&["A", "C", "B"]));
        assert_eq!(plan.new_cells, vec![(2, "B".to_string())]);
    }

    #[test]
    fn merge_is_idempotent() {
        let first = merge(&names(&["A", "C"]), &names(&["A", "B"]), false);
        let second = merge(&first.headers, &names(&["A", "B"]), false);
        assert_eq!(second.headers, first.headers);
        assert!(second.new_cells.is_empty());
    }

    #[test]
    fn overwrite_replaces_any_prior_header_set() {
        let plan = merge(&names(&["A", "B", "C"]), &names(&["X", "Y"]), true);
        assert_eq!(plan.headers, names(&["X", "Y"]));
        assert_eq!(
            plan.new_cells,
            vec![(0, "X".to_string()), (1, "Y".to_string())]
        );
    }

    #[test]
    fn duplicate_incoming_names_collapse_to_first_occurrence() {
        let plan = merge(&[], &names(&["A", "B", "A"]), false);
        assert_eq!(plan.headers, names(&["A", "B"]));
    }

    #[test]
    fn merge_into_empty_set_writes_every_name() {
        let plan = merge(&[], &names(&["A", "B"]), false);
        assert_eq!(plan.headers, names(&["A", "B"]));
        assert_eq!(plan.new_cells.len(), 2);
    }
}
