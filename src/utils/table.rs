use serde::Serialize;

/// Rows that can be matched by the table search box.
pub trait Searchable {
    /// The text fields the search box looks at.
    fn search_fields(&self) -> Vec<&str>;

    fn matches(&self, term: &str) -> bool {
        let needle = term.trim().to_lowercase();
        needle.is_empty()
            || self
                .search_fields()
                .into_iter()
                .any(|field| field.to_lowercase().contains(&needle))
    }
}

pub fn search<T: Searchable>(rows: Vec<T>, term: &str) -> Vec<T> {
    rows.into_iter().filter(|row| row.matches(term)).collect()
}

/// One page of a filtered table plus what the pager needs to render.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub rows: Vec<T>,
    pub page: usize,
    pub total_pages: usize,
    pub total: usize,
    /// 1-based index of the first row shown, 0 when empty.
    pub from: usize,
    pub to: usize,
    pub has_prev: bool,
    pub has_next: bool,
    pub prev_page: usize,
    pub next_page: usize,
}

pub fn paginate<T>(rows: Vec<T>, requested: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total = rows.len();
    let total_pages = total.div_ceil(page_size);
    let page = requested.clamp(1, total_pages.max(1));

    let start = (page - 1) * page_size;
    let rows: Vec<T> = rows.into_iter().skip(start).take(page_size).collect();
    let from = if rows.is_empty() { 0 } else { start + 1 };
    let to = start + rows.len();

    Page {
        rows,
        page,
        total_pages,
        total,
        from,
        to,
        has_prev: page > 1,
        has_next: page < total_pages,
        prev_page: page.saturating_sub(1).max(1),
        next_page: (page + 1).min(total_pages.max(1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Row {
        name: String,
        company: String,
    }

    impl Searchable for Row {
        fn search_fields(&self) -> Vec<&str> {
            vec![self.name.as_str(), self.company.as_str()]
        }
    }

    fn row(name: &str, company: &str) -> Row {
        Row {
            name: name.to_string(),
            company: company.to_string(),
        }
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let rows = vec![row("Olivia", "Acme Inc."), row("Jackson", "Globex")];
        let found = search(rows, "acme");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].company, "Acme Inc.");
    }

    #[test]
    fn blank_search_keeps_everything() {
        let rows = vec![row("a", "b"), row("c", "d")];
        assert_eq!(search(rows, "  ").len(), 2);
    }

    #[test]
    fn last_page_of_twenty_three_rows() {
        let rows: Vec<usize> = (0..23).collect();
        let page = paginate(rows, 3, 10);
        assert_eq!(page.rows, vec![20, 21, 22]);
        assert_eq!(page.total_pages, 3);
        assert_eq!((page.from, page.to, page.total), (21, 23, 23));
        assert!(page.has_prev);
        assert!(!page.has_next);
    }

    #[test]
    fn page_index_is_clamped() {
        let rows: Vec<usize> = (0..23).collect();
        assert_eq!(paginate(rows.clone(), 9, 10).page, 3);
        assert_eq!(paginate(rows, 0, 10).page, 1);
    }

    #[test]
    fn empty_table_stays_on_page_one() {
        let page = paginate(Vec::<usize>::new(), 4, 10);
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 0);
        assert_eq!((page.from, page.to), (0, 0));
        assert!(!page.has_prev && !page.has_next);
    }
}
