use serde::Serialize;

use crate::PAGE_SIZE;

/// A page of store results together with the size of the whole matching set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

/// Navigation info for a paginated listing. `prev`/`next` are `None` at the edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pager {
    pub page: u32,
    pub page_count: u32,
    pub total: i64,
    pub prev: Option<u32>,
    pub next: Option<u32>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64) -> Self {
        Self { items, total }
    }

    pub fn pager(&self, page: u32) -> Pager {
        Pager::new(page, self.total)
    }
}

impl Pager {
    pub fn new(page: u32, total: i64) -> Self {
        let total = total.max(0);
        let page_count = ((total as u64 + PAGE_SIZE as u64 - 1) / PAGE_SIZE as u64) as u32;
        let page = page.max(1);
        Self {
            page,
            page_count,
            total,
            prev: (page > 1).then(|| page - 1),
            next: (page < page_count).then(|| page + 1),
        }
    }
}
