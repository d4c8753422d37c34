/// Hands out table ids from a counter.
///
/// Ids are decimal strings. The counter never goes back, so an id is not
/// handed out twice, even after the table holding it was deleted. When a
/// store is reopened, allocation resumes above the highest numeric id found
/// in the snapshot; ids that do not parse as numbers are left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdAllocator {
    next: u64,
}

impl Default for IdAllocator {
    fn default() -> Self {
        IdAllocator { next: 1 }
    }
}

impl IdAllocator {
    pub fn resume_after<'a>(existing: impl IntoIterator<Item = &'a str>) -> Self {
        let next = existing
            .into_iter()
            .filter_map(|id| id.parse::<u64>().ok())
            .max()
            .map_or(1, |highest| highest.saturating_add(1));
        IdAllocator { next }
    }

    pub fn allocate(&mut self) -> String {
        let id = self.next;
        self.next = self.next.saturating_add(1);
        id.to_string()
    }
}
