//! Page → curriculum module resolution.

use serde::Serialize;

use crate::error::ModuleConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurriculumModule {
    pub id: i64,
    pub course_id: i64,
    pub order: u32,
    pub name: String,
    pub page_start: Option<u32>,
    pub page_end: Option<u32>,
}

#[derive(Debug, Clone)]
struct Interval {
    start: u32,
    end: u32,
    module: CurriculumModule,
}

/// Non-overlapping, inclusive page intervals sorted by first page. Modules
/// without both bounds are kept out and never match.
#[derive(Debug, Clone, Default)]
pub struct ModuleMap {
    intervals: Vec<Interval>,
}

impl ModuleMap {
    pub fn new(modules: Vec<CurriculumModule>) -> Result<Self, ModuleConfigError> {
        let mut intervals = Vec::with_capacity(modules.len());
        for module in modules {
            let (Some(start), Some(end)) = (module.page_start, module.page_end) else {
                continue;
            };
            if start > end {
                return Err(ModuleConfigError::InvertedRange {
                    name: module.name,
                    start,
                    end,
                });
            }
            intervals.push(Interval { start, end, module });
        }

        // Stable sort: equal starts keep configuration order for the error message.
        intervals.sort_by_key(|i| i.start);
        for pair in intervals.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if b.start <= a.end {
                return Err(ModuleConfigError::Overlap {
                    first: a.module.name.clone(),
                    second: b.module.name.clone(),
                    page: b.start,
                });
            }
        }

        Ok(ModuleMap { intervals })
    }

    pub fn resolve(&self, page: u32) -> Option<&CurriculumModule> {
        let idx = self.intervals.partition_point(|i| i.start <= page);
        let candidate = self.intervals.get(idx.checked_sub(1)?)?;
        (page <= candidate.end).then_some(&candidate.module)
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }
}
