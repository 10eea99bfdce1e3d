//! Page-sampling heuristic
//!
//! Decides whether a paginated collection holds at least `minimum` items
//! without always walking every page. Counting stops at the first short page
//! (nothing can follow it) or as soon as the running total exceeds `minimum`.

use async_trait::async_trait;
use log::trace;

use crate::github::ApiResult;

/// A paginated collection that can report the size of any 1-based page
#[async_trait]
pub trait PageSource: Send {
    async fn fetch_page(&mut self, page: u32) -> ApiResult<usize>;
}

pub struct PageSampler;

impl PageSampler {
    /// Lower bound on the collection size, exact whenever it is below `minimum`
    pub async fn count_at_least<S>(source: &mut S, probe_size: usize, minimum: usize) -> ApiResult<usize>
    where
        S: PageSource + ?Sized,
    {
        let mut retrieved = 0;
        let mut page = 1;

        loop {
            let size = source.fetch_page(page).await?;
            retrieved += size;
            trace!("Sampled page {}: {} items, {} so far", page, size, retrieved);

            if size < probe_size || retrieved > minimum {
                return Ok(retrieved);
            }
            page += 1;
        }
    }
}
