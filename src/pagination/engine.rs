//! Page traversal strategies.
//!
//! Every strategy receives a page fetch function `(page, per_page) ->
//! (items, response)` and never builds requests itself. `page` is clamped to
//! at least 1 and `per_page` into `[1, 100]` before the first call.
//!
//! Errors returned by the fetch function are passed through untouched when
//! they carry a known classification (see [`GitHubError::is_known`]); anything
//! else is wrapped in a `Pagination` error naming the page that failed.

use super::{clamp_page, clamp_per_page, LinkHeaderInfo};
use crate::client::ResponseMeta;
use crate::errors::{GitHubError, GitHubResult};
use crate::observability::TracingHooks;
use futures::future::try_join_all;
use std::future::Future;

type PageResult<T> = GitHubResult<(Vec<T>, ResponseMeta)>;

/// Fetches every page and returns the items in page order.
///
/// The first page is fetched alone. If its response has no Link header it is
/// the only page. Otherwise every remaining page up to the `last` relation is
/// requested concurrently and the results are concatenated by page number,
/// independent of completion order.
pub async fn get_all_data<T, F, Fut>(fetch: F, page: u32, per_page: u32) -> GitHubResult<Vec<T>>
where
    F: Fn(u32, u32) -> Fut,
    Fut: Future<Output = PageResult<T>>,
{
    let page = clamp_page(page);
    let per_page = clamp_per_page(per_page);

    let (mut items, response) = fetch_page(&fetch, page, per_page).await?;

    let Some(links) = LinkHeaderInfo::from_response(&response) else {
        return Ok(items);
    };

    if links.total_pages <= page {
        return Ok(items);
    }

    TracingHooks::on_pages_discovered(page, links.total_pages, per_page);

    let rest = try_join_all(
        (page + 1..=links.total_pages).map(|next| fetch_page(&fetch, next, per_page)),
    )
    .await?;

    for (page_items, _) in rest {
        items.extend(page_items);
    }

    Ok(items)
}

/// Fetches pages until `predicate` holds for one page's items and returns
/// that page.
///
/// After the first page, the remaining pages are split by
/// [`split_search_groups`] into a forward half and a backward half. Each step
/// requests one page from each half concurrently, waits for both, then checks
/// the forward result before the backward one. The returned page is a
/// matching page, not necessarily the lowest-numbered one. An empty vector
/// means no page matched.
pub async fn get_all_data_until<T, F, Fut, P>(
    fetch: F,
    page: u32,
    per_page: u32,
    predicate: P,
) -> GitHubResult<Vec<T>>
where
    F: Fn(u32, u32) -> Fut,
    Fut: Future<Output = PageResult<T>>,
    P: Fn(&[T]) -> bool,
{
    let page = clamp_page(page);
    let per_page = clamp_per_page(per_page);

    let (items, response) = fetch_page(&fetch, page, per_page).await?;
    if predicate(&items) {
        TracingHooks::on_predicate_matched(page, 1);
        return Ok(items);
    }

    let Some(links) = LinkHeaderInfo::from_response(&response) else {
        return Ok(Vec::new());
    };

    let (forward, backward) = split_search_groups(page, links.total_pages);
    let steps = forward.len().max(backward.len());
    let mut requested = 1;

    for step in 0..steps {
        let ahead = forward.get(step).copied();
        let behind = backward.get(step).copied();
        requested += usize::from(ahead.is_some()) + usize::from(behind.is_some());

        let (ahead_result, behind_result) = futures::join!(
            fetch_optional(&fetch, ahead, per_page),
            fetch_optional(&fetch, behind, per_page),
        );

        for (number, result) in [(ahead, ahead_result), (behind, behind_result)] {
            if let Some((items, _)) = result? {
                if predicate(&items) {
                    TracingHooks::on_predicate_matched(number.unwrap_or_default(), requested);
                    return Ok(items);
                }
            }
        }
    }

    Ok(Vec::new())
}

/// Fetches every page, then keeps the items for which `filter` returns true.
pub async fn get_all_filtered_data<T, F, Fut, P>(
    fetch: F,
    page: u32,
    per_page: u32,
    mut filter: P,
) -> GitHubResult<Vec<T>>
where
    F: Fn(u32, u32) -> Fut,
    Fut: Future<Output = PageResult<T>>,
    P: FnMut(&T) -> bool,
{
    let items = get_all_data(fetch, page, per_page).await?;
    Ok(items.into_iter().filter(|item| filter(item)).collect())
}

/// Splits the pages after `first_page` into the two search orders used by
/// [`get_all_data_until`].
///
/// The range `first_page..=total_pages` is halved; the first half is scanned
/// ascending and the second half descending from the last page, and
/// `first_page` itself is dropped because it has already been fetched.
pub fn split_search_groups(first_page: u32, total_pages: u32) -> (Vec<u32>, Vec<u32>) {
    if total_pages <= first_page {
        return (Vec::new(), Vec::new());
    }

    let len = total_pages - first_page + 1;
    let boundary = first_page + len.div_ceil(2);

    let forward = (first_page + 1..boundary).collect();
    let backward = (boundary..=total_pages).rev().collect();

    (forward, backward)
}

async fn fetch_page<T, F, Fut>(fetch: &F, page: u32, per_page: u32) -> PageResult<T>
where
    F: Fn(u32, u32) -> Fut,
    Fut: Future<Output = PageResult<T>>,
{
    fetch(page, per_page).await.map_err(|error| {
        if error.is_known() {
            error
        } else {
            GitHubError::pagination(format!("Failed to fetch page {}", page), error)
        }
    })
}

async fn fetch_optional<T, F, Fut>(
    fetch: &F,
    page: Option<u32>,
    per_page: u32,
) -> GitHubResult<Option<(Vec<T>, ResponseMeta)>>
where
    F: Fn(u32, u32) -> Fut,
    Fut: Future<Output = PageResult<T>>,
{
    match page {
        Some(page) => fetch_page(fetch, page, per_page).await.map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(1, 0, vec![], vec![]; "no link information")]
    #[test_case(1, 1, vec![], vec![]; "single page")]
    #[test_case(1, 2, vec![], vec![2]; "two pages")]
    #[test_case(1, 3, vec![2], vec![3]; "three pages")]
    #[test_case(1, 4, vec![2], vec![4, 3]; "four pages")]
    #[test_case(1, 5, vec![2, 3], vec![5, 4]; "five pages")]
    #[test_case(1, 8, vec![2, 3, 4], vec![8, 7, 6, 5]; "eight pages")]
    #[test_case(3, 6, vec![4], vec![6, 5]; "later start page")]
    fn test_split_search_groups(first: u32, total: u32, forward: Vec<u32>, backward: Vec<u32>) {
        assert_eq!(split_search_groups(first, total), (forward, backward));
    }

    #[test]
    fn test_split_covers_every_remaining_page_once() {
        for total in 1..40 {
            let (forward, backward) = split_search_groups(1, total);
            let mut all: Vec<u32> = forward.into_iter().chain(backward).collect();
            all.sort_unstable();
            assert_eq!(all, (2..=total).collect::<Vec<_>>());
        }
    }
}
