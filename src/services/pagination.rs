//! Homepage pagination
//!
//! The homepage shows a growing prefix of all posts. The `load_more` query
//! parameter carries how many posts the reader has already seen; each click on
//! the continuation link asks for one more page on top of that.

/// Sentinel href rendered when there is nothing more to load
pub const NO_MORE_LINK: &str = "#";

/// Error returned for a `load_more` value that is not a plain digit string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaginationError {
    #[error("Invalid load_more value: {0:?}")]
    BadRequest(String),
}

/// How many posts to render and where the "load more" link points
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageWindow {
    /// Number of posts to request from the start of the list
    pub size: usize,
    /// `/?load_more=<size>` while posts remain, `None` once everything is shown
    pub next_link: Option<String>,
}

impl PageWindow {
    /// The href for the continuation link, `#` when exhausted
    pub fn href(&self) -> &str {
        self.next_link.as_deref().unwrap_or(NO_MORE_LINK)
    }
}

/// Compute the window for `total` posts given the raw `load_more` parameter.
///
/// An absent or empty value yields the first page. A value made only of ASCII
/// digits is an offset; the window is that offset plus one page, saturating on
/// overflow. Anything else is rejected.
pub fn paginate(
    total: usize,
    load_more: Option<&str>,
    per_page: usize,
) -> Result<PageWindow, PaginationError> {
    let size = match load_more {
        None | Some("") => per_page,
        Some(raw) if raw.bytes().all(|b| b.is_ascii_digit()) => {
            parse_offset(raw).saturating_add(per_page)
        }
        Some(raw) => return Err(PaginationError::BadRequest(raw.to_string())),
    };

    let next_link = (size < total).then(|| format!("/?load_more={}", size));

    Ok(PageWindow { size, next_link })
}

/// Parse a non-empty digit string, saturating at `usize::MAX`
fn parse_offset(digits: &str) -> usize {
    digits.bytes().fold(0usize, |acc, b| {
        acc.saturating_mul(10).saturating_add(usize::from(b - b'0'))
    })
}
