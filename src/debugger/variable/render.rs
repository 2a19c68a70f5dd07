use crate::debugger::error::Error;
use itertools::Itertools;

/// Placeholder for children that are not rendered.
pub const ELLIPSIS: &str = "...";

/// Render at most `cap` of `count` items as a bracketed, comma-separated list.
/// If some items are cut off, a trailing ellipsis marker is appended.
///
/// Items are rendered in ascending index order, first error stops the rendering.
pub fn bounded_list(
    count: usize,
    cap: usize,
    mut render_item: impl FnMut(usize) -> Result<String, Error>,
) -> Result<String, Error> {
    let items = (0..count.min(cap))
        .map(&mut render_item)
        .collect::<Result<Vec<_>, _>>()?;
    let tail = (count > cap).then(|| ELLIPSIS.to_string());
    Ok(format!("[{}]", items.into_iter().chain(tail).join(", ")))
}
