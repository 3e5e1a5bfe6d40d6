//! Message of the day sizing.

use crate::defaults::MAX_MOTD_LENGTH;

/// Truncates a message of the day so it fits [`MAX_MOTD_LENGTH`] once the
/// trailing NUL is appended.
///
/// Longer messages are cut, never rejected. The cut lands on a character
/// boundary, so the result may be a few bytes shorter than the limit when a
/// multi-byte character straddles it.
#[must_use]
pub fn truncate_motd(motd: &str) -> String {
    let limit = MAX_MOTD_LENGTH.saturating_sub(1);
    if motd.len() <= limit {
        return motd.to_owned();
    }
    let mut end = limit;
    while !motd.is_char_boundary(end) {
        end -= 1;
    }
    motd.get(..end).unwrap_or_default().to_owned()
}
