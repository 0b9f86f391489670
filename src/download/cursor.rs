//! Pagination cursor of one content stream.
//!
//! Feeds are served newest-first. Page offsets are opaque tokens whose leading number
//! decreases as the stream goes back in time. A stream remembers the highest offset it
//! fully processed (`completed_offset`); the next sync stops at the first page whose
//! offset is at or below that mark.

/// Numeric time component of an offset token.
///
/// Tokens look like `"1700000000:123"`; only the leading digits are significant.
pub fn parse_offset_time(token: &str) -> Option<i64> {
    let token = token.trim();
    let end = token
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(token.len());
    token[..end].parse().ok()
}

/// Position of a stream relative to its previous sync.
#[derive(Debug, Clone, Default)]
pub struct StreamCursor {
    /// End of the previous sync: the stored completed offset.
    end_of_previous: Option<i64>,
    /// First offset observed during this run.
    first_offset: Option<i64>,
    terminal: bool,
}

impl StreamCursor {
    pub fn new(completed_offset: Option<i64>) -> Self {
        Self {
            end_of_previous: completed_offset,
            ..Self::default()
        }
    }

    /// Continue a run interrupted earlier, keeping the first offset it had seen.
    pub fn resumed(completed_offset: Option<i64>, first_offset: Option<i64>) -> Self {
        Self {
            end_of_previous: completed_offset,
            first_offset,
            terminal: false,
        }
    }

    /// Record the offset returned with a page. Returns `true` when the page reaches
    /// content already covered by the previous sync, which ends this run.
    pub fn observe(&mut self, token: Option<&str>) -> bool {
        let parsed = token.and_then(parse_offset_time);
        if let Some(offset) = parsed {
            if self.first_offset.is_none() {
                self.first_offset = Some(offset);
            }
            if matches!(self.end_of_previous, Some(eot) if offset <= eot) {
                self.terminal = true;
            }
        }
        self.terminal
    }

    pub fn first_offset(&self) -> Option<i64> {
        self.first_offset
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_offset_time() {
        assert_eq!(parse_offset_time("1700000000:42"), Some(1_700_000_000));
        assert_eq!(parse_offset_time("123"), Some(123));
        assert_eq!(parse_offset_time(" 77 "), Some(77));
        assert_eq!(parse_offset_time(""), None);
        assert_eq!(parse_offset_time("abc"), None);
        assert_eq!(parse_offset_time(":12"), None);
    }

    #[test]
    fn test_first_sync_never_terminates_early() {
        let mut cursor = StreamCursor::new(None);
        assert!(!cursor.observe(Some("100")));
        assert!(!cursor.observe(Some("50")));
        assert!(!cursor.observe(None));
        assert_eq!(cursor.first_offset(), Some(100));
    }

    #[test]
    fn test_stops_at_previous_end() {
        // Previous sync completed at 50; new content pushed the head to 80.
        let mut cursor = StreamCursor::new(Some(50));
        assert!(!cursor.observe(Some("80:1")));
        assert!(cursor.observe(Some("40:7")));
        assert!(cursor.is_terminal());
        assert_eq!(cursor.first_offset(), Some(80));
    }

    #[test]
    fn test_equal_offset_is_terminal() {
        let mut cursor = StreamCursor::new(Some(100));
        assert!(cursor.observe(Some("100")));
        assert_eq!(cursor.first_offset(), Some(100));
    }

    #[test]
    fn test_unparseable_token_is_ignored() {
        let mut cursor = StreamCursor::new(Some(10));
        assert!(!cursor.observe(Some("next-page")));
        assert_eq!(cursor.first_offset(), None);
        assert!(cursor.observe(Some("5")));
        assert_eq!(cursor.first_offset(), Some(5));
    }

    #[test]
    fn test_resumed_cursor_keeps_first_offset() {
        let mut cursor = StreamCursor::resumed(None, Some(300));
        assert!(!cursor.observe(Some("200")));
        assert_eq!(cursor.first_offset(), Some(300));

        let mut cursor = StreamCursor::resumed(Some(100), None);
        assert!(!cursor.observe(Some("200")));
        assert_eq!(cursor.first_offset(), Some(200));
    }
}
