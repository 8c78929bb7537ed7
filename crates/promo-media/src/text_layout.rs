//! Title layout for the drawtext overlay.
//!
//! Picks a line count, font size and vertical offset for a product title
//! and wraps it at natural separators. All lengths are counted in `char`s
//! so titles with diacritics are measured the way they are read.

/// Separator placed between wrapped lines. drawtext renders it as a line break.
pub const LINE_BREAK: &str = "\n";

/// How far (in chars) around a chunk boundary to look for a separator.
const SPLIT_SEARCH_RADIUS: usize = 20;

/// Characters per line for [`LayoutStrategy::CharBudget`].
const CHARS_PER_LINE: usize = 40;

/// Line cap for [`LayoutStrategy::CharBudget`].
const MAX_LINES: usize = 4;

/// Resolution class of the video the title is drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidthClass {
    /// 1080 px wide or more.
    Hd,
    Sd,
}

impl WidthClass {
    pub fn from_width(width: u32) -> Self {
        if width >= 1080 {
            Self::Hd
        } else {
            Self::Sd
        }
    }

    pub fn base_font_size(self) -> u32 {
        match self {
            Self::Hd => 48,
            Self::Sd => 36,
        }
    }
}

/// Rule that maps title length to a line count and font scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutStrategy {
    /// One line per 40 chars, up to four lines.
    #[default]
    CharBudget,
    /// Fixed tiers: up to 30 chars on one line, up to 60 on two, else three.
    Tiered,
}

impl LayoutStrategy {
    /// Number of lines for a title of `char_count` characters.
    pub fn line_count(self, char_count: usize) -> usize {
        match self {
            Self::CharBudget => char_count.div_ceil(CHARS_PER_LINE).clamp(1, MAX_LINES),
            Self::Tiered => match char_count {
                0..=30 => 1,
                31..=60 => 2,
                _ => 3,
            },
        }
    }

    fn font_scale(self, lines: usize) -> f64 {
        match (self, lines) {
            (_, 0 | 1) => 1.0,
            (Self::CharBudget, 2) => 0.75,
            (Self::CharBudget, 3) => 0.6,
            (Self::CharBudget, _) => 0.5,
            (Self::Tiered, 2) => 0.8,
            (Self::Tiered, _) => 0.65,
        }
    }
}

/// Computed placement of a title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleLayout {
    /// Wrapped, unescaped text.
    pub text: String,
    pub lines: usize,
    pub fontsize: u32,
    /// Distance of the text box from the top edge, in pixels.
    pub y_offset: u32,
}

impl TitleLayout {
    /// Text escaped for use inside a quoted drawtext `text=` value.
    pub fn escaped_text(&self) -> String {
        escape_drawtext(&self.text)
    }
}

/// Lay out `title` for a video `width` pixels wide.
pub fn layout_title(title: &str, width: u32, strategy: LayoutStrategy) -> TitleLayout {
    let title = title.trim();
    let char_count = title.chars().count();
    let lines = strategy.line_count(char_count);

    let text = if lines > 1 {
        wrap_text(title, lines)
    } else {
        title.to_string()
    };

    let base = WidthClass::from_width(width).base_font_size();
    let fontsize = (f64::from(base) * strategy.font_scale(lines)) as u32;
    let y_offset = if lines > 2 { 40 } else { 60 };

    TitleLayout {
        text,
        lines,
        fontsize,
        y_offset,
    }
}

/// Split `text` into `lines` roughly equal segments joined by [`LINE_BREAK`].
///
/// Each boundary prefers the nearest space, comma or hyphen within
/// [`SPLIT_SEARCH_RADIUS`] chars of the even split point. A space is dropped;
/// a comma or hyphen stays at the end of its line. Without a separator the
/// text is cut at the even split point. A boundary never takes so much that
/// a later line would be empty.
pub fn wrap_text(text: &str, lines: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    if len == 0 {
        return String::new();
    }

    let lines = lines.clamp(1, len);
    if lines == 1 {
        return text.trim().to_string();
    }

    let chunk = len / lines;
    let mut segments = Vec::with_capacity(lines);
    let mut current = 0;

    for boundary in 0..lines - 1 {
        // Leave at least one char for every line still owed.
        let limit = len - (lines - 1 - boundary);
        let target = (current + chunk).min(limit);
        let (end, next) = match find_split(&chars, current, target, limit) {
            Some(pos) if chars[pos] == ' ' => (pos, pos + 1),
            Some(pos) => (pos + 1, pos + 1),
            None => (target, target),
        };
        segments.push(collect_trimmed(&chars[current..end]));
        current = next;
    }
    segments.push(collect_trimmed(&chars[current..]));

    segments.join(LINE_BREAK)
}

fn find_split(chars: &[char], current: usize, target: usize, limit: usize) -> Option<usize> {
    let is_candidate =
        |pos: usize| pos > current && pos < limit && matches!(chars[pos], ' ' | ',' | '-');

    for offset in 0..=SPLIT_SEARCH_RADIUS {
        let after = target + offset;
        if is_candidate(after) {
            return Some(after);
        }
        if let Some(before) = target.checked_sub(offset) {
            if is_candidate(before) {
                return Some(before);
            }
        }
    }
    None
}

fn collect_trimmed(chars: &[char]) -> String {
    chars.iter().collect::<String>().trim().to_string()
}

/// Escape text for a single-quoted drawtext `text=` value.
pub fn escape_drawtext(text: &str) -> String {
    text.replace('\'', r"'\\''")
        .replace(':', r"\:")
        .replace('%', r"\%")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn squash(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn test_short_title_single_line() {
        let title = "x".repeat(40);
        let layout = layout_title(&title, 1080, LayoutStrategy::CharBudget);
        assert_eq!(layout.lines, 1);
        assert_eq!(layout.fontsize, 48);
        assert_eq!(layout.y_offset, 60);
        assert_eq!(layout.text, title);
    }

    #[test]
    fn test_char_budget_scaling() {
        let layout = layout_title(&"word ".repeat(9), 1080, LayoutStrategy::CharBudget);
        // 44 chars after trimming
        assert_eq!(layout.lines, 2);
        assert_eq!(layout.fontsize, 36);

        let layout = layout_title(&"a".repeat(100), 720, LayoutStrategy::CharBudget);
        assert_eq!(layout.lines, 3);
        assert_eq!(layout.fontsize, 21);
        assert_eq!(layout.y_offset, 40);

        let layout = layout_title(&"a".repeat(500), 1080, LayoutStrategy::CharBudget);
        assert_eq!(layout.lines, 4);
        assert_eq!(layout.fontsize, 24);
    }

    #[test]
    fn test_tiered_thresholds() {
        let s = LayoutStrategy::Tiered;
        assert_eq!(s.line_count(30), 1);
        assert_eq!(s.line_count(31), 2);
        assert_eq!(s.line_count(60), 2);
        assert_eq!(s.line_count(61), 3);
        assert_eq!(s.line_count(400), 3);

        let layout = layout_title(&"b".repeat(45), 1080, s);
        assert_eq!(layout.fontsize, 38);
        let layout = layout_title(&"b".repeat(70), 1080, s);
        assert_eq!(layout.fontsize, 31);
    }

    #[test]
    fn test_sd_base_font() {
        assert_eq!(WidthClass::from_width(1079), WidthClass::Sd);
        let layout = layout_title("Short", 720, LayoutStrategy::CharBudget);
        assert_eq!(layout.fontsize, 36);
    }

    #[test]
    fn test_length_counts_chars_not_bytes() {
        // 34 chars, well over 40 bytes
        let title = "Áo Thun Nam Cổ Tròn Phối Màu Đẹp Ạ";
        assert!(title.len() > 40);
        let layout = layout_title(title, 1080, LayoutStrategy::CharBudget);
        assert_eq!(layout.lines, 1);
    }

    #[test]
    fn test_space_at_boundary_is_split_point() {
        assert_eq!(wrap_text("aaaa bbbb", 2), "aaaa\nbbbb");
    }

    #[test]
    fn test_comma_and_hyphen_stay_on_line() {
        assert_eq!(wrap_text("aaa,bbbbb", 2), "aaa,\nbbbbb");
        assert_eq!(wrap_text("aaaa-bbbb", 2), "aaaa-\nbbbb");
    }

    #[test]
    fn test_no_separator_splits_at_target() {
        assert_eq!(wrap_text("abcdefgh", 2), "abcd\nefgh");
    }

    #[test]
    fn test_wrap_produces_requested_lines_and_preserves_text() {
        let title = "Giày Thể Thao Nam Nữ Siêu Nhẹ, Êm Chân - Phong Cách Hàn Quốc Năm 2025 Mới Nhất";
        for lines in 2..=4 {
            let wrapped = wrap_text(title, lines);
            assert_eq!(wrapped.split(LINE_BREAK).count(), lines);
            assert_eq!(squash(&wrapped), squash(title));
        }
    }

    #[test]
    fn test_far_separator_leaves_text_for_last_line() {
        // The first split lands 20 chars past its target, so the second
        // boundary has to stop short of the end.
        let title = format!("{} {}", "a".repeat(40), "b".repeat(20));
        let layout = layout_title(&title, 1080, LayoutStrategy::Tiered);
        assert_eq!(layout.lines, 3);

        let segments: Vec<&str> = layout.text.split(LINE_BREAK).collect();
        assert_eq!(
            segments,
            vec!["a".repeat(40), "b".repeat(19), "b".to_string()]
        );
        assert!(segments.iter().all(|s| !s.is_empty()));
    }

    #[test]
    fn test_lines_clamped_to_char_count() {
        assert_eq!(wrap_text("ab", 4), "a\nb");
        assert_eq!(wrap_text("", 3), "");
    }

    #[test]
    fn test_escape_drawtext() {
        assert_eq!(escape_drawtext("It's 50% off: now"), r"It'\\''s 50\% off\: now");
    }
}
