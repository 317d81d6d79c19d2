//! Pure single-line layout of progress display fields.
//!
//! Widths are measured in terminal display columns, not raw characters, so
//! wide (CJK) item names line up correctly.

use console::measure_text_width;

/// Item labels default to this many display columns.
pub const DEFAULT_ITEM_WIDTH: usize = 20;

/// Which end of an item label survives truncation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemSlice {
    /// Keep the beginning, truncate from the right (`item`, `item+N`).
    Beginning,
    /// Keep the end, truncate from the left (`item-N`).
    End,
}

/// One display field parsed from the configured `format` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Topic,
    Number,
    Bar,
    Unit,
    Estimate,
    Speed,
    Item { width: usize, slice: ItemSlice },
}

impl Field {
    /// Parse one entry of the `format` config list. Unknown names yield
    /// `None` and are skipped.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "topic" => Some(Self::Topic),
            "number" => Some(Self::Number),
            "bar" => Some(Self::Bar),
            "unit" => Some(Self::Unit),
            "estimate" => Some(Self::Estimate),
            "speed" => Some(Self::Speed),
            _ => {
                let rest = name.strip_prefix("item")?;
                if rest.is_empty() {
                    return Some(Self::Item {
                        width: DEFAULT_ITEM_WIDTH,
                        slice: ItemSlice::Beginning,
                    });
                }
                if let Some(width) = rest.strip_prefix('-') {
                    return Some(Self::Item {
                        width: width.parse().ok()?,
                        slice: ItemSlice::End,
                    });
                }
                if let Some(width) = rest.strip_prefix('+') {
                    return Some(Self::Item {
                        width: width.parse().ok()?,
                        slice: ItemSlice::Beginning,
                    });
                }
                None
            }
        }
    }

    /// Parse a whole format list, dropping entries that don't name a field.
    pub fn parse_order(names: &[String]) -> Vec<Self> {
        names.iter().filter_map(|n| Self::parse(n)).collect()
    }
}

/// Snapshot of everything the renderer may show for one topic.
#[derive(Debug)]
pub struct FieldValues<'a> {
    pub topic: &'a str,
    pub pos: f64,
    pub item: &'a str,
    pub unit: &'a str,
    pub total: Option<u64>,
    pub estimate: &'a str,
    pub speed: &'a str,
}

/// Lay out one line of at most `width` display columns.
///
/// Fields before the `bar` field join the head segment, fields after it the
/// tail; the bar absorbs whatever width the segments leave over. The
/// indeterminate marker advances `indet_count` once per indeterminate render
/// so it bounces across successive calls.
pub(crate) fn render_line(
    fields: &[Field],
    width: usize,
    v: &FieldValues<'_>,
    indet_count: &mut u64,
) -> String {
    let mut head = String::new();
    let mut tail = String::new();
    let mut need_bar = false;

    for field in fields {
        let add = match field {
            Field::Topic => v.topic.to_string(),
            Field::Number => number_field(v.pos, v.total),
            Field::Bar => {
                need_bar = true;
                String::new()
            }
            Field::Unit => v.unit.to_string(),
            Field::Estimate => v.estimate.to_string(),
            Field::Speed => v.speed.to_string(),
            Field::Item { width, slice } => item_field(v.item, *width, *slice),
        };
        let segment = if need_bar { &mut tail } else { &mut head };
        space_join(segment, &add);
    }

    let out = if need_bar {
        let mut used = 0;
        if !head.is_empty() {
            used += measure_text_width(&head) + 1;
        }
        if !tail.is_empty() {
            used += measure_text_width(&tail) + 1;
        }
        // 3 columns for the brackets and surrounding padding
        let prog_width = width.saturating_sub(used + 3);
        let bar = match v.total {
            Some(total) if total > 0 && v.pos <= total as f64 => {
                determinate_fill(v.pos, total, prog_width)
            }
            _ => {
                *indet_count += 1;
                indeterminate_fill(*indet_count, prog_width.saturating_sub(3))
            }
        };
        let mut out = head;
        space_join(&mut out, &format!("[{bar}]"));
        space_join(&mut out, &tail);
        out
    } else {
        let mut out = head;
        space_join(&mut out, &tail);
        out
    };

    // final safety clamp to the terminal width
    console::truncate_str(&out, width, "").into_owned()
}

/// `===>   ` style fill. The caret occupies the last filled column, so a
/// fill of zero renders no caret at all.
fn determinate_fill(pos: f64, total: u64, width: usize) -> String {
    let amt = ((pos * width as f64) / total as f64).floor() as usize;
    let amt = amt.min(width);
    let mut bar = String::with_capacity(width);
    if amt > 0 {
        bar.push_str(&"=".repeat(amt - 1));
        bar.push('>');
    }
    bar.push_str(&" ".repeat(width - amt));
    bar
}

/// Bouncing `<=>` marker for unknown totals. The count is taken mod twice
/// the width so the cursor sweeps right and back left.
fn indeterminate_fill(count: u64, width: usize) -> String {
    if width == 0 {
        return "<=>".to_string();
    }
    let amt = (count % (2 * width as u64)) as i64 - width as i64;
    let offset = amt.unsigned_abs() as usize;
    format!("{}<=>{}", " ".repeat(width - offset), " ".repeat(offset))
}

fn number_field(pos: f64, total: Option<u64>) -> String {
    match total {
        Some(total) if total > 0 => {
            let digits = total.to_string().len();
            format!("{:>digits$}/{total}", fmt_value(pos))
        }
        _ => fmt_value(pos),
    }
}

/// Positions are integral for bars and fractional seconds for spinners.
pub(crate) fn fmt_value(pos: f64) -> String {
    if pos.fract() == 0.0 {
        format!("{}", pos as i64)
    } else {
        format!("{pos:.1}")
    }
}

fn item_field(item: &str, width: usize, slice: ItemSlice) -> String {
    if item.is_empty() {
        return String::new();
    }
    let trimmed = match slice {
        ItemSlice::Beginning => console::truncate_str(item, width, "").into_owned(),
        ItemSlice::End => keep_end_cols(item, width).to_string(),
    };
    let used = measure_text_width(&trimmed);
    format!("{trimmed}{}", " ".repeat(width.saturating_sub(used)))
}

/// Longest suffix of `s` that fits in `width` display columns.
fn keep_end_cols(s: &str, width: usize) -> &str {
    if measure_text_width(s) <= width {
        return s;
    }
    for (idx, _) in s.char_indices().skip(1) {
        let tail = &s[idx..];
        if measure_text_width(tail) <= width {
            return tail;
        }
    }
    ""
}

fn space_join(out: &mut String, add: &str) {
    if add.is_empty() {
        return;
    }
    if !out.is_empty() {
        out.push(' ');
    }
    out.push_str(add);
}
