use crate::table::Value;

// Cells bigger than this are cut before rendering. Purely a render-cost
// bound for pathological blob/string fields.
const MAX_CELL_CHARS: usize = 200;
const TRUNCATION_MARKER: &str = "...";

/// Display category of a column. One kind per column, fixed by the file
/// structure; kinds only affect formatting, never storage or sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Plain,
    Hash,
    Data,
    BitMask,
    Money,
}

/// Gold/silver/copper decomposition of a copper amount.
fn price(amount: i64) -> (i64, i64, i64) {
    if amount <= 0 {
        return (0, 0, 0);
    }
    let g = amount / 10000;
    let s = (amount / 100) % 100;
    let c = amount % 100;
    (g, s, c)
}

fn format_money(amount: i64) -> String {
    let (g, s, c) = price(amount);
    let mut out = String::new();
    if g != 0 {
        out.push_str(&format!("{g}g"));
    }
    if s != 0 {
        out.push_str(&format!("{s}s"));
    }
    if c != 0 {
        out.push_str(&format!("{c}c"));
    }
    if out.is_empty() {
        out.push_str("0c");
    }
    out
}

fn hex_lower(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

fn truncate_cell(cell: String) -> String {
    if cell.chars().count() > MAX_CELL_CHARS {
        let mut cut: String = cell.chars().take(MAX_CELL_CHARS).collect();
        cut.push_str(TRUNCATION_MARKER);
        cut
    } else {
        cell
    }
}

/// Map a raw cell value to its display string. Returns None for cells that
/// render as nothing (absent values, null bitmasks). Money is the only kind
/// that renders something for a null cell ("0c" for an empty price).
pub fn format_cell(value: &Value, kind: FieldKind) -> Option<String> {
    let cell = match (kind, value) {
        (FieldKind::Hash | FieldKind::Data, Value::Bytes(b)) => hex_lower(b),
        (FieldKind::BitMask, Value::Null) => return None,
        (FieldKind::BitMask, v) => format!("0x{:08x}", v.as_int().unwrap_or(0) as u32),
        (FieldKind::Money, v) => format_money(v.as_int().unwrap_or(0)),
        (_, Value::Null) => return None,
        (_, v) => v.to_string(),
    };
    Some(truncate_cell(cell))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_data_fields_render_as_lowercase_hex() {
        let v = Value::Bytes(vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(format_cell(&v, FieldKind::Hash).unwrap(), "deadbeef");
        assert_eq!(format_cell(&v, FieldKind::Data).unwrap(), "deadbeef");
        assert_eq!(
            format_cell(&Value::Bytes(vec![0x00, 0x0f]), FieldKind::Hash).unwrap(),
            "000f"
        );
    }

    #[test]
    fn bitmask_pads_to_eight_digits() {
        assert_eq!(
            format_cell(&Value::Int(0x1f), FieldKind::BitMask).unwrap(),
            "0x0000001f"
        );
        assert_eq!(
            format_cell(&Value::Int(0), FieldKind::BitMask).unwrap(),
            "0x00000000"
        );
        // Values wrap at 32 bits
        assert_eq!(
            format_cell(&Value::Int(0x1_0000_0001), FieldKind::BitMask).unwrap(),
            "0x00000001"
        );
    }

    #[test]
    fn null_bitmask_is_not_formatted() {
        assert_eq!(format_cell(&Value::Null, FieldKind::BitMask), None);
    }

    #[test]
    fn money_vectors() {
        for (amount, expected) in [
            (0, "0c"),
            (50, "50c"),
            (150, "1s50c"),
            (10250, "1g2s50c"),
            (123456, "12g34s56c"),
        ] {
            assert_eq!(
                format_cell(&Value::Int(amount), FieldKind::Money).unwrap(),
                expected,
                "amount {amount}"
            );
        }
    }

    #[test]
    fn empty_price_renders_zero_copper() {
        assert_eq!(format_cell(&Value::Null, FieldKind::Money).unwrap(), "0c");
        assert_eq!(format_cell(&Value::Int(-5), FieldKind::Money).unwrap(), "0c");
    }

    #[test]
    fn price_decomposition_roundtrips() {
        for amount in [1, 99, 100, 9999, 10000, 123456, 98765432] {
            let (g, s, c) = price(amount);
            assert_eq!(amount, g * 10000 + s * 100 + c);
            assert!((0..100).contains(&s));
            assert!((0..100).contains(&c));
        }
    }

    #[test]
    fn long_cells_are_truncated_after_formatting() {
        let long = Value::Str("x".repeat(500));
        let cell = format_cell(&long, FieldKind::Plain).unwrap();
        assert_eq!(cell.len(), 203);
        assert!(cell.ends_with("..."));

        // A 150-byte blob is 300 hex chars, over the cap
        let blob = Value::Bytes(vec![0xab; 150]);
        let cell = format_cell(&blob, FieldKind::Hash).unwrap();
        assert_eq!(cell.len(), 203);
        assert!(cell.starts_with("abab"));
        assert!(cell.ends_with("..."));
    }

    #[test]
    fn cells_at_the_cap_are_left_alone() {
        let v = Value::Str("y".repeat(200));
        assert_eq!(format_cell(&v, FieldKind::Plain).unwrap().len(), 200);
    }

    #[test]
    fn plain_uses_default_string_form() {
        assert_eq!(format_cell(&Value::Int(42), FieldKind::Plain).unwrap(), "42");
        assert_eq!(
            format_cell(&Value::Str("Hogger".into()), FieldKind::Plain).unwrap(),
            "Hogger"
        );
        assert_eq!(format_cell(&Value::Null, FieldKind::Plain), None);
    }
}
