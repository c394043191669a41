//! Composite-key encoding for the column-family tables.
//!
//! Keys are fixed-width big-endian tuples so that a prefix scan over a
//! partition orders rows by the trailing id: the oldest pending queue entry
//! is the first key ascending, and a customer's most recent order is the
//! first matching key descending.

/// Append a big-endian u32 component.
fn push_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_be_bytes());
}

/// Append a big-endian u64 component.
fn push_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn key(parts: &[u32]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(parts.len() * 4);
    for part in parts {
        push_u32(&mut buf, *part);
    }
    buf
}

pub fn warehouse(w: u32) -> Vec<u8> {
    key(&[w])
}

pub fn district(w: u32, d: u32) -> Vec<u8> {
    key(&[w, d])
}

pub fn customer(w: u32, d: u32, c: u32) -> Vec<u8> {
    key(&[w, d, c])
}

pub fn item(i: u32) -> Vec<u8> {
    key(&[i])
}

pub fn stock(w: u32, i: u32) -> Vec<u8> {
    key(&[w, i])
}

pub fn order(w: u32, d: u32, o: u32) -> Vec<u8> {
    key(&[w, d, o])
}

pub fn order_line(w: u32, d: u32, o: u32, line: u32) -> Vec<u8> {
    key(&[w, d, o, line])
}

pub fn queue_entry(w: u32, d: u32, o: u32) -> Vec<u8> {
    key(&[w, d, o])
}

pub fn payment_history(w: u32, d: u32, c: u32, ts_micros: u64) -> Vec<u8> {
    let mut buf = key(&[w, d, c]);
    push_u64(&mut buf, ts_micros);
    buf
}

/// Partition prefix covering every order (or queue entry) of one district.
pub fn district_prefix(w: u32, d: u32) -> Vec<u8> {
    key(&[w, d])
}

/// Prefix covering every line of one order.
pub fn order_prefix(w: u32, d: u32, o: u32) -> Vec<u8> {
    key(&[w, d, o])
}

fn component_u32(raw: &[u8], index: usize) -> Option<u32> {
    let start = index * 4;
    let bytes: [u8; 4] = raw.get(start..start + 4)?.try_into().ok()?;
    Some(u32::from_be_bytes(bytes))
}

/// Trailing order id of an `order` or `queue_entry` key.
pub fn order_id(raw: &[u8]) -> Option<u32> {
    component_u32(raw, 2)
}

/// Decompose a `customer` key into (warehouse, district, customer).
pub fn customer_parts(raw: &[u8]) -> Option<(u32, u32, u32)> {
    Some((
        component_u32(raw, 0)?,
        component_u32(raw, 1)?,
        component_u32(raw, 2)?,
    ))
}

/// Render a key for error messages.
pub fn display(raw: &[u8]) -> String {
    let mut parts = Vec::new();
    let mut rest = raw;
    while rest.len() >= 4 {
        let (head, tail) = rest.split_at(4);
        let bytes: [u8; 4] = head.try_into().unwrap();
        parts.push(u32::from_be_bytes(bytes).to_string());
        rest = tail;
    }
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_keys_sort_by_trailing_id() {
        let a = order(1, 3, 7);
        let b = order(1, 3, 8);
        let c = order(1, 3, 200);
        assert!(a < b);
        assert!(b < c);
        // Higher district sorts after every order of a lower district.
        assert!(c < order(1, 4, 1));
    }

    #[test]
    fn district_prefix_covers_only_its_orders() {
        let prefix = district_prefix(2, 5);
        assert!(order(2, 5, 1).starts_with(&prefix));
        assert!(order(2, 5, u32::MAX).starts_with(&prefix));
        assert!(!order(2, 6, 1).starts_with(&prefix));
        assert!(!order(3, 5, 1).starts_with(&prefix));
    }

    #[test]
    fn decode_round_trips() {
        assert_eq!(order_id(&order(9, 2, 4411)), Some(4411));
        assert_eq!(customer_parts(&customer(1, 2, 3)), Some((1, 2, 3)));
        assert_eq!(display(&order(1, 2, 3)), "1/2/3");
    }
}
