use crate::shipment::TrackingQuery;
use regex::Regex;
use std::sync::LazyLock;

static DIGITS_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+$").expect("invalid tracking regex"));

/// Normalize a raw tracking cell into a FedEx tracking number.
///
/// The minimum length is checked on the trimmed cell before embedded spaces
/// are dropped, so `"1234 567890"` and `"1234567890"` both normalize to the
/// same number. What remains must be ASCII digits.
pub fn normalize_tracking_number(raw: &str, min_len: usize) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.chars().count() < min_len {
        return None;
    }

    let compact: String = trimmed.chars().filter(|c| *c != ' ').collect();
    DIGITS_ONLY.is_match(&compact).then_some(compact)
}

/// Turn `(tracking, client)` cell pairs into queries, in input order.
///
/// Rows without a usable tracking number are skipped. Duplicates are kept.
pub fn extract_queries<I>(rows: I, min_len: usize) -> Vec<TrackingQuery>
where
    I: IntoIterator<Item = (String, String)>,
{
    rows.into_iter()
        .filter_map(|(tracking, client)| {
            normalize_tracking_number(&tracking, min_len).map(|tracking_number| TrackingQuery {
                tracking_number,
                client: client.trim().to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shipment::ClientLookup;

    #[test]
    fn accepts_plain_digits() {
        assert_eq!(
            normalize_tracking_number("  123456789012 ", 10),
            Some("123456789012".into())
        );
    }

    #[test]
    fn strips_embedded_spaces() {
        assert_eq!(
            normalize_tracking_number("1234 5678 9012", 10),
            Some("123456789012".into())
        );
    }

    #[test]
    fn ignores_short_numbers() {
        assert_eq!(normalize_tracking_number("123456789", 10), None);
        assert_eq!(normalize_tracking_number("", 10), None);
    }

    #[test]
    fn rejects_non_digits() {
        assert_eq!(normalize_tracking_number("1Z999AA10123456784", 10), None);
        assert_eq!(normalize_tracking_number("1234-5678-9012", 10), None);
        assert_eq!(normalize_tracking_number("nan", 3), None);
    }

    #[test]
    fn spaced_duplicate_overwrites_client() {
        let rows = vec![
            ("1234567890".to_string(), "Acme".to_string()),
            ("12345 67890".to_string(), " Globex ".to_string()),
            ("short".to_string(), "Initech".to_string()),
        ];

        let queries = extract_queries(rows, 10);

        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].tracking_number, queries[1].tracking_number);

        let lookup = ClientLookup::from_queries(&queries);
        assert_eq!(lookup.len(), 1);
        assert_eq!(lookup.client_for("1234567890"), "Globex");
    }
}
