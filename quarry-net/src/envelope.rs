use serde_json::Value;

/// Known upstream envelope shapes, tried in order.
///
/// Upstream feeds disagree on where the record array lives; instead of
/// duck-typing each response ad hoc, the shapes are enumerated and
/// resolved by the first strategy that yields a non-empty array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeShape {
    Data,
    Offers,
    Items,
    Campaigns,
    Bare,
}

const STRATEGIES: &[EnvelopeShape] = &[
    EnvelopeShape::Data,
    EnvelopeShape::Offers,
    EnvelopeShape::Items,
    EnvelopeShape::Campaigns,
    EnvelopeShape::Bare,
];

impl EnvelopeShape {
    fn records<'a>(&self, body: &'a Value) -> Option<&'a Vec<Value>> {
        match self {
            EnvelopeShape::Data => body.get("data")?.as_array(),
            EnvelopeShape::Offers => body.get("offers")?.as_array(),
            EnvelopeShape::Items => body.get("items")?.as_array(),
            EnvelopeShape::Campaigns => body.get("campaigns")?.as_array(),
            EnvelopeShape::Bare => body.as_array(),
        }
    }
}

/// Extract the raw record array from a response body. None when no
/// strategy yields a non-empty array; the caller treats that as an empty
/// feed, not an error.
pub fn extract_records(body: &Value) -> Option<(EnvelopeShape, Vec<Value>)> {
    for shape in STRATEGIES {
        if let Some(records) = shape.records(body) {
            if !records.is_empty() {
                return Some((*shape, records.clone()));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_each_documented_shape() {
        let record = json!({"id": 1});
        for (body, expected) in [
            (json!({"data": [record.clone()]}), EnvelopeShape::Data),
            (json!({"offers": [record.clone()]}), EnvelopeShape::Offers),
            (json!({"items": [record.clone()]}), EnvelopeShape::Items),
            (json!({"campaigns": [record.clone()]}), EnvelopeShape::Campaigns),
            (json!([record.clone()]), EnvelopeShape::Bare),
        ] {
            let (shape, records) = extract_records(&body).unwrap();
            assert_eq!(shape, expected);
            assert_eq!(records.len(), 1);
        }
    }

    #[test]
    fn earlier_strategies_win() {
        let body = json!({
            "data": [{"id": "from_data"}],
            "offers": [{"id": "from_offers"}]
        });
        let (shape, records) = extract_records(&body).unwrap();
        assert_eq!(shape, EnvelopeShape::Data);
        assert_eq!(records[0]["id"], "from_data");
    }

    #[test]
    fn empty_arrays_fall_through() {
        let body = json!({"data": [], "offers": [{"id": 1}]});
        let (shape, _) = extract_records(&body).unwrap();
        assert_eq!(shape, EnvelopeShape::Offers);
    }

    #[test]
    fn unrecognized_body_yields_none() {
        assert!(extract_records(&json!({"status": "ok"})).is_none());
        assert!(extract_records(&json!({"data": []})).is_none());
        assert!(extract_records(&json!("nope")).is_none());
    }
}
