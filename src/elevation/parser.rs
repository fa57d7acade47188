//! ArcGIS-style elevation payloads: `{"data":[12,15,...]}` in row-major order.
//!
//! Well-formed documents go through `serde_json`. Providers occasionally truncate the
//! body after the last sample, so a tolerant scanner takes over when strict parsing fails.

use super::grid::HeightGrid;
use crate::{MapError, Result};
use serde::Deserialize;

#[derive(Deserialize)]
struct ArcGisPayload {
    data: Vec<f64>,
}

/// Parses the sample array of an elevation payload
pub fn parse_samples(bytes: &[u8]) -> Result<Vec<i16>> {
    match serde_json::from_slice::<ArcGisPayload>(bytes) {
        Ok(payload) => Ok(payload.data.into_iter().map(to_sample).collect()),
        Err(e) => {
            log::debug!("strict elevation parse failed ({}), scanning", e);
            let text = std::str::from_utf8(bytes)
                .map_err(|e| MapError::Decode(format!("elevation payload is not UTF-8: {e}")))?;
            scan_data_array(text)
        }
    }
}

/// Parses a payload into a grid of the expected size
pub fn parse_height_grid(bytes: &[u8], width: usize, height: usize) -> Result<HeightGrid> {
    HeightGrid::new(width, height, parse_samples(bytes)?)
}

fn to_sample(value: f64) -> i16 {
    value.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16
}

fn scan_data_array(text: &str) -> Result<Vec<i16>> {
    let field = text
        .find("\"data\"")
        .ok_or_else(|| MapError::Decode("elevation payload has no data field".to_string()))?;
    let rest = &text[field + "\"data\"".len()..];
    let open = rest
        .find('[')
        .ok_or_else(|| MapError::Decode("elevation data is not an array".to_string()))?;

    let mut values = Vec::new();
    let mut token = String::new();
    for c in rest[open + 1..].chars() {
        match c {
            ',' => push_token(&mut token, &mut values)?,
            ']' => {
                push_token(&mut token, &mut values)?;
                return Ok(values);
            }
            c if c.is_whitespace() => {}
            c => token.push(c),
        }
    }

    // Input ended inside the array: the pending token is the final value.
    push_token(&mut token, &mut values)?;
    Ok(values)
}

fn push_token(token: &mut String, values: &mut Vec<i16>) -> Result<()> {
    if token.is_empty() {
        return Ok(());
    }
    let value: f64 = token
        .parse()
        .map_err(|_| MapError::Decode(format!("invalid elevation sample {token:?}")))?;
    values.push(to_sample(value));
    token.clear();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed_payload() {
        let values = parse_samples(br#"{"data":[1,-2,300],"width":3}"#).unwrap();
        assert_eq!(values, vec![1, -2, 300]);
    }

    #[test]
    fn test_unterminated_final_value_is_kept() {
        let values = parse_samples(br#"{"data":[5, 6, 7"#).unwrap();
        assert_eq!(values, vec![5, 6, 7]);
    }

    #[test]
    fn test_trailing_comma_and_whitespace() {
        let values = parse_samples(b"{ \"data\" : [ 1 ,\n 2, ] ").unwrap();
        assert_eq!(values, vec![1, 2]);
    }

    #[test]
    fn test_out_of_range_values_clamp() {
        let values = parse_samples(br#"{"data":[40000, -40000, 2.6]}"#).unwrap();
        assert_eq!(values, vec![i16::MAX, i16::MIN, 3]);
    }

    #[test]
    fn test_garbage_is_a_decode_error() {
        assert!(matches!(
            parse_samples(b"<html>503</html>"),
            Err(MapError::Decode(_))
        ));
        assert!(matches!(
            parse_samples(br#"{"data":[1, x, 3]"#),
            Err(MapError::Decode(_))
        ));
    }

    #[test]
    fn test_grid_size_must_match() {
        assert!(parse_height_grid(br#"{"data":[1,2,3,4]}"#, 2, 2).is_ok());
        assert!(parse_height_grid(br#"{"data":[1,2,3]}"#, 2, 2).is_err());
    }
}
