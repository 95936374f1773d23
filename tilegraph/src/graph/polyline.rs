//! Polyline encoding (six decimal digits of precision).

use crate::grid::PointLL;

const PRECISION: f64 = 1e6;

/// Encode a shape as a polyline6 string (latitude first, then longitude,
/// each delta zig-zag encoded in 5-bit chunks).
pub fn encode(shape: &[PointLL]) -> String {
    let mut output = String::with_capacity(shape.len() * 8);
    let mut last_lat = 0i64;
    let mut last_lng = 0i64;
    for point in shape {
        let lat = (point.lat * PRECISION).round() as i64;
        let lng = (point.lng * PRECISION).round() as i64;
        encode_value(lat - last_lat, &mut output);
        encode_value(lng - last_lng, &mut output);
        last_lat = lat;
        last_lng = lng;
    }
    output
}

/// Decode a polyline6 string. Returns `None` on truncated or malformed input.
pub fn decode(encoded: &str) -> Option<Vec<PointLL>> {
    let mut bytes = encoded.bytes();
    let mut shape = Vec::new();
    let (mut lat, mut lng) = (0i64, 0i64);
    loop {
        let Some(dlat) = decode_value(&mut bytes) else {
            break;
        };
        let dlat = dlat?;
        let dlng = decode_value(&mut bytes)??;
        lat += dlat;
        lng += dlng;
        shape.push(PointLL::new(lng as f64 / PRECISION, lat as f64 / PRECISION));
    }
    Some(shape)
}

fn encode_value(value: i64, output: &mut String) {
    let zigzag = if value < 0 { !(value << 1) } else { value << 1 };
    let mut value = zigzag as u64;
    while value >= 0x20 {
        output.push(char::from((0x20 | (value & 0x1f)) as u8 + 63));
        value >>= 5;
    }
    output.push(char::from(value as u8 + 63));
}

/// Outer `None`: input ended cleanly. Inner `None`: malformed value.
fn decode_value(bytes: &mut impl Iterator<Item = u8>) -> Option<Option<i64>> {
    let mut result = 0u64;
    let mut shift = 0;
    let mut first = true;
    loop {
        let Some(byte) = bytes.next() else {
            return if first { None } else { Some(None) };
        };
        first = false;
        if !(63..127).contains(&byte) || shift > 60 {
            return Some(None);
        }
        let chunk = u64::from(byte - 63);
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        if chunk < 0x20 {
            break;
        }
    }
    let value = (result >> 1) as i64;
    Some(Some(if result & 1 != 0 { !value } else { value }))
}
