use serde::{de::Error as _, Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSize {
    Int(i64),
    Float(f64),
    Text(String),
}

/// Deserialize a size as an integer. Floats are truncated toward zero and
/// strings must hold an integer literal.
pub(crate) fn size<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match RawSize::deserialize(deserializer)? {
        RawSize::Int(n) => Ok(n),
        RawSize::Float(f) => {
            let truncated = f.trunc();
            // i64::MAX as f64 rounds up to 2^63, which is out of range
            if truncated.is_finite() && truncated >= i64::MIN as f64 && truncated < i64::MAX as f64
            {
                Ok(truncated as i64)
            } else {
                Err(D::Error::custom(format!("size out of range: {}", f)))
            }
        }
        RawSize::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| D::Error::custom(format!("size is not an integer: {:?}", s))),
    }
}
