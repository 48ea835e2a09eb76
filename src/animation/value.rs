use std::collections::BTreeMap;

/// Normalized segment progress at which non-numeric values switch from the left keyframe to the
/// right one.
pub const STEP_THRESHOLD: f64 = 0.5;

/// A dynamically shaped animated property value.
///
/// Camera states and layer properties are records (`{ "bearing": 140, "pitch": 60 }`); leaves
/// are numbers, booleans, text, or lists.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    /// Boolean flag. Steps.
    Bool(bool),
    /// Scalar. Interpolates linearly in eased progress.
    Number(f64),
    /// Text. Steps.
    Text(String),
    /// Positional list; same-length lists blend per element.
    List(Vec<PropValue>),
    /// Named fields; blended per field.
    Record(BTreeMap<String, PropValue>),
}

/// Progress within one keyframe segment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mix {
    /// Raw normalized position `u` in `[0, 1]`.
    pub progress: f64,
    /// `easing(u)`.
    pub eased: f64,
}

impl PropValue {
    /// Build a record from `(field, value)` pairs.
    pub fn record<K, V, I>(fields: I) -> Self
    where
        K: Into<String>,
        V: Into<PropValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::Record(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Scalar value, if this is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Field lookup on records.
    pub fn get(&self, field: &str) -> Option<&PropValue> {
        match self {
            Self::Record(fields) => fields.get(field),
            _ => None,
        }
    }

    /// Numeric field lookup on records.
    pub fn get_f64(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(Self::as_f64)
    }

    /// Blend `a` toward `b`.
    ///
    /// Numbers lerp with `mix.eased`. Same-length lists and records recurse per element / field.
    /// Everything else (booleans, text, shape mismatches, fields present on only one side) is a
    /// step function that yields `b` once `mix.progress >= STEP_THRESHOLD`.
    pub fn blend(a: &Self, b: &Self, mix: Mix) -> Self {
        match (a, b) {
            (Self::Number(x), Self::Number(y)) => Self::Number(x + (y - x) * mix.eased),
            (Self::List(xs), Self::List(ys)) if xs.len() == ys.len() => Self::List(
                xs.iter()
                    .zip(ys)
                    .map(|(x, y)| Self::blend(x, y, mix))
                    .collect(),
            ),
            (Self::Record(xs), Self::Record(ys)) => {
                let mut out = BTreeMap::new();
                for (k, x) in xs {
                    match ys.get(k) {
                        Some(y) => {
                            out.insert(k.clone(), Self::blend(x, y, mix));
                        }
                        None if !past_step(mix) => {
                            out.insert(k.clone(), x.clone());
                        }
                        None => {}
                    }
                }
                if past_step(mix) {
                    for (k, y) in ys {
                        if !xs.contains_key(k) {
                            out.insert(k.clone(), y.clone());
                        }
                    }
                }
                Self::Record(out)
            }
            _ => step(a, b, mix),
        }
    }

    /// Overlay `other` onto `self`.
    ///
    /// Records merge field by field (recursively); any other pairing is replaced by `other`.
    pub fn merged_with(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Record(base), Self::Record(over)) => {
                let mut out = base.clone();
                for (k, v) in over {
                    let merged = match base.get(k) {
                        Some(existing) => existing.merged_with(v),
                        None => v.clone(),
                    };
                    out.insert(k.clone(), merged);
                }
                Self::Record(out)
            }
            _ => other.clone(),
        }
    }
}

fn past_step(mix: Mix) -> bool {
    mix.progress >= STEP_THRESHOLD
}

fn step(a: &PropValue, b: &PropValue, mix: Mix) -> PropValue {
    if past_step(mix) { b.clone() } else { a.clone() }
}

impl From<f64> for PropValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<i32> for PropValue {
    fn from(v: i32) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<bool> for PropValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for PropValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for PropValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl<T: Into<PropValue>> From<Vec<T>> for PropValue {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/value.rs"]
mod tests;
