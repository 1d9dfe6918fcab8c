use serde::{Serialize, Deserialize, Serializer};
use std::fmt;

/// Holder contact details (phone, email) captured at booking time.
///
/// `Debug` and `Display` print a fixed mask so a ticket can be passed to
/// `tracing` macros without leaking the holder's contact data. JSON
/// serialization carries the real value because the scanner UI shows it.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

const MASK: &str = "********";

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(MASK)
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(MASK)
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_never_prints_value() {
        let email = Masked("ahmed.ali@email.com".to_string());
        assert_eq!(format!("{:?}", email), "********");
        assert_eq!(format!("{}", email), "********");
    }

    #[test]
    fn test_serialization_keeps_value() {
        let phone = Masked("+218 91 234 5678".to_string());
        assert_eq!(serde_json::to_string(&phone).unwrap(), "\"+218 91 234 5678\"");

        let back: Masked<String> = serde_json::from_str("\"x@y.z\"").unwrap();
        assert_eq!(back.0, "x@y.z");
    }
}
