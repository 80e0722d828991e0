use crate::{TypesError, TypesResult};

/// A string that always holds at least one non-whitespace character.
///
/// Input is trimmed during construction, so `"  chest pain "` is stored as `"chest pain"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Trims `input` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::EmptyText`] if nothing is left after trimming.
    pub fn new(input: impl AsRef<str>) -> TypesResult<Self> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TypesError::EmptyText);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_surrounding_whitespace() {
        let text = NonEmptyText::new("  chest pain \n").expect("non-empty input");
        assert_eq!(text.as_str(), "chest pain");
    }

    #[test]
    fn test_new_rejects_blank_input() {
        assert_eq!(NonEmptyText::new("   "), Err(TypesError::EmptyText));
        assert_eq!(NonEmptyText::new(""), Err(TypesError::EmptyText));
    }

    #[test]
    fn test_deserialize_rejects_blank_string() {
        let err = serde_json::from_str::<NonEmptyText>("\"  \"").expect_err("blank should fail");
        assert!(err.to_string().contains("empty"));
    }
}
