//! Core category domain types.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, de};

use crate::{Error, auth::UserID, database_id::DatabaseId};

/// Database identifier for a category.
pub type CategoryId = DatabaseId;

/// A validated, non-empty category name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyCategoryName] if `name` is
    /// empty or only whitespace.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyCategoryName)
        } else {
            Ok(Self(name.to_owned()))
        }
    }

    /// Create a category name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for CategoryName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CategoryName::new(s)
    }
}

impl Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A label for grouping transactions, e.g. 'Groceries' or 'Salary'.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Hash)]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The name shown to the user.
    pub name: CategoryName,
    /// The user that owns the category.
    pub user_id: UserID,
}

/// A category together with the net USD amount of its transactions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryWithSpending {
    pub id: CategoryId,
    pub name: CategoryName,
    pub total_spending: f64,
}

/// A category ID as sent by HTML selects: a number, a numeric string, `""` or `null`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawCategoryId {
    Number(CategoryId),
    Text(String),
}

/// Deserialize an optional category ID, treating `null` and blank strings as no category.
pub fn deserialize_optional_category_id<'de, D>(
    deserializer: D,
) -> Result<Option<CategoryId>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawCategoryId>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawCategoryId::Number(id)) => Ok(Some(id)),
        Some(RawCategoryId::Text(text)) => {
            let text = text.trim();

            if text.is_empty() {
                return Ok(None);
            }

            text.parse()
                .map(Some)
                .map_err(|_| de::Error::custom(format!("invalid category ID \"{text}\"")))
        }
    }
}

#[cfg(test)]
mod category_name_tests {
    use crate::{Error, category::CategoryName};

    #[test]
    fn new_fails_on_empty_string() {
        assert_eq!(CategoryName::new(""), Err(Error::EmptyCategoryName));
    }

    #[test]
    fn new_fails_on_just_whitespace() {
        assert_eq!(CategoryName::new("\n\t \r"), Err(Error::EmptyCategoryName));
    }

    #[test]
    fn new_trims_whitespace() {
        let name = CategoryName::new("  Groceries ").unwrap();

        assert_eq!(name.as_ref(), "Groceries");
    }
}

#[cfg(test)]
mod optional_category_id_tests {
    use serde::Deserialize;
    use serde_json::json;

    use crate::category::{CategoryId, deserialize_optional_category_id};

    #[derive(Debug, Deserialize)]
    struct Form {
        #[serde(default, deserialize_with = "deserialize_optional_category_id")]
        category_id: Option<CategoryId>,
    }

    fn parse(value: serde_json::Value) -> Result<Option<CategoryId>, serde_json::Error> {
        serde_json::from_value::<Form>(value).map(|form| form.category_id)
    }

    #[test]
    fn accepts_numbers_and_numeric_strings() {
        assert_eq!(parse(json!({ "category_id": 3 })).unwrap(), Some(3));
        assert_eq!(parse(json!({ "category_id": "3" })).unwrap(), Some(3));
        assert_eq!(parse(json!({ "category_id": " 12 " })).unwrap(), Some(12));
    }

    #[test]
    fn blank_null_and_missing_mean_no_category() {
        assert_eq!(parse(json!({ "category_id": "" })).unwrap(), None);
        assert_eq!(parse(json!({ "category_id": null })).unwrap(), None);
        assert_eq!(parse(json!({})).unwrap(), None);
    }

    #[test]
    fn rejects_non_numeric_strings() {
        assert!(parse(json!({ "category_id": "groceries" })).is_err());
    }
}
